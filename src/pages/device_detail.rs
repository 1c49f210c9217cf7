use crate::common::utils::{centered_rect, format_date};
use crate::devices::NormalizedDevice;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

fn field<'a>(label: &'a str, value: impl Into<String>) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(value.into()),
    ])
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or("Unknown").to_string()
}

/// Vendor timestamp as a local date, the raw text when it does not parse.
fn display_date(raw: Option<&str>, include_time: bool) -> String {
    match raw {
        Some(raw) => format_date(Some(raw), include_time).unwrap_or_else(|| raw.to_string()),
        None => "Unknown".to_string(),
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

pub fn render_device_detail(device: &NormalizedDevice, frame: &mut Frame) {
    let area = centered_rect(70, 85, frame.area());
    frame.render_widget(Clear, area);

    let status = if device.online {
        Span::styled("Online", Style::default().fg(Color::Green))
    } else {
        Span::styled("Offline", Style::default().fg(Color::Red))
    };

    let mut last_seen = vec![
        Span::styled("Last Seen: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(device.last_seen_display.clone()),
    ];
    if device.is_long_offline {
        if let Some(days) = device.days_offline {
            last_seen.push(Span::styled(
                format!("  ⚠ (offline for {days} days)"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
    }

    let ext = &device.extended;
    let last_reboot = display_date(device.last_reboot.as_deref(), true);
    let bios_date = display_date(ext.bios_date.as_deref(), false);

    let mut text = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
            status,
        ]),
        Line::from(last_seen),
        field("Agent ID", device.id.to_string()),
        field(
            "Folder",
            device
                .folder
                .clone()
                .unwrap_or_else(|| "No folder assigned".into()),
        ),
        Line::default(),
        section("System"),
        field("Operating System", or_unknown(device.os.as_deref())),
        field("OS Description", or_unknown(device.os_description.as_deref())),
        field("OS Build", or_unknown(device.os_build.as_deref())),
        field("IP Address", or_unknown(device.ip_address.as_deref())),
        field("Reported From", or_unknown(ext.reported_from_ip.as_deref())),
        field("MAC Addresses", or_unknown(ext.mac_addresses.as_deref())),
        field(
            "Domain",
            ext.domain_name
                .clone()
                .unwrap_or_else(|| "Not domain joined".into()),
        ),
        field(
            "Logged In User",
            device
                .logged_user
                .clone()
                .unwrap_or_else(|| "No user logged in".into()),
        ),
        field("Last Reboot", last_reboot),
        field("Agent Version", or_unknown(device.agent_version.as_deref())),
        Line::default(),
        section("Hardware"),
        field("CPU", or_unknown(ext.cpu.as_deref())),
        field(
            "Cores",
            ext.processor_cores
                .map_or_else(|| "Unknown".to_string(), |n| n.to_string()),
        ),
        field("Memory", or_unknown(device.memory.as_deref())),
        field("Model", or_unknown(ext.vendor_model.as_deref())),
        field("Serial Number", or_unknown(ext.vendor_serial.as_deref())),
        field("Motherboard", or_unknown(ext.motherboard.as_deref())),
        field("BIOS", or_unknown(ext.bios_info.as_deref())),
        field("BIOS Date", bios_date),
        field("Windows Serial", or_unknown(ext.windows_serial.as_deref())),
        Line::default(),
    ];

    let mut hints = vec!["Esc: close"];
    if device.app_view_url.is_some() {
        hints.push("o: open in Atera");
    }
    if device.can_offer_delete() {
        hints.push("d: delete");
    }
    text.push(Line::from(hints.join(" | ")).alignment(Alignment::Center));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Device Details: {}", device.name))
        .style(Style::default().bg(Color::Black));

    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
