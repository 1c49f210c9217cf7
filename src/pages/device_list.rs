use crate::app::{App, ViewMode};
use crate::common::utils::truncate;
use crate::devices::NormalizedDevice;
use crate::devices::pipeline::FolderGroup;
use ratatui::{
    prelude::*,
    widgets::{Block, Cell, Paragraph, Row, Table},
};

const GRID_CELL_WIDTH: u16 = 28;
const UNGROUPED_LABEL: &str = "Ungrouped Devices";

pub fn render_device_list(app: &mut App, frame: &mut Frame, area: Rect, block: Block) {
    if app.devices.is_empty() {
        let text = if app.is_loading {
            "Loading devices..."
        } else {
            "No devices found."
        };
        frame.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(Color::Yellow))
                .block(block),
            area,
        );
        return;
    }

    if app.visible_devices().is_empty() {
        frame.render_widget(
            Paragraph::new("No devices match the current filters. Press 'R' to reset.")
                .style(Style::default().fg(Color::Yellow))
                .block(block),
            area,
        );
        return;
    }

    match app.view_mode {
        ViewMode::Grid => render_grid(app, frame, area, block),
        ViewMode::List => render_table(app, frame, area, block),
    }
}

fn status_span(device: &NormalizedDevice) -> Span<'static> {
    if device.online {
        Span::styled("● ", Style::default().fg(Color::Green))
    } else if device.is_long_offline {
        Span::styled("● ", Style::default().fg(Color::Red))
    } else {
        Span::styled("● ", Style::default().fg(Color::DarkGray))
    }
}

fn group_header(group: &FolderGroup<'_>) -> Line<'static> {
    let title = group.folder.as_deref().unwrap_or(UNGROUPED_LABEL).to_string();
    Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  {} devices, {} online, {} offline",
            group.counts.total, group.counts.online, group.counts.offline
        )),
    ])
}

/// Rows in display order plus the row index holding the selected device.
fn grid_rows(app: &App, columns: usize) -> (Vec<Row<'static>>, usize) {
    let selected = app.selected;
    let mut rows = Vec::new();
    let mut selected_row = 0;
    let mut position = 0;

    let mut push_chunked = |devices: &[&NormalizedDevice], rows: &mut Vec<Row<'static>>| {
        for chunk in devices.chunks(columns) {
            let cells: Vec<Cell> = chunk
                .iter()
                .map(|device| {
                    let style = if position == selected {
                        selected_row = rows.len();
                        Style::default().add_modifier(Modifier::REVERSED)
                    } else {
                        Style::default()
                    };
                    position += 1;

                    let mut spans = vec![status_span(device)];
                    spans.push(Span::raw(truncate(
                        &device.name,
                        GRID_CELL_WIDTH as usize - 4,
                    )));
                    if device.is_long_offline {
                        spans.push(Span::styled(" ⚠", Style::default().fg(Color::Red)));
                    }
                    Cell::from(Line::from(spans)).style(style)
                })
                .collect();
            rows.push(Row::new(cells));
        }
    };

    if app.folder_view {
        for group in app.folder_groups() {
            rows.push(Row::new(vec![Cell::from(group_header(&group))]));
            push_chunked(&group.devices, &mut rows);
        }
    } else {
        push_chunked(&app.visible_devices(), &mut rows);
    }

    (rows, selected_row)
}

fn render_grid(app: &mut App, frame: &mut Frame, area: Rect, block: Block) {
    let inner_width = area.width.saturating_sub(2);
    let columns = usize::from((inner_width / GRID_CELL_WIDTH).max(1));
    let (rows, selected_row) = grid_rows(app, columns);

    // Keep the selected row on screen.
    let visible_rows = usize::from(area.height.saturating_sub(2)).max(1);
    let skip = selected_row.saturating_sub(visible_rows - 1);
    let rows: Vec<Row> = rows.into_iter().skip(skip).collect();

    let widths = vec![Constraint::Length(GRID_CELL_WIDTH); columns];
    frame.render_widget(Table::new(rows, widths).block(block), area);
}

fn device_row(device: &NormalizedDevice) -> Row<'static> {
    let last_seen = if device.online {
        Span::styled("Online", Style::default().fg(Color::Green))
    } else if device.is_long_offline {
        Span::styled(
            format!("{} ⚠", device.last_seen_display),
            Style::default().fg(Color::Red),
        )
    } else {
        Span::raw(device.last_seen_display.clone())
    };

    Row::new(vec![
        Cell::from(Line::from(vec![
            status_span(device),
            Span::raw(device.name.clone()),
        ])),
        Cell::from(device.folder.clone().unwrap_or_else(|| "-".into())),
        Cell::from(device.os.clone().unwrap_or_else(|| "Unknown".into())),
        Cell::from(device.ip_address.clone().unwrap_or_else(|| "-".into())),
        Cell::from(device.logged_user.clone().unwrap_or_else(|| "-".into())),
        Cell::from(last_seen),
    ])
}

fn render_table(app: &mut App, frame: &mut Frame, area: Rect, block: Block) {
    let mut rows = Vec::new();
    let mut selected_row = 0;
    let mut position = 0;

    if app.folder_view {
        for group in app.folder_groups() {
            rows.push(Row::new(vec![Cell::from(group_header(&group))]));
            for device in &group.devices {
                if position == app.selected {
                    selected_row = rows.len();
                }
                position += 1;
                rows.push(device_row(device));
            }
        }
    } else {
        selected_row = app.selected;
        rows.extend(app.visible_devices().into_iter().map(device_row));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(22),
            Constraint::Percentage(14),
            Constraint::Percentage(22),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
            Constraint::Percentage(16),
        ],
    )
    .header(
        Row::new(vec!["Name", "Folder", "OS", "IP", "User", "Last Seen"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol(">> ");

    app.table_state.select(Some(selected_row));
    frame.render_stateful_widget(table, area, &mut app.table_state);
}
