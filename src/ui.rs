use crate::app::{App, InputMode, Popup, ViewMode};
use crate::devices::StatusFilter;
use crate::pages::device_detail::render_device_detail;
use crate::pages::device_list::render_device_list;
use crate::pages::popups::{
    render_credential_prompt, render_delete_confirm, render_folder_picker, render_message,
    render_session_error,
};
use crate::session::SessionState;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

pub fn render(app: &mut App, frame: &mut Frame) {
    let banner_height = if app.session.inline_error().is_some() {
        1
    } else {
        0
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),             // Header
            Constraint::Length(3),             // Filters
            Constraint::Length(banner_height), // Fetch error
            Constraint::Min(0),                // Devices
            Constraint::Length(1),             // Key hints
        ])
        .split(frame.area());

    render_header(app, frame, layout[0]);
    render_filters(app, frame, layout[1]);

    if let Some(err) = app.session.inline_error() {
        frame.render_widget(
            Paragraph::new(err.to_string()).style(Style::default().fg(Color::White).bg(Color::Red)),
            layout[2],
        );
    }

    let title = match (app.view_mode, app.folder_view) {
        (ViewMode::Grid, false) => "Devices",
        (ViewMode::Grid, true) => "Devices by Folder",
        (ViewMode::List, false) => "Devices (List)",
        (ViewMode::List, true) => "Devices by Folder (List)",
    };
    let main_block = Block::default().borders(Borders::ALL).title(title);
    render_device_list(app, frame, layout[3], main_block);

    render_footer(frame, layout[4]);

    // Session overlays take precedence over everything else.
    match app.session.state().clone() {
        SessionState::NoCredential { .. } | SessionState::AwaitingValidation => {
            render_credential_prompt(app, frame);
            return;
        }
        SessionState::Error { message } => {
            render_session_error(&message, frame);
            return;
        }
        SessionState::Polling => {}
    }

    match app.popup.clone() {
        Popup::None => {}
        Popup::Details => {
            if let Some(device) = app.selected_device() {
                render_device_detail(device, frame);
            }
        }
        Popup::FolderPicker => render_folder_picker(app, frame),
        Popup::ConfirmDelete => {
            if let Some(pending) = &app.pending_delete {
                render_delete_confirm(pending, frame);
            }
        }
        Popup::Message(message) => render_message(&message, frame),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let counts = app.counts();

    let mut spans = vec![
        Span::styled("Atera Devices", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" | Total: {} | ", counts.total)),
        Span::styled(
            format!("Online: {}", counts.online),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("Offline: {}", counts.offline),
            Style::default().fg(Color::Red),
        ),
    ];

    if let Some(updated) = app.last_updated {
        spans.push(Span::raw(format!(
            " | Updated {}",
            updated.format("%I:%M:%S %p")
        )));
    }

    if app.is_loading {
        spans.push(Span::styled(
            " | Refreshing...",
            Style::default().fg(Color::Yellow),
        ));
    } else if app.is_polling() {
        spans.push(Span::raw(format!(" | Next refresh in {}s", app.countdown)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("Status")),
        area,
    );
}

fn render_filters(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw("Status: ")];
    for (key, filter) in [
        ('1', StatusFilter::All),
        ('2', StatusFilter::Online),
        ('3', StatusFilter::Offline),
    ] {
        let style = if app.query.status == filter {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!("[{key}] {}", filter.label()), style));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::raw(format!(
        "| Folder: {} ",
        app.query.folder.as_deref().unwrap_or("All")
    )));

    let searching = app.input_mode == InputMode::Search;
    let search_style = if searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if searching { "_" } else { "" };
    spans.push(Span::raw("| Search: "));
    spans.push(Span::styled(format!("{}{cursor}", app.query.search), search_style));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("Filters")),
        area,
    );
}

fn render_footer(frame: &mut Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new(
            "q: quit | j/k: move | Enter: details | 1/2/3: status | f: folder | /: search | v: grid/list | g: group | r: refresh | R: reset | d: delete | o: open | K: change key",
        )
        .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
