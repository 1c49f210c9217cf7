use crate::app::{App, PendingDelete};
use crate::common::utils::centered_rect;
use crate::session::SessionState;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

fn popup_block(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title.into())
        .style(Style::default().bg(Color::DarkGray))
}

pub fn render_credential_prompt(app: &App, frame: &mut Frame) {
    let area = centered_rect(60, 35, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(popup_block("Atera API Key"), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Intro
            Constraint::Length(3), // Input
            Constraint::Min(1),    // Message
            Constraint::Length(1), // Instructions
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new("Enter your Atera API key (Admin > API in the Atera web app).")
            .wrap(Wrap { trim: true }),
        layout[0],
    );

    // The key is never echoed.
    let masked = "•".repeat(app.key_input.chars().count());
    let input = Paragraph::new(masked).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Key")
            .style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(input, layout[1]);

    let message = match app.session.state() {
        SessionState::AwaitingValidation => Some(Span::styled(
            "Validating API key...",
            Style::default().fg(Color::Yellow),
        )),
        SessionState::NoCredential {
            message: Some(message),
        } => Some(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )),
        _ => None,
    };
    if let Some(message) = message {
        frame.render_widget(
            Paragraph::new(Line::from(message)).wrap(Wrap { trim: true }),
            layout[2],
        );
    }

    frame.render_widget(
        Paragraph::new("Enter: connect | Esc: clear | Ctrl+C: quit").alignment(Alignment::Center),
        layout[3],
    );
}

pub fn render_session_error(message: &str, frame: &mut Frame) {
    let area = centered_rect(50, 25, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("Polling has stopped and the stored API key was removed."),
        Line::default(),
        Line::from("Press Enter to enter a new key.").alignment(Alignment::Center),
    ];

    frame.render_widget(
        Paragraph::new(text)
            .block(popup_block("Authentication Failed"))
            .wrap(Wrap { trim: true }),
        area,
    );
}

pub fn render_delete_confirm(pending: &PendingDelete, frame: &mut Frame) {
    let area = centered_rect(50, 25, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(vec![
            Span::raw("Delete device "),
            Span::styled(
                pending.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("?"),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "This removes the agent from Atera and cannot be undone.",
            Style::default().fg(Color::Red),
        )),
        Line::default(),
        Line::from("y: delete | n/Esc: cancel").alignment(Alignment::Center),
    ];

    frame.render_widget(
        Paragraph::new(text)
            .block(popup_block("Confirm Delete"))
            .wrap(Wrap { trim: true }),
        area,
    );
}

pub fn render_folder_picker(app: &mut App, frame: &mut Frame) {
    let area = centered_rect(40, 50, frame.area());
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = std::iter::once("All folders".to_string())
        .chain(app.folders.iter().cloned())
        .map(ListItem::new)
        .collect();

    let list = List::new(items)
        .block(popup_block("Folder (Enter: select, Esc: cancel)"))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Yellow),
        )
        .highlight_symbol(">> ");

    frame.render_stateful_widget(list, area, &mut app.folder_picker_state);
}

pub fn render_message(message: &str, frame: &mut Frame) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from("Press Enter to continue").alignment(Alignment::Center),
    ];

    frame.render_widget(
        Paragraph::new(text)
            .block(popup_block("Notice"))
            .wrap(Wrap { trim: true }),
        area,
    );
}
