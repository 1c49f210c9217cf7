use crate::devices::status::parse_timestamp;
use chrono::Local;
use ratatui::prelude::*;
use tracing::warn;

/// Formats a vendor timestamp as a local calendar date ("MM/DD/YYYY"), or
/// "MM/DD/YYYY HH:MMam/pm" when `include_time` is set.
///
/// # Returns
/// `None` when the value is empty or cannot be parsed.
pub fn format_date(raw: Option<&str>, include_time: bool) -> Option<String> {
    let parsed = parse_timestamp(raw?)?;
    let local = parsed.with_timezone(&Local);
    let format = if include_time {
        "%m/%d/%Y %I:%M%P"
    } else {
        "%m/%d/%Y"
    };
    Some(local.format(format).to_string())
}

/// Shortens `text` to at most `max` characters, marking the cut with "…".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Calculates a centered rectangle of a given percentage size within another Rect.
/// Useful for displaying popups/modals in the center of the screen.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);

    center
}

/// Opens a URL in the default web browser in a cross-platform way.
pub fn open_browser(url: &str) {
    let result = if cfg!(target_os = "windows") {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
    } else if cfg!(target_os = "macos") {
        std::process::Command::new("open").arg(url).spawn()
    } else {
        std::process::Command::new("xdg-open").arg(url).spawn()
    };

    if let Err(e) = result {
        warn!(url, error = %e, "failed to open browser");
    }
}
