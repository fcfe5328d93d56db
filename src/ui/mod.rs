//! Terminal UI components
//!
//! Built with ratatui. Layout: URL box on top, devices and session side by
//! side, status bar at the bottom, error banner on top of everything.

pub mod devices;
pub mod player;
pub mod theme;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Banner, InputMode};

pub use devices::render_devices;
pub use player::render_player;
pub use theme::Theme;

/// Render the whole screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Clear with background color
    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Style::default().bg(Theme::BACKGROUND)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // URL box
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_content(frame, chunks[1], app);
    render_status_bar(frame, chunks[2], app);

    if let Some(banner) = &app.banner {
        render_banner(frame, area, banner);
    }
}

/// URL input box, or the number prompt while one is open
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let (editing, title) = match app.input_mode {
        InputMode::Normal => (false, " MEDIA URL ".to_string()),
        InputMode::Editing => (true, " MEDIA URL ".to_string()),
        InputMode::Prompt(kind) => (true, format!(" {} ", kind.title())),
    };

    let text = match app.input_mode {
        InputMode::Prompt(_) => {
            let (before, after) = app.prompt.split_at_cursor();
            format!("{}│{}", before, after)
        }
        InputMode::Editing => {
            let (before, after) = app.url.split_at_cursor();
            format!("{}│{}", before, after)
        }
        InputMode::Normal if app.url.text.is_empty() => {
            "Press u to enter a media URL or file path...".to_string()
        }
        InputMode::Normal => app.url.text.clone(),
    };

    let input = Paragraph::new(text)
        .style(if editing {
            Theme::input().fg(Theme::PRIMARY)
        } else {
            Theme::input()
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(if editing {
                    Theme::border_focused()
                } else {
                    Theme::border()
                })
                .title(Span::styled(title, Theme::title())),
        );
    frame.render_widget(input, area);
}

fn render_content(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_devices(frame, chunks[0], app);
    render_player(frame, chunks[1], app);
}

/// Mode, spinner or last message, key help
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(
            " NORMAL ",
            Style::default().fg(Theme::BACKGROUND).bg(Theme::PRIMARY),
        ),
        InputMode::Editing => Span::styled(
            " URL ",
            Style::default().fg(Theme::BACKGROUND).bg(Theme::TARGET),
        ),
        InputMode::Prompt(kind) => Span::styled(
            format!(" {} ", kind.label()),
            Style::default().fg(Theme::BACKGROUND).bg(Theme::TARGET),
        ),
    };

    let activity = match (app.busy_label(), &app.message) {
        (Some(label), _) => Span::styled(format!(" ⟳ {} ", label), Theme::loading()),
        (None, Some(msg)) => Span::styled(format!(" {} ", msg), Theme::text()),
        (None, None) => Span::raw(""),
    };

    let help = match app.input_mode {
        InputMode::Normal => " q:quit  r:scan  ↵:select  u:url ",
        InputMode::Editing => " ↵:cast  tab:complete  esc:done  ^u:clear ",
        InputMode::Prompt(_) => " ↵:send  esc:cancel ",
    };

    let line = Line::from(vec![
        mode,
        activity,
        Span::raw("│"),
        Span::styled(help, Theme::dimmed()),
    ]);
    frame.render_widget(Paragraph::new(line).style(Theme::status_bar()), area);
}

/// Centered rectangle of at most `width` x `height` inside `area`
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Error banner overlay: label in the title, raw tool text in the body
fn render_banner(frame: &mut Frame, area: Rect, banner: &Banner) {
    let popup = centered_rect(64.min(area.width.saturating_sub(4)), 6, area);
    frame.render_widget(Clear, popup);

    let hint = if banner.persistent {
        "install catt, then press r to rescan"
    } else {
        "press any key"
    };

    let body = Paragraph::new(vec![
        Line::from(Span::styled(banner.message.as_str(), Theme::error())),
        Line::from(""),
        Line::from(Span::styled(hint, Theme::dimmed())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Theme::error())
            .title(Span::styled(format!(" ✗ {} ", banner.label), Theme::error()))
            .style(Style::default().bg(Theme::BACKGROUND)),
    );
    frame.render_widget(body, popup);
}
