//! Session panel
//!
//! Shows the tracked cast (target, URL, state, last error), the receiver's
//! last reported status and the transport keys.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::models::PlaybackStatus;
use crate::session::CastController;
use crate::ui::Theme;

/// Key hints shown under the session details
const CONTROLS: &[(&str, &str)] = &[
    ("c", "cast"),
    ("space", "pause/resume"),
    ("s", "stop"),
    ("S", "stop all"),
    ("←→", "seek"),
    ("t", "seek to"),
    ("+-", "volume"),
    ("v", "set volume"),
    ("m", "mute"),
    ("n", "skip"),
    ("e", "queue"),
    ("i", "status"),
];

/// "01:23 / 09:56" style label for the gauge
pub fn time_label(status: &PlaybackStatus) -> String {
    format!("{} / {}", status.format_position(), status.format_duration())
}

fn session_lines(controller: &CastController) -> Vec<Line<'static>> {
    let target = match controller.target() {
        Some(device) => Span::styled(device.to_string(), Theme::cast_target()),
        None => Span::styled("none (select with ↵)", Theme::dimmed()),
    };

    let mut lines = vec![
        Line::from(vec![Span::styled("Target  ", Theme::dimmed()), target]),
        Line::from(vec![
            Span::styled("State   ", Theme::dimmed()),
            Span::styled(
                controller.state().to_string(),
                Theme::session_state(controller.state()),
            ),
        ]),
    ];

    if let Some(session) = controller.session() {
        lines.push(Line::from(vec![
            Span::styled("Media   ", Theme::dimmed()),
            Span::styled(session.media_url.clone(), Theme::text()),
        ]));
        if controller.is_serving() {
            lines.push(Line::from(vec![
                Span::styled("Source  ", Theme::dimmed()),
                Span::styled("local file, served by catt", Theme::text()),
            ]));
        }
        let elsewhere = controller
            .target()
            .map_or(true, |t| t.identifier != session.device.identifier);
        if elsewhere {
            lines.push(Line::from(vec![
                Span::styled("On      ", Theme::dimmed()),
                Span::styled(session.device.to_string(), Theme::text()),
            ]));
        }
    }

    if let Some(err) = controller.last_error() {
        lines.push(Line::from(vec![
            Span::styled("Error   ", Theme::dimmed()),
            Span::styled(err.to_string(), Theme::error()),
        ]));
    }

    lines
}

fn status_lines(status: &PlaybackStatus) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled("Receiver ", Theme::dimmed()),
        Span::styled(status.state.to_string(), Theme::player_state(status.state)),
    ])];
    if let Some(title) = &status.title {
        lines.push(Line::from(Span::styled(title.clone(), Theme::title())));
    }
    if let Some(volume) = status.volume {
        let muted = if status.muted { " (muted)" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("Volume {}%{}", volume, muted),
            Theme::text(),
        )));
    }
    lines
}

fn controls_line() -> Line<'static> {
    let spans = CONTROLS
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(format!(" {} ", key), Theme::keybind()),
                Span::styled(format!("{} ", desc), Theme::keybind_desc()),
            ]
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

/// Render the session panel
pub fn render_player(frame: &mut Frame, area: Rect, app: &App) {
    let controller = app.controller();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border())
        .title(Span::styled(" SESSION ", Theme::title()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let status = controller.status();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),                                         // Details
            Constraint::Length(if status.is_some() { 1 } else { 0 }), // Progress
            Constraint::Length(2),                                      // Controls
        ])
        .split(inner);

    let mut lines = session_lines(controller);
    if let Some(status) = status {
        lines.push(Line::from(""));
        lines.extend(status_lines(status));
    }
    let details = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(details, chunks[0]);

    if let Some(status) = status {
        let gauge = Gauge::default()
            .gauge_style(Theme::progress_bar())
            .ratio(status.progress())
            .label(time_label(status));
        frame.render_widget(gauge, chunks[1]);
    }

    let controls = Paragraph::new(controls_line()).wrap(Wrap { trim: true });
    frame.render_widget(controls, chunks[2]);
}
