//! Device list panel

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, InputMode};
use crate::models::Device;
use crate::ui::Theme;
use crate::worker::JobKind;

/// One row: cursor marker, target marker, name, address, model
pub fn device_line<'a>(device: &'a Device, highlighted: bool, is_target: bool) -> Line<'a> {
    let marker = if highlighted { "▸ " } else { "  " };
    let target = if is_target { "● " } else { "  " };

    let mut spans = vec![
        Span::styled(marker, Theme::keybind()),
        Span::styled(target, Theme::cast_target()),
        Span::styled(
            device.name.as_str(),
            if highlighted {
                Theme::list_item_selected()
            } else {
                Theme::text()
            },
        ),
        Span::raw(" "),
        Span::styled(device.identifier.as_str(), Theme::dimmed()),
    ];
    if let Some(model) = &device.model {
        spans.push(Span::styled(format!("  {}", model), Theme::dimmed()));
    }
    Line::from(spans)
}

/// Render the registry's devices, marking the cursor and the cast target
pub fn render_devices(frame: &mut Frame, area: Rect, app: &App) {
    let devices = app.registry().devices();
    let focused = app.input_mode == InputMode::Normal;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if focused {
            Theme::border_focused()
        } else {
            Theme::border()
        })
        .title(Span::styled(
            format!(" DEVICES ({}) ", devices.len()),
            Theme::title(),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if devices.is_empty() {
        let text = if scanning(app) {
            Line::from(Span::styled("⟳ Scanning...", Theme::loading()))
        } else {
            Line::from(vec![
                Span::styled("No devices. Press ", Theme::dimmed()),
                Span::styled("r", Theme::keybind()),
                Span::styled(" to scan.", Theme::dimmed()),
            ])
        };
        let empty = Paragraph::new(vec![Line::from(""), text]).alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let target = app.controller().target();
    let items: Vec<ListItem> = devices
        .iter()
        .enumerate()
        .map(|(i, device)| {
            let is_target = target.is_some_and(|t| t.identifier == device.identifier);
            ListItem::new(device_line(device, i == app.devices.selected, is_target))
        })
        .collect();

    let list = List::new(items).style(Theme::text());
    frame.render_widget(list, inner);
}

fn scanning(app: &App) -> bool {
    app.in_flight() == Some(JobKind::Scan)
}
