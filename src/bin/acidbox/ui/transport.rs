//! Transport bar: play state, tempo, selected knob, and status text.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" acidbox ").borders(Borders::ALL);

    let engine = app.engine();
    let (play_symbol, play_color) = if engine.is_running() {
        ("▶ playing", Color::Green)
    } else {
        ("■ stopped", Color::Yellow)
    };

    let param = app.selected_param();
    let line = Line::from(vec![
        Span::styled(
            format!(" {}  ", play_symbol),
            Style::default().fg(play_color),
        ),
        Span::styled(
            format!("{:.0} bpm  ", engine.tempo()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{}: {:.2}  ", param, engine.parameter(param)),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            app.status().to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
