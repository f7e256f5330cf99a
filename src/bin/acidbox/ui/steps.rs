//! 16-step pattern grid.
//!
//! One cell per step: note name when active, a dot when not. The playhead
//! is highlighted while running, the edit cursor always.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use acidbox::pattern::PATTERN_LEN;

use crate::app::App;

pub fn render_steps(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Pattern ").borders(Borders::ALL);

    let engine = app.engine();
    let playhead = if engine.is_running() {
        // current_step() is the step about to play; the sounding one is
        // the step behind it
        Some((engine.current_step() + PATTERN_LEN - 1) % PATTERN_LEN)
    } else {
        None
    };

    let mut cells = Vec::with_capacity(PATTERN_LEN);
    let mut flags = Vec::with_capacity(PATTERN_LEN);
    for (i, step) in app.pattern().steps().iter().enumerate() {
        let label = if step.active {
            format!("{:>4}", step.note.to_string())
        } else {
            String::from("   ·")
        };

        let mut style = if step.active {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if playhead == Some(i) {
            style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
        }
        if app.cursor() == i {
            style = style.add_modifier(Modifier::REVERSED);
        }
        cells.push(Span::styled(label, style));

        let mut marks = String::from(" ");
        marks.push(if step.accent { 'A' } else { ' ' });
        marks.push(if step.slide { 'S' } else { ' ' });
        marks.push(' ');
        flags.push(Span::styled(marks, Style::default().fg(Color::Red)));
    }

    let paragraph = Paragraph::new(vec![Line::from(cells), Line::from(flags)]).block(block);
    frame.render_widget(paragraph, area);
}
