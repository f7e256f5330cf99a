//! Oscilloscope widget over the scope tap.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

pub fn render_waveform(frame: &mut Frame, area: Rect, audio_buffer: &[f32], intensity: f32) {
    let block = Block::default().title(" Waveform ").borders(Borders::ALL);

    let data: Vec<(f64, f64)> = audio_buffer
        .iter()
        .enumerate()
        .map(|(i, &sample)| (i as f64 / audio_buffer.len().max(1) as f64, sample as f64))
        .collect();

    // trace brightens with output level
    let color = if intensity > 0.25 {
        Color::LightCyan
    } else if intensity > 0.05 {
        Color::Cyan
    } else {
        Color::Blue
    };

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-1.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
