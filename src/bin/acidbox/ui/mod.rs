//! Terminal UI: step grid, knob readouts, and output visualization.

mod steps;
pub mod spectrum;
mod transport;
mod waveform;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use spectrum::render_spectrum;
use steps::render_steps;
use transport::render_transport;
use waveform::render_waveform;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport bar
            Constraint::Length(4), // step grid
            Constraint::Min(8),    // waveform
            Constraint::Length(9), // spectrum
            Constraint::Length(1), // help bar
        ])
        .split(frame.area());

    render_transport(frame, chunks[0], app);
    render_steps(frame, chunks[1], app);
    render_waveform(frame, chunks[2], app.audio_buffer(), app.engine().output_intensity());
    render_spectrum(frame, chunks[3], app.spectrum_data());

    let help = Paragraph::new(
        " [q] quit  [space] play  [+/-] tempo  [←→] step  [↑↓] pitch  \
         [enter] on/off  [a] accent  [s] slide  [o] wave  [tab j k] knobs  [w] save",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);
}
