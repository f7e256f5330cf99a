//! FFT spectrum widget with log-spaced bins.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

const SPECTRUM_BINS: usize = 48;
const FLOOR_DB: f64 = -100.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    /// Hann window, same length as the FFT
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bin index sampled for each display bin
    bin_indices: Vec<usize>,
    /// (frequency_hz, magnitude_db) per display bin
    spectrum: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, sample_rate: f32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let denom = fft_size.saturating_sub(1).max(1) as f32;
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
            .collect();

        // log spacing from the bass end up to Nyquist
        let min_freq = 30.0f64;
        let max_freq = (sample_rate as f64 / 2.0).max(min_freq + 1.0);
        let ratio = max_freq / min_freq;
        let half = (fft_size / 2).max(1);

        let mut bin_indices = Vec::with_capacity(SPECTRUM_BINS);
        let mut spectrum = Vec::with_capacity(SPECTRUM_BINS);
        for i in 0..SPECTRUM_BINS {
            let t = i as f64 / (SPECTRUM_BINS - 1) as f64;
            let freq = min_freq * ratio.powf(t);
            let index = ((freq * fft_size as f64 / sample_rate as f64).round() as usize)
                .min(half - 1);
            bin_indices.push(index);
            spectrum.push((freq, FLOOR_DB));
        }

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            bin_indices,
            spectrum,
        }
    }

    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }
        for (slot, (&sample, &w)) in self
            .scratch
            .iter_mut()
            .zip(buffer.iter().zip(self.window.iter()))
        {
            slot.re = sample * w;
            slot.im = 0.0;
        }
        self.fft.process(&mut self.scratch);

        for (i, &idx) in self.bin_indices.iter().enumerate() {
            let bin = self.scratch[idx];
            let power = (bin.re * bin.re + bin.im * bin.im).max(1e-12) as f64;
            self.spectrum[i].1 = (10.0 * power.log10()).max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)]) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    // plot against bin position so the log spacing reads evenly
    let data: Vec<(f64, f64)> = spectrum
        .iter()
        .enumerate()
        .map(|(i, &(_, db))| (i as f64, db))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, (spectrum.len().max(2) - 1) as f64])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 10.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
