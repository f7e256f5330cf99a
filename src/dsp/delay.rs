use crate::MAX_DELAY_SAMPLES;

/// Circular delay line, pre-allocated at the maximum supported length so
/// changing the delay time on the audio thread never allocates.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new() -> Self {
        Self {
            buffer: vec![0.0; MAX_DELAY_SAMPLES],
            write_pos: 0,
        }
    }

    /// Write one sample and advance.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % MAX_DELAY_SAMPLES;
    }

    /// Read at an integral delay behind the write head.
    #[inline]
    pub fn read(&self, delay_samples: usize) -> f32 {
        let delay_samples = delay_samples.min(MAX_DELAY_SAMPLES - 1);
        let read_pos = (self.write_pos + MAX_DELAY_SAMPLES - delay_samples) % MAX_DELAY_SAMPLES;
        self.buffer[read_pos]
    }

    /// Read at a fractional delay with linear interpolation. Smooth delay
    /// modulation (chorus, pitch shifting) needs this; stepping between
    /// integral delays would zipper.
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let delay_samples = delay_samples.clamp(1.0, (MAX_DELAY_SAMPLES - 2) as f32);
        let whole = delay_samples as usize;
        let frac = delay_samples - whole as f32;

        let a = self.read(whole);
        let b = self.read(whole + 1);
        a * (1.0 - frac) + b * frac
    }

    /// Fixed-delay in-place processing: write the input, output the echo.
    pub fn render(&mut self, buffer: &mut [f32], delay_samples: usize) {
        for sample in buffer.iter_mut() {
            let delayed = self.read(delay_samples);
            self.write(*sample);
            *sample = delayed;
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_comes_back_after_delay() {
        let mut line = DelayLine::new();
        let delay = 10;

        line.write(1.0);
        for _ in 0..delay - 1 {
            line.write(0.0);
        }
        assert_eq!(line.read(delay), 1.0);
    }

    #[test]
    fn test_render_shifts_signal() {
        let mut line = DelayLine::new();
        let mut buffer = vec![0.0; 16];
        buffer[0] = 1.0;
        line.render(&mut buffer, 4);
        assert_eq!(buffer[0], 0.0);
        assert_eq!(buffer[4], 1.0);
    }

    #[test]
    fn test_interpolated_read_blends_neighbors() {
        let mut line = DelayLine::new();
        line.write(1.0);
        line.write(0.0);
        // Half a sample between the two writes
        let mid = line.read_interpolated(1.5);
        assert!((mid - 0.5).abs() < 1e-6, "expected 0.5, got {}", mid);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut line = DelayLine::new();
        line.write(0.7);
        line.reset();
        assert_eq!(line.read(1), 0.0);
    }
}
