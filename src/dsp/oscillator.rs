/*
Oscillator
==========

The raw sound source. A 303-style voice wants exactly two waveforms:

Sawtooth: all harmonics, falling off as 1/n. The classic squelchy bass
          starting point - bright enough that the filter has something to
          carve into.

Square:   odd harmonics only. Hollower, rounder; the other switch position
          on the original hardware.

Both waveforms have hard edges, and a naive phase-accumulator rendition of a
hard edge aliases badly at bass-synth frequencies and above. We apply a
polyBLEP correction around each discontinuity: a two-sample polynomial that
cancels the worst of the foldback without the cost of wavetables or
oversampling.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Saw,
    Square,
}

pub struct Oscillator {
    waveform: Waveform,
    sample_rate: f32,
    /// Normalized phase in [0, 1).
    phase: f32,
    freq_hz: f32,
}

/// PolyBLEP correction for a discontinuity at phase 0.
/// `t` is the normalized phase [0, 1), `dt` the per-sample phase increment.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f32) -> Self {
        Self {
            waveform,
            sample_rate,
            phase: 0.0,
            freq_hz: 110.0,
        }
    }

    pub fn set_freq(&mut self, freq_hz: f32) {
        // Anything at or above Nyquist would alias into silence or noise.
        self.freq_hz = freq_hz.clamp(1.0, self.sample_rate * 0.45);
    }

    pub fn freq_hz(&self) -> f32 {
        self.freq_hz
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Reset phase for a clean retrigger.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let dt = self.freq_hz / self.sample_rate;

        let sample = match self.waveform {
            Waveform::Saw => {
                let mut s = 2.0 * self.phase - 1.0;
                s -= poly_blep(self.phase, dt);
                s
            }
            Waveform::Square => {
                let mut s = if self.phase < 0.5 { 1.0 } else { -1.0 };
                s += poly_blep(self.phase, dt);
                s -= poly_blep((self.phase + 0.5) % 1.0, dt);
                s
            }
        };

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn test_saw_output_bounded() {
        let mut osc = Oscillator::new(Waveform::Saw, SAMPLE_RATE);
        osc.set_freq(110.0);
        let mut buffer = vec![0.0; 4096];
        osc.render(&mut buffer);
        for &s in &buffer {
            assert!(s.abs() <= 1.5, "saw sample out of range: {}", s);
        }
    }

    #[test]
    fn test_saw_completes_cycles() {
        // At 1000 Hz and 48kHz, one cycle is 48 samples. Over 480 samples we
        // should see ten ramps, so the mean is near zero.
        let mut osc = Oscillator::new(Waveform::Saw, SAMPLE_RATE);
        osc.set_freq(1_000.0);
        let mut buffer = vec![0.0; 480];
        osc.render(&mut buffer);
        let mean: f32 = buffer.iter().sum::<f32>() / buffer.len() as f32;
        assert!(mean.abs() < 0.05, "saw mean too far from zero: {}", mean);
    }

    #[test]
    fn test_square_alternates() {
        let mut osc = Oscillator::new(Waveform::Square, SAMPLE_RATE);
        osc.set_freq(100.0);
        let mut buffer = vec![0.0; 960]; // two full cycles
        osc.render(&mut buffer);
        let positive = buffer.iter().filter(|&&s| s > 0.5).count();
        let negative = buffer.iter().filter(|&&s| s < -0.5).count();
        // Roughly half the time high, half low
        assert!(positive > 400 && negative > 400);
    }

    #[test]
    fn test_set_freq_clamps_above_nyquist() {
        let mut osc = Oscillator::new(Waveform::Saw, SAMPLE_RATE);
        osc.set_freq(96_000.0);
        assert!(osc.freq_hz() < SAMPLE_RATE / 2.0);
    }

    #[test]
    fn test_reset_restarts_phase() {
        let mut osc = Oscillator::new(Waveform::Saw, SAMPLE_RATE);
        osc.set_freq(220.0);
        let first = osc.next_sample();
        for _ in 0..37 {
            osc.next_sample();
        }
        osc.reset();
        assert_eq!(osc.next_sample(), first);
    }
}
