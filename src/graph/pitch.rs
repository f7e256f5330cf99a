use std::f32::consts::PI;

use crate::dsp::delay::DelayLine;

/*
Pitch Shifter
=============

Granular (dual-tap) pitch shifter: the same modulated-delay trick as the
chorus, pushed further. A delay tap moving away from the write head plays
the signal back slower (pitch down); a tap moving toward it plays faster
(pitch up). One moving tap alone clicks every time it wraps back to the
start of its travel, so two taps run half a window apart and crossfade
under a sine window - one fades out exactly while the other passes its
wrap point.

    ratio  playback speed, 2^(semitones/12)
    window travel length; 50ms trades warble against transient smearing

Near zero semitones the shifter bypasses entirely (while still feeding its
delay line) so a centered pitch knob is truly transparent.
*/

/// Tap travel window in seconds.
const WINDOW_S: f32 = 0.050;
/// Keep the tap off the write head.
const MIN_DELAY_SAMPLES: f32 = 2.0;
/// Below this shift, bypass.
const BYPASS_SEMITONES: f32 = 0.01;

pub struct PitchShifter {
    delay_line: DelayLine,
    window_samples: f32,
    semitones: f32,
    ratio: f32,
    /// Normalized position of tap A in its travel window, [0, 1).
    phase: f32,
}

impl PitchShifter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            delay_line: DelayLine::new(),
            window_samples: WINDOW_S * sample_rate,
            semitones: 0.0,
            ratio: 1.0,
            phase: 0.0,
        }
    }

    pub fn set_semitones(&mut self, semitones: f32) {
        self.semitones = semitones.clamp(-12.0, 12.0);
        self.ratio = 2.0_f32.powf(self.semitones / 12.0);
    }

    pub fn render(&mut self, out: &mut [f32]) {
        // Per-sample phase advance; sign decides which way the taps travel.
        let phase_inc = (1.0 - self.ratio) / self.window_samples;
        let bypass = self.semitones.abs() < BYPASS_SEMITONES;

        for sample in out.iter_mut() {
            self.delay_line.write(*sample);

            if bypass {
                continue;
            }

            let phase_a = self.phase;
            let phase_b = (self.phase + 0.5).fract();

            let delay_a = MIN_DELAY_SAMPLES + phase_a * self.window_samples;
            let delay_b = MIN_DELAY_SAMPLES + phase_b * self.window_samples;

            // Sine windows: each tap is silent at its wrap point
            let gain_a = (phase_a * PI).sin();
            let gain_b = (phase_b * PI).sin();

            let a = self.delay_line.read_interpolated(delay_a);
            let b = self.delay_line.read_interpolated(delay_b);
            *sample = a * gain_a + b * gain_b;

            self.phase = (self.phase + phase_inc).rem_euclid(1.0);
        }
    }

    pub fn reset(&mut self) {
        self.delay_line.reset();
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    /// Count zero crossings as a cheap frequency estimate.
    fn zero_crossings(buffer: &[f32]) -> usize {
        buffer
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count()
    }

    fn sine_buffer(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * freq * std::f32::consts::TAU / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn test_zero_shift_is_transparent() {
        let mut shifter = PitchShifter::new(SAMPLE_RATE);
        shifter.set_semitones(0.0);
        let mut buffer = sine_buffer(220.0, 1024);
        let original = buffer.clone();
        shifter.render(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_octave_up_doubles_frequency() {
        let mut shifter = PitchShifter::new(SAMPLE_RATE);
        shifter.set_semitones(12.0);

        let mut buffer = sine_buffer(220.0, 48_000);
        shifter.render(&mut buffer);

        // Skip the first window while the taps fill with history
        let settled = &buffer[9_600..];
        let crossings = zero_crossings(settled) as f32;
        let secs = settled.len() as f32 / SAMPLE_RATE;
        let est_freq = crossings / secs;
        assert!(
            (est_freq - 440.0).abs() < 44.0,
            "expected ~440 Hz, estimated {}",
            est_freq
        );
    }

    #[test]
    fn test_octave_down_halves_frequency() {
        let mut shifter = PitchShifter::new(SAMPLE_RATE);
        shifter.set_semitones(-12.0);

        let mut buffer = sine_buffer(440.0, 48_000);
        shifter.render(&mut buffer);

        let settled = &buffer[9_600..];
        let crossings = zero_crossings(settled) as f32;
        let secs = settled.len() as f32 / SAMPLE_RATE;
        let est_freq = crossings / secs;
        assert!(
            (est_freq - 220.0).abs() < 30.0,
            "expected ~220 Hz, estimated {}",
            est_freq
        );
    }

    #[test]
    fn test_semitones_clamped_to_range() {
        let mut shifter = PitchShifter::new(SAMPLE_RATE);
        shifter.set_semitones(36.0);
        assert_eq!(shifter.semitones, 12.0);
        shifter.set_semitones(-36.0);
        assert_eq!(shifter.semitones, -12.0);
    }

    #[test]
    fn test_output_bounded() {
        let mut shifter = PitchShifter::new(SAMPLE_RATE);
        shifter.set_semitones(7.0);
        let mut buffer = sine_buffer(110.0, 24_000);
        shifter.render(&mut buffer);
        assert!(buffer.iter().all(|s| s.abs() < 2.5 && s.is_finite()));
    }
}
