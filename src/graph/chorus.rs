use std::f32::consts::TAU;

use crate::dsp::delay::DelayLine;

/*
Chorus
======

Thickens the mono voice by mixing in a slightly delayed copy whose delay
time wobbles under an LFO. The moving tap detunes the copy a few cents, so
one oscillator reads like several.

  rate   LFO speed in Hz (control surface: 0.01 - 4 Hz)
  depth  how far the tap swings, normalized 0.01 - 1.0 and scaled to a few
         milliseconds around the 20ms base delay

The wet mix is fixed; the knob set exposes rate and depth only. The delay
read is interpolated - integral-step tap movement would zipper audibly.
*/

const BASE_DELAY_MS: f32 = 20.0;
/// Full-depth tap swing in milliseconds.
const MAX_DEPTH_MS: f32 = 6.0;
const WET_MIX: f32 = 0.35;

pub struct Chorus {
    sample_rate: f32,
    delay_line: DelayLine,
    lfo_phase: f32,
    rate_hz: f32,
    depth: f32,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            delay_line: DelayLine::new(),
            lfo_phase: 0.0,
            rate_hz: 1.0,
            depth: 0.3,
        }
    }

    pub fn set_rate(&mut self, rate_hz: f32) {
        self.rate_hz = rate_hz.clamp(0.01, 10.0);
    }

    /// Normalized depth, 0.01 (barely moving) to 1.0 (full swing).
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.01, 1.0);
    }

    pub fn render(&mut self, out: &mut [f32]) {
        let phase_inc = self.rate_hz / self.sample_rate;
        let base_delay = BASE_DELAY_MS * self.sample_rate / 1000.0;
        let swing = self.depth * MAX_DEPTH_MS * self.sample_rate / 1000.0;

        for sample in out.iter_mut() {
            let lfo = (self.lfo_phase * TAU).sin();
            let delay_samples = (base_delay + lfo * swing).max(1.0);

            let wet = self.delay_line.read_interpolated(delay_samples);
            self.delay_line.write(*sample);

            *sample = *sample * (1.0 - WET_MIX) + wet * WET_MIX;

            self.lfo_phase += phase_inc;
            if self.lfo_phase >= 1.0 {
                self.lfo_phase -= 1.0;
            }
        }
    }

    pub fn reset(&mut self) {
        self.delay_line.reset();
        self.lfo_phase = 0.0;
    }
}
