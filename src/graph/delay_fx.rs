use crate::dsp::delay::DelayLine;

/// Feedback delay echo.
///
/// The feedback path is inside the loop (`write(input + echo * feedback)`),
/// so each repeat is quieter than the last as long as feedback stays below
/// unity - which the parameter mapping guarantees (cap at 0.85). Delay time
/// changes land on an interpolated read, so sweeping the knob pitch-bends
/// the echoes instead of crackling.
pub struct FeedbackDelay {
    sample_rate: f32,
    line: DelayLine,
    time_secs: f32,
    feedback: f32,
}

/// Dry/wet blend of the echo return. Fixed by design; the knob set exposes
/// time and feedback.
const WET_MIX: f32 = 0.30;

/// Below ~1ms the delay reads inside the interpolation window of its own
/// write head; treat that as "off".
const MIN_TIME_S: f32 = 0.001;

impl FeedbackDelay {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            line: DelayLine::new(),
            time_secs: 0.25,
            feedback: 0.3,
        }
    }

    pub fn set_time(&mut self, secs: f32) {
        self.time_secs = secs.clamp(0.0, 1.0);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.95);
    }

    pub fn render(&mut self, out: &mut [f32]) {
        if self.time_secs < MIN_TIME_S {
            // Keep the line warm so re-enabling does not replay stale audio
            for sample in out.iter_mut() {
                self.line.write(*sample);
            }
            return;
        }

        let delay_samples = self.time_secs * self.sample_rate;
        for sample in out.iter_mut() {
            let echo = self.line.read_interpolated(delay_samples);
            self.line.write(*sample + echo * self.feedback);
            *sample += echo * WET_MIX;
        }
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }
}
