//! Schroeder reverb: four parallel comb filters into two series allpasses.
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Out
//!         └──→ [Comb 4] ──┘
//! ```
//!
//! Comb delay times are mutually prime so their echo trains never line up
//! into a metallic ring. The control surface exposes the tail as a decay
//! time in seconds; each comb converts that to feedback with the RT60
//! relation `fb = 10^(-3 * delay / decay)` (the gain that loses 60 dB over
//! the decay time).

/// Max comb filter delay: 50ms at 192kHz.
const MAX_COMB_DELAY: usize = 9600;
/// Max allpass filter delay: 10ms at 192kHz.
const MAX_ALLPASS_DELAY: usize = 1920;

const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];

struct CombFilter {
    buffer: [f32; MAX_COMB_DELAY],
    delay_samples: usize,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: [0.0; MAX_COMB_DELAY],
            delay_samples: delay_samples.clamp(1, MAX_COMB_DELAY),
            write_pos: 0,
            feedback: 0.5,
            damp: 0.4,
            filter_state: 0.0,
        }
    }

    fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        // One-pole lowpass in the loop absorbs highs like air and walls do
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.delay_samples;

        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

struct AllpassFilter {
    buffer: [f32; MAX_ALLPASS_DELAY],
    delay_samples: usize,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    fn new(delay_samples: usize) -> Self {
        Self {
            buffer: [0.0; MAX_ALLPASS_DELAY],
            delay_samples: delay_samples.clamp(1, MAX_ALLPASS_DELAY),
            write_pos: 0,
            feedback: 0.5,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = input + self.feedback * output;
        self.write_pos = (self.write_pos + 1) % self.delay_samples;
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

pub struct SchroederReverb {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
    comb_delay_secs: [f32; 4],
}

impl SchroederReverb {
    pub fn new(sample_rate: f32) -> Self {
        let samples = |ms: f32| (ms * sample_rate / 1000.0) as usize;

        let mut reverb = Self {
            combs: [
                CombFilter::new(samples(COMB_DELAYS_MS[0])),
                CombFilter::new(samples(COMB_DELAYS_MS[1])),
                CombFilter::new(samples(COMB_DELAYS_MS[2])),
                CombFilter::new(samples(COMB_DELAYS_MS[3])),
            ],
            allpasses: [
                AllpassFilter::new(samples(ALLPASS_DELAYS_MS[0])),
                AllpassFilter::new(samples(ALLPASS_DELAYS_MS[1])),
            ],
            comb_delay_secs: [
                COMB_DELAYS_MS[0] / 1000.0,
                COMB_DELAYS_MS[1] / 1000.0,
                COMB_DELAYS_MS[2] / 1000.0,
                COMB_DELAYS_MS[3] / 1000.0,
            ],
        };
        reverb.set_decay(1.5);
        reverb
    }

    /// Set the tail length as an RT60 decay time in seconds.
    pub fn set_decay(&mut self, decay_secs: f32) {
        let decay_secs = decay_secs.max(0.05);
        for (comb, &delay_secs) in self.combs.iter_mut().zip(self.comb_delay_secs.iter()) {
            let feedback = 10.0_f32.powf(-3.0 * delay_secs / decay_secs);
            comb.set_feedback(feedback);
        }
    }

    /// Process one input sample, returning the wet signal only.
    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let mut wet = 0.0;
        for comb in &mut self.combs {
            wet += comb.process(input);
        }
        wet *= 0.25;

        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        wet
    }

    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}
