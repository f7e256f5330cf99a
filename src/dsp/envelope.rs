use crate::MIN_TIME;

/*
Envelope
========

Linear gate-driven envelope, used twice per voice:

  amplitude   adsr(2ms, -, 1.0, 8ms)   fast attack, full sustain while the
              gate is open, short release so back-to-back sixteenths stay
              distinct without clicking.

  filter      adsr(1ms, decay, 0.0, decay)   near-instant attack, then a
              decay straight down to zero - the 303's famous sweep. The
              decay knob retunes this live via set_decay().

The state machine:

    Idle --note_on--> Attack --level=1--> Decay --level=S--> Sustain
      ^                  |                  |                   |
      |                  +----- note_off ---+---- note_off -----+
      |                                 |
      +------- level=0 ------------- Release

note_off starts Release from the CURRENT level, whatever stage we are in,
which is what keeps short gates click-free. note_on always restarts from
zero so repeated notes retrigger cleanly instead of sounding tied.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    sample_rate: f32,

    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    stage: EnvelopeStage,
    level: f32,
    decay_start_level: f32,

    // Release interpolates from a snapshot so it lands exactly on zero.
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn adsr(sample_rate: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            sample_rate,
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),

            stage: EnvelopeStage::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    /// Retune the decay live. Takes effect immediately; an in-flight decay
    /// simply continues at the new rate.
    pub fn set_decay(&mut self, decay: f32) {
        self.decay_time = decay.max(MIN_TIME);
    }

    pub fn set_release(&mut self, release: f32) {
        self.release_time = release.max(MIN_TIME);
    }

    /// Gate high: restart the attack from zero.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: release from the current level.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * self.sample_rate)
            .round()
            .max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                self.level += 1.0 / (self.attack_time * self.sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                self.level -= total_drop / (self.decay_time * self.sample_rate);
                if self.level <= target {
                    self.level = target;
                    self.stage = if target > 0.0 {
                        EnvelopeStage::Sustain
                    } else {
                        EnvelopeStage::Idle
                    };
                }
            }

            EnvelopeStage::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeStage::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_start_level = 0.0;
        self.release_elapsed_samples = 0;
    }
}
