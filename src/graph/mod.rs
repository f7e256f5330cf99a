//! The fixed signal chain.
//!
//! Topology is a configuration decision made exactly once, here:
//!
//! ```text
//! voice (osc -> envelope-modulated lowpass)
//!   -> chorus -> pitch shift -> delay -> reverb -> output gain -> meter tap
//! ```
//!
//! All nodes are constructed once when the engine comes up and never
//! recreated; parameter changes retune them in place. Everything in this
//! module runs on the audio thread, so no method on the render path may
//! allocate, lock, or log.

/// Chorus: modulated-delay thickener.
pub mod chorus;
/// Feedback delay echo.
pub mod delay_fx;
/// Output level metering and the sample scope tap.
pub mod meter;
/// Granular pitch shifter.
pub mod pitch;
/// The monophonic 303 voice.
pub mod voice;

use crate::dsp::oscillator::Waveform;
use crate::dsp::reverb::SchroederReverb;
use crate::params::Param;
use crate::pattern::Note;

use chorus::Chorus;
use delay_fx::FeedbackDelay;
pub use meter::{meter_pair, scope_pair, MeterHandle, ScopeReader};
use meter::{OutputMeter, ScopeTap};
use pitch::PitchShifter;
pub use voice::Gate;
use voice::MonoVoice;

/// Dry/wet blend for the reverb return. Fixed: the control surface exposes
/// tail length, not mix.
const REVERB_MIX: f32 = 0.22;

#[inline]
pub(crate) fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Anything that can be handed a note trigger. The sequencer talks to the
/// graph through this seam, which also lets tests record triggers without
/// any audio machinery behind them.
pub trait NoteSink {
    fn trigger_note(&mut self, note: Note, gate: Gate, accented: bool);
}

pub struct AudioGraph {
    voice: MonoVoice,
    chorus: Chorus,
    pitch: PitchShifter,
    delay: FeedbackDelay,
    reverb: SchroederReverb,
    output_gain: f32,
    meter: OutputMeter,
    scope: Option<ScopeTap>,
}

impl AudioGraph {
    pub fn new(sample_rate: f32, meter: OutputMeter, scope: Option<ScopeTap>) -> Self {
        let mut graph = Self {
            voice: MonoVoice::new(sample_rate),
            chorus: Chorus::new(sample_rate),
            pitch: PitchShifter::new(sample_rate),
            delay: FeedbackDelay::new(sample_rate),
            reverb: SchroederReverb::new(sample_rate),
            output_gain: 1.0,
            meter,
            scope,
        };
        // Nodes come up at the front panel's power-on knob positions.
        for param in Param::ALL {
            graph.set_param(param, param.map(param.default_normalized()));
        }
        graph
    }

    /// Route a physical-unit parameter value to the node that owns it.
    /// Runs on the audio thread between blocks; must not block or allocate.
    pub fn set_param(&mut self, param: Param, physical: f32) {
        match param {
            Param::Cutoff => self.voice.set_cutoff(physical),
            Param::Resonance => self.voice.set_resonance(physical),
            Param::EnvMod => self.voice.set_env_mod(physical),
            Param::Decay => self.voice.set_decay(physical),
            Param::Accent => self.voice.set_accent_gain_db(physical),
            Param::Volume => self.output_gain = db_to_gain(physical),
            Param::DelayTime => self.delay.set_time(physical),
            Param::DelayFeedback => self.delay.set_feedback(physical),
            Param::ReverbDecay => self.reverb.set_decay(physical),
            Param::Pitch => self.pitch.set_semitones(physical),
            Param::ChorusDepth => self.chorus.set_depth(physical),
            Param::ChorusFreq => self.chorus.set_rate(physical),
        }
    }

    /// Oscillator waveform switch: saw or square.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.voice.set_waveform(waveform);
    }

    /// Tell the voice how long a sixteenth note currently is, so gate
    /// lengths track the tempo. Called once per block by the render core.
    pub fn set_step_duration(&mut self, secs: f32) {
        self.voice.set_step_duration(secs);
    }

    /// Render one mono block through the whole chain.
    pub fn render_block(&mut self, out: &mut [f32]) {
        self.voice.render(out);
        self.chorus.render(out);
        self.pitch.render(out);
        self.delay.render(out);

        for sample in out.iter_mut() {
            let wet = self.reverb.next_sample(*sample);
            let mixed = *sample * (1.0 - REVERB_MIX) + wet * REVERB_MIX;
            *sample = mixed * self.output_gain;
        }

        self.meter.process(out);
        if let Some(scope) = &mut self.scope {
            scope.push(out);
        }
    }
}

impl NoteSink for AudioGraph {
    fn trigger_note(&mut self, note: Note, gate: Gate, accented: bool) {
        self.voice.trigger(note, gate, accented);
    }
}
