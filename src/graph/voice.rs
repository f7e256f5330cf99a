use crate::dsp::envelope::Envelope;
use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::graph::db_to_gain;
use crate::pattern::Note;

/*
The Voice
=========

One oscillator, one filter, two envelopes - the whole instrument is a single
monophonic voice. A new trigger while the previous note is still releasing
retriggers this voice; nothing is ever allocated per note.

    saw/square ──→ lowpass SVF ──→ × amp envelope ──→ out
                       ↑
               filter envelope × env-mod depth (octaves)

The filter envelope sweeps the effective cutoff up from the base setting by
up to `env_mod` octaves and falls back at the decay rate. Accented steps get
the classic kick: deeper envelope sweep, a resonance push, and the accent
gain applied to that one note. The boost state lives here (and only here),
set when an accented step triggers and reverted at the next non-accented
trigger - no asynchronous ramp-back, so the voice has always fully settled
before the next step sounds.
*/

/// Gate length class for a triggered step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Sixteenth-note gate: the normal staccato step.
    Short,
    /// Eighth-note gate, used for slides: the note holds into the next step
    /// for a legato feel.
    Long,
}

/// Extra envelope depth on accented steps, as a multiplier on env-mod.
const ACCENT_ENV_BOOST: f32 = 1.35;
/// Resonance push on accented steps, as a multiplier on the base Q.
const ACCENT_Q_BOOST: f32 = 1.5;

const AMP_ATTACK_S: f32 = 0.002;
const AMP_RELEASE_S: f32 = 0.008;
const FILTER_ATTACK_S: f32 = 0.001;

pub struct MonoVoice {
    sample_rate: f32,
    osc: Oscillator,
    filter: SVFilter,
    amp_env: Envelope,
    filter_env: Envelope,

    // Base settings from the control surface
    env_mod_octaves: f32,
    base_q: f32,
    accent_gain_db: f32,

    // Per-note state, owned exclusively by trigger()
    accent_active: bool,
    note_gain: f32,
    gate_remaining: u32,

    /// Current sixteenth-note duration in seconds, kept in sync with the
    /// transport tempo by the render core.
    step_secs: f32,
}

impl MonoVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            osc: Oscillator::new(Waveform::Saw, sample_rate),
            filter: SVFilter::lowpass(sample_rate, 1_000.0),
            // Full sustain while the gate is open; short release keeps
            // back-to-back sixteenths distinct without clicking.
            amp_env: Envelope::adsr(sample_rate, AMP_ATTACK_S, 0.010, 1.0, AMP_RELEASE_S),
            // Zero sustain: the sweep always falls back to the base cutoff.
            filter_env: Envelope::adsr(sample_rate, FILTER_ATTACK_S, 0.200, 0.0, 0.200),
            env_mod_octaves: 3.5,
            base_q: 0.0,
            accent_gain_db: 0.0,
            accent_active: false,
            note_gain: 1.0,
            gate_remaining: 0,
            step_secs: 0.125, // 120 BPM until the transport says otherwise
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.filter.set_cutoff(cutoff_hz);
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.base_q = q.clamp(0.0, 30.0);
        self.filter.set_resonance(self.effective_q());
    }

    pub fn set_env_mod(&mut self, octaves: f32) {
        self.env_mod_octaves = octaves.clamp(0.0, 7.0);
    }

    pub fn set_decay(&mut self, secs: f32) {
        self.filter_env.set_decay(secs);
        self.filter_env.set_release(secs);
    }

    pub fn set_accent_gain_db(&mut self, db: f32) {
        self.accent_gain_db = db;
    }

    pub fn set_step_duration(&mut self, secs: f32) {
        self.step_secs = secs.max(0.001);
    }

    fn effective_q(&self) -> f32 {
        if self.accent_active {
            (self.base_q * ACCENT_Q_BOOST).min(30.0)
        } else {
            self.base_q
        }
    }

    /// Start (or retrigger) the voice.
    ///
    /// Accent state is decided here and nowhere else: an accented trigger
    /// arms the boost, and the next non-accented trigger reverts everything
    /// to the pattern's base modulation amount.
    pub fn trigger(&mut self, note: Note, gate: Gate, accented: bool) {
        self.osc.set_freq(note.freq_hz());

        self.accent_active = accented;
        self.note_gain = if accented {
            db_to_gain(self.accent_gain_db)
        } else {
            1.0
        };
        self.filter.set_resonance(self.effective_q());

        let gate_secs = match gate {
            Gate::Short => self.step_secs,
            Gate::Long => self.step_secs * 2.0,
        };
        self.gate_remaining = (gate_secs * self.sample_rate).round().max(1.0) as u32;

        self.amp_env.note_on();
        self.filter_env.note_on();
    }

    pub fn render(&mut self, out: &mut [f32]) {
        let depth = if self.accent_active {
            self.env_mod_octaves * ACCENT_ENV_BOOST
        } else {
            self.env_mod_octaves
        };
        let base_cutoff = self.filter.cutoff_hz();

        for sample in out.iter_mut() {
            if self.gate_remaining > 0 {
                self.gate_remaining -= 1;
                if self.gate_remaining == 0 {
                    self.amp_env.note_off();
                    self.filter_env.note_off();
                }
            }

            let raw = self.osc.next_sample();
            let sweep = self.filter_env.next_sample();
            let cutoff = base_cutoff * 2.0_f32.powf(sweep * depth);
            let filtered = self.filter.next_sample_at(raw, cutoff);

            *sample = filtered * self.amp_env.next_sample() * self.note_gain;
        }
    }

    pub fn is_active(&self) -> bool {
        self.amp_env.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn energy(buffer: &[f32]) -> f32 {
        buffer.iter().map(|s| s * s).sum()
    }

    fn render_secs(voice: &mut MonoVoice, secs: f32) -> Vec<f32> {
        let mut buffer = vec![0.0; (secs * SAMPLE_RATE) as usize];
        voice.render(&mut buffer);
        buffer
    }

    #[test]
    fn test_inactive_voice_is_silent() {
        let mut voice = MonoVoice::new(SAMPLE_RATE);
        let buffer = render_secs(&mut voice, 0.1);
        assert_eq!(energy(&buffer), 0.0);
        assert!(!voice.is_active());
    }

    #[test]
    fn test_short_gate_releases_within_step() {
        let mut voice = MonoVoice::new(SAMPLE_RATE);
        voice.set_step_duration(0.125); // 120 BPM sixteenth
        voice.trigger(Note(36), Gate::Short, false);
        // After gate + release + slack the envelope must be idle
        render_secs(&mut voice, 0.125 + 0.05);
        assert!(!voice.is_active(), "short gate should have released");
    }

    #[test]
    fn test_long_gate_outlasts_short() {
        let mut short = MonoVoice::new(SAMPLE_RATE);
        short.set_step_duration(0.125);
        short.trigger(Note(36), Gate::Short, false);
        render_secs(&mut short, 0.15);

        let mut long = MonoVoice::new(SAMPLE_RATE);
        long.set_step_duration(0.125);
        long.trigger(Note(36), Gate::Long, false);
        render_secs(&mut long, 0.15);

        assert!(!short.is_active());
        assert!(long.is_active(), "eighth-note gate should still be open");
    }

    #[test]
    fn test_accent_is_louder() {
        let mut plain = MonoVoice::new(SAMPLE_RATE);
        plain.set_accent_gain_db(6.0);
        plain.trigger(Note(36), Gate::Short, false);
        let plain_energy = energy(&render_secs(&mut plain, 0.1));

        let mut accented = MonoVoice::new(SAMPLE_RATE);
        accented.set_accent_gain_db(6.0);
        accented.trigger(Note(36), Gate::Short, true);
        let accent_energy = energy(&render_secs(&mut accented, 0.1));

        assert!(
            accent_energy > plain_energy * 1.5,
            "accent should boost level: {} vs {}",
            accent_energy,
            plain_energy
        );
    }

    #[test]
    fn test_accent_reverts_on_next_plain_note() {
        let mut voice = MonoVoice::new(SAMPLE_RATE);
        voice.set_resonance(10.0);
        voice.trigger(Note(36), Gate::Short, true);
        render_secs(&mut voice, 0.05);
        // Accented note is sounding with boosted Q
        assert!(voice.filter.resonance() > 10.0);

        voice.trigger(Note(36), Gate::Short, false);
        // Fully settled: base modulation restored synchronously at trigger
        assert_eq!(voice.filter.resonance(), 10.0);
    }

    #[test]
    fn test_retrigger_is_monophonic() {
        let mut voice = MonoVoice::new(SAMPLE_RATE);
        voice.trigger(Note(36), Gate::Long, false);
        render_secs(&mut voice, 0.01);
        voice.trigger(Note(48), Gate::Short, false);
        let buffer = render_secs(&mut voice, 0.05);
        // Still one voice: output bounded as a single note, not a sum
        let peak = buffer.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(peak < 2.0, "retrigger must not stack voices: {}", peak);
        assert!(voice.is_active());
    }

    #[test]
    fn test_pitch_follows_note() {
        let mut voice = MonoVoice::new(SAMPLE_RATE);
        voice.trigger(Note(48), Gate::Short, false);
        assert!((voice.osc.freq_hz() - Note(48).freq_hz()).abs() < 0.01);
        voice.trigger(Note(60), Gate::Short, false);
        assert!((voice.osc.freq_hz() - Note(60).freq_hz()).abs() < 0.01);
    }
}
