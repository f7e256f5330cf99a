use std::str::FromStr;

use crate::error::EngineError;

/*
Parameter Mapping
=================

Every knob on the control surface stores a normalized value in [0, 1]. The
synthesis nodes want physical units (Hz, Q, dB, seconds, semitones), so each
parameter carries a mapping curve:

| param         | curve                    | physical range      |
| ------------- | ------------------------ | ------------------- |
| cutoff        | power-of-two exponential | 20 Hz - 12 kHz      |
| resonance     | power curve (exp 1.7)    | 0 - 30 (filter Q)   |
| envMod        | linear                   | 0 - 7 octaves       |
| decay         | linear                   | 20 ms - 320 ms      |
| accent        | linear, offset           | -20 dB - +10 dB     |
| volume        | linear                   | -60 dB - 0 dB       |
| delayTime     | linear                   | 0 - 750 ms          |
| delayFeedback | linear, capped           | 0 - 0.85            |
| reverbDecay   | linear, floored          | 0.1 s - 5 s         |
| pitch         | linear, bipolar          | -12 - +12 semitones |
| chorusDepth   | linear, floored          | 0.01 - 1.0          |
| chorusFreq    | linear, floored          | 0.01 Hz - 4 Hz      |

Cutoff and resonance get perceptual curves: an exponential cutoff sweep moves
through octaves at a constant knob rate, and the power curve keeps low
resonance settings controllable while still reaching self-oscillation
territory at the top. The floors and caps keep the effects out of degenerate
states: delay feedback stays below unity so the echo always dies out, and a
reverb tail can never collapse to zero length.

Out-of-range input saturates to [0, 1] instead of erroring; a wildly-dragged
knob should never interrupt audio.
*/

/// The fixed set of continuous controls exposed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Cutoff,
    Resonance,
    EnvMod,
    Decay,
    Accent,
    Volume,
    DelayTime,
    DelayFeedback,
    ReverbDecay,
    Pitch,
    ChorusDepth,
    ChorusFreq,
}

pub const PARAM_COUNT: usize = 12;

const CUTOFF_MIN_HZ: f32 = 20.0;
const CUTOFF_MAX_HZ: f32 = 12_000.0;
const RESONANCE_MAX_Q: f32 = 30.0;
const RESONANCE_EXP: f32 = 1.7;
const ENV_MOD_MAX_OCT: f32 = 7.0;
const DECAY_MIN_S: f32 = 0.020;
const DECAY_MAX_S: f32 = 0.320;
const ACCENT_MIN_DB: f32 = -20.0;
const ACCENT_MAX_DB: f32 = 10.0;
const VOLUME_MIN_DB: f32 = -60.0;
const DELAY_MAX_S: f32 = 0.750;
const FEEDBACK_MAX: f32 = 0.85;
const REVERB_MIN_S: f32 = 0.1;
const REVERB_MAX_S: f32 = 5.0;
const PITCH_RANGE_SEMIS: f32 = 12.0;
const CHORUS_DEPTH_MIN: f32 = 0.01;
const CHORUS_FREQ_MIN_HZ: f32 = 0.01;
const CHORUS_FREQ_MAX_HZ: f32 = 4.0;

impl Param {
    /// Every parameter, in control-surface order.
    pub const ALL: [Param; PARAM_COUNT] = [
        Param::Cutoff,
        Param::Resonance,
        Param::EnvMod,
        Param::Decay,
        Param::Accent,
        Param::Volume,
        Param::DelayTime,
        Param::DelayFeedback,
        Param::ReverbDecay,
        Param::Pitch,
        Param::ChorusDepth,
        Param::ChorusFreq,
    ];

    /// Map a normalized knob value to this parameter's physical unit.
    ///
    /// Pure and total: input is clamped to [0, 1] first, so every call
    /// produces a value inside the documented physical range.
    pub fn map(self, normalized: f32) -> f32 {
        let v = normalized.clamp(0.0, 1.0);
        match self {
            // Constant octaves-per-knob-degree sweep across ~9.2 octaves.
            Param::Cutoff => {
                CUTOFF_MIN_HZ * 2.0_f32.powf(v * (CUTOFF_MAX_HZ / CUTOFF_MIN_HZ).log2())
            }
            Param::Resonance => RESONANCE_MAX_Q * v.powf(RESONANCE_EXP),
            Param::EnvMod => ENV_MOD_MAX_OCT * v,
            Param::Decay => DECAY_MIN_S + v * (DECAY_MAX_S - DECAY_MIN_S),
            Param::Accent => ACCENT_MIN_DB + v * (ACCENT_MAX_DB - ACCENT_MIN_DB),
            Param::Volume => VOLUME_MIN_DB + v * -VOLUME_MIN_DB,
            Param::DelayTime => DELAY_MAX_S * v,
            Param::DelayFeedback => FEEDBACK_MAX * v,
            Param::ReverbDecay => REVERB_MIN_S + v * (REVERB_MAX_S - REVERB_MIN_S),
            Param::Pitch => -PITCH_RANGE_SEMIS + v * 2.0 * PITCH_RANGE_SEMIS,
            Param::ChorusDepth => CHORUS_DEPTH_MIN + v * (1.0 - CHORUS_DEPTH_MIN),
            Param::ChorusFreq => {
                CHORUS_FREQ_MIN_HZ + v * (CHORUS_FREQ_MAX_HZ - CHORUS_FREQ_MIN_HZ)
            }
        }
    }

    /// Default knob positions (the front panel's power-on state).
    pub fn default_normalized(self) -> f32 {
        match self {
            Param::Cutoff => 0.5,
            Param::Resonance => 0.3,
            Param::EnvMod => 0.5,
            Param::Decay => 0.6,
            Param::Accent => 0.7,
            Param::Volume => 0.8,
            Param::DelayTime => 0.3,
            Param::DelayFeedback => 0.35,
            Param::ReverbDecay => 0.3,
            Param::Pitch => 0.5, // Centered: zero semitones
            Param::ChorusDepth => 0.3,
            Param::ChorusFreq => 0.25,
        }
    }

    /// Control-surface name, as accepted by [`Param::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            Param::Cutoff => "cutoff",
            Param::Resonance => "resonance",
            Param::EnvMod => "envMod",
            Param::Decay => "decay",
            Param::Accent => "accent",
            Param::Volume => "volume",
            Param::DelayTime => "delayTime",
            Param::DelayFeedback => "delayFeedback",
            Param::ReverbDecay => "reverbDecay",
            Param::Pitch => "pitch",
            Param::ChorusDepth => "chorusDepth",
            Param::ChorusFreq => "chorusFreq",
        }
    }

    fn index(self) -> usize {
        Param::ALL.iter().position(|&p| p == self).unwrap_or(0)
    }
}

impl FromStr for Param {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::UnknownParameter(s.to_string()))
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The engine's single source of truth for control state: one normalized
/// value per parameter, clamped on write.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSet {
    values: [f32; PARAM_COUNT],
}

impl ParameterSet {
    pub fn new() -> Self {
        let mut values = [0.0; PARAM_COUNT];
        for param in Param::ALL {
            values[param.index()] = param.default_normalized();
        }
        Self { values }
    }

    pub fn set(&mut self, param: Param, normalized: f32) {
        self.values[param.index()] = normalized.clamp(0.0, 1.0);
    }

    pub fn get(&self, param: Param) -> f32 {
        self.values[param.index()]
    }

    /// The stored value mapped through the parameter's curve.
    pub fn physical(&self, param: Param) -> f32 {
        param.map(self.get(param))
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEPS: usize = 101;

    fn sweep(param: Param) -> Vec<f32> {
        (0..STEPS)
            .map(|i| param.map(i as f32 / (STEPS - 1) as f32))
            .collect()
    }

    #[test]
    fn test_endpoints_match_documented_ranges() {
        let expected: [(Param, f32, f32); 12] = [
            (Param::Cutoff, 20.0, 12_000.0),
            (Param::Resonance, 0.0, 30.0),
            (Param::EnvMod, 0.0, 7.0),
            (Param::Decay, 0.020, 0.320),
            (Param::Accent, -20.0, 10.0),
            (Param::Volume, -60.0, 0.0),
            (Param::DelayTime, 0.0, 0.750),
            (Param::DelayFeedback, 0.0, 0.85),
            (Param::ReverbDecay, 0.1, 5.0),
            (Param::Pitch, -12.0, 12.0),
            (Param::ChorusDepth, 0.01, 1.0),
            (Param::ChorusFreq, 0.01, 4.0),
        ];

        for (param, lo, hi) in expected {
            let at_zero = param.map(0.0);
            let at_one = param.map(1.0);
            assert!(
                (at_zero - lo).abs() < 1e-3 * lo.abs().max(1.0),
                "{} at 0.0: expected {}, got {}",
                param,
                lo,
                at_zero
            );
            assert!(
                (at_one - hi).abs() < 1e-3 * hi.abs().max(1.0),
                "{} at 1.0: expected {}, got {}",
                param,
                hi,
                at_one
            );
        }
    }

    #[test]
    fn test_every_curve_is_monotonic_nondecreasing() {
        for param in Param::ALL {
            let values = sweep(param);
            for pair in values.windows(2) {
                assert!(
                    pair[1] >= pair[0],
                    "{} not monotonic: {} then {}",
                    param,
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_mapped_values_stay_in_range() {
        for param in Param::ALL {
            let at_zero = param.map(0.0);
            let at_one = param.map(1.0);
            for value in sweep(param) {
                assert!(
                    value >= at_zero - 1e-6 && value <= at_one + 1e-6,
                    "{} produced {} outside [{}, {}]",
                    param,
                    value,
                    at_zero,
                    at_one
                );
            }
        }
    }

    #[test]
    fn test_delay_feedback_never_reaches_unity() {
        for i in 0..=1000 {
            let v = i as f32 / 1000.0;
            assert!(Param::DelayFeedback.map(v) < 1.0);
        }
        // Saturated input as well
        assert!(Param::DelayFeedback.map(100.0) < 1.0);
    }

    #[test]
    fn test_out_of_range_input_saturates() {
        assert_eq!(Param::Cutoff.map(-3.0), Param::Cutoff.map(0.0));
        assert_eq!(Param::Cutoff.map(7.5), Param::Cutoff.map(1.0));
        assert_eq!(Param::Volume.map(2.0), 0.0);
    }

    #[test]
    fn test_cutoff_sweep_is_exponential() {
        // Each half of the knob travel should cover the same number of
        // octaves: f(0.5)/f(0.0) == f(1.0)/f(0.5).
        let lo = Param::Cutoff.map(0.0);
        let mid = Param::Cutoff.map(0.5);
        let hi = Param::Cutoff.map(1.0);
        let ratio_low = mid / lo;
        let ratio_high = hi / mid;
        assert!(
            (ratio_low - ratio_high).abs() < 0.01 * ratio_low,
            "not exponential: {} vs {}",
            ratio_low,
            ratio_high
        );
    }

    #[test]
    fn test_unknown_parameter_name_rejected() {
        let result: Result<Param, _> = "wobble".parse();
        assert!(matches!(result, Err(EngineError::UnknownParameter(name)) if name == "wobble"));
    }

    #[test]
    fn test_every_name_round_trips() {
        for param in Param::ALL {
            let parsed: Param = param.name().parse().unwrap();
            assert_eq!(parsed, param);
        }
    }

    #[test]
    fn test_parameter_set_clamps_on_write() {
        let mut set = ParameterSet::new();
        set.set(Param::Resonance, 4.2);
        assert_eq!(set.get(Param::Resonance), 1.0);
        set.set(Param::Resonance, -0.5);
        assert_eq!(set.get(Param::Resonance), 0.0);
    }
}
