//! Pattern data model: notes, steps, and the fixed 16-step pattern.
//!
//! A pattern is replaced wholesale, never mutated field-by-field from
//! outside, so the render thread always reads a complete snapshot. `Step`
//! and `Pattern` are `Copy` for exactly that reason: a whole pattern fits in
//! a single lock-free queue slot.

use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

/// Steps per pattern. The sequencer, the persistence layer, and the front
/// panel all assume exactly this many slots.
pub const PATTERN_LEN: usize = 16;

/// A pitch as a MIDI note number, named in scientific pitch notation.
///
/// C4 = middle C = 60, A4 = 69 = 440 Hz. Parses "C3", "F#2", "Eb1" and
/// prints back in sharp spelling. Any MIDI number resolves to a valid
/// synthesizable frequency, so construction never fails on range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note(pub u8);

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl Note {
    /// Frequency in Hz via equal temperament around A4 = 440 Hz.
    pub fn freq_hz(self) -> f32 {
        440.0 * 2.0_f32.powf((self.0 as f32 - 69.0) / 12.0)
    }

    /// Transpose by a signed number of semitones, saturating at the MIDI
    /// range ends.
    pub fn transposed(self, semitones: i8) -> Note {
        Note((self.0 as i16 + semitones as i16).clamp(0, 127) as u8)
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = NOTE_NAMES[(self.0 % 12) as usize];
        let octave = (self.0 / 12) as i8 - 1;
        write!(f, "{}{}", name, octave)
    }
}

/// Error from parsing a pitch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNoteError(pub String);

impl std::fmt::Display for ParseNoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid note name: {:?}", self.0)
    }
}

impl std::error::Error for ParseNoteError {}

impl FromStr for Note {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseNoteError(s.to_string());
        let mut chars = s.chars();

        let letter = chars.next().ok_or_else(err)?;
        let semitone: i16 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(err()),
        };

        let rest: String = chars.collect();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') | Some('s') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest.as_str()),
        };

        let octave: i16 = octave_str.parse().map_err(|_| err())?;
        let midi = (octave + 1) * 12 + semitone + accidental;
        if !(0..=127).contains(&midi) {
            return Err(err());
        }
        Ok(Note(midi as u8))
    }
}

// Notes travel over the wire in their spelled form ("C3"), matching the
// saved-pattern JSON shape.
impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// One slot of the 16-slot pattern.
///
/// A step with `active == false` is never sounded, regardless of the other
/// fields. `slide` lengthens the gate to an eighth note for a legato feel;
/// `accent` makes that single note louder with a deeper filter sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub note: Note,
    pub accent: bool,
    pub slide: bool,
    pub active: bool,
}

impl Step {
    /// An inactive step holding the given pitch.
    pub fn rest(note: Note) -> Self {
        Self {
            note,
            accent: false,
            slide: false,
            active: false,
        }
    }

    /// A plain active step: no accent, no slide.
    pub fn on(note: Note) -> Self {
        Self {
            note,
            accent: false,
            slide: false,
            active: true,
        }
    }
}

/// An ordered bar of sixteen steps; insertion order is playback order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pattern {
    steps: [Step; PATTERN_LEN],
}

impl Pattern {
    pub fn new(steps: [Step; PATTERN_LEN]) -> Self {
        Self { steps }
    }

    /// Build from a slice, rejecting anything that is not exactly 16 steps.
    pub fn from_steps(steps: &[Step]) -> Result<Self, EngineError> {
        let steps: [Step; PATTERN_LEN] = steps
            .try_into()
            .map_err(|_| EngineError::InvalidPatternLength(steps.len()))?;
        Ok(Self { steps })
    }

    /// Sixteen inactive steps at the given pitch.
    pub fn silent(note: Note) -> Self {
        Self {
            steps: [Step::rest(note); PATTERN_LEN],
        }
    }

    pub fn step(&self, index: usize) -> &Step {
        &self.steps[index % PATTERN_LEN]
    }

    pub fn step_mut(&mut self, index: usize) -> &mut Step {
        &mut self.steps[index % PATTERN_LEN]
    }

    pub fn steps(&self) -> &[Step; PATTERN_LEN] {
        &self.steps
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::silent(Note(36)) // C2, the classic bassline register
    }
}
