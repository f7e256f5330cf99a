/*
Step Sequencer
==============

Walks a 16-step pattern, one step per transport tick. The sequencer only
decides WHAT plays; WHEN is the transport's job, and HOW is the graph's.
It holds no timing state of its own, so swapping the pattern mid-playback
simply changes what the next tick reads - the playhead position survives.
*/

use crate::graph::{Gate, NoteSink};
use crate::pattern::{Pattern, PATTERN_LEN};

pub struct StepSequencer {
    pattern: Pattern,
    step_index: usize,
}

impl StepSequencer {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            step_index: 0,
        }
    }

    /// Play the current step into `sink` and advance the playhead.
    /// Returns the index of the step that was just played.
    ///
    /// The step is read once as a snapshot, so a concurrent-looking pattern
    /// swap can never mix fields from two patterns within one step.
    pub fn handle_tick(&mut self, sink: &mut impl NoteSink) -> usize {
        let played = self.step_index;
        let step = *self.pattern.step(played);
        if step.active {
            let gate = if step.slide { Gate::Long } else { Gate::Short };
            sink.trigger_note(step.note, gate, step.accent);
        }
        self.step_index = (self.step_index + 1) % PATTERN_LEN;
        played
    }

    /// Replace the pattern without touching the playhead.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    /// Rewind to step 0.
    pub fn reset(&mut self) {
        self.step_index = 0;
    }

    /// Index of the step the next tick will play.
    pub fn current_step(&self) -> usize {
        self.step_index
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}
