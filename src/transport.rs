/*
Transport Clock
===============

Tempo-driven sixteenth-note pulse generator, running on the sample clock.

Timer-based tick scheduling (sleep until the next sixteenth, fire, repeat)
drifts and jitters under load. This clock instead lives inside the render
loop: before a block is rendered, it computes every tick deadline that
falls inside that block and reports it with an exact frame offset. The
block itself is the look-ahead window - deadlines are known a full block
ahead of the moment the samples reach the device, so ticks land sample-
accurately, strictly in order, and are never coalesced or skipped.

    tick interval = 60 / bpm / 4 seconds   (sixteenth notes)

Tempo changes are deferred to the next tick boundary: the already-scheduled
deadline stays where it is, and the new interval applies from that tick
onward. `stop()` cancels pending ticks only; whatever the voice is doing
(e.g. an envelope release) carries on.
*/

pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 300.0;

/// Most ticks that can land in one block: MAX_BLOCK_SIZE frames at the
/// fastest tempo is well under this even at low sample rates.
pub const MAX_TICKS_PER_BLOCK: usize = 32;

/// One scheduled sixteenth-note tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Monotonic tick counter since the last start().
    pub index: u64,
    /// Frame offset inside the current block.
    pub frame_offset: usize,
    /// Absolute time on the sample clock.
    pub time_samples: u64,
}

/// Fixed-capacity tick list for one block. Lives on the stack; the render
/// path never allocates.
pub struct TickBuf {
    ticks: [Tick; MAX_TICKS_PER_BLOCK],
    len: usize,
}

impl TickBuf {
    pub fn new() -> Self {
        Self {
            ticks: [Tick {
                index: 0,
                frame_offset: 0,
                time_samples: 0,
            }; MAX_TICKS_PER_BLOCK],
            len: 0,
        }
    }

    fn push(&mut self, tick: Tick) {
        if self.len < MAX_TICKS_PER_BLOCK {
            self.ticks[self.len] = tick;
            self.len += 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks[..self.len].iter()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for TickBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    Running,
}

pub struct TransportClock {
    sample_rate: f64,
    state: State,
    tempo_bpm: f64,
    /// Tempo waiting for the next tick boundary.
    pending_tempo: Option<f64>,
    samples_per_tick: f64,
    /// Absolute sample clock; advances every block, running or not.
    now_samples: u64,
    /// Deadline of the next tick on the sample clock.
    next_tick: f64,
    tick_count: u64,
}

impl TransportClock {
    pub fn new(sample_rate: f32, tempo_bpm: f32) -> Self {
        let tempo = tempo_bpm.clamp(MIN_BPM, MAX_BPM) as f64;
        let sample_rate = sample_rate as f64;
        Self {
            sample_rate,
            state: State::Stopped,
            tempo_bpm: tempo,
            pending_tempo: None,
            samples_per_tick: Self::samples_per_tick(sample_rate, tempo),
            now_samples: 0,
            next_tick: 0.0,
            tick_count: 0,
        }
    }

    fn samples_per_tick(sample_rate: f64, bpm: f64) -> f64 {
        // 60 / bpm / 4: sixteenth notes
        sample_rate * 15.0 / bpm
    }

    /// Stopped -> Running. Tick 0 fires at the start of the next block.
    /// Re-entrant start while running is a no-op.
    pub fn start(&mut self) {
        if self.state == State::Running {
            return;
        }
        if let Some(bpm) = self.pending_tempo.take() {
            self.apply_tempo(bpm);
        }
        self.state = State::Running;
        self.tick_count = 0;
        self.next_tick = self.now_samples as f64;
    }

    /// Running -> Stopped. Pending ticks are cancelled; nothing else is
    /// interrupted.
    pub fn stop(&mut self) {
        self.state = State::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Clamp to [20, 300] BPM. While running, the change lands on the next
    /// tick boundary; an already-scheduled tick is never moved.
    pub fn set_tempo(&mut self, bpm: f32) {
        let bpm = (bpm as f64).clamp(MIN_BPM as f64, MAX_BPM as f64);
        if self.state == State::Running {
            self.pending_tempo = Some(bpm);
        } else {
            self.apply_tempo(bpm);
        }
    }

    fn apply_tempo(&mut self, bpm: f64) {
        self.tempo_bpm = bpm;
        self.samples_per_tick = Self::samples_per_tick(self.sample_rate, bpm);
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.pending_tempo.unwrap_or(self.tempo_bpm) as f32
    }

    /// Seconds per sixteenth note at the effective tempo.
    pub fn seconds_per_tick(&self) -> f32 {
        (self.samples_per_tick / self.sample_rate) as f32
    }

    /// Look ahead over the next `frames` frames and collect every tick
    /// deadline inside them, then advance the sample clock.
    pub fn collect_ticks(&mut self, frames: usize, out: &mut TickBuf) {
        out.clear();
        let block_end = (self.now_samples + frames as u64) as f64;

        if self.state == State::Running {
            while self.next_tick < block_end {
                let frame_offset = (self.next_tick - self.now_samples as f64).max(0.0) as usize;
                out.push(Tick {
                    index: self.tick_count,
                    frame_offset: frame_offset.min(frames.saturating_sub(1)),
                    time_samples: self.next_tick.round() as u64,
                });
                self.tick_count += 1;

                // Tempo boundary: the tick that just fired keeps its
                // deadline; the interval after it uses the new tempo.
                if let Some(bpm) = self.pending_tempo.take() {
                    self.apply_tempo(bpm);
                }
                self.next_tick += self.samples_per_tick;
            }
        }

        self.now_samples += frames as u64;
    }
}
