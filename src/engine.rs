/*
Synth Engine
============

Public facade and the seam between the two planes:

  control plane (UI / caller thread)
      SynthEngine: owns the cpal stream, validates and clamps input,
      keeps the authoritative copy of parameters, tempo and pattern,
      and pushes commands into a lock-free ring.

  render plane (audio callback)
      RenderCore: drains the ring at the top of each block, then runs
      transport -> sequencer -> graph with no locks and no allocation.

Every command is a small Copy value; patterns travel as whole 16-step
snapshots, so a half-edited pattern can never reach the render thread.
If the ring fills up (the callback has stalled), pushes are dropped and
logged rather than blocked on.
*/

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::dsp::oscillator::Waveform;
use crate::error::EngineError;
use crate::graph::{meter_pair, scope_pair, AudioGraph, MeterHandle, ScopeReader};
use crate::params::{Param, ParameterSet};
use crate::pattern::{Pattern, Step};
use crate::sequencer::StepSequencer;
use crate::transport::{TickBuf, TransportClock, MAX_BPM, MIN_BPM};
use crate::MAX_BLOCK_SIZE;

const COMMAND_QUEUE_SIZE: usize = 256;
const DEFAULT_TEMPO_BPM: f32 = 120.0;

/// Control-plane message. All variants are Copy so the ring never frees
/// memory on the render side.
#[derive(Debug, Clone, Copy)]
pub enum EngineCommand {
    /// Physical (already mapped) parameter value.
    SetParam(Param, f32),
    SetWaveform(Waveform),
    SetPattern(Pattern),
    SetTempo(f32),
    Start,
    Stop,
}

/// Playhead state the render thread publishes for the UI.
#[derive(Clone)]
pub struct PlayheadHandle {
    current_step: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
}

impl PlayheadHandle {
    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Relaxed) as usize
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

fn playhead_pair() -> (PlayheadWriter, PlayheadHandle) {
    let current_step = Arc::new(AtomicU32::new(0));
    let running = Arc::new(AtomicBool::new(false));
    (
        PlayheadWriter {
            current_step: current_step.clone(),
            running: running.clone(),
        },
        PlayheadHandle {
            current_step,
            running,
        },
    )
}

struct PlayheadWriter {
    current_step: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
}

impl PlayheadWriter {
    fn publish(&self, step: usize, running: bool) {
        self.current_step.store(step as u32, Ordering::Relaxed);
        self.running.store(running, Ordering::Relaxed);
    }
}

/// Everything the audio callback owns. Also usable directly for offline
/// rendering in tests and bounces.
pub struct RenderCore {
    graph: AudioGraph,
    transport: TransportClock,
    sequencer: StepSequencer,
    rx: Consumer<EngineCommand>,
    playhead: PlayheadWriter,
    tick_buf: TickBuf,
}

impl RenderCore {
    fn apply_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SetParam(param, physical) => {
                self.graph.set_param(param, physical);
            }
            EngineCommand::SetWaveform(waveform) => {
                self.graph.set_waveform(waveform);
            }
            EngineCommand::SetPattern(pattern) => {
                self.sequencer.set_pattern(pattern);
            }
            EngineCommand::SetTempo(bpm) => {
                self.transport.set_tempo(bpm);
            }
            EngineCommand::Start => {
                if !self.transport.is_running() {
                    self.sequencer.reset();
                    self.transport.start();
                }
            }
            EngineCommand::Stop => {
                self.transport.stop();
            }
        }
    }

    /// Render one mono block of any length. Commands are drained first,
    /// then the block is rendered in chunks of at most `MAX_BLOCK_SIZE`
    /// frames, each split at its ticks' frame offsets so note triggers
    /// land sample-accurately. Chunking keeps the per-chunk tick count
    /// inside the fixed tick buffer no matter how large the caller's
    /// buffer is, so no tick is ever dropped.
    pub fn process_block(&mut self, out: &mut [f32]) {
        while let Ok(cmd) = self.rx.pop() {
            self.apply_command(cmd);
        }

        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }

        self.playhead
            .publish(self.sequencer.current_step(), self.transport.is_running());
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        self.graph.set_step_duration(self.transport.seconds_per_tick());

        let frames = out.len();
        let mut buf = std::mem::take(&mut self.tick_buf);
        self.transport.collect_ticks(frames, &mut buf);

        let mut cursor = 0;
        for tick in buf.iter() {
            if tick.frame_offset > cursor {
                self.graph.render_block(&mut out[cursor..tick.frame_offset]);
                cursor = tick.frame_offset;
            }
            self.sequencer.handle_tick(&mut self.graph);
        }
        if cursor < frames {
            self.graph.render_block(&mut out[cursor..]);
        }
        self.tick_buf = buf;
    }
}

/// The synthesizer. Construct, `initialize()`, then drive it from any
/// thread; audio runs on its own callback until the engine is dropped.
pub struct SynthEngine {
    tx: Option<Producer<EngineCommand>>,
    stream: Option<cpal::Stream>,
    meter: Option<MeterHandle>,
    scope: Option<ScopeReader>,
    playhead: PlayheadHandle,
    params: ParameterSet,
    waveform: Waveform,
    tempo_bpm: f32,
    pattern: Pattern,
    sample_rate: Option<f32>,
    initialized: bool,
}

impl SynthEngine {
    pub fn new() -> Self {
        let (_, playhead) = playhead_pair();
        Self {
            tx: None,
            stream: None,
            meter: None,
            scope: None,
            playhead,
            params: ParameterSet::default(),
            waveform: Waveform::Saw,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            pattern: Pattern::default(),
            sample_rate: None,
            initialized: false,
        }
    }

    /// Open the default output device and start the audio callback.
    /// Idempotent; calling again after success is a no-op.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            EngineError::InitializationFailed("no default output device available".into())
        })?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::InitializationFailed(Box::new(e)))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        log::info!(
            "audio output: {} Hz, {} channel(s)",
            sample_rate,
            channels
        );

        let mut core = self.build_core(sample_rate);
        let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;
                    while frames_written < total_frames {
                        let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut mono[..frames];
                        core.process_block(block);

                        // mono to all channels
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }
                        frames_written += frames;
                    }
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| EngineError::InitializationFailed(Box::new(e)))?;
        stream
            .play()
            .map_err(|e| EngineError::InitializationFailed(Box::new(e)))?;

        self.stream = Some(stream);
        self.initialized = true;
        Ok(())
    }

    /// Build a core without opening an audio device. For offline rendering
    /// and tests; the caller drives `process_block` itself.
    pub fn initialize_offline(&mut self, sample_rate: f32) -> Result<RenderCore, EngineError> {
        if self.initialized {
            return Err(EngineError::InitializationFailed(
                "engine is already initialized".into(),
            ));
        }
        let core = self.build_core(sample_rate);
        self.initialized = true;
        Ok(core)
    }

    fn build_core(&mut self, sample_rate: f32) -> RenderCore {
        self.sample_rate = Some(sample_rate);
        let (tx, rx) = RingBuffer::<EngineCommand>::new(COMMAND_QUEUE_SIZE);
        let (meter_writer, meter) = meter_pair();
        let (scope_tap, scope_reader) = scope_pair();
        let (playhead_writer, playhead) = playhead_pair();

        let mut graph = AudioGraph::new(sample_rate, meter_writer, Some(scope_tap));
        for param in Param::ALL {
            graph.set_param(param, self.params.physical(param));
        }
        graph.set_waveform(self.waveform);

        self.tx = Some(tx);
        self.meter = Some(meter);
        self.scope = Some(scope_reader);
        self.playhead = playhead;

        RenderCore {
            graph,
            transport: TransportClock::new(sample_rate, self.tempo_bpm),
            sequencer: StepSequencer::new(self.pattern),
            rx,
            playhead: playhead_writer,
            tick_buf: TickBuf::new(),
        }
    }

    fn send(&mut self, cmd: EngineCommand) {
        if let Some(tx) = self.tx.as_mut() {
            if tx.push(cmd).is_err() {
                log::warn!("command queue full, dropped {:?}", cmd);
            }
        }
    }

    /// Set a parameter by its wire name, e.g. `"cutoff"` or `"envMod"`.
    /// The value is a normalized 0..1 position; out-of-range input is
    /// clamped. Unknown names fail even before initialization.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), EngineError> {
        let param: Param = name.parse()?;
        self.set_param(param, value);
        Ok(())
    }

    /// Typed variant of [`set_parameter`](Self::set_parameter).
    pub fn set_param(&mut self, param: Param, value: f32) {
        self.params.set(param, value);
        let physical = self.params.physical(param);
        log::debug!("{} = {:.3} ({:.3} physical)", param, value.clamp(0.0, 1.0), physical);
        self.send(EngineCommand::SetParam(param, physical));
    }

    /// Normalized value last set for `param`.
    pub fn parameter(&self, param: Param) -> f32 {
        self.params.get(param)
    }

    /// Switch the oscillator between saw and square.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        self.send(EngineCommand::SetWaveform(waveform));
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Replace the whole pattern. Must be exactly 16 steps; the playhead
    /// position is preserved.
    pub fn set_pattern(&mut self, steps: &[Step]) -> Result<(), EngineError> {
        let pattern = Pattern::from_steps(steps)?;
        self.pattern = pattern;
        self.send(EngineCommand::SetPattern(pattern));
        Ok(())
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Clamped to [20, 300] BPM. While playing, takes effect at the next
    /// sixteenth-note boundary.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.tempo_bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.send(EngineCommand::SetTempo(self.tempo_bpm));
    }

    pub fn tempo(&self) -> f32 {
        self.tempo_bpm
    }

    /// Start playback from step 0. No-op while already running.
    pub fn start(&mut self) {
        log::info!("transport start at {} bpm", self.tempo_bpm);
        self.send(EngineCommand::Start);
    }

    /// Stop scheduling steps. A sounding note finishes its release.
    pub fn stop(&mut self) {
        log::info!("transport stop");
        self.send(EngineCommand::Stop);
    }

    /// Smoothed output level in 0..1, for meters and UI pulse effects.
    pub fn output_intensity(&self) -> f32 {
        self.meter.as_ref().map(MeterHandle::intensity).unwrap_or(0.0)
    }

    /// Step index the sequencer will play next.
    pub fn current_step(&self) -> usize {
        self.playhead.current_step()
    }

    pub fn is_running(&self) -> bool {
        self.playhead.is_running()
    }

    /// Take the waveform tap. There is only one; returns None after the
    /// first call or before initialization.
    pub fn take_scope(&mut self) -> Option<ScopeReader> {
        self.scope.take()
    }

    /// Output sample rate, once initialized.
    pub fn sample_rate(&self) -> Option<f32> {
        self.sample_rate
    }
}

impl Default for SynthEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Note, PATTERN_LEN};

    const SAMPLE_RATE: f32 = 48_000.0;

    fn offline_engine() -> (SynthEngine, RenderCore) {
        let mut engine = SynthEngine::new();
        let core = engine.initialize_offline(SAMPLE_RATE).unwrap();
        (engine, core)
    }

    #[test]
    fn test_unknown_parameter_rejected_before_init() {
        let mut engine = SynthEngine::new();
        assert!(matches!(
            engine.set_parameter("wobble", 0.5),
            Err(EngineError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_set_parameter_before_init_is_recorded() {
        let mut engine = SynthEngine::new();
        engine.set_parameter("cutoff", 0.9).unwrap();
        assert_eq!(engine.parameter(Param::Cutoff), 0.9);
    }

    #[test]
    fn test_double_offline_init_fails() {
        let mut engine = SynthEngine::new();
        let _core = engine.initialize_offline(SAMPLE_RATE).unwrap();
        assert!(matches!(
            engine.initialize_offline(SAMPLE_RATE),
            Err(EngineError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_pattern_length_validated() {
        let mut engine = SynthEngine::new();
        let short = vec![Step::rest(Note(36)); 12];
        assert!(matches!(
            engine.set_pattern(&short),
            Err(EngineError::InvalidPatternLength(12))
        ));
    }

    #[test]
    fn test_silent_pattern_renders_silence() {
        let (mut engine, mut core) = offline_engine();
        engine.start();
        let mut out = vec![0.0f32; 512];
        for _ in 0..200 {
            core.process_block(&mut out);
            assert!(out.iter().all(|s| *s == 0.0));
        }
    }

    #[test]
    fn test_single_step_produces_audio() {
        let (mut engine, mut core) = offline_engine();
        let mut steps = vec![Step::rest(Note(36)); PATTERN_LEN];
        steps[0] = Step::on(Note(48));
        engine.set_pattern(&steps).unwrap();
        engine.start();

        let mut out = vec![0.0f32; 512];
        let mut peak = 0.0f32;
        for _ in 0..20 {
            core.process_block(&mut out);
            peak = peak.max(out.iter().fold(0.0f32, |a, &s| a.max(s.abs())));
        }
        assert!(peak > 0.01, "no audio after an active step, peak {}", peak);
    }

    #[test]
    fn test_playhead_published_after_blocks() {
        let (mut engine, mut core) = offline_engine();
        engine.start();
        let mut out = vec![0.0f32; 512];
        core.process_block(&mut out);
        assert!(engine.is_running());
        // tick 0 fired, so the next step to play is 1
        assert_eq!(engine.current_step(), 1);

        engine.stop();
        core.process_block(&mut out);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_oversized_block_plays_every_tick() {
        // 2 seconds in one call at 300 bpm spans 40 tick deadlines, more
        // than one tick buffer holds. Internal chunking must deliver all
        // of them to the sequencer.
        let (mut engine, mut core) = offline_engine();
        engine.set_tempo(300.0);
        engine.start();

        let mut out = vec![0.0f32; 96_000];
        core.process_block(&mut out);

        // 40 ticks from step 0 leaves the playhead at step 40 mod 16
        assert_eq!(engine.current_step(), 40 % PATTERN_LEN);
    }

    #[test]
    fn test_tempo_clamped_on_control_side() {
        let mut engine = SynthEngine::new();
        engine.set_tempo(5_000.0);
        assert_eq!(engine.tempo(), 300.0);
    }
}
