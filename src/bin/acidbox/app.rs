//! Application state and event loop.
//!
//! Owns the engine (and with it the audio stream), the pattern being
//! edited, and the pattern store. Every edit is pushed to the engine
//! immediately, so the bassline changes while it plays.

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::Duration;

use acidbox::dsp::oscillator::Waveform;
use acidbox::graph::ScopeReader;
use acidbox::pattern::PATTERN_LEN;
use acidbox::store::{NewPattern, PatternStore, PatternUpdate, StoreError};
use acidbox::{Param, Pattern, SynthEngine};

use crate::ui;
use crate::ui::spectrum::SpectrumAnalyzer;

/// Samples kept for the oscilloscope and FFT.
pub const VIS_BUFFER_SIZE: usize = 1024;

const TEMPO_STEP: f32 = 2.0;
const PARAM_STEP: f32 = 0.05;

pub struct App {
    engine: SynthEngine,
    store: PatternStore,
    pattern: Pattern,
    /// id of the stored pattern we overwrite on save, if any
    saved_id: Option<u32>,
    cursor: usize,
    selected_param: usize,
    scope: Option<ScopeReader>,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    status: String,
    should_quit: bool,
}

impl App {
    pub fn new(mut engine: SynthEngine, store: PatternStore, pattern: Pattern) -> Self {
        let scope = engine.take_scope();
        let sample_rate = engine.sample_rate().unwrap_or(48_000.0);
        let saved_id = store.list().last().map(|p| p.id);
        Self {
            engine,
            store,
            pattern,
            saved_id,
            cursor: 0,
            selected_param: 0,
            scope,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            status: String::from("space: play"),
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            terminal.draw(|frame| ui::render(frame, self))?;
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    fn poll_audio(&mut self) {
        if let Some(scope) = self.scope.as_mut() {
            scope.drain_into(&mut self.audio_buffer, VIS_BUFFER_SIZE);
        }
        if self.audio_buffer.len() == VIS_BUFFER_SIZE {
            self.spectrum.update(&self.audio_buffer);
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_tempo(TEMPO_STEP),
            KeyCode::Char('-') => self.nudge_tempo(-TEMPO_STEP),

            KeyCode::Left | KeyCode::Char('h') => {
                self.cursor = (self.cursor + PATTERN_LEN - 1) % PATTERN_LEN;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.cursor = (self.cursor + 1) % PATTERN_LEN;
            }
            KeyCode::Enter | KeyCode::Char('e') => self.edit_step(|s| s.active = !s.active),
            KeyCode::Char('a') => self.edit_step(|s| s.accent = !s.accent),
            KeyCode::Char('s') => self.edit_step(|s| s.slide = !s.slide),
            KeyCode::Up => self.edit_step(|s| s.note = s.note.transposed(1)),
            KeyCode::Down => self.edit_step(|s| s.note = s.note.transposed(-1)),

            KeyCode::Tab => {
                self.selected_param = (self.selected_param + 1) % Param::ALL.len();
            }
            KeyCode::BackTab => {
                self.selected_param =
                    (self.selected_param + Param::ALL.len() - 1) % Param::ALL.len();
            }
            KeyCode::Char('k') => self.nudge_param(PARAM_STEP),
            KeyCode::Char('j') => self.nudge_param(-PARAM_STEP),
            KeyCode::Char('o') => self.toggle_waveform(),

            KeyCode::Char('w') => self.save_pattern(),
            _ => {}
        }
    }

    fn toggle_playback(&mut self) {
        if self.engine.is_running() {
            self.engine.stop();
            self.status = String::from("stopped");
        } else {
            self.engine.start();
            self.status = String::from("playing");
        }
    }

    fn nudge_tempo(&mut self, delta: f32) {
        let bpm = self.engine.tempo() + delta;
        self.engine.set_tempo(bpm);
        self.status = format!("{:.0} bpm", self.engine.tempo());
    }

    fn toggle_waveform(&mut self) {
        let next = match self.engine.waveform() {
            Waveform::Saw => Waveform::Square,
            Waveform::Square => Waveform::Saw,
        };
        self.engine.set_waveform(next);
        self.status = format!("{:?} wave", next).to_lowercase();
    }

    fn nudge_param(&mut self, delta: f32) {
        let param = Param::ALL[self.selected_param];
        let value = (self.engine.parameter(param) + delta).clamp(0.0, 1.0);
        self.engine.set_param(param, value);
        self.status = format!("{} = {:.2}", param, value);
    }

    fn edit_step(&mut self, edit: impl FnOnce(&mut acidbox::Step)) {
        edit(self.pattern.step_mut(self.cursor));
        // length is always 16 here, the error arm is unreachable
        if self.engine.set_pattern(self.pattern.steps()).is_err() {
            self.status = String::from("pattern rejected");
        }
    }

    fn save_pattern(&mut self) {
        let steps = self.pattern.steps().to_vec();
        let tempo = self.engine.tempo() as u32;
        let result = match self.saved_id {
            Some(id) => self
                .store
                .update(
                    id,
                    PatternUpdate {
                        steps: Some(steps),
                        tempo: Some(tempo),
                        ..Default::default()
                    },
                )
                .map(|p| p.id),
            None => self
                .store
                .create(NewPattern {
                    name: String::from("live"),
                    steps,
                    tempo,
                })
                .map(|p| p.id),
        };
        match result {
            Ok(id) => {
                self.saved_id = Some(id);
                self.status = format!("saved pattern {}", id);
            }
            Err(StoreError::NotFound(_)) => {
                // stored pattern vanished underneath us; retry as create
                self.saved_id = None;
                self.save_pattern();
            }
            Err(e) => self.status = format!("save failed: {}", e),
        }
    }

    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected_param(&self) -> Param {
        Param::ALL[self.selected_param]
    }

    pub fn audio_buffer(&self) -> &[f32] {
        &self.audio_buffer
    }

    pub fn spectrum_data(&self) -> &[(f64, f64)] {
        self.spectrum.data()
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}
