//! acidbox - terminal acid bassline synthesizer
//!
//! Run with: cargo run

mod app;
mod ui;

use acidbox::pattern::{Note, Step};
use acidbox::store::PatternStore;
use acidbox::{Pattern, SynthEngine};
use app::App;
use color_eyre::eyre::WrapErr;

fn store_path() -> Option<std::path::PathBuf> {
    dirs::data_dir().map(|d| d.join("acidbox").join("patterns.json"))
}

/// Something to hear before the first edit.
fn demo_pattern() -> Pattern {
    let mut pattern = Pattern::silent(Note(36)); // C2
    let line: &[(usize, &str, bool, bool)] = &[
        (0, "C2", true, false),
        (2, "C2", false, false),
        (3, "C3", false, true),
        (5, "Eb2", false, false),
        (7, "C2", false, false),
        (8, "C2", true, false),
        (10, "G2", false, true),
        (11, "F2", false, false),
        (13, "C2", false, false),
        (15, "Bb2", false, true),
    ];
    for &(i, name, accent, slide) in line {
        *pattern.step_mut(i) = Step {
            note: name.parse().unwrap(),
            accent,
            slide,
            active: true,
        };
    }
    pattern
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let store = match store_path() {
        Some(path) => PatternStore::open(path).wrap_err("failed to open pattern store")?,
        None => PatternStore::in_memory(),
    };

    let mut engine = SynthEngine::new();
    engine.initialize().wrap_err("failed to start audio")?;

    // Resume the most recently saved pattern, or seed a demo line
    let pattern = store
        .list()
        .last()
        .and_then(|p| p.to_pattern().ok())
        .unwrap_or_else(demo_pattern);
    engine.set_pattern(pattern.steps())?;
    if let Some(saved) = store.list().last() {
        engine.set_tempo(saved.tempo as f32);
    }

    let mut terminal = ratatui::init();
    let result = App::new(engine, store, pattern).run(&mut terminal);
    ratatui::restore();
    result
}
