//! Output metering and the scope tap.
//!
//! Both taps sit at the end of the chain and are built for the audio
//! thread: the meter publishes a single f32 through an atomic, and the
//! scope pushes raw samples into a lock-free ring, dropping them when the
//! reader falls behind. Neither ever allocates or blocks on the render
//! path.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

/// Samples per intensity measurement. ~21ms at 48kHz: fast enough that a
/// beat visualizer pulses per step, slow enough to be stable.
const METER_WINDOW: usize = 1024;

/// Capacity of the scope ring: a few UI frames of audio.
const SCOPE_CAPACITY: usize = 8192;

/// Audio-thread half of the level meter. Accumulates mean absolute sample
/// magnitude over a short window and publishes each finished window.
pub struct OutputMeter {
    accum: f32,
    count: usize,
    shared: Arc<AtomicU32>,
}

impl OutputMeter {
    pub fn process(&mut self, buffer: &[f32]) {
        for &sample in buffer {
            self.accum += sample.abs();
            self.count += 1;
            if self.count >= METER_WINDOW {
                let mean = self.accum / METER_WINDOW as f32;
                self.shared.store(mean.to_bits(), Ordering::Relaxed);
                self.accum = 0.0;
                self.count = 0;
            }
        }
    }
}

/// Control-thread half: poll the latest intensity at any rate.
#[derive(Clone)]
pub struct MeterHandle {
    shared: Arc<AtomicU32>,
}

impl MeterHandle {
    /// Mean absolute output magnitude over the most recent window.
    pub fn intensity(&self) -> f32 {
        f32::from_bits(self.shared.load(Ordering::Relaxed))
    }
}

pub fn meter_pair() -> (OutputMeter, MeterHandle) {
    let shared = Arc::new(AtomicU32::new(0));
    (
        OutputMeter {
            accum: 0.0,
            count: 0,
            shared: shared.clone(),
        },
        MeterHandle { shared },
    )
}

/// Audio-thread half of the scope: lossy sample feed for visualization.
pub struct ScopeTap {
    tx: Producer<f32>,
}

impl ScopeTap {
    /// Push a block, silently dropping samples when the ring is full. The
    /// scope is best-effort; the render path never waits for the UI.
    pub fn push(&mut self, buffer: &[f32]) {
        for &sample in buffer {
            if self.tx.push(sample).is_err() {
                break;
            }
        }
    }
}

/// UI-thread half of the scope.
pub struct ScopeReader {
    rx: Consumer<f32>,
}

impl ScopeReader {
    /// Drain everything available, appending to `out` and keeping only the
    /// most recent `keep` samples.
    pub fn drain_into(&mut self, out: &mut Vec<f32>, keep: usize) {
        while let Ok(sample) = self.rx.pop() {
            out.push(sample);
        }
        if out.len() > keep {
            let excess = out.len() - keep;
            out.drain(0..excess);
        }
    }
}

pub fn scope_pair() -> (ScopeTap, ScopeReader) {
    let (tx, rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);
    (ScopeTap { tx }, ScopeReader { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_reports_mean_magnitude() {
        let (mut meter, handle) = meter_pair();
        let buffer = vec![0.5; METER_WINDOW];
        meter.process(&buffer);
        assert!((handle.intensity() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_meter_zero_before_first_window() {
        let (mut meter, handle) = meter_pair();
        meter.process(&[0.9; 10]);
        // Window not complete yet; last published value still zero
        assert_eq!(handle.intensity(), 0.0);
    }

    #[test]
    fn test_meter_tracks_silence() {
        let (mut meter, handle) = meter_pair();
        meter.process(&vec![0.8; METER_WINDOW]);
        meter.process(&vec![0.0; METER_WINDOW]);
        assert_eq!(handle.intensity(), 0.0);
    }

    #[test]
    fn test_scope_drops_when_full_without_blocking() {
        let (mut tap, mut reader) = scope_pair();
        let big = vec![0.1; SCOPE_CAPACITY * 2];
        tap.push(&big); // must not block or panic

        let mut drained = Vec::new();
        reader.drain_into(&mut drained, SCOPE_CAPACITY * 4);
        assert_eq!(drained.len(), SCOPE_CAPACITY);
    }

    #[test]
    fn test_scope_reader_keeps_most_recent() {
        let (mut tap, mut reader) = scope_pair();
        tap.push(&[1.0, 2.0, 3.0, 4.0]);
        let mut out = Vec::new();
        reader.drain_into(&mut out, 2);
        assert_eq!(out, vec![3.0, 4.0]);
    }
}
