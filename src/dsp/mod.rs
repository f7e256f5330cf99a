//! Low-level DSP primitives used by the signal-chain nodes.
//!
//! These components are allocation-free after construction and realtime-safe,
//! so they can live directly inside the voice and effect structs that run on
//! the audio thread. They stay focused on the signal-processing math; the
//! `graph` module layers note handling and parameter routing on top.

/// Time-domain delay line with interpolated reads.
pub mod delay;
/// Gate-driven envelope generator (attack/decay/sustain/release).
pub mod envelope;
/// State-variable lowpass filter with resonance.
pub mod filter;
/// Band-limited sawtooth/square oscillator.
pub mod oscillator;
/// Schroeder reverb parameterized by decay time.
pub mod reverb;
