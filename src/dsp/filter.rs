use std::f32::consts::TAU;

/*
Lowpass Filter
==============

Topology-preserving state-variable filter, lowpass tap only - the one
response a 303 voice needs. Two integrators with zero-delay feedback:

    g   prewarped cutoff coefficient (tan mapping keeps the analog cutoff
        frequency accurate near Nyquist)
    k   damping; k = 2 means no resonance, k -> 0 screams

The engine's resonance control is a Q value in [0, 30]. We fold it into the
damping as k = 1 / (0.5 + q): q = 0 gives the fully damped k = 2, and high q
pushes k toward zero for the self-oscillation squeal the style depends on.
*/

pub struct SVFilter {
    sample_rate: f32,

    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    q: f32,
}

impl SVFilter {
    pub fn lowpass(sample_rate: f32, cutoff_hz: f32) -> Self {
        Self {
            sample_rate,
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            q: 0.0,
        }
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz.clamp(10.0, self.sample_rate * 0.45);
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Resonance as filter Q, 0 (none) to 30 (screaming).
    pub fn set_resonance(&mut self, q: f32) {
        self.q = q.clamp(0.0, 30.0);
    }

    pub fn resonance(&self) -> f32 {
        self.q
    }

    #[inline]
    fn coefficients(&self, cutoff_hz: f32) -> (f32, f32) {
        let wd = TAU * cutoff_hz.clamp(10.0, self.sample_rate * 0.45);
        let g = (wd / (2.0 * self.sample_rate)).tan();
        let k = 1.0 / (0.5 + self.q);
        (g, k)
    }

    /// Process one sample at the filter's stored cutoff.
    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        self.next_sample_at(sample, self.cutoff_hz)
    }

    /// Process one sample with a cutoff override. This is the envelope
    /// modulation path: the voice sweeps the effective cutoff per sample
    /// without touching the base setting.
    #[inline]
    pub fn next_sample_at(&mut self, sample: f32, cutoff_hz: f32) -> f32 {
        let (g, k) = self.coefficients(cutoff_hz);

        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{Oscillator, Waveform};

    const SAMPLE_RATE: f32 = 48_000.0;

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(64);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn saw_buffer(freq: f32, len: usize) -> Vec<f32> {
        let mut osc = Oscillator::new(Waveform::Saw, SAMPLE_RATE);
        osc.set_freq(freq);
        let mut buffer = vec![0.0; len];
        osc.render(&mut buffer);
        buffer
    }

    #[test]
    fn test_passes_dc() {
        let mut filter = SVFilter::lowpass(SAMPLE_RATE, 500.0);
        let mut buffer = vec![1.0; 512];
        filter.render(&mut buffer);
        assert!(buffer[511] > 0.99, "lowpass should pass DC: {}", buffer[511]);
    }

    #[test]
    fn test_attenuates_above_cutoff() {
        let mut filter = SVFilter::lowpass(SAMPLE_RATE, 200.0);
        let mut buffer = saw_buffer(5_000.0, 512);
        let dry_peak = peak_after_transient(&buffer);
        filter.render(&mut buffer);
        let wet_peak = peak_after_transient(&buffer);
        assert!(
            wet_peak < dry_peak * 0.3,
            "expected strong attenuation: dry={} wet={}",
            dry_peak,
            wet_peak
        );
    }

    #[test]
    fn test_higher_cutoff_passes_more() {
        let mut closed = SVFilter::lowpass(SAMPLE_RATE, 150.0);
        let mut open = SVFilter::lowpass(SAMPLE_RATE, 8_000.0);

        let mut buf_closed = saw_buffer(1_000.0, 512);
        let mut buf_open = buf_closed.clone();
        closed.render(&mut buf_closed);
        open.render(&mut buf_open);

        assert!(peak_after_transient(&buf_open) > peak_after_transient(&buf_closed) * 2.0);
    }

    #[test]
    fn test_resonance_boosts_cutoff_frequency() {
        let cutoff = 1_000.0;
        let mut flat = SVFilter::lowpass(SAMPLE_RATE, cutoff);
        let mut peaked = SVFilter::lowpass(SAMPLE_RATE, cutoff);
        peaked.set_resonance(8.0);

        let mut buf_flat = saw_buffer(cutoff, 1024);
        let mut buf_peaked = buf_flat.clone();
        flat.render(&mut buf_flat);
        peaked.render(&mut buf_peaked);

        assert!(
            peak_after_transient(&buf_peaked) > peak_after_transient(&buf_flat) * 1.2,
            "resonance should emphasize the corner"
        );
    }

    #[test]
    fn test_cutoff_override_does_not_change_base() {
        let mut filter = SVFilter::lowpass(SAMPLE_RATE, 440.0);
        filter.next_sample_at(0.5, 4_000.0);
        assert_eq!(filter.cutoff_hz(), 440.0);
    }

    #[test]
    fn test_output_stays_finite_at_max_resonance() {
        let mut filter = SVFilter::lowpass(SAMPLE_RATE, 2_000.0);
        filter.set_resonance(30.0);
        let mut buffer = saw_buffer(200.0, 4096);
        filter.render(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}
