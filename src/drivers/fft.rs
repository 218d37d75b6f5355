use std::f64::consts::PI;
use log::trace;
use rustfft::{num_complex::Complex64, FftPlanner};
use crate::drivers::AlphaError;
/// Frequency range in Hz, both ends inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}
impl FrequencyBand {
    pub const ALPHA: FrequencyBand = FrequencyBand {
        low_hz: 8.0,
        high_hz: 12.0,
    };
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}
/// One-sided power spectral density.
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    pub frequencies_hz: Vec<f64>,
    pub density: Vec<f64>,
}
impl PowerSpectrum {
    /// Trapezoidal integral over the whole frequency axis.
    pub fn total_power(&self) -> f64 {
        trapezoid(&self.frequencies_hz, &self.density)
    }
    /// Trapezoidal integral over the bins that fall inside `band`.
    pub fn band_power(&self, band: FrequencyBand) -> f64 {
        let (freqs, psd): (Vec<f64>, Vec<f64>) = self
            .frequencies_hz
            .iter()
            .zip(&self.density)
            .filter(|(f, _)| band.contains(**f))
            .map(|(f, p)| (*f, *p))
            .unzip();
        trapezoid(&freqs, &psd)
    }
    pub fn peak_frequency(&self) -> Option<f64> {
        self.frequencies_hz
            .iter()
            .zip(&self.density)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(f, _)| *f)
    }
}
fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) * 0.5)
        .sum()
}
/// Welch PSD estimator: periodic Hann segments with 50% overlap, per-segment mean
/// removal, density scaling.
pub struct WelchEstimator {
    segment_len: usize,
    sample_rate_hz: f64,
}
impl WelchEstimator {
    pub fn with_segment(segment_len: usize, sample_rate_hz: f64) -> Self {
        Self {
            segment_len,
            sample_rate_hz,
        }
    }
    /// Half-second segments, giving 2 Hz frequency resolution.
    pub fn half_second(sample_rate_hz: f64) -> Self {
        Self::with_segment((sample_rate_hz / 2.0).floor() as usize, sample_rate_hz)
    }
    pub fn estimate(&self, window: &[f64]) -> Result<PowerSpectrum, AlphaError> {
        let nperseg = self.segment_len;
        if nperseg == 0 || window.len() < nperseg {
            return Err(AlphaError::InsufficientWindow {
                needed: nperseg.max(1),
                actual: window.len(),
            });
        }
        let step = nperseg - nperseg / 2;
        let taper = hann_periodic(nperseg);
        let taper_power: f64 = taper.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.sample_rate_hz * taper_power);
        let bins = nperseg / 2 + 1;
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nperseg);
        let mut density = vec![0.0; bins];
        let mut segments = 0usize;
        let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];
        for start in (0..=window.len() - nperseg).step_by(step) {
            let segment = &window[start..start + nperseg];
            let mean = segment.iter().sum::<f64>() / nperseg as f64;
            for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&taper) {
                *slot = Complex64::new((x - mean) * w, 0.0);
            }
            fft.process(&mut buffer);
            for (k, acc) in density.iter_mut().enumerate() {
                let mut p = buffer[k].norm_sqr() * scale;
                let is_nyquist = nperseg % 2 == 0 && k == nperseg / 2;
                if k != 0 && !is_nyquist {
                    p *= 2.0;
                }
                *acc += p;
            }
            segments += 1;
        }
        for p in &mut density {
            *p /= segments as f64;
        }
        let frequencies_hz = (0..bins)
            .map(|k| k as f64 * self.sample_rate_hz / nperseg as f64)
            .collect();
        Ok(PowerSpectrum {
            frequencies_hz,
            density,
        })
    }
}
fn hann_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}
/// Fraction of the window's power that lies inside `band`, nominally in `[0, 1]`.
///
/// A window without any variance has no power to share out and yields exactly `0`.
pub fn relative_band_power(
    window: &[f64],
    sample_rate_hz: f64,
    band: FrequencyBand,
) -> Result<f64, AlphaError> {
    let estimator = WelchEstimator::half_second(sample_rate_hz);
    let spectrum = estimator.estimate(window)?;
    if window.iter().all(|&v| v == window[0]) {
        return Ok(0.0);
    }
    let total_power = spectrum.total_power();
    if total_power.is_nan() || total_power <= 0.0 {
        return Ok(0.0);
    }
    let ratio = spectrum.band_power(band) / total_power;
    trace!(
        "relative power {ratio:.3} in {}-{} Hz, spectral peak {:?} Hz",
        band.low_hz,
        band.high_hz,
        spectrum.peak_frequency()
    );
    Ok(ratio)
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    const FS: f64 = 250.0;
    fn tone(freq_hz: f64, amplitude: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / FS).sin())
            .collect()
    }
    #[test]
    fn half_second_segments_give_two_hz_bins() {
        let spectrum = WelchEstimator::half_second(FS)
            .estimate(&tone(10.0, 1.0, 500))
            .unwrap();
        assert_eq!(spectrum.frequencies_hz.len(), 63);
        assert!((spectrum.frequencies_hz[1] - 2.0).abs() < 1e-12);
        assert_eq!(spectrum.peak_frequency(), Some(10.0));
    }
    #[test]
    fn alpha_tone_dominates_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let signal: Vec<f64> = tone(10.0, 50.0, 500)
            .into_iter()
            .map(|v| v + rng.gen_range(-0.05..0.05))
            .collect();
        let ratio = relative_band_power(&signal, FS, FrequencyBand::ALPHA).unwrap();
        // Hann main-lobe leakage into the 6-8 and 12-14 Hz trapezoids caps an
        // on-bin tone at 5/6.
        assert!(ratio > 0.8 && ratio <= 1.0, "ratio = {ratio}");
    }
    #[test]
    fn tone_outside_band_carries_no_alpha() {
        let ratio = relative_band_power(&tone(2.0, 50.0, 500), FS, FrequencyBand::ALPHA).unwrap();
        assert!(ratio < 0.05, "ratio = {ratio}");
    }
    #[test]
    fn constant_window_is_exactly_zero() {
        let flat = vec![3.7; 500];
        assert_eq!(relative_band_power(&flat, FS, FrequencyBand::ALPHA).unwrap(), 0.0);
        assert_eq!(relative_band_power(&[0.0; 125], FS, FrequencyBand::ALPHA).unwrap(), 0.0);
    }
    #[test]
    fn window_shorter_than_a_segment_is_rejected() {
        match relative_band_power(&tone(10.0, 1.0, 124), FS, FrequencyBand::ALPHA) {
            Err(AlphaError::InsufficientWindow { needed, actual }) => {
                assert_eq!(needed, 125);
                assert_eq!(actual, 124);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
    #[test]
    fn band_integration_is_inclusive() {
        let spectrum = PowerSpectrum {
            frequencies_hz: vec![6.0, 8.0, 10.0, 12.0, 14.0],
            density: vec![0.0, 1.0, 1.0, 1.0, 0.0],
        };
        assert!((spectrum.band_power(FrequencyBand::ALPHA) - 4.0).abs() < 1e-12);
        assert!((spectrum.total_power() - 6.0).abs() < 1e-12);
    }
}
