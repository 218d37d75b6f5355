//! Butterworth band-pass design and forward-backward (zero-phase) filtering.
//!
//! Coefficients come out in transfer-function form `(b, a)` with `a[0] == 1`.
//! The design goes analog prototype -> band-pass transform -> bilinear transform,
//! with cutoffs normalized to Nyquist and pre-warped.
use std::f64::consts::PI;
use rustfft::num_complex::Complex64;
use crate::drivers::AlphaError;
/// Feed-forward (`b`) and feed-back (`a`) coefficients of an IIR filter.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterCoefficients {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}
impl FilterCoefficients {
    /// Number of taps, i.e. the longer of `b` and `a`.
    pub fn ntaps(&self) -> usize {
        self.b.len().max(self.a.len())
    }
}
/// Band-pass filter settings, fixed for the whole run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandpassSpec {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
}
impl BandpassSpec {
    pub fn design(&self, sample_rate_hz: f64) -> Result<FilterCoefficients, AlphaError> {
        design_bandpass(self.low_hz, self.high_hz, sample_rate_hz, self.order)
    }
}
/// Digital Butterworth band-pass of the given prototype `order` (the resulting
/// filter has `2 * order` poles).
pub fn design_bandpass(
    low_hz: f64,
    high_hz: f64,
    sample_rate_hz: f64,
    order: usize,
) -> Result<FilterCoefficients, AlphaError> {
    let nyquist = 0.5 * sample_rate_hz;
    let valid = order > 0
        && sample_rate_hz.is_finite()
        && low_hz.is_finite()
        && high_hz.is_finite()
        && 0.0 < low_hz
        && low_hz < high_hz
        && high_hz < nyquist;
    if !valid {
        return Err(AlphaError::InvalidFilterSpec {
            low_hz,
            high_hz,
            sample_rate_hz,
            order,
        });
    }
    // Work at a normalized sample rate of 2 so Nyquist sits at 1.
    let fs = 2.0;
    let warp = |wn: f64| 2.0 * fs * (PI * wn / fs).tan();
    let w_low = warp(low_hz / nyquist);
    let w_high = warp(high_hz / nyquist);
    let bandwidth = w_high - w_low;
    let center = (w_low * w_high).sqrt();
    let n = order as i32;
    let prototype: Vec<Complex64> = (0..n)
        .map(|i| {
            let m = f64::from(2 * i - n + 1);
            -Complex64::from_polar(1.0, PI * m / f64::from(2 * n))
        })
        .collect();
    let mut poles = Vec::with_capacity(2 * order);
    for &p in &prototype {
        let p_lp = p * (bandwidth / 2.0);
        let root = (p_lp * p_lp - center * center).sqrt();
        poles.push(p_lp + root);
        poles.push(p_lp - root);
    }
    let gain = bandwidth.powi(n);
    // Bilinear transform: band-pass zeros at s = 0 land on z = 1, the ones at infinity on z = -1.
    let fs2 = 2.0 * fs;
    let z_poles: Vec<Complex64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let mut z_zeros = vec![Complex64::new(1.0, 0.0); order];
    z_zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(order));
    let denom = poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let z_gain = gain * (Complex64::new(fs2.powi(n), 0.0) / denom).re;
    let b = poly(&z_zeros).into_iter().map(|c| c.re * z_gain).collect();
    let a = poly(&z_poles).into_iter().map(|c| c.re).collect();
    Ok(FilterCoefficients { b, a })
}
/// Polynomial coefficients (highest power first) with the given roots.
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}
/// `b` and `a` padded to a common length and normalized so `a[0] == 1`.
fn normalized(coeffs: &FilterCoefficients) -> (Vec<f64>, Vec<f64>) {
    let n = coeffs.ntaps();
    let a0 = coeffs.a.first().copied().unwrap_or(1.0);
    let mut b: Vec<f64> = coeffs.b.iter().map(|v| v / a0).collect();
    let mut a: Vec<f64> = coeffs.a.iter().map(|v| v / a0).collect();
    b.resize(n, 0.0);
    a.resize(n, 0.0);
    (b, a)
}
/// Steady-state of the filter's delay line for a unit step input.
fn lfilter_zi(b: &[f64], a: &[f64]) -> Vec<f64> {
    let n = b.len();
    if n < 2 {
        return Vec::new();
    }
    let mut zi = vec![0.0; n - 1];
    let b_sum: f64 = (1..n).map(|k| b[k] - a[k] * b[0]).sum();
    let a_sum: f64 = 1.0 + a[1..].iter().sum::<f64>();
    zi[0] = b_sum / a_sum;
    let mut asum = 1.0;
    let mut csum = 0.0;
    for k in 1..n - 1 {
        asum += a[k];
        csum += b[k] - a[k] * b[0];
        zi[k] = asum * zi[0] - csum;
    }
    zi
}
/// Direct form II transposed, starting from delay-line state `z`.
fn lfilter(b: &[f64], a: &[f64], input: &[f64], mut z: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    let mut out = Vec::with_capacity(input.len());
    for &x in input {
        let y = b[0] * x + z.first().copied().unwrap_or(0.0);
        if n > 1 {
            for i in 0..n - 2 {
                z[i] = b[i + 1] * x + z[i + 1] - a[i + 1] * y;
            }
            z[n - 2] = b[n - 1] * x - a[n - 1] * y;
        }
        out.push(y);
    }
    out
}
/// Odd extension by `pad` samples on both ends (point reflection about the end values).
fn odd_extend(signal: &[f64], pad: usize) -> Vec<f64> {
    let len = signal.len();
    let first = signal[0];
    let last = signal[len - 1];
    let mut ext = Vec::with_capacity(len + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    ext.extend_from_slice(signal);
    ext.extend((1..=pad).map(|i| 2.0 * last - signal[len - 1 - i]));
    ext
}
/// Applies `coeffs` forward then backward so the output has zero net phase shift.
///
/// The signal is padded with `3 * ntaps` odd-extended samples on each side and the
/// delay line starts in steady state, which keeps edge transients small.
pub fn filtfilt(coeffs: &FilterCoefficients, signal: &[f64]) -> Result<Vec<f64>, AlphaError> {
    let (b, a) = normalized(coeffs);
    let pad = 3 * coeffs.ntaps();
    if signal.len() <= pad {
        return Err(AlphaError::InsufficientSignalLength {
            needed: pad,
            actual: signal.len(),
        });
    }
    let extended = odd_extend(signal, pad);
    let zi = lfilter_zi(&b, &a);
    let scaled = |x0: f64| zi.iter().map(|z| z * x0).collect::<Vec<f64>>();
    let mut forward = lfilter(&b, &a, &extended, scaled(extended[0]));
    forward.reverse();
    let mut backward = lfilter(&b, &a, &forward, scaled(forward[0]));
    backward.reverse();
    Ok(backward[pad..pad + signal.len()].to_vec())
}
