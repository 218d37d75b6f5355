use std::f64::consts::PI;
use std::thread;
use std::time::{Duration, Instant};
use rand::{rngs::StdRng, Rng, SeedableRng};
use crate::drivers::{AlphaError, Sample};
/// Anything that can hand over the single-channel samples acquired since the last pull.
pub trait SampleSource {
    /// Returns zero or more samples, waiting at most `timeout` for the first one.
    fn pull_chunk(&mut self, timeout: Duration) -> Result<Vec<Sample>, AlphaError>;
    /// Channels offered by the underlying device before reduction to one.
    fn channel_count(&self) -> usize {
        1
    }
}
impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn pull_chunk(&mut self, timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
        (**self).pull_chunk(timeout)
    }
    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }
}
/// In-memory source for deterministic playback of fixed chunks.
#[cfg(test)]
pub struct ManualSource {
    queue: std::collections::VecDeque<Vec<Sample>>,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(chunks: impl IntoIterator<Item = Vec<Sample>>) -> Self {
        Self {
            queue: chunks.into_iter().collect(),
        }
    }
    /// Splits a continuous signal sampled at `sample_rate_hz` into chunks of `chunk_len`.
    pub fn from_signal(values: &[f64], sample_rate_hz: f64, chunk_len: usize) -> Self {
        let samples: Vec<Sample> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(v, i as f64 / sample_rate_hz))
            .collect();
        Self::new(samples.chunks(chunk_len.max(1)).map(|c| c.to_vec()))
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
#[cfg(test)]
impl SampleSource for ManualSource {
    fn pull_chunk(&mut self, _timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
        Ok(self.queue.pop_front().unwrap_or_default())
    }
}
/// Shape of the simulated EEG channel.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticProfile {
    pub sample_rate_hz: f64,
    /// Length of each eyes-open / eyes-closed block; blocks alternate starting open.
    pub block_seconds: f64,
    pub alpha_hz: f64,
    pub open_alpha_uv: f64,
    pub closed_alpha_uv: f64,
    /// Slow background rhythm present in both blocks.
    pub drift_hz: f64,
    pub drift_uv: f64,
    pub noise_uv: f64,
}
impl SyntheticProfile {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            block_seconds: 8.0,
            alpha_hz: 10.0,
            open_alpha_uv: 2.0,
            closed_alpha_uv: 50.0,
            drift_hz: 3.0,
            drift_uv: 15.0,
            noise_uv: 20.0,
        }
    }
    pub fn eyes_closed_at(&self, t: f64) -> bool {
        (t / self.block_seconds).floor() as u64 % 2 == 1
    }
}
/// Wall-clock paced simulator of a single EEG channel.
pub struct SyntheticSource {
    profile: SyntheticProfile,
    rng: StdRng,
    started_at: Instant,
    emitted: u64,
}
impl SyntheticSource {
    pub fn new(profile: SyntheticProfile) -> Self {
        Self::with_rng(profile, StdRng::from_entropy())
    }
    pub fn seeded(profile: SyntheticProfile, seed: u64) -> Self {
        Self::with_rng(profile, StdRng::seed_from_u64(seed))
    }
    fn with_rng(profile: SyntheticProfile, rng: StdRng) -> Self {
        Self {
            profile,
            rng,
            started_at: Instant::now(),
            emitted: 0,
        }
    }
    /// Produces the next `count` samples regardless of wall-clock time.
    pub fn generate(&mut self, count: usize) -> Vec<Sample> {
        let fs = self.profile.sample_rate_hz;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let t = self.emitted as f64 / fs;
            let alpha_uv = if self.profile.eyes_closed_at(t) {
                self.profile.closed_alpha_uv
            } else {
                self.profile.open_alpha_uv
            };
            let alpha = alpha_uv * (2.0 * PI * self.profile.alpha_hz * t).sin();
            let drift = self.profile.drift_uv * (2.0 * PI * self.profile.drift_hz * t).sin();
            let noise = if self.profile.noise_uv > 0.0 {
                self.rng
                    .gen_range(-self.profile.noise_uv..self.profile.noise_uv)
            } else {
                0.0
            };
            out.push(Sample::new(alpha + drift + noise, t));
            self.emitted += 1;
        }
        out
    }
    fn due(&self) -> usize {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let target = (elapsed * self.profile.sample_rate_hz).floor() as u64;
        target.saturating_sub(self.emitted) as usize
    }
}
impl SampleSource for SyntheticSource {
    fn pull_chunk(&mut self, timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
        let mut due = self.due();
        if due == 0 {
            let period = Duration::from_secs_f64(1.0 / self.profile.sample_rate_hz);
            thread::sleep(period.min(timeout));
            due = self.due();
        }
        if due == 0 {
            return Err(AlphaError::timed_out(timeout));
        }
        Ok(self.generate(due))
    }
}
