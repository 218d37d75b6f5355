// src/config.rs
//! Static run configuration. Read once at startup, never reloaded mid-run.
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::drivers::{
    seconds_to_samples, AlphaError, BandpassSpec, FrequencyBand, PipelineSettings,
};
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sampling_rate_hz: f64,
    pub window_seconds: f64,
    pub history_seconds: f64,
    pub channel_index: usize,
    pub alpha_band_hz: (f64, f64),
    pub bandpass_hz: (f64, f64),
    pub bandpass_order: usize,
    pub threshold: f64,
    /// Half-width of the hysteresis band around `threshold`; 0 disables it.
    pub hysteresis: f64,
    pub tick_ms: u64,
    pub pull_timeout_ms: u64,
}
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 250.0,
            window_seconds: 2.0,
            history_seconds: 10.0,
            channel_index: 0,
            alpha_band_hz: (8.0, 12.0),
            bandpass_hz: (1.0, 20.0),
            bandpass_order: 4,
            threshold: 0.4,
            hysteresis: 0.0,
            tick_ms: 100,
            pull_timeout_ms: 50,
        }
    }
}
impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }
    pub fn window_samples(&self) -> usize {
        seconds_to_samples(self.window_seconds, self.sampling_rate_hz)
    }
    pub fn bandpass(&self) -> BandpassSpec {
        BandpassSpec {
            low_hz: self.bandpass_hz.0,
            high_hz: self.bandpass_hz.1,
            order: self.bandpass_order,
        }
    }
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            sample_rate_hz: self.sampling_rate_hz,
            window_seconds: self.window_seconds,
            history_seconds: self.history_seconds,
            alpha_band: FrequencyBand::new(self.alpha_band_hz.0, self.alpha_band_hz.1),
            bandpass: self.bandpass(),
            threshold: self.threshold,
            hysteresis: self.hysteresis,
            pull_timeout: self.pull_timeout(),
        }
    }
    pub fn validate(&self) -> Result<(), AlphaError> {
        let invalid = |msg: String| -> Result<(), AlphaError> { Err(AlphaError::InvalidConfig(msg)) };
        let fs = self.sampling_rate_hz;
        if !(fs.is_finite() && fs > 0.0) {
            return invalid(format!("sampling rate must be positive, got {fs}"));
        }
        let nyquist = fs / 2.0;
        if !(self.window_seconds > 0.0 && self.window_seconds <= self.history_seconds) {
            return invalid(format!(
                "window ({} s) must be positive and no longer than history ({} s)",
                self.window_seconds, self.history_seconds
            ));
        }
        let segment = (fs / 2.0).floor() as usize;
        if self.window_samples() < segment.max(1) {
            return invalid(format!(
                "window of {} samples is shorter than one {segment}-sample Welch segment",
                self.window_samples()
            ));
        }
        let (alpha_low, alpha_high) = self.alpha_band_hz;
        if !(0.0 <= alpha_low && alpha_low < alpha_high && alpha_high <= nyquist) {
            return invalid(format!(
                "alpha band {alpha_low}..{alpha_high} Hz must be ordered and below Nyquist ({nyquist} Hz)"
            ));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return invalid(format!("threshold must be in (0, 1), got {}", self.threshold));
        }
        let max_hysteresis = self.threshold.min(1.0 - self.threshold);
        if !(self.hysteresis >= 0.0 && self.hysteresis < max_hysteresis) {
            return invalid(format!(
                "hysteresis must be in [0, {max_hysteresis}), got {}",
                self.hysteresis
            ));
        }
        if self.tick_ms == 0 {
            return invalid("tick period must be at least 1 ms".into());
        }
        if self.pull_timeout_ms >= self.tick_ms {
            return invalid(format!(
                "pull timeout ({} ms) must be shorter than the tick period ({} ms)",
                self.pull_timeout_ms, self.tick_ms
            ));
        }
        self.bandpass().design(fs)?;
        Ok(())
    }
    /// Checks the channel index against what the source actually offers.
    pub fn validate_channel(&self, channel_count: usize) -> Result<(), AlphaError> {
        if self.channel_index >= channel_count {
            return Err(AlphaError::InvalidConfig(format!(
                "channel index {} out of range for {channel_count} channels",
                self.channel_index
            )));
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window_samples(), 500);
        let settings = config.pipeline_settings();
        assert_eq!(settings.alpha_band, FrequencyBand::ALPHA);
        assert_eq!(settings.pull_timeout, Duration::from_millis(50));
    }
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "threshold": 0.55, "channel_index": 3 }"#).unwrap();
        assert_eq!(config.threshold, 0.55);
        assert_eq!(config.channel_index, 3);
        assert_eq!(config.sampling_rate_hz, 250.0);
        assert_eq!(config.bandpass_hz, (1.0, 20.0));
    }
    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            AppConfig { threshold: 1.0, ..AppConfig::default() },
            AppConfig { pull_timeout_ms: 100, ..AppConfig::default() },
            AppConfig { alpha_band_hz: (12.0, 8.0), ..AppConfig::default() },
            AppConfig { window_seconds: 0.3, ..AppConfig::default() },
            AppConfig { window_seconds: 12.0, ..AppConfig::default() },
            AppConfig { hysteresis: 0.5, ..AppConfig::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(AlphaError::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }
    #[test]
    fn bad_bandpass_aborts_validation() {
        let config = AppConfig {
            bandpass_hz: (1.0, 130.0),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AlphaError::InvalidFilterSpec { .. })
        ));
    }
    #[test]
    fn channel_index_must_exist() {
        let config = AppConfig {
            channel_index: 16,
            ..AppConfig::default()
        };
        assert!(config.validate_channel(16).is_err());
        assert!(config.validate_channel(17).is_ok());
    }
}
