use std::time::Duration;
use log::{debug, info, warn};
use crate::drivers::classifier::{Classifier, EyeState};
use crate::drivers::error::AlphaError;
use crate::drivers::fft::{relative_band_power, FrequencyBand};
use crate::drivers::filter::{filtfilt, BandpassSpec};
use crate::drivers::source::SampleSource;
use crate::drivers::{seconds_to_samples, HistoryBuffer, Sample};
/// Fixed parameters of the update cycle.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub sample_rate_hz: f64,
    pub window_seconds: f64,
    pub history_seconds: f64,
    pub alpha_band: FrequencyBand,
    pub bandpass: BandpassSpec,
    pub threshold: f64,
    pub hysteresis: f64,
    pub pull_timeout: Duration,
}
impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250.0,
            window_seconds: 2.0,
            history_seconds: 10.0,
            alpha_band: FrequencyBand::ALPHA,
            bandpass: BandpassSpec {
                low_hz: 1.0,
                high_hz: 20.0,
                order: 4,
            },
            threshold: 0.4,
            hysteresis: 0.0,
            pull_timeout: Duration::from_millis(50),
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    WarmingUp,
    Running,
}
/// A plottable series whose offsets are seconds relative to the newest raw sample.
#[derive(Clone, Debug, Default)]
pub struct Series {
    pub offsets: Vec<f64>,
    pub values: Vec<f64>,
}
impl Series {
    fn rebased(values: Vec<f64>, timestamps: &[f64], origin: f64) -> Self {
        Self {
            offsets: timestamps.iter().map(|t| t - origin).collect(),
            values,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.offsets
            .iter()
            .zip(&self.values)
            .map(|(&x, &y)| [x, y])
            .collect()
    }
}
/// Everything the display side needs after one successful tick.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    pub signal: Series,
    pub power: Series,
    pub relative_power: f64,
    pub state: EyeState,
    pub latest_timestamp: f64,
    pub window_seconds: f64,
    pub history_seconds: f64,
    pub threshold: f64,
}
#[derive(Debug)]
pub enum TickOutcome {
    WarmingUp { buffered: usize, needed: usize },
    Updated(DisplayFrame),
    Skipped(AlphaError),
}
/// Owns the raw and power histories and runs one analysis per tick.
pub struct AlphaPipeline {
    settings: PipelineSettings,
    raw: HistoryBuffer,
    power: HistoryBuffer,
    classifier: Classifier,
    window_samples: usize,
    phase: Phase,
}
impl AlphaPipeline {
    pub fn new(settings: PipelineSettings) -> Result<Self, AlphaError> {
        // Filter bounds are fixed for the run, so a bad spec is fatal here rather than per tick.
        settings.bandpass.design(settings.sample_rate_hz)?;
        let raw =
            HistoryBuffer::with_history_seconds(settings.history_seconds, settings.sample_rate_hz)?;
        let power = HistoryBuffer::with_capacity(raw.capacity());
        let window_samples = seconds_to_samples(settings.window_seconds, settings.sample_rate_hz);
        if window_samples == 0 || window_samples > raw.capacity() {
            return Err(AlphaError::InvalidConfig(format!(
                "window of {window_samples} samples does not fit a history of {}",
                raw.capacity()
            )));
        }
        let classifier = Classifier::new(settings.threshold, settings.hysteresis);
        Ok(Self {
            settings,
            raw,
            power,
            classifier,
            window_samples,
            phase: Phase::WarmingUp,
        })
    }
    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn state(&self) -> EyeState {
        self.classifier.state()
    }
    pub fn window_samples(&self) -> usize {
        self.window_samples
    }
    #[cfg(test)]
    pub fn raw_history(&self) -> &HistoryBuffer {
        &self.raw
    }
    #[cfg(test)]
    pub fn power_history(&self) -> &HistoryBuffer {
        &self.power
    }
    pub fn ingest(&mut self, samples: impl IntoIterator<Item = Sample>) {
        self.raw.extend(samples);
    }
    /// Pulls whatever the source has, then analyses the retained history.
    pub fn tick<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> TickOutcome {
        match source.pull_chunk(self.settings.pull_timeout) {
            Ok(chunk) => self.ingest(chunk),
            Err(err) if err.is_transient() => debug!("no samples this tick: {err}"),
            Err(err) => warn!("source pull failed, continuing without new samples: {err}"),
        }
        self.process()
    }
    /// Runs one analysis on the current buffer contents without pulling.
    pub fn process(&mut self) -> TickOutcome {
        if self.raw.len() < self.window_samples {
            self.phase = Phase::WarmingUp;
            debug!(
                "warming up: {}/{} samples buffered",
                self.raw.len(),
                self.window_samples
            );
            return TickOutcome::WarmingUp {
                buffered: self.raw.len(),
                needed: self.window_samples,
            };
        }
        if self.phase == Phase::WarmingUp {
            info!("analysis window filled ({} samples)", self.window_samples);
            self.phase = Phase::Running;
        }
        match self.analyze() {
            Ok(frame) => TickOutcome::Updated(frame),
            Err(err) => {
                if err.is_transient() {
                    debug!("tick skipped: {err}");
                } else {
                    warn!("tick skipped: {err}");
                }
                TickOutcome::Skipped(err)
            }
        }
    }
    fn analyze(&mut self) -> Result<DisplayFrame, AlphaError> {
        self.raw.require(self.window_samples)?;
        let fs = self.settings.sample_rate_hz;
        let coeffs = self.settings.bandpass.design(fs)?;
        let (values, timestamps) = self.raw.as_arrays();
        let filtered = filtfilt(&coeffs, &values)?;
        let window = &filtered[filtered.len() - self.window_samples..];
        let relative_power = relative_band_power(window, fs, self.settings.alpha_band)?;
        let latest_timestamp = self
            .raw
            .latest()
            .map(|sample| sample.timestamp)
            .unwrap_or_default();
        self.power.push(relative_power, latest_timestamp);
        let previous = self.classifier.state();
        let state = self.classifier.update(relative_power);
        if state != previous {
            info!("state {previous} -> {state} (relative alpha {relative_power:.3})");
        }
        let (power_values, power_times) = self.power.as_arrays();
        Ok(DisplayFrame {
            signal: Series::rebased(filtered, &timestamps, latest_timestamp),
            power: Series::rebased(power_values, &power_times, latest_timestamp),
            relative_power,
            state,
            latest_timestamp,
            window_seconds: self.settings.window_seconds,
            history_seconds: self.settings.history_seconds,
            threshold: self.classifier.threshold(),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{ManualSource, SyntheticProfile, SyntheticSource};
    use std::f64::consts::PI;
    const FS: f64 = 250.0;
    fn sine(freq_hz: f64, amplitude: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / FS).sin())
            .collect()
    }
    fn updated(outcome: TickOutcome) -> DisplayFrame {
        match outcome {
            TickOutcome::Updated(frame) => frame,
            other => panic!("expected an update, got {other:?}"),
        }
    }
    #[test]
    fn alpha_tone_reads_as_closed() {
        let mut source = ManualSource::from_signal(&sine(10.0, 50.0, 500), FS, 500);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        assert_eq!(pipeline.window_samples(), 500);
        let frame = updated(pipeline.tick(&mut source));
        assert!(frame.relative_power > 0.75, "{}", frame.relative_power);
        assert_eq!(frame.state, EyeState::Closed);
        assert_eq!(pipeline.state(), EyeState::Closed);
        assert_eq!(pipeline.phase(), Phase::Running);
    }
    #[test]
    fn slow_tone_reads_as_open() {
        let mut source = ManualSource::from_signal(&sine(2.0, 50.0, 500), FS, 500);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        let frame = updated(pipeline.tick(&mut source));
        assert!(frame.relative_power < 0.05, "{}", frame.relative_power);
        assert_eq!(frame.state, EyeState::Open);
    }
    #[test]
    fn stays_unknown_while_warming_up() {
        let mut source = ManualSource::from_signal(&sine(10.0, 50.0, 499), FS, 100);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        for _ in 0..8 {
            match pipeline.tick(&mut source) {
                TickOutcome::WarmingUp { needed, .. } => assert_eq!(needed, 500),
                other => panic!("unexpected: {other:?}"),
            }
        }
        assert_eq!(pipeline.power_history().len(), 0);
        assert_eq!(pipeline.state(), EyeState::Unknown);
        assert_eq!(pipeline.phase(), Phase::WarmingUp);
    }
    #[test]
    fn frames_are_rebased_on_newest_sample() {
        let mut source = ManualSource::from_signal(&sine(10.0, 50.0, 600), FS, 50);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        let mut frames = Vec::new();
        for _ in 0..12 {
            if let TickOutcome::Updated(frame) = pipeline.tick(&mut source) {
                frames.push(frame);
            }
        }
        assert_eq!(frames.len(), 3);
        let last = frames.last().unwrap();
        assert_eq!(last.signal.values.len(), 600);
        assert_eq!(last.signal.offsets.last().copied(), Some(0.0));
        assert!(last.signal.offsets.iter().all(|&t| t <= 0.0));
        assert!((last.signal.offsets[0] + 599.0 / FS).abs() < 1e-9);
        assert_eq!(last.power.values.len(), 3);
        assert!((last.power.offsets[0] + 100.0 / FS).abs() < 1e-9);
        assert_eq!(last.power.offsets[2], 0.0);
    }
    #[test]
    fn overflowing_chunk_keeps_newest_history() {
        let mut source = ManualSource::from_signal(&sine(10.0, 50.0, 3000), FS, 3000);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        let frame = updated(pipeline.tick(&mut source));
        assert_eq!(pipeline.raw_history().len(), 2500);
        assert_eq!(frame.signal.values.len(), 2500);
        let (_, timestamps) = pipeline.raw_history().as_arrays();
        assert!((timestamps[0] - 500.0 / FS).abs() < 1e-9);
    }
    #[test]
    fn degenerate_window_skips_tick_without_changing_state() {
        let settings = PipelineSettings {
            window_seconds: 0.2,
            ..PipelineSettings::default()
        };
        let mut pipeline = AlphaPipeline::new(settings).unwrap();
        pipeline.ingest(
            sine(10.0, 50.0, 60)
                .into_iter()
                .enumerate()
                .map(|(i, v)| Sample::new(v, i as f64 / FS)),
        );
        match pipeline.process() {
            TickOutcome::Skipped(AlphaError::InsufficientWindow { needed, actual }) => {
                assert_eq!(needed, 125);
                assert_eq!(actual, 50);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(pipeline.state(), EyeState::Unknown);
        assert_eq!(pipeline.power_history().len(), 0);
    }
    #[test]
    fn bad_filter_spec_is_fatal_at_construction() {
        let settings = PipelineSettings {
            bandpass: BandpassSpec {
                low_hz: 1.0,
                high_hz: 200.0,
                order: 4,
            },
            ..PipelineSettings::default()
        };
        assert!(matches!(
            AlphaPipeline::new(settings),
            Err(AlphaError::InvalidFilterSpec { .. })
        ));
    }
    struct BrokenSource;
    impl SampleSource for BrokenSource {
        fn pull_chunk(&mut self, _timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
            Err(AlphaError::Source("unplugged".into()))
        }
    }
    #[test]
    fn source_failures_do_not_stop_the_cycle() {
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        let mut healthy = ManualSource::from_signal(&sine(10.0, 50.0, 500), FS, 500);
        pipeline.ingest(healthy.pull_chunk(Duration::ZERO).unwrap());
        let frame = updated(pipeline.tick(&mut BrokenSource));
        assert_eq!(frame.state, EyeState::Closed);
    }
    struct SilentSource;
    impl SampleSource for SilentSource {
        fn pull_chunk(&mut self, timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
            Err(AlphaError::timed_out(timeout))
        }
    }
    #[test]
    fn timeouts_leave_buffer_untouched_and_still_analyze() {
        let samples: Vec<Sample> = sine(10.0, 50.0, 500)
            .into_iter()
            .enumerate()
            .map(|(i, v)| Sample::new(v, i as f64 / FS))
            .collect();
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        pipeline.ingest(samples[..300].to_vec());
        for _ in 0..3 {
            match pipeline.tick(&mut SilentSource) {
                TickOutcome::WarmingUp { buffered, needed } => {
                    assert_eq!(buffered, 300);
                    assert_eq!(needed, 500);
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
        assert_eq!(pipeline.state(), EyeState::Unknown);
        pipeline.ingest(samples[300..].to_vec());
        let frame = updated(pipeline.tick(&mut SilentSource));
        assert_eq!(frame.state, EyeState::Closed);
        assert_eq!(frame.latest_timestamp, 499.0 / FS);
        assert_eq!(pipeline.raw_history().len(), 500);
        assert_eq!(pipeline.power_history().len(), 1);
    }
    #[test]
    fn synthetic_closed_block_is_detected() {
        let profile = SyntheticProfile::new(FS);
        let mut source = SyntheticSource::seeded(profile, 11);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        // First 8 s are eyes open, the next 8 s eyes closed.
        pipeline.ingest(source.generate(7 * 250));
        assert_eq!(updated(pipeline.process()).state, EyeState::Open);
        pipeline.ingest(source.generate(7 * 250));
        assert_eq!(updated(pipeline.process()).state, EyeState::Closed);
    }
}
