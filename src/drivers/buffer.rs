use std::collections::VecDeque;
use crate::drivers::AlphaError;
/// One scalar value stamped with the acquisition time of the raw sample it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub timestamp: f64,
}
impl Sample {
    pub fn new(value: f64, timestamp: f64) -> Self {
        Self { value, timestamp }
    }
}
/// Converts a duration into a whole number of samples at `sample_rate_hz`.
pub fn seconds_to_samples(seconds: f64, sample_rate_hz: f64) -> usize {
    (seconds * sample_rate_hz).round().max(0.0) as usize
}
/// Rolling history of values and their timestamps, oldest first.
///
/// Both sequences always have the same length. Once `capacity` entries are held,
/// every push evicts the oldest entry.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    values: VecDeque<f64>,
    timestamps: VecDeque<f64>,
    capacity: usize,
}
impl HistoryBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            timestamps: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn with_history_seconds(
        history_seconds: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, AlphaError> {
        if sample_rate_hz <= 0.0 {
            return Err(AlphaError::InvalidConfig(
                "sample rate must be greater than zero".into(),
            ));
        }
        let capacity = seconds_to_samples(history_seconds, sample_rate_hz);
        if capacity == 0 {
            return Err(AlphaError::InvalidConfig(format!(
                "history of {history_seconds} s holds no samples at {sample_rate_hz} Hz"
            )));
        }
        Ok(Self::with_capacity(capacity))
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn push(&mut self, value: f64, timestamp: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
            self.timestamps.pop_front();
        }
        self.values.push_back(value);
        self.timestamps.push_back(timestamp);
    }
    pub fn extend(&mut self, samples: impl IntoIterator<Item = Sample>) {
        for sample in samples {
            self.push(sample.value, sample.timestamp);
        }
    }
    pub fn latest(&self) -> Option<Sample> {
        match (self.values.back(), self.timestamps.back()) {
            (Some(&value), Some(&timestamp)) => Some(Sample { value, timestamp }),
            _ => None,
        }
    }
    /// Current contents as `(values, timestamps)` in arrival order.
    pub fn as_arrays(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.values.iter().copied().collect(),
            self.timestamps.iter().copied().collect(),
        )
    }
    /// Fails when fewer than `needed` entries are buffered.
    pub fn require(&self, needed: usize) -> Result<(), AlphaError> {
        if self.len() < needed {
            return Err(AlphaError::InsufficientData {
                needed,
                actual: self.len(),
            });
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn never_exceeds_capacity_and_evicts_oldest_first() {
        let mut buffer = HistoryBuffer::with_capacity(4);
        for i in 0..10 {
            buffer.push(i as f64, i as f64 * 0.004);
            assert!(buffer.len() <= 4);
        }
        let (values, timestamps) = buffer.as_arrays();
        assert_eq!(values, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(timestamps.len(), values.len());
        assert!((timestamps[0] - 0.024).abs() < 1e-12);
        assert_eq!(buffer.latest(), Some(Sample::new(9.0, 9.0 * 0.004)));
    }
    #[test]
    fn capacity_follows_history_duration() {
        let buffer = HistoryBuffer::with_history_seconds(10.0, 250.0).unwrap();
        assert_eq!(buffer.capacity(), 2500);
        assert_eq!(buffer.len(), 0);
        assert!(HistoryBuffer::with_history_seconds(10.0, 0.0).is_err());
    }
    #[test]
    fn require_reports_current_length() {
        let mut buffer = HistoryBuffer::with_capacity(8);
        buffer.extend((0..3).map(|i| Sample::new(1.0, i as f64)));
        match buffer.require(5) {
            Err(AlphaError::InsufficientData { needed, actual }) => {
                assert_eq!(needed, 5);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(buffer.require(3).is_ok());
    }
}
