use std::time::Duration;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum AlphaError {
    #[error("invalid band-pass spec: {low_hz} Hz..{high_hz} Hz, order {order}, sample rate {sample_rate_hz} Hz")]
    InvalidFilterSpec {
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
        order: usize,
    },
    #[error("not enough buffered samples: need {needed}, have {actual}")]
    InsufficientData { needed: usize, actual: usize },
    #[error("analysis window too short for one Welch segment: need {needed}, have {actual}")]
    InsufficientWindow { needed: usize, actual: usize },
    #[error("signal too short for zero-phase filtering: need more than {needed} samples, have {actual}")]
    InsufficientSignalLength { needed: usize, actual: usize },
    #[error("data source timed out after {timeout_ms} ms")]
    DataSourceTimeout { timeout_ms: u64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("data source failed: {0}")]
    Source(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl AlphaError {
    /// A pull that waited the full `timeout` without receiving anything.
    pub fn timed_out(timeout: Duration) -> Self {
        AlphaError::DataSourceTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
    /// Errors that only cost the current tick; the next tick retries with fresh buffer contents.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AlphaError::InsufficientData { .. }
                | AlphaError::InsufficientWindow { .. }
                | AlphaError::InsufficientSignalLength { .. }
                | AlphaError::DataSourceTimeout { .. }
        )
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AlphaError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AlphaError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for AlphaError {
    fn from(value: image::ImageError) -> Self {
        AlphaError::Plot(value.to_string())
    }
}
