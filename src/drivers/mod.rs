// src/drivers/mod.rs
pub mod buffer;
pub mod classifier;
pub mod error;
pub mod fft;
pub mod filter;
pub mod pipeline;
pub mod plot;
pub mod source;
pub use buffer::{seconds_to_samples, HistoryBuffer, Sample};
pub use classifier::EyeState;
pub use error::AlphaError;
pub use fft::FrequencyBand;
pub use filter::BandpassSpec;
pub use pipeline::{AlphaPipeline, DisplayFrame, PipelineSettings, TickOutcome};
pub use plot::{render_frame_png, PlotStyle};
pub use source::{SampleSource, SyntheticProfile, SyntheticSource};
