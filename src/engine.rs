// src/engine.rs
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, info};
use crate::config::AppConfig;
use crate::drivers::{AlphaError, AlphaPipeline, DisplayFrame, SampleSource, TickOutcome};
use crate::types::{EngineCommand, EngineMessage};

/// Starts the tick loop on its own thread. The thread owns both the pipeline and the
/// source, so buffers only ever see one writer.
pub fn spawn_thread<S>(
    config: &AppConfig,
    source: S,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<EngineCommand>,
) -> Result<JoinHandle<()>, AlphaError>
where
    S: SampleSource + Send + 'static,
{
    let pipeline = AlphaPipeline::new(config.pipeline_settings())?;
    let period = config.tick_period();
    Ok(thread::spawn(move || {
        run_loop(pipeline, source, period, tx, rx_cmd)
    }))
}

fn run_loop<S: SampleSource>(
    mut pipeline: AlphaPipeline,
    mut source: S,
    period: Duration,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<EngineCommand>,
) {
    tx.send(EngineMessage::Log(format!(
        "Engine ready: {} ms ticks, {}-sample window",
        period.as_millis(),
        pipeline.window_samples()
    )))
    .ok();
    loop {
        let started = Instant::now();
        match rx_cmd.try_recv() {
            Ok(EngineCommand::Stop) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
        let message = match pipeline.tick(&mut source) {
            TickOutcome::WarmingUp { buffered, needed } => {
                EngineMessage::WarmingUp { buffered, needed }
            }
            TickOutcome::Updated(frame) => EngineMessage::Frame(frame),
            TickOutcome::Skipped(err) => EngineMessage::Skipped(err.to_string()),
        };
        if tx.send(message).is_err() {
            debug!("front end went away, stopping engine");
            break;
        }
        thread::sleep(period.saturating_sub(started.elapsed()));
    }
    info!("engine stopped");
    tx.send(EngineMessage::Stopped).ok();
}

/// Runs `ticks` cycles on the calling thread and returns the last frame produced.
pub fn run_headless<S: SampleSource + ?Sized>(
    pipeline: &mut AlphaPipeline,
    source: &mut S,
    ticks: usize,
    period: Duration,
) -> Option<DisplayFrame> {
    let mut last = None;
    for tick in 0..ticks {
        let started = Instant::now();
        match pipeline.tick(source) {
            TickOutcome::WarmingUp { buffered, needed } => {
                debug!("tick {tick}: warming up {buffered}/{needed}");
            }
            TickOutcome::Updated(frame) => {
                info!(
                    "tick {tick}: relative alpha {:.3} -> {}",
                    frame.relative_power, frame.state
                );
                last = Some(frame);
            }
            TickOutcome::Skipped(err) => debug!("tick {tick}: skipped ({err})"),
        }
        thread::sleep(period.saturating_sub(started.elapsed()));
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::ManualSource;
    use crate::drivers::{EyeState, Sample};
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::channel;
    use std::sync::Arc;

    fn alpha_source(samples: usize, chunk: usize) -> ManualSource {
        let signal: Vec<f64> = (0..samples)
            .map(|i| 50.0 * (2.0 * PI * 10.0 * i as f64 / 250.0).sin())
            .collect();
        ManualSource::from_signal(&signal, 250.0, chunk)
    }

    #[test]
    fn engine_thread_emits_frames_and_stops_on_command() {
        let config = AppConfig {
            tick_ms: 2,
            pull_timeout_ms: 0,
            ..AppConfig::default()
        };
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(&config, alpha_source(600, 100), tx, rx_cmd).unwrap();
        let mut warmups = 0;
        let frame = loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                EngineMessage::Frame(frame) => break frame,
                EngineMessage::WarmingUp { .. } => warmups += 1,
                _ => {}
            }
        };
        assert_eq!(warmups, 4);
        assert_eq!(frame.state, EyeState::Closed);
        tx_cmd.send(EngineCommand::Stop).unwrap();
        handle.join().unwrap();
        assert!(rx.iter().any(|m| matches!(m, EngineMessage::Stopped)));
    }

    struct IdleDevice(Arc<AtomicBool>);
    impl SampleSource for IdleDevice {
        fn pull_chunk(&mut self, timeout: Duration) -> Result<Vec<Sample>, AlphaError> {
            Err(AlphaError::timed_out(timeout))
        }
    }
    impl Drop for IdleDevice {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn source_is_released_once_the_stopped_engine_is_joined() {
        let config = AppConfig {
            tick_ms: 2,
            pull_timeout_ms: 1,
            ..AppConfig::default()
        };
        let released = Arc::new(AtomicBool::new(false));
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(&config, IdleDevice(released.clone()), tx, rx_cmd).unwrap();
        let warming = rx
            .iter()
            .filter(|m| matches!(m, EngineMessage::WarmingUp { buffered: 0, .. }))
            .take(3)
            .count();
        assert_eq!(warming, 3);
        assert!(!released.load(Ordering::SeqCst));
        tx_cmd.send(EngineCommand::Stop).unwrap();
        handle.join().unwrap();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn headless_run_returns_last_frame() {
        let config = AppConfig::default();
        let mut pipeline = AlphaPipeline::new(config.pipeline_settings()).unwrap();
        let mut source = alpha_source(700, 250);
        let frame = run_headless(&mut pipeline, &mut source, 4, Duration::ZERO).unwrap();
        assert_eq!(frame.signal.values.len(), 700);
        // The fourth tick pulls nothing but still re-analyses the history.
        assert_eq!(frame.power.values.len(), 3);
        assert_eq!(pipeline.state(), EyeState::Closed);
    }
}
