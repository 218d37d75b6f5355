// src/gui.rs
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;
use eframe::egui;
use egui::{Color32, RichText, Stroke};
use egui_plot::{HLine, Line, LineStyle, Plot, PlotPoints, Polygon};
use crate::config::AppConfig;
use crate::drivers::{DisplayFrame, EyeState};
use crate::types::{EngineCommand, EngineMessage};

const AMPLITUDE_RANGE_UV: f64 = 500.0;

/// Corners of the shaded analysis window, which spans `[-window, 0]` on the time axis.
fn window_region(window_seconds: f64, amplitude: f64) -> Vec<[f64; 2]> {
    vec![
        [-window_seconds, -amplitude],
        [0.0, -amplitude],
        [0.0, amplitude],
        [-window_seconds, amplitude],
    ]
}

pub struct AlphaWatchApp {
    history_seconds: f64,
    window_seconds: f64,
    threshold: f64,
    repaint_every: Duration,

    frame: Option<DisplayFrame>,
    warm_up: Option<(usize, usize)>,
    engine_running: bool,
    log_messages: Vec<String>,

    rx: Receiver<EngineMessage>,
    tx_cmd: Sender<EngineCommand>,
}

impl AlphaWatchApp {
    pub fn new(
        config: &AppConfig,
        rx: Receiver<EngineMessage>,
        tx_cmd: Sender<EngineCommand>,
    ) -> Self {
        Self {
            history_seconds: config.history_seconds,
            window_seconds: config.window_seconds,
            threshold: config.threshold,
            repaint_every: config.tick_period(),
            frame: None,
            warm_up: None,
            engine_running: true,
            log_messages: vec!["alphawatch ready.".to_owned()],
            rx,
            tx_cmd,
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 6 {
            self.log_messages.remove(0);
        }
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                EngineMessage::Log(text) => self.log(&text),
                EngineMessage::WarmingUp { buffered, needed } => {
                    self.warm_up = Some((buffered, needed))
                }
                EngineMessage::Frame(frame) => {
                    let previous = self.state();
                    if previous != frame.state && previous != EyeState::Unknown {
                        self.log(&format!("{} -> {}", previous, frame.state));
                    }
                    self.warm_up = None;
                    self.frame = Some(frame);
                }
                // Keep showing the previous frame
                EngineMessage::Skipped(reason) => log::debug!("no update this tick: {reason}"),
                EngineMessage::Stopped => {
                    self.engine_running = false;
                    self.log("Engine stopped.");
                }
            }
        }
    }

    fn state(&self) -> EyeState {
        self.frame
            .as_ref()
            .map(|f| f.state)
            .unwrap_or(EyeState::Unknown)
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        let state = self.state();
        let color = match state {
            EyeState::Closed => Color32::GREEN,
            EyeState::Open => Color32::RED,
            EyeState::Unknown => Color32::WHITE,
        };
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("State: {}", state)).color(color).size(20.0));
            if let Some(frame) = &self.frame {
                ui.label(format!(
                    "relative alpha {:.3} at t = {:.1} s",
                    frame.relative_power, frame.latest_timestamp
                ));
            }
            if let Some((buffered, needed)) = self.warm_up {
                ui.label(format!("warming up {}/{}", buffered, needed));
            }
            if !self.engine_running {
                ui.label(RichText::new("engine stopped").color(Color32::YELLOW));
            }
        });
    }

    fn eeg_plot(&self, ui: &mut egui::Ui, height: f32) {
        Plot::new("eeg_signal")
            .height(height)
            .include_x(-self.history_seconds)
            .include_x(0.0)
            .include_y(-AMPLITUDE_RANGE_UV)
            .include_y(AMPLITUDE_RANGE_UV)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .x_axis_label("Time (s)")
            .y_axis_label("Amplitude (uV)")
            .show(ui, |plot_ui| {
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(window_region(
                        self.window_seconds,
                        AMPLITUDE_RANGE_UV,
                    )))
                    .fill_color(Color32::from_rgba_unmultiplied(50, 50, 200, 50))
                    .stroke(Stroke::new(1.0, Color32::from_rgb(80, 80, 220)))
                    .name("analysis window"),
                );
                if let Some(frame) = &self.frame {
                    plot_ui.line(
                        Line::new(PlotPoints::from(frame.signal.points()))
                            .color(Color32::LIGHT_GRAY)
                            .name("filtered EEG"),
                    );
                }
            });
    }

    fn power_plot(&self, ui: &mut egui::Ui, height: f32) {
        Plot::new("relative_alpha")
            .height(height)
            .include_x(-self.history_seconds)
            .include_x(0.0)
            .include_y(0.0)
            .include_y(1.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .x_axis_label("Time (s)")
            .y_axis_label("Relative Power")
            .show(ui, |plot_ui| {
                plot_ui.hline(
                    HLine::new(self.threshold)
                        .color(Color32::RED)
                        .width(2.0)
                        .style(LineStyle::dashed_loose()),
                );
                if let Some(frame) = &self.frame {
                    plot_ui.line(
                        Line::new(PlotPoints::from(frame.power.points()))
                            .color(Color32::YELLOW)
                            .name("relative alpha (8-12 Hz)"),
                    );
                }
            });
    }
}

impl eframe::App for AlphaWatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();
        egui::TopBottomPanel::bottom("log_panel").show(ctx, |ui| {
            for msg in &self.log_messages {
                ui.monospace(msg);
            }
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.status_line(ui);
            ui.separator();
            let height = (ui.available_height() / 2.0 - 8.0).max(80.0);
            ui.label("EEG Signal (Single Channel)");
            self.eeg_plot(ui, height - 20.0);
            ui.label("Relative Alpha Power (8-12 Hz)");
            self.power_plot(ui, height - 20.0);
        });
        ctx.request_repaint_after(self.repaint_every);
    }
}

impl Drop for AlphaWatchApp {
    fn drop(&mut self) {
        self.tx_cmd.send(EngineCommand::Stop).ok();
    }
}
