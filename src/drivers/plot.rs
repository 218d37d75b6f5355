use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::classifier::EyeState;
use crate::drivers::error::AlphaError;
use crate::drivers::pipeline::DisplayFrame;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub signal_color: RGBColor,
    pub power_color: RGBColor,
    /// Fixed +/- range of the EEG panel in microvolts.
    pub amplitude_uv: f64,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            background: RGBColor(10, 10, 10),
            signal_color: RGBColor(230, 230, 230),
            power_color: YELLOW,
            amplitude_uv: 500.0,
        }
    }
}
fn state_color(state: EyeState) -> RGBColor {
    match state {
        EyeState::Closed => GREEN,
        EyeState::Open => RED,
        EyeState::Unknown => WHITE,
    }
}
/// Renders the filtered EEG panel above the relative alpha power panel as PNG bytes.
pub fn render_frame_png(frame: &DisplayFrame, style: PlotStyle) -> Result<Vec<u8>, AlphaError> {
    if frame.signal.is_empty() {
        return Err(AlphaError::Plot("display frame has no samples".into()));
    }
    let history = frame.history_seconds.max(frame.window_seconds);
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let panels = root.split_evenly((2, 1));
        let amp = style.amplitude_uv;
        let mut eeg = ChartBuilder::on(&panels[0])
            .margin(10)
            .caption(
                "EEG Signal (Single Channel)",
                ("sans-serif", 20).into_font().color(&WHITE),
            )
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 35)
            .build_cartesian_2d(-history..0.0, -amp..amp)?;
        eeg.configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .x_desc("Time (s)")
            .y_desc("Amplitude (uV)")
            .draw()?;
        eeg.draw_series(std::iter::once(Rectangle::new(
            [(-frame.window_seconds, -amp), (0.0, amp)],
            RGBColor(50, 50, 200).mix(0.2).filled(),
        )))?;
        let signal = frame
            .signal
            .offsets
            .iter()
            .zip(&frame.signal.values)
            .map(|(&t, &v)| (t, v.clamp(-amp, amp)));
        eeg.draw_series(LineSeries::new(signal, &style.signal_color))?;
        let y_max = frame
            .power
            .values
            .iter()
            .copied()
            .fold(1.0f64, f64::max);
        let title = format!("Relative Alpha Power - State: {}", frame.state);
        let mut power = ChartBuilder::on(&panels[1])
            .margin(10)
            .caption(
                title,
                ("sans-serif", 20)
                    .into_font()
                    .color(&state_color(frame.state)),
            )
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 35)
            .build_cartesian_2d(-history..0.0, 0.0..y_max)?;
        power
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .x_desc("Time (s)")
            .y_desc("Relative Power")
            .draw()?;
        power.draw_series(LineSeries::new(
            vec![(-history, frame.threshold), (0.0, frame.threshold)],
            &RED,
        ))?;
        let points = frame
            .power
            .offsets
            .iter()
            .zip(&frame.power.values)
            .map(|(&t, &v)| (t, v));
        power.draw_series(LineSeries::new(points, &style.power_color))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AlphaError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AlphaError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::pipeline::{AlphaPipeline, PipelineSettings, TickOutcome};
    use crate::drivers::source::ManualSource;
    #[test]
    fn renders_a_live_frame() {
        let signal: Vec<f64> = (0..600)
            .map(|i| 40.0 * (2.0 * std::f64::consts::PI * 10.0 * i as f64 / 250.0).sin())
            .collect();
        let mut source = ManualSource::from_signal(&signal, 250.0, 600);
        let mut pipeline = AlphaPipeline::new(PipelineSettings::default()).unwrap();
        let TickOutcome::Updated(frame) = pipeline.tick(&mut source) else {
            panic!("expected a frame");
        };
        let png = render_frame_png(&frame, PlotStyle::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
