use std::fmt;
use serde::{Deserialize, Serialize};
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeState {
    Open,
    Closed,
    Unknown,
}
impl EyeState {
    pub fn label(&self) -> &'static str {
        match self {
            EyeState::Open => "Eyes OPEN",
            EyeState::Closed => "Eyes CLOSED",
            EyeState::Unknown => "Unknown",
        }
    }
}
impl fmt::Display for EyeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
/// `Closed` iff `relative_power > threshold`; equality stays `Open`.
pub fn classify(relative_power: f64, threshold: f64) -> EyeState {
    if relative_power > threshold {
        EyeState::Closed
    } else {
        EyeState::Open
    }
}
/// Threshold classifier with an optional hysteresis band around the threshold.
///
/// With `hysteresis == 0` every update is exactly [`classify`]. Otherwise the
/// state only flips to `Closed` above `threshold + hysteresis` and back to
/// `Open` at or below `threshold - hysteresis`.
#[derive(Clone, Debug)]
pub struct Classifier {
    threshold: f64,
    hysteresis: f64,
    state: EyeState,
}
impl Classifier {
    pub fn new(threshold: f64, hysteresis: f64) -> Self {
        Self {
            threshold,
            hysteresis: hysteresis.max(0.0),
            state: EyeState::Unknown,
        }
    }
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
    pub fn state(&self) -> EyeState {
        self.state
    }
    pub fn update(&mut self, relative_power: f64) -> EyeState {
        self.state = if self.hysteresis == 0.0 {
            classify(relative_power, self.threshold)
        } else {
            match self.state {
                EyeState::Closed => classify(relative_power, self.threshold - self.hysteresis),
                EyeState::Open | EyeState::Unknown => {
                    classify(relative_power, self.threshold + self.hysteresis)
                }
            }
        };
        self.state
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn strict_threshold() {
        assert_eq!(classify(0.41, 0.4), EyeState::Closed);
        assert_eq!(classify(0.4, 0.4), EyeState::Open);
        assert_eq!(classify(0.0, 0.4), EyeState::Open);
    }
    #[test]
    fn without_hysteresis_every_sample_counts() {
        let mut classifier = Classifier::new(0.4, 0.0);
        assert_eq!(classifier.state(), EyeState::Unknown);
        assert_eq!(classifier.update(0.5), EyeState::Closed);
        assert_eq!(classifier.update(0.39), EyeState::Open);
        assert_eq!(classifier.update(0.41), EyeState::Closed);
    }
    #[test]
    fn hysteresis_holds_state_inside_band() {
        let mut classifier = Classifier::new(0.4, 0.05);
        assert_eq!(classifier.update(0.42), EyeState::Open);
        assert_eq!(classifier.update(0.46), EyeState::Closed);
        assert_eq!(classifier.update(0.37), EyeState::Closed);
        assert_eq!(classifier.update(0.35), EyeState::Open);
    }
}
