//! Short-horizon trend prediction.

use serde::Serialize;

/// Number of trailing points the trend line is fitted on.
pub const WINDOW: usize = 10;
/// Extrapolation target: sixty one-minute steps past the newest point (x = 9).
const TARGET_X: f64 = 69.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Value(u64),
    InsufficientData,
}

/// Fit a least-squares line over the last ten values and extrapolate one hour.
///
/// Fewer than ten values is reported as `InsufficientData`; the result is
/// clamped to zero and rounded.
pub fn predict_next_hour(history: &[f64]) -> Prediction {
    if history.len() < WINDOW {
        return Prediction::InsufficientData;
    }
    let window = &history[history.len() - WINDOW..];

    let n = WINDOW as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in window.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;
    let predicted = slope * TARGET_X + intercept;

    if predicted.is_finite() {
        Prediction::Value(predicted.max(0.0).round() as u64)
    } else {
        Prediction::Value(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_points_are_insufficient() {
        let history: Vec<f64> = (0..9).map(|i| i as f64).collect();
        assert_eq!(predict_next_hour(&history), Prediction::InsufficientData);
        assert_eq!(predict_next_hour(&[]), Prediction::InsufficientData);
    }

    #[test]
    fn ten_points_give_a_value() {
        let history = [12.0; 10];
        assert_eq!(predict_next_hour(&history), Prediction::Value(12));
    }

    #[test]
    fn linear_sequence_extrapolates_exactly() {
        let history: Vec<f64> = (0..10).map(|i| 2.0 * i as f64 + 10.0).collect();
        assert_eq!(predict_next_hour(&history), Prediction::Value(2 * 69 + 10));
    }

    #[test]
    fn only_last_ten_points_are_used() {
        let mut history = vec![1000.0; 5];
        history.extend((0..10).map(|i| 3.0 * i as f64 + 1.0));
        assert_eq!(predict_next_hour(&history), Prediction::Value(3 * 69 + 1));
    }

    #[test]
    fn falling_trend_is_clamped_to_zero() {
        let history: Vec<f64> = (0..10).map(|i| 50.0 - 5.0 * i as f64).collect();
        assert_eq!(predict_next_hour(&history), Prediction::Value(0));
    }

    #[test]
    fn result_is_rounded() {
        // slope 0.5, intercept 0.25: 0.5 * 69 + 0.25 = 34.75
        let history: Vec<f64> = (0..10).map(|i| 0.5 * i as f64 + 0.25).collect();
        assert_eq!(predict_next_hour(&history), Prediction::Value(35));
    }
}
