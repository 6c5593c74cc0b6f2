//! Least-squares trend over a channel's recent history

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::defaults::{TREND_MIN_POINTS, TREND_WINDOW};

/// Slope (units per sample) and goodness of fit of a linear trend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Trend {
    pub slope: f64,
    /// Coefficient of determination, in [0, 1]
    pub r_squared: f64,
}

impl Trend {
    pub const NEUTRAL: Self = Self {
        slope: 0.0,
        r_squared: 0.0,
    };

    pub fn is_rising(&self, min_r_squared: f64) -> bool {
        self.slope > 0.0 && self.r_squared > min_r_squared
    }
}

/// Ordinary least squares of value against sample index.
#[derive(Debug, Clone, Copy)]
pub struct TrendAnalyzer {
    window: usize,
    min_points: usize,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(TREND_WINDOW, TREND_MIN_POINTS)
    }
}

impl TrendAnalyzer {
    /// Neither bound drops below [`TREND_MIN_POINTS`].
    pub fn new(window: usize, min_points: usize) -> Self {
        let min_points = min_points.max(TREND_MIN_POINTS);
        Self {
            window: window.max(min_points),
            min_points,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Fit the most recent `window` values (oldest first).
    ///
    /// Returns [`Trend::NEUTRAL`] when fewer than `min_points` values exist.
    /// A constant window has no variance to explain, so its r² is 0.
    pub fn analyze(&self, values: &[f64]) -> Trend {
        let start = values.len().saturating_sub(self.window);
        let window = &values[start..];
        if window.len() < self.min_points {
            return Trend::NEUTRAL;
        }

        #[allow(clippy::cast_precision_loss)]
        let xs: Vec<f64> = (0..window.len()).map(|i| i as f64).collect();
        let x_mean = xs.iter().mean();
        let y_mean = window.iter().mean();

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in xs.iter().zip(window) {
            sxy += (x - x_mean) * (y - y_mean);
            sxx += (x - x_mean).powi(2);
        }
        if sxx == 0.0 {
            return Trend::NEUTRAL;
        }
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let ss_tot: f64 = window.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r_squared = if ss_tot == 0.0 {
            0.0
        } else {
            let ss_res: f64 = xs
                .iter()
                .zip(window)
                .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
                .sum();
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        };

        if !slope.is_finite() || !r_squared.is_finite() {
            return Trend::NEUTRAL;
        }
        Trend { slope, r_squared }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fewer_than_min_points_is_neutral() {
        let analyzer = TrendAnalyzer::default();
        let values: Vec<f64> = (0..9).map(f64::from).collect();
        assert_eq!(analyzer.analyze(&values), Trend::NEUTRAL);
        assert_eq!(analyzer.analyze(&[]), Trend::NEUTRAL);
    }

    #[test]
    fn test_perfect_line() {
        let analyzer = TrendAnalyzer::default();
        let values: Vec<f64> = (0..20).map(|i| 3.0 + 0.5 * f64::from(i)).collect();
        let trend = analyzer.analyze(&values);
        assert!((trend.slope - 0.5).abs() < 1e-9, "slope: {}", trend.slope);
        assert!((trend.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_window_has_zero_r_squared() {
        let analyzer = TrendAnalyzer::default();
        let trend = analyzer.analyze(&[7.0; 15]);
        assert_eq!(trend.slope, 0.0);
        assert_eq!(trend.r_squared, 0.0);
    }

    #[test]
    fn test_uses_only_most_recent_window() {
        let analyzer = TrendAnalyzer::new(10, 10);
        // Falling first, then rising over the last 10 samples
        let mut values: Vec<f64> = (0..30).map(|i| 100.0 - f64::from(i)).collect();
        values.extend((0..10).map(|i| 50.0 + 2.0 * f64::from(i)));
        let trend = analyzer.analyze(&values);
        assert!((trend.slope - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_minimum_is_raised() {
        let analyzer = TrendAnalyzer::new(3, 3);
        assert_eq!(analyzer.window(), TREND_MIN_POINTS);
        assert_eq!(analyzer.analyze(&[1.0, 2.0, 3.0]), Trend::NEUTRAL);
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        assert!((analyzer.analyze(&values).slope - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let analyzer = TrendAnalyzer::default();
        let values = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 8.0, 7.0, 9.0, 11.0, 10.0, 12.0];
        assert_eq!(analyzer.analyze(&values), analyzer.analyze(&values));
    }

    #[test]
    fn test_noisy_series_has_partial_fit() {
        let analyzer = TrendAnalyzer::default();
        let values = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 8.0, 7.0, 9.0, 11.0, 10.0, 12.0];
        let trend = analyzer.analyze(&values);
        assert!(trend.slope > 0.0);
        assert!(trend.r_squared > 0.5 && trend.r_squared < 1.0, "r²: {}", trend.r_squared);
        assert!(trend.is_rising(0.7));
    }
}
