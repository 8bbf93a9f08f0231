//! Least-squares trend line for scatter charts

use serde::Serialize;

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    /// Fit by ordinary least squares
    ///
    /// Returns `None` when there are no points or every x is identical.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let n = points.len() as f64;
        let (sum_x, sum_y) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let mean_x = sum_x / n;
        let mean_y = sum_y / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in points {
            let dx = x - mean_x;
            sxy += dx * (y - mean_y);
            sxx += dx * dx;
        }

        if sxx == 0.0 || !sxx.is_finite() {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Line segment spanning the x range of `points`
    pub fn segment(&self, points: &[(f64, f64)]) -> Option<[(f64, f64); 2]> {
        let min_x = points.iter().map(|p| p.0).reduce(f64::min)?;
        let max_x = points.iter().map(|p| p.0).reduce(f64::max)?;
        Some([(min_x, self.at(min_x)), (max_x, self.at(max_x))])
    }
}
