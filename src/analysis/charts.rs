//! Chart helpers
//!
//! Small derivations over chart payloads used by the dashboard views.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::model::{BloodPressurePoint, CountRow};

/// Sick/healthy totals across the rows of a count chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountTotals {
    pub sick: u64,
    pub healthy: u64,
}

impl CountTotals {
    pub fn from_rows(rows: &[CountRow]) -> Self {
        rows.iter().fold(Self::default(), |acc, row| Self {
            sick: acc.sick + row.num_sick_people,
            healthy: acc.healthy + row.num_healthy_people,
        })
    }

    pub fn total(&self) -> u64 {
        self.sick + self.healthy
    }

    /// Share of sick people, `None` for an empty chart
    pub fn sick_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.sick as f64 / total as f64),
        }
    }
}

fn coefficient_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)corrélation entre ces deux variables est de (-?\d+(?:[.,]\d+)?)")
                .map_err(|e| tracing::error!(error = %e, "Invalid coefficient pattern"))
                .ok()
        })
        .as_ref()
}

/// Pull the correlation coefficient quoted in a chart description
pub fn correlation_from_description(description: &str) -> Option<f64> {
    let caps = coefficient_pattern()?.captures(description)?;
    caps.get(1)?.as_str().replace(',', ".").parse().ok()
}

/// Split scatter points into (sick, healthy) `(ap_hi, ap_lo)` series
pub fn split_by_outcome(points: &[BloodPressurePoint]) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let mut sick = Vec::new();
    let mut healthy = Vec::new();
    for point in points {
        let xy = (point.ap_hi, point.ap_lo);
        if point.cardio == 1 {
            sick.push(xy);
        } else {
            healthy.push(xy);
        }
    }
    (sick, healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_totals() {
        let rows: Vec<CountRow> = serde_json::from_value(json!([
            {"smoke": 0, "num_sick_people": 30, "num_healthy_people": 50},
            {"smoke": 1, "num_sick_people": 5, "num_healthy_people": 15}
        ]))
        .unwrap();

        let totals = CountTotals::from_rows(&rows);
        assert_eq!(totals.sick, 35);
        assert_eq!(totals.healthy, 65);
        assert_eq!(totals.total(), 100);
        assert_eq!(totals.sick_rate(), Some(0.35));
        assert_eq!(CountTotals::from_rows(&[]).sick_rate(), None);
    }

    #[test]
    fn test_correlation_from_description() {
        let text = "Systolique contre diastolique. La corrélation entre ces deux variables est de 0.73.";
        assert_eq!(correlation_from_description(text), Some(0.73));
        assert_eq!(
            correlation_from_description("Corrélation entre ces deux variables est de -0,12"),
            Some(-0.12)
        );
        assert_eq!(correlation_from_description("No coefficient here"), None);
    }

    #[test]
    fn test_split_by_outcome() {
        let points = [
            BloodPressurePoint { ap_hi: 140.0, ap_lo: 90.0, cardio: 1 },
            BloodPressurePoint { ap_hi: 120.0, ap_lo: 80.0, cardio: 0 },
            BloodPressurePoint { ap_hi: 160.0, ap_lo: 100.0, cardio: 1 },
        ];
        let (sick, healthy) = split_by_outcome(&points);
        assert_eq!(sick, vec![(140.0, 90.0), (160.0, 100.0)]);
        assert_eq!(healthy, vec![(120.0, 80.0)]);
    }
}
