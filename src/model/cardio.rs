//! Dataset Types
//!
//! Shapes returned by the read-only `/cardio/*` endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// A raw chart row or patient record
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Min/max/mean/median summary of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureRange {
    pub systolic: RangeSummary,
    pub diastolic: RangeSummary,
}

/// `GET /cardio/statistics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_records: u64,
    pub cardio_positive: u64,
    pub cardio_negative: u64,
    pub age_range: RangeSummary,
    pub bmi_range: RangeSummary,
    pub blood_pressure_range: BloodPressureRange,
}

impl DatasetStatistics {
    /// Share of records with cardiovascular disease
    pub fn positive_rate(&self) -> Option<f64> {
        if self.total_records == 0 {
            return None;
        }
        Some(self.cardio_positive as f64 / self.total_records as f64)
    }
}

/// Pre-computed chart served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData<T = Record> {
    pub chart_type: String,
    pub title: String,
    pub description: String,
    pub x_label: String,
    #[serde(default)]
    pub y_label: Option<String>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> ChartData<T> {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Row of a sick/healthy count chart (age, gender, cholesterol, glucose,
/// smoking, alcohol, physical activity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRow {
    pub num_sick_people: u64,
    pub num_healthy_people: u64,
    /// The category columns (e.g. `age`, `gender`, `gluc`)
    #[serde(flatten)]
    pub category: Record,
}

/// Point of the systolic/diastolic scatter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressurePoint {
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub cardio: u8,
}

/// Axis of the risk factor radar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarPoint {
    pub factor: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCorrelation {
    pub feature: String,
    pub correlation: f64,
}

/// `GET /cardio/correlation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalysis {
    pub correlation_matrix: Vec<Vec<f64>>,
    pub feature_names: Vec<String>,
    pub top_correlations: Vec<TopCorrelation>,
}

impl CorrelationAnalysis {
    /// Matrix is square and matches the feature names
    pub fn is_consistent(&self) -> bool {
        let n = self.feature_names.len();
        self.correlation_matrix.len() == n && self.correlation_matrix.iter().all(|row| row.len() == n)
    }

    /// Coefficient between two named features
    pub fn coefficient(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.feature_names.iter().position(|f| f == a)?;
        let j = self.feature_names.iter().position(|f| f == b)?;
        self.correlation_matrix.get(i)?.get(j).copied()
    }

    /// Top correlations ordered by absolute strength
    pub fn strongest(&self, limit: usize) -> Vec<TopCorrelation> {
        let mut sorted = self.top_correlations.clone();
        sorted.sort_by(|a, b| {
            b.correlation
                .abs()
                .partial_cmp(&a.correlation.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(limit);
        sorted
    }
}

/// `GET /cardio/dataset`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub total_records: u64,
}

impl Dataset {
    /// Columns of a patient record in display order
    pub const PATIENT_COLUMNS: [&'static str; 13] = [
        "id", "age", "gender", "height", "weight", "ap_hi", "ap_lo", "cholesterol", "gluc", "smoke",
        "alco", "active", "cardio",
    ];

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Known patient columns first, then any extra keys in sorted order
    pub fn columns(&self) -> Vec<String> {
        let mut extra: Vec<String> = self
            .data
            .iter()
            .flat_map(|record| record.keys())
            .filter(|key| !Self::PATIENT_COLUMNS.contains(&key.as_str()))
            .cloned()
            .collect();
        extra.sort();
        extra.dedup();

        Self::PATIENT_COLUMNS
            .iter()
            .filter(|col| self.data.iter().any(|r| r.contains_key(**col)))
            .map(|col| col.to_string())
            .chain(extra)
            .collect()
    }
}

/// Charts available under `/cardio/charts/{metric}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartMetric {
    Age,
    Gender,
    BloodPressure,
    BloodPressureCorrelation,
    BmiAge,
    Cholesterol,
    Glucose,
    PhysicalActivity,
    Smoking,
    Alcohol,
    RiskFactorsRadar,
}

impl ChartMetric {
    pub const ALL: [ChartMetric; 11] = [
        ChartMetric::Age,
        ChartMetric::Gender,
        ChartMetric::BloodPressure,
        ChartMetric::BloodPressureCorrelation,
        ChartMetric::BmiAge,
        ChartMetric::Cholesterol,
        ChartMetric::Glucose,
        ChartMetric::PhysicalActivity,
        ChartMetric::Smoking,
        ChartMetric::Alcohol,
        ChartMetric::RiskFactorsRadar,
    ];

    /// Path segment used by the backend
    pub fn slug(&self) -> &'static str {
        match self {
            ChartMetric::Age => "age",
            ChartMetric::Gender => "gender",
            ChartMetric::BloodPressure => "blood-pressure",
            ChartMetric::BloodPressureCorrelation => "blood-pressure-correlation",
            ChartMetric::BmiAge => "bmi-age",
            ChartMetric::Cholesterol => "cholesterol",
            ChartMetric::Glucose => "glucose",
            ChartMetric::PhysicalActivity => "physical-activity",
            ChartMetric::Smoking => "smoking",
            ChartMetric::Alcohol => "alcohol",
            ChartMetric::RiskFactorsRadar => "risk-factors-radar",
        }
    }

    /// Description used in fetch error messages
    pub fn describe(&self) -> &'static str {
        match self {
            ChartMetric::Age => "age distribution chart data",
            ChartMetric::Gender => "gender distribution chart data",
            ChartMetric::BloodPressure => "blood pressure chart data",
            ChartMetric::BloodPressureCorrelation => "blood pressure correlation chart data",
            ChartMetric::BmiAge => "BMI vs age chart data",
            ChartMetric::Cholesterol => "cholesterol chart data",
            ChartMetric::Glucose => "glucose chart data",
            ChartMetric::PhysicalActivity => "physical activity chart data",
            ChartMetric::Smoking => "smoking chart data",
            ChartMetric::Alcohol => "alcohol chart data",
            ChartMetric::RiskFactorsRadar => "risk factors radar chart data",
        }
    }

    /// Charts whose rows are sick/healthy counts
    pub fn is_count_chart(&self) -> bool {
        matches!(
            self,
            ChartMetric::Age
                | ChartMetric::Gender
                | ChartMetric::Cholesterol
                | ChartMetric::Glucose
                | ChartMetric::PhysicalActivity
                | ChartMetric::Smoking
                | ChartMetric::Alcohol
        )
    }
}

impl fmt::Display for ChartMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChartMetric {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ChartMetric::ALL
            .iter()
            .find(|m| m.slug() == wanted)
            .copied()
            .ok_or_else(|| ParseError::UnknownChart(s.to_string()))
    }
}
