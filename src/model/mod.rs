//! Data Model
//!
//! Types shared by the REST clients, the form controller and the CLI.

pub mod cardio;
pub mod error;
pub mod prediction;

pub use cardio::{
    BloodPressurePoint, BloodPressureRange, ChartData, ChartMetric, CorrelationAnalysis, CountRow,
    Dataset, DatasetStatistics, RadarPoint, RangeSummary, Record, TopCorrelation,
};
pub use error::ParseError;
pub use prediction::{
    AdvancedInput, CholesterolLevel, Draft, Field, PredictionResult, RiskBand, SimplifiedInput,
};
