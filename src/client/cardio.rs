//! Dataset Client
//!
//! Typed access to the read-only `/cardio/*` endpoints. The backend does
//! the aggregation; shapes are checked by deserialization only.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::error::ClientResult;
use super::http::ApiClient;
use crate::model::{
    BloodPressurePoint, ChartData, ChartMetric, CorrelationAnalysis, CountRow, Dataset,
    DatasetStatistics, RadarPoint,
};

/// Client for statistics, charts, correlation and raw records
#[derive(Debug, Clone)]
pub struct CardioClient {
    http: Arc<ApiClient>,
}

impl CardioClient {
    pub fn new(http: Arc<ApiClient>) -> Self {
        Self { http }
    }

    /// `GET /cardio/statistics`
    pub async fn statistics(&self) -> ClientResult<DatasetStatistics> {
        self.http
            .get_json("/cardio/statistics", "dataset statistics")
            .await
    }

    /// `GET /cardio/charts`
    pub async fn charts(&self) -> ClientResult<Vec<ChartData>> {
        self.http.get_json("/cardio/charts", "chart data").await
    }

    /// `GET /cardio/charts/{metric}` with untyped rows
    pub async fn chart(&self, metric: ChartMetric) -> ClientResult<ChartData> {
        self.chart_as(metric).await
    }

    /// `GET /cardio/charts/{metric}` decoded into a specific row shape
    pub async fn chart_as<T: DeserializeOwned>(&self, metric: ChartMetric) -> ClientResult<ChartData<T>> {
        let path = format!("/cardio/charts/{}", metric.slug());
        self.http.get_json(&path, metric.describe()).await
    }

    /// Sick/healthy count chart
    pub async fn count_chart(&self, metric: ChartMetric) -> ClientResult<ChartData<CountRow>> {
        self.chart_as(metric).await
    }

    pub async fn blood_pressure_correlation(&self) -> ClientResult<ChartData<BloodPressurePoint>> {
        self.chart_as(ChartMetric::BloodPressureCorrelation).await
    }

    pub async fn risk_factors(&self) -> ClientResult<ChartData<RadarPoint>> {
        self.chart_as(ChartMetric::RiskFactorsRadar).await
    }

    /// `GET /cardio/correlation`
    pub async fn correlation(&self) -> ClientResult<CorrelationAnalysis> {
        self.http
            .get_json("/cardio/correlation", "correlation analysis")
            .await
    }

    /// `GET /cardio/dataset`
    pub async fn dataset(&self) -> ClientResult<Dataset> {
        self.http
            .get_json("/cardio/dataset", "complete dataset")
            .await
    }
}
