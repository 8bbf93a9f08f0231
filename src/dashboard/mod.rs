//! Dashboard Loading
//!
//! Fetches the dashboard sections concurrently. Every section resolves on
//! its own, so one failing chart does not hide the others.

pub mod export;

use futures_util::stream::{self, Stream, StreamExt};
use std::collections::BTreeMap;

use crate::client::{CardioClient, ClientResult};
use crate::model::{ChartData, ChartMetric, CorrelationAnalysis, DatasetStatistics};

pub use export::{export_csv, export_csv_to_path, ExportError, DEFAULT_FILE_NAME};

/// Everything the overview page shows
#[derive(Debug)]
pub struct Overview {
    pub statistics: ClientResult<DatasetStatistics>,
    pub correlation: ClientResult<CorrelationAnalysis>,
    pub charts: BTreeMap<ChartMetric, ClientResult<ChartData>>,
}

impl Overview {
    /// Number of sections that failed to load
    pub fn failures(&self) -> usize {
        usize::from(self.statistics.is_err())
            + usize::from(self.correlation.is_err())
            + self.charts.values().filter(|c| c.is_err()).count()
    }
}

#[derive(Debug, Clone)]
pub struct DashboardLoader {
    cardio: CardioClient,
    max_concurrent: usize,
}

impl DashboardLoader {
    pub fn new(cardio: CardioClient, max_concurrent: usize) -> Self {
        Self {
            cardio,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Charts in completion order, at most `max_concurrent` in flight
    pub fn charts_stream(
        &self,
        metrics: Vec<ChartMetric>,
    ) -> impl Stream<Item = (ChartMetric, ClientResult<ChartData>)> + '_ {
        stream::iter(metrics)
            .map(move |metric| async move { (metric, self.cardio.chart(metric).await) })
            .buffer_unordered(self.max_concurrent)
    }

    pub async fn load_overview(&self) -> Overview {
        tracing::info!(max_concurrent = self.max_concurrent, "Loading dashboard");

        let charts = async {
            self.charts_stream(ChartMetric::ALL.to_vec())
                .inspect(|(metric, result)| {
                    if let Err(e) = result {
                        tracing::warn!(%metric, error = %e, "Chart failed to load");
                    }
                })
                .collect::<BTreeMap<_, _>>()
                .await
        };

        let (statistics, correlation, charts) =
            tokio::join!(self.cardio.statistics(), self.cardio.correlation(), charts);

        Overview {
            statistics,
            correlation,
            charts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stub::{sample_chart, sample_correlation, sample_statistics, spawn_stub};
    use crate::client::ApiClient;
    use crate::config::ApiConfig;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    async fn loader(router: Router, cap: usize) -> DashboardLoader {
        let base_url = spawn_stub(router).await;
        let http = Arc::new(ApiClient::new(&ApiConfig::new(base_url)).unwrap());
        DashboardLoader::new(CardioClient::new(http), cap)
    }

    #[tokio::test]
    async fn test_charts_respect_concurrency_cap() {
        let gauge = Arc::new(Gauge::default());
        let router = Router::new().route(
            "/cardio/charts/:metric",
            get({
                let gauge = Arc::clone(&gauge);
                move |Path(metric): Path<String>| {
                    let gauge = Arc::clone(&gauge);
                    async move {
                        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
                        gauge.peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        gauge.current.fetch_sub(1, Ordering::SeqCst);
                        Json(sample_chart(&metric))
                    }
                }
            }),
        );

        let loader = loader(router, 2).await;
        let charts: Vec<_> = loader
            .charts_stream(ChartMetric::ALL.to_vec())
            .collect()
            .await;

        assert_eq!(charts.len(), ChartMetric::ALL.len());
        assert!(charts.iter().all(|(_, r)| r.is_ok()));
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_overview_isolates_failures() {
        let router = Router::new()
            .route("/cardio/statistics", get(|| async { Json(sample_statistics()) }))
            .route("/cardio/correlation", get(|| async { Json(sample_correlation()) }))
            .route(
                "/cardio/charts/:metric",
                get(|Path(metric): Path<String>| async move {
                    if metric == "smoking" {
                        Err(StatusCode::INTERNAL_SERVER_ERROR)
                    } else {
                        Ok(Json(sample_chart(&metric)))
                    }
                }),
            );

        let overview = loader(router, 4).await.load_overview().await;

        assert!(overview.statistics.is_ok());
        assert!(overview.correlation.is_ok());
        assert_eq!(overview.charts.len(), ChartMetric::ALL.len());
        assert_eq!(overview.failures(), 1);

        let smoking = overview.charts[&ChartMetric::Smoking].as_ref().unwrap_err();
        assert_eq!(
            smoking.to_string(),
            "Failed to fetch smoking chart data: Internal Server Error"
        );
    }
}
