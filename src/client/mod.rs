//! Backend clients
//!
//! HTTP access to the cardio prediction backend: the dataset endpoints
//! used by the dashboard and the two prediction endpoints used by the
//! forms.

pub mod cardio;
pub mod error;
pub mod http;
pub mod prediction;

pub use cardio::CardioClient;
pub use error::{ClientError, ClientResult};
pub use http::ApiClient;
pub use prediction::{FeatureVector, HttpPredictionClient, PredictionApi};

#[cfg(test)]
pub(crate) mod stub {
    //! In-process backend for client tests

    use axum::Router;
    use serde_json::{json, Value};

    /// Serve `router` on an ephemeral port and return its base URL
    pub async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub fn sample_statistics() -> Value {
        json!({
            "total_records": 68000,
            "cardio_positive": 34000,
            "cardio_negative": 34000,
            "age_range": {"min": 29.0, "max": 65.0, "mean": 53.3, "median": 54.0},
            "bmi_range": {"min": 15.0, "max": 50.0, "mean": 27.4, "median": 26.3},
            "blood_pressure_range": {
                "systolic": {"min": 60.0, "max": 240.0, "mean": 126.6, "median": 120.0},
                "diastolic": {"min": 40.0, "max": 190.0, "mean": 81.3, "median": 80.0}
            }
        })
    }

    pub fn sample_chart(title: &str) -> Value {
        json!({
            "chart_type": "bar",
            "title": title,
            "description": "",
            "x_label": "x",
            "data": []
        })
    }

    pub fn sample_correlation() -> Value {
        json!({
            "correlation_matrix": [[1.0, 0.24], [0.24, 1.0]],
            "feature_names": ["age", "cardio"],
            "top_correlations": [{"feature": "age", "correlation": 0.24}]
        })
    }
}
