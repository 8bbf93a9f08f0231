//! Prediction Client
//!
//! Request/response calls to the two model endpoints. One network call
//! per invocation; no retry and no caching at this layer.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::error::{ClientError, ClientResult};
use super::http::ApiClient;
use crate::model::{AdvancedInput, PredictionResult, SimplifiedInput};

/// Remote model-serving endpoint
#[async_trait]
pub trait PredictionApi: Send + Sync {
    /// `POST /prediction/user` with the raw user fields
    async fn predict_simplified(&self, input: &SimplifiedInput) -> ClientResult<PredictionResult>;

    /// `POST /prediction` with the fixed-order feature vector
    async fn predict_advanced(&self, input: &AdvancedInput) -> ClientResult<PredictionResult>;
}

/// Body of `POST /prediction`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
}

impl From<&AdvancedInput> for FeatureVector {
    fn from(input: &AdvancedInput) -> Self {
        Self {
            features: input.features().to_vec(),
        }
    }
}

/// HTTP implementation of [`PredictionApi`]
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    http: Arc<ApiClient>,
}

impl HttpPredictionClient {
    pub fn new(http: Arc<ApiClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PredictionApi for HttpPredictionClient {
    async fn predict_simplified(&self, input: &SimplifiedInput) -> ClientResult<PredictionResult> {
        let result: PredictionResult = self.http.post_json("/prediction/user", input).await?;
        result.validated().map_err(ClientError::Decode)
    }

    async fn predict_advanced(&self, input: &AdvancedInput) -> ClientResult<PredictionResult> {
        let body = FeatureVector::from(input);
        let result: PredictionResult = self.http.post_json("/prediction", &body).await?;
        result.validated().map_err(ClientError::Decode)
    }
}
