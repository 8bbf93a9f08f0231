//! Application Context
//!
//! Explicitly constructed holder for the configured clients, the theme
//! store and the form factories. Everything downstream receives what it
//! needs from here instead of reaching for globals.

pub mod theme;

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::{ApiClient, CardioClient, ClientError, HttpPredictionClient, PredictionApi};
use crate::config::Config;
use crate::controller::{AdvancedForm, FormController, SimplifiedForm};
use crate::dashboard::DashboardLoader;

pub use theme::{Theme, ThemeError, ThemeStore};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] ClientError),
}

pub struct AppContext {
    config: Config,
    http: Arc<ApiClient>,
    cardio: CardioClient,
    predictions: Arc<dyn PredictionApi>,
    theme: ThemeStore,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self, ContextError> {
        let http = Arc::new(ApiClient::new(&config.api)?);
        let predictions: Arc<dyn PredictionApi> =
            Arc::new(HttpPredictionClient::new(Arc::clone(&http)));
        Ok(Self::assemble(config, http, predictions))
    }

    /// Same as [`AppContext::new`] with a custom prediction backend
    pub fn with_prediction_api(
        config: Config,
        predictions: Arc<dyn PredictionApi>,
    ) -> Result<Self, ContextError> {
        let http = Arc::new(ApiClient::new(&config.api)?);
        Ok(Self::assemble(config, http, predictions))
    }

    fn assemble(config: Config, http: Arc<ApiClient>, predictions: Arc<dyn PredictionApi>) -> Self {
        let cardio = CardioClient::new(Arc::clone(&http));
        let theme = ThemeStore::new(PathBuf::from(&config.ui.theme_file));

        tracing::info!(base_url = http.base_url(), "Application context ready");
        Self {
            config,
            http,
            cardio,
            predictions,
            theme,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub fn cardio(&self) -> &CardioClient {
        &self.cardio
    }

    pub fn predictions(&self) -> Arc<dyn PredictionApi> {
        Arc::clone(&self.predictions)
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    pub fn dashboard(&self) -> DashboardLoader {
        DashboardLoader::new(self.cardio.clone(), self.config.dashboard.max_concurrent_fetches)
    }

    /// Fresh simplified form; must be called inside a tokio runtime
    pub fn simplified_form(&self) -> FormController<SimplifiedForm> {
        FormController::new(self.predictions(), self.config.prediction.debounce_window())
    }

    /// Fresh advanced form; must be called inside a tokio runtime
    pub fn advanced_form(&self) -> FormController<AdvancedForm> {
        FormController::new(self.predictions(), self.config.prediction.debounce_window())
    }

    pub fn shutdown(self) {
        tracing::info!("Application context shut down");
    }
}
