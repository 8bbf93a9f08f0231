//! # Cardiolens
//!
//! Client toolkit for a cardiovascular-disease REST backend: a dataset
//! dashboard and a risk-prediction form with manual and realtime modes.
//!
//! ## Modules
//!
//! - [`client`]: HTTP clients for the `/cardio/*` and `/prediction*` endpoints
//! - [`validation`]: field rules for the two prediction forms
//! - [`debounce`]: quiet-window debouncing on the tokio timer
//! - [`controller`]: form state machine and its async driver
//! - [`dashboard`]: concurrent dashboard loading and CSV export
//! - [`context`]: explicitly constructed application context
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardiolens::{AppContext, Config, Field};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = AppContext::new(Config::load_default())?;
//!
//!     let form = ctx.simplified_form();
//!     form.set_field(Field::Age, Some(58.0));
//!     form.submit();
//!     form.settle().await;
//!
//!     if let Some(result) = form.snapshot().result {
//!         println!("{} ({}%)", result.headline(), result.percentage());
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod client;
pub mod config;
pub mod context;
pub mod controller;
pub mod dashboard;
pub mod debounce;
pub mod logging;
pub mod model;
pub mod validation;

pub use client::{
    ApiClient, CardioClient, ClientError, ClientResult, HttpPredictionClient, PredictionApi,
};

pub use config::{Config, ConfigError};

pub use context::{AppContext, ContextError, Theme, ThemeError, ThemeStore};

pub use controller::{
    AdvancedForm, FormController, FormKind, FormSnapshot, Mode, Outcome, Phase, SimplifiedForm,
};

pub use dashboard::{DashboardLoader, ExportError, Overview};

pub use debounce::{Debounce, Debouncer};

pub use model::{
    AdvancedInput, ChartData, ChartMetric, CholesterolLevel, CorrelationAnalysis, Dataset,
    DatasetStatistics, Draft, Field, PredictionResult, RiskBand, SimplifiedInput,
};

pub use validation::{AdvancedSchema, Schema, SimplifiedSchema, ValidationErrors};
