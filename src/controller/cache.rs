//! Result continuity cache
//!
//! Keeps the last successful prediction visible while newer requests are
//! in flight or fail.

use chrono::{DateTime, Utc};

use crate::model::PredictionResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedResult {
    pub result: PredictionResult,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    latest: Option<CachedResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the remembered result
    pub fn store(&mut self, result: PredictionResult) {
        self.latest = Some(CachedResult {
            result,
            settled_at: Utc::now(),
        });
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn latest(&self) -> Option<&CachedResult> {
        self.latest.as_ref()
    }

    pub fn result(&self) -> Option<PredictionResult> {
        self.latest.map(|c| c.result)
    }
}
