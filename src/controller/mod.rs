//! Prediction form controller
//!
//! A pure state machine ([`machine`]) driven by an async controller
//! ([`form`]), with a small cache keeping the last good result visible.

pub mod cache;
pub mod form;
pub mod machine;

pub use cache::{CachedResult, ResultCache};
pub use form::{AdvancedForm, FormController, FormKind, SimplifiedForm};
pub use machine::{Effect, Event, FormMachine, FormSnapshot, Mode, Origin, Outcome, Phase, Ticket};
