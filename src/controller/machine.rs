//! Form state machine
//!
//! Pure transition logic for a prediction form. The machine never touches
//! the network or the timer: it consumes [`Event`]s and answers with
//! [`Effect`]s for the driver to execute.
//!
//! Request outcomes carry the [`Ticket`] issued at dispatch. A ticket is
//! stale once the form was reset after it was issued, and a realtime ticket
//! is also stale once realtime mode was left or restarted. Stale outcomes
//! are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cache::ResultCache;
use crate::model::{Draft, PredictionResult};
use crate::validation::{Schema, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Manual,
    Realtime,
}

impl Mode {
    pub fn origin(&self) -> Origin {
        match self {
            Mode::Manual => Origin::Manual,
            Mode::Realtime => Origin::Realtime,
        }
    }
}

/// What triggered a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Manual,
    Realtime,
}

/// Identity of one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: u64,
    pub origin: Origin,
    epoch: u64,
    session: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success(PredictionResult),
    Failure(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    AwaitingResponse,
    Settled(Outcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FieldChanged(Draft),
    Debounced(Draft),
    Submit,
    SetMode(Mode),
    Resolved { ticket: Ticket, outcome: Outcome },
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect<I> {
    /// Restart the quiet window with this draft
    Debounce(Draft),
    CancelDebounce,
    Dispatch { ticket: Ticket, input: I },
}

/// Observable state of a form
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub mode: Mode,
    pub phase: Phase,
    pub draft: Draft,
    pub result: Option<PredictionResult>,
    /// When the shown result arrived
    pub settled_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub field_errors: ValidationErrors,
}

#[derive(Debug, Clone)]
struct ShownError {
    message: String,
    origin: Origin,
}

pub struct FormMachine<S: Schema> {
    schema: S,
    defaults: Draft,
    draft: Draft,
    mode: Mode,
    phase: Phase,
    field_errors: ValidationErrors,
    error: Option<ShownError>,
    cache: ResultCache,
    epoch: u64,
    session: u64,
    next_ticket: u64,
    in_flight: Vec<Ticket>,
    last_realtime: Option<S::Output>,
}

impl<S> FormMachine<S>
where
    S: Schema,
    S::Output: Clone + PartialEq,
{
    pub fn new(schema: S, defaults: Draft) -> Self {
        Self {
            schema,
            draft: defaults.clone(),
            defaults,
            mode: Mode::Manual,
            phase: Phase::Idle,
            field_errors: ValidationErrors::default(),
            error: None,
            cache: ResultCache::new(),
            epoch: 0,
            session: 0,
            next_ticket: 0,
            in_flight: Vec::new(),
            last_realtime: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let origin = self.mode.origin();
        FormSnapshot {
            mode: self.mode,
            phase: self.phase.clone(),
            draft: self.draft.clone(),
            result: self.cache.result(),
            settled_at: self.cache.latest().map(|c| c.settled_at),
            error: self.error.as_ref().map(|e| e.message.clone()),
            is_loading: self
                .in_flight
                .iter()
                .any(|t| t.origin == origin && self.is_current(t)),
            field_errors: self.field_errors.clone(),
        }
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) -> Vec<Effect<S::Output>> {
        match event {
            Event::FieldChanged(draft) => self.on_field_changed(draft),
            Event::Debounced(draft) => self.on_debounced(draft),
            Event::Submit => self.on_submit(),
            Event::SetMode(mode) => self.on_set_mode(mode),
            Event::Resolved { ticket, outcome } => {
                self.on_resolved(ticket, outcome);
                Vec::new()
            }
            Event::Reset => self.on_reset(),
        }
    }

    fn on_field_changed(&mut self, draft: Draft) -> Vec<Effect<S::Output>> {
        self.draft = draft;

        match self.mode {
            Mode::Manual => {
                // Once shown, inline errors follow the user's edits
                if !self.field_errors.is_empty() {
                    self.field_errors = self.schema.validate(&self.draft).err().unwrap_or_default();
                }
                if self.phase == Phase::Idle {
                    self.phase = Phase::Validating;
                }
                Vec::new()
            }
            Mode::Realtime => {
                if self.draft.is_complete() && self.schema.is_valid(&self.draft) {
                    self.phase = Phase::Validating;
                    vec![Effect::Debounce(self.draft.clone())]
                } else {
                    self.phase = Phase::Idle;
                    vec![Effect::CancelDebounce]
                }
            }
        }
    }

    fn on_debounced(&mut self, draft: Draft) -> Vec<Effect<S::Output>> {
        if self.mode != Mode::Realtime {
            return Vec::new();
        }

        let input = match self.schema.validate(&draft) {
            Ok(input) if self.schema.is_valid(&self.draft) => input,
            _ => {
                self.phase = self.resting_phase();
                return Vec::new();
            }
        };

        if self.last_realtime.as_ref() == Some(&input) {
            tracing::debug!("Debounced draft unchanged since last dispatch");
            self.phase = self.resting_phase();
            return Vec::new();
        }

        self.last_realtime = Some(input.clone());
        vec![self.dispatch(Origin::Realtime, input)]
    }

    fn on_submit(&mut self) -> Vec<Effect<S::Output>> {
        if self.mode == Mode::Realtime {
            return Vec::new();
        }

        match self.schema.validate(&self.draft) {
            Ok(input) => {
                self.field_errors = ValidationErrors::default();
                self.error = None;
                vec![self.dispatch(Origin::Manual, input)]
            }
            Err(errors) => {
                self.field_errors = errors;
                self.phase = Phase::Idle;
                Vec::new()
            }
        }
    }

    fn on_set_mode(&mut self, mode: Mode) -> Vec<Effect<S::Output>> {
        if mode == self.mode {
            return Vec::new();
        }
        self.mode = mode;
        self.last_realtime = None;

        match mode {
            Mode::Realtime => {
                self.session += 1;
                self.field_errors = ValidationErrors::default();
                match self.schema.validate(&self.draft) {
                    Ok(input) => {
                        self.last_realtime = Some(input.clone());
                        vec![self.dispatch(Origin::Realtime, input)]
                    }
                    Err(_) => {
                        self.phase = self.resting_phase();
                        Vec::new()
                    }
                }
            }
            Mode::Manual => {
                if matches!(&self.error, Some(e) if e.origin == Origin::Realtime) {
                    self.error = None;
                }
                if !self.has_pending(Origin::Manual) {
                    self.phase = self.resting_phase();
                }
                vec![Effect::CancelDebounce]
            }
        }
    }

    fn on_resolved(&mut self, ticket: Ticket, outcome: Outcome) {
        self.in_flight.retain(|t| t.id != ticket.id);

        if !self.is_current(&ticket) {
            tracing::debug!(ticket = ticket.id, origin = ?ticket.origin, "Dropping stale outcome");
            return;
        }

        match &outcome {
            Outcome::Success(result) => {
                self.cache.store(*result);
                self.error = None;
            }
            Outcome::Failure(message) => {
                self.error = Some(ShownError {
                    message: message.clone(),
                    origin: ticket.origin,
                });
            }
        }
        self.phase = Phase::Settled(outcome);
    }

    fn on_reset(&mut self) -> Vec<Effect<S::Output>> {
        self.draft = self.defaults.clone();
        self.field_errors = ValidationErrors::default();
        self.error = None;
        self.cache.clear();
        self.epoch += 1;
        self.session += 1;
        self.last_realtime = None;
        self.phase = Phase::Idle;
        vec![Effect::CancelDebounce]
    }

    fn dispatch(&mut self, origin: Origin, input: S::Output) -> Effect<S::Output> {
        self.next_ticket += 1;
        let ticket = Ticket {
            id: self.next_ticket,
            origin,
            epoch: self.epoch,
            session: self.session,
        };
        self.in_flight.push(ticket);
        self.phase = Phase::AwaitingResponse;
        Effect::Dispatch { ticket, input }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        match ticket.origin {
            Origin::Manual => true,
            Origin::Realtime => self.mode == Mode::Realtime && ticket.session == self.session,
        }
    }

    fn has_pending(&self, origin: Origin) -> bool {
        self.in_flight
            .iter()
            .any(|t| t.origin == origin && self.is_current(t))
    }

    /// Phase to fall back to when nothing new is happening
    fn resting_phase(&self) -> Phase {
        if self.has_pending(self.mode.origin()) {
            return Phase::AwaitingResponse;
        }
        match (&self.error, self.cache.result()) {
            (Some(e), _) => Phase::Settled(Outcome::Failure(e.message.clone())),
            (None, Some(result)) => Phase::Settled(Outcome::Success(result)),
            (None, None) => Phase::Idle,
        }
    }
}
