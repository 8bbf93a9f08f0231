//! Form controller
//!
//! Async driver around [`FormMachine`]. It owns the debouncer and the
//! request tasks, and publishes every state change on a `watch` channel.
//! The machine lives behind a `std::sync::Mutex` that is never held
//! across an await.

use futures_util::future::BoxFuture;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::machine::{Effect, Event, FormMachine, FormSnapshot, Mode, Outcome, Ticket};
use crate::client::{ClientResult, PredictionApi};
use crate::debounce::Debouncer;
use crate::model::{AdvancedInput, Draft, Field, PredictionResult, SimplifiedInput};
use crate::validation::{AdvancedSchema, Schema, SimplifiedSchema};

/// Binds a form's schema, defaults and endpoint
pub trait FormKind: Send + Sync + 'static {
    type Schema: Schema<Output = Self::Input> + Default + Send + Sync + 'static;
    type Input: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Name used in logs
    const NAME: &'static str;

    fn defaults() -> Draft;

    fn dispatch(
        api: Arc<dyn PredictionApi>,
        input: Self::Input,
    ) -> BoxFuture<'static, ClientResult<PredictionResult>>;
}

/// User-facing form posting to `/prediction/user`
pub struct SimplifiedForm;

impl FormKind for SimplifiedForm {
    type Schema = SimplifiedSchema;
    type Input = SimplifiedInput;

    const NAME: &'static str = "simplified";

    fn defaults() -> Draft {
        Draft::filled(50.0, 120.0, 80.0, 1.0, 1.0)
    }

    fn dispatch(
        api: Arc<dyn PredictionApi>,
        input: SimplifiedInput,
    ) -> BoxFuture<'static, ClientResult<PredictionResult>> {
        Box::pin(async move { api.predict_simplified(&input).await })
    }
}

/// Feature-vector form posting to `/prediction`
pub struct AdvancedForm;

impl FormKind for AdvancedForm {
    type Schema = AdvancedSchema;
    type Input = AdvancedInput;

    const NAME: &'static str = "advanced";

    fn defaults() -> Draft {
        Draft::filled(0.0, 0.0, 0.0, 1.0, 0.0)
    }

    fn dispatch(
        api: Arc<dyn PredictionApi>,
        input: AdvancedInput,
    ) -> BoxFuture<'static, ClientResult<PredictionResult>> {
        Box::pin(async move { api.predict_advanced(&input).await })
    }
}

struct Shared<F: FormKind> {
    machine: Mutex<FormMachine<F::Schema>>,
    api: Arc<dyn PredictionApi>,
    debouncer: Debouncer<Draft>,
    snapshot_tx: watch::Sender<FormSnapshot>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<F: FormKind> Shared<F> {
    fn machine(&self) -> MutexGuard<'_, FormMachine<F::Schema>> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(self: &Arc<Self>, event: Event) {
        self.apply_with(|_| event);
    }

    /// Build the event from the current machine state under the same lock
    fn apply_with(self: &Arc<Self>, make: impl FnOnce(&FormMachine<F::Schema>) -> Event) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        let effects = {
            let mut machine = self.machine();
            let event = make(&machine);
            let effects = machine.handle(event);
            self.snapshot_tx.send_replace(machine.snapshot());
            effects
        };

        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(self: &Arc<Self>, effect: Effect<F::Input>) {
        match effect {
            Effect::Debounce(draft) => self.debouncer.push(draft),
            Effect::CancelDebounce => self.debouncer.cancel(),
            Effect::Dispatch { ticket, input } => self.spawn_request(ticket, input),
        }
    }

    fn spawn_request(self: &Arc<Self>, ticket: Ticket, input: F::Input) {
        let request_id = Uuid::new_v4();
        tracing::info!(
            form = F::NAME,
            %request_id,
            origin = ?ticket.origin,
            "Dispatching prediction"
        );

        let api = Arc::clone(&self.api);
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let outcome = match F::dispatch(api, input).await {
                Ok(result) => {
                    tracing::info!(
                        form = F::NAME,
                        %request_id,
                        probability = result.probability,
                        prediction = result.predicted_class,
                        "Prediction received"
                    );
                    Outcome::Success(result)
                }
                Err(e) => {
                    tracing::warn!(form = F::NAME, %request_id, error = %e, "Prediction failed");
                    Outcome::Failure(e.to_string())
                }
            };

            if let Some(shared) = weak.upgrade() {
                shared.apply(Event::Resolved { ticket, outcome });
            }
        });

        let mut tasks = self.tasks();
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.debouncer.close();
        for task in self.tasks().drain(..) {
            task.abort();
        }
    }
}

/// Controller for one prediction form
///
/// Requires a running tokio runtime. Dropping the controller stops its
/// debouncer and aborts in-flight requests.
pub struct FormController<F: FormKind> {
    shared: Arc<Shared<F>>,
    pump: JoinHandle<()>,
}

impl<F: FormKind> FormController<F> {
    pub fn new(api: Arc<dyn PredictionApi>, debounce_window: Duration) -> Self {
        let machine = FormMachine::new(F::Schema::default(), F::defaults());
        let (snapshot_tx, _) = watch::channel(machine.snapshot());
        let (debouncer, mut debounced) = Debouncer::spawn(debounce_window);

        let shared = Arc::new(Shared {
            machine: Mutex::new(machine),
            api,
            debouncer,
            snapshot_tx,
            tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&shared);
        let pump = tokio::spawn(async move {
            while let Some(draft) = debounced.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.apply(Event::Debounced(draft));
            }
        });

        tracing::debug!(form = F::NAME, ?debounce_window, "Form controller started");
        Self { shared, pump }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn draft(&self) -> Draft {
        self.shared.machine().draft().clone()
    }

    pub fn mode(&self) -> Mode {
        self.shared.machine().mode()
    }

    /// Edit the draft in place
    ///
    /// The closure runs while the form is locked and must not call back
    /// into this controller.
    pub fn update(&self, edit: impl FnOnce(&mut Draft)) {
        self.shared.apply_with(|machine| {
            let mut draft = machine.draft().clone();
            edit(&mut draft);
            Event::FieldChanged(draft)
        });
    }

    pub fn set_field(&self, field: Field, value: Option<f64>) {
        self.update(|draft| draft.set(field, value));
    }

    pub fn set_realtime(&self, enabled: bool) {
        let mode = if enabled { Mode::Realtime } else { Mode::Manual };
        self.shared.apply(Event::SetMode(mode));
    }

    pub fn submit(&self) {
        self.shared.apply(Event::Submit);
    }

    pub fn reset(&self) {
        self.shared.apply(Event::Reset);
    }

    /// Wait until every request dispatched so far has resolved
    pub async fn settle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = self.shared.tasks().drain(..).collect();
            if pending.is_empty() {
                return;
            }
            for task in pending {
                let _ = task.await;
            }
        }
    }

    pub fn shutdown(&self) {
        self.pump.abort();
        self.shared.close();
    }
}

impl<F: FormKind> Drop for FormController<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::controller::machine::Phase;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    #[derive(Clone)]
    enum Reply {
        Ok(PredictionResult),
        Err(String),
    }

    struct StubApi {
        reply: Mutex<Reply>,
        gate: Semaphore,
        calls: AtomicUsize,
        last_advanced: Mutex<Option<AdvancedInput>>,
    }

    impl StubApi {
        fn new(reply: Reply, permits: usize) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(reply),
                gate: Semaphore::new(permits),
                calls: AtomicUsize::new(0),
                last_advanced: Mutex::new(None),
            })
        }

        fn open(reply: Reply) -> Arc<Self> {
            Self::new(reply, 1_000)
        }

        fn gated(reply: Reply) -> Arc<Self> {
            Self::new(reply, 0)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn answer(&self) -> ClientResult<PredictionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            match self.reply.lock().unwrap().clone() {
                Reply::Ok(result) => Ok(result),
                Reply::Err(message) => Err(ClientError::Api { status: 500, message }),
            }
        }
    }

    #[async_trait]
    impl PredictionApi for StubApi {
        async fn predict_simplified(&self, _: &SimplifiedInput) -> ClientResult<PredictionResult> {
            self.answer().await
        }

        async fn predict_advanced(&self, input: &AdvancedInput) -> ClientResult<PredictionResult> {
            *self.last_advanced.lock().unwrap() = Some(input.clone());
            self.answer().await
        }
    }

    const WINDOW: Duration = Duration::from_millis(500);

    fn simplified(api: &Arc<StubApi>) -> FormController<SimplifiedForm> {
        FormController::new(Arc::clone(api) as Arc<dyn PredictionApi>, WINDOW)
    }

    #[tokio::test]
    async fn test_manual_submit_success() {
        let result = PredictionResult::new(0.82, 1);
        let api = StubApi::gated(Reply::Ok(result));
        let form = simplified(&api);

        form.submit();
        let snap = form.snapshot();
        assert!(snap.is_loading);
        assert_eq!(snap.phase, Phase::AwaitingResponse);

        api.gate.add_permits(1);
        form.settle().await;

        let snap = form.snapshot();
        assert_eq!(snap.result, Some(result));
        assert!(!snap.is_loading);
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn test_manual_submit_invalid_never_calls_backend() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.5, 1)));
        let form = simplified(&api);

        form.set_field(Field::Age, None);
        form.submit();
        form.settle().await;

        assert_eq!(api.calls(), 0);
        assert!(form.snapshot().field_errors.has_field(Field::Age));
    }

    #[tokio::test]
    async fn test_realtime_error_surfaces() {
        let api = StubApi::open(Reply::Err("Model unavailable".into()));
        let form = simplified(&api);

        form.set_realtime(true);
        form.settle().await;

        let snap = form.snapshot();
        assert_eq!(snap.mode, Mode::Realtime);
        assert_eq!(snap.error.as_deref(), Some("Model unavailable"));
    }

    #[tokio::test]
    async fn test_late_realtime_error_suppressed_after_toggle_off() {
        let api = StubApi::gated(Reply::Err("Model unavailable".into()));
        let form = simplified(&api);

        form.set_realtime(true);
        assert!(form.snapshot().is_loading);
        form.set_realtime(false);

        api.gate.add_permits(1);
        form.settle().await;

        let snap = form.snapshot();
        assert!(snap.error.is_none());
        assert!(!snap.is_loading);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.4, 0)));
        let form = simplified(&api);

        form.set_field(Field::Age, Some(64.0));
        form.submit();
        form.settle().await;
        assert!(form.snapshot().result.is_some());

        form.reset();
        let snap = form.snapshot();
        assert_eq!(snap.draft, SimplifiedForm::defaults());
        assert!(snap.result.is_none());
        assert!(snap.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_edit_dispatches_after_quiet_window() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.3, 0)));
        let form = simplified(&api);

        form.set_realtime(true);
        form.settle().await;
        assert_eq!(api.calls(), 1);

        form.set_field(Field::Age, Some(51.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        form.set_field(Field::Age, Some(52.0));

        tokio::time::sleep(Duration::from_millis(450)).await;
        form.settle().await;
        assert_eq!(api.calls(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        form.settle().await;
        assert_eq!(api.calls(), 2);
        assert_eq!(form.snapshot().draft.age, Some(52.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_realtime_edit_is_silent() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.3, 0)));
        let form = simplified(&api);

        form.set_realtime(true);
        form.settle().await;

        form.set_field(Field::Diastolic, Some(130.0));
        tokio::time::sleep(Duration::from_secs(2)).await;
        form.settle().await;

        let snap = form.snapshot();
        assert_eq!(api.calls(), 1);
        assert!(snap.error.is_none());
        assert!(snap.field_errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverting_edit_within_window_sends_nothing() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.3, 0)));
        let form = simplified(&api);

        form.set_realtime(true);
        form.settle().await;

        form.set_field(Field::Age, Some(51.0));
        form.set_field(Field::Age, Some(50.0));
        tokio::time::sleep(Duration::from_secs(1)).await;
        form.settle().await;

        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_advanced_form_sends_raw_fields() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.66, 1)));
        let form: FormController<AdvancedForm> =
            FormController::new(Arc::clone(&api) as Arc<dyn PredictionApi>, WINDOW);

        form.update(|d| *d = Draft::filled(1.0, 1.0, 1.0, 1.0, 1.0));
        form.submit();
        form.settle().await;

        let sent = api.last_advanced.lock().unwrap().clone().unwrap();
        assert_eq!(sent.features(), [1.0; 5]);
        assert_eq!(form.snapshot().result, Some(PredictionResult::new(0.66, 1)));
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.2, 0)));
        let form = simplified(&api);
        let mut rx = form.subscribe();

        form.submit();
        form.settle().await;

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().result.is_some());
    }

    #[tokio::test]
    async fn test_shutdown_drops_pending_outcome() {
        let api = StubApi::gated(Reply::Ok(PredictionResult::new(0.9, 1)));
        let form = simplified(&api);

        form.submit();
        form.shutdown();
        api.gate.add_permits(1);
        form.settle().await;

        assert!(form.snapshot().result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_debounce() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.3, 0)));
        let form = simplified(&api);

        form.set_realtime(true);
        form.settle().await;
        assert_eq!(api.calls(), 1);

        form.set_field(Field::Age, Some(64.0));
        form.shutdown();
        tokio::time::sleep(Duration::from_secs(1)).await;
        form.settle().await;

        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_debounce() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.3, 0)));
        let form = simplified(&api);

        form.set_realtime(true);
        form.settle().await;
        form.set_field(Field::Age, Some(64.0));
        drop(form);

        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_edits_are_not_lost() {
        let api = StubApi::open(Reply::Ok(PredictionResult::new(0.3, 0)));
        let form = simplified(&api);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..1_000 {
                    form.set_field(Field::Age, Some(i as f64));
                }
            });
            s.spawn(|| {
                for i in 0..1_000 {
                    form.set_field(Field::Systolic, Some(100.0 + i as f64));
                }
            });
        });

        let draft = form.draft();
        assert_eq!(draft.age, Some(999.0));
        assert_eq!(draft.ap_hi, Some(1_099.0));
        assert_eq!(api.calls(), 0);
    }
}
