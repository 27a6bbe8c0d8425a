//! Session state machine for the generate → select → test loop.
//!
//! Port calls run on spawned tasks and report back through `finish_*`, which is the
//! only place a late result can touch the session. A result is applied only when the
//! session still points at what it was computed for.

use super::model::{Evaluation, Variant, validate_batch};
use super::session::{Phase, SessionSnapshot, SessionState, TestTicket};
use crate::ai::ports::{Evaluator, VariantGenerator};
use crate::error::{DesignerError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was written into the session.
    Applied,
    /// An operation of the same kind was already in flight; nothing was dispatched.
    Ignored,
    /// The port answered, but the session had moved on.
    Discarded,
}

/// A dispatched generate or test call.
#[must_use = "dropping a Pending does not cancel it, but its outcome is lost"]
pub struct Pending {
    task: Option<JoinHandle<Result<Outcome>>>,
}

impl Pending {
    fn ignored() -> Self {
        Self { task: None }
    }

    pub fn is_ignored(&self) -> bool {
        self.task.is_none()
    }

    pub async fn outcome(self) -> Result<Outcome> {
        match self.task {
            None => Ok(Outcome::Ignored),
            Some(task) => task
                .await
                .unwrap_or_else(|e| Err(DesignerError::PortFailure(format!("completion task failed: {e}")))),
        }
    }
}

struct Shared {
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
    generator: Arc<dyn VariantGenerator>,
    evaluator: Arc<dyn Evaluator>,
}

#[derive(Clone)]
pub struct WorkflowController {
    inner: Arc<Shared>,
}

impl WorkflowController {
    pub fn new(
        role: impl Into<String>,
        generator: Arc<dyn VariantGenerator>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        let state = SessionState::new(role);
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
                generator,
                evaluator,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn set_role(&self, role: impl Into<String>) {
        let mut state = self.lock();
        state.role = role.into();
        self.publish(&state);
    }

    pub fn set_task_context(&self, task_context: impl Into<String>) {
        let mut state = self.lock();
        state.task_context = task_context.into();
        self.publish(&state);
    }

    pub async fn generate(&self) -> Result<Outcome> {
        self.start_generate()?.outcome().await
    }

    pub async fn test(&self) -> Result<Outcome> {
        self.start_test()?.outcome().await
    }

    /// Dispatches the generator for the current role and task context.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_generate(&self) -> Result<Pending> {
        let (role, task_context) = {
            let mut state = self.lock();
            if state.generate_in_flight {
                log::warn!("Generate ignored: a generation is already in flight");
                return Ok(Pending::ignored());
            }
            if state.task_context.trim().is_empty() {
                return Err(DesignerError::InvalidInput("task context must not be blank".into()));
            }

            state.generate_in_flight = true;
            state.phase = Phase::Generating;
            state.evaluation = None;
            self.publish(&state);
            (state.role.clone(), state.task_context.clone())
        };

        log::info!("🧪 Generating variants for role '{role}'");
        let generator = Arc::clone(&self.inner.generator);
        let port = tokio::spawn(async move { generator.generate(&role, &task_context).await });

        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = join_port("generator", port).await;
            this.finish_generate(result)
        });
        Ok(Pending { task: Some(task) })
    }

    /// Dispatches the evaluator for the currently selected variant.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_test(&self) -> Result<Pending> {
        let (ticket, variant) = {
            let mut state = self.lock();
            if state.test_in_flight.is_some() {
                log::warn!("Test ignored: an evaluation is already in flight");
                return Ok(Pending::ignored());
            }
            match state.phase {
                // Testing always has `test_in_flight` set, so it was ignored above.
                Phase::Ready | Phase::Tested | Phase::Testing => {}
                Phase::Idle => {
                    return Err(DesignerError::InvalidInput("no variants have been generated".into()));
                }
                Phase::Generating => {
                    return Err(DesignerError::InvalidInput("variants are still being generated".into()));
                }
            }

            let variant: Variant = state
                .selected()
                .cloned()
                .ok_or_else(|| DesignerError::InvalidInput("no variant is selected".into()))?;
            let ticket = TestTicket {
                batch: state.batch,
                variant_id: variant.id.clone(),
            };

            state.test_in_flight = Some(ticket.clone());
            state.phase = Phase::Testing;
            self.publish(&state);
            (ticket, variant)
        };

        log::info!("🛡️  Testing variant '{}' ({})", variant.name, variant.id);
        let evaluator = Arc::clone(&self.inner.evaluator);
        let port = tokio::spawn(async move { evaluator.evaluate(&variant).await });

        let this = self.clone();
        let task = tokio::spawn(async move {
            let result = join_port("evaluator", port).await;
            this.finish_test(ticket, result)
        });
        Ok(Pending { task: Some(task) })
    }

    pub fn select_variant(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        if matches!(state.phase, Phase::Idle | Phase::Generating) {
            return Err(DesignerError::InvalidInput(format!(
                "cannot select a variant while {}",
                state.phase
            )));
        }
        if !state.contains(id) {
            return Err(DesignerError::InvalidInput(format!("unknown variant id '{id}'")));
        }
        if state.selected_variant_id.as_deref() == Some(id) {
            return Ok(());
        }

        state.selected_variant_id = Some(id.to_string());
        state.evaluation = None;
        if state.phase == Phase::Tested {
            state.phase = Phase::Ready;
        }
        log::debug!("Selected variant {id}");
        self.publish(&state);
        Ok(())
    }

    fn finish_generate(&self, result: Result<Vec<Variant>>) -> Result<Outcome> {
        let result = result.and_then(|variants| validate_batch(&variants).map(|()| variants));

        let mut state = self.lock();
        state.generate_in_flight = false;
        match result {
            Ok(variants) => {
                log::info!("   -> Generated {} variants", variants.len());
                state.batch += 1;
                state.selected_variant_id = variants.first().map(|v| v.id.clone());
                state.variants = variants;
                state.evaluation = None;
                state.phase = Phase::Ready;
                self.publish(&state);
                Ok(Outcome::Applied)
            }
            Err(e) => {
                let e = e.into_port_failure();
                log::error!("❌ Generation failed: {e}");
                // The batch is unchanged, so a test dispatched before this generate is still relevant.
                let still_testing = state.test_in_flight.is_some() && state.test_in_flight == state.current_ticket();
                state.phase = if still_testing { Phase::Testing } else { state.stable_phase() };
                self.publish(&state);
                Err(e)
            }
        }
    }

    fn finish_test(&self, ticket: TestTicket, result: Result<Evaluation>) -> Result<Outcome> {
        let result = result.and_then(|evaluation| evaluation.validate().map(|()| evaluation));

        let mut state = self.lock();
        state.test_in_flight = None;

        // A generate dispatched after this test cleared the evaluation; never show one mid-generation.
        if state.generate_in_flight {
            match &result {
                Ok(_) => log::info!("Discarding evaluation for '{}': generation in flight", ticket.variant_id),
                Err(e) => log::warn!("Discarding failed evaluation for '{}': {e}", ticket.variant_id),
            }
            return Ok(Outcome::Discarded);
        }

        let current = state.current_ticket().as_ref() == Some(&ticket);
        let waiting = state.phase == Phase::Testing;
        match result {
            Ok(evaluation) if current => {
                log::info!(
                    "   -> Score {} ({:?}) in {}ms",
                    evaluation.score, evaluation.status, evaluation.latency_ms
                );
                state.evaluation = Some(evaluation);
                state.phase = Phase::Tested;
                self.publish(&state);
                Ok(Outcome::Applied)
            }
            Ok(_) => {
                log::info!("Discarding stale evaluation for '{}'", ticket.variant_id);
                if waiting {
                    state.evaluation = None;
                    state.phase = Phase::Ready;
                    self.publish(&state);
                }
                Ok(Outcome::Discarded)
            }
            Err(e) if current || waiting => {
                let e = e.into_port_failure();
                log::error!("❌ Evaluation failed: {e}");
                state.evaluation = None;
                state.phase = Phase::Ready;
                self.publish(&state);
                Err(e)
            }
            Err(e) => {
                log::warn!("Discarding failed evaluation for '{}': {e}", ticket.variant_id);
                Ok(Outcome::Discarded)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.inner.updates.send_replace(state.snapshot());
    }
}

async fn join_port<T>(port: &str, task: JoinHandle<Result<T>>) -> Result<T> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(DesignerError::PortFailure(format!("{port} task aborted: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::EvaluationStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const ROLE: &str = "Senior Frontend Engineer";

    #[derive(Default)]
    struct FakeGenerator {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        /// Calls with this index or later wait on `gate`.
        gate_from: usize,
        /// Calls with this index or later fail.
        fail_from: Option<usize>,
        empty: bool,
    }

    #[async_trait]
    impl VariantGenerator for FakeGenerator {
        async fn generate(&self, role: &str, task_context: &str) -> Result<Vec<Variant>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gate.as_ref().filter(|_| call >= self.gate_from) {
                gate.notified().await;
            }
            if self.fail_from.is_some_and(|from| call >= from) {
                return Err(DesignerError::PortFailure("model offline".into()));
            }
            if self.empty {
                return Ok(Vec::new());
            }
            Ok(["a", "b", "c"]
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    Variant::new(
                        *id,
                        format!("Style {id}"),
                        format!("You are a {role}. Task: \"{task_context}\"."),
                        0.9 - i as f64 * 0.05,
                    )
                })
                .collect())
        }
    }

    struct FakeEvaluator {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        outcome: std::result::Result<Evaluation, String>,
    }

    impl FakeEvaluator {
        fn returning(evaluation: Evaluation) -> Self {
            Self { calls: AtomicUsize::new(0), gate: None, outcome: Ok(evaluation) }
        }

        fn failing(message: &str) -> Self {
            Self { calls: AtomicUsize::new(0), gate: None, outcome: Err(message.to_string()) }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl Evaluator for FakeEvaluator {
        async fn evaluate(&self, _variant: &Variant) -> Result<Evaluation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.outcome.clone().map_err(DesignerError::PortFailure)
        }
    }

    fn passing() -> Evaluation {
        Evaluation::new(95, EvaluationStatus::Success, 120)
    }

    fn controller(generator: Arc<FakeGenerator>, evaluator: Arc<FakeEvaluator>) -> WorkflowController {
        WorkflowController::new(ROLE, generator, evaluator)
    }

    async fn ready(generator: Arc<FakeGenerator>, evaluator: Arc<FakeEvaluator>) -> WorkflowController {
        let c = controller(generator, evaluator);
        c.set_task_context("build a login form");
        assert_eq!(c.generate().await.unwrap(), Outcome::Applied);
        c
    }

    #[tokio::test]
    async fn generate_selects_first_variant_and_clears_evaluation() {
        let c = ready(Arc::default(), Arc::new(FakeEvaluator::returning(passing()))).await;
        c.test().await.unwrap();
        assert!(c.snapshot().evaluation.is_some());

        assert_eq!(c.generate().await.unwrap(), Outcome::Applied);
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(snap.variants.len(), 3);
        assert_eq!(snap.selected_variant_id.as_deref(), Some("a"));
        assert!(snap.evaluation.is_none());
    }

    #[tokio::test]
    async fn blank_task_context_is_a_no_op() {
        let generator = Arc::new(FakeGenerator::default());
        let c = controller(generator.clone(), Arc::new(FakeEvaluator::returning(passing())));
        c.set_task_context("  \n\t ");
        let before = c.snapshot();

        let err = c.generate().await.unwrap_err();
        assert!(matches!(err, DesignerError::InvalidInput(_)));
        assert_eq!(c.snapshot(), before);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_regenerate_keeps_tested_session() {
        let c = ready(Arc::default(), Arc::new(FakeEvaluator::returning(passing()))).await;
        c.test().await.unwrap();
        c.set_task_context("");
        let before = c.snapshot();

        assert!(c.generate().await.is_err());
        assert_eq!(c.snapshot(), before);
        assert_eq!(c.snapshot().phase, Phase::Tested);
    }

    #[tokio::test]
    async fn second_generate_while_in_flight_is_ignored() {
        let gate = Arc::new(Notify::new());
        let generator = Arc::new(FakeGenerator { gate: Some(gate.clone()), ..Default::default() });
        let c = controller(generator.clone(), Arc::new(FakeEvaluator::returning(passing())));
        c.set_task_context("build a login form");

        let first = c.start_generate().unwrap();
        assert_eq!(c.snapshot().phase, Phase::Generating);
        let second = c.start_generate().unwrap();
        assert!(second.is_ignored());
        assert_eq!(second.outcome().await.unwrap(), Outcome::Ignored);

        gate.notify_one();
        assert_eq!(first.outcome().await.unwrap(), Outcome::Applied);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.snapshot().phase, Phase::Ready);
    }

    #[tokio::test]
    async fn late_evaluation_for_previous_selection_is_discarded() {
        let gate = Arc::new(Notify::new());
        let evaluator = Arc::new(FakeEvaluator::returning(passing()).gated(gate.clone()));
        let c = ready(Arc::default(), evaluator).await;

        let pending = c.start_test().unwrap();
        assert_eq!(c.snapshot().phase, Phase::Testing);
        c.select_variant("b").unwrap();
        assert_eq!(c.snapshot().phase, Phase::Testing);

        gate.notify_one();
        assert_eq!(pending.outcome().await.unwrap(), Outcome::Discarded);
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert!(snap.evaluation.is_none());
        assert_eq!(snap.selected_variant_id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn reselecting_the_tested_variant_before_completion_still_applies() {
        let gate = Arc::new(Notify::new());
        let evaluator = Arc::new(FakeEvaluator::returning(passing()).gated(gate.clone()));
        let c = ready(Arc::default(), evaluator).await;

        let pending = c.start_test().unwrap();
        c.select_variant("b").unwrap();
        c.select_variant("a").unwrap();

        gate.notify_one();
        assert_eq!(pending.outcome().await.unwrap(), Outcome::Applied);
        assert_eq!(c.snapshot().phase, Phase::Tested);
    }

    #[tokio::test]
    async fn regenerate_during_test_discards_result_even_when_ids_repeat() {
        let gate = Arc::new(Notify::new());
        let evaluator = Arc::new(FakeEvaluator::returning(passing()).gated(gate.clone()));
        let c = ready(Arc::default(), evaluator.clone()).await;

        let pending = c.start_test().unwrap();
        assert_eq!(c.generate().await.unwrap(), Outcome::Applied);
        assert_eq!(c.snapshot().selected_variant_id.as_deref(), Some("a"));

        // The old evaluation still occupies the single evaluator slot.
        assert!(c.start_test().unwrap().is_ignored());

        gate.notify_one();
        assert_eq!(pending.outcome().await.unwrap(), Outcome::Discarded);
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert!(snap.evaluation.is_none());
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_regenerate_during_test_keeps_test_result() {
        let gate = Arc::new(Notify::new());
        let generator = Arc::new(FakeGenerator { fail_from: Some(1), ..Default::default() });
        let evaluator = Arc::new(FakeEvaluator::returning(passing()).gated(gate.clone()));
        let c = ready(generator, evaluator.clone()).await;

        let pending = c.start_test().unwrap();
        assert!(c.generate().await.unwrap_err().is_port_failure());

        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Testing);
        assert_eq!(snap.selected_variant_id.as_deref(), Some("a"));
        assert!(c.start_test().unwrap().is_ignored());

        gate.notify_one();
        assert_eq!(pending.outcome().await.unwrap(), Outcome::Applied);
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Tested);
        assert_eq!(snap.evaluation, Some(passing()));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evaluation_arriving_mid_generation_is_discarded() {
        let generate_gate = Arc::new(Notify::new());
        let generator = Arc::new(FakeGenerator {
            gate: Some(generate_gate.clone()),
            gate_from: 1,
            ..Default::default()
        });
        let test_gate = Arc::new(Notify::new());
        let evaluator = Arc::new(FakeEvaluator::returning(passing()).gated(test_gate.clone()));
        let c = ready(generator, evaluator).await;

        let test = c.start_test().unwrap();
        let regenerate = c.start_generate().unwrap();
        assert_eq!(c.snapshot().phase, Phase::Generating);

        test_gate.notify_one();
        assert_eq!(test.outcome().await.unwrap(), Outcome::Discarded);
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Generating);
        assert!(snap.evaluation.is_none());

        generate_gate.notify_one();
        assert_eq!(regenerate.outcome().await.unwrap(), Outcome::Applied);
        assert_eq!(c.snapshot().phase, Phase::Ready);
    }

    #[tokio::test]
    async fn second_test_while_in_flight_is_ignored() {
        let gate = Arc::new(Notify::new());
        let evaluator = Arc::new(FakeEvaluator::returning(passing()).gated(gate.clone()));
        let c = ready(Arc::default(), evaluator.clone()).await;

        let first = c.start_test().unwrap();
        assert!(c.start_test().unwrap().is_ignored());
        gate.notify_one();
        assert_eq!(first.outcome().await.unwrap(), Outcome::Applied);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn selection_round_trips_through_snapshot() {
        let c = ready(Arc::default(), Arc::new(FakeEvaluator::returning(passing()))).await;
        for id in ["c", "a", "b"] {
            c.select_variant(id).unwrap();
            assert_eq!(c.snapshot().selected_variant_id.as_deref(), Some(id));
            assert_eq!(c.snapshot().selected_variant().map(|v| v.id.as_str()), Some(id));
        }
    }

    #[tokio::test]
    async fn reselecting_same_variant_keeps_evaluation() {
        let c = ready(Arc::default(), Arc::new(FakeEvaluator::returning(passing()))).await;
        c.test().await.unwrap();

        c.select_variant("a").unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Tested);
        assert_eq!(snap.evaluation, Some(passing()));

        c.select_variant("b").unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert!(snap.evaluation.is_none());
    }

    #[tokio::test]
    async fn unknown_or_premature_selection_is_rejected() {
        let c = controller(Arc::default(), Arc::new(FakeEvaluator::returning(passing())));
        assert!(matches!(c.select_variant("a"), Err(DesignerError::InvalidInput(_))));

        c.set_task_context("build a login form");
        c.generate().await.unwrap();
        assert!(matches!(c.select_variant("zzz"), Err(DesignerError::InvalidInput(_))));
        assert_eq!(c.snapshot().selected_variant_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_before_generation_is_rejected() {
        let evaluator = Arc::new(FakeEvaluator::returning(passing()));
        let c = controller(Arc::default(), evaluator.clone());
        assert!(matches!(c.test().await, Err(DesignerError::InvalidInput(_))));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.snapshot().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn login_form_scenario_reaches_tested() {
        let c = controller(Arc::default(), Arc::new(FakeEvaluator::returning(passing())));
        c.set_role("Senior Frontend Engineer");
        c.set_task_context("build a login form");
        c.generate().await.unwrap();

        let snap = c.snapshot();
        let first = &snap.variants[0];
        assert!(!first.content.is_empty());
        assert!(first.content.contains("Senior Frontend Engineer"));

        c.select_variant(&first.id).unwrap();
        assert_eq!(c.test().await.unwrap(), Outcome::Applied);
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Tested);
        assert_eq!(
            snap.evaluation,
            Some(Evaluation::new(95, EvaluationStatus::Success, 120))
        );
    }

    #[tokio::test]
    async fn gate_rejection_is_a_normal_result() {
        let rejected = Evaluation::new(42, EvaluationStatus::Failure, 300);
        let c = ready(Arc::default(), Arc::new(FakeEvaluator::returning(rejected.clone()))).await;
        assert_eq!(c.test().await.unwrap(), Outcome::Applied);
        assert_eq!(c.snapshot().evaluation, Some(rejected));
        assert_eq!(c.snapshot().phase, Phase::Tested);
    }

    #[tokio::test]
    async fn evaluator_failure_returns_to_ready() {
        let c = ready(Arc::default(), Arc::new(FakeEvaluator::failing("endpoint unavailable"))).await;
        let err = c.test().await.unwrap_err();
        assert!(matches!(err, DesignerError::PortFailure(ref m) if m.contains("endpoint unavailable")));

        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert!(snap.evaluation.is_none());
        // Retry is the caller's call and is allowed straight away.
        assert!(c.test().await.is_err());
    }

    #[tokio::test]
    async fn generator_failure_on_first_run_returns_to_idle() {
        let generator = Arc::new(FakeGenerator { fail_from: Some(0), ..Default::default() });
        let c = controller(generator, Arc::new(FakeEvaluator::returning(passing())));
        c.set_task_context("build a login form");

        assert!(c.generate().await.unwrap_err().is_port_failure());
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.variants.is_empty());
    }

    #[tokio::test]
    async fn empty_generation_is_a_port_failure() {
        let generator = Arc::new(FakeGenerator { empty: true, ..Default::default() });
        let c = controller(generator, Arc::new(FakeEvaluator::returning(passing())));
        c.set_task_context("build a login form");

        let err = c.generate().await.unwrap_err();
        assert!(matches!(err, DesignerError::EmptyGenerationResult));
        assert!(err.is_port_failure());
        assert_eq!(c.snapshot().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn failed_regenerate_keeps_previous_batch() {
        let generator = Arc::new(FakeGenerator { fail_from: Some(1), ..Default::default() });
        let c = ready(generator, Arc::new(FakeEvaluator::returning(passing()))).await;
        c.select_variant("c").unwrap();
        c.test().await.unwrap();

        assert!(c.generate().await.unwrap_err().is_port_failure());
        let snap = c.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(snap.variants.len(), 3);
        assert_eq!(snap.selected_variant_id.as_deref(), Some("c"));
        assert!(snap.evaluation.is_none());
    }

    #[tokio::test]
    async fn dropped_pending_still_completes() {
        let gate = Arc::new(Notify::new());
        let generator = Arc::new(FakeGenerator { gate: Some(gate.clone()), ..Default::default() });
        let c = controller(generator, Arc::new(FakeEvaluator::returning(passing())));
        c.set_task_context("build a login form");
        let mut updates = c.subscribe();

        drop(c.start_generate().unwrap());
        gate.notify_one();
        updates
            .wait_for(|snap| snap.phase == Phase::Ready)
            .await
            .unwrap();
        assert_eq!(c.snapshot().variants.len(), 3);

        let next = c.start_generate().unwrap();
        assert!(!next.is_ignored());
        gate.notify_one();
        assert_eq!(next.outcome().await.unwrap(), Outcome::Applied);
    }

    #[tokio::test]
    async fn subscribers_observe_phase_changes() {
        let c = controller(Arc::default(), Arc::new(FakeEvaluator::returning(passing())));
        let updates = c.subscribe();
        c.set_task_context("build a login form");
        assert_eq!(updates.borrow().task_context, "build a login form");

        c.generate().await.unwrap();
        assert_eq!(updates.borrow().phase, Phase::Ready);
        c.test().await.unwrap();
        assert_eq!(*updates.borrow(), c.snapshot());
    }
}
