//! Pipeline execution and reevaluation.
//!
//! Steps run in declaration order. After a step passes, each step it lists
//! in `reevaluates` that already ran is checked: if that step's latest
//! outcome failed, or its inputs now fingerprint differently from the
//! evaluation that produced that outcome, it is re-run. Re-runs cascade
//! through their own `reevaluates` lists and every re-run consumes one
//! reevaluation pass.

use super::report::{ReevaluationRecord, RunFailure, RunReport, RunStatus, StepReport};
use crate::config::EngineConfig;
use crate::context::{ExecutionContext, RunIdentity};
use crate::core::{ErrorKind, StepOutcome, StepStatus};
use crate::errors::ReevaluationLimitExceeded;
use crate::evaluator::StepEvaluator;
use crate::events::{self, EventSink};
use crate::market::MarketData;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A built, validated pipeline.
///
/// Holds no per-run state, so one pipeline can serve many runs, including
/// concurrent runs on different threads.
pub struct Pipeline {
    name: String,
    steps: Vec<StepEvaluator>,
    index: HashMap<String, usize>,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &self.step_ids())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub(crate) fn new(
        name: String,
        steps: Vec<StepEvaluator>,
        config: EngineConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let index = steps
            .iter()
            .enumerate()
            .map(|(i, step)| (step.id().to_string(), i))
            .collect();
        Self {
            name,
            steps,
            index,
            config,
            sink,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step ids in execution order.
    #[must_use]
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(StepEvaluator::id).collect()
    }

    /// Returns a bound step by id.
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&StepEvaluator> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every step against the current bar of `data`.
    ///
    /// Step failures never surface as `Err`: they end the run and are
    /// described by the report's `failure`.
    pub fn run(&self, ctx: ExecutionContext, data: &MarketData) -> RunReport {
        let start = Instant::now();
        let mut run = Run::new(self, ctx, data);

        info!(
            pipeline = %self.name,
            run_id = %run.ctx.identity().run_id,
            steps = self.steps.len(),
            "Starting pipeline run"
        );

        let failure = run.execute().err();
        run.into_report(failure, start)
    }

    /// Runs the pipeline once per bar, each run with a fresh context.
    pub fn run_each_bar(&self, data: &MarketData) -> Vec<RunReport> {
        (0..data.len())
            .map(|index| {
                let identity = match data.symbol() {
                    Some(symbol) => RunIdentity::for_symbol(symbol),
                    None => RunIdentity::new(),
                };
                self.run(ExecutionContext::with_identity(identity), &data.at(index))
            })
            .collect()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.sink.try_emit(event_type, Some(data));
    }
}

/// State of one run.
struct Run<'p> {
    pipeline: &'p Pipeline,
    data: &'p MarketData,
    ctx: ExecutionContext,
    statuses: Vec<StepStatus>,
    reevaluations: Vec<ReevaluationRecord>,
    passes: usize,
}

impl<'p> Run<'p> {
    fn new(pipeline: &'p Pipeline, ctx: ExecutionContext, data: &'p MarketData) -> Self {
        Self {
            pipeline,
            data,
            ctx,
            statuses: vec![StepStatus::Pending; pipeline.steps.len()],
            reevaluations: Vec::new(),
            passes: 0,
        }
    }

    fn execute(&mut self) -> Result<(), RunFailure> {
        for i in 0..self.pipeline.steps.len() {
            let outcome = self.evaluate(i, None);

            match outcome.kind() {
                None => self.reevaluate_from(i)?,
                Some(kind) if kind.is_recoverable() && self.has_pending_reevaluator(i) => {
                    debug!(
                        step = %self.pipeline.steps[i].id(),
                        kind = %kind,
                        "Deferring failure until a later step reevaluates it"
                    );
                }
                Some(_) => return Err(self.failure(i, &outcome)),
            }
        }

        // A deferred failure nobody fixed still fails the run.
        for i in 0..self.pipeline.steps.len() {
            if let Some(outcome) = self.latest(i) {
                if outcome.is_failure() {
                    let outcome = outcome.clone();
                    return Err(self.failure(i, &outcome));
                }
            }
        }
        Ok(())
    }

    /// Evaluates one step, records the outcome and emits its events.
    fn evaluate(&mut self, i: usize, trigger: Option<&str>) -> StepOutcome {
        let pipeline = self.pipeline;
        let step = &pipeline.steps[i];
        let attempt = self.ctx.attempts(step.id()) + 1;

        self.statuses[i] = StepStatus::Running;
        pipeline.emit(
            events::STEP_STARTED,
            json!({"step": step.id(), "attempt": attempt, "reevaluation": trigger.is_some()}),
        );

        let evaluation = step.run(&mut self.ctx, self.data);
        let outcome = evaluation.outcome.clone();
        let bar_timestamp = self.data.current().map(|bar| bar.timestamp);
        self.ctx.record_evaluation(
            step.id(),
            evaluation.outcome,
            evaluation.input_fingerprint,
            bar_timestamp,
        );
        self.statuses[i] = outcome.status();

        match &outcome {
            StepOutcome::Success { values, .. } => {
                info!(step = %step.id(), attempt, "Step passed");
                pipeline.emit(
                    events::STEP_PASSED,
                    json!({
                        "step": step.id(),
                        "attempt": attempt,
                        "outputs": values.keys().collect::<Vec<_>>(),
                    }),
                );
            }
            StepOutcome::Failure { kind, detail } => {
                warn!(step = %step.id(), attempt, kind = %kind, detail = %detail, "Step failed");
                pipeline.emit(
                    events::STEP_FAILED,
                    json!({"step": step.id(), "attempt": attempt, "kind": kind, "detail": detail}),
                );
            }
        }

        outcome
    }

    /// Re-runs stale steps listed by `trigger`, cascading.
    fn reevaluate_from(&mut self, trigger: usize) -> Result<(), RunFailure> {
        let mut queue: VecDeque<(usize, usize)> =
            self.targets_of(trigger).map(|t| (trigger, t)).collect();

        while let Some((source, target)) = queue.pop_front() {
            let source_id = self.pipeline.steps[source].id().to_string();
            let target_id = self.pipeline.steps[target].id().to_string();

            if self.latest(target).is_none() {
                // Not reached yet; the first pass will evaluate it.
                continue;
            }

            if !self.is_stale(target) {
                debug!(trigger = %source_id, step = %target_id, "Reevaluation not needed");
                self.pipeline.emit(
                    events::STEP_SKIPPED_REEVALUATION,
                    json!({"trigger": source_id, "step": target_id}),
                );
                continue;
            }

            if self.passes >= self.pipeline.config.max_reevaluation_passes {
                return Err(self.limit_exceeded(target));
            }
            self.passes += 1;

            let outcome = self.evaluate(target, Some(&source_id));
            let attempt = self.ctx.attempts(&target_id);
            self.reevaluations.push(ReevaluationRecord {
                trigger: source_id.clone(),
                target: target_id.clone(),
                attempt,
                status: outcome.status(),
            });
            self.pipeline.emit(
                events::STEP_REEVALUATED,
                json!({
                    "trigger": source_id,
                    "step": target_id,
                    "attempt": attempt,
                    "status": outcome.status(),
                }),
            );

            match outcome.kind() {
                None => queue.extend(self.targets_of(target).map(|t| (target, t))),
                Some(kind) if kind.is_recoverable() && self.has_pending_reevaluator(target) => {}
                Some(_) => return Err(self.failure(target, &outcome)),
            }
        }

        Ok(())
    }

    fn targets_of(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.pipeline.steps[i]
            .template()
            .reevaluates()
            .iter()
            .filter_map(|id| self.pipeline.index_of(id))
    }

    /// True when the step's latest outcome failed or its inputs changed.
    fn is_stale(&self, i: usize) -> bool {
        let step = &self.pipeline.steps[i];
        let Some(record) = self.ctx.latest_record(step.id()) else {
            return true;
        };
        record.outcome.is_failure() || step.input_fingerprint(&self.ctx) != record.input_fingerprint
    }

    /// True when a step that has not run yet lists `i` in `reevaluates`.
    fn has_pending_reevaluator(&self, i: usize) -> bool {
        let id = self.pipeline.steps[i].id();
        self.pipeline.steps.iter().enumerate().any(|(j, step)| {
            self.statuses[j] == StepStatus::Pending
                && step.template().reevaluates().iter().any(|target| target == id)
        })
    }

    fn latest(&self, i: usize) -> Option<&StepOutcome> {
        self.ctx.latest_outcome(self.pipeline.steps[i].id())
    }

    fn chain(&self) -> Vec<String> {
        self.reevaluations.iter().map(ToString::to_string).collect()
    }

    fn failure(&self, i: usize, outcome: &StepOutcome) -> RunFailure {
        RunFailure {
            step_id: self.pipeline.steps[i].id().to_string(),
            kind: outcome.kind().unwrap_or(ErrorKind::Evaluation),
            detail: outcome.detail().unwrap_or_default().to_string(),
            chain: self.chain(),
        }
    }

    fn limit_exceeded(&mut self, target: usize) -> RunFailure {
        let limit = self.pipeline.config.max_reevaluation_passes;
        let step_id = self.pipeline.steps[target].id().to_string();
        let mut rerun: Vec<String> = self.reevaluations.iter().map(|r| r.target.clone()).collect();
        rerun.push(step_id.clone());
        let err = ReevaluationLimitExceeded::new(limit, rerun);

        warn!(step = %step_id, limit, "Reevaluation limit exceeded");

        let outcome = StepOutcome::failure(ErrorKind::ReevaluationLimitExceeded, err.to_string());
        let bar_timestamp = self.data.current().map(|bar| bar.timestamp);
        let attempt = self
            .ctx
            .record_evaluation(&step_id, outcome.clone(), None, bar_timestamp);
        self.statuses[target] = StepStatus::Failed;
        self.pipeline.emit(
            events::STEP_FAILED,
            json!({
                "step": step_id,
                "attempt": attempt,
                "kind": ErrorKind::ReevaluationLimitExceeded,
                "detail": err.to_string(),
            }),
        );

        self.failure(target, &outcome)
    }

    fn into_report(self, failure: Option<RunFailure>, start: Instant) -> RunReport {
        let pipeline = self.pipeline;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let run_id = self.ctx.identity().run_id.to_string();

        let status = if failure.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let steps = pipeline
            .steps
            .iter()
            .zip(&self.statuses)
            .map(|(step, status)| StepReport {
                id: step.id().to_string(),
                status: *status,
                attempts: self.ctx.attempts(step.id()),
            })
            .collect();

        match &failure {
            None => {
                info!(
                    pipeline = %pipeline.name,
                    run_id = %run_id,
                    passes = self.passes,
                    duration_ms,
                    "Pipeline run completed"
                );
                pipeline.emit(
                    events::PIPELINE_COMPLETED,
                    json!({
                        "pipeline": pipeline.name,
                        "run_id": run_id,
                        "passes": self.passes,
                        "duration_ms": duration_ms,
                    }),
                );
            }
            Some(failure) => {
                warn!(
                    pipeline = %pipeline.name,
                    run_id = %run_id,
                    step = %failure.step_id,
                    kind = %failure.kind,
                    "Pipeline run failed"
                );
                pipeline.emit(
                    events::PIPELINE_FAILED,
                    json!({
                        "pipeline": pipeline.name,
                        "run_id": run_id,
                        "step": failure.step_id,
                        "kind": failure.kind,
                        "detail": failure.detail,
                        "chain": failure.chain,
                    }),
                );
            }
        }

        RunReport {
            pipeline: pipeline.name.clone(),
            run_id,
            status,
            steps,
            reevaluations: self.reevaluations,
            failure,
            passes: self.passes,
            duration_ms,
            context: self.ctx,
        }
    }
}
