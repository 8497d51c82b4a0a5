//! Flow orchestrator
//!
//! CLASSIFY → (semantic) SQL → DATA → EXPLAIN → RESPOND
//!          → (documental) GENERATE → RESPOND
//!
//! One message runs one sequential pipeline. The explanation call is the
//! only await point and it cannot fail, so `handle_query` is infallible.

pub mod prompts;

pub use prompts::welcome_message;

use crate::audit::{seal, AuditLog};
use crate::classifier::QueryClassifier;
use crate::llm::ExplanationRequester;
use crate::metrics::MetricStore;
use crate::models::{
    ClassificationResult, MetricValue, QueryOutcome, SessionContext, SessionTrace, TraceResult,
    TraceStep,
};
use crate::sink::MessageSink;
use crate::sql::generate_query;
use crate::trace::{StepGuard, TraceEmitter};
use chrono::Utc;
use prompts::{build_explanation_prompt, CHAT_SYSTEM_PROMPT, EXPLANATION_SYSTEM_PROMPT};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub const STEP_CLASSIFICATION: &str = "Classification";
pub const STEP_SQL: &str = "SQL";
pub const STEP_DATA: &str = "Data";
pub const STEP_EXPLANATION: &str = "Explanation";
pub const STEP_GENERATING: &str = "Generating Response";

/// Shown instead of a value when the store has no series for the metric
const VALUE_NOT_AVAILABLE: &str = "not available";

fn with_timing(text: &str, elapsed_ms: f64) -> String {
    format!("{}\n\n⏱️ {:.2} ms", text, elapsed_ms)
}

/// Markdown table for the data step
fn render_data_table(value: &MetricValue) -> String {
    format!(
        "| Metric | Period | Value |\n|--------|--------|-------|\n| {} | {} | {} |",
        value.metric, value.period, value.formatted
    )
}

/// Pieces produced by the semantic route
struct SemanticRun {
    sql: String,
    data: Option<MetricValue>,
    explanation: String,
}

/// Main orchestrator that answers chat messages
pub struct Orchestrator {
    store: Arc<MetricStore>,
    explainer: Arc<dyn ExplanationRequester>,
    audit_log: AuditLog,
}

impl Orchestrator {
    pub fn new(
        store: Arc<MetricStore>,
        explainer: Arc<dyn ExplanationRequester>,
        audit_log: AuditLog,
    ) -> Self {
        Self {
            store,
            explainer,
            audit_log,
        }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// Open a session and greet the user
    pub async fn start_session(
        &self,
        user_id: Option<String>,
        sink: &dyn MessageSink,
    ) -> SessionContext {
        let session = SessionContext::new(user_id);
        info!(session_id = %session.session_id, "Session started");
        sink.send(welcome_message()).await;
        session
    }

    /// Answer one message, emitting steps and sending the final answer
    pub async fn handle_query(
        &self,
        session: &SessionContext,
        query: &str,
        tracer: &dyn TraceEmitter,
        sink: &dyn MessageSink,
    ) -> QueryOutcome {
        let start_time = Instant::now();
        let mut steps: Vec<TraceStep> = Vec::new();

        info!(
            session_id = %session.session_id,
            query = %query,
            "Orchestrator: handling query"
        );

        // Documental queries report only the generating step
        let mut step = StepGuard::begin(tracer, STEP_CLASSIFICATION);
        step.set_input(query);
        let classification = QueryClassifier::classify(query);

        let (sql, data, explanation, answer) = if classification.is_financial {
            step.set_output(with_timing(&classification.summary(), step.elapsed_ms()));
            steps.extend(step.finish());

            let run = self
                .run_semantic(query, &classification, tracer, &mut steps)
                .await;

            let total_ms = start_time.elapsed().as_secs_f64() * 1000.0;
            let answer =
                semantic_answer(&classification, run.data.as_ref(), &run.explanation, total_ms);
            (Some(run.sql), run.data, run.explanation, answer)
        } else {
            step.discard();

            let mut step = StepGuard::begin(tracer, STEP_GENERATING);
            step.set_input(query);
            let explanation = self.explainer.complete(CHAT_SYSTEM_PROMPT, query).await;
            step.set_output(with_timing(&explanation, step.elapsed_ms()));
            steps.extend(step.finish());

            let total_ms = start_time.elapsed().as_secs_f64() * 1000.0;
            let answer = format!("{}\n\n---\n*Total time: {:.0} ms*", explanation, total_ms);
            (None, None, explanation, answer)
        };

        sink.send(&answer).await;

        let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        let trace = seal(SessionTrace {
            trace_id: Uuid::new_v4(),
            session_id: session.session_id,
            user_id: session.user_id.clone(),
            timestamp: Utc::now(),
            query: query.to_string(),
            classification: classification.clone(),
            steps: steps.clone(),
            total_duration_ms,
            result: TraceResult {
                answer: answer.clone(),
                sql: sql.clone(),
                data: data.clone(),
            },
            integrity_hash: String::new(),
        });

        let audit_id = trace.trace_id;
        if let Err(e) = self.audit_log.record(trace).await {
            warn!("Failed to record audit trace: {}", e);
        }

        info!(
            session_id = %session.session_id,
            route = %classification.route,
            steps = steps.len(),
            total_duration_ms,
            "Orchestrator: query complete"
        );

        QueryOutcome {
            query: query.to_string(),
            classification,
            sql,
            data,
            explanation,
            answer,
            steps,
            total_duration_ms,
            audit_id,
        }
    }

    async fn run_semantic(
        &self,
        query: &str,
        classification: &ClassificationResult,
        tracer: &dyn TraceEmitter,
        steps: &mut Vec<TraceStep>,
    ) -> SemanticRun {
        let period = classification.period;

        // === SQL ===
        let mut step = StepGuard::begin(tracer, STEP_SQL);
        step.set_input(format!(
            "{} / {}",
            classification.metric.map(|m| m.as_str()).unwrap_or("value"),
            period
        ));
        let sql = generate_query(classification.metric, period);
        step.set_output(with_timing(&format!("```sql\n{}\n```", sql), step.elapsed_ms()));
        steps.extend(step.finish());

        // === DATA ===
        let mut step = StepGuard::begin(tracer, STEP_DATA);
        step.set_input(sql.as_str());
        let data = self.store.lookup(classification.metric, period);
        let rendered = match &data {
            Some(value) => render_data_table(value),
            None => format!("No data available for {}", period),
        };
        step.set_output(with_timing(&rendered, step.elapsed_ms()));
        steps.extend(step.finish());

        // === EXPLAIN ===
        let formatted = data
            .as_ref()
            .map(|v| v.formatted.as_str())
            .unwrap_or(VALUE_NOT_AVAILABLE);

        let explanation = match classification.metric {
            Some(metric) => {
                let prompt = build_explanation_prompt(query, metric, period, formatted);

                let mut step = StepGuard::begin(tracer, STEP_EXPLANATION);
                step.set_input(prompt.as_str());
                let explanation = self
                    .explainer
                    .complete(EXPLANATION_SYSTEM_PROMPT, &prompt)
                    .await;
                step.set_output(with_timing(&explanation, step.elapsed_ms()));
                steps.extend(step.finish());
                explanation
            }
            // Semantic results always carry a metric
            None => String::new(),
        };

        SemanticRun {
            sql,
            data,
            explanation,
        }
    }
}

fn semantic_answer(
    classification: &ClassificationResult,
    data: Option<&MetricValue>,
    explanation: &str,
    total_ms: f64,
) -> String {
    let label = classification.metric.map(|m| m.label()).unwrap_or("Value");
    let headline = data
        .map(|v| v.formatted.as_str())
        .unwrap_or(VALUE_NOT_AVAILABLE);

    format!(
        "## {} ({}): {}\n\n{}\n\n---\n*Route: {} → {} | Total time: {:.0} ms*",
        label,
        classification.period.label(),
        headline,
        explanation,
        classification.route,
        classification.route_target,
        total_ms
    )
}
