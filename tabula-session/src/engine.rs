//! The analysis engine
//!
//! Orchestrates one turn end-to-end: schema + question -> prompt ->
//! generated code -> policy gate -> contained execution -> normalized
//! result -> recorded Turn. Every failure anywhere in the pipeline is
//! converted into an Error-variant result on the recorded turn; no
//! turn is ever dropped.

use crate::session::{Session, SessionManager};
use std::sync::Arc;
use std::time::Duration;
use tabula_core::{
    Dataset, ExecutionResult, FailureKind, SchemaDescriptor, SessionError, SessionId,
    TabulaConfig, TabulaError, TabulaResult, Turn, TurnId,
};
use tabula_context::PromptBuilder;
use tabula_exec::Executor;
use tabula_lang::Program;
use tabula_llm::{CodeGenerator, InsightWriter, ProviderRegistry};
use tabula_policy::Validator;

/// Extra slack the outer wall-clock guard allows beyond the
/// interpreter's own deadline before force-abandoning the blocking task.
const OUTER_TIMEOUT_SLACK: Duration = Duration::from_millis(250);

// ============================================================================
// ENGINE
// ============================================================================

/// End-to-end analysis engine. Holds the stateless pipeline stages and
/// the session registry; safe to share behind an `Arc` and call from
/// many sessions in parallel.
pub struct AnalystEngine {
    config: TabulaConfig,
    registry: ProviderRegistry,
    validator: Validator,
    executor: Arc<Executor>,
    prompt: PromptBuilder,
    sessions: SessionManager,
}

impl AnalystEngine {
    /// Create an engine from configuration. Providers are registered
    /// separately via the `with_*` builders.
    pub fn new(config: TabulaConfig) -> Self {
        Self {
            validator: Validator::with_limits(&config.exec),
            executor: Arc::new(Executor::new(config.exec.clone())),
            prompt: PromptBuilder::with_limits(config.prompt.clone()),
            registry: ProviderRegistry::new(),
            sessions: SessionManager::new(),
            config,
        }
    }

    /// Register the code generator.
    pub fn with_generator(mut self, provider: Arc<dyn CodeGenerator>) -> Self {
        self.registry.register_generator_shared(provider);
        self
    }

    /// Register the business-summary writer.
    pub fn with_insight_writer(mut self, provider: Arc<dyn InsightWriter>) -> Self {
        self.registry.register_insight_shared(provider);
        self
    }

    /// The sandboxed executor, exposed for run-count probes.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The session registry.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ------------------------------------------------------------------
    // Inbound operations
    // ------------------------------------------------------------------

    /// Create a session for an uploaded dataset and return its id plus
    /// the derived schema snapshot.
    pub async fn upload_dataset(&self, dataset: Dataset) -> (SessionId, SchemaDescriptor) {
        let session = Session::new(dataset, self.config.prompt.sample_values);
        let descriptor = session.descriptor().clone();
        let id = self.sessions.insert(session).await;
        tracing::info!(session_id = %id, rows = descriptor.row_count, "dataset uploaded");
        (id, descriptor)
    }

    /// Replace an existing session's dataset (a re-upload starts a
    /// fresh conversation over the new data).
    pub async fn replace_dataset(
        &self,
        session_id: SessionId,
        dataset: Dataset,
    ) -> TabulaResult<SchemaDescriptor> {
        let handle = self.session(session_id).await?;
        let mut session = handle.lock().await;
        session.replace_dataset(dataset, self.config.prompt.sample_values);
        Ok(session.descriptor().clone())
    }

    /// Process one question end-to-end and return the recorded turn.
    ///
    /// Appends exactly one turn per call, success or failure -
    /// deliberately not idempotent, since every call is a new user
    /// action.
    pub async fn submit_question(
        &self,
        session_id: SessionId,
        question: &str,
    ) -> TabulaResult<Turn> {
        let generator = self.registry.generator()?;
        let handle = self.session(session_id).await?;

        // One question end-to-end at a time within a session.
        let mut session = handle.lock().await;

        let prompt = self
            .prompt
            .build(question, session.descriptor(), session.log().history());

        let code = match self.generate_with_retry(generator.as_ref(), &prompt).await {
            // Models habitually wrap code in markdown fences even when
            // told not to; strip them before the gate judges the text.
            Ok(code) => tabula_llm::strip_code_fences(&code),
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "LLM unavailable for turn");
                let turn = Turn::unavailable(question, err.to_string());
                return Ok(session.record(turn).clone());
            }
        };

        let (verdict, program) = self.validator.validate_source(&code);
        let turn = match program {
            Some(program) => {
                let result = self.execute_contained(&program, session.dataset()).await;
                Turn::executed(question, code, verdict, result)
            }
            None => Turn::denied(question, code, verdict),
        };

        tracing::debug!(
            session_id = %session_id,
            turn_id = %turn.turn_id,
            error = turn.result.is_error(),
            "turn recorded"
        );
        Ok(session.record(turn).clone())
    }

    /// Executive overview of the session's dataset, written by the
    /// registered insight provider.
    pub async fn executive_overview(&self, session_id: SessionId) -> TabulaResult<String> {
        let writer = self.registry.insight()?;
        let handle = self.session(session_id).await?;
        let descriptor_json = {
            let session = handle.lock().await;
            serde_json::to_string(session.descriptor()).unwrap_or_else(|_| "{}".to_string())
        };
        writer.write_overview(&descriptor_json).await
    }

    /// Business-language summary of one recorded turn.
    pub async fn summarize_turn(
        &self,
        session_id: SessionId,
        turn_id: TurnId,
    ) -> TabulaResult<String> {
        let writer = self.registry.insight()?;
        let handle = self.session(session_id).await?;
        let (question, preview) = {
            let session = handle.lock().await;
            let turn = session
                .log()
                .history()
                .iter()
                .find(|t| t.turn_id == turn_id)
                .ok_or(TabulaError::Session(SessionError::NotFound { session_id }))?;
            (
                turn.question.clone(),
                turn.result.preview(self.config.prompt.preview_rows),
            )
        };
        writer.write_summary(&question, &preview).await
    }

    // ------------------------------------------------------------------
    // Pipeline stages
    // ------------------------------------------------------------------

    async fn session(
        &self,
        session_id: SessionId,
    ) -> TabulaResult<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions
            .get(session_id)
            .await
            .ok_or(TabulaError::Session(SessionError::NotFound { session_id }))
    }

    /// Call the generator with exactly one retry, and only for
    /// transient transport failures. All other failures are terminal.
    async fn generate_with_retry(
        &self,
        generator: &dyn CodeGenerator,
        prompt: &str,
    ) -> TabulaResult<String> {
        match generator.generate_code(prompt).await {
            Ok(code) => Ok(code),
            Err(TabulaError::Llm(err))
                if err.is_transient() && self.config.llm.retry_transient =>
            {
                tracing::debug!(error = %err, "transient LLM failure, retrying once");
                generator.generate_code(prompt).await
            }
            Err(err) => Err(err),
        }
    }

    /// Run validated code on a blocking thread under an outer
    /// wall-clock guard, so even a wedged interpreter cannot outlive
    /// the timeout contract. Single attempt, never retried.
    async fn execute_contained(&self, program: &Program, dataset: &Dataset) -> ExecutionResult {
        let executor = Arc::clone(&self.executor);
        let program = program.clone();
        let dataset = dataset.clone();
        let budget = self.config.exec.timeout + OUTER_TIMEOUT_SLACK;

        let task = tokio::task::spawn_blocking(move || executor.execute(&program, &dataset));
        match tokio::time::timeout(budget, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => ExecutionResult::error(
                FailureKind::RuntimeFailure,
                format!("execution task failed: {}", join_err),
            ),
            Err(_) => ExecutionResult::error(
                FailureKind::Timeout,
                format!(
                    "execution exceeded the {}ms wall-clock limit",
                    self.config.exec.timeout.as_millis()
                ),
            ),
        }
    }
}

impl std::fmt::Debug for AnalystEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalystEngine")
            .field("generator", &self.registry.has_generator())
            .field("insight", &self.registry.has_insight())
            .field("executions", &self.executor.executions())
            .finish()
    }
}
