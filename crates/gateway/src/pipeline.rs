//! Processing Pipeline (C6): classify, clean, extract.
//!
//! Implements [`TurnPipeline`] on top of the Turn Classifier, the LLM
//! Gateway, the Function Registry, and the Prompt Renderer. Persistence and
//! in-memory history append happen one layer up in `SessionManager` — this
//! type only ever builds and returns a `TurnOutcome`; it never touches the
//! persistence port or `SessionState`'s append methods.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;

use lumen_domain::config::{ClassifierConfig, LlmConfig};
use lumen_domain::error::Result;
use lumen_domain::model::{CalledFunction, CleanedTurn, CleaningLevel, ClassificationPath};
use lumen_domain::model::{ConfidenceScore, Correction, Turn};
use lumen_domain::trace::TraceEvent;
use lumen_domain::usage::Usage;
use lumen_functions::FunctionRegistry;
use lumen_prompt::context::{cleaner_context, function_caller_context};
use lumen_providers::LlmProvider;
use lumen_sessions::{SessionState, TurnOutcome, TurnPipeline};

use crate::classifier::{classify, normalize};
use crate::retry::RetryPolicy;

/// The cleaner LLM's expected structured reply. A reply that doesn't parse
/// as this shape is treated the same as a transport failure: fall back to
/// the raw text rather than surface a parse error to the caller.
#[derive(Debug, Deserialize)]
struct CleanerResponse {
    cleaned_text: String,
    #[serde(default)]
    confidence: Option<ConfidenceScore>,
    #[serde(default)]
    corrections: Vec<Correction>,
    #[serde(default)]
    context_detected: Option<String>,
}

pub struct Pipeline {
    provider: Arc<dyn LlmProvider>,
    functions: Arc<FunctionRegistry>,
    classifier_config: ClassifierConfig,
    llm_config: LlmConfig,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        functions: Arc<FunctionRegistry>,
        classifier_config: ClassifierConfig,
        llm_config: LlmConfig,
    ) -> Self {
        let retry = RetryPolicy::new(llm_config.max_retries);
        Self { provider, functions, classifier_config, llm_config, retry }
    }

    fn bare_envelope(
        &self,
        state: &SessionState,
        turn: &Turn,
        cleaned_text: String,
        confidence_score: ConfidenceScore,
        started: Instant,
    ) -> CleanedTurn {
        CleanedTurn {
            id: uuid::Uuid::new_v4().to_string(),
            turn_id: turn.turn_id.clone(),
            evaluation_id: state.evaluation.evaluation_id.clone(),
            speaker: turn.speaker.clone(),
            cleaned_text,
            confidence_score,
            cleaning_applied: false,
            cleaning_level: CleaningLevel::None,
            ai_model_used: None,
            processing_time_ms: started.elapsed().as_millis() as u64,
            corrections: Vec::new(),
            context_detected: None,
            token_usage: Usage::ZERO,
            cost_usd: 0.0,
        }
    }

    async fn run_cleaner(
        &self,
        state: &SessionState,
        turn: &Turn,
        started: Instant,
    ) -> CleanedTurn {
        let window: Vec<(String, String)> = state
            .cleaned_window(state.evaluation.config.cleaner_window_size as usize)
            .iter()
            .map(|ct| (ct.speaker.clone(), ct.cleaned_text.clone()))
            .collect();

        TraceEvent::CleanerCallIssued {
            evaluation_id: state.evaluation.evaluation_id.clone(),
            turn_id: turn.turn_id.clone(),
            window_len: window.len(),
        }
        .emit();

        let prompt = match cleaner_context(&state.mirrored_customer, &window, &turn.raw_text)
            .and_then(|ctx| state.cleaner_template.render(&ctx))
        {
            Ok(prompt) => prompt,
            Err(_) => {
                // Template rendering failed (e.g. a stale placeholder) —
                // treat exactly like an unreachable upstream: fall back.
                return self.cleaner_fallback(state, turn, started, Usage::ZERO);
            }
        };

        let params = self.llm_config.params;
        let result = self
            .retry
            .run(|| self.provider.generate_text(&prompt, &params))
            .await;

        let (duration_ms, fallback, cleaned) = match result {
            Ok(generated) => {
                let cleaned = self.parse_cleaner_response(state, turn, started, &generated.text, generated.token_usage);
                (generated.latency_ms, false, cleaned)
            }
            Err(_) => (
                started.elapsed().as_millis() as u64,
                true,
                self.cleaner_fallback(state, turn, started, Usage::ZERO),
            ),
        };

        TraceEvent::CleanerCallReturned {
            evaluation_id: state.evaluation.evaluation_id.clone(),
            turn_id: turn.turn_id.clone(),
            duration_ms,
            input_tokens: cleaned.token_usage.input,
            output_tokens: cleaned.token_usage.output,
            fallback,
        }
        .emit();

        cleaned
    }

    fn cleaner_fallback(&self, state: &SessionState, turn: &Turn, started: Instant, usage: Usage) -> CleanedTurn {
        CleanedTurn {
            id: uuid::Uuid::new_v4().to_string(),
            turn_id: turn.turn_id.clone(),
            evaluation_id: state.evaluation.evaluation_id.clone(),
            speaker: turn.speaker.clone(),
            cleaned_text: turn.raw_text.clone(),
            confidence_score: ConfidenceScore::Low,
            cleaning_applied: false,
            cleaning_level: CleaningLevel::None,
            ai_model_used: Some(self.llm_config.model_name.clone()),
            processing_time_ms: started.elapsed().as_millis() as u64,
            corrections: Vec::new(),
            context_detected: None,
            token_usage: usage,
            cost_usd: self.llm_config.pricing.estimate_cost(usage.input, usage.output),
        }
    }

    fn parse_cleaner_response(
        &self,
        state: &SessionState,
        turn: &Turn,
        started: Instant,
        text: &str,
        usage: Usage,
    ) -> CleanedTurn {
        let cost_usd = self.llm_config.pricing.estimate_cost(usage.input, usage.output);
        match serde_json::from_str::<CleanerResponse>(text) {
            Ok(parsed) => {
                let cleaning_level = if parsed.corrections.is_empty() { CleaningLevel::Light } else { CleaningLevel::Full };
                CleanedTurn {
                    id: uuid::Uuid::new_v4().to_string(),
                    turn_id: turn.turn_id.clone(),
                    evaluation_id: state.evaluation.evaluation_id.clone(),
                    speaker: turn.speaker.clone(),
                    cleaned_text: parsed.cleaned_text,
                    confidence_score: parsed.confidence.unwrap_or(ConfidenceScore::High),
                    cleaning_applied: true,
                    cleaning_level,
                    ai_model_used: Some(self.llm_config.model_name.clone()),
                    processing_time_ms: started.elapsed().as_millis() as u64,
                    corrections: parsed.corrections,
                    context_detected: parsed.context_detected,
                    token_usage: usage,
                    cost_usd,
                }
            }
            Err(_) => {
                let mut fallback = self.cleaner_fallback(state, turn, started, usage);
                fallback.cost_usd = cost_usd;
                fallback
            }
        }
    }

    /// Function-caller stage: returns the produced `CalledFunction` records
    /// plus the LLM latency spent deciding which ones to make. Never fails
    /// the turn — a failed function-caller call degrades to "no tool calls".
    async fn run_function_caller(
        &self,
        state: &mut SessionState,
        cleaned_turn: &CleanedTurn,
    ) -> (Vec<CalledFunction>, u64, f64) {
        let window: Vec<(String, String)> = state
            .cleaned_window(state.evaluation.config.function_window_size as usize)
            .iter()
            .map(|ct| (ct.speaker.clone(), ct.cleaned_text.clone()))
            .collect();
        let recent_calls: Vec<CalledFunction> = state
            .function_window(state.evaluation.config.function_window_size as usize)
            .to_vec();
        let tool_schemas = self.functions.tool_schemas();

        TraceEvent::FunctionCallerIssued {
            evaluation_id: state.evaluation.evaluation_id.clone(),
            turn_id: cleaned_turn.turn_id.clone(),
            window_len: window.len(),
        }
        .emit();

        let Some(template) = state.function_template.as_ref() else {
            return (Vec::new(), 0, 0.0);
        };

        let prompt = match function_caller_context(
            &state.mirrored_customer,
            &window,
            &recent_calls,
            &cleaned_turn.cleaned_text,
            &tool_schemas,
        )
        .and_then(|ctx| template.render(&ctx))
        {
            Ok(prompt) => prompt,
            Err(_) => return (Vec::new(), 0, 0.0),
        };

        let params = self.llm_config.params;
        let started = Instant::now();
        let result = self
            .retry
            .run(|| self.provider.generate_with_tools(&prompt, &tool_schemas, &params))
            .await;

        let (duration_ms, tool_calls, function_cost, generated_token_usage) = match result {
            Ok(generated) => {
                let cost = self.llm_config.pricing.estimate_cost(
                    generated.token_usage.input,
                    generated.token_usage.output,
                );
                (generated.latency_ms, generated.tool_calls, cost, generated.token_usage)
            }
            Err(_) => (started.elapsed().as_millis() as u64, Vec::new(), 0.0, Usage::ZERO),
        };

        TraceEvent::FunctionCallerReturned {
            evaluation_id: state.evaluation.evaluation_id.clone(),
            turn_id: cleaned_turn.turn_id.clone(),
            duration_ms,
            tool_calls: tool_calls.len(),
        }
        .emit();

        if tool_calls.is_empty() {
            return (Vec::new(), duration_ms, function_cost);
        }

        let mut called_functions = Vec::with_capacity(tool_calls.len());
        let call_count = tool_calls.len() as u32;
        let per_call_cost = function_cost / call_count as f64;
        let per_call_usage = Usage::new(
            generated_token_usage.input / call_count,
            generated_token_usage.output / call_count,
        );
        for call in tool_calls {
            let exec_started = Instant::now();
            let outcome = self.functions.execute(&call.name, &call.arguments, &mut state.mirrored_customer);

            TraceEvent::FunctionExecuted {
                evaluation_id: state.evaluation.evaluation_id.clone(),
                turn_id: cleaned_turn.turn_id.clone(),
                function_name: call.name.clone(),
                success: outcome.success,
                duration_ms: exec_started.elapsed().as_millis() as u64,
            }
            .emit();

            called_functions.push(CalledFunction {
                id: uuid::Uuid::new_v4().to_string(),
                cleaned_turn_id: cleaned_turn.id.clone(),
                evaluation_id: state.evaluation.evaluation_id.clone(),
                function_name: call.name,
                parameters: call.arguments,
                result: outcome.result,
                error: outcome.error,
                executed: outcome.success,
                processing_time_ms: outcome.processing_time_ms,
                token_usage: per_call_usage,
                cost_usd: per_call_cost,
            });
        }

        (called_functions, duration_ms, function_cost)
    }
}

#[async_trait]
impl TurnPipeline for Pipeline {
    async fn process(&self, state: &mut SessionState, turn: &Turn) -> Result<TurnOutcome> {
        let started = Instant::now();
        let path = classify(turn, &self.classifier_config);
        TraceEvent::TurnClassified {
            evaluation_id: state.evaluation.evaluation_id.clone(),
            turn_id: turn.turn_id.clone(),
            path: path.to_string(),
        }
        .emit();

        let cleaned_turn = match path {
            ClassificationPath::Bypass => {
                self.bare_envelope(state, turn, turn.raw_text.clone(), ConfidenceScore::High, started)
            }
            ClassificationPath::Skip => {
                self.bare_envelope(state, turn, turn.raw_text.clone(), ConfidenceScore::Low, started)
            }
            ClassificationPath::FastClean => {
                self.bare_envelope(state, turn, normalize(&turn.raw_text), ConfidenceScore::High, started)
            }
            ClassificationPath::Process => self.run_cleaner(state, turn, started).await,
        };

        // Bypass and skip never reach the function-calling stage.
        let runs_function_stage = !matches!(path, ClassificationPath::Bypass | ClassificationPath::Skip)
            && turn.is_user_speaker()
            && state.evaluation.config.functions_enabled;

        let mut cleaned_turn = cleaned_turn;
        let (called_functions, function_duration_ms) = if runs_function_stage {
            let (called, duration_ms, function_cost) = self.run_function_caller(state, &cleaned_turn).await;
            if called.is_empty() {
                cleaned_turn.cost_usd += function_cost;
            }
            (called, duration_ms)
        } else {
            (Vec::new(), 0)
        };

        let total_cost_usd = cleaned_turn.cost_usd + called_functions.iter().map(|c| c.cost_usd).sum::<f64>();
        let total_processing_time_ms = cleaned_turn.processing_time_ms
            + function_duration_ms
            + called_functions.iter().map(|c| c.processing_time_ms).sum::<u64>();

        TraceEvent::TurnComplete {
            evaluation_id: state.evaluation.evaluation_id.clone(),
            turn_id: turn.turn_id.clone(),
            total_cost_usd,
            total_processing_time_ms,
        }
        .emit();

        Ok(TurnOutcome { cleaned_turn, called_functions, total_cost_usd, total_processing_time_ms })
    }
}
