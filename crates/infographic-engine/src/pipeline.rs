use infographic_contracts::events::{EventPayload, EventWriter};
use infographic_contracts::request::{GenerationRequest, ValidationError};
use infographic_contracts::state::{PipelineEvent, PipelineState, TransitionError};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::generator::FailureKind;
use crate::{error_chain_text, InfographicEngine};

type StateObserver = Box<dyn FnMut(&PipelineState)>;

/// Why a submission was not dispatched. Either way the state is unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Refused(#[from] TransitionError),
}

/// Owns the session's single [`PipelineState`] and drives it through
/// analyze-then-generate. Stage failures land in the error state; they are
/// never returned to the caller.
pub struct Pipeline {
    engine: InfographicEngine,
    state: PipelineState,
    events: EventWriter,
    observer: Option<StateObserver>,
}

impl Pipeline {
    pub fn new(engine: InfographicEngine) -> Self {
        Self {
            engine,
            state: PipelineState::Idle,
            events: EventWriter::disabled("session"),
            observer: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = events;
        self
    }

    pub fn on_state_change(&mut self, observer: impl FnMut(&PipelineState) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn engine(&self) -> &InfographicEngine {
        &self.engine
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Runs one request to completion. Blocks until the pipeline settles in
    /// `complete` or `error`.
    pub fn submit(&mut self, request: GenerationRequest) -> Result<&PipelineState, SubmitError> {
        if let Err(err) = request.validate() {
            info!(error = %err, "submission ignored");
            return Err(err.into());
        }
        self.advance(PipelineEvent::Submit)?;
        if request.exceeds_suggested_image_count() {
            warn!(
                images = request.context_images.len(),
                "more context images than the suggested maximum"
            );
        }

        let summary = match self.engine.analyze_context(&request) {
            Ok(summary) => summary,
            Err(err) => {
                self.fail(&err)?;
                return Ok(&self.state);
            }
        };
        self.emit(
            "context_analyzed",
            json!({
                "text_model": self.engine.text_model(),
                "summary_chars": summary.chars().count(),
            }),
        );
        self.advance(PipelineEvent::Analyzed)?;

        let outcome = self.engine.generate_infographics(&request, &summary);
        for failure in &outcome.failures {
            self.emit(
                "variant_failed",
                json!({
                    "kind": failure.kind,
                    "reason": failure.reason,
                    "transport": failure.failure == FailureKind::Transport,
                }),
            );
        }
        for image in &outcome.images {
            self.emit(
                "variant_generated",
                json!({
                    "kind": image.kind,
                    "image_id": image.id,
                    "description": image.description,
                }),
            );
        }

        let transport_failure = outcome.total_transport_failure().map(str::to_string);
        match transport_failure {
            Some(reason) => self.advance(PipelineEvent::Failed(reason))?,
            None => self.advance(PipelineEvent::Generated(outcome.images))?,
        }
        Ok(&self.state)
    }

    /// `error -> idle`.
    pub fn retry(&mut self) -> Result<&PipelineState, TransitionError> {
        self.advance(PipelineEvent::Retry)?;
        Ok(&self.state)
    }

    /// `complete -> idle`; the gallery images are dropped.
    pub fn reset(&mut self) -> Result<&PipelineState, TransitionError> {
        self.advance(PipelineEvent::Reset)?;
        Ok(&self.state)
    }

    fn fail(&mut self, err: &anyhow::Error) -> Result<(), TransitionError> {
        let message = error_chain_text(err, 512);
        error!(state = %self.state, error = %message, "generation failed");
        self.advance(PipelineEvent::Failed(message))
    }

    fn advance(&mut self, event: PipelineEvent) -> Result<(), TransitionError> {
        self.state.advance(event)?;

        let mut payload = EventPayload::new();
        payload.insert("state".to_string(), json!(self.state.name()));
        if let Some(message) = self.state.error_message() {
            payload.insert("message".to_string(), json!(message));
        }
        if let PipelineState::Complete { images } = &self.state {
            payload.insert("images".to_string(), json!(images.len()));
        }
        self.emit("state_changed", Value::Object(payload));

        if let Some(observer) = self.observer.as_mut() {
            observer(&self.state);
        }
        Ok(())
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let payload = match payload {
            Value::Object(map) => map,
            _ => EventPayload::new(),
        };
        if let Err(err) = self.events.emit(event_type, payload) {
            warn!(event_type, error = %err, "failed to append run event");
        }
    }
}
