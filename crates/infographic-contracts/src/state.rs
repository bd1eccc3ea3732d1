use std::fmt;

use thiserror::Error;

use crate::gallery::GeneratedImage;

pub const EMPTY_RESULT_MESSAGE: &str = "Failed to generate images. Please try again.";
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Session-wide pipeline state. Exactly one variant is active at a time and
/// every change goes through [`PipelineState::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Analyzing,
    Generating,
    Complete {
        images: Vec<GeneratedImage>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Submit,
    Analyzed,
    Generated(Vec<GeneratedImage>),
    Failed(String),
    Retry,
    Reset,
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Analyzed => "analyzed",
            Self::Generated(_) => "generated",
            Self::Failed(_) => "failed",
            Self::Retry => "retry",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot apply '{event}' while pipeline is {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// True while a run is in flight and submission is disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Analyzing | Self::Generating)
    }

    pub fn images(&self) -> &[GeneratedImage] {
        match self {
            Self::Complete { images } => images,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn advance(&mut self, event: PipelineEvent) -> Result<&PipelineState, TransitionError> {
        let next = match (&*self, event) {
            (Self::Idle, PipelineEvent::Submit) => Self::Analyzing,
            (Self::Analyzing, PipelineEvent::Analyzed) => Self::Generating,
            (Self::Generating, PipelineEvent::Generated(images)) => {
                if images.is_empty() {
                    Self::Error {
                        message: EMPTY_RESULT_MESSAGE.to_string(),
                    }
                } else {
                    Self::Complete { images }
                }
            }
            (Self::Analyzing | Self::Generating, PipelineEvent::Failed(message)) => {
                let message = message.trim();
                Self::Error {
                    message: if message.is_empty() {
                        GENERIC_ERROR_MESSAGE.to_string()
                    } else {
                        message.to_string()
                    },
                }
            }
            (Self::Error { .. }, PipelineEvent::Retry) => Self::Idle,
            (Self::Complete { .. }, PipelineEvent::Reset) => Self::Idle,
            (state, event) => {
                return Err(TransitionError {
                    state: state.name(),
                    event: event.name(),
                })
            }
        };
        *self = next;
        Ok(self)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
