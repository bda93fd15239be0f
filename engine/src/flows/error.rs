use thiserror::Error;

use crate::{model::GenerationFailure, params::ParameterError, role::Feature};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid input: {field} {reason}")]
    Validation { field: &'static str, reason: String },

    #[error(transparent)]
    Parameters(#[from] ParameterError),

    #[error("{0} requires login")]
    LoginRequired(Feature),

    #[error("the request was rejected by the content safety filters ({reason})")]
    ContentPolicy { reason: String },

    #[error("generation failed: {0}")]
    Generation(GenerationFailure),

    #[error("Image generation failed. The model may not have returned an image.{}", model_text_suffix(.model_text))]
    NoImage { model_text: Option<String> },

    #[error("the model's answer did not have the expected shape: {0}")]
    MalformedOutput(String),

    #[error("the model kept calling tools after {0} rounds")]
    ToolLoop(usize),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

fn model_text_suffix(model_text: &Option<String>) -> String {
    match model_text {
        Some(text) => format!(" Model response: {text}"),
        None => String::new(),
    }
}

/// Coarse classes the presentation layer reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad or missing input, nothing was sent
    Validation,
    /// the provider failed or answered with something unusable
    Remote,
    /// the provider refused on policy grounds
    ContentPolicy,
    /// a bug on our side
    Internal,
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Validation { .. } | FlowError::Parameters(_) | FlowError::LoginRequired(_) => {
                ErrorKind::Validation
            }
            FlowError::ContentPolicy { .. } => ErrorKind::ContentPolicy,
            FlowError::Generation(_)
            | FlowError::NoImage { .. }
            | FlowError::MalformedOutput(_)
            | FlowError::ToolLoop(_) => ErrorKind::Remote,
            FlowError::Template(_) => ErrorKind::Internal,
        }
    }

    /// Text for a toast / status line.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::ContentPolicy => {
                "The prompt was blocked by the provider's safety filters. Please rephrase it and try again."
                    .into()
            }
            ErrorKind::Validation => self.to_string(),
            ErrorKind::Remote | ErrorKind::Internal => {
                let msg = self.to_string();
                if msg.chars().count() > 200 {
                    format!("Error: {}...", msg.chars().take(200).collect::<String>())
                } else {
                    format!("Error: {msg}")
                }
            }
        }
    }
}

impl From<GenerationFailure> for FlowError {
    fn from(failure: GenerationFailure) -> Self {
        match failure {
            GenerationFailure::ContentBlocked { reason } => FlowError::ContentPolicy { reason },
            other => FlowError::Generation(other),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::GeminiApiError;

    #[test]
    fn blocked_content_is_its_own_class() {
        let err = FlowError::from(GenerationFailure::ContentBlocked {
            reason: "SAFETY".into(),
        });
        assert_eq!(err.kind(), ErrorKind::ContentPolicy);
        assert!(err.user_message().contains("safety filters"));

        let err = FlowError::from(GenerationFailure::Api(GeminiApiError::Unavailable {
            message: "try later".into(),
        }));
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(
            err.user_message(),
            "Error: generation failed: Service unavailable (503): try later"
        );
    }

    #[test]
    fn no_image_message() {
        let err = FlowError::NoImage {
            model_text: Some("I can only describe it".into()),
        };
        assert_eq!(
            err.to_string(),
            "Image generation failed. The model may not have returned an image. Model response: I can only describe it"
        );
        let err = FlowError::NoImage { model_text: None };
        assert_eq!(
            err.to_string(),
            "Image generation failed. The model may not have returned an image."
        );
    }

    #[test]
    fn login_required_is_validation() {
        let err = FlowError::LoginRequired(Feature::FeedbackSubmission);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Feedback submission requires login");
    }
}
