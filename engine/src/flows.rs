//! The four request/response operations the presentation layer calls.
//!
//! Every flow checks its input before anything goes over the wire, picks a
//! model through the router, renders its template, makes the call(s) and
//! checks the shape of what came back. Nothing is retried.

use crate::{
    ModelBox,
    model::{
        Request, SafetySetting,
        safety::default_safety_settings,
    },
    router::ModelCatalog,
    templates::TemplateStore,
    tools::{ReferenceLookup, ToolBox},
};

mod adjust;
mod analyze;
mod error;
mod generate;
mod refine;

pub use adjust::AdjustParametersInput;
pub use analyze::{FeedbackAnalysis, FeedbackExamples, FeedbackInput, ImprovementSuggestion};
pub use error::{ErrorKind, FlowError};
pub use generate::{GenerateImageInput, GeneratedImage};
pub use refine::{RefinePromptInput, RefinedPrompt};

pub struct Flows {
    model: ModelBox,
    catalog: ModelCatalog,
    templates: TemplateStore,
    tools: ToolBox,
    safety_settings: Vec<SafetySetting>,
}

impl Flows {
    pub fn new(model: ModelBox, catalog: ModelCatalog) -> Result<Self, FlowError> {
        Ok(Self {
            model,
            catalog,
            templates: TemplateStore::new()?,
            tools: ToolBox::default().with(ReferenceLookup),
            safety_settings: default_safety_settings(),
        })
    }

    pub fn with_safety_settings(mut self, safety_settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = safety_settings;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// A request for `model` carrying the configured safety settings.
    fn request(&self, model: &str) -> Request {
        Request {
            model: model.to_string(),
            safety_settings: self.safety_settings.clone(),
            ..Default::default()
        }
    }
}

/// Trimmed, non-empty text or a validation error naming the field.
fn require_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FlowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FlowError::Validation {
            field,
            reason: "must not be empty".into(),
        })
    } else {
        Ok(trimmed)
    }
}

/// Models like to wrap answers in markdown fences even when told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // drop the language tag, if any
    match inner.split_once('\n') {
        Some((tag, rest)) if !tag.trim().contains(' ') => rest.trim(),
        _ => inner.trim(),
    }
}
