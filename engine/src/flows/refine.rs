use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{FlowError, Flows, require_text, strip_code_fence};
use crate::{
    MAX_TOOL_ROUNDS,
    model::{Author, Content, Part},
    role::Tier,
    router::{self, Task, TemplateVariant},
    templates::{RefineContext, TemplateId},
    tools::reference_lookup::TOOL_NAME,
};

#[derive(Debug, Clone)]
pub struct RefinePromptInput {
    pub user_prompt: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedPrompt {
    pub refined_prompt: String,
    pub model_used: String,
    pub variant: TemplateVariant,
}

impl RefinedPrompt {
    /// e.g. "Standard Model (gemini-2.0-flash)"
    pub fn model_label(&self) -> String {
        format!("{} Model ({})", self.variant, self.model_used)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefineOutput {
    refined_prompt: String,
}

impl Flows {
    pub async fn refine_prompt(&self, input: RefinePromptInput) -> Result<RefinedPrompt, FlowError> {
        let user_prompt = require_text("userPrompt", &input.user_prompt)?;
        let route = router::route(&self.catalog, Task::Refine, input.tier);
        let variant = route.variant.unwrap_or(TemplateVariant::Standard);
        info!("refining prompt with {variant} template on {}", route.model);

        let instructions = self.templates.render(
            TemplateId::refine(variant),
            &RefineContext {
                user_prompt,
                lookup_tool: TOOL_NAME,
            },
        )?;

        let mut contents = vec![Content::user_text(instructions)];

        for round in 0..=MAX_TOOL_ROUNDS {
            let mut req = self.request(route.model);
            req.contents = contents.clone();
            // the last round has to produce an answer
            if round < MAX_TOOL_ROUNDS {
                req.tools = self.tools.declarations();
            }

            let resp = self.model.generate(req).await?;
            let calls = resp.function_calls();

            if calls.is_empty() {
                let text = resp.text().ok_or_else(|| {
                    FlowError::MalformedOutput("prompt refinement produced no text".into())
                })?;
                return Ok(RefinedPrompt {
                    refined_prompt: normalize_refined(&text)?,
                    model_used: route.model.to_string(),
                    variant,
                });
            }

            debug!("refinement round {round}: {} tool call(s)", calls.len());
            let answers = calls
                .iter()
                .map(|call| Part::FunctionResponse(self.tools.respond(call)))
                .collect();

            contents.push(Content {
                author: Author::Model,
                parts: resp.parts.clone(),
            });
            contents.push(Content {
                author: Author::User,
                parts: answers,
            });
        }

        Err(FlowError::ToolLoop(MAX_TOOL_ROUNDS))
    }
}

/// Accepts the bare prompt, a fenced one, one behind a "Refined Prompt:"
/// label, or `{"refinedPrompt": ...}`.
fn normalize_refined(text: &str) -> Result<String, FlowError> {
    let text = strip_code_fence(text);

    let text = match serde_json::from_str::<RefineOutput>(text) {
        Ok(out) => out.refined_prompt,
        Err(_) => text.to_string(),
    };

    let mut text = text.trim();
    for label in ["Refined Prompt:", "Refined prompt:", "**Refined Prompt:**"] {
        if let Some(rest) = text.strip_prefix(label) {
            text = rest.trim();
        }
    }

    if text.is_empty() {
        Err(FlowError::MalformedOutput("refined prompt is empty".into()))
    } else {
        Ok(text.to_string())
    }
}
