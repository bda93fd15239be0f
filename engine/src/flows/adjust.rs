use log::info;
use serde_json::json;

use super::{FlowError, Flows, require_text, strip_code_fence};
use crate::{
    model::Content,
    params::{ParameterSet, ProposedParameters},
    role::Tier,
    router::{self, Task},
    templates::{AdjustContext, TemplateId},
};

#[derive(Debug, Clone)]
pub struct AdjustParametersInput {
    pub prompt: String,
    pub feedback: String,
    pub initial: ParameterSet,
    pub tier: Tier,
}

fn parameter_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "cfgScale": { "type": "NUMBER" },
            "steps": { "type": "INTEGER" },
            "realismEnhancement": { "type": "NUMBER" },
        },
        "required": ["cfgScale", "steps", "realismEnhancement"],
    })
}

impl Flows {
    /// Asks a text model for a better parameter set. The result is always
    /// within the slider ranges, whatever the model proposed.
    pub async fn adjust_image_parameters(
        &self,
        input: AdjustParametersInput,
    ) -> Result<ParameterSet, FlowError> {
        let prompt = require_text("prompt", &input.prompt)?;
        let feedback = require_text("feedback", &input.feedback)?;
        input.initial.validate()?;

        let route = router::route(&self.catalog, Task::AdjustParameters, input.tier);
        info!("adjusting parameters on {}", route.model);

        let instructions = self.templates.render(
            TemplateId::AdjustParameters,
            &AdjustContext {
                prompt,
                feedback,
                initial: &input.initial,
            },
        )?;

        let mut req = self.request(route.model);
        req.contents = vec![Content::user_text(instructions)];
        req.json_schema = Some(parameter_schema());

        let resp = self.model.generate(req).await?;
        let text = resp
            .text()
            .ok_or_else(|| FlowError::MalformedOutput("no parameters in the answer".into()))?;

        let proposal: ProposedParameters = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| FlowError::MalformedOutput(format!("parameter proposal: {e}")))?;

        Ok(ParameterSet::from_proposal(&proposal, &input.initial))
    }
}
