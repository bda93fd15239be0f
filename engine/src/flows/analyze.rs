use log::{error, info};
use serde::{Deserialize, Serialize};

use super::{FlowError, Flows, require_text, strip_code_fence};
use crate::{
    model::Content,
    params::ParameterSet,
    role::Tier,
    router::{self, Task},
    templates::{AnalyzeContext, TemplateId},
};

const DEFAULT_SUCCESS_MESSAGE: &str = "Successfully generated improvement suggestions.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementSuggestion {
    pub area_to_improve: String,
    #[serde(rename = "currentApproachOrProblem", alias = "currentProblem")]
    pub current_problem: String,
    pub suggested_change: String,
    pub reasoning: String,
    pub potential_impact: String,
}

/// Examples the user had in front of them when writing the feedback.
#[derive(Debug, Clone, Default)]
pub struct FeedbackExamples {
    pub original_prompt: Option<String>,
    pub refined_prompt: Option<String>,
    pub image_parameters: Option<ParameterSet>,
}

#[derive(Debug, Clone)]
pub struct FeedbackInput {
    pub feedback: String,
    pub examples: FeedbackExamples,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnalysis {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<String>,
    #[serde(default)]
    pub improvement_suggestions: Vec<ImprovementSuggestion>,
}

impl FeedbackAnalysis {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            overall_assessment: None,
            improvement_suggestions: Vec::new(),
        }
    }
}

/// What the model is asked to answer. Every field is optional; the model's
/// own `success` flag is ignored, any parsed answer counts as a success.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisOutput {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    overall_assessment: Option<String>,
    #[serde(default)]
    improvement_suggestions: Vec<ImprovementSuggestion>,
}

impl Flows {
    /// Never fails: any error ends up as a `success: false` analysis.
    pub async fn analyze_feedback(&self, input: FeedbackInput) -> FeedbackAnalysis {
        match self.try_analyze_feedback(input).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("feedback analysis failed: {e}");
                FeedbackAnalysis::failure(format!("Failed to generate suggestions: {e}"))
            }
        }
    }

    async fn try_analyze_feedback(&self, input: FeedbackInput) -> Result<FeedbackAnalysis, FlowError> {
        let feedback = require_text("feedback", &input.feedback)?;
        let route = router::route(&self.catalog, Task::AnalyzeFeedback, input.tier);
        info!("analyzing feedback on {}", route.model);

        let examples = &input.examples;
        let image_parameters = examples
            .image_parameters
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| FlowError::MalformedOutput(e.to_string()))?;

        let instructions = self.templates.render(
            TemplateId::AnalyzeFeedback,
            &AnalyzeContext {
                feedback,
                original_prompt: non_blank(&examples.original_prompt),
                refined_prompt: non_blank(&examples.refined_prompt),
                image_parameters,
            },
        )?;

        let mut req = self.request(route.model);
        req.contents = vec![Content::user_text(instructions)];
        req.json_schema = Some(analysis_schema());

        let resp = self.model.generate(req).await?;
        let text = resp
            .text()
            .ok_or_else(|| FlowError::MalformedOutput("no analysis in the answer".into()))?;
        let out: AnalysisOutput = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| FlowError::MalformedOutput(format!("feedback analysis: {e}")))?;

        Ok(FeedbackAnalysis {
            success: true,
            message: out
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
            overall_assessment: out.overall_assessment,
            improvement_suggestions: out.improvement_suggestions,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn analysis_schema() -> serde_json::Value {
    let text = serde_json::json!({ "type": "STRING" });
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "success": { "type": "BOOLEAN" },
            "message": text,
            "overallAssessment": text,
            "improvementSuggestions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "areaToImprove": text,
                        "currentApproachOrProblem": text,
                        "suggestedChange": text,
                        "reasoning": text,
                        "potentialImpact": text,
                    },
                    "required": [
                        "areaToImprove",
                        "currentApproachOrProblem",
                        "suggestedChange",
                        "reasoning",
                        "potentialImpact",
                    ],
                },
            },
        },
    })
}
