//! State behind one user's page: who they are, the slider values and the
//! last thing they generated.

use log::info;

use crate::{
    flows::{
        AdjustParametersInput, FeedbackAnalysis, FeedbackExamples, FeedbackInput, FlowError, Flows,
        GenerateImageInput, GeneratedImage, RefinePromptInput, RefinedPrompt,
    },
    params::ParameterSet,
    role::{Feature, UserRole},
};

/// One finished prompt-to-image run.
#[derive(Debug, Clone)]
pub struct Generation {
    pub original_prompt: String,
    /// `None` when refinement was skipped.
    pub refined: Option<RefinedPrompt>,
    pub image: GeneratedImage,
    pub params: ParameterSet,
}

impl Generation {
    /// The prompt the image was generated from.
    pub fn final_prompt(&self) -> &str {
        self.refined
            .as_ref()
            .map(|r| r.refined_prompt.as_str())
            .unwrap_or(&self.original_prompt)
    }
}

pub struct Session {
    flows: Flows,
    role: UserRole,
    params: ParameterSet,
    last: Option<Generation>,
}

impl Session {
    pub fn new(flows: Flows, role: UserRole) -> Self {
        Self {
            flows,
            role,
            params: ParameterSet::default(),
            last: None,
        }
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn params(&self) -> ParameterSet {
        self.params
    }

    pub fn last(&self) -> Option<&Generation> {
        self.last.as_ref()
    }

    pub fn flows(&self) -> &Flows {
        &self.flows
    }

    pub fn set_parameters(&mut self, params: ParameterSet) -> Result<(), FlowError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    fn require(&self, feature: Feature) -> Result<(), FlowError> {
        if self.role.can_use(feature) {
            Ok(())
        } else {
            Err(FlowError::LoginRequired(feature))
        }
    }

    pub async fn create_image(&mut self, prompt: &str, refine: bool) -> Result<&Generation, FlowError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(FlowError::Validation {
                field: "prompt",
                reason: "must not be empty".into(),
            });
        }
        self.require(Feature::ImageGeneration)?;
        if refine {
            self.require(Feature::PromptRefinement)?;
        }
        let tier = self.role.tier();

        let refined = if refine {
            Some(
                self.flows
                    .refine_prompt(RefinePromptInput {
                        user_prompt: prompt.to_string(),
                        tier,
                    })
                    .await?,
            )
        } else {
            None
        };

        let final_prompt = refined
            .as_ref()
            .map_or(prompt, |r| r.refined_prompt.as_str())
            .to_string();
        let image = self
            .flows
            .generate_image(GenerateImageInput {
                prompt: final_prompt,
                tier,
            })
            .await?;

        info!("{} generated an image with {}", self.role, image.model_used);
        Ok(&*self.last.insert(Generation {
            original_prompt: prompt.to_string(),
            refined,
            image,
            params: self.params,
        }))
    }

    pub async fn adjust_parameters(&mut self, prompt: &str, feedback: &str) -> Result<ParameterSet, FlowError> {
        self.require(Feature::ParameterAdjustment)?;

        let adjusted = self
            .flows
            .adjust_image_parameters(AdjustParametersInput {
                prompt: prompt.to_string(),
                feedback: feedback.to_string(),
                initial: self.params,
                tier: self.role.tier(),
            })
            .await?;

        info!("parameters adjusted from {:?} to {adjusted:?}", self.params);
        self.params = adjusted;
        Ok(adjusted)
    }

    /// `rating` is 1 to 5 stars.
    pub async fn submit_feedback(
        &mut self,
        rating: Option<u8>,
        comments: &str,
    ) -> Result<FeedbackAnalysis, FlowError> {
        self.require(Feature::FeedbackSubmission)?;

        let comments = comments.trim();
        if rating.is_none() && comments.is_empty() {
            return Err(FlowError::Validation {
                field: "feedback",
                reason: "needs a rating or comments".into(),
            });
        }
        if let Some(stars) = rating.filter(|r| !(1..=5).contains(r)) {
            return Err(FlowError::Validation {
                field: "rating",
                reason: format!("must be between 1 and 5, got {stars}"),
            });
        }

        let examples = match &self.last {
            Some(last) => FeedbackExamples {
                original_prompt: Some(last.original_prompt.clone()),
                refined_prompt: last.refined.as_ref().map(|r| r.refined_prompt.clone()),
                image_parameters: Some(last.params),
            },
            None => FeedbackExamples {
                image_parameters: Some(self.params),
                ..Default::default()
            },
        };

        Ok(self
            .flows
            .analyze_feedback(FeedbackInput {
                feedback: feedback_text(rating, comments),
                examples,
                tier: self.role.tier(),
            })
            .await)
    }
}

fn feedback_text(rating: Option<u8>, comments: &str) -> String {
    let rating = match rating {
        Some(stars) => format!("{stars}/5"),
        None => "N/A".to_string(),
    };
    let comments = if comments.is_empty() { "N/A" } else { comments };
    format!("Rating: {rating}. Comments: {comments}")
}
