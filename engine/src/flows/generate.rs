use log::{info, warn};

use super::{FlowError, Flows, require_text};
use crate::{
    model::{Content, Image, Modality},
    role::Tier,
    router::{self, Task},
    templates::WATERMARK_CLAUSE,
};

#[derive(Debug, Clone)]
pub struct GenerateImageInput {
    pub prompt: String,
    pub tier: Tier,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub image: Image,
    pub model_used: String,
    /// Whatever text the model sent along with the image.
    pub model_text: Option<String>,
}

impl GeneratedImage {
    pub fn data_uri(&self) -> String {
        self.image.to_data_uri()
    }
}

impl Flows {
    pub async fn generate_image(&self, input: GenerateImageInput) -> Result<GeneratedImage, FlowError> {
        let prompt = require_text("prompt", &input.prompt)?;
        let route = router::route(&self.catalog, Task::Generate, input.tier);

        let prompt = match input.tier {
            Tier::Free => format!("{prompt}{WATERMARK_CLAUSE}"),
            Tier::Pro | Tier::Admin => prompt.to_string(),
        };
        info!("generating image on {} for tier {}", route.model, input.tier);

        let mut req = self.request(route.model);
        req.contents = vec![Content::user_text(prompt)];
        req.modalities = vec![Modality::Text, Modality::Image];

        let resp = self.model.generate(req).await?;
        let model_text = resp.text();

        match resp.image() {
            Some(image) => Ok(GeneratedImage {
                image: image.clone(),
                model_used: route.model.to_string(),
                model_text,
            }),
            None => {
                warn!("{} answered without an image", route.model);
                Err(FlowError::NoImage { model_text })
            }
        }
    }
}
