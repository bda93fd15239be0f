use log::debug;

use crate::{
    ModelBox,
    model::{GenerationFuture, GenerativeModel, Request},
};

mod gemini_api;
pub use gemini_api::{DEFAULT_BASE_URL, GeminiApiError};

#[derive(Clone)]
pub struct Gemini {
    pub api_key: String,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl GenerativeModel for Gemini {
    fn generate(&self, req: Request) -> GenerationFuture<'_> {
        let api_req = gemini_api::Request {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: req.model.clone(),
            data: gemini_api::RequestBody::from(&req),
        };

        Box::pin(async move {
            let body = gemini_api::send_request(api_req, &self.client).await?;
            if let Some(usage) = &body.usage_metadata {
                debug!(
                    "tokens: {} in, {} out",
                    usage.prompt_token_count.unwrap_or_default(),
                    usage.candidates_token_count.unwrap_or_default()
                );
            }
            body.into_response()
        })
    }

    fn clone(&self) -> ModelBox {
        Box::new(Clone::clone(self))
    }
}
