use std::pin::Pin;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ModelBox, tools::ToolDeclaration};

pub mod gemini;
pub mod safety;

#[cfg(test)]
pub(crate) mod scripted;

pub use gemini::{Gemini, GeminiApiError};
pub use safety::{HarmBlockThreshold, HarmCategory, SafetySetting};

pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response, GenerationFailure>> + Send + 'a>>;

/// A remote generative model. One call to `generate` is one remote round trip.
pub trait GenerativeModel {
    fn generate(&self, req: Request) -> GenerationFuture<'_>;
    fn clone(&self) -> ModelBox;
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: String,
    pub system: Option<String>,
    pub contents: Vec<Content>,
    pub tools: Vec<ToolDeclaration>,
    pub safety_settings: Vec<SafetySetting>,
    pub modalities: Vec<Modality>,
    /// When set, the model is asked for JSON matching this schema.
    pub json_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub author: Author,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(Image),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

#[derive(Clone, PartialEq)]
pub struct Image {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Image {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.data))
    }

    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        let data = BASE64.decode(payload).ok()?;
        Some(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// File extension matching the mime type, `bin` when unknown.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpeg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Response {
    pub parts: Vec<Part>,
    pub finish_reason: Option<String>,
}

impl Response {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
            finish_reason: Some("STOP".into()),
        }
    }

    /// All text parts joined, `None` if there is no non-blank text.
    pub fn text(&self) -> Option<String> {
        let text = self
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn image(&self) -> Option<&Image> {
        self.parts.iter().find_map(|p| match p {
            Part::Image(img) => Some(img),
            _ => None,
        })
    }

    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    Api(#[from] GeminiApiError),

    #[error("request to the model provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("content blocked by safety filters ({reason})")]
    ContentBlocked { reason: String },

    #[error("the model returned no usable payload")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_uri_round_trip() {
        let img = Image {
            mime_type: "image/png".into(),
            data: vec![137, 80, 78, 71],
        };
        let uri = img.to_data_uri();
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
        assert_eq!(Image::from_data_uri(&uri), Some(img));
        assert_eq!(Image::from_data_uri("https://example.com/a.png"), None);
    }

    #[test]
    fn response_text_skips_non_text_parts() {
        let resp = Response {
            parts: vec![
                Part::Text("Here ".into()),
                Part::FunctionCall(FunctionCall {
                    name: "x".into(),
                    args: serde_json::Value::Null,
                }),
                Part::Text("you go".into()),
            ],
            finish_reason: None,
        };
        assert_eq!(resp.text().as_deref(), Some("Here you go"));
        assert_eq!(resp.function_calls().len(), 1);
        assert!(resp.image().is_none());

        let blank = Response {
            parts: vec![Part::Text("  \n".into())],
            finish_reason: None,
        };
        assert_eq!(blank.text(), None);
    }
}
