use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::{debug, warn};
use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};

mod error;
pub use error::GeminiApiError;

use crate::{
    model::{
        Author, Content, FunctionCall, FunctionResponse, GenerationFailure, Image, Modality, Part,
        Response, SafetySetting, safety::is_policy_finish_reason,
    },
    tools::ToolDeclaration,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug)]
pub struct Request {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub data: RequestBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,

    pub contents: Vec<WireContent>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Author>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,

    /// set on reasoning summaries, which are not part of the answer
    #[serde(default, skip_serializing)]
    pub thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTool {
    pub function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<Modality>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..Default::default()
            },
            Part::Image(img) => WirePart {
                inline_data: Some(Blob {
                    mime_type: img.mime_type.clone(),
                    data: BASE64.encode(&img.data),
                }),
                ..Default::default()
            },
            Part::FunctionCall(call) => WirePart {
                function_call: Some(call.clone()),
                ..Default::default()
            },
            Part::FunctionResponse(resp) => WirePart {
                function_response: Some(resp.clone()),
                ..Default::default()
            },
        }
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        WireContent {
            role: Some(content.author),
            parts: content.parts.iter().map(WirePart::from).collect(),
        }
    }
}

impl From<&crate::model::Request> for RequestBody {
    fn from(req: &crate::model::Request) -> Self {
        let generation_config = if req.modalities.is_empty() && req.json_schema.is_none() {
            None
        } else {
            Some(GenerationConfig {
                response_modalities: req.modalities.clone(),
                response_mime_type: req.json_schema.as_ref().map(|_| "application/json".into()),
                response_schema: req.json_schema.clone(),
            })
        };

        RequestBody {
            system_instruction: req.system.as_ref().map(|s| WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(s.clone()),
                    ..Default::default()
                }],
            }),
            contents: req.contents.iter().map(WireContent::from).collect(),
            tools: if req.tools.is_empty() {
                vec![]
            } else {
                vec![WireTool {
                    function_declarations: req.tools.clone(),
                }]
            },
            safety_settings: req.safety_settings.clone(),
            generation_config,
        }
    }
}

impl WirePart {
    fn into_part(self) -> Result<Option<Part>, GenerationFailure> {
        if self.thought == Some(true) {
            return Ok(None);
        }

        if let Some(blob) = self.inline_data {
            let data = BASE64
                .decode(blob.data.as_bytes())
                .map_err(|e| GenerationFailure::Malformed(format!("inline image data: {e}")))?;
            return Ok(Some(Part::Image(Image {
                mime_type: blob.mime_type,
                data,
            })));
        }

        if let Some(call) = self.function_call {
            return Ok(Some(Part::FunctionCall(call)));
        }

        if let Some(resp) = self.function_response {
            return Ok(Some(Part::FunctionResponse(resp)));
        }

        Ok(self.text.map(Part::Text))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<WireContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<usize>,
    #[serde(default)]
    pub candidates_token_count: Option<usize>,
}

impl ResponseBody {
    /// Takes the first candidate. Policy refusals become `ContentBlocked`.
    pub fn into_response(self) -> Result<Response, GenerationFailure> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationFailure::ContentBlocked { reason });
        }

        if self.candidates.len() > 1 {
            warn!(
                "{} candidates returned, using the first",
                self.candidates.len()
            );
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GenerationFailure::EmptyResponse);
        };

        let mut parts = vec![];
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(part) = part.into_part()? {
                parts.push(part);
            }
        }

        if parts.is_empty() {
            return Err(match candidate.finish_reason {
                Some(reason) if is_policy_finish_reason(&reason) => {
                    GenerationFailure::ContentBlocked { reason }
                }
                _ => GenerationFailure::EmptyResponse,
            });
        }

        Ok(Response {
            parts,
            finish_reason: candidate.finish_reason,
        })
    }
}

pub fn endpoint(base_url: &str, model: &str) -> String {
    let model = model.trim();
    let model = model.strip_prefix("googleai/").unwrap_or(model);
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!(
        "{}/models/{model}:generateContent",
        base_url.trim_end_matches('/')
    )
}

pub async fn send_request(
    req: Request,
    client: &reqwest::Client,
) -> Result<ResponseBody, GenerationFailure> {
    let url = endpoint(&req.base_url, &req.model);
    let request = client
        .post(&url)
        .json(&req.data)
        .header("x-goog-api-key", &req.api_key)
        .header(header::ACCEPT, HeaderValue::from_static("application/json"));

    debug!("request: {url}");
    debug!(
        "Json-data: {}",
        serde_json::to_string(&req.data).unwrap_or_default()
    );

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(GeminiApiError::from_body(status.as_u16(), &body).into());
    }

    serde_json::from_str(&body).map_err(|e| GenerationFailure::Malformed(format!("{e}: {body}")))
}

#[cfg(test)]
mod test {
    use expect_test::expect;
    use serde_json::json;

    use crate::model::{HarmBlockThreshold, HarmCategory};

    use super::*;

    #[test]
    fn request_serialization() {
        let req = crate::model::Request {
            model: "gemini-2.0-flash".into(),
            system: None,
            contents: vec![Content::user_text("a cat")],
            tools: vec![],
            safety_settings: vec![SafetySetting::new(
                HarmCategory::Harassment,
                HarmBlockThreshold::BlockMediumAndAbove,
            )],
            modalities: vec![Modality::Text, Modality::Image],
            json_schema: None,
        };

        let expect = expect![[
            r#"{"contents":[{"role":"user","parts":[{"text":"a cat"}]}],"safetySettings":[{"category":"HARM_CATEGORY_HARASSMENT","threshold":"BLOCK_MEDIUM_AND_ABOVE"}],"generationConfig":{"responseModalities":["TEXT","IMAGE"]}}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&RequestBody::from(&req)).unwrap());
    }

    #[test]
    fn tools_and_function_turns_serialization() {
        let req = crate::model::Request {
            model: "m".into(),
            system: Some("be brief".into()),
            contents: vec![
                Content::user_text("hi"),
                Content {
                    author: Author::Model,
                    parts: vec![Part::FunctionCall(FunctionCall {
                        name: "lookup".into(),
                        args: json!({"query": "beach"}),
                    })],
                },
                Content {
                    author: Author::User,
                    parts: vec![Part::FunctionResponse(FunctionResponse {
                        name: "lookup".into(),
                        response: json!({"summary": "sand"}),
                    })],
                },
            ],
            tools: vec![ToolDeclaration {
                name: "lookup".into(),
                description: "d".into(),
                parameters: json!({"type": "OBJECT"}),
            }],
            safety_settings: vec![],
            modalities: vec![],
            json_schema: Some(json!({"type": "OBJECT"})),
        };

        let expect = expect![[
            r#"{"systemInstruction":{"parts":[{"text":"be brief"}]},"contents":[{"role":"user","parts":[{"text":"hi"}]},{"role":"model","parts":[{"functionCall":{"name":"lookup","args":{"query":"beach"}}}]},{"role":"user","parts":[{"functionResponse":{"name":"lookup","response":{"summary":"sand"}}}]}],"tools":[{"functionDeclarations":[{"name":"lookup","description":"d","parameters":{"type":"OBJECT"}}]}],"generationConfig":{"responseMimeType":"application/json","responseSchema":{"type":"OBJECT"}}}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&RequestBody::from(&req)).unwrap());
    }

    #[test]
    fn response_with_text_and_image() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Here is your image"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw=="}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 1290}
        }"#;

        let body = serde_json::from_str::<ResponseBody>(body).unwrap();
        let usage = body.usage_metadata.as_ref().unwrap();
        assert_eq!(usage.prompt_token_count, Some(12));
        assert_eq!(usage.candidates_token_count, Some(1290));

        let resp = body.into_response().unwrap();
        assert_eq!(resp.text().as_deref(), Some("Here is your image"));
        let img = resp.image().unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.data, vec![137, 80, 78, 71]);
    }

    #[test]
    fn thought_parts_are_dropped() {
        let body = r#"{"candidates": [{"content": {"parts": [
            {"text": "thinking...", "thought": true},
            {"text": "answer"}
        ]}}]}"#;
        let resp = serde_json::from_str::<ResponseBody>(body)
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(resp.text().as_deref(), Some("answer"));
    }

    #[test]
    fn blocked_prompt_is_a_policy_failure() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = serde_json::from_str::<ResponseBody>(body)
            .unwrap()
            .into_response()
            .unwrap_err();
        assert!(matches!(err, GenerationFailure::ContentBlocked { reason } if reason == "SAFETY"));
    }

    #[test]
    fn empty_candidate_with_safety_finish_is_blocked() {
        let body = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let err = serde_json::from_str::<ResponseBody>(body)
            .unwrap()
            .into_response()
            .unwrap_err();
        assert!(matches!(err, GenerationFailure::ContentBlocked { .. }));

        let body = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let err = serde_json::from_str::<ResponseBody>(body)
            .unwrap()
            .into_response()
            .unwrap_err();
        assert!(matches!(err, GenerationFailure::EmptyResponse));
    }

    #[test]
    fn endpoint_strips_provider_prefixes() {
        assert_eq!(
            endpoint(DEFAULT_BASE_URL, "googleai/gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            endpoint("http://localhost:8080/", "models/gemini-1.5-pro-latest"),
            "http://localhost:8080/models/gemini-1.5-pro-latest:generateContent"
        );
    }
}
