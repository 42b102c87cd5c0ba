use super::{ChatRequest, ChatResponse, LlmError};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POST a JSON body, attaching bearer auth when a key is configured.
    pub(crate) fn post_json<T: Serialize>(&self, client: &Client, path: &str, body: &T) -> RequestBuilder {
        let mut req = client
            .post(self.endpoint(path))
            .header("Content-Type", "application/json")
            .json(body);

        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }
        req
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

fn build_request(request: &ChatRequest) -> OpenAiRequest<'_> {
    OpenAiRequest {
        model: &request.model,
        messages: request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: false,
    }
}

/// Turn a non-2xx response into `LlmError::Api`, keeping the body for diagnostics.
pub(crate) async fn ensure_success(resp: Response) -> Result<Response, LlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status,
        message: text,
    })
}

fn first_choice_content(data: OpenAiResponse) -> Result<String, LlmError> {
    data.choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| LlmError::Parse("completion response contained no choices".into()))
}

pub async fn chat(config: &OpenAiConfig, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
    let client = Client::new();
    let body = build_request(request);

    let resp = config
        .post_json(&client, "chat/completions", &body)
        .send()
        .await?;
    let resp = ensure_success(resp).await?;

    let data: OpenAiResponse = resp.json().await?;
    let content = first_choice_content(data)?;

    Ok(ChatResponse {
        content,
        model: request.model.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::PromptMessage;
    use serde_json::json;

    #[test]
    fn request_body_carries_sampling_parameters() {
        let request = ChatRequest {
            messages: vec![PromptMessage::system("be brief"), PromptMessage::user("hi")],
            model: "gpt-4o-mini".into(),
            temperature: 0.25,
            max_tokens: 256,
        };
        let value = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.25,
                "max_tokens": 256,
                "stream": false
            })
        );
    }

    #[test]
    fn takes_first_choice_and_tolerates_null_content() {
        let data: OpenAiResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]
        }))
        .unwrap();
        assert_eq!(first_choice_content(data).unwrap(), "first");

        let data: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert_eq!(first_choice_content(data).unwrap(), "");
    }

    #[test]
    fn empty_choices_is_a_parse_error() {
        let data: OpenAiResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(first_choice_content(data), Err(LlmError::Parse(_))));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = OpenAiConfig {
            api_key: String::new(),
            base_url: "http://localhost:11434/v1/".into(),
        };
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }
}
