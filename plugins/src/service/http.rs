use std::{error::Error as StdError, fmt};

use crew_core::api::ServiceError;
use serde::{Deserialize, Serialize};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatHttpErrorKind {
    Timeout,
    Connect,
    Body,
    /// The request could not be built or sent (bad URL, redirect loop).
    Request,
    Decode,
    Status,
}

impl ChatHttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Body => "body",
            Self::Request => "request",
            Self::Decode => "decode",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ChatHttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ChatHttpError {
    kind: ChatHttpErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl ChatHttpError {
    pub fn kind(&self) -> ChatHttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    fn from_reqwest(err: reqwest::Error, url: String) -> Self {
        let kind = if err.is_timeout() {
            ChatHttpErrorKind::Timeout
        } else if err.is_connect() {
            ChatHttpErrorKind::Connect
        } else if err.is_body() {
            ChatHttpErrorKind::Body
        } else if err.is_decode() {
            ChatHttpErrorKind::Decode
        } else {
            ChatHttpErrorKind::Request
        };
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();
        ChatHttpError {
            kind,
            status,
            url: Some(url),
            message,
            source: Some(anyhow::Error::new(err)),
        }
    }

    fn status_error(status: u16, url: String, preview: String) -> Self {
        ChatHttpError {
            kind: ChatHttpErrorKind::Status,
            status: Some(status),
            url: Some(url),
            message: preview,
            source: None,
        }
    }

    fn decode_error(status: u16, url: String, message: String, source: Option<anyhow::Error>) -> Self {
        ChatHttpError {
            kind: ChatHttpErrorKind::Decode,
            status: Some(status),
            url: Some(url),
            message,
            source,
        }
    }

    /// Network trouble, timeouts, 5xx and plain rate limiting are worth
    /// retrying. Auth failures, exhausted quota and requests that could
    /// not be sent at all are not.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            ChatHttpErrorKind::Timeout | ChatHttpErrorKind::Connect | ChatHttpErrorKind::Body => {
                true
            }
            ChatHttpErrorKind::Status => match self.status {
                Some(429) => !self.message.contains("insufficient_quota"),
                Some(408) => true,
                Some(code) => code >= 500,
                None => false,
            },
            ChatHttpErrorKind::Request | ChatHttpErrorKind::Decode => false,
        }
    }

    pub fn into_service_error(self) -> ServiceError {
        if self.is_transient() {
            ServiceError::transient(self.to_string())
        } else {
            ServiceError::fatal(self.to_string())
        }
    }
}

impl fmt::Display for ChatHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat http error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for ChatHttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out = String::new();
    let mut truncated = false;
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx >= BODY_PREVIEW_LIMIT {
            truncated = true;
            break;
        }
        out.push(ch);
    }

    if truncated {
        out.push_str("...");
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Minimal OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct ChatClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
    url_completions: String,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()?;
        let normalized = base_url.trim_end_matches('/');
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            http,
            url_completions: format!("{}/chat/completions", normalized),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    /// Send one chat completion and return the first choice's content.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
        json_mode: bool,
    ) -> Result<String, ChatHttpError> {
        let url = &self.url_completions;
        let payload = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(
            target: "crew.service",
            stage = "chat.completions.in",
            url = %url,
            model = %self.model,
            messages = messages.len(),
            json_mode
        );

        let req = self.http.post(url).json(&payload);
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| ChatHttpError::from_reqwest(err, url.clone()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| ChatHttpError::from_reqwest(err, url.clone()))?;

        if !status.is_success() {
            return Err(ChatHttpError::status_error(
                status.as_u16(),
                url.clone(),
                preview_body(&body),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|err| {
            ChatHttpError::decode_error(
                status.as_u16(),
                url.clone(),
                format!(
                    "failed to decode response body: {} | body={}",
                    err,
                    preview_body(&body)
                ),
                Some(anyhow::Error::new(err)),
            )
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                ChatHttpError::decode_error(
                    status.as_u16(),
                    url.clone(),
                    format!("response carried no message content | body={}", preview_body(&body)),
                    None,
                )
            })?;

        tracing::debug!(
            target: "crew.service",
            stage = "chat.completions.out",
            status = %status,
            content_len = content.len()
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn completion(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[test]
    fn test_preview_body_empty() {
        assert_eq!(preview_body("   "), "<empty body>");
    }

    #[test]
    fn test_preview_body_truncates() {
        let body = "a".repeat(BODY_PREVIEW_LIMIT + 10);
        let preview = preview_body(&body);
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= BODY_PREVIEW_LIMIT + 3);
    }

    #[test]
    fn test_status_classification() {
        let url = "https://api.example.com/v1/chat/completions".to_string();
        let cases = [
            (500, "oops", true),
            (503, "unavailable", true),
            (429, r#"{"error":{"code":"rate_limit_exceeded"}}"#, true),
            (429, r#"{"error":{"code":"insufficient_quota"}}"#, false),
            (401, "invalid api key", false),
            (400, "bad request", false),
        ];
        for (status, body, transient) in cases {
            let err = ChatHttpError::status_error(status, url.clone(), body.to_string());
            assert_eq!(err.is_transient(), transient, "status {status}");
        }
    }

    #[test]
    fn test_error_display_status() {
        let err = ChatHttpError::status_error(
            502,
            "https://example.com/v1/chat/completions".to_string(),
            "bad gateway".to_string(),
        );
        let msg = err.to_string();
        assert!(msg.contains("kind=status"));
        assert!(msg.contains("status=502"));
        assert!(msg.contains("bad gateway"));
        assert!(matches!(err.into_service_error(), ServiceError::Transient(_)));
    }

    #[tokio::test]
    async fn test_complete_returns_content() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion("hello"))
            .create_async()
            .await;

        let client = ChatClient::new(&server.url(), "sk-test", "gpt-4o", 1_000).unwrap();
        let out = client
            .complete(&[ChatMessage::user("hi")], None, true)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_auth_header_absent_when_api_key_empty() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(completion("ok"))
            .create_async()
            .await;

        let client = ChatClient::new(&server.url(), "", "gpt-4o", 1_000).unwrap();
        client
            .complete(&[ChatMessage::user("hi")], Some(0.2), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_choices_is_decode_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&server.url(), "", "gpt-4o", 1_000).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], None, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ChatHttpErrorKind::Decode);
        assert_eq!(err.status(), Some(200));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream overloaded")
            .create_async()
            .await;

        let client = ChatClient::new(&server.url(), "", "gpt-4o", 1_000).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], None, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ChatHttpErrorKind::Status);
        assert!(err.to_string().contains("/chat/completions"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unsendable_request_is_fatal() {
        let client = ChatClient::new("not-a-url", "", "gpt-4o", 1_000).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], None, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ChatHttpErrorKind::Request);
        assert!(!err.is_transient());
        assert!(matches!(err.into_service_error(), ServiceError::Fatal(_)));
    }
}
