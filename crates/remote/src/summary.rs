//! Summarisation endpoint client.
//!
//! A single request/response side action: nothing here touches document
//! sync or save state. Failures carry a human-readable message that callers
//! show in place of the summary.

use crate::error::{ErrorKind, Result};
use crate::remote::{DocumentRemote, HttpRemote};
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Message shown when asked to summarise nothing.
pub const NO_TEXT_PROVIDED: &str = "No text provided.";

#[derive(Serialize)]
struct SummaryRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    summary: Option<String>,
}

impl HttpRemote {
    /// Ask `POST {base}/summarise` for a short summary of `text`.
    ///
    /// Empty text is refused locally with [`NO_TEXT_PROVIDED`], mirroring the
    /// endpoint's own `400`. A non-success response is reported as
    /// [`ErrorKind::Summary`] carrying the endpoint's message.
    #[instrument(level = "debug", skip_all, fields(remote = %self.name(), chars = text.len()))]
    pub async fn summarise(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            exn::bail!(ErrorKind::Summary(NO_TEXT_PROVIDED.to_string()));
        }
        let url = self.endpoint("summarise")?;
        let response =
            self.client().post(url).json(&SummaryRequest { text }).send().await.or_raise(|| ErrorKind::Transport)?;
        let status = response.status();
        if !status.is_success() {
            // Error bodies from proxies in front of the endpoint are not JSON.
            let message = response.json::<SummaryResponse>().await.ok().and_then(|body| body.summary);
            match message {
                Some(message) => exn::bail!(ErrorKind::Summary(message)),
                None => exn::bail!(ErrorKind::Status(status.as_u16())),
            }
        }
        let body: SummaryResponse = response.json().await.or_raise(|| ErrorKind::InvalidResponse)?;
        body.summary.ok_or_raise(|| ErrorKind::InvalidResponse)
    }
}

/// Text to show for a summarisation attempt: the summary itself, or the
/// error message in its place.
pub fn summary_or_message(result: Result<String>) -> String {
    match result {
        Ok(summary) => summary,
        Err(err) => match &*err {
            ErrorKind::Summary(message) => message.clone(),
            other => format!("Error: {other}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn remote(server: &MockServer) -> HttpRemote {
        HttpRemote::new("test", &format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_summarise() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarise"))
            .and(body_json(json!({"text": "a long note"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": "short"})))
            .expect(1)
            .mount(&server)
            .await;
        let remote = remote(&server).await;
        assert_eq!(remote.name(), "test");
        assert_eq!(remote.summarise("a long note").await.unwrap(), "short");
    }

    #[tokio::test]
    async fn test_empty_text_is_refused_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
        let result = remote(&server).await.summarise("   ").await;
        assert_eq!(summary_or_message(result), NO_TEXT_PROVIDED);
    }

    #[tokio::test]
    async fn test_error_message_replaces_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarise"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"summary": "Error: quota exceeded"})))
            .mount(&server)
            .await;
        let result = remote(&server).await.summarise("text").await;
        assert_eq!(summary_or_message(result), "Error: quota exceeded");
    }

    #[tokio::test]
    async fn test_error_without_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarise"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({})))
            .mount(&server)
            .await;
        let err = remote(&server).await.summarise("text").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status(502)));
        assert_eq!(summary_or_message(Err(err)), "Error: unexpected status 502");
    }

    #[tokio::test]
    async fn test_error_page_that_is_not_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarise"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html><body>Bad Gateway</body></html>"))
            .mount(&server)
            .await;
        let err = remote(&server).await.summarise("text").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status(502)));
    }

    #[tokio::test]
    async fn test_success_without_summary_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarise"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        let err = remote(&server).await.summarise("text").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidResponse));
    }
}
