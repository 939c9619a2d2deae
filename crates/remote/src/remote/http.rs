//! HTTP remote for the note API.
//!
//! - `GET  {base}/note?id={id}` answers the content as JSON, or `404` when
//!   there is no cloud copy yet.
//! - `POST {base}/note` with `{"id": .., "data": ..}` answers a plain-text
//!   status string.

use crate::error::{ErrorKind, Result};
use crate::models::{Content, DocumentId};
use crate::remote::DocumentRemote;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

#[derive(Serialize)]
struct SaveRequest<'a> {
    id: &'a DocumentId,
    data: &'a Content,
}

/// Note API client over HTTP.
///
/// # Examples
///
/// ```no_run
/// use scribe_remote::HttpRemote;
/// use std::time::Duration;
///
/// # fn example() -> scribe_remote::error::Result<()> {
/// let remote = HttpRemote::new("cloud", "https://notes.example.com/api", Duration::from_secs(10))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HttpRemote {
    name: String,
    base: Url,
    client: Client,
}
impl HttpRemote {
    /// Create a client rooted at `base_url`.
    ///
    /// Every request is bounded by `timeout`; a request that exceeds it is
    /// reported as [`ErrorKind::Transport`].
    pub fn new(name: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).or_raise(|| ErrorKind::InvalidUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            exn::bail!(ErrorKind::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::BackendError("could not build HTTP client".to_string()))?;
        Ok(Self { name: name.into(), base, client })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Append a path segment to the base URL.
    ///
    /// `Url::join` would *replace* the last segment of a base without a
    /// trailing slash (`/api` + `note` = `/note`), hence the manual push.
    pub(crate) fn endpoint(&self, segment: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }
}

#[async_trait]
impl DocumentRemote for HttpRemote {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "debug", skip(self), fields(remote = %self.name))]
    async fn fetch(&self, id: &DocumentId) -> Result<Option<Content>> {
        let url = self.endpoint("note")?;
        let response =
            self.client.get(url).query(&[("id", id.as_str())]).send().await.or_raise(|| ErrorKind::Transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => exn::bail!(ErrorKind::Status(status.as_u16())),
            _ => Ok(Some(response.json::<Content>().await.or_raise(|| ErrorKind::InvalidResponse)?)),
        }
    }

    #[instrument(level = "debug", skip(self, content), fields(remote = %self.name))]
    async fn save(&self, id: &DocumentId, content: &Content) -> Result<String> {
        let url = self.endpoint("note")?;
        let response = self
            .client
            .post(url)
            .json(&SaveRequest { id, data: content })
            .send()
            .await
            .or_raise(|| ErrorKind::Transport)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        response.text().await.or_raise(|| ErrorKind::InvalidResponse)
    }
}
