//! Record listing against the remote table API
//!
//! [`PageFetcher`] is the seam between the pagination logic and the transport:
//! [`HttpPageFetcher`] speaks the real protocol, tests substitute scripted
//! fetchers.

use crate::error::{Error, Result};
use crate::id::{API_KEY_PREFIX, is_valid_id, is_valid_prefixed_id};
use crate::types::{Page, Record};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// Fetches one page of records
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page of `base/table` that starts at `offset` (`None` = first page)
    async fn fetch_page(&self, base: &str, table: &str, offset: Option<&str>) -> Result<Page>;
}

/// [`PageFetcher`] over HTTPS with a bearer credential
pub struct HttpPageFetcher {
    client: reqwest::Client,
    api_root: Url,
    token: String,
}

impl std::fmt::Debug for HttpPageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("api_root", &self.api_root.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpPageFetcher {
    /// Create a fetcher sharing `client`
    pub fn new(client: reqwest::Client, api_root: Url, token: impl Into<String>) -> Self {
        Self {
            client,
            api_root,
            token: token.into(),
        }
    }

    /// Build `<api_root>/<base>/<table>[?offset=<offset>]`
    fn page_url(&self, base: &str, table: &str, offset: Option<&str>) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::config(
                    format!("API root {} cannot have path segments", self.api_root),
                    None,
                )
            })?
            .pop_if_empty()
            .push(base)
            .push(table);
        if let Some(offset) = offset {
            url.query_pairs_mut().append_pair("offset", offset);
        }
        Ok(url)
    }

    /// Shape checks that must pass before anything is sent
    fn check_request(&self, base: &str, table: &str) -> Result<()> {
        if !is_valid_prefixed_id(&self.token, API_KEY_PREFIX) {
            // The credential itself is never echoed back
            return Err(Error::config("invalid API key", Some("token")));
        }
        if !is_valid_id(base) {
            return Err(Error::InvalidId {
                kind: "base ID",
                value: base.to_string(),
            });
        }
        if !is_valid_id(table) {
            return Err(Error::InvalidId {
                kind: "table ID",
                value: table.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, base: &str, table: &str, offset: Option<&str>) -> Result<Page> {
        self.check_request(base, table)?;
        let url = self.page_url(base, table, offset)?;

        debug!(base, table, offset, "fetching page");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Http {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            context: format!("page of {base}/{table}"),
            source,
        })
    }
}

/// List every record of `base/table`
///
/// Follows continuation tokens until a page comes back without one. The first
/// error is returned as-is and records from earlier pages are dropped.
pub async fn list_all_records<F>(fetcher: &F, base: &str, table: &str) -> Result<Vec<Record>>
where
    F: PageFetcher + ?Sized,
{
    let mut records = Vec::new();
    let mut offset: Option<String> = None;
    loop {
        let page = fetcher.fetch_page(base, table, offset.as_deref()).await?;
        let next = page.next_offset().map(str::to_string);
        records.extend(page.records);
        match next {
            Some(next) => offset = Some(next),
            None => return Ok(records),
        }
    }
}
