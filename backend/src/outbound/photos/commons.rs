//! Wikimedia Commons thumbnail lookup through the MediaWiki `imageinfo` API.
//!
//! Answers are memoised per file reference, including "no such file", up to a
//! fixed number of titles. The oldest answers are dropped first. Failures are
//! not memoised.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::domain::ports::{PhotoResolver, PhotoResolverError};

/// Public Commons API endpoint.
pub const DEFAULT_COMMONS_ENDPOINT: &str = "https://commons.wikimedia.org/w/api.php";
/// Default number of memoised titles.
pub const DEFAULT_MEMO_CAPACITY: usize = 4096;
const THUMBNAIL_WIDTH: &str = "640";

#[derive(Debug, Clone)]
struct MemoEntry {
    url: Option<String>,
    seq: u64,
}

#[derive(Debug, Deserialize)]
struct ImageInfoResponse {
    query: Option<ImageInfoQuery>,
}

#[derive(Debug, Deserialize)]
struct ImageInfoQuery {
    #[serde(default)]
    pages: BTreeMap<String, ImageInfoPage>,
}

#[derive(Debug, Deserialize)]
struct ImageInfoPage {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    thumburl: Option<String>,
    url: Option<String>,
}

impl ImageInfoResponse {
    fn into_thumbnail(self) -> Option<String> {
        self.query?
            .pages
            .into_values()
            .flat_map(|page| page.imageinfo)
            .find_map(|info| info.thumburl.or(info.url))
    }
}

/// `Image:` is a legacy alias of the `File:` namespace.
fn canonical_title(file_reference: &str) -> String {
    let trimmed = file_reference.trim();
    trimmed.strip_prefix("Image:").map_or_else(
        || trimmed.to_owned(),
        |rest| format!("File:{rest}"),
    )
}

/// [`PhotoResolver`] backed by the Commons API.
pub struct CommonsPhotoResolver {
    client: Client,
    endpoint: Url,
    user_agent: String,
    memo: DashMap<String, MemoEntry>,
    memo_capacity: usize,
    next_seq: AtomicU64,
}

impl CommonsPhotoResolver {
    /// Build the resolver.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        user_agent: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            user_agent: user_agent.into(),
            memo: DashMap::new(),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            next_seq: AtomicU64::new(0),
        })
    }

    /// Override the number of memoised titles.
    #[must_use]
    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity.max(1);
        self
    }

    fn recall(&self, title: &str) -> Option<Option<String>> {
        self.memo.get(title).map(|entry| entry.url.clone())
    }

    fn remember(&self, title: String, url: Option<String>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.memo.insert(title, MemoEntry { url, seq });
        while self.memo.len() > self.memo_capacity {
            let oldest = self
                .memo
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(title) => {
                    self.memo.remove(&title);
                }
                None => break,
            }
        }
    }

    async fn lookup(&self, title: &str) -> Result<Option<String>, PhotoResolverError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
                ("iiurlwidth", THUMBNAIL_WIDTH),
                ("titles", title),
            ])
            .send()
            .await
            .map_err(|error| PhotoResolverError::transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PhotoResolverError::transport(format!(
                "status {}",
                status.as_u16()
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| PhotoResolverError::transport(error.to_string()))?;
        parse_thumbnail(&body)
    }
}

fn parse_thumbnail(body: &[u8]) -> Result<Option<String>, PhotoResolverError> {
    serde_json::from_slice::<ImageInfoResponse>(body)
        .map(ImageInfoResponse::into_thumbnail)
        .map_err(|error| PhotoResolverError::decode(error.to_string()))
}

#[async_trait]
impl PhotoResolver for CommonsPhotoResolver {
    async fn thumbnail_url(
        &self,
        file_reference: &str,
    ) -> Result<Option<String>, PhotoResolverError> {
        let title = canonical_title(file_reference);
        if let Some(known) = self.recall(&title) {
            return Ok(known);
        }
        let resolved = self.lookup(&title).await?;
        self.remember(title, resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("File:Fuji.jpg", "File:Fuji.jpg")]
    #[case("Image:Fuji.jpg", "File:Fuji.jpg")]
    #[case("  File:Lake Kawaguchi.png ", "File:Lake Kawaguchi.png")]
    fn titles_use_the_file_namespace(#[case] reference: &str, #[case] expected: &str) {
        assert_eq!(canonical_title(reference), expected);
    }

    #[test]
    fn prefers_the_thumbnail_url() {
        let body = br#"{"query":{"pages":{"42":{"imageinfo":[{
            "thumburl":"https://upload.wikimedia.org/thumb/640px-Fuji.jpg",
            "url":"https://upload.wikimedia.org/Fuji.jpg"
        }]}}}}"#;
        assert_eq!(
            parse_thumbnail(body).expect("decodes"),
            Some("https://upload.wikimedia.org/thumb/640px-Fuji.jpg".to_owned())
        );
    }

    #[test]
    fn falls_back_to_the_original_url() {
        let body = br#"{"query":{"pages":{"42":{"imageinfo":[{"url":"https://upload.wikimedia.org/Fuji.svg"}]}}}}"#;
        assert_eq!(
            parse_thumbnail(body).expect("decodes"),
            Some("https://upload.wikimedia.org/Fuji.svg".to_owned())
        );
    }

    #[test]
    fn missing_files_resolve_to_none() {
        let body = br#"{"query":{"pages":{"-1":{"missing":"","title":"File:Nope.jpg"}}}}"#;
        assert_eq!(parse_thumbnail(body).expect("decodes"), None);
    }

    #[test]
    fn non_json_is_a_decode_error() {
        let error = parse_thumbnail(b"<html/>").expect_err("decode fails");
        assert!(matches!(error, PhotoResolverError::Decode { .. }));
    }

    fn offline_resolver() -> CommonsPhotoResolver {
        let endpoint = Url::parse("http://127.0.0.1:1/w/api.php").expect("valid url");
        CommonsPhotoResolver::new(endpoint, Duration::from_millis(200), "test")
            .expect("client builds")
    }

    #[tokio::test]
    async fn memoised_answers_skip_the_network() {
        let resolver = offline_resolver();
        resolver.remember("File:Fuji.jpg".to_owned(), Some("https://img/fuji".to_owned()));

        let url = resolver
            .thumbnail_url("Image:Fuji.jpg")
            .await
            .expect("memo hit");

        assert_eq!(url.as_deref(), Some("https://img/fuji"));
    }

    #[test]
    fn memo_drops_the_oldest_titles_past_capacity() {
        let resolver = offline_resolver().with_memo_capacity(2);

        for index in 0..5 {
            resolver.remember(format!("File:{index}.jpg"), None);
        }
        resolver.remember("File:3.jpg".to_owned(), Some("https://img/3".to_owned()));

        assert_eq!(resolver.memo.len(), 2);
        assert_eq!(resolver.recall("File:0.jpg"), None);
        assert_eq!(resolver.recall("File:4.jpg"), Some(None));
        assert_eq!(
            resolver.recall("File:3.jpg"),
            Some(Some("https://img/3".to_owned()))
        );
    }
}
