//! HTTP feed sources and the feed list file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use catalog::loader::{BoxFuture, FeedError, FeedSource};
use catalog::project::FeedIdentity;

use crate::config::{default_feeds, ConfigError, FeedList, FeedSpec};

/// Fetches one spreadsheet query endpoint.
pub struct HttpFeedSource {
    identity: FeedIdentity,
    url: String,
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(spec: &FeedSpec, client: reqwest::Client) -> Self {
        Self {
            identity: spec.identity(),
            url: spec.resolved_url(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for HttpFeedSource {
    fn identity(&self) -> &FeedIdentity {
        &self.identity
    }

    fn fetch(&self) -> BoxFuture<'_, Result<String, FeedError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| FeedError::with_source("HTTP request failed", e))?;

            if !resp.status().is_success() {
                return Err(FeedError::new(format!("HTTP error: {}", resp.status())));
            }

            resp.text()
                .await
                .map_err(|e| FeedError::with_source("Failed to read response", e))
        })
    }
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Feeds(format!("HTTP client: {e}")))
}

/// Reads a JSON array of [`FeedSpec`].
pub async fn load_feed_file(path: &Path) -> Result<Vec<FeedSpec>, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Feeds(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Feeds(format!("{}: {e}", path.display())))
}

pub async fn resolve_feeds(list: &FeedList) -> Result<Vec<FeedSpec>, ConfigError> {
    let specs = match list {
        FeedList::Builtin => default_feeds(),
        FeedList::Inline(specs) => specs.clone(),
        FeedList::File(path) => load_feed_file(path).await?,
    };
    if specs.is_empty() {
        return Err(ConfigError::Feeds("no feeds configured".to_string()));
    }
    Ok(specs)
}

pub fn build_sources(specs: &[FeedSpec], client: &reqwest::Client) -> Vec<Arc<dyn FeedSource>> {
    specs
        .iter()
        .map(|spec| Arc::new(HttpFeedSource::new(spec, client.clone())) as Arc<dyn FeedSource>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{build_sources, load_feed_file, resolve_feeds};
    use crate::config::{ConfigError, FeedList};
    use catalog::project::Category;

    #[tokio::test]
    async fn reads_feed_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        tokio::fs::write(
            &path,
            r#"[{"key":"bwa","category":"BWA","sheetId":"abc"},{"key":"pop","category":"POP","url":"http://x/pop"}]"#,
        )
        .await
        .unwrap();

        let specs = load_feed_file(&path).await.unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].category, Category::Bwa);
        assert_eq!(specs[0].sheet_id, "abc");

        let sources = build_sources(&specs, &reqwest::Client::new());
        assert_eq!(sources[1].identity().key, "pop");
    }

    #[tokio::test]
    async fn missing_or_empty_lists_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            resolve_feeds(&FeedList::File(missing)).await,
            Err(ConfigError::Feeds(_))
        ));
        assert!(resolve_feeds(&FeedList::Inline(Vec::new())).await.is_err());
        assert_eq!(resolve_feeds(&FeedList::Builtin).await.unwrap().len(), 4);
    }
}
