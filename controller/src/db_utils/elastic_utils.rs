use common::search_query::QueryDocument;
use common::search_result::ResultDocument;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::config::ClientConfig;

pub const ACCESS_KEY_HEADER: &str = "x-access-key";

/// Runs a query document against the search engine.
///
/// `result_type` selects the document type; an empty string searches all types.
pub trait SearchExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        query: &'a QueryDocument,
        result_type: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<ResultDocument>>;
}

pub struct ElasticSearchExecutor {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ElasticSearchExecutor {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(access_key) = &config.access_key {
            headers.insert(ACCESS_KEY_HEADER, HeaderValue::from_str(access_key)?);
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn search_url(&self, result_type: &str) -> String {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        if result_type.is_empty() {
            format!("{endpoint}/documents/search")
        } else {
            format!("{endpoint}/documents/{result_type}/search")
        }
    }

    pub async fn search(&self, query: &QueryDocument, result_type: &str) -> anyhow::Result<ResultDocument> {
        let body = serde_json::to_string(query)?;
        let url = self.search_url(result_type);
        if self.config.debug {
            tracing::info!("SEARCH REQUEST: {} {}", url, body);
        } else {
            tracing::debug!("SEARCH REQUEST: {} {}", url, body);
        }
        let t0 = std::time::Instant::now();

        let response = self.client.post(&url).body(body).send().await?;
        let status = response.status();
        let response_txt = response.text().await?;
        if status.is_client_error() || status.is_server_error() {
            anyhow::bail!("Error: {}: {}", status, response_txt);
        }
        let dt_ms = t0.elapsed().as_millis() as u64;
        tracing::debug!("SEARCH RESPONSE: len = {} ({}ms)", response_txt.len(), dt_ms);

        let response: ResultDocument = serde_json::from_str(&response_txt)?;
        Ok(response)
    }
}

impl SearchExecutor for ElasticSearchExecutor {
    fn execute<'a>(
        &'a self,
        query: &'a QueryDocument,
        result_type: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<ResultDocument>> {
        self.search(query, result_type).boxed()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn executor(endpoint: &str) -> ElasticSearchExecutor {
        ElasticSearchExecutor::new(ClientConfig { endpoint: endpoint.to_string(), ..Default::default() }).unwrap()
    }

    #[test]
    fn url_includes_result_type() {
        assert_eq!(executor("http://es:9200/").search_url("event"), "http://es:9200/documents/event/search");
        assert_eq!(executor("http://es:9200").search_url("event,post"), "http://es:9200/documents/event,post/search");
    }

    #[test]
    fn empty_result_type_searches_everything() {
        assert_eq!(executor("http://es:9200").search_url(""), "http://es:9200/documents/search");
    }

    #[test]
    fn rejects_access_key_that_is_not_a_header_value() {
        let config = ClientConfig { access_key: Some("bad\nkey".to_string()), ..Default::default() };
        assert!(ElasticSearchExecutor::new(config).is_err());
    }
}
