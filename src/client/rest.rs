//! REST implementation of the search client
//!
//! Speaks an Algolia-style JSON protocol: combined queries go to
//! `POST /1/indexes/*/queries`, single-index queries to
//! `POST /1/indexes/{name}/query`.

use super::{SearchClient, SearchRequest};
use crate::config::ClientSettings;
use crate::error::SearchError;
use crate::results::SearchResponse;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// HTTP-backed search client
#[derive(Debug, Clone)]
pub struct RestSearchClient {
    client: Client,
    base: Url,
    app_id: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct MultiQueryBody<'a> {
    requests: &'a [SearchRequest],
}

#[derive(Deserialize)]
struct MultiQueryResults {
    results: Vec<SearchResponse>,
}

impl RestSearchClient {
    /// Build a client from settings
    pub fn new(settings: &ClientSettings) -> Result<Self, SearchError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs_f64(settings.request_timeout))
            .pool_max_idle_per_host(settings.pool_maxsize)
            .gzip(true)
            .brotli(true);

        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let mut base = Url::parse(&settings.base_url)?;
        // Url::join drops the last path segment unless the base ends in '/'
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        Ok(Self {
            client: builder.build()?,
            base,
            app_id: settings.app_id.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, SearchError> {
        let url = self.base.join(path)?;

        let mut request = self.client.post(url).json(body);
        if let Some(ref app_id) = self.app_id {
            request = request.header("X-Algolia-Application-Id", app_id);
        }
        if let Some(ref api_key) = self.api_key {
            request = request.header("X-Algolia-API-Key", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl SearchClient for RestSearchClient {
    async fn search(
        &self,
        requests: Vec<SearchRequest>,
    ) -> Result<Vec<SearchResponse>, SearchError> {
        let body = MultiQueryBody {
            requests: &requests,
        };
        let results: MultiQueryResults = self.post("1/indexes/*/queries", &body).await?;
        Ok(results.results)
    }

    async fn search_single_index(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, SearchError> {
        let path = format!("1/indexes/{}/query", request.index_name);
        self.post(&path, &request.params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SearchParams;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response_json(index: &str, object_id: &str) -> serde_json::Value {
        json!({
            "hits": [{"objectID": object_id, "name": "boot"}],
            "page": 0,
            "nbPages": 1,
            "index": index
        })
    }

    #[tokio::test]
    async fn test_multi_query_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/*/queries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [response_json("products", "p1"), response_json("pages", "g1")]
            })))
            .mount(&server)
            .await;

        let client = RestSearchClient::new(&ClientSettings::new(server.uri())).unwrap();
        let responses = client
            .search(vec![
                SearchRequest::new("products", SearchParams::query("boot")),
                SearchRequest::new("pages", SearchParams::query("boot")),
            ])
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].index.as_deref(), Some("products"));
        assert_eq!(responses[1].hits[0].object_id, "g1");
    }

    #[tokio::test]
    async fn test_single_index_endpoint_and_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/products/query"))
            .and(header("X-Algolia-API-Key", "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(response_json("products", "p1")),
            )
            .mount(&server)
            .await;

        let settings = ClientSettings::new(server.uri()).with_credentials("app", "secret");
        let client = RestSearchClient::new(&settings).unwrap();
        let response = client
            .search_single_index(SearchRequest::new("products", SearchParams::query("boot")))
            .await
            .unwrap();

        assert_eq!(response.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let client = RestSearchClient::new(&ClientSettings::new(server.uri())).unwrap();
        let err = client
            .search_single_index(SearchRequest::new("products", SearchParams::query("boot")))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_body_shape() {
        let server = MockServer::start().await;
        let expected = json!({
            "requests": [{"indexName": "products", "query": "a", "page": 2}]
        });
        Mock::given(method("POST"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [response_json("products", "p1")]
            })))
            .mount(&server)
            .await;

        let client = RestSearchClient::new(&ClientSettings::new(server.uri())).unwrap();
        let responses = client
            .search(vec![SearchRequest::new(
                "products",
                SearchParams::query("a").with_page(2),
            )])
            .await
            .unwrap();
        assert_eq!(responses.len(), 1);
    }
}
