//! Remote search client boundary
//!
//! The orchestrators only ever talk to `SearchClient`; the REST
//! implementation lives in [`rest`] and test doubles implement the trait
//! directly.

mod rest;

pub use rest::RestSearchClient;

use crate::config::SearchOptions;
use crate::error::SearchError;
use crate::results::SearchResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters for one index query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Query string
    pub query: String,
    /// Zero-based page to fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Hits per page; backend default applies if omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u32>,
}

impl SearchParams {
    /// Parameters for a plain query
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: None,
            hits_per_page: None,
        }
    }

    /// Parameters derived from orchestrator options
    pub fn with_options(query: impl Into<String>, options: &SearchOptions) -> Self {
        Self {
            query: query.into(),
            page: options.page,
            hits_per_page: options.hits_per_page,
        }
    }

    /// Set the page to fetch
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

/// One index query within a combined request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Target index name
    pub index_name: String,
    /// Query parameters
    #[serde(flatten)]
    pub params: SearchParams,
}

impl SearchRequest {
    pub fn new(index_name: impl Into<String>, params: SearchParams) -> Self {
        Self {
            index_name: index_name.into(),
            params,
        }
    }
}

/// Capability contract for the remote search backend.
///
/// `search` answers combined requests with positional correspondence: the
/// response at position `i` belongs to the request at position `i`.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Query several indices in one round trip
    async fn search(
        &self,
        requests: Vec<SearchRequest>,
    ) -> Result<Vec<SearchResponse>, SearchError>;

    /// Query one index
    async fn search_single_index(
        &self,
        request: SearchRequest,
    ) -> Result<SearchResponse, SearchError>;
}
