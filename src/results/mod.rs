//! Result batch types shared by the reactive and fetch-based paths
//!
//! Wire shapes follow the backend's camelCase protocol. A `Hit` is an open
//! record: a stable `objectID` key plus arbitrary fields, which deserialize
//! into the descriptor's declared shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single hit record for one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit<T = serde_json::Value> {
    /// Stable identifier used as the rendering/diffing key
    #[serde(rename = "objectID")]
    pub object_id: String,
    /// Remaining fields of the record, typed per the index descriptor
    #[serde(flatten)]
    pub data: T,
}

impl<T> Hit<T> {
    pub fn new(object_id: impl Into<String>, data: T) -> Self {
        Self {
            object_id: object_id.into(),
            data,
        }
    }
}

/// The erased hit form carried by live sessions before shape decoding
pub type BaseHit = Hit<serde_json::Value>;

/// Response for one index query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<T = serde_json::Value> {
    /// Hits for this page
    pub hits: Vec<Hit<T>>,
    /// Zero-based page index of this response
    #[serde(default)]
    pub page: u32,
    /// Total number of pages for the query
    #[serde(default)]
    pub nb_pages: u32,
    /// Name of the index that produced this response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Query the response answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Total number of hits across all pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_hits: Option<u64>,
    /// Hits per page the backend applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u32>,
    /// Backend processing time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

impl<T> SearchResponse<T> {
    /// Whether a page after this one exists
    pub fn has_next_page(&self) -> bool {
        self.page + 1 < self.nb_pages
    }
}

impl<T> Default for SearchResponse<T> {
    fn default() -> Self {
        Self {
            hits: Vec::new(),
            page: 0,
            nb_pages: 0,
            index: None,
            query: None,
            nb_hits: None,
            hits_per_page: None,
            processing_time_ms: None,
        }
    }
}

/// Decode erased hits into the descriptor's declared shape.
///
/// Hits that do not match the shape are dropped with a warning rather than
/// failing the whole batch; a live stream should not go empty because one
/// record of an open shape failed to convert.
pub fn decode_hits<T: DeserializeOwned>(hits: &[BaseHit]) -> Vec<Hit<T>> {
    hits.iter()
        .filter_map(|hit| match serde_json::from_value(hit.data.clone()) {
            Ok(data) => Some(Hit {
                object_id: hit.object_id.clone(),
                data,
            }),
            Err(e) => {
                warn!("Dropping hit {}: {}", hit.object_id, e);
                None
            }
        })
        .collect()
}

/// Decode an erased response into a typed one
pub fn decode_response<T: DeserializeOwned>(
    raw: SearchResponse<serde_json::Value>,
) -> SearchResponse<T> {
    SearchResponse {
        hits: decode_hits(&raw.hits),
        page: raw.page,
        nb_pages: raw.nb_pages,
        index: raw.index,
        query: raw.query,
        nb_hits: raw.nb_hits,
        hits_per_page: raw.hits_per_page,
        processing_time_ms: raw.processing_time_ms,
    }
}
