//! QuerySync-RS: reactive query orchestration for remote search indices
//!
//! Connects live text input to remote search indices and exposes the results
//! as reactive state: single-index and grouped reactive subscriptions, a
//! deferred multi-index fetch orchestrator, and cursor-style pagination,
//! with guaranteed teardown and stale-delivery suppression throughout.

pub mod binder;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod input;
pub mod live;
pub mod results;
pub mod scheduler;
pub mod session;

pub use binder::{bind, Teardown};
pub use client::{RestSearchClient, SearchClient, SearchParams, SearchRequest};
pub use config::{ClientSettings, SearchOptions};
pub use error::SearchError;
pub use fetch::{FetchState, MultiSearch, PaginatedSearch, PaginatedState};
pub use index::{Index, IndexSet};
pub use input::{InputElement, TextInput};
pub use live::{GroupedSearch, SingleIndexSearch};
pub use results::{BaseHit, Hit, SearchResponse};
pub use session::SearchSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
