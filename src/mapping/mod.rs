//! Mapping resolution and search engine.
//!
//! The engine joins the normalized entities of the store into the composite views
//! served by the REST API.  All operations take a [`RequestContext`] that carries the
//! calling user and the per-request cache of assembled views; nothing is shared
//! between requests except the store itself.

use std::sync::Arc;

use crate::model::Id;
use crate::sequence::SequenceService;
use crate::store::Store;

pub mod assemble;
pub mod curation;
pub mod related;
pub mod search;
pub mod status;

pub use assemble::{MappingDetail, MappingSummary, MappingView, Taxonomy};
pub use search::{Facets, SearchPage, SearchQuery, SearchTerm};

/// User stamp used when the request does not name one.
pub const ANONYMOUS: &str = "anonymous";

/// Capacity of the per-request cache of assembled views.
const VIEW_CACHE_CAPACITY: usize = 1024;

/// Explicit per-request state.
pub struct RequestContext {
    /// User stamp for appended events.
    pub user: String,
    /// Assembled views of this request, keyed by mapping id.
    views: quick_cache::sync::Cache<Id, MappingView>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("user", &self.user)
            .field("cached_views", &self.views.len())
            .finish()
    }
}

impl RequestContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            views: quick_cache::sync::Cache::new(VIEW_CACHE_CAPACITY),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(ANONYMOUS)
    }
}

/// The store plus the external sequence service.
#[derive(Clone, derivative::Derivative)]
#[derivative(Debug)]
pub struct Engine {
    pub store: Store,
    #[derivative(Debug = "ignore")]
    pub sequences: Arc<dyn SequenceService>,
    /// Number of mappings assembled concurrently within one request.
    pub concurrency: usize,
}

impl Engine {
    pub fn new(store: Store, sequences: Arc<dyn SequenceService>, concurrency: usize) -> Self {
        Self {
            store,
            sequences,
            concurrency: concurrency.max(1),
        }
    }
}
