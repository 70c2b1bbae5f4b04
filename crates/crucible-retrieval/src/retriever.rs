//! Context retriever
//!
//! Wraps the vector index with a timeout and a degradation policy: an
//! unreachable or empty index never fails the workflow, it just yields
//! empty context. The workflow proceeds to generation either way.

use crate::context::{ContextOrigin, RetrievedContext};
use crate::index::{IndexError, VectorIndex};
use crucible_solution::Request;
use std::sync::Arc;
use std::time::Duration;

/// Retrieves relevant passages for a request
///
/// The index is shared, immutable, initialized-once state passed in as an
/// explicit dependency so tests can substitute fakes.
#[derive(Clone)]
pub struct ContextRetriever {
    index: Arc<dyn VectorIndex>,
    timeout: Duration,
    top_k: usize,
}

impl ContextRetriever {
    /// Create new retriever
    #[inline]
    #[must_use]
    pub fn new(index: Arc<dyn VectorIndex>, timeout: Duration, top_k: usize) -> Self {
        Self {
            index,
            timeout,
            top_k,
        }
    }

    /// Retrieve context for a request
    ///
    /// Never fails: an unavailable index, an empty index, or a timed-out
    /// search all degrade to empty context with the matching origin.
    pub async fn retrieve(&self, request: &Request) -> RetrievedContext {
        tracing::debug!(request_id = %request.id, "retrieving context");

        let search = self.index.search(&request.description, self.top_k);
        match tokio::time::timeout(self.timeout, search).await {
            Ok(Ok(passages)) => {
                let context = RetrievedContext::ranked(passages);
                tracing::info!(
                    request_id = %request.id,
                    passages = context.len(),
                    "context retrieved"
                );
                context
            }
            Ok(Err(IndexError::Empty)) => {
                tracing::info!(request_id = %request.id, "index is empty, proceeding without context");
                RetrievedContext::empty(ContextOrigin::EmptyIndex)
            }
            Ok(Err(IndexError::Unavailable(reason))) => {
                tracing::warn!(
                    request_id = %request.id,
                    %reason,
                    "index unavailable, proceeding without context"
                );
                RetrievedContext::empty(ContextOrigin::IndexUnavailable)
            }
            Err(_) => {
                tracing::warn!(
                    request_id = %request.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "retrieval timed out, proceeding without context"
                );
                RetrievedContext::empty(ContextOrigin::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Passage;
    use crate::index::InMemoryIndex;
    use async_trait::async_trait;

    struct UnreachableIndex;

    #[async_trait]
    impl VectorIndex for UnreachableIndex {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, IndexError> {
            Err(IndexError::Unavailable("connection refused".to_string()))
        }
    }

    struct StalledIndex;

    #[async_trait]
    impl VectorIndex for StalledIndex {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, IndexError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn sample_index() -> Arc<InMemoryIndex> {
        Arc::new(InMemoryIndex::seeded(vec![
            ("docs/csv.txt", "Reading CSV files with pandas"),
            ("docs/plot.txt", "Plotting charts with matplotlib"),
        ]))
    }

    #[tokio::test]
    async fn retrieve_returns_ranked_context() {
        let retriever = ContextRetriever::new(sample_index(), Duration::from_secs(5), 4);
        let request = Request::new("read a CSV file");

        let context = retriever.retrieve(&request).await;
        assert_eq!(context.origin, ContextOrigin::Index);
        assert_eq!(context.passages[0].source.as_str(), "docs/csv.txt");
    }

    #[tokio::test]
    async fn retrieve_is_idempotent() {
        let retriever = ContextRetriever::new(sample_index(), Duration::from_secs(5), 4);
        let request = Request::new("read a CSV file");

        let first = retriever.retrieve(&request).await;
        let second = retriever.retrieve(&request).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unreachable_index_degrades_to_empty() {
        let retriever =
            ContextRetriever::new(Arc::new(UnreachableIndex), Duration::from_secs(5), 4);
        let request = Request::new("anything");

        let context = retriever.retrieve(&request).await;
        assert!(context.is_empty());
        assert_eq!(context.origin, ContextOrigin::IndexUnavailable);
    }

    #[tokio::test]
    async fn stalled_index_times_out_to_empty() {
        let retriever = ContextRetriever::new(Arc::new(StalledIndex), Duration::from_millis(20), 4);
        let request = Request::new("anything");

        let context = retriever.retrieve(&request).await;
        assert!(context.is_empty());
        assert_eq!(context.origin, ContextOrigin::TimedOut);
    }

    #[tokio::test]
    async fn empty_index_degrades_to_empty() {
        let retriever = ContextRetriever::new(
            Arc::new(InMemoryIndex::empty()),
            Duration::from_secs(5),
            4,
        );
        let request = Request::new("anything");

        let context = retriever.retrieve(&request).await;
        assert!(context.is_empty());
        assert_eq!(context.origin, ContextOrigin::EmptyIndex);
    }
}
