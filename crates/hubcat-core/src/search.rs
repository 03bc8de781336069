//! Search service: rewrite, then execute.
//!
//! Rejected queries are returned to the caller. Engine failures are logged
//! and reported as an empty result by [`SearchService::search`];
//! [`SearchService::try_search`] keeps them for callers that want to tell
//! the two apart.

use crate::error::{HubcatError, HubcatResult};
use crate::storage::{Dataset, SearchExecutor};
use hubcat_config::QueryConfig;
use hubcat_query::{JoinTermRewriter, QueryRewriteError, RewrittenQuery};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct SearchService {
    rewriter: JoinTermRewriter,
    executor: Arc<dyn SearchExecutor>,
}

impl SearchService {
    pub fn new(
        config: &QueryConfig,
        executor: Arc<dyn SearchExecutor>,
    ) -> Result<Self, QueryRewriteError> {
        Ok(Self {
            rewriter: JoinTermRewriter::new(config)?,
            executor,
        })
    }

    pub fn rewrite(&self, query: &str) -> Result<RewrittenQuery, QueryRewriteError> {
        self.rewriter.rewrite(query).map_err(|e| {
            warn!(query, error = %e, "Rejected query");
            e
        })
    }

    /// Matching datasets ordered by id; `limit == 0` is unbounded
    pub async fn search(
        &self,
        repository: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Dataset>, QueryRewriteError> {
        match self.try_search(repository, query, limit).await {
            Ok(datasets) => Ok(datasets),
            Err(HubcatError::QueryRewrite(e)) => Err(e),
            Err(e) => {
                error!(repository, query, error = %e, "Search failed");
                Ok(Vec::new())
            }
        }
    }

    pub async fn try_search(
        &self,
        repository: &str,
        query: &str,
        limit: usize,
    ) -> HubcatResult<Vec<Dataset>> {
        let rewritten = self.rewrite(query)?;
        debug!(
            repository,
            predicate = %rewritten.predicate,
            joins = rewritten.joins.len(),
            "Executing search"
        );

        let datasets = self.executor.execute(repository, &rewritten, limit).await?;
        Ok(datasets)
    }
}
