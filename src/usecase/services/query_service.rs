use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::entities::criteria::Criteria;
use crate::domain::entities::view::{ItemId, SortSpec};
use crate::usecase::ports::repo::{DocumentRepository, PageQuery, RepoError, StoredDocument};

/// Sort/page query executor over a document repository.
#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn DocumentRepository>,
}

impl QueryService {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo }
    }

    pub fn fetch_page(
        &self,
        criteria: Option<&Criteria>,
        sort: &SortSpec,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, RepoError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.repo.fetch_page(PageQuery {
            criteria,
            sort,
            skip,
            limit,
        })
    }

    pub fn fetch_ids(
        &self,
        criteria: Option<&Criteria>,
        sort: &SortSpec,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ItemId>, RepoError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ids = self.repo.fetch_ids(PageQuery {
            criteria,
            sort,
            skip,
            limit,
        })?;
        debug!(skip, limit, fetched = ids.len(), "fetched id page");
        Ok(ids)
    }

    pub fn count(&self, criteria: Option<&Criteria>) -> Result<usize, RepoError> {
        self.repo.count(criteria)
    }

    pub fn fetch_by_id(&self, id: &ItemId) -> Result<Option<Value>, RepoError> {
        self.repo.fetch_by_id(id)
    }

    pub fn position_of(
        &self,
        criteria: Option<&Criteria>,
        sort: &SortSpec,
        id: &ItemId,
    ) -> Result<Option<usize>, RepoError> {
        self.repo.position_of(criteria, sort, id)
    }

    pub fn matches(&self, criteria: Option<&Criteria>, id: &ItemId) -> Result<bool, RepoError> {
        self.repo.matches(criteria, id)
    }

    pub fn insert(&self, id: ItemId, body: &Value) -> Result<ItemId, RepoError> {
        self.repo.insert(id, body)
    }

    pub fn delete_by_id(&self, id: &ItemId) -> Result<bool, RepoError> {
        self.repo.delete_by_id(id)
    }
}
