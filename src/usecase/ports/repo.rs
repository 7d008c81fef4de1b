use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::criteria::Criteria;
use crate::domain::entities::view::{ItemId, SortSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("{0}")]
    Message(String),
    #[error("document {0} already exists")]
    DuplicateId(ItemId),
}

/// One window of a filtered, sorted collection.
#[derive(Debug, Clone, Copy)]
pub struct PageQuery<'a> {
    pub criteria: Option<&'a Criteria>,
    pub sort: &'a SortSpec,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: ItemId,
    pub body: Value,
}

/// Query and cursor access to one document collection.
///
/// Implementations must order results by `sort` and then by id ascending, so
/// identical queries always return identical orderings.
pub trait DocumentRepository: Send + Sync {
    fn init(&self) -> Result<(), RepoError>;

    fn count(&self, criteria: Option<&Criteria>) -> Result<usize, RepoError>;
    fn fetch_page(&self, query: PageQuery<'_>) -> Result<Vec<StoredDocument>, RepoError>;

    fn fetch_ids(&self, query: PageQuery<'_>) -> Result<Vec<ItemId>, RepoError> {
        Ok(self
            .fetch_page(query)?
            .into_iter()
            .map(|document| document.id)
            .collect())
    }

    fn fetch_by_id(&self, id: &ItemId) -> Result<Option<Value>, RepoError>;

    /// 0-based index of `id` within the filtered, sorted view, or `None` when
    /// the document does not match `criteria`.
    fn position_of(
        &self,
        criteria: Option<&Criteria>,
        sort: &SortSpec,
        id: &ItemId,
    ) -> Result<Option<usize>, RepoError>;

    fn matches(&self, criteria: Option<&Criteria>, id: &ItemId) -> Result<bool, RepoError>;

    fn insert(&self, id: ItemId, body: &Value) -> Result<ItemId, RepoError>;
    fn delete_by_id(&self, id: &ItemId) -> Result<bool, RepoError>;
}
