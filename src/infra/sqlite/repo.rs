use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use crate::domain::entities::criteria::Criteria;
use crate::domain::entities::view::{ItemId, SortSpec};
use crate::infra::sqlite::queries::{
    count_documents, delete_document, document_exists, document_matches, document_position,
    fetch_document, fetch_document_ids, fetch_documents, insert_document,
};
use crate::infra::sqlite::schema::{init_db, open_connection, open_memory_connection};
use crate::usecase::ports::repo::{DocumentRepository, PageQuery, RepoError, StoredDocument};

fn repo_error(err: anyhow::Error) -> RepoError {
    RepoError::Message(format!("{err:#}"))
}

/// One collection of JSON documents in a SQLite database.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
    collection: String,
    pub db_path: Option<PathBuf>,
}

impl SqliteDocumentStore {
    pub fn open(db_path: &Path, collection: impl Into<String>) -> Result<Self, RepoError> {
        let conn = open_connection(db_path).map_err(repo_error)?;
        let collection = collection.into();
        info!(path = %db_path.display(), %collection, "opened document store");
        Ok(Self {
            conn: Mutex::new(conn),
            collection,
            db_path: Some(db_path.to_path_buf()),
        })
    }

    pub fn open_in_memory(collection: impl Into<String>) -> Result<Self, RepoError> {
        let conn = open_memory_connection().map_err(repo_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.into(),
            db_path: None,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepoError> {
        self.conn
            .lock()
            .map_err(|_| RepoError::Message("document store connection lock poisoned".to_string()))
    }
}

impl DocumentRepository for SqliteDocumentStore {
    fn init(&self) -> Result<(), RepoError> {
        init_db(&*self.conn()?).map_err(repo_error)
    }

    fn count(&self, criteria: Option<&Criteria>) -> Result<usize, RepoError> {
        count_documents(&*self.conn()?, &self.collection, criteria).map_err(repo_error)
    }

    fn fetch_page(&self, query: PageQuery<'_>) -> Result<Vec<StoredDocument>, RepoError> {
        fetch_documents(&*self.conn()?, &self.collection, query).map_err(repo_error)
    }

    fn fetch_ids(&self, query: PageQuery<'_>) -> Result<Vec<ItemId>, RepoError> {
        fetch_document_ids(&*self.conn()?, &self.collection, query).map_err(repo_error)
    }

    fn fetch_by_id(&self, id: &ItemId) -> Result<Option<Value>, RepoError> {
        fetch_document(&*self.conn()?, &self.collection, id).map_err(repo_error)
    }

    fn position_of(
        &self,
        criteria: Option<&Criteria>,
        sort: &SortSpec,
        id: &ItemId,
    ) -> Result<Option<usize>, RepoError> {
        document_position(&*self.conn()?, &self.collection, criteria, sort, id).map_err(repo_error)
    }

    fn matches(&self, criteria: Option<&Criteria>, id: &ItemId) -> Result<bool, RepoError> {
        document_matches(&*self.conn()?, &self.collection, criteria, id).map_err(repo_error)
    }

    fn insert(&self, id: ItemId, body: &Value) -> Result<ItemId, RepoError> {
        let conn = self.conn()?;
        if document_exists(&conn, &self.collection, &id).map_err(repo_error)? {
            return Err(RepoError::DuplicateId(id));
        }
        insert_document(&conn, &self.collection, &id, body).map_err(repo_error)?;
        Ok(id)
    }

    fn delete_by_id(&self, id: &ItemId) -> Result<bool, RepoError> {
        delete_document(&*self.conn()?, &self.collection, id).map_err(repo_error)
    }
}
