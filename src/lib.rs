//! Index-addressable, windowed views over filtered and sorted document
//! collections, for grid widgets that expect random access by row.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

pub mod domain {
    pub mod entities {
        pub mod criteria;
        pub mod entity;
        pub mod filter;
        pub mod view;
    }
}

pub mod usecase {
    pub mod ports {
        pub mod repo;
    }

    pub mod services {
        pub mod container;
        pub mod entity_service;
        pub mod filter_converter;
        pub mod page_cache;
        pub mod query_service;
    }
}

pub mod infra {
    pub mod sqlite {
        pub mod queries;
        pub mod repo;
        pub mod schema;
    }
}

pub use domain::entities::criteria::Criteria;
pub use domain::entities::entity::{Document, EntityDescriptor, IdSlot};
pub use domain::entities::filter::{CompareOp, FilterError, FilterExpr};
pub use domain::entities::view::{ItemId, Page, SortDirection, SortKey, SortSpec};
pub use infra::sqlite::repo::SqliteDocumentStore;
pub use usecase::ports::repo::{DocumentRepository, PageQuery, RepoError, StoredDocument};
pub use usecase::services::container::{Builder, ContainerError, IdContainer};
pub use usecase::services::entity_service::{EntityError, EntityFactory};
pub use usecase::services::filter_converter::{
    FilterConverter, SingleOperandNegation, TranslateOptions,
};
pub use usecase::services::query_service::QueryService;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_CACHED_PAGES: usize = 16;

/// Per-user location of the document database.
pub fn default_store_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "hellhbbd", "docview")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().join("documents.sqlite"))
}

#[cfg(test)]
mod tests;
