//! Index-addressable view over a filtered, sorted document collection.
//!
//! The container caches a bounded number of fixed-size pages of ids, evicting
//! the least recently used page once the bound is reached, together with the
//! view size. Every change of filter, sort or data drops the whole cache;
//! nothing is revalidated incrementally. Lookups by id (`index_of`,
//! `contains`) only read the cache and the store, so repeated calls behave
//! identically.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::entities::criteria::Criteria;
use crate::domain::entities::entity::Document;
use crate::domain::entities::filter::{FilterError, FilterExpr};
use crate::domain::entities::view::{ItemId, Page, SortSpec};
use crate::usecase::ports::repo::{DocumentRepository, RepoError};
use crate::usecase::services::entity_service::{EntityError, EntityFactory};
use crate::usecase::services::filter_converter::{FilterConverter, TranslateOptions};
use crate::usecase::services::page_cache::PageCache;
use crate::usecase::services::query_service::QueryService;
use crate::{DEFAULT_MAX_CACHED_PAGES, DEFAULT_PAGE_SIZE};

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("index {index} out of range for a view of {size} items")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("no document with id {0}")]
    NotFound(ItemId),
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    #[error("page cache must hold at least one page")]
    InvalidCacheCapacity,
    #[error("failed to map document {id}")]
    Document {
        id: ItemId,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

struct CursorState {
    filters: Vec<FilterExpr>,
    filter_criteria: Vec<Criteria>,
    criteria: Option<Criteria>,
    sort: SortSpec,
    pages: PageCache,
    size: Option<usize>,
}

impl CursorState {
    fn new(sort: SortSpec, max_cached_pages: usize) -> Self {
        Self {
            filters: Vec::new(),
            filter_criteria: Vec::new(),
            criteria: None,
            sort,
            pages: PageCache::new(max_cached_pages),
            size: None,
        }
    }
}

pub struct IdContainer<T> {
    query: QueryService,
    factory: EntityFactory<T>,
    converter: FilterConverter,
    page_size: usize,
    base_criteria: Option<Criteria>,
    cursor: CursorState,
}

impl<T: Document> IdContainer<T> {
    pub fn builder(repo: Arc<dyn DocumentRepository>) -> Builder<T> {
        Builder::for_entity(repo)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_cached_pages(&self) -> usize {
        self.cursor.pages.capacity()
    }

    /// Number of pages currently held in memory.
    pub fn cached_pages(&self) -> usize {
        self.cursor.pages.len()
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.cursor.sort
    }

    pub fn translate_options(&self) -> TranslateOptions {
        self.converter.options()
    }

    pub fn filters(&self) -> &[FilterExpr] {
        &self.cursor.filters
    }

    /// Number of documents matching the current criteria.
    pub fn size(&mut self) -> Result<usize, ContainerError> {
        if let Some(size) = self.cursor.size {
            return Ok(size);
        }
        let size = self.query.count(self.cursor.criteria.as_ref())?;
        self.cursor.size = Some(size);
        Ok(size)
    }

    pub fn id_at(&mut self, index: usize) -> Result<ItemId, ContainerError> {
        let size = self.size()?;
        if index >= size {
            return Err(ContainerError::IndexOutOfRange { index, size });
        }
        let page = self.load_page(index / self.page_size, size)?;
        page.get(index)
            .copied()
            .ok_or(ContainerError::IndexOutOfRange { index, size })
    }

    fn load_page(&mut self, page_index: usize, size: usize) -> Result<&Page, ContainerError> {
        if !self.cursor.pages.contains(page_index) {
            let start_index = page_index * self.page_size;
            debug!(page_index, start_index, "page cache miss");
            let ids = self.query.fetch_ids(
                self.cursor.criteria.as_ref(),
                &self.cursor.sort,
                start_index,
                self.page_size,
            )?;
            let expected = self.page_size.min(size.saturating_sub(start_index));
            if ids.len() < expected {
                warn!(
                    page_index,
                    expected,
                    fetched = ids.len(),
                    "store returned a short page; collection changed outside this container"
                );
            }
            let evicted = self
                .cursor
                .pages
                .put(page_index, Page { start_index, ids });
            if evicted > 0 {
                debug!(page_index, evicted, "evicted least recently used pages");
            }
        }
        let page_size = self.page_size;
        self.cursor
            .pages
            .get(page_index)
            .ok_or(ContainerError::IndexOutOfRange {
                index: page_index * page_size,
                size,
            })
    }

    pub fn first_id(&mut self) -> Result<Option<ItemId>, ContainerError> {
        if self.size()? == 0 {
            return Ok(None);
        }
        self.id_at(0).map(Some)
    }

    pub fn last_id(&mut self) -> Result<Option<ItemId>, ContainerError> {
        match self.size()? {
            0 => Ok(None),
            size => self.id_at(size - 1).map(Some),
        }
    }

    pub fn is_first(&mut self, id: &ItemId) -> Result<bool, ContainerError> {
        Ok(self.first_id()?.as_ref() == Some(id))
    }

    pub fn is_last(&mut self, id: &ItemId) -> Result<bool, ContainerError> {
        Ok(self.last_id()?.as_ref() == Some(id))
    }

    /// Position of `id` in the current view, `None` when it is not part of it.
    pub fn index_of(&self, id: &ItemId) -> Result<Option<usize>, ContainerError> {
        if let Some(index) = self.cursor.pages.index_of(id) {
            return Ok(Some(index));
        }
        Ok(self
            .query
            .position_of(self.cursor.criteria.as_ref(), &self.cursor.sort, id)?)
    }

    pub fn contains(&self, id: &ItemId) -> Result<bool, ContainerError> {
        if self.cursor.pages.index_of(id).is_some() {
            return Ok(true);
        }
        Ok(self.query.matches(self.cursor.criteria.as_ref(), id)?)
    }

    pub fn next_id(&mut self, id: &ItemId) -> Result<Option<ItemId>, ContainerError> {
        let Some(index) = self.index_of(id)? else {
            return Ok(None);
        };
        if index + 1 >= self.size()? {
            return Ok(None);
        }
        self.id_at(index + 1).map(Some)
    }

    pub fn previous_id(&mut self, id: &ItemId) -> Result<Option<ItemId>, ContainerError> {
        match self.index_of(id)? {
            Some(index) if index > 0 => self.id_at(index - 1).map(Some),
            _ => Ok(None),
        }
    }

    /// Up to `count` ids starting at `start`; the count is clamped to the view.
    pub fn ids_in_range(
        &mut self,
        start: usize,
        count: usize,
    ) -> Result<Vec<ItemId>, ContainerError> {
        let size = self.size()?;
        if start > size {
            return Err(ContainerError::IndexOutOfRange { index: start, size });
        }
        let end = start + count.min(size - start);
        (start..end).map(|index| self.id_at(index)).collect()
    }

    /// Every id in the view. Loads the whole view page by page.
    pub fn all_ids(&mut self) -> Result<Vec<ItemId>, ContainerError> {
        let size = self.size()?;
        self.ids_in_range(0, size)
    }

    pub fn get_item(&self, id: &ItemId) -> Result<T, ContainerError> {
        let body = self
            .query
            .fetch_by_id(id)?
            .ok_or(ContainerError::NotFound(*id))?;
        serde_json::from_value(body).map_err(|source| ContainerError::Document { id: *id, source })
    }

    /// Narrows the view; active filters combine under AND. A filter that
    /// fails to translate is not added.
    pub fn add_filter(&mut self, filter: FilterExpr) -> Result<(), ContainerError> {
        let criteria = self.converter.convert(&filter)?;
        self.cursor.filters.push(filter);
        self.cursor.filter_criteria.push(criteria);
        self.rebuild_criteria();
        self.invalidate();
        Ok(())
    }

    pub fn remove_all_filters(&mut self) {
        self.cursor.filters.clear();
        self.cursor.filter_criteria.clear();
        self.rebuild_criteria();
        self.invalidate();
    }

    /// Sorts by `columns`; `ascending[i]` gives the direction of `columns[i]`
    /// and defaults to ascending when missing.
    pub fn apply_sort<S: AsRef<str>>(&mut self, columns: &[S], ascending: &[bool]) {
        self.cursor.sort = SortSpec::from_columns(columns, ascending);
        debug!(sort = ?self.cursor.sort, "sort changed; dropping cached pages");
        self.cursor.pages.clear();
    }

    /// Assigns `item` a fresh id and stores it.
    pub fn add_entity(&mut self, mut item: T) -> Result<ItemId, ContainerError> {
        let id = self.factory.assign_id(&mut item)?;
        let body = serde_json::to_value(&item)
            .map_err(|source| ContainerError::Document { id, source })?;
        self.query.insert(id, &body)?;
        self.invalidate();
        Ok(id)
    }

    /// Stores a default-constructed entity.
    pub fn add_item(&mut self) -> Result<ItemId, ContainerError> {
        let item = self.factory.new_instance()?;
        self.add_entity(item)
    }

    pub fn remove_by_id(&mut self, id: &ItemId) -> Result<bool, ContainerError> {
        let removed = self.query.delete_by_id(id)?;
        self.invalidate();
        Ok(removed)
    }

    /// Forgets cached size and pages, e.g. after writes that bypassed the container.
    pub fn refresh(&mut self) {
        self.invalidate();
    }

    fn rebuild_criteria(&mut self) {
        let parts = self
            .base_criteria
            .iter()
            .chain(self.cursor.filter_criteria.iter())
            .cloned()
            .collect();
        self.cursor.criteria = Criteria::all(parts);
    }

    fn invalidate(&mut self) {
        debug!(
            cached_pages = self.cursor.pages.len(),
            "dropping cached pages and size"
        );
        self.cursor.pages.clear();
        self.cursor.size = None;
    }
}

/// Construction-time configuration of an [`IdContainer`].
pub struct Builder<T> {
    repo: Arc<dyn DocumentRepository>,
    factory: EntityFactory<T>,
    page_size: usize,
    max_cached_pages: usize,
    sort: SortSpec,
    base_criteria: Option<Criteria>,
    filters: Vec<FilterExpr>,
    options: TranslateOptions,
}

impl<T: Document> Builder<T> {
    pub fn for_entity(repo: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repo,
            factory: EntityFactory::for_document(),
            page_size: DEFAULT_PAGE_SIZE,
            max_cached_pages: DEFAULT_MAX_CACHED_PAGES,
            sort: SortSpec::unsorted(),
            base_criteria: None,
            filters: Vec::new(),
            options: TranslateOptions::default(),
        }
    }

    pub fn with_factory(mut self, factory: EntityFactory<T>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Upper bound on pages kept in memory at once.
    pub fn with_max_cached_pages(mut self, max_cached_pages: usize) -> Self {
        self.max_cached_pages = max_cached_pages;
        self
    }

    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Store criteria that stay in force when filters are removed.
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.base_criteria = Some(criteria);
        self
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_translate_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<IdContainer<T>, ContainerError> {
        if self.page_size == 0 {
            return Err(ContainerError::InvalidPageSize);
        }
        if self.max_cached_pages == 0 {
            return Err(ContainerError::InvalidCacheCapacity);
        }
        let mut container = IdContainer {
            query: QueryService::new(self.repo),
            factory: self.factory,
            converter: FilterConverter::new(self.options),
            page_size: self.page_size,
            base_criteria: self.base_criteria,
            cursor: CursorState::new(self.sort, self.max_cached_pages),
        };
        container.rebuild_criteria();
        for filter in self.filters {
            container.add_filter(filter)?;
        }
        debug!(
            entity = container.factory.type_name(),
            page_size = container.page_size,
            max_cached_pages = container.max_cached_pages(),
            "built id container"
        );
        Ok(container)
    }
}
