//! Capacity-bounded page cache with least-recently-used eviction.

use std::collections::{HashMap, VecDeque};

use crate::domain::entities::view::{ItemId, Page};

pub struct PageCache {
    /// Maximum number of pages
    capacity: usize,
    pages: HashMap<usize, Page>,
    /// Access order (most recent at back)
    order: VecDeque<usize>,
    /// Absolute index of every cached id
    positions: HashMap<ItemId, usize>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pages: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            positions: HashMap::new(),
        }
    }

    pub fn contains(&self, page_index: usize) -> bool {
        self.pages.contains_key(&page_index)
    }

    /// Returns the page and marks it most recently used.
    pub fn get(&mut self, page_index: usize) -> Option<&Page> {
        if !self.pages.contains_key(&page_index) {
            return None;
        }
        self.touch(page_index);
        self.pages.get(&page_index)
    }

    /// Caches `page`, evicting the least recently used pages to stay within capacity.
    /// Returns the number of evicted pages.
    pub fn put(&mut self, page_index: usize, page: Page) -> usize {
        self.remove(page_index);

        let mut evicted = 0;
        while self.order.len() >= self.capacity {
            let Some(old_index) = self.order.pop_front() else {
                break;
            };
            self.forget(old_index);
            evicted += 1;
        }

        for (offset, id) in page.ids.iter().enumerate() {
            self.positions.insert(*id, page.start_index + offset);
        }
        self.pages.insert(page_index, page);
        self.order.push_back(page_index);
        evicted
    }

    /// Absolute index of `id` if one of the cached pages holds it. Does not
    /// change the access order.
    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.order.clear();
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn touch(&mut self, page_index: usize) {
        self.order.retain(|index| *index != page_index);
        self.order.push_back(page_index);
    }

    fn remove(&mut self, page_index: usize) {
        if self.pages.contains_key(&page_index) {
            self.order.retain(|index| *index != page_index);
            self.forget(page_index);
        }
    }

    fn forget(&mut self, page_index: usize) {
        let Some(page) = self.pages.remove(&page_index) else {
            return;
        };
        for (offset, id) in page.ids.iter().enumerate() {
            if self.positions.get(id) == Some(&(page.start_index + offset)) {
                self.positions.remove(id);
            }
        }
    }
}
