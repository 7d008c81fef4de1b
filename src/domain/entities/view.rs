use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned identifier of a document. Opaque to callers; compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Fresh, globally unique and time-ordered identifier.
    pub fn generate() -> Self {
        ItemId(Uuid::now_v7())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(ItemId)
    }
}

impl From<Uuid> for ItemId {
    fn from(value: Uuid) -> Self {
        ItemId(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordered sort keys. The store always breaks remaining ties by id ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self::unsorted().then_by(field, direction)
    }

    pub fn then_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Pairs up grid columns with their ascending flags. Columns without a
    /// matching flag sort ascending.
    pub fn from_columns<S: AsRef<str>>(columns: &[S], ascending: &[bool]) -> Self {
        let keys = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| SortKey {
                field: column.as_ref().to_string(),
                direction: if ascending.get(idx).copied().unwrap_or(true) {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
            })
            .collect();
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A contiguous, order-respecting slice of the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub start_index: usize,
    pub ids: Vec<ItemId>,
}

impl Page {
    pub fn get(&self, index: usize) -> Option<&ItemId> {
        index
            .checked_sub(self.start_index)
            .and_then(|offset| self.ids.get(offset))
    }
}
