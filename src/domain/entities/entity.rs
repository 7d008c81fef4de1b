use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::entities::view::ItemId;

/// A document type a container can hold.
pub trait Document: Serialize + DeserializeOwned {
    fn descriptor() -> EntityDescriptor<Self>;
}

/// Accessors for the field that carries an entity's identifier.
pub struct IdSlot<T> {
    pub field: &'static str,
    pub read: Option<fn(&T) -> Option<ItemId>>,
    pub write: Option<fn(&mut T, ItemId)>,
}

impl<T> IdSlot<T> {
    pub fn read_write(
        field: &'static str,
        read: fn(&T) -> Option<ItemId>,
        write: fn(&mut T, ItemId),
    ) -> Self {
        Self {
            field,
            read: Some(read),
            write: Some(write),
        }
    }

    pub fn read_only(field: &'static str, read: fn(&T) -> Option<ItemId>) -> Self {
        Self {
            field,
            read: Some(read),
            write: None,
        }
    }
}

impl<T> Clone for IdSlot<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            read: self.read,
            write: self.write,
        }
    }
}

pub struct EntityDescriptor<T> {
    pub type_name: &'static str,
    pub constructor: Option<fn() -> T>,
    pub id_slot: Option<IdSlot<T>>,
}

impl<T> EntityDescriptor<T> {
    /// A descriptor with neither constructor nor identifier slot.
    pub fn bare() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            constructor: None,
            id_slot: None,
        }
    }

    pub fn with_constructor(mut self, constructor: fn() -> T) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn with_id_slot(mut self, slot: IdSlot<T>) -> Self {
        self.id_slot = Some(slot);
        self
    }
}

impl<T: Default> EntityDescriptor<T> {
    /// Constructible through `Default`.
    pub fn with_default() -> Self {
        Self::bare().with_constructor(T::default)
    }
}

impl<T> Clone for EntityDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            constructor: self.constructor,
            id_slot: self.id_slot.clone(),
        }
    }
}
