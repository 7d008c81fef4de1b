use thiserror::Error;

use crate::domain::entities::entity::{Document, EntityDescriptor, IdSlot};
use crate::domain::entities::view::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("{0} has no accessible nullary constructor")]
    UninstantiableType(&'static str),
    #[error("{0} declares no identifier field")]
    NoIdentifierSlot(&'static str),
    #[error("identifier field `{field}` of {type_name} is not accessible")]
    IdentifierSlotInaccessible {
        type_name: &'static str,
        field: &'static str,
    },
}

/// Creates entities and binds identifiers through their descriptor.
pub struct EntityFactory<T> {
    descriptor: EntityDescriptor<T>,
}

impl<T> EntityFactory<T> {
    pub fn new(descriptor: EntityDescriptor<T>) -> Self {
        Self { descriptor }
    }

    pub fn type_name(&self) -> &'static str {
        self.descriptor.type_name
    }

    pub fn new_instance(&self) -> Result<T, EntityError> {
        self.descriptor
            .constructor
            .map(|construct| construct())
            .ok_or(EntityError::UninstantiableType(self.descriptor.type_name))
    }

    /// Binds a freshly generated identifier to `target` and returns it.
    pub fn assign_id(&self, target: &mut T) -> Result<ItemId, EntityError> {
        let slot = self.slot()?;
        let write = slot.write.ok_or(EntityError::IdentifierSlotInaccessible {
            type_name: self.descriptor.type_name,
            field: slot.field,
        })?;
        let id = ItemId::generate();
        write(target, id);
        Ok(id)
    }

    /// The identifier bound to `target`, `None` while unassigned.
    pub fn get_id(&self, target: &T) -> Result<Option<ItemId>, EntityError> {
        let slot = self.slot()?;
        let read = slot.read.ok_or(EntityError::IdentifierSlotInaccessible {
            type_name: self.descriptor.type_name,
            field: slot.field,
        })?;
        Ok(read(target))
    }

    fn slot(&self) -> Result<&IdSlot<T>, EntityError> {
        self.descriptor
            .id_slot
            .as_ref()
            .ok_or(EntityError::NoIdentifierSlot(self.descriptor.type_name))
    }
}

impl<T: Document> EntityFactory<T> {
    pub fn for_document() -> Self {
        Self::new(T::descriptor())
    }
}
