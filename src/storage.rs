use std::{
    cell::{Ref, RefCell, RefMut},
    collections::HashMap,
    fmt::Display,
};

use crate::{
    archetype::Archetype,
    component::{set_cell, try_cast, try_cast_mut, ComponentId, ComponentStorage},
    entity::EntityHandle,
    error::EcsError,
};

///
/// ArchetypeStorage
///
/// Dense structure-of-arrays table for one archetype: an identity column of
/// entity handles plus one growable column per declared component type, all
/// kept at the same length. Rows are appended at the end and removed by
/// swapping the last row into the hole, so a row index is only stable until
/// the next removal.
///
/// Component columns sit behind [RefCell] so queries can take shared or
/// mutable column guards through a shared storage borrow. Requesting the same
/// column mutably twice in one query panics; this storage is strictly
/// single-threaded.
///
pub struct ArchetypeStorage {
    archetype: Archetype,
    entities: Vec<EntityHandle>,
    columns: HashMap<ComponentId, RefCell<Box<dyn ComponentStorage>>>,
}

impl ArchetypeStorage {
    pub(crate) fn new(archetype: Archetype) -> Self {
        let columns = archetype.new_columns();
        ArchetypeStorage {
            archetype,
            entities: Vec::new(),
            columns,
        }
    }

    #[inline(always)]
    pub fn archetype(&self) -> &Archetype {
        &self.archetype
    }

    /// Number of live rows. Every column has exactly this length.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Allocated capacity of the identity column. Component columns grow in
    /// the same appends, so their capacity is never below [Self::len].
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    pub fn contains(&self, comp_id: ComponentId) -> bool {
        self.columns.contains_key(&comp_id)
    }

    pub fn contains_all(&self, comp_ids: &[ComponentId]) -> bool {
        comp_ids.iter().all(|id| self.columns.contains_key(id))
    }

    /// Owning handle of the row at `row`.
    ///
    /// # Panics
    /// If `row >= len`.
    #[inline(always)]
    pub fn handle(&self, row: usize) -> EntityHandle {
        self.entities[row]
    }

    /// Appends one default-initialized row owned by `handle` and returns its
    /// index. Room is reserved in every column before anything is
    /// constructed, so a failed growth leaves no partial row behind.
    pub(crate) fn append(&mut self, handle: EntityHandle) -> Result<usize, EcsError> {
        self.entities.try_reserve(1)?;
        for cell in self.columns.values_mut() {
            cell.get_mut().try_reserve(1)?;
        }
        let row = self.entities.len();
        self.entities.push(handle);
        for cell in self.columns.values_mut() {
            cell.get_mut().push_default();
        }
        Ok(row)
    }

    /// Removes the row at `row` from every column, filling the hole with the
    /// last row. Returns the handle now occupying `row` (None if the removed
    /// row was the last one). Capacity is never reduced.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<EntityHandle> {
        self.entities.swap_remove(row);
        for cell in self.columns.values_mut() {
            cell.get_mut().swap_remove(row);
        }
        self.entities.get(row).copied()
    }

    /// Overwrites the `T` cell of an existing row.
    pub(crate) fn set<T: Default + 'static>(&mut self, row: usize, value: T) {
        if let Some(cell) = self.columns.get_mut(&ComponentId::of::<T>()) {
            set_cell(cell.get_mut().as_mut(), row, value);
        }
    }

    /// Reference to the `T` cell at `row`, or None when `T` is not one of
    /// this archetype's columns or `row` is out of range. Never an error;
    /// this is what makes the query layer safe against every archetype.
    pub fn try_get<T: Default + 'static>(&self, row: usize) -> Option<Ref<'_, T>> {
        let cell = self.columns.get(&ComponentId::of::<T>())?;
        Ref::filter_map(cell.borrow(), |column| {
            try_cast::<T>(column.as_ref()).and_then(|cells| cells.get(row))
        })
        .ok()
    }

    pub fn try_get_mut<T: Default + 'static>(&self, row: usize) -> Option<RefMut<'_, T>> {
        let cell = self.columns.get(&ComponentId::of::<T>())?;
        RefMut::filter_map(cell.borrow_mut(), |column| {
            try_cast_mut::<T>(column.as_mut()).and_then(|cells| cells.get_mut(row))
        })
        .ok()
    }

    /// Bounds- and type-checked variant of [Self::try_get].
    pub fn get<T: Default + 'static>(&self, row: usize) -> Result<Ref<'_, T>, EcsError> {
        if row >= self.len() {
            return Err(EcsError::IndexOutOfRange);
        }
        self.try_get(row).ok_or(EcsError::NoSuchComponent)
    }

    pub fn get_mut<T: Default + 'static>(&self, row: usize) -> Result<RefMut<'_, T>, EcsError> {
        if row >= self.len() {
            return Err(EcsError::IndexOutOfRange);
        }
        self.try_get_mut(row).ok_or(EcsError::NoSuchComponent)
    }

    pub(crate) fn column(
        &self,
        comp_id: ComponentId,
    ) -> Option<&RefCell<Box<dyn ComponentStorage>>> {
        self.columns.get(&comp_id)
    }

    /// Drops every row and resets the length to 0. Capacity is kept, so the
    /// next append does not reallocate.
    pub(crate) fn clear(&mut self) {
        self.entities.clear();
        for cell in self.columns.values_mut() {
            cell.get_mut().clear();
        }
    }
}

impl Display for ArchetypeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArchetypeStorage({}, rows={})", self.archetype, self.len())
    }
}

///
/// Tests
///
#[cfg(test)]
mod test {
    use super::ArchetypeStorage;
    use crate::{
        component::ComponentId,
        entity::{EntityHandle, EntityId},
        error::EcsError,
    };

    fn handle(slot: u32) -> EntityHandle {
        EntityHandle {
            archetype: 0,
            id: EntityId::new(slot, 0),
        }
    }

    #[test]
    fn append_keeps_columns_in_lockstep() {
        let mut storage = ArchetypeStorage::new(crate::archetype![i32, String, f64, bool]);

        assert_eq!(0, storage.append(handle(1)).unwrap());
        assert_eq!(1, storage.append(handle(2)).unwrap());
        assert_eq!(2, storage.append(handle(3)).unwrap());

        assert_eq!(3, storage.len());
        assert!(storage.capacity() >= storage.len());
        assert_eq!(handle(2), storage.handle(1));

        storage.set(1, 42i32);
        storage.set(1, "two".to_owned());
        assert_eq!(42, *storage.try_get::<i32>(1).unwrap());
        assert_eq!("two", storage.try_get::<String>(1).unwrap().as_str());
        assert_eq!(0.0, *storage.try_get::<f64>(1).unwrap());
    }

    #[test]
    fn try_get_absent_column_or_row() {
        let mut storage = ArchetypeStorage::new(crate::archetype![i32, bool]);
        storage.append(handle(1)).unwrap();

        assert!(storage.try_get::<f64>(0).is_none());
        assert!(storage.try_get::<i32>(1).is_none());
        assert!(storage.try_get::<i32>(0).is_some());
    }

    #[test]
    fn get_reports_errors() {
        let mut storage = ArchetypeStorage::new(crate::archetype![i32]);
        storage.append(handle(1)).unwrap();

        assert!(matches!(
            storage.get::<i32>(5),
            Err(EcsError::IndexOutOfRange)
        ));
        assert!(matches!(
            storage.get::<f64>(0),
            Err(EcsError::NoSuchComponent)
        ));
        assert_eq!(0, *storage.get::<i32>(0).unwrap());
    }

    #[test]
    fn swap_remove_moves_last_row() {
        let mut storage = ArchetypeStorage::new(crate::archetype![i32]);
        for slot in 1..=4 {
            let row = storage.append(handle(slot)).unwrap();
            storage.set(row, slot as i32 * 10);
        }

        // Removing row 1 pulls the last row (slot 4) into its place.
        let moved = storage.swap_remove(1).unwrap();
        assert_eq!(handle(4), moved);
        assert_eq!(3, storage.len());
        assert_eq!(40, *storage.try_get::<i32>(1).unwrap());

        // Removing the last row moves nothing.
        assert!(storage.swap_remove(2).is_none());
        assert_eq!(2, storage.len());
    }

    #[test]
    fn contains_all() {
        let storage = ArchetypeStorage::new(crate::archetype![i32, f64, bool]);
        assert!(storage.contains_all(&[ComponentId::of::<i32>(), ComponentId::of::<bool>()]));
        assert!(!storage.contains_all(&[ComponentId::of::<i32>(), ComponentId::of::<String>()]));
        assert!(storage.contains_all(&[]));
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut storage = ArchetypeStorage::new(crate::archetype![i32, f64]);
        for slot in 1..=16 {
            storage.append(handle(slot)).unwrap();
        }
        let cap = storage.capacity();
        storage.clear();
        assert_eq!(0, storage.len());
        assert!(storage.is_empty());
        assert_eq!(cap, storage.capacity());

        // Still usable after a full reset.
        storage.append(handle(17)).unwrap();
        assert_eq!(1, storage.len());
    }
}
