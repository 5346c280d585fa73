use std::{cell::{Ref, RefMut}, collections::HashMap};

use log::{debug, trace, warn};

use crate::{
    archetype::{Archetype, ArchetypeId},
    entity::{EntityHandle, EntityId},
    error::EcsError,
    query::{Bundle, ComponentTuple, Filter, Visitor},
    storage::ArchetypeStorage,
};

///
/// Entry of the indirection table, indexed by slot-number - 1. The single
/// source of truth for "is this handle still valid, and where does it point".
///
struct IndexEntry {
    /// Full id currently occupying this slot-number, [EntityId::NIL] when the
    /// slot is tombstoned.
    id: EntityId,
    /// Current physical row inside the owning archetype storage.
    row: usize,
}

///
/// SceneBuilder
///
/// Collects the fixed archetype set before the scene exists. Once built, the
/// set cannot change.
///
pub struct SceneBuilder {
    archetypes: Vec<Archetype>,
}

impl SceneBuilder {
    pub fn archetype(mut self, archetype: Archetype) -> Self {
        self.archetypes.push(archetype);
        self
    }

    pub fn build(self) -> Scene {
        let mut storages: Vec<ArchetypeStorage> = Vec::with_capacity(self.archetypes.len());
        let mut by_id = HashMap::with_capacity(self.archetypes.len());
        for archetype in self.archetypes {
            let id = archetype.id();
            if by_id.contains_key(&id) {
                // First declaration wins so declaration order stays stable
                warn!("duplicate archetype {} ignored", archetype);
                continue;
            }
            by_id.insert(id, storages.len());
            storages.push(ArchetypeStorage::new(archetype));
        }
        Scene {
            archetypes: storages,
            by_id,
            index: Vec::new(),
            recycled: Vec::new(),
        }
    }
}

///
/// Scene
///
/// Owns a fixed set of archetype storages (declaration order is query order),
/// the indirection table from stable ids to physical rows, and the LIFO pool
/// of recycled ids. Strictly single-threaded; all mutation goes through
/// `&mut self`, all queries through `&self` with per-column guards.
///
pub struct Scene {
    archetypes: Vec<ArchetypeStorage>,
    by_id: HashMap<ArchetypeId, usize>,
    index: Vec<IndexEntry>,
    recycled: Vec<EntityId>,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder {
            archetypes: Vec::new(),
        }
    }

    /// Number of live entities across all archetypes.
    pub fn len(&self) -> usize {
        self.archetypes.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.iter().all(|s| s.is_empty())
    }

    ///
    /// Creates a default-initialized entity in the named archetype and
    /// returns its handle. The id is popped from the recycling pool
    /// (generation already bumped at recycle time) or freshly minted with the
    /// next unused slot-number. On [EcsError::AllocationFailure] nothing is
    /// mutated.
    ///
    pub fn create(&mut self, archetype_id: ArchetypeId) -> Result<EntityHandle, EcsError> {
        let &arch_index = self
            .by_id
            .get(&archetype_id)
            .ok_or(EcsError::NoSuchArchetype)?;
        let id = match self.recycled.last() {
            Some(&id) => id,
            None => {
                self.index.try_reserve(1)?;
                EntityId::new(self.index.len() as u32 + 1, 0)
            }
        };
        let handle = EntityHandle {
            archetype: arch_index as u32,
            id,
        };
        let row = self.archetypes[arch_index].append(handle)?;
        match self.recycled.pop() {
            Some(id) => self.index[(id.slot() - 1) as usize] = IndexEntry { id, row },
            None => self.index.push(IndexEntry { id, row }),
        }
        trace!("created {} at row {}", handle, row);
        Ok(handle)
    }

    ///
    /// Creates an entity with the given component values, e.g.
    /// `scene.create_with(id, (Health(10), Speed(2.5)))`. Every bundle type
    /// must be a declared column of the archetype; this is checked before
    /// anything is mutated.
    ///
    pub fn create_with<B: Bundle>(
        &mut self,
        archetype_id: ArchetypeId,
        bundle: B,
    ) -> Result<EntityHandle, EcsError> {
        let &arch_index = self
            .by_id
            .get(&archetype_id)
            .ok_or(EcsError::NoSuchArchetype)?;
        if !self.archetypes[arch_index].contains_all(&B::required()) {
            return Err(EcsError::NoSuchComponent);
        }
        let handle = self.create(archetype_id)?;
        let row = self.index[(handle.id.slot() - 1) as usize].row;
        bundle.write(&mut self.archetypes[arch_index], row);
        Ok(handle)
    }

    ///
    /// Destroys the entity behind `handle` by swap-and-pop; the indirection
    /// entry of whichever entity gets swapped into the freed row is updated.
    /// A stale or invalid handle is a silent no-op, so double destruction is
    /// harmless.
    ///
    pub fn destroy(&mut self, handle: EntityHandle) {
        let Some(row) = self.resolve(handle) else {
            return;
        };
        if handle.archetype as usize >= self.archetypes.len() {
            return;
        }
        self.destroy_at(handle.archetype as usize, row);
    }

    ///
    /// Destroys every entity and recycles every still-live id. Storage
    /// capacity is kept.
    ///
    pub fn clear(&mut self) {
        let mut recycled = 0usize;
        for entry in self.index.iter_mut() {
            if entry.id != EntityId::NIL {
                self.recycled.push(entry.id.bump());
                entry.id = EntityId::NIL;
                entry.row = 0;
                recycled += 1;
            }
        }
        for storage in self.archetypes.iter_mut() {
            storage.clear();
        }
        debug!("scene cleared, {} ids recycled", recycled);
    }

    ///
    /// Reference to the `T` component of the entity behind `handle`, or None
    /// when the handle is stale or the archetype has no `T` column. Callers
    /// must handle absence; a stale handle is an expected condition, not an
    /// error.
    ///
    pub fn get_component<T: Default + 'static>(&self, handle: EntityHandle) -> Option<Ref<'_, T>> {
        let row = self.resolve(handle)?;
        self.archetypes
            .get(handle.archetype as usize)?
            .try_get::<T>(row)
    }

    pub fn get_component_mut<T: Default + 'static>(
        &self,
        handle: EntityHandle,
    ) -> Option<RefMut<'_, T>> {
        let row = self.resolve(handle)?;
        self.archetypes
            .get(handle.archetype as usize)?
            .try_get_mut::<T>(row)
    }

    ///
    /// Several components of one entity at once, e.g.
    /// `let (hp, speed) = scene.get_components::<(Health, Speed)>(handle);`.
    /// Each member is independently absent; all are None on a stale handle.
    ///
    pub fn get_components<'a, Q: ComponentTuple<'a>>(&'a self, handle: EntityHandle) -> Q::Refs {
        let Some(row) = self.resolve(handle) else {
            return Q::absent();
        };
        match self.archetypes.get(handle.archetype as usize) {
            Some(storage) => Q::fetch(storage, row),
            None => Q::absent(),
        }
    }

    ///
    /// Runs `visitor` over every entity whose archetype declares all of the
    /// visitor's component parameters, e.g.
    /// `scene.for_each(|_: EntityHandle, pos: &mut Position, vel: &Velocity| ...)`.
    /// Archetypes missing a requested column are skipped wholesale; eligible
    /// archetypes are visited in declaration order, rows in ascending
    /// physical order (which differs from creation order after destructions).
    ///
    pub fn for_each<Args, F>(&self, mut visitor: F)
    where
        F: Visitor<Args>,
    {
        let required = F::required();
        for storage in self.archetypes.iter() {
            if !storage.contains_all(&required) {
                continue;
            }
            visitor.visit(storage);
        }
    }

    ///
    /// First entity matching `predicate`, in the same traversal order as
    /// [Self::for_each].
    ///
    pub fn find_entity_if<Args, F>(&self, mut predicate: F) -> Option<EntityHandle>
    where
        F: Filter<Args>,
    {
        let required = F::required();
        for storage in self.archetypes.iter() {
            if !storage.contains_all(&required) {
                continue;
            }
            for row in 0..storage.len() {
                if predicate.matches(storage, row) {
                    return Some(storage.handle(row));
                }
            }
        }
        None
    }

    ///
    /// All entities matching `predicate`, in traversal order.
    ///
    pub fn find_entities_where<Args, F>(&self, mut predicate: F) -> Vec<EntityHandle>
    where
        F: Filter<Args>,
    {
        let required = F::required();
        let mut found = Vec::new();
        for storage in self.archetypes.iter() {
            if !storage.contains_all(&required) {
                continue;
            }
            for row in 0..storage.len() {
                if predicate.matches(storage, row) {
                    found.push(storage.handle(row));
                }
            }
        }
        found
    }

    ///
    /// Destroys every entity matching `predicate` and returns how many were
    /// destroyed. Rows are scanned from the last index down to 0: a
    /// swap-remove always fills the hole from the tail, which this scan has
    /// already examined, so no row is skipped or tested twice.
    ///
    pub fn destroy_entities_where<Args, F>(&mut self, mut predicate: F) -> usize
    where
        F: Filter<Args>,
    {
        let required = F::required();
        let mut destroyed = 0usize;
        for arch_index in 0..self.archetypes.len() {
            if !self.archetypes[arch_index].contains_all(&required) {
                continue;
            }
            let mut row = self.archetypes[arch_index].len();
            while row > 0 {
                row -= 1;
                if predicate.matches(&self.archetypes[arch_index], row) {
                    self.destroy_at(arch_index, row);
                    destroyed += 1;
                }
            }
        }
        trace!("destroyed {} entities by predicate", destroyed);
        destroyed
    }

    /// Physical row of the entity behind `handle`, or None when the handle's
    /// slot-number is out of bounds, tombstoned, or carries a stale
    /// generation.
    fn resolve(&self, handle: EntityHandle) -> Option<usize> {
        let slot = handle.id.slot();
        if slot == 0 {
            return None;
        }
        let entry = self.index.get((slot - 1) as usize)?;
        if entry.id != handle.id {
            return None;
        }
        Some(entry.row)
    }

    fn destroy_at(&mut self, arch_index: usize, row: usize) {
        let storage = &mut self.archetypes[arch_index];
        let handle = storage.handle(row);
        if let Some(moved) = storage.swap_remove(row) {
            // The former tail entity now lives in the freed row
            self.index[(moved.id.slot() - 1) as usize].row = row;
        }
        self.index[(handle.id.slot() - 1) as usize].id = EntityId::NIL;
        self.recycled.push(handle.id.bump());
        trace!("destroyed {}", handle);
    }
}
