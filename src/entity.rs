use std::fmt::Display;

///
/// EntityId
///
/// Packed 64-bit entity identifier: low 32 bits hold a dense, reusable
/// slot-number (1-based, 0 is reserved for [EntityId::NIL]), high 32 bits hold
/// a generation counter which is bumped every time the slot-number is
/// recycled. Two ids with the same slot-number but different generations refer
/// to different entities.
///
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Reserved id of a tombstoned index slot. Never assigned to a live entity.
    pub const NIL: EntityId = EntityId(0);

    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        EntityId(((generation as u64) << 32) | slot as u64)
    }

    /// 1-based slot-number into the scene's indirection table.
    #[inline(always)]
    pub fn slot(self) -> u32 {
        (self.0 & u32::MAX as u64) as u32
    }

    #[inline(always)]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Same slot-number, next generation. Applied once at recycle time.
    #[inline]
    pub(crate) fn bump(self) -> Self {
        EntityId(self.0.wrapping_add(1u64 << 32))
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityId(slot={}, gen={})", self.slot(), self.generation())
    }
}

///
/// EntityHandle
///
/// Stable external reference to an entity: the declaration index of the owning
/// archetype (fixed for the entity's lifetime) plus the generation-tagged id.
/// Plain copyable data, safe to cache; validity is only proven by the scene's
/// indirection table at time of use.
///
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityHandle {
    pub archetype: u32,
    pub id: EntityId,
}

impl Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityHandle(archetype={}, {})", self.archetype, self.id)
    }
}
