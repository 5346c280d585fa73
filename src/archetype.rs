use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::Display,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

use fxhash::FxHasher32;
use itertools::Itertools;

use crate::component::{ComponentId, ComponentStorage, TypedComponentStorage};

///
/// ArchetypeId
///
/// Identity of a component set: a hash over the sorted component ids, so the
/// declaration order of components does not matter.
///
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct ArchetypeId(u32);

impl Display for ArchetypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArchetypeId({})", self.0)
    }
}

///
/// ColumnFactory
///
trait ColumnFactory {
    fn create(&self) -> Box<dyn ComponentStorage>;
}

#[derive(Default)]
struct TypedColumnFactory<T>
where
    T: Default + 'static,
{
    _data: PhantomData<T>,
}

impl<T> ColumnFactory for TypedColumnFactory<T>
where
    T: Default + 'static,
{
    fn create(&self) -> Box<dyn ComponentStorage> {
        Box::new(TypedComponentStorage::<T>::default())
    }
}

///
/// ArchetypeBuilder
///
pub struct ArchetypeBuilder {
    factories: HashMap<ComponentId, Arc<dyn ColumnFactory>>,
}

impl ArchetypeBuilder {
    pub fn new() -> Self {
        ArchetypeBuilder {
            factories: HashMap::with_capacity(4),
        }
    }

    pub fn add<T: Default + 'static>(mut self) -> Self {
        self.factories.insert(
            ComponentId::of::<T>(),
            Arc::new(TypedColumnFactory::<T>::default()),
        );
        self
    }

    pub fn build(self) -> Archetype {
        let mut hasher = FxHasher32::default();
        for id in self.factories.keys().sorted() {
            id.hash(&mut hasher);
        }
        Archetype {
            id: ArchetypeId(hasher.finish() as u32),
            factories: self.factories,
        }
    }
}

impl Default for ArchetypeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

///
/// Archetype
///
/// Immutable descriptor of one fixed component set. The set is declared once,
/// before the owning scene is built, and never changes afterwards.
///
#[derive(Clone)]
pub struct Archetype {
    id: ArchetypeId,
    factories: HashMap<ComponentId, Arc<dyn ColumnFactory>>,
}

impl Archetype {
    #[inline(always)]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    pub fn contains(&self, comp_id: ComponentId) -> bool {
        self.factories.contains_key(&comp_id)
    }

    pub fn component_count(&self) -> usize {
        self.factories.len()
    }

    /// Creates one empty column per declared component type.
    pub(crate) fn new_columns(&self) -> HashMap<ComponentId, RefCell<Box<dyn ComponentStorage>>> {
        self.factories
            .iter()
            .map(|(id, f)| (*id, RefCell::new(f.create())))
            .collect()
    }
}

impl PartialEq for Archetype {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Archetype {}

impl Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Archetype(id={}, components={})",
            self.id,
            self.factories.len()
        )
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype").field("id", &self.id).finish()
    }
}

///
/// Macros
///
#[macro_export]
macro_rules! archetype {
    ($($component:ty),* $(,)?) => {
        $crate::archetype::ArchetypeBuilder::new()
        $(.add::<$component>())*
        .build()
    };
}

pub use archetype;
