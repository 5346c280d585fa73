//! Dense archetype entity storage with generational handles.
//!
//! Entities are grouped by their exact component set into structure-of-arrays
//! tables; a [scene::Scene] owns the tables, hands out stable
//! [entity::EntityHandle]s and runs component queries across every archetype
//! that satisfies them.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod scene;
pub mod storage;

pub use archetype::{Archetype, ArchetypeBuilder, ArchetypeId};
pub use component::ComponentId;
pub use entity::{EntityHandle, EntityId};
pub use error::EcsError;
pub use query::{Bundle, ComponentTuple, Fetch, Filter, Visitor};
pub use scene::{Scene, SceneBuilder};
pub use storage::ArchetypeStorage;
