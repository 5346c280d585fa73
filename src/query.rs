use std::cell::{Ref, RefMut};

use paste::paste;

use crate::{
    component::{cast, cast_mut, ComponentId, ComponentStorage},
    entity::EntityHandle,
    storage::ArchetypeStorage,
};

///
/// Fetch
///
/// One query argument: either `&T` (shared column guard) or `&mut T`
/// (mutable column guard). The guard borrows the whole column for the
/// duration of one archetype visit; items are projected per row.
///
pub trait Fetch {
    type Ty: Default + 'static;
    type Guard<'g>;
    type Item<'r>;

    fn component_id() -> ComponentId;

    /// Locks the matching column of `storage`. Only called after the
    /// archetype passed the [ArchetypeStorage::contains_all] check.
    fn lock(storage: &ArchetypeStorage) -> Self::Guard<'_>;

    fn item<'a>(guard: &'a mut Self::Guard<'_>, row: usize) -> Self::Item<'a>;
}

impl<'f, T> Fetch for &'f T
where
    T: Default + 'static,
{
    type Ty = T;
    type Guard<'g> = Ref<'g, Box<dyn ComponentStorage>>;
    type Item<'r> = &'r T;

    fn component_id() -> ComponentId {
        ComponentId::of::<T>()
    }

    fn lock(storage: &ArchetypeStorage) -> Self::Guard<'_> {
        storage
            .column(ComponentId::of::<T>())
            .expect("query locked an undeclared column")
            .borrow()
    }

    fn item<'a>(guard: &'a mut Self::Guard<'_>, row: usize) -> Self::Item<'a> {
        &cast::<T>(guard.as_ref())[row]
    }
}

impl<'f, T> Fetch for &'f mut T
where
    T: Default + 'static,
{
    type Ty = T;
    type Guard<'g> = RefMut<'g, Box<dyn ComponentStorage>>;
    type Item<'r> = &'r mut T;

    fn component_id() -> ComponentId {
        ComponentId::of::<T>()
    }

    fn lock(storage: &ArchetypeStorage) -> Self::Guard<'_> {
        storage
            .column(ComponentId::of::<T>())
            .expect("query locked an undeclared column")
            .borrow_mut()
    }

    fn item<'a>(guard: &'a mut Self::Guard<'_>, row: usize) -> Self::Item<'a> {
        &mut cast_mut::<T>(guard.as_mut())[row]
    }
}

///
/// Visitor
///
/// Adapter implemented for closures `FnMut(EntityHandle, A1, .., An)` where
/// every `Ai` is `&T` or `&mut T`. The scene skips archetypes missing any of
/// the required columns, then the visitor walks rows in ascending order.
///
pub trait Visitor<Args> {
    fn required() -> Vec<ComponentId>;

    fn visit(&mut self, storage: &ArchetypeStorage);
}

///
/// Filter
///
/// Row predicate `FnMut(EntityHandle, A1, .., An) -> bool`. Column guards are
/// taken per row, so the caller is free to mutate the storage between calls;
/// `destroy_entities_where` relies on that.
///
pub trait Filter<Args> {
    fn required() -> Vec<ComponentId>;

    fn matches(&mut self, storage: &ArchetypeStorage, row: usize) -> bool;
}

macro_rules! impl_query_fn {
    ($($arg:ident),+) => {
        paste! {
            impl<F, $($arg),+> Visitor<($($arg,)+)> for F
            where
                F: FnMut(EntityHandle, $($arg),+)
                    + for<'r> FnMut(EntityHandle, $($arg::Item<'r>),+),
                $($arg: Fetch,)+
            {
                fn required() -> Vec<ComponentId> {
                    vec![$($arg::component_id()),+]
                }

                fn visit(&mut self, storage: &ArchetypeStorage) {
                    $(let mut [<guard_ $arg:lower>] = $arg::lock(storage);)+
                    for row in 0..storage.len() {
                        let handle = storage.handle(row);
                        (self)(handle, $($arg::item(&mut [<guard_ $arg:lower>], row)),+);
                    }
                }
            }

            impl<F, $($arg),+> Filter<($($arg,)+)> for F
            where
                F: FnMut(EntityHandle, $($arg),+) -> bool
                    + for<'r> FnMut(EntityHandle, $($arg::Item<'r>),+) -> bool,
                $($arg: Fetch,)+
            {
                fn required() -> Vec<ComponentId> {
                    vec![$($arg::component_id()),+]
                }

                fn matches(&mut self, storage: &ArchetypeStorage, row: usize) -> bool {
                    let handle = storage.handle(row);
                    $(let mut [<guard_ $arg:lower>] = $arg::lock(storage);)+
                    (self)(handle, $($arg::item(&mut [<guard_ $arg:lower>], row)),+)
                }
            }
        }
    };
}

impl_query_fn!(A);
impl_query_fn!(A, B);
impl_query_fn!(A, B, C);
impl_query_fn!(A, B, C, D);

///
/// Bundle
///
/// Tuple of component values used for value-initialized entity creation.
/// Every member type must be a declared column of the target archetype.
///
pub trait Bundle {
    fn required() -> Vec<ComponentId>;

    fn write(self, storage: &mut ArchetypeStorage, row: usize);
}

macro_rules! impl_bundle {
    ($(($t:ident, $v:ident)),+) => {
        impl<$($t),+> Bundle for ($($t,)+)
        where
            $($t: Default + 'static,)+
        {
            fn required() -> Vec<ComponentId> {
                vec![$(ComponentId::of::<$t>()),+]
            }

            fn write(self, storage: &mut ArchetypeStorage, row: usize) {
                let ($($v,)+) = self;
                $(storage.set(row, $v);)+
            }
        }
    };
}

impl_bundle!((A, a));
impl_bundle!((A, a), (B, b));
impl_bundle!((A, a), (B, b), (C, c));
impl_bundle!((A, a), (B, b), (C, c), (D, d));

///
/// ComponentTuple
///
/// Multi-component lookup for one resolved entity: a tuple of independently
/// absent-able column references, all None when the handle is stale.
///
pub trait ComponentTuple<'a>: Sized {
    type Refs;

    fn fetch(storage: &'a ArchetypeStorage, row: usize) -> Self::Refs;

    fn absent() -> Self::Refs;
}

macro_rules! impl_component_tuple {
    ($($t:ident),+) => {
        impl<'a, $($t),+> ComponentTuple<'a> for ($($t,)+)
        where
            $($t: Default + 'static,)+
        {
            type Refs = ($(Option<Ref<'a, $t>>,)+);

            fn fetch(storage: &'a ArchetypeStorage, row: usize) -> Self::Refs {
                ($(storage.try_get::<$t>(row),)+)
            }

            fn absent() -> Self::Refs {
                ($(Option::<Ref<'a, $t>>::None,)+)
            }
        }
    };
}

impl_component_tuple!(A);
impl_component_tuple!(A, B);
impl_component_tuple!(A, B, C);
impl_component_tuple!(A, B, C, D);
