use std::any::{Any, TypeId};

use crate::error::EcsError;

///
/// ComponentId
///
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
#[repr(transparent)]
pub struct ComponentId(TypeId);

impl ComponentId {
    pub fn of<T: 'static>() -> Self {
        ComponentId(TypeId::of::<T>())
    }
}

///
/// ComponentStorage
///
/// Type-erased component column. Every column of one archetype storage has the
/// same length; keeping them in lockstep is the caller's job (see
/// [crate::storage::ArchetypeStorage]).
///
pub trait ComponentStorage: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Ensures room for `additional` more rows without constructing anything.
    /// On failure the column is left untouched.
    fn try_reserve(&mut self, additional: usize) -> Result<(), EcsError>;

    /// Appends one default-initialized cell. Must be preceded by a successful
    /// [ComponentStorage::try_reserve] so it cannot fail mid-row.
    fn push_default(&mut self);

    /// Removes the cell at `row` by swapping the last cell into its place.
    fn swap_remove(&mut self, row: usize);

    /// Drops every cell. Capacity is kept so the next append is cheap.
    fn clear(&mut self);
}

///
/// TypedComponentStorage
///
#[derive(Default)]
pub(crate) struct TypedComponentStorage<T> {
    data: Vec<T>,
}

impl<T: Default + 'static> ComponentStorage for TypedComponentStorage<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn try_reserve(&mut self, additional: usize) -> Result<(), EcsError> {
        Ok(self.data.try_reserve(additional)?)
    }

    fn push_default(&mut self) {
        self.data.push(T::default());
    }

    fn swap_remove(&mut self, row: usize) {
        self.data.swap_remove(row);
    }

    fn clear(&mut self) {
        self.data.clear();
    }
}

///
/// Downcast helpers
///
pub(crate) fn try_cast<T: Default + 'static>(storage: &dyn ComponentStorage) -> Option<&[T]> {
    storage
        .as_any()
        .downcast_ref::<TypedComponentStorage<T>>()
        .map(|v| v.data.as_slice())
}

pub(crate) fn try_cast_mut<T: Default + 'static>(
    storage: &mut dyn ComponentStorage,
) -> Option<&mut [T]> {
    storage
        .as_any_mut()
        .downcast_mut::<TypedComponentStorage<T>>()
        .map(|v| v.data.as_mut_slice())
}

pub(crate) fn cast<T: Default + 'static>(storage: &dyn ComponentStorage) -> &[T] {
    try_cast(storage).expect("column type mismatch")
}

pub(crate) fn cast_mut<T: Default + 'static>(storage: &mut dyn ComponentStorage) -> &mut [T] {
    try_cast_mut(storage).expect("column type mismatch")
}

pub(crate) fn set_cell<T: Default + 'static>(
    storage: &mut dyn ComponentStorage,
    row: usize,
    value: T,
) {
    cast_mut::<T>(storage)[row] = value;
}

///
/// Tests
///
#[cfg(test)]
mod test {
    use super::{cast, cast_mut, try_cast, ComponentStorage, TypedComponentStorage};

    #[derive(Copy, Clone, Default, Debug, PartialEq)]
    struct A {
        pub x: f32,
        pub y: f32,
    }

    #[test]
    fn push_and_cast() {
        let mut columns: Vec<Box<dyn ComponentStorage>> = vec![
            Box::new(TypedComponentStorage::<i32>::default()),
            Box::new(TypedComponentStorage::<A>::default()),
        ];

        let c1 = columns[0].as_mut();
        c1.try_reserve(3).unwrap();
        c1.push_default();
        c1.push_default();
        c1.push_default();
        cast_mut::<i32>(c1).copy_from_slice(&[1, 2, 3]);
        assert_eq!(&[1, 2, 3], cast::<i32>(columns[0].as_ref()));

        let c2 = columns[1].as_mut();
        c2.try_reserve(1).unwrap();
        c2.push_default();
        cast_mut::<A>(c2)[0] = A { x: 1., y: 2. };
        assert_eq!(A { x: 1., y: 2. }, cast::<A>(columns[1].as_ref())[0]);

        assert!(try_cast::<f64>(columns[0].as_ref()).is_none());
    }

    #[test]
    fn swap_remove_moves_tail() {
        let mut column = TypedComponentStorage::<i32>::default();
        column.try_reserve(4).unwrap();
        for _ in 0..4 {
            column.push_default();
        }
        cast_mut::<i32>(&mut column).copy_from_slice(&[10, 20, 30, 40]);

        column.swap_remove(0);
        assert_eq!(&[40, 20, 30], cast::<i32>(&column));

        column.swap_remove(2);
        assert_eq!(&[40, 20], cast::<i32>(&column));
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut column = TypedComponentStorage::<i32>::default();
        column.try_reserve(8).unwrap();
        for _ in 0..8 {
            column.push_default();
        }
        let cap = column.capacity();
        column.clear();
        assert_eq!(0, column.len());
        assert_eq!(cap, column.capacity());
    }
}
