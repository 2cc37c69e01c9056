//
// Copyright (c) The Vireo Project Contributors
//
// SPDX-License-Identifier: MIT
//

pub use generational_arena::Index;

// Object arena addressed by stable indexes, so graph-shaped structures
// (template inheritance) can hold cross-references without aliasing issues.
#[derive(Debug)]
pub struct Arena<T>(generational_arena::Arena<T>);

// ===== impl Arena =====

impl<T> Arena<T> {
    pub(crate) fn insert(&mut self, value: T) -> Index {
        self.0.insert(value)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Arena<T> {
        Arena(Default::default())
    }
}

impl<T> std::ops::Index<Index> for Arena<T> {
    type Output = T;

    fn index(&self, index: Index) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> std::ops::IndexMut<Index> for Arena<T> {
    fn index_mut(&mut self, index: Index) -> &mut Self::Output {
        &mut self.0[index]
    }
}
