//! Recently constructed concrete types.
//!
//! Consulted when a value of the top type or a class literal is needed, so
//! that such values are drawn from types the search already knows how to
//! build.

use std::collections::VecDeque;

use seqforge_types::TypeRef;

/// Bounded most-recently-used set of concrete types.
#[derive(Debug, Clone)]
pub struct ObservedTypePool {
    capacity: usize,
    types: VecDeque<TypeRef>,
}

impl ObservedTypePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            types: VecDeque::with_capacity(capacity),
        }
    }

    /// Record `ty` as most recent. Top, void and types still carrying type
    /// variables are ignored.
    pub fn observe(&mut self, ty: &TypeRef) {
        if self.capacity == 0 || ty.is_top() || ty.is_void() || ty.has_type_vars() {
            return;
        }
        if let Some(at) = self.types.iter().position(|t| t == ty) {
            self.types.remove(at);
        }
        self.types.push_front(ty.clone());
        self.types.truncate(self.capacity);
    }

    /// Most recent first.
    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.types.contains(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mru_order_and_capacity() {
        let mut pool = ObservedTypePool::new(2);
        pool.observe(&TypeRef::class("A"));
        pool.observe(&TypeRef::class("B"));
        pool.observe(&TypeRef::class("A"));
        pool.observe(&TypeRef::class("C"));
        let names: Vec<String> = pool.types().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["C", "A"]);
    }

    #[test]
    fn test_ignores_non_concrete() {
        let mut pool = ObservedTypePool::new(4);
        pool.observe(&TypeRef::Top);
        pool.observe(&TypeRef::Void);
        pool.observe(&TypeRef::generic("Box", vec![TypeRef::var("T")]));
        assert!(pool.is_empty());
    }
}
