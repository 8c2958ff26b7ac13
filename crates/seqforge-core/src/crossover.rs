//! Single-point crossover.
//!
//! ```text
//!   left    a0 a1 a2 | a3 a4          cut_left  = 3
//!   right   b0 | b1 b2 b3             cut_right = 1
//!   child   a0 a1 a2 b1' b2' b3'
//! ```
//!
//! The tail is not copied verbatim: each call in it is appended again with
//! its receiver and parameters resolved against the child's own prefix.
//! Literals and `null` are copied with fresh ids. Cell assignments are
//! dropped because their arrays do not exist in the child.

use tracing::{debug, trace};

use crate::errors::{EngineError, EngineResult};
use crate::resolver::Resolver;
use crate::sequence::{Sequence, StatementKind, VariableKind};

pub struct Recombiner<'r, 'c> {
    resolver: &'r mut Resolver<'c>,
}

impl<'r, 'c> Recombiner<'r, 'c> {
    pub fn new(resolver: &'r mut Resolver<'c>) -> Self {
        Self { resolver }
    }

    /// Combine `left[..cut_left]` with `right[cut_right..]`.
    ///
    /// When the child would exceed `max_length` (and lengths are checked) an
    /// unmodified copy of `left` is returned instead.
    pub fn crossover(
        &mut self,
        left: &Sequence,
        right: &Sequence,
        cut_left: usize,
        cut_right: usize,
    ) -> EngineResult<Sequence> {
        if cut_left > left.len() {
            return Err(EngineError::structural(
                cut_left,
                format!("crossover point past end of left sequence of length {}", left.len()),
            ));
        }
        if cut_right > right.len() {
            return Err(EngineError::structural(
                cut_right,
                format!("crossover point past end of right sequence of length {}", right.len()),
            ));
        }

        let mut child = left.prefix(cut_left);
        let constraints = self.resolver.constraints();
        for stmt in &right.statements()[cut_right..] {
            match &stmt.kind {
                StatementKind::Constructor { op, .. }
                | StatementKind::Method { op, .. }
                | StatementKind::Field { op, .. } => {
                    if !constraints.is_eligible(op, None, &child, child.len()) {
                        trace!(op = %op, "skipping ineligible call in crossover");
                        continue;
                    }
                    self.resolver.append_operation(&mut child, op)?;
                }
                StatementKind::Literal(_) | StatementKind::Null | StatementKind::Array { .. } => {
                    child.push(
                        stmt.kind.clone(),
                        stmt.result.ty.clone(),
                        stmt.result.kind.clone(),
                        stmt.result.distance,
                    )?;
                }
                StatementKind::Assignment { .. } => {
                    if let VariableKind::FieldAccess { source, field } = &stmt.result.kind {
                        let target = match source {
                            Some(_) => {
                                let end = child.len();
                                Some(self.resolver.resolve(&mut child, &field.owner, end, 0, false)?)
                            }
                            None => None,
                        };
                        let end = child.len();
                        self.resolver.add_field_assignment(&mut child, target, field, end)?;
                    }
                }
            }
        }

        let config = self.resolver.config();
        if config.check_max_length && child.len() > config.max_length {
            debug!(
                len = child.len(),
                max = config.max_length,
                "crossover offspring too long, keeping left parent"
            );
            return Ok(left.clone());
        }
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::test_fixtures::{foo_catalog, foo_set_x_sequence};
    use seqforge_types::TypeRef;

    #[test]
    fn test_tail_is_resolved_against_left_prefix() {
        let (catalog, _) = foo_catalog();
        let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(4));
        let (left, left_ids) = foo_set_x_sequence();
        let (right, _) = foo_set_x_sequence();
        let child = Recombiner::new(&mut resolver)
            .crossover(&left, &right, 1, 2)
            .unwrap();
        assert!(child.is_valid(), "{}", child);
        assert_eq!(child.statement(0).map(|s| s.id()), Some(left_ids[0]));
        let last = child.statement(child.len() - 1).unwrap();
        assert_eq!(last.result.ty, TypeRef::Void, "setX is appended last");
    }

    #[test]
    fn test_too_long_child_returns_left() {
        let (catalog, _) = foo_catalog();
        let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(4).with_max_length(3));
        let (left, _) = foo_set_x_sequence();
        let (right, _) = foo_set_x_sequence();
        let child = Recombiner::new(&mut resolver)
            .crossover(&left, &right, 3, 0)
            .unwrap();
        assert_eq!(child, left);
    }

    #[test]
    fn test_cut_out_of_range() {
        let (catalog, _) = foo_catalog();
        let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(4));
        let (left, _) = foo_set_x_sequence();
        let err = Recombiner::new(&mut resolver)
            .crossover(&left, &left, 4, 0)
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_literals_are_copied_with_fresh_ids() {
        let (catalog, _) = foo_catalog();
        let mut resolver = Resolver::new(&catalog, EngineConfig::deterministic(6));
        let (left, _) = foo_set_x_sequence();
        let (right, _) = foo_set_x_sequence();
        let child = Recombiner::new(&mut resolver)
            .crossover(&left, &right, 3, 1)
            .unwrap();
        assert!(child.is_valid(), "{}", child);
        assert!(child.len() >= 5);
        let ids: std::collections::HashSet<_> = child.iter().map(|s| s.id()).collect();
        assert_eq!(ids.len(), child.len());
        assert!(child.statement(3).unwrap().is_literal());
    }
}
