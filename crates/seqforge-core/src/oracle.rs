//! Scoring oracle collaborator.
//!
//! Scores are minimized: a lower primary value is better, and ties are
//! broken by the secondary objectives in order, each also lower-is-better.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::EngineResult;
use crate::sequence::Sequence;

/// Fitness of one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub primary: f64,
    #[serde(default)]
    pub secondaries: Vec<f64>,
}

impl Score {
    pub fn new(primary: f64) -> Self {
        Self {
            primary,
            secondaries: Vec::new(),
        }
    }

    /// Builder method: set the ordered secondary objectives.
    pub fn with_secondaries(mut self, secondaries: Vec<f64>) -> Self {
        self.secondaries = secondaries;
        self
    }

    /// Lexicographic comparison of primary then secondaries.
    ///
    /// A missing secondary compares equal. NaN ranks worse than any number.
    pub fn compare(&self, other: &Score) -> Ordering {
        match compare_objective(self.primary, other.primary) {
            Ordering::Equal => {}
            decided => return decided,
        }
        for (a, b) in self.secondaries.iter().zip(&other.secondaries) {
            match compare_objective(*a, *b) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        Ordering::Equal
    }

    pub fn is_worse_than(&self, other: &Score) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

fn compare_objective(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// External fitness function.
///
/// `score` may return [`EngineError::BudgetExhausted`](crate::EngineError)
/// (or any other error) to abort mid-computation; callers then keep their
/// last known-good sequence.
pub trait ScoringOracle {
    fn score(&mut self, sequence: &Sequence) -> EngineResult<Score>;

    /// Whether `candidate` ranks below `reference`.
    fn is_worse(&self, candidate: &Score, reference: &Score) -> bool {
        candidate.is_worse_than(reference)
    }
}

impl<F> ScoringOracle for F
where
    F: FnMut(&Sequence) -> EngineResult<Score>,
{
    fn score(&mut self, sequence: &Sequence) -> EngineResult<Score> {
        self(sequence)
    }
}

/// Wraps an oracle and appends the sequence length as the last secondary
/// objective, so shorter sequences win ties.
#[derive(Debug, Clone)]
pub struct LengthAwareOracle<O> {
    inner: O,
}

impl<O: ScoringOracle> LengthAwareOracle<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: ScoringOracle> ScoringOracle for LengthAwareOracle<O> {
    fn score(&mut self, sequence: &Sequence) -> EngineResult<Score> {
        let mut score = self.inner.score(sequence)?;
        score.secondaries.push(sequence.len() as f64);
        Ok(score)
    }

    fn is_worse(&self, candidate: &Score, reference: &Score) -> bool {
        self.inner.is_worse(candidate, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::foo_set_x_sequence;

    #[test]
    fn test_primary_dominates() {
        let a = Score::new(1.0).with_secondaries(vec![0.0]);
        let b = Score::new(2.0).with_secondaries(vec![-10.0]);
        assert!(b.is_worse_than(&a));
        assert!(!a.is_worse_than(&b));
    }

    #[test]
    fn test_secondaries_break_ties_in_order() {
        let a = Score::new(1.0).with_secondaries(vec![3.0, 9.0]);
        let b = Score::new(1.0).with_secondaries(vec![3.0, 4.0]);
        assert!(a.is_worse_than(&b));
        assert!(!b.is_worse_than(&a));
        assert!(!a.is_worse_than(&a.clone()), "equal scores are not worse");
    }

    #[test]
    fn test_nan_is_worst() {
        assert!(Score::new(f64::NAN).is_worse_than(&Score::new(1e9)));
        assert!(!Score::new(1e9).is_worse_than(&Score::new(f64::NAN)));
    }

    #[test]
    fn test_length_aware_oracle_appends_length() {
        let (seq, _) = foo_set_x_sequence();
        let mut oracle = LengthAwareOracle::new(|_: &Sequence| -> EngineResult<Score> {
            Ok(Score::new(0.5))
        });
        let score = oracle.score(&seq).unwrap();
        assert_eq!(score.secondaries, vec![3.0]);
    }
}
