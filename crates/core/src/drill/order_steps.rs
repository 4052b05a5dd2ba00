use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{DrillKind, Step};

use super::{Drill, DrillError, DrillState, Verdict};

/// How many shuffles `reshuffle` tries before accepting a repeat.
const MAX_RESHUFFLE_TRIES: usize = 32;

/// Put-the-steps-in-order drill.
///
/// The learner rearranges a shuffled working copy; the canonical order is
/// never touched and is the only thing grading compares against.
#[derive(Debug, Clone)]
pub struct OrderStepsDrill {
    canonical: Vec<String>,
    /// Indices into `canonical`, in the learner's current order.
    working: Vec<usize>,
    state: DrillState,
}

impl OrderStepsDrill {
    /// Creates the drill with a uniformly shuffled working copy.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if `canonical` is empty.
    pub fn new(canonical: Vec<String>) -> Result<Self, DrillError> {
        Self::with_rng(canonical, &mut rand::rng())
    }

    /// Same as [`OrderStepsDrill::new`] with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if `canonical` is empty.
    pub fn with_rng<R: Rng + ?Sized>(
        canonical: Vec<String>,
        rng: &mut R,
    ) -> Result<Self, DrillError> {
        let mut drill = Self::unshuffled(canonical)?;
        drill.working.shuffle(rng);
        Ok(drill)
    }

    /// Creates the drill with the working copy in canonical order.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if `canonical` is empty.
    pub fn unshuffled(canonical: Vec<String>) -> Result<Self, DrillError> {
        if canonical.is_empty() {
            return Err(DrillError::NothingToGrade(DrillKind::OrderSteps));
        }
        let working = (0..canonical.len()).collect();
        Ok(Self {
            canonical,
            working,
            state: DrillState::default(),
        })
    }

    /// Canonical step texts of `steps`, shuffled.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::NothingToGrade` if there are no steps.
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Result<Self, DrillError> {
        Self::new(steps.into_iter().map(|s| s.text().to_string()).collect())
    }

    #[must_use]
    pub fn canonical(&self) -> &[String] {
        &self.canonical
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// The learner's current order.
    #[must_use]
    pub fn working_order(&self) -> Vec<&str> {
        self.texts(&self.working)
    }

    #[must_use]
    pub fn is_in_order(&self) -> bool {
        self.texts(&self.working)
            .iter()
            .zip(&self.canonical)
            .all(|(w, c)| *w == c.as_str())
    }

    /// Swaps the step at `pos` with the one above it.
    ///
    /// # Errors
    ///
    /// `DrillError::Completed` once the drill is done, or
    /// `DrillError::IndexOutOfRange` if `pos` is 0 or past the end.
    pub fn move_up(&mut self, pos: usize) -> Result<(), DrillError> {
        self.state.ensure_open()?;
        if pos == 0 {
            return Err(self.out_of_range(pos));
        }
        self.swap(pos - 1, pos)
    }

    /// Swaps the step at `pos` with the one below it.
    ///
    /// # Errors
    ///
    /// `DrillError::Completed` once the drill is done, or
    /// `DrillError::IndexOutOfRange` if `pos` is the last position or past it.
    pub fn move_down(&mut self, pos: usize) -> Result<(), DrillError> {
        self.state.ensure_open()?;
        let below = pos.checked_add(1).ok_or_else(|| self.out_of_range(pos))?;
        self.swap(pos, below)
    }

    /// Swaps any two positions.
    ///
    /// # Errors
    ///
    /// `DrillError::Completed` once the drill is done, or
    /// `DrillError::IndexOutOfRange` for a bad position.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), DrillError> {
        self.state.ensure_open()?;
        self.check(a)?;
        self.check(b)?;
        self.working.swap(a, b);
        Ok(())
    }

    /// Takes the step at `from` out and inserts it at `to`.
    ///
    /// # Errors
    ///
    /// `DrillError::Completed` once the drill is done, or
    /// `DrillError::IndexOutOfRange` for a bad position.
    pub fn reposition(&mut self, from: usize, to: usize) -> Result<(), DrillError> {
        self.state.ensure_open()?;
        self.check(from)?;
        self.check(to)?;
        let item = self.working.remove(from);
        self.working.insert(to, item);
        Ok(())
    }

    /// Deals a new random order after a failed check.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::Completed` once the drill is done.
    pub fn reshuffle(&mut self) -> Result<(), DrillError> {
        self.reshuffle_with(&mut rand::rng())
    }

    /// Deals a new order that reads differently from the current one when
    /// the steps allow it. Gives up after a bounded number of tries, so a
    /// list of identical texts still reshuffles.
    ///
    /// # Errors
    ///
    /// Returns `DrillError::Completed` once the drill is done.
    pub fn reshuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), DrillError> {
        self.state.ensure_open()?;
        if self.working.len() < 2 {
            return Ok(());
        }
        let previous = self.working.clone();
        for _ in 0..MAX_RESHUFFLE_TRIES {
            self.working.shuffle(rng);
            if self.texts(&self.working) != self.texts(&previous) {
                break;
            }
        }
        Ok(())
    }

    fn texts(&self, order: &[usize]) -> Vec<&str> {
        order.iter().map(|&i| self.canonical[i].as_str()).collect()
    }

    fn check(&self, pos: usize) -> Result<(), DrillError> {
        if pos < self.working.len() {
            Ok(())
        } else {
            Err(self.out_of_range(pos))
        }
    }

    fn out_of_range(&self, index: usize) -> DrillError {
        DrillError::IndexOutOfRange {
            index,
            len: self.working.len(),
        }
    }
}

impl Drill for OrderStepsDrill {
    type Attempt = ();

    fn kind(&self) -> DrillKind {
        DrillKind::OrderSteps
    }

    fn submit(&mut self, _attempt: &()) -> Verdict {
        let in_order = self.is_in_order();
        self.state.settle(DrillKind::OrderSteps, || {
            (!in_order).then(|| "Not quite in order yet. Try again.".to_string())
        })
    }

    fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    fn attempts(&self) -> u32 {
        self.state.attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn abc() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into()]
    }

    #[test]
    fn canonical_order_grades_correct() {
        let mut drill = OrderStepsDrill::unshuffled(abc()).unwrap();
        let verdict = drill.submit(&());
        assert!(verdict.correct);
        assert!(drill.is_complete());
    }

    #[test]
    fn any_adjacent_swap_grades_incorrect() {
        let steps: Vec<String> = ["Lights", "Mirrors", "Horn", "Wipers", "Gauges"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        for pos in 0..steps.len() - 1 {
            let mut drill = OrderStepsDrill::unshuffled(steps.clone()).unwrap();
            drill.move_down(pos).unwrap();
            assert!(!drill.submit(&()).correct, "swap at {pos} should fail");
            assert!(!drill.is_complete());
        }
    }

    #[test]
    fn reordering_a_shuffle_back_to_canonical_completes() {
        let mut drill = OrderStepsDrill::unshuffled(abc()).unwrap();
        // C, A, B
        drill.reposition(2, 0).unwrap();
        assert_eq!(drill.working_order(), ["C", "A", "B"]);

        // A, C, B is wrong and the drill stays open
        drill.move_down(0).unwrap();
        assert_eq!(drill.working_order(), ["A", "C", "B"]);
        assert!(!drill.submit(&()).correct);

        drill.move_up(2).unwrap();
        assert_eq!(drill.working_order(), ["A", "B", "C"]);
        assert!(drill.submit(&()).newly_completed);
    }

    #[test]
    fn shuffle_is_a_permutation_of_canonical() {
        let mut rng = StdRng::seed_from_u64(7);
        let drill = OrderStepsDrill::with_rng(abc(), &mut rng).unwrap();
        let mut seen = drill.working_order();
        seen.sort_unstable();
        assert_eq!(seen, ["A", "B", "C"]);
    }

    #[test]
    fn shuffle_reaches_every_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..300 {
            let drill = OrderStepsDrill::with_rng(abc(), &mut rng).unwrap();
            seen.insert(drill.working_order().join(""));
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn reshuffle_never_repeats_the_previous_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut drill = OrderStepsDrill::with_rng(abc(), &mut rng).unwrap();
        for _ in 0..50 {
            let before: Vec<String> = drill
                .working_order()
                .iter()
                .map(|s| (*s).to_string())
                .collect();
            drill.reshuffle_with(&mut rng).unwrap();
            assert_ne!(drill.working_order(), before);
        }
    }

    #[test]
    fn reshuffle_of_identical_texts_terminates() {
        let mut drill = OrderStepsDrill::unshuffled(vec!["Same".into(), "Same".into()]).unwrap();
        drill.reshuffle().unwrap();
        assert!(drill.submit(&()).correct);
    }

    #[test]
    fn mutations_are_rejected_after_completion() {
        let mut drill = OrderStepsDrill::unshuffled(abc()).unwrap();
        drill.submit(&());
        assert!(matches!(drill.swap(0, 1), Err(DrillError::Completed)));
        assert!(matches!(drill.reshuffle(), Err(DrillError::Completed)));
        assert_eq!(drill.working_order(), ["A", "B", "C"]);
    }

    #[test]
    fn out_of_range_positions_are_errors() {
        let mut drill = OrderStepsDrill::unshuffled(abc()).unwrap();
        assert!(matches!(
            drill.move_up(0),
            Err(DrillError::IndexOutOfRange { index: 0, len: 3 })
        ));
        assert!(matches!(
            drill.move_down(2),
            Err(DrillError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            drill.move_down(usize::MAX),
            Err(DrillError::IndexOutOfRange {
                index: usize::MAX,
                len: 3
            })
        ));
        assert_eq!(drill.working_order(), ["A", "B", "C"]);
        assert!(drill.reposition(5, 0).is_err());
    }

    #[test]
    fn empty_step_list_cannot_form_a_drill() {
        assert!(matches!(
            OrderStepsDrill::new(Vec::new()),
            Err(DrillError::NothingToGrade(DrillKind::OrderSteps))
        ));
    }
}
