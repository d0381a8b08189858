//! Message, label and group result accounting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// Classification of a label file from its message outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelOutcome {
    /// At least one attempt and no failures
    Succeeded,
    /// Some successes and some failures
    Partial,
    /// Only failures
    Failed,
}

impl LabelOutcome {
    /// Classify from per-label counts; `None` when nothing was attempted
    pub fn classify(successes: usize, failures: usize) -> Option<Self> {
        match (successes, failures) {
            (0, 0) => None,
            (_, 0) => Some(LabelOutcome::Succeeded),
            (0, _) => Some(LabelOutcome::Failed),
            _ => Some(LabelOutcome::Partial),
        }
    }
}

/// Totals for one group: three label buckets and two message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResult {
    pub labels_succeeded: usize,
    pub labels_partial: usize,
    pub labels_failed: usize,
    pub messages_succeeded: usize,
    pub messages_failed: usize,
}

impl GroupResult {
    pub fn new(
        labels_succeeded: usize,
        labels_partial: usize,
        labels_failed: usize,
        messages_succeeded: usize,
        messages_failed: usize,
    ) -> Self {
        Self {
            labels_succeeded,
            labels_partial,
            labels_failed,
            messages_succeeded,
            messages_failed,
        }
    }

    pub fn labels_classified(&self) -> usize {
        self.labels_succeeded + self.labels_partial + self.labels_failed
    }

    pub fn messages_attempted(&self) -> usize {
        self.messages_succeeded + self.messages_failed
    }
}

impl AddAssign for GroupResult {
    fn add_assign(&mut self, other: Self) {
        self.labels_succeeded += other.labels_succeeded;
        self.labels_partial += other.labels_partial;
        self.labels_failed += other.labels_failed;
        self.messages_succeeded += other.messages_succeeded;
        self.messages_failed += other.messages_failed;
    }
}

impl fmt::Display for GroupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Labels: {} succeeded, {} with some errors, {} failed. Messages: {} succeeded, {} failed.",
            self.labels_succeeded,
            self.labels_partial,
            self.labels_failed,
            self.messages_succeeded,
            self.messages_failed
        )
    }
}

/// Per-label message counts, as reported when a label file is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelTally {
    pub successes: usize,
    pub failures: usize,
}

/// Running counters for one group
#[derive(Debug, Default)]
pub struct ImportAccumulator {
    label: LabelTally,
    group: GroupResult,
}

impl ImportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one message outcome against the active label
    pub fn record_message(&mut self, success: bool) {
        if success {
            self.label.successes += 1;
        } else {
            self.label.failures += 1;
        }
    }

    /// Counts for the active label so far
    pub fn label_tally(&self) -> LabelTally {
        self.label
    }

    /// Classify the active label into one of the three buckets
    ///
    /// A label with no attempted messages increments nothing.
    pub fn close_label(&mut self) -> Option<LabelOutcome> {
        let outcome = LabelOutcome::classify(self.label.successes, self.label.failures);
        match outcome {
            Some(LabelOutcome::Succeeded) => self.group.labels_succeeded += 1,
            Some(LabelOutcome::Partial) => self.group.labels_partial += 1,
            Some(LabelOutcome::Failed) => self.group.labels_failed += 1,
            None => {}
        }
        outcome
    }

    /// Fold the active label's message counts into the group totals and
    /// start a fresh label
    pub fn merge_into_group(&mut self) -> LabelTally {
        let tally = std::mem::take(&mut self.label);
        self.group.messages_succeeded += tally.successes;
        self.group.messages_failed += tally.failures;
        tally
    }

    /// Close and merge the active label in one step
    pub fn finish_label(&mut self) -> (Option<LabelOutcome>, LabelTally) {
        let outcome = self.close_label();
        let tally = self.merge_into_group();
        (outcome, tally)
    }

    pub fn group_result(&self) -> GroupResult {
        self.group
    }

    pub fn into_result(self) -> GroupResult {
        self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_rules() {
        assert_eq!(LabelOutcome::classify(0, 0), None);
        assert_eq!(LabelOutcome::classify(3, 0), Some(LabelOutcome::Succeeded));
        assert_eq!(LabelOutcome::classify(3, 2), Some(LabelOutcome::Partial));
        assert_eq!(LabelOutcome::classify(0, 4), Some(LabelOutcome::Failed));
    }

    #[test]
    fn test_all_success_label() {
        let mut acc = ImportAccumulator::new();
        for _ in 0..3 {
            acc.record_message(true);
        }
        let (outcome, tally) = acc.finish_label();

        assert_eq!(outcome, Some(LabelOutcome::Succeeded));
        assert_eq!(tally, LabelTally { successes: 3, failures: 0 });
        assert_eq!(acc.into_result(), GroupResult::new(1, 0, 0, 3, 0));
    }

    #[test]
    fn test_mixed_label_is_partial() {
        let mut acc = ImportAccumulator::new();
        for success in [true, false, true, false, true] {
            acc.record_message(success);
        }
        acc.finish_label();

        assert_eq!(acc.into_result(), GroupResult::new(0, 1, 0, 3, 2));
    }

    #[test]
    fn test_empty_label_touches_no_bucket() {
        let mut acc = ImportAccumulator::new();
        let (outcome, tally) = acc.finish_label();

        assert_eq!(outcome, None);
        assert_eq!(tally, LabelTally::default());
        assert_eq!(acc.into_result(), GroupResult::default());
    }

    #[test]
    fn test_merge_resets_label_counts() {
        let mut acc = ImportAccumulator::new();
        acc.record_message(false);
        acc.finish_label();
        acc.record_message(true);
        assert_eq!(acc.label_tally(), LabelTally { successes: 1, failures: 0 });
        acc.finish_label();

        assert_eq!(acc.group_result(), GroupResult::new(1, 0, 1, 1, 1));
    }

    #[test]
    fn test_group_result_display() {
        let display = GroupResult::new(1, 2, 3, 4, 5).to_string();
        assert_eq!(
            display,
            "Labels: 1 succeeded, 2 with some errors, 3 failed. Messages: 4 succeeded, 5 failed."
        );
    }

    #[test]
    fn test_group_result_add_assign() {
        let mut total = GroupResult::new(1, 0, 0, 3, 0);
        total += GroupResult::new(0, 1, 0, 3, 2);
        assert_eq!(total, GroupResult::new(1, 1, 0, 6, 2));
    }

    proptest! {
        #[test]
        fn prop_bucket_and_message_totals(
            labels in proptest::collection::vec(proptest::collection::vec(any::<bool>(), 0..20), 0..10)
        ) {
            let mut acc = ImportAccumulator::new();
            let mut attempted_labels = 0;
            let mut attempted_messages = 0;
            for outcomes in &labels {
                for &success in outcomes {
                    acc.record_message(success);
                }
                if !outcomes.is_empty() {
                    attempted_labels += 1;
                }
                attempted_messages += outcomes.len();
                acc.finish_label();
            }

            let result = acc.into_result();
            prop_assert_eq!(result.labels_classified(), attempted_labels);
            prop_assert_eq!(result.messages_attempted(), attempted_messages);
        }
    }
}
