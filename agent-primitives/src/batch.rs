//! Best-effort batch processing.

/// An item that failed, together with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure<I, E> {
    /// The input item that could not be processed.
    pub item: I,
    /// Why it failed.
    pub error: E,
}

/// Partial results of processing a batch: every item lands in exactly one list.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T, I, E> {
    /// Outputs of the items that succeeded, in input order.
    pub succeeded: Vec<T>,
    /// Items that failed, in input order.
    pub failed: Vec<BatchFailure<I, E>>,
}

impl<T, I, E> Default for BatchOutcome<T, I, E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T, I, E> BatchOutcome<T, I, E> {
    /// Returns `true` when no item failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the total number of processed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns `true` when the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies `op` to every item, continuing past failures.
pub fn process_batch<I, T, E, F>(items: impl IntoIterator<Item = I>, mut op: F) -> BatchOutcome<T, I, E>
where
    F: FnMut(&I) -> Result<T, E>,
{
    let mut outcome = BatchOutcome::default();
    for item in items {
        match op(&item) {
            Ok(output) => outcome.succeeded.push(output),
            Err(error) => outcome.failed.push(BatchFailure { item, error }),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_do_not_stop_the_batch() {
        let outcome = process_batch([1, 2, 3, 4], |n| {
            if n % 2 == 0 { Err(format!("{n} is even")) } else { Ok(n * 10) }
        });
        assert_eq!(outcome.succeeded, vec![10, 30]);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.failed[0].item, 2);
        assert_eq!(outcome.failed[1].error, "4 is even");
        assert_eq!(outcome.len(), 4);
        assert!(!outcome.is_complete());
    }
}
