use crate::{Error, Result};

/// Per-target outcomes of a multi-target operation, in input order.
///
/// Nothing here short-circuits: callers push every outcome and decide
/// overall success once the input list is exhausted.
#[derive(Debug)]
pub struct BatchReport<T> {
    outcomes: Vec<(String, Result<T>)>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target: impl Into<String>, outcome: Result<T>) {
        self.outcomes.push((target.into(), outcome));
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|(t, r)| r.as_ref().ok().map(|v| (t.as_str(), v)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|(t, r)| r.as_ref().err().map(|e| (t.as_str(), e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Collapses the report: the single error when exactly one target was
    /// processed, `BatchFailed` when any of several failed.
    pub fn into_result(self) -> Result<Vec<(String, T)>> {
        let total = self.outcomes.len();
        let failed = self.failure_count();
        if failed == 0 {
            return Ok(self
                .outcomes
                .into_iter()
                .filter_map(|(t, r)| r.ok().map(|v| (t, v)))
                .collect());
        }
        if total == 1 {
            if let Some((_, Err(e))) = self.outcomes.into_iter().next() {
                return Err(e);
            }
        }
        Err(Error::BatchFailed { failed, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_going_after_failures() {
        let mut report = BatchReport::new();
        report.record("1", Ok(10));
        report.record("2", Err(Error::NotFound("2".into())));
        report.record("3", Ok(30));
        assert_eq!(report.len(), 3);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.is_success());
        assert_eq!(report.failed().next().map(|(t, _)| t), Some("2"));
        assert!(matches!(
            report.into_result(),
            Err(Error::BatchFailed { failed: 1, total: 3 })
        ));
    }

    #[test]
    fn single_failure_surfaces_original_error() {
        let mut report: BatchReport<()> = BatchReport::new();
        report.record("9", Err(Error::NotFound("9".into())));
        assert!(matches!(report.into_result(), Err(Error::NotFound(_))));
    }

    #[test]
    fn all_ok() {
        let mut report = BatchReport::new();
        report.record("a", Ok(1));
        assert_eq!(report.into_result().unwrap(), vec![("a".to_string(), 1)]);
    }
}
