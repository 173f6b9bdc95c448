/// Diagnostics collector threaded through the extraction core.
///
/// The core never logs or raises on malformed data; it records what it
/// skipped here and keeps going. The driver drains this into `tracing`
/// and the run summary after the batch completes.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
    /// Exclusion tuples seen by the table builder. These never produce
    /// mapping rows (no cross-source suppression pass exists), so the
    /// count is surfaced to operators instead of dropping them silently.
    pub excluded_tuples: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Fold another collector into this one (used when merging
    /// per-document results into the batch total).
    pub fn merge(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.excluded_tuples += other.excluded_tuples;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_combines_warnings_and_counts() {
        let mut a = Diagnostics::new();
        a.warn("first");
        a.excluded_tuples = 2;

        let mut b = Diagnostics::new();
        b.warn("second");
        b.excluded_tuples = 1;

        a.merge(b);
        assert_eq!(a.warnings(), &["first", "second"]);
        assert_eq!(a.excluded_tuples, 3);
    }
}
