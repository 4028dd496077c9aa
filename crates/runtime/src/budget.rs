/// Per-batch allowance of work units (one marker, one row).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchBudget {
    left: u32,
}

impl BatchBudget {
    pub fn new(units: u32) -> Self {
        Self { left: units }
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    /// Takes `units` if that many are left.
    pub fn try_consume(&mut self, units: u32) -> bool {
        match self.left.checked_sub(units) {
            Some(left) => {
                self.left = left;
                true
            }
            None => false,
        }
    }
}

/// Result of draining one batch from a backlog.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub done: usize,
    pub remaining: usize,
}

impl BatchProgress {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchBudget, BatchProgress};

    #[test]
    fn refuses_more_than_is_left() {
        let mut budget = BatchBudget::new(3);
        assert!(budget.try_consume(2));
        assert!(!budget.try_consume(2));
        assert_eq!(budget.left(), 1);
        assert!(budget.try_consume(1));
        assert!(!budget.try_consume(1));
    }

    #[test]
    fn zero_budget_does_nothing() {
        let mut budget = BatchBudget::new(0);
        assert!(!budget.try_consume(1));
    }

    #[test]
    fn progress_completes_when_backlog_is_empty() {
        assert!(BatchProgress { done: 300, remaining: 0 }.is_complete());
        assert!(!BatchProgress { done: 300, remaining: 100 }.is_complete());
    }
}
