use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

/// A side effect recorded by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub action: String,
    pub effect: String,
}

/// Per-run context shared by every step of one transaction.
///
/// Steps record the side effects they perform and undo, so a run can be
/// audited after the fact.
#[derive(Debug)]
pub struct UnitOfWork {
    id: Uuid,
    journal: Mutex<Vec<JournalEntry>>,
}

impl UnitOfWork {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            journal: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record(&self, action: &str, effect: impl Into<String>) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(JournalEntry {
                action: action.to_string(),
                effect: effect.into(),
            });
    }

    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}
