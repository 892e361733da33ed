use log::debug;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Truncate,
}

/// A row mutation performed through the session.
///
/// `identity` is set for single-entity saves and deletes, and `None` for
/// builder statements that may touch many rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub identity: Option<i64>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(table: &str, identity: Option<i64>, kind: ChangeKind) -> Self {
        Self {
            table: table.to_string(),
            identity,
            kind,
        }
    }
}

/// Receives change events synchronously, on the thread that made the change.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

impl ChangeObserver for Sender<ChangeEvent> {
    fn on_change(&self, event: &ChangeEvent) {
        if self.send(event.clone()).is_err() {
            debug!("Change event for {} dropped: receiver closed", event.table);
        }
    }
}
