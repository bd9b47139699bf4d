//! Coordinated-completion tracker
//!
//! Lets N independent clients each report "done" exactly once to a shared
//! counter, while a single elected coordinator waits for the counter to reach
//! zero and then aggregates the records the clients published.
//!
//! # Run lifecycle
//!
//! ```text
//! Uninitialized --(singleton elected)--> Awaiting(N) --> Completed
//!                                                    \--> TimedOut
//! ```
//!
//! Terminal states are final. A new run uses a new [`RunNamespace`].
//!
//! # Roles
//!
//! - [`Coordinator`]: elected once per namespace; initializes the counter,
//!   waits, aggregates
//! - [`Worker`]: publishes its records, then counts down exactly once

pub mod coordinator;
pub mod worker;

pub use coordinator::{Coordinator, RunSummary};
pub use worker::Worker;

use crate::store::{SharedStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default run basename
pub const DEFAULT_BASENAME: &str = "externalClientsRunning";

/// Names of the shared objects belonging to one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunNamespace {
    basename: String,
}

impl RunNamespace {
    pub fn new(basename: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
        }
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Map holding the coordinator election flag
    pub fn election_map(&self) -> &str {
        &self.basename
    }

    /// Key of the election flag inside `election_map`
    pub fn election_key(&self) -> &str {
        &self.basename
    }

    /// Completion counter name
    pub fn counter(&self) -> &str {
        &self.basename
    }

    /// Result sequence name
    pub fn results(&self) -> String {
        format!("{}.results", self.basename)
    }
}

impl Default for RunNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_BASENAME)
    }
}

impl fmt::Display for RunNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.basename)
    }
}

/// How a coordinator's wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Every expected client counted down
    Completed,
    /// The maximum wait elapsed first
    TimedOut,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStatus::Completed => f.write_str("completed"),
            CompletionStatus::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Claim the coordinator role for `namespace`
///
/// Exactly one caller across all participants racing on the same namespace
/// gets `true`.
pub fn elect_singleton(store: &dyn SharedStore, namespace: &RunNamespace) -> StoreResult<bool> {
    store.put_if_absent(namespace.election_map(), namespace.election_key(), &[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_namespace_names() {
        let ns = RunNamespace::new("run-42");
        assert_eq!(ns.counter(), "run-42");
        assert_eq!(ns.election_map(), "run-42");
        assert_eq!(ns.results(), "run-42.results");
        assert_eq!(ns.to_string(), "run-42");
        assert_eq!(RunNamespace::default().basename(), DEFAULT_BASENAME);
    }

    #[test]
    fn test_election_is_exclusive() {
        const CONTENDERS: usize = 12;
        let store = Arc::new(InMemoryStore::new());
        let barrier = Arc::new(Barrier::new(CONTENDERS));
        let ns = RunNamespace::new("race");

        let handles: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let ns = ns.clone();
                thread::spawn(move || {
                    barrier.wait();
                    elect_singleton(store.as_ref(), &ns).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_namespaces_elect_independently() {
        let store = InMemoryStore::new();
        assert!(elect_singleton(&store, &RunNamespace::new("a")).unwrap());
        assert!(elect_singleton(&store, &RunNamespace::new("b")).unwrap());
        assert!(!elect_singleton(&store, &RunNamespace::new("a")).unwrap());
    }
}
