//! Mock coordinate directory
//!
//! In-memory implementation for unit tests and offline (`--mock`) runs,
//! with injectable per-anchor failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{ContractError, CoordinateDirectory, Point3};
use tracing::debug;

struct MockDirectoryInner {
    coords: Mutex<HashMap<String, Point3>>,
    /// Anchor ids whose resolution should fail
    fail_ids: Mutex<Vec<String>>,
    resolve_count: AtomicU64,
}

/// Mock coordinate directory.
///
/// Internal state wrapped in `Arc`, supports `Clone` so tests can keep a
/// handle while the engine owns another.
#[derive(Clone)]
pub struct MockDirectory {
    inner: Arc<MockDirectoryInner>,
}

impl MockDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::with_coords(&[])
    }

    /// Create a directory pre-populated with (id, coordinates) entries.
    pub fn with_coords(entries: &[(&str, Point3)]) -> Self {
        let coords = entries
            .iter()
            .map(|(id, coord)| (id.to_string(), *coord))
            .collect();

        Self {
            inner: Arc::new(MockDirectoryInner {
                coords: Mutex::new(coords),
                fail_ids: Mutex::new(Vec::new()),
                resolve_count: AtomicU64::new(0),
            }),
        }
    }

    /// Register or replace an entry.
    pub fn insert(&self, id: &str, coord: Point3) {
        self.inner
            .coords
            .lock()
            .expect("mock directory lock poisoned")
            .insert(id.to_string(), coord);
    }

    /// Make resolution of `id` fail even if an entry exists.
    pub fn fail_on(&self, id: &str) {
        self.inner
            .fail_ids
            .lock()
            .expect("mock directory lock poisoned")
            .push(id.to_string());
    }

    /// Total resolve calls observed.
    pub fn resolve_count(&self) -> u64 {
        self.inner.resolve_count.load(Ordering::Relaxed)
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateDirectory for MockDirectory {
    async fn resolve(&self, anchor_id: &str) -> Result<Point3, ContractError> {
        self.inner.resolve_count.fetch_add(1, Ordering::Relaxed);

        let failing = self
            .inner
            .fail_ids
            .lock()
            .expect("mock directory lock poisoned")
            .iter()
            .any(|id| id == anchor_id);
        if failing {
            return Err(ContractError::anchor_resolution(
                anchor_id,
                "injected failure",
            ));
        }

        let coord = self
            .inner
            .coords
            .lock()
            .expect("mock directory lock poisoned")
            .get(anchor_id)
            .copied();

        match coord {
            Some(coord) => {
                debug!(anchor = anchor_id, "mock resolution");
                Ok(coord)
            }
            None => Err(ContractError::anchor_resolution(anchor_id, "unknown mac")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_and_unknown() {
        let directory = MockDirectory::with_coords(&[("a1", Point3::new(1.0, 2.0, 3.0))]);

        let coord = directory.resolve("a1").await.unwrap();
        assert_eq!(coord, Point3::new(1.0, 2.0, 3.0));

        assert!(directory.resolve("nope").await.is_err());
        assert_eq!(directory.resolve_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_wins_over_entry() {
        let directory = MockDirectory::with_coords(&[("a1", Point3::new(0.0, 0.0, 0.0))]);
        directory.fail_on("a1");

        assert!(directory.resolve("a1").await.is_err());
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let directory = MockDirectory::new();
        let handle = directory.clone();

        directory.insert("late", Point3::new(9.0, 9.0, 0.0));
        assert!(handle.resolve("late").await.is_ok());
    }
}
