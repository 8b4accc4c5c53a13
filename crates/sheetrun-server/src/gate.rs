//! One-run-at-a-time gate per category.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use sheetrun_core::Category;

/// Serializes runs that share an upload directory.
///
/// Runs of different categories never wait on each other.
#[derive(Debug, Default)]
pub struct RunGate {
    locks: Mutex<HashMap<Category, Arc<Mutex<()>>>>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run of `category` holds the gate.
    ///
    /// The gate is released when the returned guard is dropped.
    pub async fn acquire(&self, category: &Category) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(category.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        debug!(category = %category, "Waiting for run gate");
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn category(name: &str) -> Category {
        Category::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_same_category_waits_for_release() {
        let gate = RunGate::new();
        let first = gate.acquire(&category("modulo1")).await;

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            gate.acquire(&category("modulo1")),
        )
        .await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(
            Duration::from_millis(500),
            gate.acquire(&category("modulo1")),
        )
        .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_other_categories_are_independent() {
        let gate = RunGate::new();
        let _first = gate.acquire(&category("modulo1")).await;

        let other = tokio::time::timeout(
            Duration::from_millis(500),
            gate.acquire(&category("modulo2")),
        )
        .await;
        assert!(other.is_ok());
    }
}
