use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Fixed-size table of worker slots.
///
/// A slot index, once claimed, identifies one live worker until released.
/// The lock is only held to scan or flip a flag, never across an await.
pub(crate) struct SlotTable {
    slots: Mutex<Vec<bool>>,
    released: Notify,
}

impl SlotTable {
    /// Creates a table with `capacity` free slots.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(vec![false; capacity]),
            released: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<bool>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the first free slot; `None` when all are occupied.
    pub fn claim(self: &Arc<Self>) -> Option<SlotGuard> {
        let mut slots = self.lock();
        let id = slots.iter().position(|busy| !busy)?;
        slots[id] = true;
        Some(SlotGuard {
            table: Arc::clone(self),
            id,
        })
    }

    fn release(&self, id: usize) {
        {
            let mut slots = self.lock();
            if let Some(slot) = slots.get_mut(id) {
                *slot = false;
            }
        }
        self.released.notify_one();
    }

    /// Number of claimed slots.
    pub fn occupied(&self) -> usize {
        self.lock().iter().filter(|busy| **busy).count()
    }

    /// Table size.
    pub fn capacity(&self) -> usize {
        self.lock().len()
    }

    /// Resolves after a slot has been released.
    ///
    /// A release that happens while nobody waits is remembered, so a waiter
    /// arriving late still wakes.
    pub async fn released(&self) {
        self.released.notified().await;
    }
}

/// A claimed slot. Released on drop, including when a worker panics.
pub(crate) struct SlotGuard {
    table: Arc<SlotTable>,
    id: usize,
}

impl SlotGuard {
    /// Slot index.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.table.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_claim() {
        let table = SlotTable::new(3);
        let a = table.claim().unwrap();
        let b = table.claim().unwrap();
        assert_eq!((a.id(), b.id()), (0, 1));

        drop(a);
        let c = table.claim().unwrap();
        assert_eq!(c.id(), 0);
        assert_eq!(table.occupied(), 2);
    }

    #[test]
    fn test_full_table_yields_none() {
        let table = SlotTable::new(1);
        let _held = table.claim().unwrap();
        assert!(table.claim().is_none());
        assert_eq!(table.occupied(), table.capacity());
    }

    #[tokio::test]
    async fn test_release_wakes_waiter_even_if_late() {
        let table = SlotTable::new(1);
        drop(table.claim().unwrap());
        // Permit stored by the release above.
        table.released().await;
        assert_eq!(table.occupied(), 0);
    }
}
