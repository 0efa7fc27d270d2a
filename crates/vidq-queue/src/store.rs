//! In-memory task state shared between the worker and status readers.

use crate::{TaskId, TaskRecord};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Map of task id to progress record behind a single store-wide lock.
///
/// Every operation takes the lock for its own duration only. Readers get
/// cloned snapshots, so they never see a half-applied update.
#[derive(Debug, Default)]
pub struct JobStateStore {
    records: Mutex<HashMap<TaskId, TaskRecord>>,
}

impl JobStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh `pending` record, replacing nothing.
    ///
    /// Returns `false` if a record with this id already exists.
    pub fn insert_pending(&self, id: TaskId) -> bool {
        let mut records = self.lock();
        if records.contains_key(&id) {
            return false;
        }
        records.insert(id, TaskRecord::pending(id));
        true
    }

    /// Returns a snapshot of the record, or `None` for an unknown id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.lock().get(&id).cloned()
    }

    /// Applies `f` to the record under the lock.
    ///
    /// Returns what `f` returned, or `false` if the id is unknown.
    pub fn update<F>(&self, id: TaskId, f: F) -> bool
    where
        F: FnOnce(&mut TaskRecord) -> bool,
    {
        self.lock().get_mut(&id).is_some_and(f)
    }

    /// Removes a record.
    pub fn remove(&self, id: TaskId) -> Option<TaskRecord> {
        self.lock().remove(&id)
    }

    /// Number of tracked tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no tasks are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Updates are single closure calls, so a panic elsewhere cannot leave the
    // map half-written; recover from poisoning instead of propagating it.
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskStatus;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_insert_and_get() {
        let store = JobStateStore::new();
        let id = Uuid::new_v4();

        assert!(store.get(id).is_none());
        assert!(store.insert_pending(id));
        assert!(!store.insert_pending(id));

        let rec = store.get(id).unwrap();
        assert_eq!(rec.id, id);
        assert_eq!(rec.status, TaskStatus::Pending);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_unknown_id() {
        let store = JobStateStore::new();
        assert!(!store.update(Uuid::new_v4(), TaskRecord::mark_downloading));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = JobStateStore::new();
        let id = Uuid::new_v4();
        store.insert_pending(id);

        let before = store.get(id).unwrap();
        store.update(id, |rec| rec.mark_done("out.mp4".to_string()));

        assert_eq!(before.status, TaskStatus::Pending);
        assert_eq!(store.get(id).unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn test_remove() {
        let store = JobStateStore::new();
        let id = Uuid::new_v4();
        store.insert_pending(id);
        assert!(store.remove(id).is_some());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_concurrent_readers_see_whole_updates() {
        let store = Arc::new(JobStateStore::new());
        let id = Uuid::new_v4();
        store.insert_pending(id);
        store.update(id, TaskRecord::mark_downloading);

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..=100u32 {
                    store.update(id, |rec| {
                        rec.apply_progress(Some(f64::from(i)), Some(u64::from(100 - i)))
                    });
                }
            })
        };

        let mut last = 0.0;
        for _ in 0..1000 {
            let rec = store.get(id).unwrap();
            assert!(rec.percent >= last);
            last = rec.percent;
        }
        writer.join().unwrap();
        assert_eq!(store.get(id).unwrap().percent, 100.0);
    }
}
