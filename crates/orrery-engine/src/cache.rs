//! Fixed-capacity, time-indexed window of recent snapshots.
//!
//! [`StateCache`] is a ring of `Arc<Snapshot>` slots. A timestep's slot is
//! `timestep % capacity`, and each slot keeps the snapshot's own timestep
//! as its tag, so lookups are O(1) and a stale slot can never be returned
//! for the wrong timestep.

use std::sync::Arc;

use orrery_core::{CacheError, Snapshot, SystemLayout, TimeStep};

/// Rolling window of contiguous snapshots `[base, base + len)`.
///
/// Owned by a single thread (the controller); no interior locking.
pub struct StateCache {
    slots: Vec<Option<Arc<Snapshot>>>,
    base: Option<TimeStep>,
    len: usize,
    layout: SystemLayout,
}

impl StateCache {
    /// Create an empty cache holding at most `capacity` snapshots of
    /// `layout`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, layout: SystemLayout) -> Self {
        assert!(capacity > 0, "StateCache capacity must be > 0");
        Self {
            slots: vec![None; capacity],
            base: None,
            len: 0,
            layout,
        }
    }

    fn slot_of(&self, timestep: TimeStep) -> usize {
        (timestep.0 % self.slots.len() as u64) as usize
    }

    /// Append the snapshot that follows the current tail.
    ///
    /// # Panics
    ///
    /// Panics if the cache is full, if `snapshot` is not the timestep right
    /// after [`latest_timestep`](Self::latest_timestep), or if its layout
    /// differs from the cache's.
    pub fn push(&mut self, snapshot: Arc<Snapshot>) {
        assert!(
            !self.is_full(),
            "push into full StateCache (capacity {})",
            self.capacity()
        );
        assert!(
            snapshot.matches(self.layout),
            "snapshot layout does not match StateCache layout"
        );
        if let Some(latest) = self.latest_timestep() {
            assert_eq!(
                snapshot.timestep,
                latest.next(),
                "non-contiguous push into StateCache"
            );
        } else {
            self.base = Some(snapshot.timestep);
        }
        let idx = self.slot_of(snapshot.timestep);
        self.slots[idx] = Some(snapshot);
        self.len += 1;
    }

    /// The cached snapshot at `timestep`.
    pub fn get(&self, timestep: TimeStep) -> Result<&Arc<Snapshot>, CacheError> {
        let out_of_range = CacheError::OutOfRange {
            requested: timestep,
            base: self.base,
            len: self.len,
        };
        if !self.contains(timestep) {
            return Err(out_of_range);
        }
        match &self.slots[self.slot_of(timestep)] {
            Some(snap) if snap.timestep == timestep => Ok(snap),
            _ => Err(out_of_range),
        }
    }

    /// The last `k` snapshots, oldest first.
    pub fn tail(&self, k: usize) -> Result<Vec<Arc<Snapshot>>, CacheError> {
        if k > self.len {
            return Err(CacheError::InsufficientHistory {
                requested: k,
                available: self.len,
            });
        }
        let Some(latest) = self.latest_timestep() else {
            return Ok(Vec::new());
        };
        let first = latest.advance(1).rewind(k as u64);
        Ok(self.iter_from(first).take(k).cloned().collect())
    }

    /// Replace the contents with a contiguous run of snapshots.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`push`](Self::push).
    pub fn reload<I>(&mut self, snapshots: I)
    where
        I: IntoIterator<Item = Arc<Snapshot>>,
    {
        self.clear();
        for snap in snapshots {
            self.push(snap);
        }
    }

    /// Drop all but the newest `k` snapshots.
    pub fn retain_tail(&mut self, k: usize) {
        let Some(base) = self.base else {
            return;
        };
        let drop_count = self.len.saturating_sub(k);
        for offset in 0..drop_count {
            let idx = self.slot_of(base.advance(offset as u64));
            self.slots[idx] = None;
        }
        self.len -= drop_count;
        self.base = if self.len == 0 {
            None
        } else {
            Some(base.advance(drop_count as u64))
        };
    }

    /// Remove every snapshot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.base = None;
        self.len = 0;
    }

    /// Whether `timestep` lies inside the window.
    pub fn contains(&self, timestep: TimeStep) -> bool {
        match self.base {
            Some(base) => timestep >= base && timestep.0 - base.0 < self.len as u64,
            None => false,
        }
    }

    /// Oldest cached timestep.
    pub fn base_timestep(&self) -> Option<TimeStep> {
        self.base
    }

    /// Newest cached timestep.
    pub fn latest_timestep(&self) -> Option<TimeStep> {
        self.base.map(|b| b.advance(self.len as u64 - 1))
    }

    /// Cached snapshots from `timestep` to the tail, in order.
    ///
    /// Empty if `timestep` is not cached.
    pub fn iter_from(&self, timestep: TimeStep) -> impl Iterator<Item = &Arc<Snapshot>> + '_ {
        let count = match self.latest_timestep() {
            Some(latest) if self.contains(timestep) => (latest.0 - timestep.0 + 1) as usize,
            _ => 0,
        };
        (0..count as u64).filter_map(move |i| self.get(timestep.advance(i)).ok())
    }

    /// Whether another push would panic.
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of snapshots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Body counts of cached snapshots.
    pub fn layout(&self) -> SystemLayout {
        self.layout
    }
}

impl std::fmt::Debug for StateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("base", &self.base)
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}
