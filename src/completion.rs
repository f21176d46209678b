//! Working copy of one goal's completion records and the toggle mutation.

use crate::date_range::DayKey;
use crate::errors::TrackerError;
use crate::models::GoalId;
use crate::storage::GoalRepository;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex as StdMutex},
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

/// Day key to completed flag. An absent key means "not completed".
pub type CompletionMap = BTreeMap<DayKey, bool>;

/// Re-keys raw stored records canonically. Entries that collapse onto the same
/// day are OR-ed together; keys that are not dates are dropped.
pub fn normalize_records<'a>(records: impl IntoIterator<Item = (&'a str, bool)>) -> CompletionMap {
    let mut map = CompletionMap::new();
    for (raw, done) in records {
        match DayKey::parse(raw) {
            Ok(key) => {
                let entry = map.entry(key).or_insert(false);
                *entry = *entry || done;
            }
            Err(_) => warn!(key = raw, "dropping completion record with unparsable day key"),
        }
    }
    map
}

/// One lock per goal. Waiters are served in FIFO order, so operations on a goal
/// form a queue while different goals proceed independently. Locks nobody holds
/// or waits on are dropped, so deleted goals do not linger.
#[derive(Clone, Default)]
pub struct GoalLocks {
    inner: Arc<StdMutex<HashMap<GoalId, Arc<Mutex<()>>>>>,
}

impl GoalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, goal_id: &GoalId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // only the map itself refers to an idle lock
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(goal_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of goals with a held or awaited lock.
    pub fn tracked(&self) -> usize {
        match self.inner.lock() {
            Ok(locks) => locks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// A toggle whose save failed: the value it meant to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingToggle {
    pub day: DayKey,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct CompletionStore {
    goal_id: GoalId,
    records: CompletionMap,
    pending: Option<PendingToggle>,
}

impl CompletionStore {
    pub fn new(goal_id: GoalId, records: CompletionMap) -> Self {
        Self {
            goal_id,
            records,
            pending: None,
        }
    }

    /// Fetches the full record set for `goal_id`. A fetch failure is an error,
    /// never an empty store.
    pub async fn load<R: GoalRepository>(repo: &R, goal_id: &GoalId) -> Result<Self, TrackerError> {
        let records = repo.load_completions(goal_id).await?;
        Ok(Self::new(goal_id.clone(), records))
    }

    /// Replaces the working copy with the latest stored map.
    pub async fn reload<R: GoalRepository>(&mut self, repo: &R) -> Result<(), TrackerError> {
        self.records = repo.load_completions(&self.goal_id).await?;
        Ok(())
    }

    pub fn goal_id(&self) -> &GoalId {
        &self.goal_id
    }

    pub fn records(&self) -> &CompletionMap {
        &self.records
    }

    pub fn pending(&self) -> Option<PendingToggle> {
        self.pending
    }

    pub fn is_completed(&self, day: &DayKey) -> bool {
        self.records.get(day).copied().unwrap_or(false)
    }

    /// Flips `day` and returns the new value; a day with no record becomes `true`.
    ///
    /// The flip is computed against the map as stored right now (under the goal's
    /// lock), not against this working copy, so toggles of other days made
    /// elsewhere since the last load are kept.
    pub async fn toggle<R: GoalRepository>(
        &mut self,
        repo: &R,
        locks: &GoalLocks,
        day: DayKey,
    ) -> Result<bool, TrackerError> {
        let _guard = locks.acquire(&self.goal_id).await;
        let mut latest = repo.load_completions(&self.goal_id).await?;
        let completed = !latest.get(&day).copied().unwrap_or(false);
        latest.insert(day, completed);

        if let Err(err) = repo.save_completions(&self.goal_id, &latest).await {
            warn!(goal = %self.goal_id, %day, "toggle not saved: {err}");
            self.pending = Some(PendingToggle { day, completed });
            return Err(err);
        }

        info!(goal = %self.goal_id, %day, completed, "toggled day");
        self.records = latest;
        self.pending = None;
        Ok(completed)
    }

    /// Re-sends the value of the last failed toggle. Sets rather than flips, so
    /// retrying any number of times writes the same thing.
    pub async fn retry_pending<R: GoalRepository>(
        &mut self,
        repo: &R,
        locks: &GoalLocks,
    ) -> Result<Option<bool>, TrackerError> {
        let Some(pending) = self.pending else {
            return Ok(None);
        };

        let _guard = locks.acquire(&self.goal_id).await;
        let mut latest = repo.load_completions(&self.goal_id).await?;
        latest.insert(pending.day, pending.completed);
        repo.save_completions(&self.goal_id, &latest).await?;

        info!(goal = %self.goal_id, day = %pending.day, "retried toggle saved");
        self.records = latest;
        self.pending = None;
        Ok(Some(pending.completed))
    }
}
