//! Persistence for goals and their per-day completion records.
//!
//! The tracking core only talks to storage through [`GoalRepository`]; the
//! JSON file backend below is what the server runs with.

use crate::completion::{CompletionMap, normalize_records};
use crate::errors::TrackerError;
use crate::models::{Goal, GoalId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::Mutex};
use tracing::{debug, error, info, warn};

/// Load/save contract for goals and completion maps.
///
/// `save_completions` replaces the whole map for a goal; merging concurrent
/// edits is the caller's job (see [`crate::completion::CompletionStore::toggle`]).
pub trait GoalRepository: Clone + Send + Sync + 'static {
    fn list_goals(&self) -> impl Future<Output = Result<Vec<Goal>, TrackerError>> + Send;

    fn create_goal(&self, text: &str) -> impl Future<Output = Result<GoalId, TrackerError>> + Send;

    /// Removes the goal and every completion record it owns.
    fn delete_goal(&self, id: &GoalId) -> impl Future<Output = Result<(), TrackerError>> + Send;

    fn load_completions(
        &self,
        goal_id: &GoalId,
    ) -> impl Future<Output = Result<CompletionMap, TrackerError>> + Send;

    fn save_completions(
        &self,
        goal_id: &GoalId,
        completions: &CompletionMap,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send;
}

/// On-disk document. Completion keys stay raw strings so that files written by
/// older clients (unpadded dates) still load; they are normalized on read.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreData {
    #[serde(default)]
    pub goals: BTreeMap<GoalId, Goal>,
    #[serde(default)]
    pub completions: BTreeMap<GoalId, BTreeMap<String, bool>>,
}

#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Arc<Mutex<StoreData>>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf, data: StoreData) -> Self {
        Self {
            path,
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub async fn open(path: &Path) -> Self {
        let data = load_data(path).await;
        Self::new(path.to_path_buf(), data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the document and swaps it in only once the
    /// copy is on disk, so a failed write leaves memory and file in agreement.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<T, TrackerError> + Send,
    ) -> Result<T, TrackerError>
    where
        T: Send,
    {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let output = change(&mut next)?;
        persist_data(&self.path, &next).await?;
        *data = next;
        Ok(output)
    }
}

impl GoalRepository for JsonFileStore {
    async fn list_goals(&self) -> Result<Vec<Goal>, TrackerError> {
        let data = self.data.lock().await;
        let mut goals: Vec<Goal> = data.goals.values().cloned().collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(goals)
    }

    async fn create_goal(&self, text: &str) -> Result<GoalId, TrackerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TrackerError::Validation("goal text must not be empty".into()));
        }

        let goal = Goal {
            id: GoalId::new(),
            text: text.to_owned(),
            created_at: Utc::now(),
        };
        let id = goal.id.clone();
        self.mutate(move |data| {
            data.completions.insert(goal.id.clone(), BTreeMap::new());
            data.goals.insert(goal.id.clone(), goal);
            Ok(())
        })
        .await?;

        info!(goal = %id, "created goal");
        Ok(id)
    }

    async fn delete_goal(&self, id: &GoalId) -> Result<(), TrackerError> {
        self.mutate(|data| {
            if data.goals.remove(id).is_none() {
                return Err(TrackerError::NotFound(format!("goal {id}")));
            }
            data.completions.remove(id);
            Ok(())
        })
        .await?;

        info!(goal = %id, "deleted goal and its completions");
        Ok(())
    }

    async fn load_completions(&self, goal_id: &GoalId) -> Result<CompletionMap, TrackerError> {
        let data = self.data.lock().await;
        if !data.goals.contains_key(goal_id) {
            return Err(TrackerError::NotFound(format!("goal {goal_id}")));
        }
        let records = data
            .completions
            .get(goal_id)
            .map(|raw| normalize_records(raw.iter().map(|(key, done)| (key.as_str(), *done))))
            .unwrap_or_default();
        debug!(goal = %goal_id, records = records.len(), "loaded completions");
        Ok(records)
    }

    async fn save_completions(
        &self,
        goal_id: &GoalId,
        completions: &CompletionMap,
    ) -> Result<(), TrackerError> {
        let raw: BTreeMap<String, bool> = completions
            .iter()
            .map(|(key, done)| (key.to_string(), *done))
            .collect();
        self.mutate(move |data| {
            if !data.goals.contains_key(goal_id) {
                return Err(TrackerError::NotFound(format!("goal {goal_id}")));
            }
            data.completions.insert(goal_id.clone(), raw);
            Ok(())
        })
        .await
    }
}

pub async fn load_data(path: &Path) -> StoreData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                set_aside(path).await;
                StoreData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            StoreData::default()
        }
    }
}

/// Writes a sibling temp file and renames it over `path`, so readers see either
/// the old document or the new one.
pub async fn persist_data(path: &Path, data: &StoreData) -> Result<(), TrackerError> {
    let payload = serde_json::to_vec_pretty(data).map_err(TrackerError::storage)?;
    let temp = sibling(path, "tmp");
    let written = match fs::write(&temp, payload).await {
        Ok(()) => fs::rename(&temp, path).await,
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        error!("failed to write data file {}: {err}", path.display());
        let _ = fs::remove_file(&temp).await;
        return Err(TrackerError::storage(err));
    }
    Ok(())
}

/// Keeps an unreadable data file as `<name>.corrupt` before the store starts empty.
async fn set_aside(path: &Path) {
    let backup = sibling(path, "corrupt");
    match fs::rename(path, &backup).await {
        Ok(()) => warn!("moved unreadable data file to {}", backup.display()),
        Err(err) => error!("failed to move unreadable data file aside: {err}"),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
