//! Session view state: which goal is open, which period, at what granularity.
//!
//! `ViewController` is the only owner of mutable session state. Every method
//! takes `&mut self`, so operations on one controller never interleave; callers
//! sharing a controller put it behind an async mutex.

use crate::completion::{CompletionMap, CompletionStore, GoalLocks, PendingToggle};
use crate::date_range::{self, DateRange, DayKey, Direction, Granularity};
use crate::errors::TrackerError;
use crate::models::{Goal, GoalId};
use crate::stats::{self, MonthSummary, RangeStats};
use crate::storage::GoalRepository;
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub selected_goal: Option<GoalId>,
    pub reference_date: NaiveDate,
    pub granularity: Granularity,
}

impl ViewState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            selected_goal: None,
            reference_date: today,
            granularity: Granularity::Week,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ViewOutput {
    /// Week and month views.
    Days(RangeStats),
    Year { months: Vec<MonthSummary> },
}

/// Everything the presentation layer needs to draw the current view.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub state: ViewState,
    pub today: NaiveDate,
    pub goal: Option<Goal>,
    pub title: Option<String>,
    pub week_number: Option<u32>,
    pub range: Option<DateRange>,
    pub output: Option<ViewOutput>,
    pub pending: Option<PendingToggle>,
}

struct OpenGoal {
    goal: Goal,
    store: CompletionStore,
    range: DateRange,
    output: ViewOutput,
}

pub struct ViewController<R> {
    repo: R,
    locks: GoalLocks,
    state: ViewState,
    open: Option<OpenGoal>,
}

impl<R: GoalRepository> ViewController<R> {
    pub fn new(repo: R, locks: GoalLocks) -> Self {
        Self::new_at(repo, locks, Local::now().date_naive())
    }

    pub fn new_at(repo: R, locks: GoalLocks, today: NaiveDate) -> Self {
        Self {
            repo,
            locks,
            state: ViewState::new(today),
            open: None,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn output(&self) -> Option<&ViewOutput> {
        self.open.as_ref().map(|open| &open.output)
    }

    pub fn records(&self) -> Option<&CompletionMap> {
        self.open.as_ref().map(|open| open.store.records())
    }

    pub async fn select_goal(&mut self, id: &GoalId) -> Result<(), TrackerError> {
        self.select_goal_at(id, Local::now().date_naive()).await
    }

    /// Opens `id` in the week view around `today`, loading its records fresh.
    pub async fn select_goal_at(&mut self, id: &GoalId, today: NaiveDate) -> Result<(), TrackerError> {
        let found = self.repo.list_goals().await.and_then(|goals| {
            goals
                .into_iter()
                .find(|goal| &goal.id == id)
                .ok_or_else(|| TrackerError::NotFound(format!("goal {id}")))
        });
        let goal = self.settle(found)?;
        let loaded = CompletionStore::load(&self.repo, id).await;
        let store = self.settle(loaded)?;

        let granularity = Granularity::Week;
        let (range, output) = compute(today, granularity, store.records())?;
        info!(goal = %id, "selected goal");
        self.state = ViewState {
            selected_goal: Some(id.clone()),
            reference_date: today,
            granularity,
        };
        self.open = Some(OpenGoal {
            goal,
            store,
            range,
            output,
        });
        Ok(())
    }

    /// Back to the goal list. The working copy is dropped; the next selection reloads.
    pub fn deselect(&mut self) {
        if let Some(open) = self.open.take() {
            info!(goal = %open.goal.id, "deselected goal");
        }
        self.state.selected_goal = None;
    }

    pub async fn switch_granularity(&mut self, granularity: Granularity) -> Result<(), TrackerError> {
        self.move_to(self.state.reference_date, granularity).await
    }

    pub async fn navigate(&mut self, direction: Direction) -> Result<(), TrackerError> {
        let target = date_range::shift(self.state.reference_date, self.state.granularity, direction)?;
        self.move_to(target, self.state.granularity).await
    }

    pub async fn navigate_today(&mut self) -> Result<(), TrackerError> {
        self.navigate_today_at(Local::now().date_naive()).await
    }

    pub async fn navigate_today_at(&mut self, today: NaiveDate) -> Result<(), TrackerError> {
        self.move_to(today, self.state.granularity).await
    }

    /// Flips `day` for the selected goal and recomputes the current view.
    pub async fn toggle_day(&mut self, day: DayKey) -> Result<bool, TrackerError> {
        let open = self.open.as_mut().ok_or(TrackerError::NoGoalSelected)?;
        let result = open.store.toggle(&self.repo, &self.locks, day).await;
        let completed = self.settle(result)?;
        self.recompute()?;
        Ok(completed)
    }

    /// Re-sends a toggle whose save failed. `Ok(None)` when nothing is pending.
    pub async fn retry_toggle(&mut self) -> Result<Option<bool>, TrackerError> {
        let open = self.open.as_mut().ok_or(TrackerError::NoGoalSelected)?;
        let result = open.store.retry_pending(&self.repo, &self.locks).await;
        let completed = self.settle(result)?;
        if completed.is_some() {
            self.recompute()?;
        }
        Ok(completed)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot_at(Local::now().date_naive())
    }

    pub fn snapshot_at(&self, today: NaiveDate) -> ViewSnapshot {
        let open = self.open.as_ref();
        ViewSnapshot {
            state: self.state.clone(),
            today,
            goal: open.map(|open| open.goal.clone()),
            title: open.map(|open| date_range::title(&open.range, self.state.granularity)),
            week_number: open
                .filter(|_| self.state.granularity == Granularity::Week)
                .map(|_| date_range::week_of_year(self.state.reference_date)),
            range: open.map(|open| open.range),
            output: open.map(|open| open.output.clone()),
            pending: open.and_then(|open| open.store.pending()),
        }
    }

    /// Refreshes the working copy, then commits the new date and granularity.
    /// On failure nothing changes.
    async fn move_to(&mut self, date: NaiveDate, granularity: Granularity) -> Result<(), TrackerError> {
        let Some(open) = self.open.as_ref() else {
            self.state.reference_date = date;
            self.state.granularity = granularity;
            return Ok(());
        };

        let mut store = open.store.clone();
        let result = store.reload(&self.repo).await;
        self.settle(result)?;
        let (range, output) = compute(date, granularity, store.records())?;

        if let Some(open) = self.open.as_mut() {
            open.store = store;
            open.range = range;
            open.output = output;
        }
        self.state.reference_date = date;
        self.state.granularity = granularity;
        debug!(date = %date, granularity = %granularity, "view moved");
        Ok(())
    }

    fn recompute(&mut self) -> Result<(), TrackerError> {
        let Some(open) = self.open.as_mut() else {
            return Ok(());
        };
        let (range, output) = compute(
            self.state.reference_date,
            self.state.granularity,
            open.store.records(),
        )?;
        open.range = range;
        open.output = output;
        Ok(())
    }

    /// A goal that vanished from storage sends the session back to the list.
    fn settle<T>(&mut self, result: Result<T, TrackerError>) -> Result<T, TrackerError> {
        if let Err(TrackerError::NotFound(what)) = &result {
            warn!("{what} no longer exists; returning to goal list");
            self.deselect();
        }
        result
    }
}

fn compute(
    date: NaiveDate,
    granularity: Granularity,
    records: &CompletionMap,
) -> Result<(DateRange, ViewOutput), TrackerError> {
    let range = date_range::range_for(date, granularity)?;
    let output = match granularity {
        Granularity::Week | Granularity::Month => ViewOutput::Days(stats::build(&range, records)),
        Granularity::Year => ViewOutput::Year {
            months: stats::year_summary(date.year(), records)?,
        },
    };
    Ok((range, output))
}
