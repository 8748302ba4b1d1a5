use chrono::{DateTime, Utc};
use planner_shared::{Event, EventPatch, Goal, GoalPatch, Task, TaskPatch};
use tracing::{debug, instrument, warn};

/// A record that lives in a [`Store`].
pub trait Entity: Clone {
    type Patch;

    fn id(&self) -> &str;

    fn apply_patch(&mut self, patch: Self::Patch);
}

/// Records carrying their own completion flag (tasks and events). Goals
/// derive theirs from sections instead.
pub trait Completable: Entity {
    fn is_completed(&self) -> bool;

    fn set_completed(&mut self, completed: bool, now: DateTime<Utc>);
}

/// In-memory ordered list of one entity kind. Mutations return the new list;
/// an unknown id leaves it untouched.
#[derive(Debug, Clone)]
pub struct Store<T> {
    records: Vec<T>,
}

pub type TaskStore = Store<Task>;
pub type EventStore = Store<Event>;
pub type GoalStore = Store<Goal>;

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self { records: vec![] }
    }
}

impl<T: Entity> Store<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from seed records, dropping any repeated id.
    pub fn from_records(records: Vec<T>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.add(record);
        }
        store
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    #[instrument(skip(self, record), fields(id = %record.id()))]
    pub fn add(&mut self, record: T) -> &[T] {
        if self.contains(record.id()) {
            warn!("id already present; ignoring add");
            return &self.records;
        }
        self.records.push(record);
        debug!(count = self.records.len(), "record added");
        &self.records
    }

    #[instrument(skip(self, patch))]
    pub fn update(&mut self, id: &str, patch: T::Patch) -> &[T] {
        match self.records.iter_mut().find(|record| record.id() == id) {
            Some(record) => {
                record.apply_patch(patch);
                debug!("record updated");
            }
            None => debug!("update of unknown id ignored"),
        }
        &self.records
    }

    #[instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> &[T] {
        let before = self.records.len();
        self.records.retain(|record| record.id() != id);
        if self.records.len() == before {
            debug!("remove of unknown id ignored");
        }
        &self.records
    }

    /// Empties the store, returning how many records were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }
}

impl<T: Completable> Store<T> {
    #[instrument(skip(self, now))]
    pub fn toggle_complete(&mut self, id: &str, now: DateTime<Utc>) -> &[T] {
        match self.records.iter_mut().find(|record| record.id() == id) {
            Some(record) => {
                let completed = !record.is_completed();
                record.set_completed(completed, now);
                debug!(completed, "toggled completion");
            }
            None => debug!("toggle of unknown id ignored"),
        }
        &self.records
    }
}

impl Store<Goal> {
    #[instrument(skip(self, now))]
    pub fn toggle_section(&mut self, goal_id: &str, section_id: &str, now: DateTime<Utc>) -> &[Goal] {
        let Some(goal) = self.records.iter_mut().find(|goal| goal.id == goal_id) else {
            debug!("toggle of unknown goal ignored");
            return &self.records;
        };
        let Some(section) = goal.sections.iter_mut().find(|s| s.id == section_id) else {
            debug!("toggle of unknown section ignored");
            return &self.records;
        };

        section.completed = !section.completed;
        section.completed_at = section.completed.then_some(now);
        debug!(completed = section.completed, "toggled section");
        sync_goal_completion(goal, now);
        &self.records
    }

    /// Applies an edit, then re-derives completion from the new sections.
    #[instrument(skip(self, patch, now))]
    pub fn update_synced(&mut self, id: &str, patch: GoalPatch, now: DateTime<Utc>) -> &[Goal] {
        match self.records.iter_mut().find(|goal| goal.id == id) {
            Some(goal) => {
                goal.apply_patch(patch);
                sync_goal_completion(goal, now);
            }
            None => debug!("update of unknown goal ignored"),
        }
        &self.records
    }
}

/// A goal is complete exactly when it has sections and all of them are.
pub fn sync_goal_completion(goal: &mut Goal, now: DateTime<Utc>) {
    let all_done = !goal.sections.is_empty() && goal.sections.iter().all(|s| s.completed);
    if all_done == goal.completed {
        return;
    }
    goal.completed = all_done;
    goal.completed_at = all_done.then_some(now);
    debug!(goal = %goal.id, completed = all_done, "goal completion synced");
}

impl Entity for Task {
    type Patch = TaskPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }
}

impl Completable for Task {
    fn is_completed(&self) -> bool {
        self.completed
    }

    fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.completed_at = completed.then_some(now);
    }
}

impl Entity for Event {
    type Patch = EventPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: EventPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
    }
}

impl Completable for Event {
    fn is_completed(&self) -> bool {
        self.completed
    }

    fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.completed_at = completed.then_some(now);
    }
}

impl Entity for Goal {
    type Patch = GoalPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: GoalPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(sections) = patch.sections {
            self.sections = sections;
        }
    }
}
