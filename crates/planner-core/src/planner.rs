use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use planner_shared::{
    EntityInput, EntityKind, Event, EventPatch, Goal, GoalPatch, Record, Task, TaskPatch,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::{NoContext, Timestamp, Uuid};

use crate::archive::{self, ArchivedItem};
use crate::datetime::local_date;
use crate::fixtures::Fixtures;
use crate::form::{FormMode, Submission};
use crate::settings::{Settings, SettingsChange};
use crate::store::{EventStore, GoalStore, TaskStore, sync_goal_completion};

/// Every state change the application can make.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(EntityInput),
    Update { id: String, input: EntityInput },
    Remove { kind: EntityKind, id: String },
    ToggleTask { id: String },
    ToggleEvent { id: String },
    ToggleSection { goal_id: String, section_id: String },
    ChangeSettings(SettingsChange),
    ClearAll,
}

impl From<Submission> for Command {
    fn from(submission: Submission) -> Self {
        match submission.mode {
            FormMode::Create => Command::Create(submission.input),
            FormMode::Edit(id) => Command::Update {
                id,
                input: submission.input,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created {
        kind: EntityKind,
        id: String,
    },
    Updated {
        kind: EntityKind,
        id: String,
    },
    Removed {
        kind: EntityKind,
        id: String,
    },
    Toggled {
        kind: EntityKind,
        id: String,
        completed: bool,
    },
    SectionToggled {
        goal_id: String,
        section_id: String,
        completed: bool,
        goal_completed: bool,
    },
    SettingsChanged,
    Cleared {
        removed: usize,
    },
    Unchanged {
        reason: String,
    },
}

impl Outcome {
    fn unchanged(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!(reason = %reason, "command left state unchanged");
        Outcome::Unchanged { reason }
    }
}

/// Application state: the three stores and the preferences. Mutated only
/// through [`Planner::apply`].
#[derive(Debug, Clone)]
pub struct Planner {
    tasks: TaskStore,
    events: EventStore,
    goals: GoalStore,
    settings: Settings,
    tz: Tz,
}

#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub tasks: &'a [Task],
    pub events: &'a [Event],
    pub goals: &'a [Goal],
    pub settings: &'a Settings,
}

impl Planner {
    pub fn new(settings: Settings, tz: Tz) -> Self {
        Self {
            tasks: TaskStore::new(),
            events: EventStore::new(),
            goals: GoalStore::new(),
            settings,
            tz,
        }
    }

    pub fn with_fixtures(fixtures: Fixtures, settings: Settings, tz: Tz) -> Self {
        info!(
            tasks = fixtures.tasks.len(),
            events = fixtures.events.len(),
            goals = fixtures.goals.len(),
            "seeding planner with fixtures"
        );
        Self {
            tasks: TaskStore::from_records(fixtures.tasks),
            events: EventStore::from_records(fixtures.events),
            goals: GoalStore::from_records(fixtures.goals),
            settings,
            tz,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.records()
    }

    pub fn events(&self) -> &[Event] {
        self.events.records()
    }

    pub fn goals(&self) -> &[Goal] {
        self.goals.records()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.tz)
    }

    pub fn record(&self, kind: EntityKind, id: &str) -> Option<Record> {
        match kind {
            EntityKind::Task => self.tasks.get(id).cloned().map(Record::Task),
            EntityKind::Event => self.events.get(id).cloned().map(Record::Event),
            EntityKind::Goal => self.goals.get(id).cloned().map(Record::Goal),
        }
    }

    pub fn archive(&self) -> Vec<ArchivedItem> {
        archive::collect(self.tasks(), self.events(), self.goals())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tasks: self.tasks(),
            events: self.events(),
            goals: self.goals(),
            settings: &self.settings,
        }
    }

    #[instrument(skip(self, now))]
    pub fn apply(&mut self, command: Command, now: DateTime<Utc>) -> anyhow::Result<Outcome> {
        let outcome = match command {
            Command::Create(input) => self.create(input, now),
            Command::Update { id, input } => self.update(id, input, now),
            Command::Remove { kind, id } => self.remove(kind, id),
            Command::ToggleTask { id } => {
                let Some(completed) = self.tasks.toggle_complete(&id, now).iter().find(|t| t.id == id).map(|t| t.completed)
                else {
                    return Ok(Outcome::unchanged(format!("no task with id {id}")));
                };
                Outcome::Toggled {
                    kind: EntityKind::Task,
                    id,
                    completed,
                }
            }
            Command::ToggleEvent { id } => {
                let Some(completed) = self.events.toggle_complete(&id, now).iter().find(|e| e.id == id).map(|e| e.completed)
                else {
                    return Ok(Outcome::unchanged(format!("no event with id {id}")));
                };
                Outcome::Toggled {
                    kind: EntityKind::Event,
                    id,
                    completed,
                }
            }
            Command::ToggleSection { goal_id, section_id } => self.toggle_section(goal_id, section_id, now),
            Command::ChangeSettings(change) => {
                self.settings.apply(change)?;
                Outcome::SettingsChanged
            }
            Command::ClearAll => {
                let removed = self.tasks.clear() + self.events.clear() + self.goals.clear();
                warn!(removed, "cleared all planner data");
                Outcome::Cleared { removed }
            }
        };
        Ok(outcome)
    }

    /// UUIDv7 stamped with `now`, so ids follow the session clock.
    fn fresh_id(&self, kind: EntityKind, now: DateTime<Utc>) -> String {
        let secs = u64::try_from(now.timestamp()).unwrap_or_default();
        loop {
            let stamp = Timestamp::from_unix(NoContext, secs, now.timestamp_subsec_nanos());
            let id = Uuid::new_v7(stamp).to_string();
            let taken = match kind {
                EntityKind::Task => self.tasks.contains(&id),
                EntityKind::Event => self.events.contains(&id),
                EntityKind::Goal => self.goals.contains(&id),
            };
            if !taken {
                return id;
            }
        }
    }

    fn create(&mut self, input: EntityInput, now: DateTime<Utc>) -> Outcome {
        let kind = input.kind();
        let id = self.fresh_id(kind, now);
        let created_at = self.today(now);

        match input {
            EntityInput::Task(input) => {
                self.tasks.add(Task {
                    id: id.clone(),
                    title: input.title,
                    description: input.description,
                    due_date: input.due_date,
                    priority: input.priority,
                    completed: false,
                    completed_at: None,
                    created_at,
                });
            }
            EntityInput::Event(input) => {
                self.events.add(Event {
                    id: id.clone(),
                    title: input.title,
                    description: input.description,
                    date: input.date,
                    start_time: input.start_time,
                    end_time: input.end_time,
                    location: input.location,
                    completed: false,
                    completed_at: None,
                    created_at,
                });
            }
            EntityInput::Goal(input) => {
                let mut goal = Goal {
                    id: id.clone(),
                    title: input.title,
                    description: input.description,
                    start_date: input.start_date,
                    end_date: input.end_date,
                    sections: input.sections,
                    completed: false,
                    completed_at: None,
                    created_at,
                };
                sync_goal_completion(&mut goal, now);
                self.goals.add(goal);
            }
        }

        info!(%kind, id = %id, "record created");
        Outcome::Created { kind, id }
    }

    /// Edits keep the record's completion state; only form fields change.
    fn update(&mut self, id: String, input: EntityInput, now: DateTime<Utc>) -> Outcome {
        let kind = input.kind();
        let found = match kind {
            EntityKind::Task => self.tasks.contains(&id),
            EntityKind::Event => self.events.contains(&id),
            EntityKind::Goal => self.goals.contains(&id),
        };
        if !found {
            return Outcome::unchanged(format!("no {kind} with id {id}"));
        }

        match input {
            EntityInput::Task(input) => {
                self.tasks.update(&id, TaskPatch::from(input));
            }
            EntityInput::Event(input) => {
                self.events.update(&id, EventPatch::from(input));
            }
            EntityInput::Goal(input) => {
                // section edits can finish or reopen the goal
                self.goals.update_synced(&id, GoalPatch::from(input), now);
            }
        }

        info!(%kind, id = %id, "record updated");
        Outcome::Updated { kind, id }
    }

    fn remove(&mut self, kind: EntityKind, id: String) -> Outcome {
        let before = match kind {
            EntityKind::Task => self.tasks.len(),
            EntityKind::Event => self.events.len(),
            EntityKind::Goal => self.goals.len(),
        };
        let after = match kind {
            EntityKind::Task => self.tasks.remove(&id).len(),
            EntityKind::Event => self.events.remove(&id).len(),
            EntityKind::Goal => self.goals.remove(&id).len(),
        };
        if before == after {
            return Outcome::unchanged(format!("no {kind} with id {id}"));
        }
        info!(%kind, id = %id, "record removed");
        Outcome::Removed { kind, id }
    }

    fn toggle_section(&mut self, goal_id: String, section_id: String, now: DateTime<Utc>) -> Outcome {
        let goals = self.goals.toggle_section(&goal_id, &section_id, now);
        let Some(goal) = goals.iter().find(|g| g.id == goal_id) else {
            return Outcome::unchanged(format!("no goal with id {goal_id}"));
        };
        let Some(section) = goal.sections.iter().find(|s| s.id == section_id) else {
            return Outcome::unchanged(format!("goal {goal_id} has no section {section_id}"));
        };

        Outcome::SectionToggled {
            completed: section.completed,
            goal_completed: goal.completed,
            goal_id,
            section_id,
        }
    }
}
