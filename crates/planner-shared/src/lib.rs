use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Task,
  Event,
  Goal
}

impl EntityKind {
  pub const ALL: [EntityKind; 3] = [
    EntityKind::Task,
    EntityKind::Event,
    EntityKind::Goal
  ];

  pub fn label(self) -> &'static str {
    match self {
      | EntityKind::Task => "Task",
      | EntityKind::Event => "Event",
      | EntityKind::Goal => "Goal"
    }
  }

  pub fn blurb(self) -> &'static str {
    match self {
      | EntityKind::Task => {
        "Create a new task"
      }
      | EntityKind::Event => {
        "Schedule an event"
      }
      | EntityKind::Goal => {
        "Set a new goal"
      }
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let name = match self {
      | EntityKind::Task => "task",
      | EntityKind::Event => "event",
      | EntityKind::Goal => "goal"
    };
    f.write_str(name)
  }
}

impl FromStr for EntityKind {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "task" | "tasks" => {
        Ok(EntityKind::Task)
      }
      | "event" | "events" => {
        Ok(EntityKind::Event)
      }
      | "goal" | "goals" => {
        Ok(EntityKind::Goal)
      }
      | other => Err(format!(
        "unknown entity kind: {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let name = match self {
      | Priority::Low => "low",
      | Priority::Medium => "medium",
      | Priority::High => "high"
    };
    f.write_str(name)
  }
}

impl FromStr for Priority {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => Ok(Priority::Low),
      | "medium" | "m" => {
        Ok(Priority::Medium)
      }
      | "high" | "h" => {
        Ok(Priority::High)
      }
      | other => Err(format!(
        "unknown priority: {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:           String,
  pub title:        String,
  #[serde(default)]
  pub description:  String,
  pub due_date:     Option<NaiveDate>,
  pub priority:     Priority,
  pub completed:    bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub created_at:   NaiveDate
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Event {
  pub id:           String,
  pub title:        String,
  #[serde(default)]
  pub description:  String,
  pub date:         NaiveDate,
  pub start_time:   String,
  pub end_time:     String,
  pub location:     Option<String>,
  pub completed:    bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub created_at:   NaiveDate
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct GoalSection {
  pub id:           String,
  pub title:        String,
  pub completed:    bool,
  pub completed_at: Option<DateTime<Utc>>
}

impl GoalSection {
  pub fn new(
    id: impl Into<String>,
    title: impl Into<String>
  ) -> Self {
    Self {
      id:           id.into(),
      title:        title.into(),
      completed:    false,
      completed_at: None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Goal {
  pub id:           String,
  pub title:        String,
  #[serde(default)]
  pub description:  String,
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  pub sections:     Vec<GoalSection>,
  pub completed:    bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub created_at:   NaiveDate
}

impl Goal {
  pub fn completed_sections(
    &self
  ) -> usize {
    self
      .sections
      .iter()
      .filter(|s| s.completed)
      .count()
  }

  /// Whole-number percentage of
  /// completed sections; 0 when the
  /// goal has no sections.
  pub fn progress_percent(&self) -> u8 {
    let total = self.sections.len();
    if total == 0 {
      return 0;
    }
    let done = self.completed_sections();
    ((done as f64 / total as f64)
      * 100.0)
      .round() as u8
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskInput {
  pub title:       String,
  pub description: String,
  pub due_date:    Option<NaiveDate>,
  pub priority:    Priority
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct EventInput {
  pub title:       String,
  pub description: String,
  pub date:        NaiveDate,
  pub start_time:  String,
  pub end_time:    String,
  pub location:    Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct GoalInput {
  pub title:       String,
  pub description: String,
  pub start_date:  NaiveDate,
  pub end_date:    NaiveDate,
  pub sections:    Vec<GoalSection>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityInput {
  Task(TaskInput),
  Event(EventInput),
  Goal(GoalInput)
}

impl EntityInput {
  pub fn kind(&self) -> EntityKind {
    match self {
      | EntityInput::Task(_) => {
        EntityKind::Task
      }
      | EntityInput::Event(_) => {
        EntityKind::Event
      }
      | EntityInput::Goal(_) => {
        EntityKind::Goal
      }
    }
  }

  pub fn title(&self) -> &str {
    match self {
      | EntityInput::Task(input) => {
        &input.title
      }
      | EntityInput::Event(input) => {
        &input.title
      }
      | EntityInput::Goal(input) => {
        &input.title
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct TaskPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub due_date:    Option<Option<NaiveDate>>,
  pub priority:    Option<Priority>
}

impl From<TaskInput> for TaskPatch {
  fn from(input: TaskInput) -> Self {
    Self {
      title:       Some(input.title),
      description: Some(
        input.description
      ),
      due_date:    Some(input.due_date),
      priority:    Some(input.priority)
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct EventPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub date:        Option<NaiveDate>,
  pub start_time:  Option<String>,
  pub end_time:    Option<String>,
  pub location:    Option<Option<String>>
}

impl From<EventInput> for EventPatch {
  fn from(input: EventInput) -> Self {
    Self {
      title:       Some(input.title),
      description: Some(
        input.description
      ),
      date:        Some(input.date),
      start_time:  Some(
        input.start_time
      ),
      end_time:    Some(input.end_time),
      location:    Some(input.location)
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct GoalPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub start_date:  Option<NaiveDate>,
  pub end_date:    Option<NaiveDate>,
  pub sections:    Option<Vec<GoalSection>>
}

impl From<GoalInput> for GoalPatch {
  fn from(input: GoalInput) -> Self {
    Self {
      title:       Some(input.title),
      description: Some(
        input.description
      ),
      start_date:  Some(
        input.start_date
      ),
      end_date:    Some(input.end_date),
      sections:    Some(input.sections)
    }
  }
}

/// A record of any kind, as shown in
/// the archive and in exports.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
  Task(Task),
  Event(Event),
  Goal(Goal)
}

impl Record {
  pub fn kind(&self) -> EntityKind {
    match self {
      | Record::Task(_) => {
        EntityKind::Task
      }
      | Record::Event(_) => {
        EntityKind::Event
      }
      | Record::Goal(_) => {
        EntityKind::Goal
      }
    }
  }

  pub fn id(&self) -> &str {
    match self {
      | Record::Task(task) => &task.id,
      | Record::Event(event) => {
        &event.id
      }
      | Record::Goal(goal) => &goal.id
    }
  }

  pub fn title(&self) -> &str {
    match self {
      | Record::Task(task) => {
        &task.title
      }
      | Record::Event(event) => {
        &event.title
      }
      | Record::Goal(goal) => {
        &goal.title
      }
    }
  }

  pub fn description(&self) -> &str {
    match self {
      | Record::Task(task) => {
        &task.description
      }
      | Record::Event(event) => {
        &event.description
      }
      | Record::Goal(goal) => {
        &goal.description
      }
    }
  }

  pub fn is_completed(&self) -> bool {
    match self {
      | Record::Task(task) => {
        task.completed
      }
      | Record::Event(event) => {
        event.completed
      }
      | Record::Goal(goal) => {
        goal.completed
      }
    }
  }

  pub fn completed_at(
    &self
  ) -> Option<DateTime<Utc>> {
    match self {
      | Record::Task(task) => {
        task.completed_at
      }
      | Record::Event(event) => {
        event.completed_at
      }
      | Record::Goal(goal) => {
        goal.completed_at
      }
    }
  }

  pub fn created_at(&self) -> NaiveDate {
    match self {
      | Record::Task(task) => {
        task.created_at
      }
      | Record::Event(event) => {
        event.created_at
      }
      | Record::Goal(goal) => {
        goal.created_at
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn goal_with(
    sections: Vec<GoalSection>
  ) -> Goal {
    Goal {
      id: "g1".to_string(),
      title: "Run a marathon".to_string(),
      description: String::new(),
      start_date: date(2024, 1, 1),
      end_date: date(2024, 3, 31),
      sections,
      completed: false,
      completed_at: None,
      created_at: date(2024, 1, 1)
    }
  }

  #[test]
  fn half_completed_goal_is_fifty_percent()
  {
    let mut done =
      GoalSection::new("1", "Base");
    done.completed = true;
    let goal = goal_with(vec![
      done,
      GoalSection::new("2", "Peak"),
    ]);
    assert_eq!(
      goal.progress_percent(),
      50
    );
  }

  #[test]
  fn progress_rounds_to_nearest() {
    let mut first =
      GoalSection::new("1", "a");
    first.completed = true;
    let goal = goal_with(vec![
      first,
      GoalSection::new("2", "b"),
      GoalSection::new("3", "c"),
    ]);
    assert_eq!(
      goal.progress_percent(),
      33
    );
  }

  #[test]
  fn empty_goal_has_zero_progress() {
    assert_eq!(
      goal_with(vec![])
        .progress_percent(),
      0
    );
  }

  #[test]
  fn task_serializes_dates_as_iso() {
    let task = Task {
      id:           "1".to_string(),
      title:        "Write report"
        .to_string(),
      description:  String::new(),
      due_date:     Some(date(
        2024, 1, 15
      )),
      priority:     Priority::High,
      completed:    false,
      completed_at: None,
      created_at:   date(2024, 1, 10)
    };

    let json = serde_json::to_value(&task)
      .expect("serialize task");
    assert_eq!(json["due_date"], "2024-01-15");
    assert_eq!(json["created_at"], "2024-01-10");
    assert_eq!(json["priority"], "high");
  }

  #[test]
  fn record_tags_kind() {
    let record = Record::Goal(goal_with(
      vec![]
    ));
    let json =
      serde_json::to_value(&record)
        .expect("serialize record");
    assert_eq!(json["kind"], "goal");
    assert_eq!(record.kind(), EntityKind::Goal);
  }

  #[test]
  fn parses_kinds_and_priorities() {
    assert_eq!(
      "Events".parse::<EntityKind>(),
      Ok(EntityKind::Event)
    );
    assert_eq!(
      "h".parse::<Priority>(),
      Ok(Priority::High)
    );
    assert!(
      "urgent"
        .parse::<Priority>()
        .is_err()
    );
  }
}
