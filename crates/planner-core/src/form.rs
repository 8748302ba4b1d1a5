use chrono::NaiveDate;
use planner_shared::{
    EntityInput, EntityKind, Event, EventInput, Goal, GoalInput, GoalSection, Priority, Record, Task,
    TaskInput,
};
use thiserror::Error;
use tracing::{debug, instrument};

const DEFAULT_SECTION_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("start time is required")]
    MissingStartTime,
    #[error("end time is required")]
    MissingEndTime,
    #[error("end date is required")]
    MissingEndDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(String),
}

/// What a form emits on a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub mode: FormMode,
    pub input: EntityInput,
}

fn require_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    Ok(())
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskForm {
    mode: FormMode,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

impl TaskForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            description: String::new(),
            due_date: None,
            priority: Priority::Medium,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: FormMode::Edit(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: task.priority,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub fn submit(&mut self) -> Result<Submission, ValidationError> {
        require_title(&self.title)?;

        let submission = Submission {
            mode: self.mode.clone(),
            input: EntityInput::Task(TaskInput {
                title: std::mem::take(&mut self.title),
                description: std::mem::take(&mut self.description),
                due_date: self.due_date,
                priority: self.priority,
            }),
        };
        *self = Self::create();
        debug!("task form submitted");
        Ok(submission)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    mode: FormMode,
    today: NaiveDate,
    preselected: Option<NaiveDate>,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
}

impl EventForm {
    /// Blank form; the date defaults to `preselected` or `today`.
    pub fn create(today: NaiveDate, preselected: Option<NaiveDate>) -> Self {
        Self {
            mode: FormMode::Create,
            today,
            preselected,
            title: String::new(),
            description: String::new(),
            date: preselected.unwrap_or(today),
            start_time: String::new(),
            end_time: String::new(),
            location: String::new(),
        }
    }

    pub fn edit(event: &Event, today: NaiveDate) -> Self {
        Self {
            mode: FormMode::Edit(event.id.clone()),
            today,
            preselected: None,
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date,
            start_time: event.start_time.clone(),
            end_time: event.end_time.clone(),
            location: event.location.clone().unwrap_or_default(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub fn submit(&mut self) -> Result<Submission, ValidationError> {
        require_title(&self.title)?;
        if self.start_time.trim().is_empty() {
            return Err(ValidationError::MissingStartTime);
        }
        if self.end_time.trim().is_empty() {
            return Err(ValidationError::MissingEndTime);
        }

        let submission = Submission {
            mode: self.mode.clone(),
            input: EntityInput::Event(EventInput {
                title: std::mem::take(&mut self.title),
                description: std::mem::take(&mut self.description),
                date: self.date,
                start_time: self.start_time.trim().to_string(),
                end_time: self.end_time.trim().to_string(),
                location: blank_to_none(&self.location),
            }),
        };
        *self = Self::create(self.today, self.preselected);
        debug!("event form submitted");
        Ok(submission)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalForm {
    mode: FormMode,
    today: NaiveDate,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    sections: Vec<GoalSection>,
}

fn default_sections() -> Vec<GoalSection> {
    (1..=DEFAULT_SECTION_COUNT)
        .map(|n| GoalSection::new(n.to_string(), format!("Section {n}")))
        .collect()
}

impl GoalForm {
    pub fn create(today: NaiveDate) -> Self {
        Self {
            mode: FormMode::Create,
            today,
            title: String::new(),
            description: String::new(),
            start_date: today,
            end_date: None,
            sections: default_sections(),
        }
    }

    pub fn edit(goal: &Goal, today: NaiveDate) -> Self {
        let sections = if goal.sections.is_empty() {
            default_sections()
        } else {
            goal.sections.clone()
        };
        Self {
            mode: FormMode::Edit(goal.id.clone()),
            today,
            title: goal.title.clone(),
            description: goal.description.clone(),
            start_date: goal.start_date,
            end_date: Some(goal.end_date),
            sections,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn sections(&self) -> &[GoalSection] {
        &self.sections
    }

    /// Appends `Section <n>` where `n` is one past the highest numeric id,
    /// so ids stay unique after removals.
    pub fn add_section(&mut self) -> &GoalSection {
        let next = self
            .sections
            .iter()
            .filter_map(|s| s.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        self.sections
            .push(GoalSection::new(next.to_string(), format!("Section {next}")));
        &self.sections[self.sections.len() - 1]
    }

    /// Removes a section; the last remaining section is kept.
    pub fn remove_section(&mut self, id: &str) -> bool {
        if self.sections.len() <= 1 {
            return false;
        }
        let before = self.sections.len();
        self.sections.retain(|s| s.id != id);
        self.sections.len() != before
    }

    pub fn rename_section(&mut self, id: &str, title: &str) -> bool {
        match self.sections.iter_mut().find(|s| s.id == id) {
            Some(section) => {
                section.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Replaces the draft sections with fresh ones carrying `titles`.
    /// An empty list leaves the draft alone.
    pub fn replace_sections<S: AsRef<str>>(&mut self, titles: &[S]) {
        if titles.is_empty() {
            return;
        }
        self.sections = titles
            .iter()
            .enumerate()
            .map(|(idx, title)| GoalSection::new((idx + 1).to_string(), title.as_ref()))
            .collect();
    }

    #[instrument(skip(self), fields(mode = ?self.mode))]
    pub fn submit(&mut self) -> Result<Submission, ValidationError> {
        require_title(&self.title)?;
        let end_date = self.end_date.ok_or(ValidationError::MissingEndDate)?;

        let sections = std::mem::take(&mut self.sections)
            .into_iter()
            .map(|mut section| {
                if section.title.trim().is_empty() {
                    section.title = format!("Section {}", section.id);
                }
                section
            })
            .collect();

        let submission = Submission {
            mode: self.mode.clone(),
            input: EntityInput::Goal(GoalInput {
                title: std::mem::take(&mut self.title),
                description: std::mem::take(&mut self.description),
                start_date: self.start_date,
                end_date,
                sections,
            }),
        };
        *self = Self::create(self.today);
        debug!("goal form submitted");
        Ok(submission)
    }
}

/// One open form of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityForm {
    Task(TaskForm),
    Event(EventForm),
    Goal(GoalForm),
}

impl EntityForm {
    pub fn create(kind: EntityKind, today: NaiveDate) -> Self {
        match kind {
            EntityKind::Task => EntityForm::Task(TaskForm::create()),
            EntityKind::Event => EntityForm::Event(EventForm::create(today, None)),
            EntityKind::Goal => EntityForm::Goal(GoalForm::create(today)),
        }
    }

    /// Edit-mode form prefilled from an existing record.
    pub fn edit(record: &Record, today: NaiveDate) -> Self {
        match record {
            Record::Task(task) => EntityForm::Task(TaskForm::edit(task)),
            Record::Event(event) => EntityForm::Event(EventForm::edit(event, today)),
            Record::Goal(goal) => EntityForm::Goal(GoalForm::edit(goal, today)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityForm::Task(_) => EntityKind::Task,
            EntityForm::Event(_) => EntityKind::Event,
            EntityForm::Goal(_) => EntityKind::Goal,
        }
    }

    pub fn mode(&self) -> &FormMode {
        match self {
            EntityForm::Task(form) => form.mode(),
            EntityForm::Event(form) => form.mode(),
            EntityForm::Goal(form) => form.mode(),
        }
    }

    pub fn submit(&mut self) -> Result<Submission, ValidationError> {
        match self {
            EntityForm::Task(form) => form.submit(),
            EntityForm::Event(form) => form.submit(),
            EntityForm::Goal(form) => form.submit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date")
    }

    #[test]
    fn task_form_emits_title_verbatim_and_resets() {
        let mut form = TaskForm::create();
        form.title = "  Write report ".to_string();
        form.priority = Priority::High;

        let submission = form.submit().expect("valid task");
        assert_eq!(submission.mode, FormMode::Create);
        let EntityInput::Task(input) = submission.input else {
            panic!("expected task input");
        };
        assert_eq!(input.title, "  Write report ");
        assert_eq!(input.priority, Priority::High);
        assert_eq!(form, TaskForm::create());
    }

    #[test]
    fn blank_title_is_rejected_and_draft_kept() {
        let mut form = TaskForm::create();
        form.title = "   ".to_string();
        form.description = "kept".to_string();
        assert_eq!(form.submit(), Err(ValidationError::MissingTitle));
        assert_eq!(form.description, "kept");
    }

    #[test]
    fn event_form_requires_both_times() {
        let mut form = EventForm::create(today(), None);
        form.title = "Standup".to_string();
        form.start_time = "09:00".to_string();
        assert_eq!(form.submit(), Err(ValidationError::MissingEndTime));

        form.start_time.clear();
        form.end_time = "09:15".to_string();
        assert_eq!(form.submit(), Err(ValidationError::MissingStartTime));
    }

    #[test]
    fn event_form_uses_preselected_date_and_drops_blank_location() {
        let picked = NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid date");
        let mut form = EventForm::create(today(), Some(picked));
        form.title = "Demo".to_string();
        form.start_time = "10:00".to_string();
        form.end_time = "11:00".to_string();
        form.location = "  ".to_string();

        let EntityInput::Event(input) = form.submit().expect("valid event").input else {
            panic!("expected event input");
        };
        assert_eq!(input.date, picked);
        assert_eq!(input.location, None);
        assert_eq!(form.date, picked);
        assert!(form.title.is_empty());
    }

    #[test]
    fn goal_form_requires_end_date() {
        let mut form = GoalForm::create(today());
        form.title = "Learn Rust".to_string();
        assert_eq!(form.submit(), Err(ValidationError::MissingEndDate));

        form.end_date = Some(today());
        let EntityInput::Goal(input) = form.submit().expect("valid goal").input else {
            panic!("expected goal input");
        };
        assert_eq!(input.sections.len(), 3);
        assert_eq!(input.start_date, today());
    }

    #[test]
    fn goal_sections_keep_unique_ids_and_minimum_of_one() {
        let mut form = GoalForm::create(today());
        assert!(form.remove_section("2"));
        let added = form.add_section().id.clone();
        assert_eq!(added, "4");

        assert!(form.remove_section("1"));
        assert!(form.remove_section("3"));
        assert!(!form.remove_section("4"));
        assert_eq!(form.sections().len(), 1);
    }

    #[test]
    fn blank_section_titles_get_default_names() {
        let mut form = GoalForm::create(today());
        form.title = "Ship".to_string();
        form.end_date = Some(today());
        assert!(form.rename_section("2", " "));

        let EntityInput::Goal(input) = form.submit().expect("valid goal").input else {
            panic!("expected goal input");
        };
        assert_eq!(input.sections[1].title, "Section 2");
    }

    #[test]
    fn edit_mode_carries_record_id() {
        let task = Task {
            id: "t-1".to_string(),
            title: "Old".to_string(),
            description: String::new(),
            due_date: None,
            priority: Priority::Low,
            completed: true,
            completed_at: None,
            created_at: today(),
        };
        let mut form = EntityForm::edit(&Record::Task(task), today());
        if let EntityForm::Task(inner) = &mut form {
            inner.title = "New".to_string();
        }

        let submission = form.submit().expect("valid edit");
        assert_eq!(submission.mode, FormMode::Edit("t-1".to_string()));
        assert_eq!(submission.input.title(), "New");
        assert_eq!(form.mode(), &FormMode::Create);
    }
}
