use std::io::{BufRead, Write};

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;
use planner_shared::EntityKind;
use tracing::{debug, info, instrument};

use crate::archive::{self, KindFilter};
use crate::cli::{Action, FormFields, SessionLine, SettingsAction, split_line};
use crate::clock::Clock;
use crate::config::Config;
use crate::dashboard;
use crate::datetime::{format_clock_time, format_header_date, normalize_time, parse_date_expr};
use crate::filter;
use crate::fixtures;
use crate::form::{EntityForm, Submission};
use crate::planner::{Command, Outcome, Planner};
use crate::quick_add::QuickAdd;
use crate::render::Renderer;
use crate::settings::SettingsChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One interactive run: application state plus the pieces that talk to
/// the terminal.
pub struct Session<C: Clock> {
    planner: Planner,
    quick_add: QuickAdd,
    renderer: Renderer,
    retention_days: i64,
    clock: C,
}

impl<C: Clock> Session<C> {
    pub fn new(planner: Planner, quick_add: QuickAdd, renderer: Renderer, retention_days: i64, clock: C) -> Self {
        Self {
            planner,
            quick_add,
            renderer,
            retention_days,
            clock,
        }
    }

    #[instrument(skip_all)]
    pub fn from_config(cfg: &Config, renderer: Renderer, clock: C) -> anyhow::Result<Self> {
        let settings = cfg.initial_settings()?;
        let tz = cfg.tz()?;
        let planner = if cfg.fixtures.load {
            Planner::with_fixtures(fixtures::load().context("failed to load sample data")?, settings, tz)
        } else {
            Planner::new(settings, tz)
        };

        Ok(Self::new(
            planner,
            QuickAdd::new(cfg.quick_add.default_kind),
            renderer,
            cfg.archive.retention_days,
            clock,
        ))
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn prompt(&self) -> String {
        format!(
            "[{}] planner> ",
            format_clock_time(self.clock.now(), self.planner.timezone())
        )
    }

    /// Reads lines until end of input or `quit`. Errors on a line are
    /// reported and the session carries on.
    #[instrument(skip(self, input, out))]
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W, interactive: bool) -> anyhow::Result<()> {
        let mut lines = input.lines();
        loop {
            if interactive {
                write!(out, "{}", self.prompt())?;
                out.flush()?;
            }

            let Some(line) = lines.next() else {
                debug!("end of input");
                break;
            };
            let line = line.context("failed to read input")?;

            match self.execute_line(&line, out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => writeln!(out, "error: {err:#}")?,
            }
        }
        info!("session finished");
        Ok(())
    }

    #[instrument(skip(self, out))]
    pub fn execute_line<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let words = split_line(line)?;
        if words.is_empty() {
            return Ok(Flow::Continue);
        }

        let parsed = match SessionLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(err) if err.kind() == ErrorKind::DisplayHelp => {
                write!(out, "{}", err.render())?;
                return Ok(Flow::Continue);
            }
            Err(err) => {
                let rendered = err.render().to_string();
                return Err(anyhow!("{}", rendered.trim().trim_start_matches("error: ").to_string()));
            }
        };

        self.dispatch(parsed.action, out)
    }

    fn dispatch<W: Write>(&mut self, action: Action, out: &mut W) -> anyhow::Result<Flow> {
        let now = self.clock.now();
        let today = self.planner.today(now);

        match action {
            Action::Tasks { query, status } => {
                let tasks = filter::filter_list(self.planner.tasks(), query.as_deref().unwrap_or(""), status);
                self.renderer.print_tasks(out, &tasks, today)?;
            }
            Action::Events { query, status, on } => {
                let query = query.as_deref().unwrap_or("");
                let events = match on {
                    Some(expr) => {
                        let date = parse_date_expr(&expr, today)?;
                        let on_day = filter::events_on(self.planner.events(), date);
                        on_day
                            .into_iter()
                            .filter(|e| filter::matches_query(*e, query) && status.accepts(e.completed))
                            .collect()
                    }
                    None => filter::filter_list(self.planner.events(), query, status),
                };
                self.renderer.print_events(out, &events)?;
            }
            Action::Goals { query, status } => {
                let goals = filter::filter_list(self.planner.goals(), query.as_deref().unwrap_or(""), status);
                let stats = filter::goal_stats(self.planner.goals());
                self.renderer.print_goals(out, &goals, &stats)?;
            }
            Action::Archive { query, kind } => self.show_archive(query.as_deref().unwrap_or(""), kind, out)?,
            Action::Dashboard => {
                let dash = dashboard::build(&self.planner, now);
                self.renderer.print_dashboard(out, &dash)?;
            }
            Action::Add { kind, fields } => self.add(kind, &fields, today, out)?,
            Action::Edit { kind, id, fields } => self.edit(kind, &id, &fields, today, out)?,
            Action::Done { kind, id } => {
                let command = match kind {
                    EntityKind::Task => Command::ToggleTask { id },
                    EntityKind::Event => Command::ToggleEvent { id },
                    EntityKind::Goal => bail!("goals complete through their sections; use `section GOAL_ID SECTION_ID`"),
                };
                self.apply(command, out)?;
            }
            Action::Section { goal_id, section_id } => {
                self.apply(Command::ToggleSection { goal_id, section_id }, out)?;
            }
            Action::Delete { kind, id } => self.apply(Command::Remove { kind, id }, out)?,
            Action::Settings { change } => self.settings(change, out)?,
            Action::ClearAll => self.apply(Command::ClearAll, out)?,
            Action::Export => {
                let json = serde_json::to_string_pretty(&self.planner.snapshot()).context("failed to serialize state")?;
                writeln!(out, "{json}")?;
            }
            Action::Clock => {
                let tz = self.planner.timezone();
                writeln!(out, "{}  {}", format_clock_time(now, tz), format_header_date(now, tz))?;
            }
            Action::Help => {
                write!(out, "{}", SessionLine::command().render_help())?;
            }
            Action::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show_archive<W: Write>(&self, query: &str, kind: KindFilter, out: &mut W) -> anyhow::Result<()> {
        let items = self.planner.archive();
        let stats = archive::archive_stats(&items);
        let shown = archive::filter_archive(&items, query, kind);
        self.renderer
            .print_archive(out, &shown, &stats, self.clock.now(), self.retention_days)
    }

    /// Quick-add: select the kind, open a blank form, fill it, submit.
    #[instrument(skip(self, fields, out))]
    fn add<W: Write>(
        &mut self,
        kind: Option<EntityKind>,
        fields: &FormFields,
        today: NaiveDate,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let kind = match kind {
            Some(kind) => kind,
            None if fields.is_empty() => {
                return self.renderer.print_quick_add(out, &self.quick_add.options());
            }
            None => self.quick_add.selected(),
        };
        self.quick_add.select(kind);

        let form = self.quick_add.confirm(today);
        if let Err(err) = fill_form(form, fields, today) {
            self.quick_add.cancel();
            return Err(err);
        }

        let mut submitted: Option<Submission> = None;
        self.quick_add.submit(|submission| submitted = Some(submission));
        match submitted {
            Some(submission) => self.apply(Command::from(submission), out),
            None => {
                self.quick_add.cancel();
                writeln!(out, "Nothing added: {}.", required_fields(kind))?;
                Ok(())
            }
        }
    }

    #[instrument(skip(self, fields, out))]
    fn edit<W: Write>(
        &mut self,
        kind: EntityKind,
        id: &str,
        fields: &FormFields,
        today: NaiveDate,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let Some(record) = self.planner.record(kind, id) else {
            writeln!(out, "Nothing changed: no {kind} with id {id}.")?;
            return Ok(());
        };

        let mut form = EntityForm::edit(&record, today);
        fill_form(&mut form, fields, today)?;
        match form.submit() {
            Ok(submission) => self.apply(Command::from(submission), out),
            Err(err) => {
                debug!(error = %err, "edit rejected");
                writeln!(out, "Nothing changed: {}.", required_fields(kind))?;
                Ok(())
            }
        }
    }

    fn settings<W: Write>(&mut self, change: Option<SettingsAction>, out: &mut W) -> anyhow::Result<()> {
        let change = match change {
            None | Some(SettingsAction::Show) => {
                return self.renderer.print_settings(out, self.planner.settings());
            }
            Some(SettingsAction::DarkMode) => SettingsChange::ToggleDarkMode,
            Some(SettingsAction::Ring { secs }) => SettingsChange::RingDuration(secs),
            Some(SettingsAction::Snooze { minutes }) => SettingsChange::SnoozeDuration(minutes),
            Some(SettingsAction::Ringtone { name }) => SettingsChange::Ringtone(name),
            Some(SettingsAction::AddRingtone { name }) => SettingsChange::AddCustomRingtone(name),
        };
        self.apply(Command::ChangeSettings(change), out)
    }

    fn apply<W: Write>(&mut self, command: Command, out: &mut W) -> anyhow::Result<()> {
        let outcome = self.planner.apply(command, self.clock.now())?;
        report(&outcome, out)
    }
}

fn required_fields(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => "a task needs a title",
        EntityKind::Event => "an event needs a title, a start time and an end time",
        EntityKind::Goal => "a goal needs a title and an end date",
    }
}

fn report<W: Write>(outcome: &Outcome, out: &mut W) -> anyhow::Result<()> {
    match outcome {
        Outcome::Created { kind, id } => writeln!(out, "Created {kind} {id}.")?,
        Outcome::Updated { kind, id } => writeln!(out, "Updated {kind} {id}.")?,
        Outcome::Removed { kind, id } => writeln!(out, "Deleted {kind} {id}.")?,
        Outcome::Toggled { kind, id, completed } => {
            let state = if *completed { "completed" } else { "reopened" };
            writeln!(out, "{} {id} {state}.", kind.label())?;
        }
        Outcome::SectionToggled {
            goal_id,
            section_id,
            completed,
            goal_completed,
        } => {
            let state = if *completed { "completed" } else { "reopened" };
            writeln!(out, "Section {section_id} of goal {goal_id} {state}.")?;
            if *completed && *goal_completed {
                writeln!(out, "Goal {goal_id} complete!")?;
            }
        }
        Outcome::SettingsChanged => writeln!(out, "Settings updated.")?,
        Outcome::Cleared { removed } => writeln!(out, "Cleared {removed} records.")?,
        Outcome::Unchanged { reason } => writeln!(out, "Nothing changed: {reason}.")?,
    }
    Ok(())
}

/// Copies command-line fields into an open form. Dates go through the
/// relative date parser and times are normalised to `HH:MM`.
fn fill_form(form: &mut EntityForm, fields: &FormFields, today: NaiveDate) -> anyhow::Result<()> {
    if let Some(flag) = fields.foreign_to(form.kind()) {
        bail!("--{flag} does not apply to a {}", form.kind());
    }

    match form {
        EntityForm::Task(task) => {
            set_text(&mut task.title, &fields.title);
            set_text(&mut task.description, &fields.description);
            if let Some(due) = &fields.due {
                task.due_date = match due.trim() {
                    "" | "none" => None,
                    expr => Some(parse_date_expr(expr, today)?),
                };
            }
            if let Some(priority) = fields.priority {
                task.priority = priority;
            }
        }
        EntityForm::Event(event) => {
            set_text(&mut event.title, &fields.title);
            set_text(&mut event.description, &fields.description);
            set_text(&mut event.location, &fields.location);
            if let Some(date) = &fields.date {
                event.date = parse_date_expr(date, today)?;
            }
            set_time(&mut event.start_time, &fields.start)?;
            set_time(&mut event.end_time, &fields.end)?;
        }
        EntityForm::Goal(goal) => {
            set_text(&mut goal.title, &fields.title);
            set_text(&mut goal.description, &fields.description);
            if let Some(start) = &fields.start_date {
                goal.start_date = parse_date_expr(start, today)?;
            }
            if let Some(end) = &fields.end_date {
                goal.end_date = Some(parse_date_expr(end, today)?);
            }
            goal.replace_sections(fields.sections.as_slice());
            for title in &fields.add_sections {
                let id = goal.add_section().id.clone();
                goal.rename_section(&id, title);
            }
            for rename in &fields.rename_sections {
                if !goal.rename_section(&rename.key, &rename.value) {
                    bail!("goal has no section {}", rename.key);
                }
            }
            for id in &fields.remove_sections {
                if !goal.remove_section(id) {
                    bail!("cannot remove section {id}; a goal keeps at least one section");
                }
            }
        }
    }
    Ok(())
}

fn set_text(field: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *field = value.clone();
    }
}

/// Blank clears the field and leaves the form to reject it.
fn set_time(field: &mut String, value: &Option<String>) -> anyhow::Result<()> {
    match value.as_deref().map(str::trim) {
        None => {}
        Some("") => field.clear(),
        Some(time) => *field = normalize_time(time)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::settings::Settings;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).single().expect("valid now")
    }

    fn session(with_fixtures: bool) -> Session<FixedClock> {
        let planner = if with_fixtures {
            Planner::with_fixtures(fixtures::load().expect("fixtures"), Settings::default(), chrono_tz::UTC)
        } else {
            Planner::new(Settings::default(), chrono_tz::UTC)
        };
        Session::new(planner, QuickAdd::default(), Renderer::plain(), 7, FixedClock(now()))
    }

    fn exec(session: &mut Session<FixedClock>, line: &str) -> anyhow::Result<String> {
        let mut out = Vec::new();
        session.execute_line(line, &mut out)?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn prompt_shows_the_clock() {
        assert_eq!(session(false).prompt(), "[09:05 AM] planner> ");
    }

    #[test]
    fn add_event_normalises_times_and_dates() {
        let mut session = session(false);
        let text = exec(
            &mut session,
            "add event --title Standup --date tomorrow --start '9:30 am' --end 10:00 --location ''",
        )
        .expect("add");
        assert!(text.starts_with("Created event "), "{text}");

        let event = &session.planner().events()[0];
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 1, 16).expect("valid date"));
        assert_eq!(event.start_time, "09:30");
        assert_eq!(event.location, None);
    }

    #[test]
    fn incomplete_form_adds_nothing() {
        let mut session = session(false);
        let text = exec(&mut session, "add event --title Standup --start 09:00").expect("add");
        assert_eq!(text, "Nothing added: an event needs a title, a start time and an end time.\n");
        assert!(session.planner().events().is_empty());
        assert!(!session.quick_add.is_open());
    }

    #[test]
    fn blank_event_time_fails_validation_quietly() {
        let mut session = session(false);
        let text = exec(&mut session, "add event --title Standup --start '' --end 10:00").expect("add");
        assert_eq!(text, "Nothing added: an event needs a title, a start time and an end time.\n");
        assert!(session.planner().events().is_empty());
    }

    #[test]
    fn bare_add_lists_the_kinds() {
        let mut session = session(false);
        let text = exec(&mut session, "add").expect("add");
        assert_eq!(
            text,
            "What would you like to add?\n  > Task    Create a new task\n    Event   Schedule an event\n    Goal    Set a new goal\nFill one in with `add <kind> --title ...`.\n"
        );
        assert!(session.planner().tasks().is_empty());
        assert!(!session.quick_add.is_open());

        exec(&mut session, "add goal").expect("add goal");
        let text = exec(&mut session, "add").expect("add");
        assert!(text.contains("  > Goal    Set a new goal"), "{text}");
    }

    #[test]
    fn events_on_a_day_combine_with_query_and_status() {
        let mut session = session(true);
        let text = exec(&mut session, "events meeting --on 2024-01-15 --status pending").expect("events");
        assert!(text.contains("Team Meeting"), "{text}");
        assert!(!text.contains("Project Kickoff Meeting"), "{text}");
        assert!(!text.contains("Client Presentation"), "{text}");

        let text = exec(&mut session, "events demo --on today").expect("events");
        assert_eq!(text, "No events found.\n");
    }

    #[test]
    fn foreign_flag_is_an_error() {
        let mut session = session(false);
        let err = exec(&mut session, "add task --title x --start 10:00").expect_err("foreign flag");
        assert!(err.to_string().contains("--start"));
        assert!(session.planner().tasks().is_empty());
    }

    #[test]
    fn edit_goal_sections_through_the_form() {
        let mut session = session(true);
        exec(&mut session, "edit goal 1 --add-section Retrospective --rename-section 3=Profiling").expect("edit");

        let goal = session.planner().goals().iter().find(|g| g.id == "1").expect("goal");
        let titles: Vec<_> = goal.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Complete Hooks Deep Dive",
                "Learn Context Patterns",
                "Profiling",
                "Build Advanced Project",
                "Retrospective"
            ]
        );
        assert_eq!(goal.sections[4].id, "5");
        assert_eq!(goal.progress_percent(), 40);
    }

    #[test]
    fn finishing_last_section_announces_goal() {
        let mut session = session(true);
        exec(&mut session, "section 2 3").expect("section");
        let text = exec(&mut session, "section 2 4").expect("section");
        assert_eq!(text, "Section 4 of goal 2 completed.\nGoal 2 complete!\n");
    }

    #[test]
    fn done_on_goal_is_rejected() {
        let mut session = session(true);
        assert!(exec(&mut session, "done goal 1").is_err());
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut session = session(false);
        assert!(exec(&mut session, "frobnicate").is_err());
    }

    #[test]
    fn run_reports_errors_and_continues() {
        let mut session = session(false);
        let input = "settings ring 7\nadd task --title Report\nquit\nadd task --title Never\n";
        let mut out = Vec::new();
        session.run(input.as_bytes(), &mut out, false).expect("run");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("error: ring duration must be 5-60 seconds"), "{text}");
        assert!(text.contains("Created task "));
        assert_eq!(session.planner().tasks().len(), 1);
    }
}
