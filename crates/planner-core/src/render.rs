use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, NaiveDate, Utc};
use planner_shared::{EntityKind, Event, Goal, Priority, Task};
use unicode_width::UnicodeWidthStr;

use crate::archive::{ArchiveStats, ArchivedItem};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::filter::{GoalStats, is_overdue};
use crate::settings::Settings;

const BAR_WIDTH: usize = 10;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn print_tasks<W: Write>(&self, out: &mut W, tasks: &[&Task], today: NaiveDate) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let headers = ["ID", "Done", "Priority", "Due", "Title"];
        let rows = tasks
            .iter()
            .map(|task| {
                let due = match task.due_date {
                    Some(date) if is_overdue(task, today) => self.paint(&format!("{date} overdue"), "31"),
                    Some(date) => date.to_string(),
                    None => String::new(),
                };
                vec![
                    self.paint(&task.id, "33"),
                    self.check(task.completed),
                    self.priority(task.priority),
                    due,
                    task.title.clone(),
                ]
            })
            .collect();

        write_table(out, &headers, rows)
    }

    #[tracing::instrument(skip_all, fields(count = events.len()))]
    pub fn print_events<W: Write>(&self, out: &mut W, events: &[&Event]) -> anyhow::Result<()> {
        if events.is_empty() {
            writeln!(out, "No events found.")?;
            return Ok(());
        }

        let headers = ["ID", "Done", "Date", "Time", "Title", "Location"];
        let rows = events
            .iter()
            .map(|event| {
                vec![
                    self.paint(&event.id, "33"),
                    self.check(event.completed),
                    event.date.to_string(),
                    format!("{}-{}", event.start_time, event.end_time),
                    event.title.clone(),
                    event.location.clone().unwrap_or_default(),
                ]
            })
            .collect();

        write_table(out, &headers, rows)
    }

    #[tracing::instrument(skip_all, fields(count = goals.len()))]
    pub fn print_goals<W: Write>(&self, out: &mut W, goals: &[&Goal], stats: &GoalStats) -> anyhow::Result<()> {
        if goals.is_empty() {
            writeln!(out, "No goals found.")?;
            return Ok(());
        }

        for goal in goals {
            let percent = goal.progress_percent();
            writeln!(
                out,
                "{} {} {}  {} {:>3}%  ({} to {})",
                self.paint(&goal.id, "33"),
                self.check(goal.completed),
                goal.title,
                bar(f64::from(percent) / 100.0),
                percent,
                goal.start_date,
                goal.end_date
            )?;
            for section in &goal.sections {
                writeln!(out, "    {} {} {}", self.check(section.completed), section.id, section.title)?;
            }
        }

        writeln!(
            out,
            "{}, {}/{} sections done, average progress {:.0}%",
            count(stats.goals, "goal"),
            stats.completed_sections,
            stats.total_sections,
            stats.average_progress
        )?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = items.len()))]
    pub fn print_archive<W: Write>(
        &self,
        out: &mut W,
        items: &[&ArchivedItem],
        stats: &ArchiveStats,
        now: DateTime<Utc>,
        retention_days: i64,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "Archive: {} total ({}, {}, {})",
            stats.total,
            count(stats.tasks, "task"),
            count(stats.events, "event"),
            count(stats.goals, "goal")
        )?;
        if items.is_empty() {
            writeln!(out, "No archived items found.")?;
            return Ok(());
        }

        let headers = ["ID", "Kind", "Title", "Archived", "Retention"];
        let rows = items
            .iter()
            .map(|item| {
                let countdown = item.countdown(now, retention_days);
                let label = countdown.label();
                let label = if countdown.is_due() {
                    self.paint(&label, "31")
                } else {
                    label
                };
                vec![
                    self.paint(item.id(), "33"),
                    item.kind().to_string(),
                    item.record.title().to_string(),
                    item.archived_at.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{} {label}", bar(countdown.elapsed_fraction())),
                ]
            })
            .collect();

        write_table(out, &headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_dashboard<W: Write>(&self, out: &mut W, dash: &Dashboard<'_>) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&format!("Dashboard for {}", dash.today), "1"))?;
        writeln!(
            out,
            "open tasks: {}  upcoming events: {}  active goals: {}  archived: {}",
            dash.open_tasks, dash.upcoming_events, dash.active_goals, dash.archived
        )?;

        writeln!(out)?;
        writeln!(out, "Recent tasks")?;
        self.print_tasks(out, &dash.recent_tasks, dash.today)?;

        writeln!(out)?;
        writeln!(out, "Upcoming events")?;
        self.print_events(out, &dash.next_events)?;

        writeln!(out)?;
        writeln!(out, "Active goals")?;
        if dash.goals.is_empty() {
            writeln!(out, "No goals found.")?;
        }
        for goal in &dash.goals {
            let percent = goal.progress_percent();
            writeln!(out, "  {} {:>3}%  {}", bar(f64::from(percent) / 100.0), percent, goal.title)?;
        }
        Ok(())
    }

    /// The quick-add kind picker, selection marked with `>`.
    pub fn print_quick_add<W: Write>(&self, out: &mut W, options: &[(EntityKind, bool)]) -> anyhow::Result<()> {
        writeln!(out, "What would you like to add?")?;
        for (kind, selected) in options {
            let marker = if *selected { ">" } else { " " };
            let label = format!("{:<6}", kind.label());
            writeln!(out, "  {marker} {}  {}", self.paint(&label, "1"), kind.blurb())?;
        }
        writeln!(out, "Fill one in with `add <kind> --title ...`.")?;
        Ok(())
    }

    pub fn print_settings<W: Write>(&self, out: &mut W, settings: &Settings) -> anyhow::Result<()> {
        let on_off = |flag: bool| if flag { "on" } else { "off" };
        writeln!(out, "dark mode      {}", on_off(settings.dark_mode))?;
        writeln!(out, "ring duration  {}s", settings.ring_duration_secs)?;
        writeln!(out, "snooze         {} min", settings.snooze_minutes)?;
        writeln!(out, "ringtones")?;
        for (id, name) in settings.ringtones() {
            let marker = if id == settings.selected_ringtone { "*" } else { " " };
            writeln!(out, "  {marker} {id:<10} {name}")?;
        }
        Ok(())
    }

    fn check(&self, done: bool) -> String {
        if done {
            self.paint("[x]", "32")
        } else {
            "[ ]".to_string()
        }
    }

    fn priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "36",
        };
        self.paint(&priority.to_string(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 { format!("1 {noun}") } else { format!("{n} {noun}s") }
}

/// Fixed-width progress bar for a fraction in `0..=1`.
fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn write_table<W: Write>(writer: &mut W, headers: &[&str], rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| UnicodeWidthStr::width(*h)).collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line: Vec<String> = (0..column_count)
        .map(|idx| format!("{:width$}", headers[idx], width = widths[idx]))
        .collect();
    writeln!(writer, "{}", header_line.join(" ").trim_end())?;

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(writer, "{}", rule.join(" "))?;

    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            if idx > 0 {
                line.push(' ');
            }
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[idx].saturating_sub(visible_width)));
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
