use chrono::{DateTime, NaiveDate, Utc};
use planner_shared::{Event, Goal, Task};

use crate::planner::Planner;

const RECENT_TASKS: usize = 3;
const UPCOMING_EVENTS: usize = 3;

/// Overview shown by the `dashboard` view.
#[derive(Debug, Clone)]
pub struct Dashboard<'a> {
    pub today: NaiveDate,
    pub open_tasks: usize,
    pub upcoming_events: usize,
    pub active_goals: usize,
    pub archived: usize,
    pub recent_tasks: Vec<&'a Task>,
    pub next_events: Vec<&'a Event>,
    pub goals: Vec<&'a Goal>,
}

#[tracing::instrument(skip_all)]
pub fn build(planner: &Planner, now: DateTime<Utc>) -> Dashboard<'_> {
    let today = planner.today(now);

    let mut open: Vec<&Task> = planner.tasks().iter().filter(|t| !t.completed).collect();
    // undated tasks sort last
    open.sort_by_key(|t| (t.due_date.is_none(), t.due_date));

    let mut upcoming: Vec<&Event> = planner
        .events()
        .iter()
        .filter(|e| !e.completed && e.date >= today)
        .collect();
    upcoming.sort_by(|a, b| (a.date, &a.start_time).cmp(&(b.date, &b.start_time)));

    let goals: Vec<&Goal> = planner.goals().iter().filter(|g| !g.completed).collect();

    Dashboard {
        today,
        open_tasks: open.len(),
        upcoming_events: upcoming.len(),
        active_goals: goals.len(),
        archived: planner.archive().len(),
        recent_tasks: open.into_iter().take(RECENT_TASKS).collect(),
        next_events: upcoming.into_iter().take(UPCOMING_EVENTS).collect(),
        goals,
    }
}
