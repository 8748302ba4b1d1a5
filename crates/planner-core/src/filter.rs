use chrono::NaiveDate;
use clap::ValueEnum;
use planner_shared::{Event, Goal, Record, Task};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn accepts(self, completed: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !completed,
            StatusFilter::Completed => completed,
        }
    }
}

/// Anything a list view can search by text and status.
pub trait Searchable {
    fn title(&self) -> &str;

    fn description(&self) -> &str;

    fn is_completed(&self) -> bool;
}

impl Searchable for Task {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Searchable for Event {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Searchable for Goal {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Searchable for Record {
    fn title(&self) -> &str {
        Record::title(self)
    }

    fn description(&self) -> &str {
        Record::description(self)
    }

    fn is_completed(&self) -> bool {
        Record::is_completed(self)
    }
}

/// Case-insensitive substring match on title or description. An empty
/// query matches everything.
pub fn matches_query<T: Searchable + ?Sized>(item: &T, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    item.title().to_lowercase().contains(&q) || item.description().to_lowercase().contains(&q)
}

/// Items matching both the query and the status filter, in store order.
#[tracing::instrument(skip(items), fields(total = items.len()))]
pub fn filter_list<'a, T: Searchable>(items: &'a [T], query: &str, status: StatusFilter) -> Vec<&'a T> {
    let out: Vec<&T> = items
        .iter()
        .filter(|item| matches_query(*item, query) && status.accepts(item.is_completed()))
        .collect();
    trace!(matched = out.len(), "filtered list");
    out
}

pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.completed && task.due_date.is_some_and(|due| due < today)
}

/// Events scheduled on `date`, in store order.
pub fn events_on(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    events.iter().filter(|event| event.date == date).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalStats {
    pub goals: usize,
    pub total_sections: usize,
    pub completed_sections: usize,
    /// Mean of the per-goal percentages; 0 without goals.
    pub average_progress: f64,
}

pub fn goal_stats(goals: &[Goal]) -> GoalStats {
    let total_sections = goals.iter().map(|g| g.sections.len()).sum();
    let completed_sections = goals.iter().map(Goal::completed_sections).sum();
    let average_progress = if goals.is_empty() {
        0.0
    } else {
        goals.iter().map(|g| f64::from(g.progress_percent())).sum::<f64>() / goals.len() as f64
    };

    GoalStats {
        goals: goals.len(),
        total_sections,
        completed_sections,
        average_progress,
    }
}

#[cfg(test)]
mod tests {
    use planner_shared::{GoalSection, Priority};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn task(title: &str, description: &str, completed: bool) -> Task {
        Task {
            id: title.to_lowercase(),
            title: title.to_string(),
            description: description.to_string(),
            due_date: None,
            priority: Priority::Medium,
            completed,
            completed_at: None,
            created_at: date(2024, 1, 1),
        }
    }

    #[test]
    fn substring_query_is_case_insensitive() {
        let tasks = vec![task("Alpha", "", false), task("Beta", "", false), task("Gamma", "", false)];
        let found = filter_list(&tasks, "a", StatusFilter::All);
        assert_eq!(found.len(), 3);

        let found = filter_list(&tasks, "GAM", StatusFilter::All);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Gamma");
    }

    #[test]
    fn description_matches_and_status_narrows() {
        let tasks = vec![
            task("Proposal", "Q1 planning doc", false),
            task("Docs", "update API planning notes", true),
            task("Review", "feedback", false),
        ];

        let pending: Vec<_> = filter_list(&tasks, "planning", StatusFilter::Pending)
            .into_iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(pending, vec!["Proposal"]);

        let done = filter_list(&tasks, "", StatusFilter::Completed);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "Docs");
    }

    #[test]
    fn overdue_needs_past_due_and_open() {
        let today = date(2024, 1, 16);
        let mut open = task("Late", "", false);
        open.due_date = Some(date(2024, 1, 15));
        assert!(is_overdue(&open, today));

        let mut done = open.clone();
        done.completed = true;
        assert!(!is_overdue(&done, today));

        open.due_date = Some(today);
        assert!(!is_overdue(&open, today));
    }

    #[test]
    fn events_on_keeps_store_order_for_one_day() {
        let event = |id: &str, day: u32| Event {
            id: id.to_string(),
            title: format!("Event {id}"),
            description: String::new(),
            date: date(2024, 1, day),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            location: None,
            completed: false,
            completed_at: None,
            created_at: date(2024, 1, 1),
        };
        let events = vec![event("a", 15), event("b", 16), event("c", 15), event("d", 14)];

        let ids: Vec<_> = events_on(&events, date(2024, 1, 15)).into_iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(events_on(&events, date(2024, 1, 20)).is_empty());
    }

    #[test]
    fn goal_stats_average_progress() {
        let mut done = GoalSection::new("1", "a");
        done.completed = true;
        let goal = |id: &str, sections: Vec<GoalSection>| Goal {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 2, 1),
            sections,
            completed: false,
            completed_at: None,
            created_at: date(2024, 1, 1),
        };
        let goals = vec![
            goal("a", vec![done.clone(), GoalSection::new("2", "b")]),
            goal("b", vec![done, GoalSection::new("2", "b"), GoalSection::new("3", "c"), GoalSection::new("4", "d")]),
        ];

        let stats = goal_stats(&goals);
        assert_eq!(stats.total_sections, 6);
        assert_eq!(stats.completed_sections, 2);
        assert!((stats.average_progress - 37.5).abs() < f64::EPSILON);
        assert!((goal_stats(&[]).average_progress).abs() < f64::EPSILON);
    }
}
