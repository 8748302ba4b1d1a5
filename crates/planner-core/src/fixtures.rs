//! Seed data loaded into a fresh session.

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use planner_shared::{Event, Goal, GoalSection, Priority, Task};

pub struct Fixtures {
    pub tasks: Vec<Task>,
    pub events: Vec<Event>,
    pub goals: Vec<Goal>,
}

fn date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid fixture date {raw}"))
}

fn at_nine(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    date(raw)?
        .and_hms_opt(9, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid fixture time for {raw}"))
}

fn section(id: &str, title: &str, completed: bool) -> GoalSection {
    GoalSection {
        completed,
        ..GoalSection::new(id, title)
    }
}

pub fn load() -> anyhow::Result<Fixtures> {
    Ok(Fixtures {
        tasks: tasks()?,
        events: events()?,
        goals: goals()?,
    })
}

fn tasks() -> anyhow::Result<Vec<Task>> {
    let task = |id: &str,
                title: &str,
                description: &str,
                due: Option<&str>,
                priority: Priority,
                created: &str,
                completed_at: Option<&str>|
     -> anyhow::Result<Task> {
        Ok(Task {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            due_date: due.map(date).transpose()?,
            priority,
            completed: completed_at.is_some(),
            completed_at: completed_at.map(at_nine).transpose()?,
            created_at: date(created)?,
        })
    };

    Ok(vec![
        task(
            "1",
            "Complete project proposal",
            "Write and review the Q1 project proposal document",
            Some("2024-01-15"),
            Priority::High,
            "2024-01-10",
            None,
        )?,
        task(
            "2",
            "Review team feedback",
            "Go through all team feedback from last sprint",
            Some("2024-01-16"),
            Priority::Medium,
            "2024-01-11",
            None,
        )?,
        task(
            "3",
            "Update documentation",
            "Update API documentation with new endpoints",
            Some("2024-01-17"),
            Priority::Low,
            "2024-01-09",
            Some("2024-01-14"),
        )?,
        task(
            "4",
            "Update user interface",
            "Redesign the main dashboard with new components",
            None,
            Priority::Medium,
            "2024-01-08",
            Some("2024-01-13"),
        )?,
        task(
            "5",
            "Write technical documentation",
            "Document the new API endpoints and usage examples",
            None,
            Priority::High,
            "2024-01-02",
            Some("2024-01-06"),
        )?,
    ])
}

fn events() -> anyhow::Result<Vec<Event>> {
    let event = |id: &str,
                 title: &str,
                 description: &str,
                 day: &str,
                 (start, end): (&str, &str),
                 location: &str,
                 completed_at: Option<&str>|
     -> anyhow::Result<Event> {
        Ok(Event {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            date: date(day)?,
            start_time: start.to_string(),
            end_time: end.to_string(),
            location: Some(location.to_string()),
            completed: completed_at.is_some(),
            completed_at: completed_at.map(at_nine).transpose()?,
            created_at: date("2024-01-02")?,
        })
    };

    Ok(vec![
        event(
            "1",
            "Team Meeting",
            "Weekly team sync and planning session",
            "2024-01-15",
            ("10:00", "11:00"),
            "Conference Room A",
            None,
        )?,
        event(
            "2",
            "Client Presentation",
            "Present Q1 roadmap to key stakeholders",
            "2024-01-16",
            ("14:00", "15:30"),
            "Virtual - Zoom",
            None,
        )?,
        event(
            "3",
            "Product Demo",
            "Demo new features to the product team",
            "2024-01-17",
            ("09:00", "10:00"),
            "Product Lab",
            Some("2024-01-17"),
        )?,
        event(
            "4",
            "Project Kickoff Meeting",
            "Initial meeting with stakeholders to define project scope",
            "2024-01-10",
            ("09:00", "10:30"),
            "Conference Room B",
            Some("2024-01-11"),
        )?,
    ])
}

fn goals() -> anyhow::Result<Vec<Goal>> {
    Ok(vec![
        Goal {
            id: "1".to_string(),
            title: "Learn React Advanced Patterns".to_string(),
            description: "Master advanced React concepts and patterns for better code architecture".to_string(),
            start_date: date("2024-01-01")?,
            end_date: date("2024-03-31")?,
            sections: vec![
                section("1", "Complete Hooks Deep Dive", true),
                section("2", "Learn Context Patterns", true),
                section("3", "Master Performance Optimization", false),
                section("4", "Build Advanced Project", false),
            ],
            completed: false,
            completed_at: None,
            created_at: date("2024-01-01")?,
        },
        Goal {
            id: "2".to_string(),
            title: "Complete Fitness Challenge".to_string(),
            description: "30-day fitness transformation challenge with daily workouts".to_string(),
            start_date: date("2024-01-01")?,
            end_date: date("2024-01-31")?,
            sections: vec![
                section("1", "Week 1: Foundation Building", true),
                section("2", "Week 2: Intensity Increase", true),
                section("3", "Week 3: Strength Focus", false),
                section("4", "Week 4: Peak Performance", false),
            ],
            completed: false,
            completed_at: None,
            created_at: date("2024-01-01")?,
        },
        Goal {
            id: "3".to_string(),
            title: "Complete TypeScript Course".to_string(),
            description: "Master TypeScript fundamentals and advanced concepts".to_string(),
            start_date: date("2023-12-01")?,
            end_date: date("2024-01-08")?,
            sections: vec![
                section("1", "Fundamentals", true),
                section("2", "Generics", true),
                section("3", "Advanced Types", true),
            ],
            completed: true,
            completed_at: Some(at_nine("2024-01-09")?),
            created_at: date("2023-12-01")?,
        },
    ])
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn fixtures_load_with_unique_ids() {
        let fixtures = load().expect("fixtures");
        let unique = |ids: Vec<&str>| ids.iter().collect::<HashSet<_>>().len() == ids.len();

        assert!(unique(fixtures.tasks.iter().map(|t| t.id.as_str()).collect()));
        assert!(unique(fixtures.events.iter().map(|e| e.id.as_str()).collect()));
        assert!(unique(fixtures.goals.iter().map(|g| g.id.as_str()).collect()));
        assert_eq!(fixtures.goals[0].progress_percent(), 50);
    }

    #[test]
    fn completed_goal_fixture_has_all_sections_done() {
        let fixtures = load().expect("fixtures");
        let done: Vec<_> = fixtures.goals.iter().filter(|g| g.completed).collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].progress_percent(), 100);
    }
}
