use chrono::{DateTime, NaiveTime, Utc};
use clap::ValueEnum;
use planner_shared::{EntityKind, Event, Goal, Record, Task};
use serde::Serialize;
use tracing::instrument;

use crate::filter::{Searchable, matches_query};

pub const DEFAULT_RETENTION_DAYS: i64 = 7;
const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KindFilter {
    #[default]
    All,
    Task,
    Event,
    Goal,
}

impl KindFilter {
    pub fn accepts(self, kind: EntityKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Task => kind == EntityKind::Task,
            KindFilter::Event => kind == EntityKind::Event,
            KindFilter::Goal => kind == EntityKind::Goal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedItem {
    pub record: Record,
    pub archived_at: DateTime<Utc>,
}

impl ArchivedItem {
    /// Wraps a completed record; open records are not archived. The archive
    /// time is the completion time, or the creation day for records that
    /// were seeded as already complete.
    pub fn from_record(record: Record) -> Option<Self> {
        if !record.is_completed() {
            return None;
        }
        let archived_at = record
            .completed_at()
            .unwrap_or_else(|| record.created_at().and_time(NaiveTime::MIN).and_utc());
        Some(Self { record, archived_at })
    }

    pub fn kind(&self) -> EntityKind {
        self.record.kind()
    }

    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn countdown(&self, now: DateTime<Utc>, retention_days: i64) -> Countdown {
        Countdown::compute(self.archived_at, now, retention_days)
    }
}

impl Searchable for ArchivedItem {
    fn title(&self) -> &str {
        self.record.title()
    }

    fn description(&self) -> &str {
        self.record.description()
    }

    fn is_completed(&self) -> bool {
        true
    }
}

/// Display-only retention countdown. Nothing is ever purged when it runs
/// out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days_in_archive: i64,
    pub remaining: i64,
    pub retention_days: i64,
}

impl Countdown {
    /// `days_in_archive` is the absolute distance to `now`, rounded up to
    /// whole days.
    pub fn compute(archived_at: DateTime<Utc>, now: DateTime<Utc>, retention_days: i64) -> Self {
        let millis = (now - archived_at).num_milliseconds().abs();
        let days_in_archive = (millis + DAY_MILLIS - 1) / DAY_MILLIS;
        Self {
            days_in_archive,
            remaining: retention_days - days_in_archive,
            retention_days,
        }
    }

    pub fn is_due(&self) -> bool {
        self.remaining <= 0
    }

    pub fn label(&self) -> String {
        match self.remaining {
            1 => "Auto-delete in 1 day".to_string(),
            n if n > 0 => format!("Auto-delete in {n} days"),
            _ => "Will be deleted soon".to_string(),
        }
    }

    /// Share of the retention window already used, capped at 1.
    pub fn elapsed_fraction(&self) -> f64 {
        if self.retention_days <= 0 {
            return 1.0;
        }
        (self.days_in_archive as f64 / self.retention_days as f64).min(1.0)
    }
}

/// Every completed record across the stores, most recently archived first.
#[instrument(skip_all)]
pub fn collect(tasks: &[Task], events: &[Event], goals: &[Goal]) -> Vec<ArchivedItem> {
    let records = tasks
        .iter()
        .cloned()
        .map(Record::Task)
        .chain(events.iter().cloned().map(Record::Event))
        .chain(goals.iter().cloned().map(Record::Goal));

    let mut items: Vec<ArchivedItem> = records.filter_map(ArchivedItem::from_record).collect();
    items.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
    items
}

pub fn filter_archive<'a>(items: &'a [ArchivedItem], query: &str, kind: KindFilter) -> Vec<&'a ArchivedItem> {
    items
        .iter()
        .filter(|item| kind.accepts(item.kind()) && matches_query(*item, query))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveStats {
    pub total: usize,
    pub tasks: usize,
    pub events: usize,
    pub goals: usize,
}

pub fn archive_stats(items: &[ArchivedItem]) -> ArchiveStats {
    items.iter().fold(ArchiveStats::default(), |mut stats, item| {
        stats.total += 1;
        match item.kind() {
            EntityKind::Task => stats.tasks += 1,
            EntityKind::Event => stats.events += 1,
            EntityKind::Goal => stats.goals += 1,
        }
        stats
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone};
    use planner_shared::Priority;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).single().expect("valid now")
    }

    fn task(id: &str, title: &str, completed_at: Option<DateTime<Utc>>) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            due_date: None,
            priority: Priority::Medium,
            completed: completed_at.is_some(),
            completed_at,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
        }
    }

    #[test]
    fn eight_days_old_item_has_no_time_left() {
        let countdown = Countdown::compute(now() - Duration::days(8), now(), DEFAULT_RETENTION_DAYS);
        assert_eq!(countdown.days_in_archive, 8);
        assert!(countdown.remaining <= 0);
        assert!(countdown.is_due());
        assert_eq!(countdown.label(), "Will be deleted soon");
        assert!((countdown.elapsed_fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_days_round_up() {
        let countdown = Countdown::compute(now() - Duration::hours(30), now(), 7);
        assert_eq!(countdown.days_in_archive, 2);
        assert_eq!(countdown.remaining, 5);
        assert_eq!(countdown.label(), "Auto-delete in 5 days");

        let single = Countdown::compute(now() - Duration::days(6), now(), 7);
        assert_eq!(single.label(), "Auto-delete in 1 day");
    }

    #[test]
    fn only_completed_records_are_collected_newest_first() {
        let tasks = vec![
            task("1", "Old", Some(now() - Duration::days(3))),
            task("2", "Open", None),
            task("3", "Recent", Some(now() - Duration::days(1))),
        ];
        let items = collect(&tasks, &[], &[]);
        let ids: Vec<_> = items.iter().map(ArchivedItem::id).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn seeded_completion_falls_back_to_creation_day() {
        let mut seeded = task("1", "Seeded", None);
        seeded.completed = true;
        let item = ArchivedItem::from_record(Record::Task(seeded)).expect("archived");
        assert_eq!(item.archived_at, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid"));
    }

    #[test]
    fn archive_filters_by_kind_and_text() {
        let tasks = vec![task("1", "Write documentation", Some(now()))];
        let items = collect(&tasks, &[], &[]);
        assert_eq!(filter_archive(&items, "DOC", KindFilter::All).len(), 1);
        assert!(filter_archive(&items, "", KindFilter::Goal).is_empty());
        assert_eq!(archive_stats(&items).tasks, 1);
    }
}
