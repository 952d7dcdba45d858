//! Listing filters and sort orders.

use std::{cmp::Ordering, str::FromStr};

use time::Date;

use crate::{
    dates, scan::Entry, Error, Priority, ProjectStatus, Record, Result, TaskStatus,
};

/* ---------- predicates ---------- */

pub fn is_overdue(due: Date, today: Date) -> bool {
    due < today
}

/// `today <= due <= today + days`.
pub fn is_due_soon(due: Date, today: Date, days: u32) -> bool {
    match today.checked_add(time::Duration::days(i64::from(days))) {
        Some(limit) => due >= today && due <= limit,
        None => due >= today,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DueWindow {
    Today,
    Week,
    Month,
    On(Date),
}

impl DueWindow {
    pub fn contains(&self, due: Date, today: Date) -> bool {
        match self {
            DueWindow::Today => due == today,
            DueWindow::Week => is_due_soon(due, today, 7),
            DueWindow::Month => match dates::add_months(today, 1) {
                Ok(limit) => due >= today && due <= limit,
                Err(_) => due >= today,
            },
            DueWindow::On(d) => due == *d,
        }
    }
}

impl FromStr for DueWindow {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(DueWindow::Today),
            "week" => Ok(DueWindow::Week),
            "month" => Ok(DueWindow::Month),
            other => dates::parse_iso(other).map(DueWindow::On).map_err(|_| {
                Error::Validation(format!(
                    "invalid due filter: {s} (use today, week, month or YYYY-MM-DD)"
                ))
            }),
        }
    }
}

fn due_checks(
    record: &Record,
    today: Date,
    due: Option<DueWindow>,
    overdue: bool,
    soon_days: Option<u32>,
) -> bool {
    if due.is_none() && !overdue && soon_days.is_none() {
        return true;
    }
    let Some(d) = record.due_date() else {
        return false;
    };
    due.map_or(true, |w| w.contains(d, today))
        && (!overdue || is_overdue(d, today))
        && soon_days.map_or(true, |n| is_due_soon(d, today, n))
}

#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub all: bool,
    pub priority: Option<Priority>,
    /// Case-insensitive.
    pub project: Option<String>,
    pub area: Option<String>,
    pub tag: Option<String>,
    pub due: Option<DueWindow>,
    pub overdue: bool,
    pub soon_days: Option<u32>,
}

impl TaskFilter {
    pub fn matches(&self, record: &Record, today: Date) -> bool {
        let Some(t) = record.task() else {
            return false;
        };
        let status_ok = match (self.status, self.all) {
            (Some(s), _) => t.status == s,
            (None, true) => true,
            (None, false) => t.status == TaskStatus::Open,
        };
        status_ok
            && self.priority.map_or(true, |p| t.priority == Some(p))
            && self.project.as_deref().map_or(true, |p| {
                t.project
                    .as_deref()
                    .is_some_and(|tp| tp.eq_ignore_ascii_case(p))
            })
            && self
                .area
                .as_deref()
                .map_or(true, |a| t.area.as_deref() == Some(a))
            && self.tag.as_deref().map_or(true, |tag| record.has_tag(tag))
            && due_checks(record, today, self.due, self.overdue, self.soon_days)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub all: bool,
    pub area: Option<String>,
    pub overdue: bool,
    pub soon_days: Option<u32>,
}

impl ProjectFilter {
    pub fn matches(&self, record: &Record, today: Date) -> bool {
        let Some(p) = record.project() else {
            return false;
        };
        let status_ok = match (self.status, self.all) {
            (Some(s), _) => p.status == s,
            (None, true) => true,
            (None, false) => p.status == ProjectStatus::Active,
        };
        status_ok
            && self
                .area
                .as_deref()
                .map_or(true, |a| p.area.as_deref() == Some(a))
            && due_checks(record, today, None, self.overdue, self.soon_days)
    }
}

#[derive(Clone, Debug, Default)]
pub struct NoteFilter {
    pub tag: Option<String>,
}

impl NoteFilter {
    pub fn matches(&self, record: &Record) -> bool {
        self.tag.as_deref().map_or(true, |t| record.has_tag(t))
    }
}

/* ---------- sorting ---------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Modified,
    Priority,
    Due,
    Created,
    Start,
    Estimate,
    Name,
    Area,
}

impl FromStr for SortKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_lowercase().as_str() {
            "modified" => SortKey::Modified,
            "priority" => SortKey::Priority,
            "due" => SortKey::Due,
            "created" => SortKey::Created,
            "start" => SortKey::Start,
            "estimate" => SortKey::Estimate,
            "name" => SortKey::Name,
            "area" => SortKey::Area,
            other => {
                return Err(Error::Validation(format!(
                    "invalid sort key: {other} (use modified, priority, due, created, start, estimate, name or area)"
                )))
            }
        })
    }
}

fn directed(ord: Ordering, reverse: bool) -> Ordering {
    if reverse {
        ord.reverse()
    } else {
        ord
    }
}

/// Present values compare (optionally reversed); absent ones always last.
fn missing_last<T: Ord>(a: Option<T>, b: Option<T>, reverse: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), reverse),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn name_key(r: &Record) -> String {
    r.title.to_lowercase()
}

fn compare(a: &Entry, b: &Entry, key: SortKey, reverse: bool) -> Ordering {
    let (ra, rb) = (&a.record, &b.record);
    match key {
        SortKey::Modified => directed(b.modified.cmp(&a.modified), reverse),
        SortKey::Priority => missing_last(ra.priority(), rb.priority(), reverse)
            .then_with(|| missing_last(ra.due_date(), rb.due_date(), reverse)),
        SortKey::Due => missing_last(ra.due_date(), rb.due_date(), reverse),
        SortKey::Created => directed(rb.id.cmp(&ra.id), reverse),
        SortKey::Start => missing_last(ra.start_date(), rb.start_date(), reverse),
        SortKey::Estimate => missing_last(ra.estimate(), rb.estimate(), reverse),
        SortKey::Name => directed(name_key(ra).cmp(&name_key(rb)), reverse),
        SortKey::Area => missing_last(
            ra.area().map(str::to_lowercase),
            rb.area().map(str::to_lowercase),
            reverse,
        )
        .then_with(|| directed(name_key(ra).cmp(&name_key(rb)), reverse)),
    }
}

/// Stable sort by `key`.
pub fn sort_entries(entries: &mut [Entry], key: SortKey, reverse: bool) {
    entries.sort_by(|a, b| compare(a, b, key, reverse));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Meta, TaskMeta};
    use std::path::PathBuf;
    use time::{macros::date, OffsetDateTime};

    const TODAY: Date = date!(2024 - 06 - 01);

    fn task(title: &str, meta: TaskMeta) -> Record {
        let mut r = Record::new("20240601T090000", title, vec!["task".into()]);
        r.meta = Meta::Task(meta);
        r
    }

    fn entry(record: Record) -> Entry {
        Entry {
            index: 0,
            path: PathBuf::from(record.filename()),
            filename: record.filename(),
            record,
            modified: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn titles(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.record.title.as_str()).collect()
    }

    #[test]
    fn default_task_filter_shows_open_only() {
        let open = task("a", TaskMeta::default());
        let done = task(
            "b",
            TaskMeta {
                status: TaskStatus::Done,
                ..Default::default()
            },
        );
        let f = TaskFilter::default();
        assert!(f.matches(&open, TODAY));
        assert!(!f.matches(&done, TODAY));

        let all = TaskFilter {
            all: true,
            ..Default::default()
        };
        assert!(all.matches(&done, TODAY));

        let note = Record::new("20240601T090000", "n", vec![]);
        assert!(!all.matches(&note, TODAY));
        assert!(NoteFilter::default().matches(&note));
    }

    #[test]
    fn project_filter_is_case_insensitive() {
        let t = task(
            "a",
            TaskMeta {
                project: Some("Launch".into()),
                ..Default::default()
            },
        );
        let f = TaskFilter {
            project: Some("launch".into()),
            ..Default::default()
        };
        assert!(f.matches(&t, TODAY));
    }

    #[test]
    fn due_soon_boundaries() {
        assert!(is_due_soon(date!(2024 - 06 - 01), TODAY, 7));
        assert!(is_due_soon(date!(2024 - 06 - 08), TODAY, 7));
        assert!(!is_due_soon(date!(2024 - 06 - 09), TODAY, 7));
        assert!(!is_due_soon(date!(2024 - 05 - 31), TODAY, 7));
        assert!(is_overdue(date!(2024 - 05 - 31), TODAY));
        assert!(!is_overdue(TODAY, TODAY));
    }

    #[test]
    fn due_windows() {
        assert_eq!("week".parse::<DueWindow>().unwrap(), DueWindow::Week);
        assert_eq!(
            "2024-06-03".parse::<DueWindow>().unwrap(),
            DueWindow::On(date!(2024 - 06 - 03))
        );
        assert!("later".parse::<DueWindow>().is_err());
        assert!(DueWindow::Month.contains(date!(2024 - 07 - 01), TODAY));
        assert!(!DueWindow::Month.contains(date!(2024 - 07 - 02), TODAY));

        let undated = task("x", TaskMeta::default());
        let f = TaskFilter {
            due: Some(DueWindow::Week),
            ..Default::default()
        };
        assert!(!f.matches(&undated, TODAY));
    }

    #[test]
    fn priority_sort_keeps_unset_last_when_reversed() {
        let mk = |title: &str, p: Option<Priority>, due: Option<Date>| {
            entry(task(
                title,
                TaskMeta {
                    priority: p,
                    due_date: due,
                    ..Default::default()
                },
            ))
        };
        let mut entries = vec![
            mk("none", None, None),
            mk("p2", Some(Priority::P2), None),
            mk("p1-late", Some(Priority::P1), Some(date!(2024 - 06 - 20))),
            mk("p1-undated", Some(Priority::P1), None),
            mk("p1-early", Some(Priority::P1), Some(date!(2024 - 06 - 05))),
        ];

        sort_entries(&mut entries, SortKey::Priority, false);
        assert_eq!(
            titles(&entries),
            vec!["p1-early", "p1-late", "p1-undated", "p2", "none"]
        );

        sort_entries(&mut entries, SortKey::Priority, true);
        assert_eq!(
            titles(&entries),
            vec!["p2", "p1-late", "p1-early", "p1-undated", "none"]
        );
    }

    #[test]
    fn optional_keys_keep_unset_last_both_ways() {
        use crate::Estimate;

        let mk = |title: &str, day: Option<u8>| {
            let date = day.map(|d| Date::from_calendar_date(2024, time::Month::June, d).unwrap());
            entry(task(
                title,
                TaskMeta {
                    due_date: date,
                    start_date: date,
                    estimate: day.map(|d| Estimate::try_from(u32::from(d)).unwrap()),
                    ..Default::default()
                },
            ))
        };
        for key in [SortKey::Due, SortKey::Start, SortKey::Estimate] {
            let mut entries = vec![mk("unset", None), mk("five", Some(5)), mk("two", Some(2)), mk("eight", Some(8))];

            sort_entries(&mut entries, key, false);
            assert_eq!(titles(&entries), vec!["two", "five", "eight", "unset"], "{key:?}");

            sort_entries(&mut entries, key, true);
            assert_eq!(titles(&entries), vec!["eight", "five", "two", "unset"], "{key:?} reversed");
        }
    }

    #[test]
    fn created_sort_is_newest_first() {
        let mk = |id: &str, title: &str| {
            let mut r = task(title, TaskMeta::default());
            r.id = id.into();
            entry(r)
        };
        let mut entries = vec![
            mk("20240102T080000", "middle"),
            mk("20230101T080000", "oldest"),
            mk("20240601T080000", "newest"),
        ];
        sort_entries(&mut entries, SortKey::Created, false);
        assert_eq!(titles(&entries), vec!["newest", "middle", "oldest"]);
        sort_entries(&mut entries, SortKey::Created, true);
        assert_eq!(titles(&entries), vec!["oldest", "middle", "newest"]);
    }

    #[test]
    fn name_and_area_sorts() {
        let mk = |title: &str, area: Option<&str>| {
            entry(task(
                title,
                TaskMeta {
                    area: area.map(String::from),
                    ..Default::default()
                },
            ))
        };
        let mut entries = vec![mk("beta", None), mk("Alpha", Some("work")), mk("gamma", Some("Home"))];
        sort_entries(&mut entries, SortKey::Name, false);
        assert_eq!(titles(&entries), vec!["Alpha", "beta", "gamma"]);
        sort_entries(&mut entries, SortKey::Area, false);
        assert_eq!(titles(&entries), vec!["gamma", "Alpha", "beta"]);
        sort_entries(&mut entries, SortKey::Area, true);
        assert_eq!(titles(&entries), vec!["Alpha", "gamma", "beta"]);
        assert!("size".parse::<SortKey>().is_err());
    }
}
