use notes_core::{dates, query, BatchReport, Entry, Meta};
use std::path::{Path, PathBuf};
use time::Date;

fn due_note(due: Option<Date>, today: Date, soon: u32) -> String {
    match due {
        Some(d) if query::is_overdue(d, today) => format!(" due {} (overdue)", dates::format_iso(d)),
        Some(d) if query::is_due_soon(d, today, soon) => format!(" due {} (soon)", dates::format_iso(d)),
        Some(d) => format!(" due {}", dates::format_iso(d)),
        None => String::new(),
    }
}

pub fn task_line(e: &Entry, today: Date, soon: u32) -> String {
    let Meta::Task(t) = &e.record.meta else {
        return note_line(e);
    };
    let mut line = format!("{:>3}. [{}]", e.index, t.status);
    if let Some(id) = t.task_id {
        line.push_str(&format!(" #{id}"));
    }
    if let Some(p) = t.priority {
        line.push_str(&format!(" {p}"));
    }
    line.push_str(&format!(" {}", e.record.title));
    line.push_str(&due_note(t.due_date, today, soon));
    if let Some(est) = t.estimate {
        line.push_str(&format!(" ~{est}"));
    }
    if let Some(p) = &t.project {
        line.push_str(&format!(" +{p}"));
    }
    if let Some(a) = &t.area {
        line.push_str(&format!(" @{a}"));
    }
    line
}

pub fn project_line(e: &Entry, today: Date, soon: u32) -> String {
    let Meta::Project(p) = &e.record.meta else {
        return note_line(e);
    };
    let mut line = format!("{:>3}. [{}]", e.index, p.status);
    if let Some(id) = p.project_id {
        line.push_str(&format!(" #{id}"));
    }
    if let Some(pr) = p.priority {
        line.push_str(&format!(" {pr}"));
    }
    line.push_str(&format!(" {}", e.record.title));
    line.push_str(&due_note(p.due_date, today, soon));
    if let Some(a) = &p.area {
        line.push_str(&format!(" @{a}"));
    }
    line
}

pub fn note_line(e: &Entry) -> String {
    let tags = if e.record.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", e.record.tags.join(", "))
    };
    format!("{:>3}. {}{tags}", e.index, e.record.title)
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Prints one line per target; failures go to stderr.
pub fn batch(verb: &str, report: &BatchReport<PathBuf>) {
    for (target, path) in report.succeeded() {
        println!("{verb} {target}: {}", display_name(path));
    }
    for (target, err) in report.failed() {
        eprintln!("error: {target}: {err}");
    }
    if report.len() > 1 {
        println!(
            "{} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
    }
}
