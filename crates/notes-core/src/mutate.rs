//! In-place header edits.
//!
//! Every write path slices the original text around the header span and
//! only replaces the header itself; prefix and body bytes go back untouched.

use std::{
    fs,
    path::{Path, PathBuf},
};

use time::Date;
use tracing::info;

use crate::{
    dates, denote, header, Error, Estimate, Kind, Meta, Priority, ProjectStatus, Record, Result,
    TaskStatus,
};

/// A partial update. Only `Some` fields are applied; there is no way to
/// clear a field through a patch.
pub trait Patch {
    fn apply(&self, record: &mut Record) -> Result<()>;
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn set_title(record: &mut Record, title: &Option<String>) {
    if let Some(t) = non_empty(title) {
        record.title = t;
    }
}

fn wrong_kind(record: &Record, wanted: Kind) -> Error {
    Error::Validation(format!(
        "'{}' is a {}, not a {wanted}",
        record.title,
        record.kind()
    ))
}

#[derive(Clone, Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub start_date: Option<Date>,
    pub estimate: Option<Estimate>,
    pub project: Option<String>,
    pub area: Option<String>,
    pub assignee: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        non_empty(&self.title).is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.start_date.is_none()
            && self.estimate.is_none()
            && non_empty(&self.project).is_none()
            && non_empty(&self.area).is_none()
            && non_empty(&self.assignee).is_none()
    }
}

impl Patch for TaskPatch {
    fn apply(&self, record: &mut Record) -> Result<()> {
        if record.kind() != Kind::Task {
            return Err(wrong_kind(record, Kind::Task));
        }
        set_title(record, &self.title);
        if let Meta::Task(t) = &mut record.meta {
            if let Some(s) = self.status {
                t.status = s;
            }
            if let Some(p) = self.priority {
                t.priority = Some(p);
            }
            if let Some(d) = self.due_date {
                t.due_date = Some(d);
            }
            if let Some(d) = self.start_date {
                t.start_date = Some(d);
            }
            if let Some(e) = self.estimate {
                t.estimate = Some(e);
            }
            if let Some(p) = non_empty(&self.project) {
                t.project = Some(p);
            }
            if let Some(a) = non_empty(&self.area) {
                t.area = Some(a);
            }
            if let Some(a) = non_empty(&self.assignee) {
                t.assignee = Some(a);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub start_date: Option<Date>,
    pub area: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        non_empty(&self.title).is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.start_date.is_none()
            && non_empty(&self.area).is_none()
    }
}

impl Patch for ProjectPatch {
    fn apply(&self, record: &mut Record) -> Result<()> {
        if record.kind() != Kind::Project {
            return Err(wrong_kind(record, Kind::Project));
        }
        set_title(record, &self.title);
        if let Meta::Project(p) = &mut record.meta {
            if let Some(s) = self.status {
                p.status = s;
            }
            if let Some(v) = self.priority {
                p.priority = Some(v);
            }
            if let Some(d) = self.due_date {
                p.due_date = Some(d);
            }
            if let Some(d) = self.start_date {
                p.start_date = Some(d);
            }
            if let Some(a) = non_empty(&self.area) {
                p.area = Some(a);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct NotePatch {
    pub title: Option<String>,
}

impl Patch for NotePatch {
    fn apply(&self, record: &mut Record) -> Result<()> {
        if record.kind() != Kind::Note {
            return Err(wrong_kind(record, Kind::Note));
        }
        set_title(record, &self.title);
        Ok(())
    }
}

/* ---------- tags ---------- */

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagPatch {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl TagPatch {
    /// `"work,-home,urgent"`: a leading `-` marks a removal.
    pub fn parse(list: &str) -> Self {
        let mut patch = Self::default();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.strip_prefix('-') {
                Some(tag) if !tag.trim().is_empty() => patch.remove.push(tag.trim().to_string()),
                Some(_) => {}
                None => patch.add.push(part.to_string()),
            }
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Removals first, then additions not already present. Existing order
    /// is kept. A patch that would change the record's kind is rejected.
    pub fn apply(&self, record: &mut Record) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let mut tags: Vec<String> = record
            .tags
            .iter()
            .filter(|t| !self.remove.contains(t))
            .cloned()
            .collect();
        for tag in &self.add {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        if Kind::of_tags(&tags) != record.kind() {
            return Err(Error::Validation(format!(
                "tag change would turn '{}' from a {} into a {}",
                record.title,
                record.kind(),
                Kind::of_tags(&tags)
            )));
        }
        record.tags = tags;
        Ok(())
    }
}

/* ---------- file operations ---------- */

fn read_header(path: &Path) -> Result<(String, header::HeaderSpan, Record)> {
    let content = fs::read_to_string(path)?;
    let span = header::locate(&content)
        .ok_or_else(|| Error::NoHeaderFound(path.display().to_string()))?;
    let mut record = header::decode(span.yaml(&content))?;
    if record.id.is_empty() {
        // Headers written by hand may lack an id; the filename still has it.
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Ok(from_name) = denote::parse_filename(name) {
                record.id = from_name.id;
            }
        }
    }
    Ok((content, span, record))
}

fn canonical_path(path: &Path, record: &Record) -> PathBuf {
    path.with_file_name(record.filename())
}

/// Renames `from` to `to` unless they are equal. An existing `to` is a
/// [`Error::Conflict`].
pub fn relocate(from: &Path, to: &Path) -> Result<PathBuf> {
    if from == to {
        return Ok(to.to_path_buf());
    }
    if to.exists() {
        return Err(Error::Conflict(to.to_path_buf()));
    }
    fs::rename(from, to)?;
    info!(from = %from.display(), to = %to.display(), "renamed");
    Ok(to.to_path_buf())
}

/// Applies `patch` and `tags` to the header of `path`, then renames the
/// file if its canonical name changed. Returns the final path.
pub fn apply_update(path: &Path, patch: &dyn Patch, tags: &TagPatch) -> Result<PathBuf> {
    let (content, span, mut record) = read_header(path)?;
    patch.apply(&mut record)?;
    tags.apply(&mut record)?;

    let target = canonical_path(path, &record);
    if target != path && target.exists() {
        return Err(Error::Conflict(target));
    }

    let updated = format!(
        "{}{}{}",
        span.prefix(&content),
        header::encode(&record)?,
        span.body(&content)
    );
    if updated != content {
        fs::write(path, updated)?;
    }
    relocate(path, &target)
}

/// Inserts `[YYYY-MM-DD] message` right after the closing fence.
pub fn append_log_entry(path: &Path, date: Date, message: &str) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::Validation("log message cannot be empty".into()));
    }
    let content = fs::read_to_string(path)?;
    let span = header::locate(&content)
        .ok_or_else(|| Error::NoHeaderFound(path.display().to_string()))?;

    let body = span.body(&content);
    let rest = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    let gap = if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
        ""
    } else {
        "\n"
    };

    let updated = format!(
        "{}\n[{}] {message}\n{gap}{rest}",
        span.head(&content),
        dates::format_iso(date)
    );
    fs::write(path, updated)?;
    Ok(())
}

/// Renames a file to match its (possibly hand-edited) header. `None` when
/// the name is already canonical.
pub fn rename_to_canonical(path: &Path) -> Result<Option<PathBuf>> {
    let (_, _, record) = read_header(path)?;
    let target = canonical_path(path, &record);
    if target == path {
        return Ok(None);
    }
    relocate(path, &target).map(Some)
}
