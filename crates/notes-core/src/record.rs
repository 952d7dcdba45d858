//! Record types shared by notes, tasks and projects.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{denote, Error, Result};

/// Sentinel tag that turns a record into a task.
pub const TASK_TAG: &str = "task";
/// Sentinel tag that turns a record into a project.
pub const PROJECT_TAG: &str = "project";

/* ---------- Kind ---------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Note,
    Task,
    Project,
}

impl Kind {
    /// Kind implied by a tag list. `task` wins over `project`.
    pub fn of_tags(tags: &[String]) -> Self {
        if tags.iter().any(|t| t == TASK_TAG) {
            Kind::Task
        } else if tags.iter().any(|t| t == PROJECT_TAG) {
            Kind::Project
        } else {
            Kind::Note
        }
    }

    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            Kind::Note => None,
            Kind::Task => Some(TASK_TAG),
            Kind::Project => Some(PROJECT_TAG),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Note => "note",
            Kind::Task => "task",
            Kind::Project => "project",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ---------- Status ---------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Done,
    Paused,
    Delegated,
    Dropped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
            TaskStatus::Paused => "paused",
            TaskStatus::Delegated => "delegated",
            TaskStatus::Dropped => "dropped",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "open" => TaskStatus::Open,
            "done" => TaskStatus::Done,
            "paused" => TaskStatus::Paused,
            "delegated" => TaskStatus::Delegated,
            "dropped" => TaskStatus::Dropped,
            other => {
                return Err(Error::Validation(format!(
                    "unknown task status '{other}' (use: open|done|paused|delegated|dropped)"
                )))
            }
        })
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "active" => ProjectStatus::Active,
            "completed" => ProjectStatus::Completed,
            "paused" => ProjectStatus::Paused,
            "cancelled" => ProjectStatus::Cancelled,
            other => {
                return Err(Error::Validation(format!(
                    "unknown project status '{other}' (use: active|completed|paused|cancelled)"
                )))
            }
        })
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ---------- Priority / Estimate ---------- */

/// Ordering follows urgency: `P1 < P2 < P3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P1 => "p1",
            Priority::P2 => "p2",
            Priority::P3 => "p3",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "p1" => Ok(Priority::P1),
            "p2" => Ok(Priority::P2),
            "p3" => Ok(Priority::P3),
            _ => Err(Error::Validation(format!(
                "invalid priority: {s} (must be p1, p2, or p3)"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Story-point style estimate restricted to `1, 2, 3, 5, 8, 13`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Estimate(u8);

impl Estimate {
    pub const ALLOWED: [u8; 6] = [1, 2, 3, 5, 8, 13];

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for Estimate {
    type Error = Error;
    fn try_from(value: u32) -> Result<Self> {
        Self::ALLOWED
            .iter()
            .copied()
            .find(|v| u32::from(*v) == value)
            .map(Estimate)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "invalid estimate: {value} (must be fibonacci: 1,2,3,5,8,13)"
                ))
            })
    }
}

impl FromStr for Estimate {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let n: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("invalid estimate: {s}")))?;
        Estimate::try_from(n)
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/* ---------- Kind-specific metadata ---------- */

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskMeta {
    pub task_id: Option<u32>,
    pub status: TaskStatus,
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub start_date: Option<Date>,
    pub estimate: Option<Estimate>,
    pub project: Option<String>,
    pub area: Option<String>,
    pub assignee: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectMeta {
    pub project_id: Option<u32>,
    pub status: ProjectStatus,
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub start_date: Option<Date>,
    pub area: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Meta {
    Note,
    Task(TaskMeta),
    Project(ProjectMeta),
}

/* ---------- Record ---------- */

/// One stored item. The body never lives here; mutation paths slice it
/// straight out of the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub meta: Meta,
}

impl Record {
    /// Builds a record whose metadata variant follows the sentinel tags,
    /// with kind-specific fields at their defaults.
    pub fn new(id: impl Into<String>, title: impl Into<String>, tags: Vec<String>) -> Self {
        let meta = match Kind::of_tags(&tags) {
            Kind::Note => Meta::Note,
            Kind::Task => Meta::Task(TaskMeta::default()),
            Kind::Project => Meta::Project(ProjectMeta::default()),
        };
        Self {
            id: id.into(),
            title: title.into(),
            tags,
            meta,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.meta {
            Meta::Note => Kind::Note,
            Meta::Task(_) => Kind::Task,
            Meta::Project(_) => Kind::Project,
        }
    }

    pub fn task(&self) -> Option<&TaskMeta> {
        match &self.meta {
            Meta::Task(t) => Some(t),
            _ => None,
        }
    }

    pub fn project(&self) -> Option<&ProjectMeta> {
        match &self.meta {
            Meta::Project(p) => Some(p),
            _ => None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// `task_id` or `project_id`, whichever applies.
    pub fn persistent_id(&self) -> Option<u32> {
        match &self.meta {
            Meta::Note => None,
            Meta::Task(t) => t.task_id,
            Meta::Project(p) => p.project_id,
        }
    }

    pub fn priority(&self) -> Option<Priority> {
        match &self.meta {
            Meta::Note => None,
            Meta::Task(t) => t.priority,
            Meta::Project(p) => p.priority,
        }
    }

    pub fn due_date(&self) -> Option<Date> {
        match &self.meta {
            Meta::Note => None,
            Meta::Task(t) => t.due_date,
            Meta::Project(p) => p.due_date,
        }
    }

    pub fn start_date(&self) -> Option<Date> {
        match &self.meta {
            Meta::Note => None,
            Meta::Task(t) => t.start_date,
            Meta::Project(p) => p.start_date,
        }
    }

    pub fn estimate(&self) -> Option<Estimate> {
        self.task().and_then(|t| t.estimate)
    }

    pub fn area(&self) -> Option<&str> {
        match &self.meta {
            Meta::Note => None,
            Meta::Task(t) => t.area.as_deref(),
            Meta::Project(p) => p.area.as_deref(),
        }
    }

    /// Canonical on-disk name derived from `(id, title, tags)`.
    pub fn filename(&self) -> String {
        denote::compose_filename(&self.id, &self.title, &self.tags)
    }
}
