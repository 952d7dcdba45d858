//! Fenced YAML header at the top of every record file.
//!
//! Reading is two-phase: [`locate`] finds the fence lines as byte offsets,
//! then [`decode`] parses only the YAML between them. Everything outside
//! the span is handed back as untouched slices of the original text.

use std::ops::Range;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    dates, denote, Error, Estimate, Meta, Priority, ProjectMeta, ProjectStatus, Record, Result,
    TaskMeta, TaskStatus,
};

pub const FENCE: &str = "---";

/// Byte offsets of the header inside a file's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderSpan {
    /// Start of the opening fence line.
    pub open: usize,
    /// YAML between the fences.
    pub yaml: Range<usize>,
    /// First byte after the closing fence line.
    pub body: usize,
}

impl HeaderSpan {
    pub fn prefix<'a>(&self, content: &'a str) -> &'a str {
        &content[..self.open]
    }

    pub fn yaml<'a>(&self, content: &'a str) -> &'a str {
        &content[self.yaml.clone()]
    }

    /// The header including both fences.
    pub fn head<'a>(&self, content: &'a str) -> &'a str {
        &content[..self.body]
    }

    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        &content[self.body..]
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_end_matches('\n').trim_end_matches('\r') == FENCE
}

/// Finds the first two `---` lines scanning top-down.
pub fn locate(content: &str) -> Option<HeaderSpan> {
    let mut offset = 0;
    let mut opening: Option<(usize, usize)> = None;
    for line in content.split_inclusive('\n') {
        if is_fence(line) {
            match opening {
                None => opening = Some((offset, offset + line.len())),
                Some((open, yaml_start)) => {
                    return Some(HeaderSpan {
                        open,
                        yaml: yaml_start..offset,
                        body: offset + line.len(),
                    })
                }
            }
        }
        offset += line.len();
    }
    None
}

/* ---------- wire format ---------- */

fn nullable_list<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

/// Key order here is the on-disk key order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn field<T>(name: &str, v: Option<String>, parse: impl Fn(&str) -> Result<T>) -> Result<Option<T>> {
    non_empty(v)
        .map(|s| parse(&s).map_err(|e| Error::HeaderParse(format!("{name}: {e}"))))
        .transpose()
}

fn date_field(name: &str, v: Option<String>) -> Result<Option<time::Date>> {
    field(name, v, dates::parse_iso)
}

impl Frontmatter {
    pub fn into_record(self) -> Result<Record> {
        let mut record = Record::new(self.id, self.title, self.tags);
        match &mut record.meta {
            Meta::Note => {}
            Meta::Task(task) => {
                *task = TaskMeta {
                    task_id: self.task_id.filter(|n| *n > 0),
                    status: field("status", self.status, |s| s.parse::<TaskStatus>())?
                        .unwrap_or_default(),
                    priority: field("priority", self.priority, |s| s.parse::<Priority>())?,
                    due_date: date_field("due_date", self.due_date)?,
                    start_date: date_field("start_date", self.start_date)?,
                    estimate: self
                        .estimate
                        .filter(|n| *n > 0)
                        .map(Estimate::try_from)
                        .transpose()
                        .map_err(|e| Error::HeaderParse(format!("estimate: {e}")))?,
                    project: non_empty(self.project),
                    area: non_empty(self.area),
                    assignee: non_empty(self.assignee),
                };
            }
            Meta::Project(project) => {
                *project = ProjectMeta {
                    project_id: self.project_id.filter(|n| *n > 0),
                    status: field("status", self.status, |s| s.parse::<ProjectStatus>())?
                        .unwrap_or_default(),
                    priority: field("priority", self.priority, |s| s.parse::<Priority>())?,
                    due_date: date_field("due_date", self.due_date)?,
                    start_date: date_field("start_date", self.start_date)?,
                    area: non_empty(self.area),
                };
            }
        }
        Ok(record)
    }

    pub fn from_record(record: &Record) -> Self {
        let mut fm = Frontmatter {
            id: record.id.clone(),
            title: record.title.clone(),
            date: denote::date_from_id(&record.id),
            tags: record.tags.clone(),
            ..Default::default()
        };
        match &record.meta {
            Meta::Note => {}
            Meta::Task(t) => {
                fm.task_id = t.task_id;
                fm.status = Some(t.status.as_str().to_string());
                fm.priority = t.priority.map(|p| p.as_str().to_string());
                fm.due_date = t.due_date.map(dates::format_iso);
                fm.start_date = t.start_date.map(dates::format_iso);
                fm.estimate = t.estimate.map(|e| u32::from(e.get()));
                fm.project = t.project.clone();
                fm.area = t.area.clone();
                fm.assignee = t.assignee.clone();
            }
            Meta::Project(p) => {
                fm.project_id = p.project_id;
                fm.status = Some(p.status.as_str().to_string());
                fm.priority = p.priority.map(|p| p.as_str().to_string());
                fm.due_date = p.due_date.map(dates::format_iso);
                fm.start_date = p.start_date.map(dates::format_iso);
                fm.area = p.area.clone();
            }
        }
        fm
    }
}

/* ---------- codec ---------- */

/// Serializes a record to a complete fenced header block.
pub fn encode(record: &Record) -> Result<String> {
    let yml = serde_yaml::to_string(&Frontmatter::from_record(record))?;
    Ok(format!("{FENCE}\n{yml}{FENCE}\n"))
}

/// Decodes the YAML between the fences.
pub fn decode(yaml: &str) -> Result<Record> {
    let fm: Frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    fm.into_record()
}

/// `locate` + `decode`. `origin` only labels the error.
pub fn read_record(content: &str, origin: &str) -> Result<Record> {
    let span = locate(content).ok_or_else(|| Error::NoHeaderFound(origin.to_string()))?;
    decode(span.yaml(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn full_task() -> Record {
        let mut r = Record::new("20240601T090000", "Ship: v2 release", tags(&["task", "@ana", "ops"]));
        r.meta = Meta::Task(TaskMeta {
            task_id: Some(42),
            status: TaskStatus::Delegated,
            priority: Some(Priority::P2),
            due_date: Some(date!(2024 - 06 - 10)),
            start_date: Some(date!(2024 - 06 - 02)),
            estimate: Some(Estimate::try_from(8).unwrap()),
            project: Some("Launch".into()),
            area: Some("work".into()),
            assignee: Some("ana".into()),
        });
        r
    }

    #[test]
    fn round_trip_task() {
        let r = full_task();
        let text = encode(&r).unwrap();
        assert_eq!(read_record(&text, "t").unwrap(), r);
    }

    #[test]
    fn round_trip_project_and_note() {
        let mut p = Record::new("20240601T090000", "Offsite", tags(&["project"]));
        p.meta = Meta::Project(ProjectMeta {
            project_id: Some(3),
            status: ProjectStatus::Paused,
            priority: Some(Priority::P1),
            due_date: Some(date!(2024 - 09 - 01)),
            start_date: None,
            area: Some("team".into()),
        });
        assert_eq!(read_record(&encode(&p).unwrap(), "p").unwrap(), p);

        let n = Record::new("20240601T090000", "123", vec![]);
        assert_eq!(read_record(&encode(&n).unwrap(), "n").unwrap(), n);
    }

    #[test]
    fn encode_is_deterministic_and_omits_empty_fields() {
        let r = Record::new("20240601T090000", "Plain", tags(&["task"]));
        let a = encode(&r).unwrap();
        assert_eq!(a, encode(&r).unwrap());
        assert!(a.starts_with("---\nid: "));
        assert!(a.ends_with("---\n"));
        assert!(a.contains("status: open"));
        assert!(!a.contains("priority"));
        assert!(!a.contains("due_date"));
        assert!(a.find("id:").unwrap() < a.find("title:").unwrap());
        assert!(a.find("title:").unwrap() < a.find("tags:").unwrap());
    }

    #[test]
    fn decode_tolerates_missing_and_legacy_fields() {
        let legacy = "---\nid: \"20231024T120000\"\ntitle: \"Old\"\ndate: 2023-10-24\ntags:\n---\n\nbody\n";
        let r = read_record(legacy, "legacy").unwrap();
        assert_eq!(r.title, "Old");
        assert!(r.tags.is_empty());

        let task = "---\ntitle: Bare\ntags:\n  - task\n---\n";
        let r = read_record(task, "bare").unwrap();
        assert_eq!(r.task().unwrap().status, TaskStatus::Open);
        assert_eq!(r.task().unwrap().task_id, None);
    }

    #[test]
    fn invalid_values_are_header_errors() {
        let bad = "---\ntitle: x\ntags: [task]\npriority: p9\n---\n";
        assert!(matches!(read_record(bad, "b"), Err(Error::HeaderParse(_))));
        let bad_est = "---\ntitle: x\ntags: [task]\nestimate: 4\n---\n";
        assert!(matches!(read_record(bad_est, "b"), Err(Error::HeaderParse(_))));
        let broken = "---\ntitle: [unclosed\n---\n";
        assert!(matches!(read_record(broken, "b"), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn missing_fences_are_reported() {
        assert!(matches!(
            read_record("no header here\n", "f"),
            Err(Error::NoHeaderFound(_))
        ));
        assert!(matches!(
            read_record("---\ntitle: x\n", "f"),
            Err(Error::NoHeaderFound(_))
        ));
    }

    #[test]
    fn locate_reports_byte_offsets() {
        let content = "---\r\ntitle: x\r\n---\r\nbody";
        let span = locate(content).unwrap();
        assert_eq!(span.prefix(content), "");
        assert_eq!(span.yaml(content), "title: x\r\n");
        assert_eq!(span.body(content), "body");

        let content = "preamble\n---\ntitle: y\n---";
        let span = locate(content).unwrap();
        assert_eq!(span.prefix(content), "preamble\n");
        assert_eq!(span.body(content), "");
    }
}
