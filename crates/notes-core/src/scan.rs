//! Directory listing and the short-lived positional index cache.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{denote, header, Kind, Record, Result};

pub const INDEX_FILE: &str = ".notes-cli-index.json";

/// How long a saved listing may be used to resolve positional arguments.
pub const CACHE_TTL: Duration = Duration::minutes(5);

/// A record found on disk.
#[derive(Clone, Debug)]
pub struct Entry {
    /// 1-based display position, 0 until assigned.
    pub index: usize,
    pub path: PathBuf,
    pub filename: String,
    pub record: Record,
    pub modified: OffsetDateTime,
}

/* ---------- helpers (free functions) ---------- */

fn is_record_file(p: &Path) -> bool {
    p.extension().and_then(|s| s.to_str()) == Some("md")
}

fn list_record_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return vec![];
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_record_file(p))
        .collect()
}

fn distinct(dirs: &[PathBuf]) -> Vec<&PathBuf> {
    let mut out: Vec<&PathBuf> = Vec::new();
    for d in dirs {
        if !out.contains(&d) {
            out.push(d);
        }
    }
    out
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn modified_at(path: &Path) -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::from(fs::metadata(path)?.modified()?))
}

/// Reads one record file; header problems surface as errors.
pub fn read_entry(path: &Path) -> Result<Entry> {
    let filename = file_name(path);
    let content = fs::read_to_string(path)?;
    let record = header::read_record(&content, &path.display().to_string())?;
    Ok(Entry {
        index: 0,
        path: path.to_path_buf(),
        filename,
        record,
        modified: modified_at(path)?,
    })
}

/// Lenient variant used by bulk scans: falls back to filename metadata and
/// returns `None` for anything unusable.
fn load_entry(path: &Path, kind: Option<Kind>) -> Option<Entry> {
    let filename = file_name(path);
    if let Some(sentinel) = kind.and_then(|k| k.sentinel()) {
        if !denote::filename_tags(&filename).contains(&sentinel) {
            return None;
        }
    }

    let record = match fs::read_to_string(path)
        .map_err(crate::Error::from)
        .and_then(|s| header::read_record(&s, &filename))
    {
        Ok(r) => r,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "header unreadable, using filename");
            denote::parse_filename(&filename).ok()?
        }
    };

    if kind.is_some_and(|k| record.kind() != k) || record.title.trim().is_empty() {
        return None;
    }

    Some(Entry {
        index: 0,
        path: path.to_path_buf(),
        filename,
        record,
        modified: modified_at(path).ok()?,
    })
}

/* ---------- scanning ---------- */

/// All records of `kind` (any kind for `None`) directly inside `dirs`.
/// Directories are visited in the given order, files by name.
pub fn scan(dirs: &[PathBuf], kind: Option<Kind>) -> Vec<Entry> {
    let mut out = Vec::new();
    for dir in distinct(dirs) {
        for path in list_record_files(dir) {
            if let Some(entry) = load_entry(&path, kind) {
                out.push(entry);
            }
        }
    }
    out
}

/// Most recently modified first.
pub fn by_modified(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.modified.cmp(&a.modified));
}

pub fn assign_positions(entries: &mut [Entry]) {
    for (i, e) in entries.iter_mut().enumerate() {
        e.index = i + 1;
    }
}

/// Highest `task_id`/`project_id` in use, 0 when there is none.
pub fn max_persistent_id(dirs: &[PathBuf], kind: Kind) -> u32 {
    scan(dirs, Some(kind))
        .iter()
        .filter_map(|e| e.record.persistent_id())
        .max()
        .unwrap_or(0)
}

/* ---------- positional cache ---------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPosition {
    pub index: usize,
    pub filename: String,
    pub path: PathBuf,
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
}

/// The last listing shown, persisted so that "the 3rd item" can be resolved
/// by the next invocation. Always safe to delete.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionCache {
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub entries: Vec<CachedPosition>,
}

impl PositionCache {
    pub fn from_entries(entries: &[Entry], created: OffsetDateTime) -> Self {
        Self {
            created,
            entries: entries
                .iter()
                .map(|e| CachedPosition {
                    index: e.index,
                    filename: e.filename.clone(),
                    path: e.path.clone(),
                    id: e.record.id.clone(),
                    title: e.record.title.clone(),
                    tags: e.record.tags.clone(),
                })
                .collect(),
        }
    }

    pub fn file_path(task_dir: &Path) -> PathBuf {
        task_dir.join(INDEX_FILE)
    }

    pub fn save(&self, task_dir: &Path) -> Result<()> {
        fs::create_dir_all(task_dir)?;
        fs::write(Self::file_path(task_dir), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now - self.created <= CACHE_TTL
    }

    /// The saved listing if it exists, parses, and is younger than
    /// [`CACHE_TTL`].
    pub fn load_fresh(task_dir: &Path, now: OffsetDateTime) -> Option<Self> {
        let path = Self::file_path(task_dir);
        let text = fs::read_to_string(&path).ok()?;
        let cache: Self = match serde_json::from_str(&text) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable index cache");
                return None;
            }
        };
        if !cache.is_fresh(now) {
            debug!(created = %cache.created, "index cache is stale");
            return None;
        }
        Some(cache)
    }

    /// Entry at `index`, restricted to entries carrying `sentinel` if given.
    pub fn find(&self, index: usize, sentinel: Option<&str>) -> Option<&CachedPosition> {
        self.entries.iter().find(|e| {
            e.index == index && sentinel.map_or(true, |s| e.tags.iter().any(|t| t == s))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn scan_filters_kind_and_falls_back_to_filename() {
        let tmp = TempDir::new().unwrap();
        let d = tmp.path();
        write(
            d,
            "20240601T090000--buy-milk__task.md",
            "---\nid: 20240601T090000\ntitle: Buy milk\ntags: [task]\ntask_id: 4\n---\n",
        );
        write(d, "20240601T090100--garbled__task.md", "no header at all\n");
        write(
            d,
            "20240601T090200--roadmap__project.md",
            "---\ntitle: Roadmap\ntags: [project]\n---\n",
        );
        write(d, "20240601T090300--empty__task.md", "---\ntitle: ''\ntags: [task]\n---\n");
        write(d, "README.txt", "ignored");

        let tasks = scan(&[d.to_path_buf()], Some(Kind::Task));
        let titles: Vec<_> = tasks.iter().map(|e| e.record.title.as_str()).collect();
        assert_eq!(titles, vec!["Buy milk", "Garbled"]);

        let all = scan(&[d.to_path_buf(), d.to_path_buf()], None);
        assert_eq!(all.len(), 3);
        assert_eq!(max_persistent_id(&[d.to_path_buf()], Kind::Task), 4);
        assert_eq!(max_persistent_id(&[d.to_path_buf()], Kind::Project), 0);
    }

    #[test]
    fn read_entry_is_strict() {
        let tmp = TempDir::new().unwrap();
        let p = write(tmp.path(), "x.md", "plain text");
        assert!(matches!(
            read_entry(&p),
            Err(crate::Error::NoHeaderFound(_))
        ));
    }

    #[test]
    fn cache_expires_after_ttl() {
        let tmp = TempDir::new().unwrap();
        let p = write(
            tmp.path(),
            "20240601T090000--a__task.md",
            "---\ntitle: A\ntags: [task]\n---\n",
        );
        let mut entries = vec![read_entry(&p).unwrap()];
        assign_positions(&mut entries);

        let created = OffsetDateTime::now_utc();
        PositionCache::from_entries(&entries, created)
            .save(tmp.path())
            .unwrap();

        let fresh = PositionCache::load_fresh(tmp.path(), created + Duration::minutes(4)).unwrap();
        assert_eq!(fresh.find(1, Some("task")).unwrap().path, p);
        assert!(fresh.find(1, Some("project")).is_none());
        assert!(fresh.find(2, None).is_none());
        assert!(PositionCache::load_fresh(tmp.path(), created + Duration::minutes(6)).is_none());
    }

    #[test]
    fn unreadable_cache_is_ignored() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), INDEX_FILE, "{not json");
        assert!(PositionCache::load_fresh(tmp.path(), OffsetDateTime::now_utc()).is_none());
    }
}
