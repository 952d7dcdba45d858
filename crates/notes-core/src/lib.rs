//! File-backed store for notes, tasks and projects.
//!
//! Each record is one markdown file named `<id>--<slug>__<tags>.md` with a
//! fenced YAML header. [`Vault`] wires the modules below into the flows the
//! command line exposes.

use directories::{ProjectDirs, UserDirs};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

pub mod batch;
pub mod dates;
pub mod denote;
pub mod error;
pub mod header;
pub mod ids;
pub mod mutate;
pub mod query;
pub mod range;
pub mod record;
pub mod resolve;
pub mod scan;

pub use batch::BatchReport;
pub use error::{Error, Result};
pub use ids::IdAllocator;
pub use mutate::{NotePatch, Patch, ProjectPatch, TagPatch, TaskPatch};
pub use query::{DueWindow, NoteFilter, ProjectFilter, SortKey, TaskFilter};
pub use record::{
    Estimate, Kind, Meta, Priority, ProjectMeta, ProjectStatus, Record, TaskMeta, TaskStatus,
    PROJECT_TAG, TASK_TAG,
};
pub use resolve::Resolver;
pub use scan::Entry;

/* ---------- Config ---------- */

pub const DEFAULT_SOON_HORIZON: u32 = 7;

#[derive(Clone, Debug)]
pub struct Config {
    pub notes_dir: PathBuf,
    /// Tasks and the hidden control files live here.
    pub task_dir: PathBuf,
    /// Days ahead that count as "due soon".
    pub soon_horizon: u32,
    pub editor: String,
}

/// `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    notes_dir: Option<String>,
    task_dir: Option<String>,
    soon_horizon: Option<u32>,
    editor: Option<String>,
}

fn home_dir() -> Option<PathBuf> {
    UserDirs::new().map(|u| u.home_dir().to_path_buf())
}

/// Expands a leading `~/`.
pub fn expand_home(p: &str) -> PathBuf {
    match (p.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if p == "~" => home_dir().unwrap_or_else(|| PathBuf::from(p)),
        _ => PathBuf::from(p),
    }
}

fn read_config_file(path: &Path) -> ConfigFile {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ConfigFile::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file unreadable, using defaults");
            return ConfigFile::default();
        }
    };
    toml::from_str(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
        ConfigFile::default()
    })
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Defaults rooted at `notes_dir`, with tasks stored alongside notes.
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        let notes_dir = notes_dir.into();
        Self {
            task_dir: notes_dir.clone(),
            notes_dir,
            soon_horizon: DEFAULT_SOON_HORIZON,
            editor: non_blank(env::var("EDITOR").ok()).unwrap_or_else(|| "vi".into()),
        }
    }

    pub fn with_task_dir(mut self, task_dir: impl Into<PathBuf>) -> Self {
        self.task_dir = task_dir.into();
        self
    }

    pub fn config_file() -> Option<PathBuf> {
        ProjectDirs::from("dev", "example", "notes-cli").map(|p| p.config_dir().join("config.toml"))
    }

    pub fn load_default() -> Result<Self> {
        Ok(Self::load_from(
            Self::config_file().as_deref(),
            env::var("NOTES_DIR").ok(),
            env::var("EDITOR").ok(),
        ))
    }

    /// Config file values first, then `NOTES_DIR`, then `~/notes`.
    pub fn load_from(file: Option<&Path>, notes_env: Option<String>, editor_env: Option<String>) -> Self {
        let f = file.map(read_config_file).unwrap_or_default();

        let notes_dir = non_blank(f.notes_dir)
            .or(non_blank(notes_env))
            .map(|s| expand_home(&s))
            .or_else(|| home_dir().map(|h| h.join("notes")))
            .unwrap_or_else(|| PathBuf::from("notes"));
        let task_dir = non_blank(f.task_dir)
            .map(|s| expand_home(&s))
            .unwrap_or_else(|| notes_dir.clone());

        Self {
            notes_dir,
            task_dir,
            soon_horizon: f.soon_horizon.unwrap_or(DEFAULT_SOON_HORIZON),
            editor: non_blank(f.editor)
                .or(non_blank(editor_env))
                .unwrap_or_else(|| "vi".into()),
        }
    }

    /// Where a single record of `kind` is looked up by name or ID.
    pub fn search_dirs(&self, kind: Kind) -> Vec<PathBuf> {
        match kind {
            Kind::Task => vec![self.task_dir.clone(), self.notes_dir.clone()],
            Kind::Note | Kind::Project => vec![self.notes_dir.clone(), self.task_dir.clone()],
        }
    }

    /// Directories scanned when listing `kind`.
    pub fn listing_dirs(&self, kind: Kind) -> Vec<PathBuf> {
        match kind {
            Kind::Note => vec![self.notes_dir.clone()],
            other => self.search_dirs(other),
        }
    }

    fn home_of(&self, kind: Kind) -> &Path {
        match kind {
            Kind::Task => &self.task_dir,
            Kind::Note | Kind::Project => &self.notes_dir,
        }
    }
}

/* ---------- creation inputs ---------- */

/// Fields accepted when creating a task. Status always starts `open`.
#[derive(Clone, Debug, Default)]
pub struct TaskDraft {
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub start_date: Option<Date>,
    pub estimate: Option<Estimate>,
    pub project: Option<String>,
    pub area: Option<String>,
    pub assignee: Option<String>,
}

/// Fields accepted when creating a project. Status always starts `active`.
#[derive(Clone, Debug, Default)]
pub struct ProjectDraft {
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub start_date: Option<Date>,
    pub area: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Created {
    pub path: PathBuf,
    pub record: Record,
}

/// Targets resolved ahead of a delete, plus the arguments that did not
/// resolve.
#[derive(Debug, Default)]
pub struct DeletePlan {
    pub targets: Vec<Entry>,
    pub skipped: BatchReport<()>,
}

#[derive(Clone, Debug)]
pub struct Vault {
    pub cfg: Config,
}

/* ---------- helpers (free functions) ---------- */

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Sentinel first, then the user's tags in order with blanks, duplicates
/// and other sentinels dropped.
fn build_tags(sentinel: Option<&str>, extra: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = sentinel.map(str::to_string).into_iter().collect();
    for t in extra {
        let t = t.trim().to_string();
        if t.is_empty() || t == TASK_TAG || t == PROJECT_TAG || tags.contains(&t) {
            continue;
        }
        tags.push(t);
    }
    tags
}

fn require_title(title: &str) -> Result<String> {
    let t = title.trim();
    if t.is_empty() {
        return Err(Error::Validation("title cannot be empty".into()));
    }
    Ok(t.to_string())
}

/* ---------- Vault impl ---------- */

impl Vault {
    pub fn new(cfg: Config) -> Result<Self> {
        Ok(Self { cfg })
    }

    pub fn init_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.cfg.notes_dir)?;
        fs::create_dir_all(&self.cfg.task_dir)?;
        Ok(())
    }

    pub fn allocator(&self) -> Result<IdAllocator> {
        IdAllocator::open(&self.cfg)
    }

    fn now(&self) -> OffsetDateTime {
        dates::now()
    }

    fn target_for(&self, record: &Record) -> Result<PathBuf> {
        let path = self.cfg.home_of(record.kind()).join(record.filename());
        if path.exists() {
            return Err(Error::Conflict(path));
        }
        Ok(path)
    }

    fn write_new(&self, path: PathBuf, record: Record) -> Result<Created> {
        self.init_dirs()?;
        fs::write(&path, format!("{}\n", header::encode(&record)?))?;
        info!(kind = %record.kind(), path = %path.display(), "created");
        Ok(Created { path, record })
    }

    /* ----- Creation ----- */

    pub fn create_note(&self, title: &str, tags: Vec<String>) -> Result<Created> {
        let title = require_title(title)?;
        if tags.iter().any(|t| t.trim() == TASK_TAG || t.trim() == PROJECT_TAG) {
            return Err(Error::Validation(
                "notes cannot carry the task or project tag".into(),
            ));
        }
        let record = Record::new(denote::new_creation_id(), title, build_tags(None, tags));
        let path = self.target_for(&record)?;
        self.write_new(path, record)
    }

    pub fn create_task(
        &self,
        title: &str,
        draft: TaskDraft,
        extra_tags: Vec<String>,
        ids: &IdAllocator,
    ) -> Result<Created> {
        let title = require_title(title)?;
        let mut record = Record::new(
            denote::new_creation_id(),
            title,
            build_tags(Some(TASK_TAG), extra_tags),
        );
        let path = self.target_for(&record)?;
        record.meta = Meta::Task(TaskMeta {
            task_id: Some(ids.next_task()?),
            status: TaskStatus::Open,
            priority: draft.priority,
            due_date: draft.due_date,
            start_date: draft.start_date,
            estimate: draft.estimate,
            project: trimmed(draft.project),
            area: trimmed(draft.area),
            assignee: trimmed(draft.assignee),
        });
        self.write_new(path, record)
    }

    pub fn create_project(
        &self,
        title: &str,
        draft: ProjectDraft,
        extra_tags: Vec<String>,
        ids: &IdAllocator,
    ) -> Result<Created> {
        let title = require_title(title)?;
        let mut record = Record::new(
            denote::new_creation_id(),
            title,
            build_tags(Some(PROJECT_TAG), extra_tags),
        );
        let path = self.target_for(&record)?;
        record.meta = Meta::Project(ProjectMeta {
            project_id: Some(ids.next_project()?),
            status: ProjectStatus::Active,
            priority: draft.priority,
            due_date: draft.due_date,
            start_date: draft.start_date,
            area: trimmed(draft.area),
        });
        self.write_new(path, record)
    }

    /* ----- Listing ----- */

    fn finish_listing(&self, mut entries: Vec<Entry>, sort: SortKey, reverse: bool) -> Vec<Entry> {
        query::sort_entries(&mut entries, sort, reverse);
        scan::assign_positions(&mut entries);
        let cache = scan::PositionCache::from_entries(&entries, self.now());
        if let Err(e) = cache.save(&self.cfg.task_dir) {
            warn!(error = %e, "could not save index cache");
        }
        entries
    }

    pub fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<Entry>> {
        let entries = scan::scan(&self.cfg.listing_dirs(Kind::Note), None)
            .into_iter()
            .filter(|e| filter.matches(&e.record))
            .collect();
        Ok(self.finish_listing(entries, SortKey::Modified, false))
    }

    pub fn list_tasks(
        &self,
        filter: &TaskFilter,
        sort: SortKey,
        reverse: bool,
        today: Date,
    ) -> Result<Vec<Entry>> {
        let entries = scan::scan(&self.cfg.listing_dirs(Kind::Task), Some(Kind::Task))
            .into_iter()
            .filter(|e| filter.matches(&e.record, today))
            .collect();
        Ok(self.finish_listing(entries, sort, reverse))
    }

    pub fn list_projects(
        &self,
        filter: &ProjectFilter,
        sort: SortKey,
        reverse: bool,
        today: Date,
    ) -> Result<Vec<Entry>> {
        let entries = scan::scan(&self.cfg.listing_dirs(Kind::Project), Some(Kind::Project))
            .into_iter()
            .filter(|e| filter.matches(&e.record, today))
            .collect();
        Ok(self.finish_listing(entries, sort, reverse))
    }

    /// The project named by `arg` and every task filed under its title.
    pub fn project_tasks(
        &self,
        arg: &str,
        sort: SortKey,
        reverse: bool,
        today: Date,
    ) -> Result<(Entry, Vec<Entry>)> {
        let project = scan::read_entry(&self.resolve(arg, Kind::Project)?)?;
        let filter = TaskFilter {
            all: true,
            project: Some(project.record.title.clone()),
            ..Default::default()
        };
        let tasks = self.list_tasks(&filter, sort, reverse, today)?;
        Ok((project, tasks))
    }

    /* ----- Lookup ----- */

    pub fn resolve(&self, arg: &str, kind: Kind) -> Result<PathBuf> {
        Resolver::for_kind(kind).resolve(&self.cfg, arg, self.now())
    }

    /// Resolves every target of a batch argument before anything is
    /// modified, so positions cannot drift mid-batch.
    fn resolve_all(&self, arg: &str, kind: Kind) -> Result<Vec<(String, Result<PathBuf>)>> {
        Ok(range::expand_targets(arg)?
            .into_iter()
            .map(|t| {
                let r = self.resolve(&t, kind);
                (t, r)
            })
            .collect())
    }

    /* ----- Updates ----- */

    fn update_each(
        &self,
        arg: &str,
        kind: Kind,
        patch: &dyn Patch,
        tags: &TagPatch,
    ) -> Result<BatchReport<PathBuf>> {
        let mut report = BatchReport::new();
        for (target, path) in self.resolve_all(arg, kind)? {
            report.record(target, path.and_then(|p| mutate::apply_update(&p, patch, tags)));
        }
        Ok(report)
    }

    pub fn update_task(&self, arg: &str, patch: &TaskPatch, tags: &TagPatch) -> Result<PathBuf> {
        mutate::apply_update(&self.resolve(arg, Kind::Task)?, patch, tags)
    }

    pub fn update_tasks(
        &self,
        arg: &str,
        patch: &TaskPatch,
        tags: &TagPatch,
    ) -> Result<BatchReport<PathBuf>> {
        self.update_each(arg, Kind::Task, patch, tags)
    }

    pub fn update_project(
        &self,
        arg: &str,
        patch: &ProjectPatch,
        tags: &TagPatch,
    ) -> Result<PathBuf> {
        mutate::apply_update(&self.resolve(arg, Kind::Project)?, patch, tags)
    }

    pub fn update_projects(
        &self,
        arg: &str,
        patch: &ProjectPatch,
        tags: &TagPatch,
    ) -> Result<BatchReport<PathBuf>> {
        self.update_each(arg, Kind::Project, patch, tags)
    }

    pub fn complete_tasks(&self, arg: &str) -> Result<BatchReport<PathBuf>> {
        self.update_tasks(arg, &TaskPatch::status(TaskStatus::Done), &TagPatch::default())
    }

    pub fn log_task(&self, arg: &str, message: &str, today: Date) -> Result<PathBuf> {
        let path = self.resolve(arg, Kind::Task)?;
        require_kind(&scan::read_entry(&path)?, Kind::Task)?;
        mutate::append_log_entry(&path, today, message)?;
        Ok(path)
    }

    /// Renames a note to match its header. `None` when nothing changed.
    pub fn rename_note(&self, arg: &str) -> Result<Option<PathBuf>> {
        mutate::rename_to_canonical(&self.resolve(arg, Kind::Note)?)
    }

    /* ----- Deletion ----- */

    pub fn plan_delete(&self, arg: &str, kind: Kind) -> Result<DeletePlan> {
        let mut plan = DeletePlan::default();
        for (target, path) in self.resolve_all(arg, kind)? {
            let entry = path
                .and_then(|p| scan::read_entry(&p))
                .and_then(|e| require_kind(&e, kind).map(|_| e));
            match entry {
                Ok(entry) if plan.targets.iter().any(|e| e.path == entry.path) => {}
                Ok(entry) => plan.targets.push(entry),
                Err(e) => plan.skipped.record(target, Err(e)),
            }
        }
        Ok(plan)
    }

    pub fn delete(&self, targets: &[Entry]) -> BatchReport<PathBuf> {
        let mut report = BatchReport::new();
        for entry in targets {
            let outcome = fs::remove_file(&entry.path)
                .map(|_| entry.path.clone())
                .map_err(Error::from);
            if outcome.is_ok() {
                info!(path = %entry.path.display(), "deleted");
            }
            report.record(entry.filename.clone(), outcome);
        }
        report
    }
}

/// Filename and path lookups accept any record, whatever its kind.
fn require_kind(entry: &Entry, kind: Kind) -> Result<()> {
    let found = entry.record.kind();
    if found == kind {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} is a {found}, not a {kind}",
            entry.filename
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_file_then_env_then_home() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config.toml");
        fs::write(
            &file,
            "notes_dir = \"/srv/notes\"\nsoon_horizon = 3\neditor = \"nano\"\n",
        )
        .unwrap();

        let cfg = Config::load_from(Some(file.as_path()), Some("/env/notes".into()), None);
        assert_eq!(cfg.notes_dir, PathBuf::from("/srv/notes"));
        assert_eq!(cfg.task_dir, cfg.notes_dir);
        assert_eq!(cfg.soon_horizon, 3);
        assert_eq!(cfg.editor, "nano");

        let cfg = Config::load_from(None, Some("/env/notes".into()), Some("ed".into()));
        assert_eq!(cfg.notes_dir, PathBuf::from("/env/notes"));
        assert_eq!(cfg.soon_horizon, DEFAULT_SOON_HORIZON);
        assert_eq!(cfg.editor, "ed");

        let cfg = Config::load_from(None, None, None);
        assert!(cfg.notes_dir.ends_with("notes"));
        assert_eq!(cfg.editor, "vi");
    }

    #[test]
    fn invalid_config_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("config.toml");
        fs::write(&file, "soon_horizon = \"lots\"").unwrap();
        let cfg = Config::load_from(Some(file.as_path()), Some("/x".into()), None);
        assert_eq!(cfg.soon_horizon, DEFAULT_SOON_HORIZON);
        assert_eq!(cfg.notes_dir, PathBuf::from("/x"));
    }

    #[test]
    fn home_expansion() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_home("~/notes"), home.join("notes"));
        }
        assert_eq!(expand_home("/abs/notes"), PathBuf::from("/abs/notes"));
    }

    #[test]
    fn search_order_depends_on_kind() {
        let cfg = Config::new("/n").with_task_dir("/t");
        assert_eq!(cfg.search_dirs(Kind::Task)[0], PathBuf::from("/t"));
        assert_eq!(cfg.search_dirs(Kind::Project)[0], PathBuf::from("/n"));
        assert_eq!(cfg.listing_dirs(Kind::Note), vec![PathBuf::from("/n")]);
    }

    #[test]
    fn tags_put_sentinel_first() {
        let tags = build_tags(
            Some(TASK_TAG),
            vec!["work".into(), " ".into(), "task".into(), "work".into(), "home".into()],
        );
        assert_eq!(tags, vec!["task", "work", "home"]);
    }
}
