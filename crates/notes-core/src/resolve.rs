//! Turns a user argument into a record path.
//!
//! Numeric arguments are tried as a persistent ID first, then as a position
//! in the last listing, then as a position in a fresh listing. Anything else
//! is a filename, a path, or (for projects) a title.

use std::path::PathBuf;

use time::OffsetDateTime;
use tracing::debug;

use crate::{
    scan::{self, PositionCache},
    Config, Error, Kind, Result,
};

pub struct LookupContext<'a> {
    pub cfg: &'a Config,
    pub kind: Kind,
    pub now: OffsetDateTime,
}

impl LookupContext<'_> {
    fn kind_filter(&self) -> Option<Kind> {
        match self.kind {
            Kind::Note => None,
            k => Some(k),
        }
    }
}

/// One way of finding a record. `Ok(None)` means "not mine" or "miss";
/// the resolver moves on to the next strategy.
pub trait LookupStrategy {
    fn name(&self) -> &'static str;
    fn lookup(&self, ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>>;
}

fn as_number(arg: &str) -> Option<u32> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    arg.parse().ok()
}

/* ---------- numeric strategies ---------- */

pub struct ByPersistentId;

impl LookupStrategy for ByPersistentId {
    fn name(&self) -> &'static str {
        "persistent-id"
    }

    fn lookup(&self, ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>> {
        let (Some(n), Some(kind)) = (as_number(arg), ctx.kind_filter()) else {
            return Ok(None);
        };
        Ok(scan::scan(&ctx.cfg.search_dirs(kind), Some(kind))
            .into_iter()
            .find(|e| e.record.persistent_id() == Some(n))
            .map(|e| e.path))
    }
}

pub struct ByCachedIndex;

impl LookupStrategy for ByCachedIndex {
    fn name(&self) -> &'static str {
        "cached-index"
    }

    fn lookup(&self, ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>> {
        let Some(n) = as_number(arg) else {
            return Ok(None);
        };
        let Some(cache) = PositionCache::load_fresh(&ctx.cfg.task_dir, ctx.now) else {
            return Ok(None);
        };
        Ok(cache
            .find(n as usize, ctx.kind.sentinel())
            .map(|c| c.path.clone())
            .filter(|p| p.is_file()))
    }
}

pub struct ByFreshIndex;

impl LookupStrategy for ByFreshIndex {
    fn name(&self) -> &'static str {
        "fresh-index"
    }

    fn lookup(&self, ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>> {
        let Some(n) = as_number(arg).filter(|n| *n > 0) else {
            return Ok(None);
        };
        let mut entries = scan::scan(&ctx.cfg.listing_dirs(ctx.kind), ctx.kind_filter());
        scan::by_modified(&mut entries);
        Ok(entries.into_iter().nth(n as usize - 1).map(|e| e.path))
    }
}

/* ---------- name strategies ---------- */

pub struct ByFilename;

impl LookupStrategy for ByFilename {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn lookup(&self, ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>> {
        if as_number(arg).is_some() {
            return Ok(None);
        }
        Ok(ctx
            .cfg
            .search_dirs(ctx.kind)
            .iter()
            .map(|d| d.join(arg))
            .find(|p| p.is_file()))
    }
}

pub struct ByLiteralPath;

impl LookupStrategy for ByLiteralPath {
    fn name(&self) -> &'static str {
        "path"
    }

    fn lookup(&self, _ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>> {
        if as_number(arg).is_some() {
            return Ok(None);
        }
        let p = PathBuf::from(arg);
        Ok(p.is_file().then_some(p))
    }
}

/// Exact title match. Only registered for projects.
pub struct ByTitle;

impl LookupStrategy for ByTitle {
    fn name(&self) -> &'static str {
        "title"
    }

    fn lookup(&self, ctx: &LookupContext<'_>, arg: &str) -> Result<Option<PathBuf>> {
        if as_number(arg).is_some() {
            return Ok(None);
        }
        Ok(scan::scan(&ctx.cfg.listing_dirs(ctx.kind), ctx.kind_filter())
            .into_iter()
            .find(|e| e.record.title == arg)
            .map(|e| e.path))
    }
}

/* ---------- resolver ---------- */

pub struct Resolver {
    kind: Kind,
    strategies: Vec<Box<dyn LookupStrategy>>,
}

impl Resolver {
    pub fn for_kind(kind: Kind) -> Self {
        let mut strategies: Vec<Box<dyn LookupStrategy>> = vec![
            Box::new(ByPersistentId),
            Box::new(ByCachedIndex),
            Box::new(ByFreshIndex),
            Box::new(ByFilename),
            Box::new(ByLiteralPath),
        ];
        if kind == Kind::Project {
            strategies.push(Box::new(ByTitle));
        }
        Self { kind, strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, cfg: &Config, arg: &str, now: OffsetDateTime) -> Result<PathBuf> {
        let arg = arg.trim();
        let ctx = LookupContext {
            cfg,
            kind: self.kind,
            now,
        };
        for strategy in &self.strategies {
            if let Some(path) = strategy.lookup(&ctx, arg)? {
                debug!(arg, strategy = strategy.name(), path = %path.display(), "resolved");
                return Ok(path);
            }
        }
        Err(Error::NotFound(format!("{} '{arg}'", self.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, content).unwrap();
        p
    }

    fn setup() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::new(tmp.path());
        (tmp, cfg)
    }

    #[test]
    fn numeric_prefers_persistent_id() {
        let (tmp, cfg) = setup();
        let seven = write(
            tmp.path(),
            "20240601T090000--seven__task.md",
            "---\ntitle: Seven\ntags: [task]\ntask_id: 7\n---\n",
        );
        write(
            tmp.path(),
            "20240601T090100--one__task.md",
            "---\ntitle: One\ntags: [task]\ntask_id: 1\n---\n",
        );
        let r = Resolver::for_kind(Kind::Task);
        let now = OffsetDateTime::now_utc();
        assert_eq!(r.resolve(&cfg, "7", now).unwrap(), seven);
        // No task_id 2, so the second most recently modified file.
        assert!(r.resolve(&cfg, "2", now).is_ok());
        assert!(matches!(r.resolve(&cfg, "3", now), Err(Error::NotFound(_))));
    }

    #[test]
    fn cached_position_beats_fresh_listing() {
        let (tmp, cfg) = setup();
        let a = write(
            tmp.path(),
            "20240601T090000--a__task.md",
            "---\ntitle: A\ntags: [task]\n---\n",
        );
        let b = write(
            tmp.path(),
            "20240601T090100--b__task.md",
            "---\ntitle: B\ntags: [task]\n---\n",
        );
        let now = OffsetDateTime::now_utc();
        let mut entries = vec![
            scan::read_entry(&b).unwrap(),
            scan::read_entry(&a).unwrap(),
        ];
        scan::assign_positions(&mut entries);
        PositionCache::from_entries(&entries, now)
            .save(&cfg.task_dir)
            .unwrap();

        let r = Resolver::for_kind(Kind::Task);
        assert_eq!(r.resolve(&cfg, "1", now).unwrap(), b);
        assert_eq!(r.resolve(&cfg, "2", now).unwrap(), a);
        // Project lookups never accept task entries from the cache.
        assert!(Resolver::for_kind(Kind::Project)
            .resolve(&cfg, "1", now)
            .is_err());
    }

    #[test]
    fn names_titles_and_paths() {
        let (tmp, cfg) = setup();
        let p = write(
            tmp.path(),
            "20240601T090000--launch__project.md",
            "---\ntitle: Launch\ntags: [project]\n---\n",
        );
        let now = OffsetDateTime::now_utc();
        let projects = Resolver::for_kind(Kind::Project);
        assert_eq!(
            projects
                .resolve(&cfg, "20240601T090000--launch__project.md", now)
                .unwrap(),
            p
        );
        assert_eq!(projects.resolve(&cfg, "Launch", now).unwrap(), p);
        assert_eq!(
            projects.resolve(&cfg, p.to_str().unwrap(), now).unwrap(),
            p
        );
        assert!(Resolver::for_kind(Kind::Task)
            .resolve(&cfg, "Launch", now)
            .is_err());
        assert!(!Resolver::for_kind(Kind::Task)
            .strategy_names()
            .contains(&"title"));
    }
}
