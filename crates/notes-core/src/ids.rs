//! Sequential `task_id` / `project_id` allocation.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{scan, Config, Kind, Result};

pub const COUNTER_FILE: &str = ".notes-cli-id-counter.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Counter {
    next_task_id: u32,
    next_project_id: u32,
}

/// Hands out persistent IDs, saving the counter after every allocation.
///
/// The mutex only serializes callers inside this process; two concurrent
/// invocations of the binary can still race on the counter file.
#[derive(Debug)]
pub struct IdAllocator {
    path: PathBuf,
    state: Mutex<Counter>,
}

impl IdAllocator {
    /// Loads the counter from the task directory, or bootstraps it from the
    /// highest IDs already present in both storage locations.
    pub fn open(cfg: &Config) -> Result<Self> {
        let path = cfg.task_dir.join(COUNTER_FILE);
        let state = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let dirs = cfg.search_dirs(Kind::Task);
                let counter = Counter {
                    next_task_id: scan::max_persistent_id(&dirs, Kind::Task) + 1,
                    next_project_id: scan::max_persistent_id(&dirs, Kind::Project) + 1,
                };
                info!(
                    next_task_id = counter.next_task_id,
                    next_project_id = counter.next_project_id,
                    "bootstrapped id counter from existing files"
                );
                counter
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn next_task(&self) -> Result<u32> {
        self.allocate(|c| &mut c.next_task_id)
    }

    pub fn next_project(&self) -> Result<u32> {
        self.allocate(|c| &mut c.next_project_id)
    }

    fn allocate(&self, slot: impl FnOnce(&mut Counter) -> &mut u32) -> Result<u32> {
        let mut state = self.state.lock();
        let next = slot(&mut state);
        let id = *next;
        *next += 1;
        persist(&self.path, &state)?;
        debug!(id, path = %self.path.display(), "allocated id");
        Ok(id)
    }
}

fn persist(path: &Path, counter: &Counter) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(counter)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sequential_ids_survive_restart() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::new(tmp.path());

        let first = IdAllocator::open(&cfg).unwrap();
        let a: Vec<u32> = (0..3).map(|_| first.next_task().unwrap()).collect();
        drop(first);

        let second = IdAllocator::open(&cfg).unwrap();
        let b: Vec<u32> = (0..2).map(|_| second.next_task().unwrap()).collect();

        let all: Vec<u32> = a.into_iter().chain(b).collect();
        let k = all[0];
        assert_eq!(all, (k..k + 5).collect::<Vec<_>>());
        assert_eq!(second.next_project().unwrap(), 1);
    }

    #[test]
    fn bootstrap_skips_existing_ids_in_both_dirs() {
        let notes = TempDir::new().unwrap();
        let tasks = TempDir::new().unwrap();
        fs::write(
            notes.path().join("20240101T000000--old__task.md"),
            "---\ntitle: Old\ntags: [task]\ntask_id: 7\n---\n",
        )
        .unwrap();
        fs::write(
            tasks.path().join("20240101T000001--plan__project.md"),
            "---\ntitle: Plan\ntags: [project]\nproject_id: 2\n---\n",
        )
        .unwrap();

        let cfg = Config::new(notes.path()).with_task_dir(tasks.path());
        let ids = IdAllocator::open(&cfg).unwrap();
        assert_eq!(ids.next_task().unwrap(), 8);
        assert_eq!(ids.next_project().unwrap(), 3);
        assert!(tasks.path().join(COUNTER_FILE).exists());
    }

    #[test]
    fn corrupt_counter_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(COUNTER_FILE), "nope").unwrap();
        assert!(matches!(
            IdAllocator::open(&Config::new(tmp.path())),
            Err(crate::Error::Json(_))
        ));
    }

    #[test]
    fn allocators_are_independent() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let ia = IdAllocator::open(&Config::new(a.path())).unwrap();
        let ib = IdAllocator::open(&Config::new(b.path())).unwrap();
        assert_eq!(ia.next_task().unwrap(), 1);
        assert_eq!(ia.next_task().unwrap(), 2);
        assert_eq!(ib.next_task().unwrap(), 1);
    }
}
