use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use notes_core::{
    dates, BatchReport, Config, DueWindow, Estimate, Kind, NoteFilter, Priority, ProjectDraft, ProjectFilter,
    ProjectPatch, ProjectStatus, SortKey, TagPatch, TaskDraft, TaskFilter, TaskPatch, TaskStatus,
    Vault,
};
use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};
use time::Date;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod editor;
mod render;

#[derive(Parser)]
#[command(version, about = "Notes, tasks and projects as plain markdown files")]
struct Cli {
    /// Overrides the configured notes directory
    #[arg(long, global = true)]
    notes_dir: Option<PathBuf>,

    /// Overrides the configured task directory
    #[arg(long, global = true)]
    task_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    #[command(subcommand)]
    Task(TaskCmd),
    #[command(subcommand)]
    Project(ProjectCmd),
    #[command(subcommand)]
    Note(NoteCmd),
}

#[derive(Subcommand)]
enum TaskCmd {
    New {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[command(flatten)]
        fields: TaskFields,
        #[arg(long)]
        no_edit: bool,
    },
    List {
        #[command(flatten)]
        filter: TaskListArgs,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Mark tasks done: `3`, `1,4-6`, a filename or a path
    Done { targets: String },
    Update {
        targets: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    Edit { target: String },
    /// Add a dated line under the header
    Log {
        target: String,
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    Delete {
        targets: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProjectCmd {
    New {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[command(flatten)]
        fields: ProjectFields,
        #[arg(long)]
        no_edit: bool,
    },
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        area: Option<String>,
        #[arg(long)]
        overdue: bool,
        /// Due within N days (configured horizon when N is omitted)
        #[arg(long, num_args = 0..=1)]
        soon: Option<Option<u32>>,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Every task filed under a project
    Tasks {
        target: String,
        #[command(flatten)]
        sort: SortArgs,
    },
    Update {
        targets: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[command(flatten)]
        fields: ProjectFields,
    },
}

#[derive(Subcommand)]
enum NoteCmd {
    New {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        #[arg(long)]
        no_edit: bool,
    },
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    Edit { target: String },
    /// Rename a note to match its header after manual edits
    Rename { target: String },
}

#[derive(Args)]
struct TaskFields {
    #[arg(short, long)]
    priority: Option<String>,
    /// today, tomorrow, monday, 3d, 2w, 1m or YYYY-MM-DD
    #[arg(long)]
    due: Option<String>,
    #[arg(long)]
    start: Option<String>,
    #[arg(short, long)]
    estimate: Option<String>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    assignee: Option<String>,
    /// Comma separated; `-tag` removes on update
    #[arg(long, allow_hyphen_values = true)]
    tags: Option<String>,
}

#[derive(Args)]
struct ProjectFields {
    #[arg(short, long)]
    priority: Option<String>,
    #[arg(long)]
    due: Option<String>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    area: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    tags: Option<String>,
}

#[derive(Args)]
struct TaskListArgs {
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    all: bool,
    #[arg(short, long)]
    priority: Option<String>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    tag: Option<String>,
    /// today, week, month or YYYY-MM-DD
    #[arg(long)]
    due: Option<String>,
    #[arg(long)]
    overdue: bool,
    #[arg(long, num_args = 0..=1)]
    soon: Option<Option<u32>>,
}

#[derive(Args)]
struct SortArgs {
    /// modified, priority, due, created, start, estimate, name or area
    #[arg(long, default_value = "modified")]
    sort: String,
    #[arg(short, long)]
    reverse: bool,
}

impl SortArgs {
    fn key(&self) -> Result<SortKey> {
        Ok(self.sort.parse::<SortKey>()?)
    }
}

/* ---------- argument conversion ---------- */

fn joined(words: &[String]) -> String {
    words.join(" ")
}

fn parse_opt<T>(v: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = notes_core::Error>,
{
    Ok(v.map(str::parse::<T>).transpose()?)
}

fn date_opt(v: Option<&str>, today: Date) -> Result<Option<Date>> {
    Ok(v.map(|s| dates::parse_date_expr(s, today)).transpose()?)
}

fn tag_list(v: Option<&str>) -> Vec<String> {
    v.map(|s| TagPatch::parse(s).add).unwrap_or_default()
}

fn soon_days(flag: Option<Option<u32>>, cfg: &Config) -> Option<u32> {
    flag.map(|n| n.unwrap_or(cfg.soon_horizon))
}

impl TaskFields {
    fn draft(&self, today: Date) -> Result<TaskDraft> {
        Ok(TaskDraft {
            priority: parse_opt::<Priority>(self.priority.as_deref())?,
            due_date: date_opt(self.due.as_deref(), today)?,
            start_date: date_opt(self.start.as_deref(), today)?,
            estimate: parse_opt::<Estimate>(self.estimate.as_deref())?,
            project: self.project.clone(),
            area: self.area.clone(),
            assignee: self.assignee.clone(),
        })
    }

    fn patch(&self, title: Option<String>, status: Option<&str>, today: Date) -> Result<TaskPatch> {
        let d = self.draft(today)?;
        Ok(TaskPatch {
            title,
            status: parse_opt::<TaskStatus>(status)?,
            priority: d.priority,
            due_date: d.due_date,
            start_date: d.start_date,
            estimate: d.estimate,
            project: d.project,
            area: d.area,
            assignee: d.assignee,
        })
    }
}

impl ProjectFields {
    fn draft(&self, today: Date) -> Result<ProjectDraft> {
        Ok(ProjectDraft {
            priority: parse_opt::<Priority>(self.priority.as_deref())?,
            due_date: date_opt(self.due.as_deref(), today)?,
            start_date: date_opt(self.start.as_deref(), today)?,
            area: self.area.clone(),
        })
    }
}

/* ---------- command helpers ---------- */

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NOTES_CLI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn finish_batch(verb: &str, report: BatchReport<PathBuf>) -> Result<()> {
    render::batch(verb, &report);
    report.into_result()?;
    Ok(())
}

/// Opens the editor, then brings the filename in line with whatever the
/// user changed in the header.
fn edit_and_sync(cfg: &Config, path: &Path) -> Result<()> {
    editor::open(&cfg.editor, path)?;
    if let Some(renamed) = notes_core::mutate::rename_to_canonical(path)
        .with_context(|| format!("after editing {}", path.display()))?
    {
        println!("Renamed to {}", render::display_name(&renamed));
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

/* ---------- dispatch ---------- */

fn run_task(vault: &Vault, cmd: TaskCmd, today: Date) -> Result<()> {
    let cfg = &vault.cfg;
    match cmd {
        TaskCmd::New { title, fields, no_edit } => {
            let ids = vault.allocator().context("opening id counter")?;
            let created = vault.create_task(
                &joined(&title),
                fields.draft(today)?,
                tag_list(fields.tags.as_deref()),
                &ids,
            )?;
            let id = created.record.persistent_id().unwrap_or_default();
            println!("Created task #{id}: {}", render::display_name(&created.path));
            if !no_edit {
                edit_and_sync(cfg, &created.path)?;
            }
        }
        TaskCmd::List { filter, sort } => {
            let f = TaskFilter {
                status: parse_opt::<TaskStatus>(filter.status.as_deref())?,
                all: filter.all,
                priority: parse_opt::<Priority>(filter.priority.as_deref())?,
                project: filter.project,
                area: filter.area,
                tag: filter.tag,
                due: parse_opt::<DueWindow>(filter.due.as_deref())?,
                overdue: filter.overdue,
                soon_days: soon_days(filter.soon, cfg),
            };
            let tasks = vault.list_tasks(&f, sort.key()?, sort.reverse, today)?;
            if tasks.is_empty() {
                println!("No tasks found");
            }
            for t in &tasks {
                println!("{}", render::task_line(t, today, cfg.soon_horizon));
            }
        }
        TaskCmd::Done { targets } => finish_batch("Done", vault.complete_tasks(&targets)?)?,
        TaskCmd::Update {
            targets,
            title,
            status,
            fields,
        } => {
            let patch = fields.patch(title, status.as_deref(), today)?;
            let tags = fields.tags.as_deref().map(TagPatch::parse).unwrap_or_default();
            if patch.is_empty() && tags.is_empty() {
                bail!("nothing to update");
            }
            finish_batch("Updated", vault.update_tasks(&targets, &patch, &tags)?)?;
        }
        TaskCmd::Edit { target } => {
            let path = vault.resolve(&target, Kind::Task)?;
            edit_and_sync(cfg, &path)?;
        }
        TaskCmd::Log { target, message } => {
            let path = vault.log_task(&target, &joined(&message), today)?;
            println!("Logged to {}", render::display_name(&path));
        }
        TaskCmd::Delete { targets, yes } => delete(vault, &targets, Kind::Task, yes)?,
    }
    Ok(())
}

fn run_project(vault: &Vault, cmd: ProjectCmd, today: Date) -> Result<()> {
    let cfg = &vault.cfg;
    match cmd {
        ProjectCmd::New { title, fields, no_edit } => {
            let ids = vault.allocator().context("opening id counter")?;
            let created = vault.create_project(
                &joined(&title),
                fields.draft(today)?,
                tag_list(fields.tags.as_deref()),
                &ids,
            )?;
            let id = created.record.persistent_id().unwrap_or_default();
            println!("Created project #{id}: {}", render::display_name(&created.path));
            if !no_edit {
                edit_and_sync(cfg, &created.path)?;
            }
        }
        ProjectCmd::List {
            status,
            all,
            area,
            overdue,
            soon,
            sort,
        } => {
            let f = ProjectFilter {
                status: parse_opt::<ProjectStatus>(status.as_deref())?,
                all,
                area,
                overdue,
                soon_days: soon_days(soon, cfg),
            };
            let projects = vault.list_projects(&f, sort.key()?, sort.reverse, today)?;
            if projects.is_empty() {
                println!("No projects found");
            }
            for p in &projects {
                println!("{}", render::project_line(p, today, cfg.soon_horizon));
            }
        }
        ProjectCmd::Tasks { target, sort } => {
            let (project, tasks) = vault.project_tasks(&target, sort.key()?, sort.reverse, today)?;
            println!("{}", project.record.title);
            if tasks.is_empty() {
                println!("No tasks found");
            }
            for t in &tasks {
                println!("{}", render::task_line(t, today, cfg.soon_horizon));
            }
        }
        ProjectCmd::Update {
            targets,
            title,
            status,
            fields,
        } => {
            let d = fields.draft(today)?;
            let patch = ProjectPatch {
                title,
                status: parse_opt::<ProjectStatus>(status.as_deref())?,
                priority: d.priority,
                due_date: d.due_date,
                start_date: d.start_date,
                area: d.area,
            };
            let tags = fields.tags.as_deref().map(TagPatch::parse).unwrap_or_default();
            if patch.is_empty() && tags.is_empty() {
                bail!("nothing to update");
            }
            finish_batch("Updated", vault.update_projects(&targets, &patch, &tags)?)?;
        }
    }
    Ok(())
}

fn run_note(vault: &Vault, cmd: NoteCmd) -> Result<()> {
    match cmd {
        NoteCmd::New {
            title,
            tags,
            no_edit,
        } => {
            let created = vault.create_note(&joined(&title), tags.unwrap_or_default())?;
            println!("Created note: {}", render::display_name(&created.path));
            if !no_edit {
                edit_and_sync(&vault.cfg, &created.path)?;
            }
        }
        NoteCmd::List { tag } => {
            let notes = vault.list_notes(&NoteFilter { tag })?;
            if notes.is_empty() {
                println!("No notes found");
            }
            for n in &notes {
                println!("{}", render::note_line(n));
            }
        }
        NoteCmd::Edit { target } => {
            let path = vault.resolve(&target, Kind::Note)?;
            edit_and_sync(&vault.cfg, &path)?;
        }
        NoteCmd::Rename { target } => match vault.rename_note(&target)? {
            Some(p) => println!("Renamed to {}", render::display_name(&p)),
            None => println!("Already up to date"),
        },
    }
    Ok(())
}

fn delete(vault: &Vault, targets: &str, kind: Kind, yes: bool) -> Result<()> {
    let plan = vault.plan_delete(targets, kind)?;
    for (target, err) in plan.skipped.failed() {
        eprintln!("error: {target}: {err}");
    }
    if plan.targets.is_empty() {
        bail!("nothing to delete");
    }
    for e in &plan.targets {
        println!("  {}", e.filename);
    }
    if !yes && !confirm(&format!("Delete {} file(s)?", plan.targets.len()))? {
        println!("Cancelled");
        return Ok(());
    }
    let report = vault.delete(&plan.targets);
    let skipped = plan.skipped.failure_count();
    render::batch("Deleted", &report);
    report.into_result()?;
    if skipped > 0 {
        bail!("{skipped} target(s) skipped");
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = Config::load_default()?;
    if let Some(d) = cli.notes_dir {
        // A task dir that was only defaulted follows the notes dir.
        if cfg.task_dir == cfg.notes_dir {
            cfg.task_dir = d.clone();
        }
        cfg.notes_dir = d;
    }
    if let Some(d) = cli.task_dir {
        cfg.task_dir = d;
    }
    debug!(notes_dir = %cfg.notes_dir.display(), task_dir = %cfg.task_dir.display(), "config");
    let vault = Vault::new(cfg)?;
    let today = dates::local_today();

    match cli.command {
        Cmd::Task(c) => run_task(&vault, c, today),
        Cmd::Project(c) => run_project(&vault, c, today),
        Cmd::Note(c) => run_note(&vault, c),
    }
}
