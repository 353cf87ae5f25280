use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use eyre::{Context, Result};
use std::path::PathBuf;
use tasklist::{Backend, Config, ListView, PersistencePort, SortBy, Task, TaskDraft, TaskId, TaskState, TaskStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "tasklist CLI - create, edit, delete, filter and sort tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: <config_dir>/tasklist/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides the config file
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend, overrides the config file
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add {
        title: String,

        #[arg(long)]
        summary: Option<String>,

        /// done, not-done or doing-now
        #[arg(long)]
        state: Option<TaskState>,

        /// YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Replace a task (omitted fields reset to their defaults)
    Edit {
        id: String,

        title: String,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        state: Option<TaskState>,

        #[arg(long)]
        deadline: Option<String>,
    },

    /// Delete a task
    Rm { id: String },

    /// Show one task
    Show { id: String },

    /// List tasks
    Ls {
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,

        #[arg(long, value_enum, default_value = "none")]
        sort: SortArg,

        /// State listed first with `--sort state`
        #[arg(long, default_value = "done")]
        priority: TaskState,

        /// Print task ids
        #[arg(long)]
        ids: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    File,
    Sqlite,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::File => Backend::File,
            BackendArg::Sqlite => Backend::Sqlite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Done,
    NotDone,
    DoingNow,
}

impl FilterArg {
    fn state(self) -> Option<TaskState> {
        match self {
            FilterArg::All => None,
            FilterArg::Done => Some(TaskState::Done),
            FilterArg::NotDone => Some(TaskState::NotDone),
            FilterArg::DoingNow => Some(TaskState::DoingNow),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    None,
    State,
    Deadline,
}

fn main() -> Result<()> {
    // Setup tracing; logs go to stderr so they never mix with listings
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    let mut store = TaskStore::new(config.open_port()?);
    if let Err(e) = store.load() {
        eprintln!("{} {} (starting with an empty list)", "warning:".yellow().bold(), e);
    }

    match cli.command {
        Commands::Add {
            title,
            summary,
            state,
            deadline,
        } => {
            let id = store.create(draft(title, summary, state, deadline))?;
            println!("{} {}", "Created".green(), id);
        }
        Commands::Edit {
            id,
            title,
            summary,
            state,
            deadline,
        } => {
            let id = TaskId::from(id);
            store.update(&id, draft(title, summary, state, deadline))?;
            println!("{} {}", "Updated".green(), id);
        }
        Commands::Rm { id } => {
            let id = TaskId::from(id);
            store.delete(&id)?;
            println!("{} {}", "Deleted".green(), id);
        }
        Commands::Show { id } => {
            let id = TaskId::from(id);
            let task = store.get(&id).ok_or(tasklist::StoreError::NotFound(id))?;
            print_task(task, true);
        }
        Commands::Ls {
            filter,
            sort,
            priority,
            ids,
        } => list(&store, filter, sort, priority, ids),
    }

    Ok(())
}

fn draft(title: String, summary: Option<String>, state: Option<TaskState>, deadline: Option<String>) -> TaskDraft {
    TaskDraft {
        title,
        summary,
        state,
        deadline,
    }
}

fn list<P: PersistencePort>(store: &TaskStore<P>, filter: FilterArg, sort: SortArg, priority: TaskState, ids: bool) {
    let view = ListView {
        filter_state: filter.state(),
        sort: match sort {
            SortArg::None => SortBy::None,
            SortArg::State => SortBy::StatePriority(priority),
            SortArg::Deadline => SortBy::Deadline,
        },
    };

    let tasks = store.list(&view);
    if tasks.is_empty() {
        println!("{}", "You have no tasks".dimmed());
        return;
    }

    for task in &tasks {
        print_task(task, ids);
        println!();
    }
}

fn print_task(task: &Task, show_id: bool) {
    println!("{}", task.title.bold());
    if show_id {
        println!("  {} {}", "id:".dimmed(), task.id);
    }

    if task.summary.is_empty() {
        println!("  {}", "No summary was provided for this task".dimmed());
    } else {
        println!("  {}", task.summary);
    }

    let label = match task.state {
        TaskState::Done => task.state.label().green(),
        TaskState::DoingNow => task.state.label().yellow(),
        TaskState::NotDone => task.state.label().normal(),
    };
    println!("  State: {}", label);

    match &task.deadline {
        Some(deadline) => println!("  Deadline: {}", deadline),
        None => println!("  Deadline: {}", "No deadline set".dimmed()),
    }
}
