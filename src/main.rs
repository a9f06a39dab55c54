use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, bail, eyre};
use momentum::backend::FileBackend;
use momentum::export::{export_date, write_csv};
use momentum::stats::{achievements, group_by_month};
use momentum::{Config, Filter, FocusSession, Period, Scope, Task, TaskStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "momentum")]
#[command(about = "Momentum - tomorrow/later task lists with a focus mode")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Store directory (default: platform data directory)
    #[arg(short, long, global = true)]
    store_path: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task to the top of a list
    Add {
        title: String,
        /// Free-text description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Time of day, e.g. 14:00
        #[arg(long)]
        due: Option<String>,
        /// Put the task on the Later list
        #[arg(long)]
        later: bool,
    },

    /// Show active tasks of a list (default: tomorrow)
    List { filter: Option<Filter> },

    /// Show completed tasks, newest first
    Completed,

    /// Show deleted tasks, newest first
    Deleted,

    /// Mark a task completed
    Complete { id: String },

    /// Soft-delete a task
    Delete { id: String },

    /// Restore a deleted task to its list
    Recover { id: String },

    /// Move a task to another list
    Move { id: String, filter: Filter },

    /// Set the order of a list, top first
    Reorder {
        filter: Filter,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show the task at the top of the tomorrow list
    Focus {
        /// Complete the focused task
        #[arg(long, conflicts_with = "dismiss")]
        done: bool,
        /// Delete the focused task
        #[arg(long)]
        dismiss: bool,
    },

    /// Export tasks as CSV (all, tomorrow, later, completed, deleted)
    Export {
        scope: Scope,
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Count completed tasks for a period (month, year, history)
    Stats { period: Option<Period> },

    /// Delete every task permanently
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store_dir = match cli.store_path {
        Some(path) => path,
        None => momentum::config::default_store_dir()?,
    };
    let config = Config::load(&store_dir)?;
    let backend = FileBackend::open(&store_dir)?;
    let mut store = TaskStore::open(backend, &config.storage_key)?;

    match cli.command {
        Commands::Add {
            title,
            description,
            due,
            later,
        } => {
            if title.trim().is_empty() {
                bail!("Task title cannot be empty");
            }
            let filter = if later { Filter::Later } else { config.default_filter };
            let task = store.add(title.trim(), description.trim(), due, filter);
            println!("{} {} ({})", "Added".green(), task.title.bold(), filter);
            println!("  {}", task.id.dimmed());
        }
        Commands::List { filter } => {
            let filter = filter.unwrap_or(config.default_filter);
            print_tasks(&format!("{} tasks", capitalize(filter.as_str())), &store.active_tasks_for(filter));
        }
        Commands::Completed => print_tasks("Completed tasks", &store.completed_tasks()),
        Commands::Deleted => print_tasks("Deleted tasks", &store.deleted_tasks()),
        Commands::Complete { id } => {
            let id = resolve_id(&store, &id)?;
            report(store.complete(&id), "Completed", &id);
        }
        Commands::Delete { id } => {
            let id = resolve_id(&store, &id)?;
            report(store.delete(&id), "Deleted", &id);
        }
        Commands::Recover { id } => {
            let id = resolve_id(&store, &id)?;
            report(store.recover(&id), "Recovered", &id);
        }
        Commands::Move { id, filter } => {
            let id = resolve_id(&store, &id)?;
            report(store.move_to_filter(&id, filter), &format!("Moved to {}", filter), &id);
        }
        Commands::Reorder { filter, ids } => {
            // Unknown ids pass through; the store skips them
            let ids = ids
                .iter()
                .map(|id| -> Result<String> {
                    Ok(store.find_by_prefix(id)?.map_or_else(|| id.clone(), |t| t.id.clone()))
                })
                .collect::<Result<Vec<_>>>()?;
            let updated = store.reorder(filter, ids.as_slice());
            println!("{} {} task(s) in {}", "Reordered".green(), updated, filter);
        }
        Commands::Focus { done, dismiss } => {
            let mut session = FocusSession::new();
            if !session.play(&store) {
                println!("{}", "Nothing scheduled for tomorrow".dimmed());
                return Ok(());
            }

            if done {
                if let Some(task) = session.complete_current(&mut store) {
                    println!("{} {}", "Done".green(), task.title.bold());
                }
            } else if dismiss {
                if let Some(task) = session.dismiss_current(&mut store) {
                    println!("{} {}", "Dismissed".yellow(), task.title.bold());
                }
            }

            match session.current(&store) {
                Some(task) => {
                    println!("{}", "Focus".cyan().bold());
                    print_task(task);
                }
                None => println!("{}", "All done for tomorrow".green()),
            }
        }
        Commands::Export { scope, out } => {
            let dir = out
                .or_else(|| config.export_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let today = export_date(&chrono::Utc::now());
            let tasks = store.tasks_in(scope);
            let count = tasks.len();
            let path = write_csv(&dir, scope, today, tasks)?;
            println!("{} {} task(s) to {}", "Exported".green(), count, path.display());
        }
        Commands::Stats { period } => {
            let period = period.unwrap_or_default();
            let now = chrono::Local::now();
            let found = achievements(store.tasks(), period, &now);
            println!("{}", format!("Completed ({}): {}", period, found.len()).bold());
            for (month, tasks) in group_by_month(&found, &now.timezone()) {
                print_tasks(&month, &tasks);
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes");
            }
            store.reset_all();
            println!("{}", "All tasks removed".red());
        }
    }

    store.flush()?;
    Ok(())
}

/// Accept a full id or a unique prefix of one
fn resolve_id<B: momentum::Backend>(store: &TaskStore<B>, wanted: &str) -> Result<String> {
    store
        .find_by_prefix(wanted)?
        .map(|t| t.id.clone())
        .ok_or_else(|| eyre!("No task with id {}", wanted))
}

fn report(changed: bool, action: &str, id: &str) {
    if changed {
        println!("{} {}", action.green(), id);
    } else {
        println!("{} {}", "Unchanged".yellow(), id);
    }
}

fn print_tasks(heading: &str, tasks: &[&Task]) {
    println!("{}", heading.bold());
    if tasks.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    for task in tasks {
        print_task(task);
    }
}

fn print_task(task: &Task) {
    let due = task
        .due_time
        .as_deref()
        .map(|d| format!(" @ {}", d).cyan().to_string())
        .unwrap_or_default();
    println!("  {}{}", task.title.bold(), due);
    if !task.description.is_empty() {
        println!("    {}", task.description);
    }
    println!("    {}", task.id.dimmed());
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
