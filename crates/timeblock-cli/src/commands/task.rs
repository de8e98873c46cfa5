//! Task management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use timeblock_core::{EnergyLevel, Task, TaskStatus, ZoneType};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the store
    Add {
        /// Task ID
        id: String,
        /// Task title
        title: String,
        /// Duration in minutes
        #[arg(long)]
        minutes: i64,
        /// Required zone (deep, light or admin)
        #[arg(long)]
        zone: ZoneType,
        /// Required energy (high, medium or low, default: the zone's usual level)
        #[arg(long)]
        energy: Option<EnergyLevel>,
        /// Project ID (default: "default")
        #[arg(long, default_value = "default")]
        project: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Order within the project
        #[arg(long, default_value = "0")]
        sequence: u32,
        /// Task this one depends on (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
        /// Extra buffer around each block, in minutes
        #[arg(long, default_value = "0")]
        buffer: i64,
        /// Allow splitting into chunks of at least this many minutes
        #[arg(long)]
        min_chunk: Option<i64>,
        /// Maximum number of chunks when splitting
        #[arg(long, default_value = "3")]
        max_splits: u32,
    },
    /// List tasks with their last scheduling status
    List,
    /// Remove a task
    Remove {
        /// Task ID
        id: String,
    },
}

#[derive(Serialize)]
struct Listed {
    #[serde(flatten)]
    task: Task,
    status: Option<TaskStatus>,
}

/// Energy a zone of this type usually carries.
fn usual_energy(zone: ZoneType) -> EnergyLevel {
    match zone {
        ZoneType::Deep => EnergyLevel::High,
        ZoneType::Light => EnergyLevel::Medium,
        ZoneType::Admin => EnergyLevel::Low,
    }
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, store) = super::open_store()?;

    match action {
        TaskAction::Add {
            id,
            title,
            minutes,
            zone,
            energy,
            project,
            due,
            sequence,
            depends_on,
            buffer,
            min_chunk,
            max_splits,
        } => {
            let energy = energy.unwrap_or_else(|| usual_energy(zone));
            let mut task = Task::new(id, title, project, minutes, zone, energy)
                .with_sequence(sequence)
                .with_buffer(buffer);
            if let Some(due) = due {
                task = task.with_due_date(due);
            }
            for dep in depends_on {
                task = task.with_dependency(dep);
            }
            if let Some(min_chunk) = min_chunk {
                task = task.splittable(min_chunk, max_splits);
            }
            let id = task.id.clone();
            store.add_task(task)?;
            println!("Task added: {id}");
        }
        TaskAction::List => {
            let listed = store
                .tasks()?
                .into_iter()
                .map(|task| {
                    let status = store.status(&task.id)?;
                    Ok(Listed { task, status })
                })
                .collect::<Result<Vec<_>, timeblock_core::CollaboratorError>>()?;
            super::print_json(&listed)?;
        }
        TaskAction::Remove { id } => {
            if !store.remove_task(&id)? {
                return Err(format!("no task with id '{id}'").into());
            }
            println!("Task removed: {id}");
        }
    }
    Ok(())
}
