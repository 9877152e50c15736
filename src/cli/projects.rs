//! Project and commit listings, and project creation.

use sysmodel::{
    Project,
    project::{DuplicateNames, list_projects},
};
use tracing::instrument;

use super::{Context, ProjectArg, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Projects {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Projects {
    #[instrument]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let projects = list_projects(&context.api()?)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&projects)?);
            return Ok(());
        }
        if projects.is_empty() {
            println!("{}", "No projects on the server".dim());
            return Ok(());
        }

        let width = projects.iter().map(|p| p.name.len()).max().unwrap_or_default().max(4);
        println!("{:<5} {:<width$} ID", "#", "Name");
        for (index, project) in projects.iter().enumerate() {
            println!(
                "{index:<5} {:<width$} {}",
                project.name,
                project.id.to_string().dim()
            );
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct NewProject {
    /// Name of the project
    name: String,

    /// Description of the project
    #[arg(long, short, default_value = "")]
    description: String,

    /// Create the project even if another one has the same name
    #[arg(long)]
    allow_duplicate: bool,
}

impl NewProject {
    #[instrument]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let duplicates = if self.allow_duplicate {
            DuplicateNames::Allow
        } else {
            DuplicateNames::Reject
        };
        let project = Project::create(context.api()?, &self.name, &self.description, duplicates)?;

        println!(
            "{}",
            format!("Created project {} ({})", project.info().name, project.info().id).success()
        );
        print!("{}", project.current_tree().render());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Commits {
    #[command(flatten)]
    project: ProjectArg,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Commits {
    #[instrument]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open(&self.project.project)?;
        let commits = project.commits();

        if self.json {
            println!("{}", serde_json::to_string_pretty(commits)?);
            return Ok(());
        }

        println!("{:<5} {:<25} ID", "#", "Created");
        for (index, commit) in commits.iter().enumerate() {
            let created = commit.created.format("%Y-%m-%d %H:%M:%S UTC").to_string();
            let line = format!("{index:<5} {created:<25} {}", commit.id);
            if &commit.id == project.current_commit() {
                println!("{}", line.info());
            } else {
                println!("{line}");
            }
        }
        Ok(())
    }
}
