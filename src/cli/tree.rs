use clap::ValueEnum;
use tracing::instrument;

use super::{Context, ProjectArg, terminal::Colorize};

/// Output formats for the tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum TreeFormat {
    /// Indented outline
    #[default]
    Text,
    /// Graphviz source
    Dot,
}

#[derive(Debug, clap::Parser)]
pub struct Tree {
    #[command(flatten)]
    project: ProjectArg,

    /// Commit index or identifier (default: the most recent)
    #[arg(long)]
    commit: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: TreeFormat,
}

impl Tree {
    #[instrument]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open_at(&self.project.project, self.commit.as_deref())?;
        let tree = project.current_tree();

        match self.format {
            TreeFormat::Text => {
                println!(
                    "{} {}",
                    project.info().name,
                    format!("@ {}", project.current_commit()).dim()
                );
                if tree.is_empty() {
                    println!("{}", "(no elements)".dim());
                } else {
                    print!("{}", tree.render());
                }
            }
            TreeFormat::Dot => println!("{}", tree.to_dot()),
        }
        Ok(())
    }
}
