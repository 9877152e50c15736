use std::path::{Path, PathBuf};

mod edit;
mod list;
mod projects;
mod terminal;
mod tree;

use anyhow::Context as _;
use clap::ArgAction;
use edit::{AttributeCommand, PartCommand, RequirementCommand};
use list::List;
use projects::{Commits, NewProject, Projects};
use sysmodel::{
    HttpApi, Project, TreeDiff,
    project::{Applied, CommitSelector, ElementRef, ProjectSelector},
};
use tracing::instrument;
use tree::Tree;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the connection settings file
    #[arg(short, long, default_value = "sysml.toml", global = true)]
    config: PathBuf,

    /// Base URL of the model server, overriding the settings file
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let context = Context::load(self.config, self.host)?;
        self.command.run(&context)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List the projects on the server
    Projects(Projects),

    /// Create a project with a root part
    NewProject(NewProject),

    /// List the commits of a project, newest first
    Commits(Commits),

    /// Show the element tree of a commit
    Tree(Tree),

    /// List the elements of a commit
    List(List),

    /// Create, update or delete parts
    #[command(subcommand)]
    Part(PartCommand),

    /// Add, update or remove attributes
    #[command(subcommand)]
    Attribute(AttributeCommand),

    /// Create, update or delete requirements
    #[command(subcommand)]
    Requirement(RequirementCommand),

    /// Show or modify connection settings
    Config(Config),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Projects(command) => command.run(context)?,
            Self::NewProject(command) => command.run(context)?,
            Self::Commits(command) => command.run(context)?,
            Self::Tree(command) => command.run(context)?,
            Self::List(command) => command.run(context)?,
            Self::Part(command) => command.run(context)?,
            Self::Attribute(command) => command.run(context)?,
            Self::Requirement(command) => command.run(context)?,
            Self::Config(command) => command.run(context)?,
        }
        Ok(())
    }
}

/// Connection settings after command-line overrides.
#[derive(Debug)]
pub struct Context {
    path: PathBuf,
    config: sysmodel::Config,
}

impl Context {
    fn load(path: PathBuf, host: Option<String>) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            sysmodel::Config::load(&path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            sysmodel::Config::default()
        };
        if let Some(host) = host {
            config.set_host(host);
        }
        Ok(Self { path, config })
    }

    fn api(&self) -> anyhow::Result<HttpApi> {
        Ok(HttpApi::from_config(&self.config)?)
    }

    fn open(&self, project: &str) -> anyhow::Result<Project<HttpApi>> {
        Project::open(self.api()?, &parse_project(project))
            .with_context(|| format!("failed to open project '{project}'"))
    }

    fn open_at(&self, project: &str, commit: Option<&str>) -> anyhow::Result<Project<HttpApi>> {
        let mut project = self.open(project)?;
        if let Some(commit) = commit {
            project.select_commit(&parse_commit(commit))?;
        }
        Ok(project)
    }
}

/// A numeric selector is a position in the name-ordered list, anything else
/// an identifier or a name.
fn parse_project(text: &str) -> ProjectSelector {
    text.parse()
        .map_or_else(|_| ProjectSelector::IdOrName(text.to_string()), ProjectSelector::Index)
}

/// A numeric selector is a position in the newest-first history, anything
/// else a commit identifier.
fn parse_commit(text: &str) -> CommitSelector {
    text.parse().map_or_else(
        |_| CommitSelector::Id(sysmodel::CommitId::new(text)),
        CommitSelector::Index,
    )
}

/// Selects the project a command works on.
#[derive(Debug, clap::Args)]
struct ProjectArg {
    /// Project index, name or identifier
    #[arg(short, long)]
    project: String,
}

/// Names an existing element.
#[derive(Debug, clap::Args)]
struct Target {
    /// Name of the element, or its identifier with --id
    target: String,

    /// Treat the target as an element identifier
    #[arg(long)]
    id: bool,
}

impl Target {
    fn element_ref(&self) -> ElementRef {
        if self.id {
            ElementRef::id(self.target.as_str())
        } else {
            ElementRef::name(self.target.as_str())
        }
    }
}

fn print_applied(applied: &Applied) {
    use terminal::Colorize;

    print_diff(&applied.diff);
    println!("{}", format!("Committed {}", applied.commit).dim());
}

fn print_diff(diff: &TreeDiff) {
    use terminal::Colorize;

    if diff.is_empty() {
        println!("{}", "No change to the tree".dim());
    }
    for key in &diff.added {
        println!("{}", format!("+ {key}").success());
    }
    for key in &diff.changed {
        println!("{}", format!("~ {key}").info());
    }
    for key in &diff.removed {
        println!("{}", format!("- {key}").warning());
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show the settings in effect
    Show,

    /// Set a value in the settings file
    Set {
        /// Setting to change (host, timeout_secs)
        key: String,

        /// New value
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        use terminal::Colorize;

        match self.command {
            ConfigCommand::Show => {
                println!("Settings ({}):", context.path.display().to_string().dim());
                println!("  host: {}", context.config.host());
                println!("  timeout_secs: {}", context.config.timeout().as_secs());
            }
            ConfigCommand::Set { key, value } => {
                let mut config = load_or_default(&context.path)?;
                match key.as_str() {
                    "host" => config.set_host(value.as_str()),
                    "timeout_secs" => {
                        let secs = value
                            .parse::<u64>()
                            .map_err(|_| anyhow::anyhow!("timeout_secs must be a whole number of seconds"))?;
                        config.set_timeout_secs(secs);
                    }
                    _ => anyhow::bail!("Unknown setting '{key}'. Known settings: host, timeout_secs"),
                }
                config.save(&context.path).map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("{}", format!("Set {key} = {value}").success());
            }
        }
        Ok(())
    }
}

fn load_or_default(path: &Path) -> anyhow::Result<sysmodel::Config> {
    if path.exists() {
        sysmodel::Config::load(path).map_err(|e| anyhow::anyhow!("{e}"))
    } else {
        Ok(sysmodel::Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_selectors_are_positions() {
        assert_eq!(parse_project("2"), ProjectSelector::Index(2));
        assert_eq!(
            parse_project("vehicle"),
            ProjectSelector::IdOrName("vehicle".to_string())
        );
        assert_eq!(parse_commit("0"), CommitSelector::Index(0));
        assert_eq!(
            parse_commit("a1b2"),
            CommitSelector::Id(sysmodel::CommitId::new("a1b2"))
        );
    }

    #[test]
    fn host_flag_overrides_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysml.toml");
        let mut config = sysmodel::Config::default();
        config.set_host("http://from-file:9000");
        config.save(&path).unwrap();

        let context = Context::load(path.clone(), None).unwrap();
        assert_eq!(context.config.host(), "http://from-file:9000");

        let context = Context::load(path, Some("http://override:9000/".to_string())).unwrap();
        assert_eq!(context.config.host(), "http://override:9000");
    }

    #[test]
    fn missing_settings_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let context = Context::load(dir.path().join("absent.toml"), None).unwrap();

        assert_eq!(context.config, sysmodel::Config::default());
    }
}
