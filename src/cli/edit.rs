//! Element edits: parts, attributes and requirements.

use dialoguer::Confirm;
use sysmodel::{
    Attribute, ElementKind, HttpApi, Project,
    project::{Delete, DuplicateNames, ElementRef},
};
use tracing::instrument;

use super::{Context, ProjectArg, Target, print_applied, terminal::Colorize};

/// An optional owning element.
#[derive(Debug, clap::Args)]
#[group(multiple = false)]
struct Owner {
    /// Name of the owning part
    #[arg(long)]
    owner: Option<String>,

    /// Identifier of the owning part
    #[arg(long)]
    owner_id: Option<String>,
}

impl Owner {
    fn element_ref(&self) -> Option<ElementRef> {
        match (&self.owner, &self.owner_id) {
            (_, Some(id)) => Some(ElementRef::id(id.as_str())),
            (Some(name), None) => Some(ElementRef::name(name.as_str())),
            (None, None) => None,
        }
    }
}

/// A mandatory owning element.
#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct RequiredOwner {
    /// Name of the owning part
    #[arg(long)]
    owner: Option<String>,

    /// Identifier of the owning part
    #[arg(long)]
    owner_id: Option<String>,
}

impl RequiredOwner {
    fn element_ref(&self) -> anyhow::Result<ElementRef> {
        Owner {
            owner: self.owner.clone(),
            owner_id: self.owner_id.clone(),
        }
        .element_ref()
        .ok_or_else(|| anyhow::anyhow!("an owner is required (--owner or --owner-id)"))
    }
}

const fn duplicates(allow: bool) -> DuplicateNames {
    if allow {
        DuplicateNames::Allow
    } else {
        DuplicateNames::Reject
    }
}

#[derive(Debug, clap::Parser)]
pub enum PartCommand {
    /// Create a part
    Create(CreatePart),

    /// Rename a part or move it to another owner
    Update(UpdatePart),

    /// Delete a part and everything it owns
    Delete(DeleteElement),
}

impl PartCommand {
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Create(command) => command.run(context),
            Self::Update(command) => command.run(context),
            Self::Delete(command) => command.run(context, ElementKind::Part),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct CreatePart {
    #[command(flatten)]
    project: ProjectArg,

    /// Name of the new part
    name: String,

    // Defaults to the root part.
    #[command(flatten)]
    owner: Owner,

    /// Accept a name that is already in use
    #[arg(long)]
    allow_duplicate: bool,
}

impl CreatePart {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut project = context.open(&self.project.project)?;
        let owner = self.owner.element_ref().or_else(|| {
            project
                .current_tree()
                .root()
                .map(|root| ElementRef::Id(root.element().clone()))
        });

        let applied = project.create_part(&self.name, owner, duplicates(self.allow_duplicate))?;
        print_applied(&applied);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct UpdatePart {
    #[command(flatten)]
    project: ProjectArg,

    #[command(flatten)]
    target: Target,

    /// New name
    #[arg(long)]
    name: Option<String>,

    #[command(flatten)]
    owner: Owner,
}

impl UpdatePart {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let owner = self.owner.element_ref();
        if self.name.is_none() && owner.is_none() {
            anyhow::bail!("Nothing to change: pass --name, --owner or --owner-id");
        }

        let mut project = context.open(&self.project.project)?;
        let applied = project.update_part(self.target.element_ref(), self.name, owner)?;
        print_applied(&applied);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub enum AttributeCommand {
    /// Add an attribute to a part
    Add(AddAttribute),

    /// Set the value of an attribute
    Update(UpdateAttribute),

    /// Remove an attribute
    Remove(DeleteElement),
}

impl AttributeCommand {
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(context),
            Self::Update(command) => command.run(context),
            Self::Remove(command) => command.run(context, ElementKind::Attribute),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct AddAttribute {
    #[command(flatten)]
    project: ProjectArg,

    /// Attribute name (must not contain ':')
    name: String,

    /// Attribute value
    value: String,

    #[command(flatten)]
    owner: RequiredOwner,

    /// Accept a name that is already in use
    #[arg(long)]
    allow_duplicate: bool,
}

impl AddAttribute {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let attribute = Attribute::new(self.name, self.value)?;
        let owner = self.owner.element_ref()?;

        let mut project = context.open(&self.project.project)?;
        let applied = project.add_attribute(attribute, owner, duplicates(self.allow_duplicate))?;
        print_applied(&applied);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct UpdateAttribute {
    #[command(flatten)]
    project: ProjectArg,

    // The attribute as listed, e.g. "mass: 5".
    #[command(flatten)]
    target: Target,

    /// New value
    value: String,
}

impl UpdateAttribute {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut project = context.open(&self.project.project)?;
        let applied = project.update_attribute(self.target.element_ref(), &self.value)?;
        print_applied(&applied);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub enum RequirementCommand {
    /// Attach a requirement to a part
    Create(CreateRequirement),

    /// Rename a requirement or rewrite its text
    Update(UpdateRequirement),

    /// Delete a requirement
    Delete(DeleteElement),
}

impl RequirementCommand {
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Create(command) => command.run(context),
            Self::Update(command) => command.run(context),
            Self::Delete(command) => command.run(context, ElementKind::Requirement),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct CreateRequirement {
    #[command(flatten)]
    project: ProjectArg,

    /// Name of the requirement
    name: String,

    /// Requirement text
    description: String,

    #[command(flatten)]
    owner: RequiredOwner,

    /// Accept a name that is already in use
    #[arg(long)]
    allow_duplicate: bool,
}

impl CreateRequirement {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let owner = self.owner.element_ref()?;

        let mut project = context.open(&self.project.project)?;
        let applied = project.create_requirement(
            &self.name,
            &self.description,
            owner,
            duplicates(self.allow_duplicate),
        )?;
        print_applied(&applied);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct UpdateRequirement {
    #[command(flatten)]
    project: ProjectArg,

    #[command(flatten)]
    target: Target,

    /// New name
    #[arg(long)]
    name: Option<String>,

    /// New requirement text
    #[arg(long, short)]
    description: Option<String>,
}

impl UpdateRequirement {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        if self.name.is_none() && self.description.is_none() {
            anyhow::bail!("Nothing to change: pass --name or --description");
        }

        let mut project = context.open(&self.project.project)?;
        let applied =
            project.update_requirement(self.target.element_ref(), self.name, self.description)?;
        print_applied(&applied);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct DeleteElement {
    #[command(flatten)]
    project: ProjectArg,

    #[command(flatten)]
    target: Target,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl DeleteElement {
    #[instrument]
    fn run(self, context: &Context, kind: ElementKind) -> anyhow::Result<()> {
        let mut project = context.open(&self.project.project)?;
        let target = self.target.element_ref();

        if !self.yes && !confirm(&project, &target)? {
            println!("Cancelled");
            return Ok(());
        }

        let applied = project.apply_delete(&Delete {
            target,
            kind: Some(kind),
        })?;
        print_applied(&applied);
        Ok(())
    }
}

/// Lists what a delete would remove and asks before going ahead.
fn confirm(project: &Project<HttpApi>, target: &ElementRef) -> anyhow::Result<bool> {
    let element = project.resolve(target)?;
    let key = project
        .snapshot()
        .key_of(&element.id)
        .unwrap_or(element.name.as_str());
    let owned = project.snapshot().owned_by(&element.id);

    println!("Will delete '{key}'");
    if !owned.is_empty() {
        println!("and the {} element(s) it owns:", owned.len());
        for owned in &owned {
            let name = project.snapshot().key_of(&owned.id).unwrap_or(owned.name.as_str());
            println!("  • {}", name.dim());
        }
    }

    Ok(Confirm::new()
        .with_prompt("Proceed?")
        .default(false)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    #[test]
    fn target_flag_switches_to_identifier() {
        let cli = Cli::try_parse_from(["sysml", "part", "delete", "abc", "--id", "-p", "0", "--yes"])
            .unwrap();
        let Command::Part(PartCommand::Delete(delete)) = cli.command else {
            panic!("expected part delete");
        };
        assert_eq!(delete.target.element_ref(), ElementRef::id("abc"));
        assert!(delete.yes);
    }

    #[test]
    fn attribute_needs_an_owner() {
        let result = Cli::try_parse_from(["sysml", "attribute", "add", "mass", "5", "-p", "0"]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["sysml", "attribute", "add", "mass", "5", "-p", "0", "--owner", "Wheel"])
                .unwrap();
        let Command::Attribute(AttributeCommand::Add(add)) = cli.command else {
            panic!("expected attribute add");
        };
        assert_eq!(add.owner.element_ref().unwrap(), ElementRef::name("Wheel"));
    }

    #[test]
    fn owner_name_and_id_are_exclusive() {
        let result = Cli::try_parse_from([
            "sysml", "part", "create", "Wheel", "-p", "0", "--owner", "Root Part", "--owner-id", "1",
        ]);
        assert!(result.is_err());
    }
}
