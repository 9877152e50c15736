use clap::{Parser, ValueEnum};
use serde::Serialize;
use sysmodel::{ElementKind, Snapshot};
use tracing::instrument;

use super::{
    Context, ProjectArg,
    terminal::{Colorize, is_narrow, terminal_width, truncate},
};

/// Element kinds that can be listed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindFilter {
    Part,
    Attribute,
    Requirement,
    Comment,
}

impl KindFilter {
    fn matches(self, kind: &ElementKind) -> bool {
        matches!(
            (self, kind),
            (Self::Part, ElementKind::Part)
                | (Self::Attribute, ElementKind::Attribute)
                | (Self::Requirement, ElementKind::Requirement)
                | (Self::Comment, ElementKind::Comment)
        )
    }
}

/// Command arguments for `sysml list`.
#[derive(Debug, Parser)]
pub struct List {
    #[command(flatten)]
    project: ProjectArg,

    /// Commit index or identifier (default: the most recent)
    #[arg(long)]
    commit: Option<String>,

    /// Only these kinds (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "KIND")]
    kind: Vec<KindFilter>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Row<'a> {
    id: &'a str,
    kind: String,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl List {
    #[instrument]
    pub fn run(self, context: &Context) -> anyhow::Result<()> {
        let project = context.open_at(&self.project.project, self.commit.as_deref())?;
        let rows = rows(project.snapshot(), &self.kind);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else if rows.is_empty() {
            println!("{}", "No matching elements".dim());
        } else if is_narrow() {
            render_stacked(&rows);
        } else {
            render_table(&rows);
        }
        Ok(())
    }
}

/// Elements in listing order (type descending, then name), with owner names
/// resolved.
fn rows<'a>(snapshot: &'a Snapshot, kinds: &[KindFilter]) -> Vec<Row<'a>> {
    snapshot
        .sorted()
        .into_iter()
        .filter(|e| kinds.is_empty() || kinds.iter().any(|k| k.matches(&e.kind)))
        .map(|e| Row {
            id: e.id.as_str(),
            kind: e.kind.to_string(),
            name: &e.name,
            owner: snapshot.owner_of(&e.id).map(|owner| owner.name.as_str()),
            description: e.description.as_deref(),
        })
        .collect()
}

fn render_stacked(rows: &[Row<'_>]) {
    for row in rows {
        println!("{} {}", row.name, format!("({})", row.kind).dim());
        if let Some(owner) = row.owner {
            println!("  owner: {owner}");
        }
        println!("  id: {}", row.id.dim());
    }
}

fn render_table(rows: &[Row<'_>]) {
    const KIND_WIDTH: usize = 11;
    const MIN_NAME_WIDTH: usize = 12;

    let longest = rows
        .iter()
        .flat_map(|row| [row.name.chars().count(), row.owner.map_or(0, |o| o.chars().count())])
        .max()
        .unwrap_or_default();
    // Leave room for the kind column, an identifier and the separators.
    let budget = terminal_width().map_or(usize::MAX, |w| usize::from(w).saturating_sub(KIND_WIDTH + 40) / 2);
    let width = longest.min(budget).max(MIN_NAME_WIDTH);

    println!("{:<KIND_WIDTH$} {:<width$} {:<width$} ID", "Kind", "Name", "Owner");
    for row in rows {
        println!(
            "{:<KIND_WIDTH$} {:<width$} {:<width$} {}",
            row.kind,
            truncate(row.name, width),
            truncate(row.owner.unwrap_or("-"), width),
            row.id.dim()
        );
    }
}

#[cfg(test)]
mod tests {
    use sysmodel::{Attribute, CommitId, ElementId, domain::Payload};

    use super::*;

    fn snapshot() -> Snapshot {
        let root = ElementId::new("1");
        Snapshot::new(
            CommitId::new("c"),
            vec![
                Payload::comment("Project Name: demo").into_element(ElementId::new("0")),
                Payload::part("Root Part", None).into_element(root.clone()),
                Payload::part("Wheel", Some(root.clone())).into_element(ElementId::new("2")),
                Payload::attribute(&Attribute::new("mass", "5").unwrap(), ElementId::new("2"))
                    .into_element(ElementId::new("3")),
                Payload::requirement("R1", "shall roll", root).into_element(ElementId::new("4")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_follow_listing_order_with_owner_names() {
        let snapshot = snapshot();

        let rows = rows(&snapshot, &[]);

        let names: Vec<_> = rows.iter().map(|r| r.name).collect();
        assert_eq!(names, ["R1", "Root Part", "Wheel", "Project Name: demo", "mass: 5"]);
        assert_eq!(rows[2].owner, Some("Root Part"));
        assert_eq!(rows[0].description, Some("shall roll"));
    }

    #[test]
    fn kind_filter_selects_matching_elements() {
        let snapshot = snapshot();

        let rows = rows(&snapshot, &[KindFilter::Attribute, KindFilter::Requirement]);

        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, ["4", "3"]);
    }

    #[test]
    fn json_rows_omit_missing_fields() {
        let snapshot = snapshot();
        let rows = rows(&snapshot, &[KindFilter::Part]);

        let json = serde_json::to_value(&rows[0]).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id": "1", "kind": "part", "name": "Root Part"})
        );
    }
}
