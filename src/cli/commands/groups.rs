//! `nimbus-reports groups` command - Location group hierarchy queries

use clap::Subcommand;
use console::style;
use miette::Result;
use std::collections::BTreeSet;

use crate::cli::helpers::format_ids;
use crate::cli::table::{CellValue, TableOutput};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{HierarchyResolver, RecordSource};
use crate::entities::GroupNode;

use super::connect;

const UNNAMED: &str = "(unnamed)";

#[derive(Subcommand, Debug)]
pub enum GroupsCommands {
    /// List top-level groups (not nested under any other group)
    Roots,

    /// List all named groups
    List,

    /// Search groups by description or org code
    Search(SearchArgs),

    /// Show one group with its direct children and locations
    Show(GroupArgs),

    /// Resolve groups to the union of their effective locations
    Resolve(ResolveArgs),

    /// List every group nested below a group
    Descendants(GroupArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Case-insensitive text to look for
    pub query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,
}

#[derive(clap::Args, Debug)]
pub struct GroupArgs {
    /// Location group ID
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Location group IDs
    #[arg(required = true)]
    pub ids: Vec<i64>,
}

/// Run a groups subcommand
pub fn run(cmd: GroupsCommands, global: &GlobalOpts) -> Result<()> {
    let (data, source) = connect(global)?;
    load_hierarchy(&data.hierarchy, source.as_ref())?;

    match cmd {
        GroupsCommands::Roots => {
            print_groups(&data.hierarchy, data.hierarchy.root_location_groups(), global);
        }
        GroupsCommands::List => {
            print_groups(&data.hierarchy, data.hierarchy.all_location_groups(), global);
        }
        GroupsCommands::Search(args) => {
            let found = data.hierarchy.search_location_groups(&args.query, args.limit);
            print_groups(&data.hierarchy, found, global);
        }
        GroupsCommands::Show(args) => run_show(&data.hierarchy, args.id, global)?,
        GroupsCommands::Descendants(args) => {
            let hierarchy = &data.hierarchy;
            if hierarchy.group(args.id).is_none() {
                return Err(miette::miette!("Location group {} not found", args.id));
            }
            let groups = hierarchy
                .descendant_group_ids(args.id)
                .into_iter()
                .filter_map(|id| hierarchy.group(id))
                .collect();
            print_groups(hierarchy, groups, global);
        }
        GroupsCommands::Resolve(args) => {
            data.lookups
                .load_locations(source.as_ref())
                .map_err(|e| miette::miette!("{}", e))?;

            let locations = data.hierarchy.resolve_locations_for_groups(args.ids);
            let mut table = TableOutput::new("location", &["ID", "Description"]);
            for id in locations {
                table.push(vec![
                    CellValue::Id(id),
                    CellValue::text(data.lookups.location_name(id)),
                ]);
            }
            table.print(global.format, global.quiet);
        }
    }

    Ok(())
}

fn load_hierarchy(hierarchy: &HierarchyResolver, source: &dyn RecordSource) -> Result<()> {
    hierarchy
        .load_hierarchy(source)
        .map_err(|e| miette::miette!("Failed to load location groups: {}", e))?;
    Ok(())
}

fn print_groups(hierarchy: &HierarchyResolver, groups: Vec<GroupNode>, global: &GlobalOpts) {
    let mut table = TableOutput::new(
        "group",
        &["ID", "Description", "Org Code", "Children", "Locations"],
    );
    for group in groups {
        table.push(vec![
            CellValue::Id(group.id),
            description_cell(&group, global.format),
            CellValue::optional(group.org_code.as_deref()),
            CellValue::Number(group.child_group_ids.len()),
            CellValue::Number(hierarchy.location_count_for_group(group.id)),
        ]);
    }
    table.print(global.format, global.quiet);
}

fn run_show(hierarchy: &HierarchyResolver, id: i64, global: &GlobalOpts) -> Result<()> {
    let group = hierarchy
        .group(id)
        .ok_or_else(|| miette::miette!("Location group {} not found", id))?;
    let effective: BTreeSet<i64> = hierarchy.resolve_locations_for_group(id);

    if global.format == OutputFormat::Json {
        let value = serde_json::json!({
            "group": group,
            "effective_location_ids": effective,
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }

    println!("{} {}", style("Group").bold(), style(group.id).cyan());
    println!("  Description:  {}", display_description(&group));
    println!(
        "  Org code:     {}",
        group.org_code.as_deref().unwrap_or("-")
    );
    println!("  Direct:       {}", format_ids(&group.direct_location_ids));
    println!(
        "  Effective:    {} location(s)",
        style(effective.len()).cyan()
    );

    let children = hierarchy.child_groups(id);
    if !children.is_empty() {
        println!("  Children:");
        for child in &children {
            println!("    {} {}", style(child.id).cyan(), display_description(child));
        }
    }
    Ok(())
}

/// Placeholder descriptions ("" or "-") never reach the user
fn description_cell(group: &GroupNode, format: OutputFormat) -> CellValue {
    if group.is_displayable() {
        CellValue::text(&group.description)
    } else if matches!(format, OutputFormat::Auto | OutputFormat::Md) {
        CellValue::text(UNNAMED)
    } else {
        CellValue::Empty
    }
}

fn display_description(group: &GroupNode) -> String {
    if group.is_displayable() {
        group.description.clone()
    } else {
        style(UNNAMED).dim().to_string()
    }
}
