//! `nimbus-reports lookup` command - Reference lookup tables

use clap::Subcommand;
use miette::Result;
use std::collections::BTreeSet;

use crate::cli::table::{CellValue, TableOutput};
use crate::cli::GlobalOpts;
use crate::core::hierarchy::filter_by_locations;
use crate::core::{EntityKind, LookupCache, LookupRecord, RecordSource};

use super::connect;

#[derive(Subcommand, Debug)]
pub enum LookupCommands {
    /// List users
    Users,

    /// List locations
    Locations,

    /// List departments
    Departments,

    /// List agreement types
    AgreementTypes,

    /// Resolve one id to its display name
    Get(GetArgs),

    /// Load schedules by id and show where they are
    Schedules(SchedulesArgs),
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Kind of record (user, location, department, agreement-type, schedule)
    pub kind: EntityKind,

    /// Record ID
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct SchedulesArgs {
    /// Schedule IDs
    #[arg(required = true)]
    pub ids: Vec<i64>,

    /// Only keep schedules at locations under this location group
    #[arg(long)]
    pub group: Option<i64>,
}

/// Run a lookup subcommand
pub fn run(cmd: LookupCommands, global: &GlobalOpts) -> Result<()> {
    let (data, source) = connect(global)?;
    let lookups = &data.lookups;
    let source = source.as_ref();

    match cmd {
        LookupCommands::Users => {
            load(lookups.load_users(source))?;
            let mut table = TableOutput::new("user", &["ID", "Name", "Payroll"]);
            for user in lookups.all_users() {
                table.push(vec![
                    CellValue::Id(user.id),
                    CellValue::text(user.description()),
                    CellValue::optional(user.secondary_id()),
                ]);
            }
            table.print(global.format, global.quiet);
        }
        LookupCommands::Locations => {
            load(lookups.load_locations(source))?;
            print_records("location", lookups.all_locations(), global);
        }
        LookupCommands::Departments => {
            load(lookups.load_departments(source))?;
            print_records("department", lookups.all_departments(), global);
        }
        LookupCommands::AgreementTypes => {
            load(lookups.load_agreement_types(source))?;
            print_records("agreement type", lookups.all_agreement_types(), global);
        }
        LookupCommands::Get(args) => {
            load_kind(lookups, source, args.kind, args.id)?;
            println!("{}", lookups.display_name(args.kind, args.id));
        }
        LookupCommands::Schedules(args) => {
            let ids: BTreeSet<i64> = args.ids.iter().copied().collect();
            load(lookups.load_schedules(source, ids.iter().copied()))?;
            load(lookups.load_locations(source))?;

            let mut schedules: Vec<_> = ids.iter().filter_map(|id| lookups.schedule(*id)).collect();

            if let Some(group_id) = args.group {
                data.hierarchy
                    .load_hierarchy(source)
                    .map_err(|e| miette::miette!("Failed to load location groups: {}", e))?;
                let allowed = data.hierarchy.resolve_locations_for_group(group_id);
                schedules = filter_by_locations(schedules, &allowed, |s| s.location());
            }

            let mut table = TableOutput::new(
                "schedule",
                &["ID", "Description", "Start", "Finish", "Location"],
            );
            for schedule in schedules {
                let location = lookups.location_via_schedule(schedule.id);
                table.push(vec![
                    CellValue::Id(schedule.id),
                    CellValue::text(lookups.schedule_name(schedule.id)),
                    timestamp_cell(schedule.start),
                    timestamp_cell(schedule.finish),
                    CellValue::optional(Some(&location)),
                ]);
            }
            table.print(global.format, global.quiet);
        }
    }

    Ok(())
}

fn load<T>(result: Result<T, crate::core::FetchError>) -> Result<T> {
    result.map_err(|e| miette::miette!("{}", e))
}

/// Load whichever table can answer a point lookup of `kind`
fn load_kind(
    lookups: &LookupCache,
    source: &dyn RecordSource,
    kind: EntityKind,
    id: i64,
) -> Result<()> {
    match kind {
        EntityKind::User => load(lookups.load_users(source)),
        EntityKind::Location => load(lookups.load_locations(source)),
        EntityKind::Department => load(lookups.load_departments(source)),
        EntityKind::AgreementType => load(lookups.load_agreement_types(source)),
        EntityKind::Schedule => load(lookups.load_schedules(source, [id])).map(|_| ()),
    }
}

fn print_records<T: LookupRecord>(noun: &'static str, records: Vec<T>, global: &GlobalOpts) {
    let mut table = TableOutput::new(noun, &["ID", "Description"]);
    for record in records {
        table.push(vec![
            CellValue::Id(record.id()),
            CellValue::text(record.description()),
        ]);
    }
    table.print(global.format, global.quiet);
}

fn timestamp_cell(ts: Option<chrono::NaiveDateTime>) -> CellValue {
    match ts {
        Some(ts) => CellValue::text(ts.format("%Y-%m-%d %H:%M").to_string()),
        None => CellValue::Empty,
    }
}
