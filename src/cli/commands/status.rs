//! `nimbus-reports status` command - Reference data status dashboard

use console::style;
use miette::Result;

use crate::cli::table::{CellValue, TableOutput};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{LoadState, TableStats};

use super::connect;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Only load the lookup tables, not the location group hierarchy
    #[arg(long)]
    pub lookups_only: bool,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let (data, source) = connect(global)?;

    let loaded = if args.lookups_only {
        data.lookups.load_all(source.as_ref())
    } else {
        data.load(source.as_ref())
    };

    let mut stats = data.lookups.stats();
    stats.push(TableStats {
        kind: "location-group".to_string(),
        rows: data.hierarchy.group_count(),
        state: data.hierarchy.state(),
    });

    if global.format == OutputFormat::Json {
        let status = serde_json::json!({
            "tables": stats,
            "error": loaded.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
    } else {
        let mut table = TableOutput::new("table", &["Table", "Rows", "State"]);
        for stat in &stats {
            table.push(vec![
                CellValue::text(stat.kind.clone()),
                CellValue::Number(stat.rows),
                CellValue::text(stat.state.to_string()),
            ]);
        }
        table.print(global.format, true);

        if global.format == OutputFormat::Auto && !global.quiet && loaded.is_ok() {
            let ready = stats
                .iter()
                .filter(|s| matches!(s.state, LoadState::Loaded { .. }))
                .count();
            println!();
            println!(
                "{} {} of {} tables loaded",
                style("✓").green(),
                style(ready).cyan(),
                stats.len()
            );
        }
    }

    loaded.map_err(|e| miette::miette!("Reference data load failed: {}", e))
}
