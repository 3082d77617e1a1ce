//! Batch preview.
//!
//! Runs the same planner the orchestrator uses, so the printed digest
//! matches the digest logged at submission for the same snapshot.

use std::path::PathBuf;

use clap::Args;
use keyport_assets::inventory::MigrationAssetsData;
use keyport_assets::planner::AssetMigrationPlanner;
use keyport_types::EvmAddress;

use crate::commands::read_json;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct PlanArgs {
    /// Holdings snapshot JSON file.
    #[arg(long)]
    pub assets: PathBuf,
    /// Address the assets are moved from.
    #[arg(long)]
    pub source: EvmAddress,
    /// Address receiving the assets.
    #[arg(long)]
    pub destination: EvmAddress,
}

pub fn run(args: PlanArgs, opts: &GlobalOpts) -> Result<(), String> {
    let assets: MigrationAssetsData = read_json(&args.assets, "assets")?;
    let planner = AssetMigrationPlanner::from_config(&opts.config);
    let batch = planner
        .plan(&assets, args.source, args.destination)
        .map_err(|e| e.to_string())?;
    let digest = format!("0x{}", hex::encode(batch.digest()));

    if opts.json {
        let obj = serde_json::json!({
            "calls": batch.len(),
            "digest": digest,
            "batch": batch,
        });
        output::print_json_value(&obj, true);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = batch
        .iter()
        .enumerate()
        .map(|(i, call)| {
            let selector = if call.data.len() >= 4 {
                format!("0x{}", hex::encode(&call.data[..4]))
            } else {
                "(transfer)".to_string()
            };
            vec![
                i.to_string(),
                call.address.to_string(),
                call.value.to_string(),
                selector,
            ]
        })
        .collect();
    output::print_table(&["#", "to", "value", "selector"], &rows, false);
    output::print_kv("Calls", &batch.len().to_string());
    output::print_kv("Digest", &digest);
    Ok(())
}
