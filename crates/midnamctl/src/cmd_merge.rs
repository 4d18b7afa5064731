use std::path::PathBuf;

use anyhow::Result;
use midnam_core::StructureUpdate;
use midnam_store::{SaveOutcome, StructureRequest};
use tracing::info;

use crate::common::{self, Globals};

pub fn run(file: PathBuf, payload: PathBuf, globals: &Globals) -> Result<()> {
    let update: StructureUpdate = common::parse_json(&payload)?;
    info!(file = %file.display(), payload = %payload.display(), "merging structure");
    let request = StructureRequest::new(file.display().to_string(), update);
    let outcome = globals
        .store()
        .save_structure(&request)
        .map_err(|err| common::store_failure(err, globals.json))?;

    if globals.json {
        common::print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

pub(crate) fn print_outcome(outcome: &SaveOutcome) {
    println!("saved {}", outcome.file_path);
    println!("backup: {}", common::display_backup(outcome.backup.as_deref()));
    if let Some(merge) = &outcome.merge {
        if !merge.channel_name_sets_created.is_empty() {
            println!("created: {}", merge.channel_name_sets_created.join(", "));
        }
        if !merge.channel_name_sets_removed.is_empty() {
            println!("removed: {}", merge.channel_name_sets_removed.join(", "));
        }
        println!(
            "banks: {} written, note lists: {}, control lists: {}",
            merge.patch_banks_written, merge.note_lists_written, merge.control_lists_written
        );
    }
    for fix in &outcome.fixes {
        println!("fix: {fix}");
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
}
