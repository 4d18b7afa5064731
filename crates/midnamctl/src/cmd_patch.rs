use std::path::PathBuf;

use anyhow::Result;
use midnam_store::PatchRequest;

use crate::common::{self, Globals};

pub fn run(request: PathBuf, file: Option<PathBuf>, globals: &Globals) -> Result<()> {
    let mut request: PatchRequest = common::parse_json(&request)?;
    if let Some(file) = file {
        request.file_path = Some(file.display().to_string());
    }
    let outcome = globals
        .store()
        .update_patch(&request)
        .map_err(|err| common::store_failure(err, globals.json))?;

    if globals.json {
        common::print_json(&outcome)?;
        return Ok(());
    }
    println!(
        "updated patch '{}' in bank '{}' of {}",
        outcome.edit.patch_name, outcome.edit.bank, outcome.file_path
    );
    if let Some(list) = &outcome.edit.note_list {
        let verb = if outcome.edit.note_list_created {
            "created"
        } else {
            "rewrote"
        };
        println!("{verb} note list '{list}' ({} notes)", outcome.edit.notes_written);
    }
    println!("backup: {}", common::display_backup(outcome.backup.as_deref()));
    Ok(())
}
