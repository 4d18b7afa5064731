use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cmd_merge::print_outcome;
use crate::common::{self, Globals};

/// Normalise a document in place, or with `check` only report what would
/// change and fail when anything would.
pub fn run(file: PathBuf, check: bool, globals: &Globals) -> Result<()> {
    let outcome = globals
        .store()
        .normalize_file(&file, !check)
        .map_err(|err| common::store_failure(err, globals.json))?;

    if globals.json {
        common::print_json(&outcome)?;
    } else if outcome.fixes.is_empty() {
        println!("{} is already normalised", outcome.file_path);
    } else {
        print_outcome(&outcome);
    }

    if check && !outcome.fixes.is_empty() {
        bail!("{} layout fixes needed in {}", outcome.fixes.len(), file.display());
    }
    Ok(())
}
