use std::path::PathBuf;

use anyhow::{bail, Result};
use midnam_core::validate_bytes;
use serde::Serialize;

use crate::common::{self, Globals};

#[derive(Serialize)]
struct ValidateOutput<'a> {
    file_path: String,
    #[serde(flatten)]
    report: &'a midnam_core::ValidationReport,
}

pub fn run(file: PathBuf, globals: &Globals) -> Result<()> {
    let bytes = common::read_bytes(&file)?;
    let report = validate_bytes(&bytes);

    if globals.json {
        common::print_json(&ValidateOutput {
            file_path: file.display().to_string(),
            report: &report,
        })?;
    } else {
        for issue in &report.errors {
            match (issue.line, issue.column) {
                (Some(line), Some(column)) => {
                    println!("{}:{line}:{column}: {}", file.display(), issue.message)
                }
                _ => println!("{}: {}", file.display(), issue.message),
            }
        }
        for fix in &report.layout_fixes {
            println!("{}: layout: {fix}", file.display());
        }
        if report.valid {
            println!("{}: ok", file.display());
        }
    }

    if !report.valid {
        bail!("{} failed validation", file.display());
    }
    Ok(())
}
