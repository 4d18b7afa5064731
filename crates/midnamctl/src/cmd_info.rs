use std::path::PathBuf;

use anyhow::Result;
use midnam_core::{extract_device_info, summarize, DeviceInfo, DocumentSummary};
use serde::Serialize;
use tracing::debug;

use crate::common::{self, Globals};

#[derive(Serialize)]
struct InfoOutput {
    file_path: String,
    /// `None` when the document does not identify a device.
    device: Option<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    summary: DocumentSummary,
}

pub fn run(file: PathBuf, globals: &Globals) -> Result<()> {
    let doc = common::load(&file)?;
    let device = match extract_device_info(&doc.root) {
        Ok(info) => Some(info),
        Err(err) => {
            debug!(file = %file.display(), error = %err, "document does not identify a device");
            None
        }
    };
    let output = InfoOutput {
        file_path: file.display().to_string(),
        id: device.as_ref().map(DeviceInfo::key),
        device,
        summary: summarize(&doc.root),
    };

    if globals.json {
        return common::print_json(&output);
    }
    let summary = &output.summary;
    println!("{}", output.file_path);
    println!("  manufacturer: {}", summary.manufacturer);
    println!("  model:        {}", summary.model);
    println!("  author:       {}", summary.author);
    if let Some(id) = &output.id {
        println!("  id:           {id}");
    }
    println!(
        "  {} banks, {} patches, {} note lists",
        summary.total_banks, summary.total_patches, summary.total_note_lists
    );
    for bank in &summary.banks {
        println!("    {:<32} {:>4} patches", bank.name, bank.patch_count);
    }
    Ok(())
}
