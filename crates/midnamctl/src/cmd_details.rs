use std::path::PathBuf;

use anyhow::{Context, Result};
use midnam_core::DeviceDetails;

use crate::common::{self, Globals};

/// Print the device record. With `as_update` the output is a complete
/// structure payload that `merge` accepts.
pub fn run(file: PathBuf, as_update: bool, globals: &Globals) -> Result<()> {
    let doc = common::load(&file)?;
    let details = DeviceDetails::extract(&doc.root)
        .with_context(|| format!("read device record of {}", file.display()))?;

    if as_update {
        return common::print_json(&details.to_update());
    }
    if globals.json {
        return common::print_json(&details);
    }

    println!("{} {} (by {})", details.manufacturer, details.model, details.author);
    if let Some(mode) = &details.standard_device_mode {
        println!("standard device mode: {mode}");
    }
    for mode in &details.custom_device_modes {
        println!("custom device mode '{}': {} channel assignments", mode.name, mode.assignments.len());
    }
    for set in &details.channel_name_sets {
        let channels: Vec<String> = set
            .available_channels
            .iter()
            .filter(|c| c.available)
            .map(|c| c.channel.to_string())
            .collect();
        println!("channel name set '{}' (channels {})", set.name, channels.join(","));
        for bank in details
            .patch_banks
            .iter()
            .filter(|bank| bank.channel_name_set.as_deref() == Some(set.name.as_str()))
        {
            println!("  bank '{}': {} patches", bank.name, bank.patches.len());
        }
    }
    for list in &details.note_lists {
        println!("note list '{}': {} notes", list.name, list.all_notes().count());
    }
    for list in &details.control_lists {
        println!("control list '{}': {} controls", list.name, list.controls.len());
    }
    Ok(())
}
