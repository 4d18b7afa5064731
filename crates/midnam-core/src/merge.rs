//! Structural merge of a [`StructureUpdate`] into a parsed document.
//!
//! Sections are replaced wholesale rather than diffed. The merge targets the
//! first device record; run [`crate::normalize`] afterwards to restore the
//! canonical layout.

use std::collections::{HashMap, HashSet};

use midnam_xml::Element;
use serde::Serialize;
use tracing::{debug, warn};

use crate::names::*;
use crate::patch::nested_program_change;
use crate::payload::{
    AvailableChannelData, ChannelNameSetData, ControlListData, MidiCommand, NoteListData,
    PatchBankData, PatchData, StructureUpdate,
};
use crate::MidnamError;

/// What a merge changed, for logging and reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub channel_name_sets_created: Vec<String>,
    pub channel_name_sets_removed: Vec<String>,
    pub patch_banks_written: usize,
    /// Banks whose channel name set does not exist in the document.
    pub patch_banks_skipped: Vec<String>,
    pub note_lists_written: usize,
    pub control_lists_written: usize,
    /// Patches that gained a `ProgramChange` attribute from the nested form.
    pub program_changes_promoted: usize,
}

/// Locate the device record the merge applies to: the first
/// `MasterDeviceNames`, else the first `ExtendingDeviceNames`.
pub fn primary_device_record_mut(root: &mut Element) -> Option<&mut Element> {
    if root.find_first(MASTER_DEVICE_NAMES).is_some() {
        root.find_first_mut(MASTER_DEVICE_NAMES)
    } else {
        root.find_first_mut(EXTENDING_DEVICE_NAMES)
    }
}

/// Shared-borrow variant of [`primary_device_record_mut`].
pub fn primary_device_record(root: &Element) -> Option<&Element> {
    root.find_first(MASTER_DEVICE_NAMES)
        .or_else(|| root.find_first(EXTENDING_DEVICE_NAMES))
}

/// Merge `update` into the document rooted at `root`, in place.
pub fn merge_structure(
    root: &mut Element,
    update: &StructureUpdate,
) -> Result<MergeSummary, MidnamError> {
    let device = primary_device_record_mut(root).ok_or(MidnamError::NoDeviceRecord)?;
    let mut summary = MergeSummary::default();

    if let Some(sets) = &update.channel_name_sets {
        merge_channel_name_sets(device, sets, &mut summary);
    }
    if let Some(banks) = &update.patch_banks {
        replace_patch_banks(device, banks, &mut summary);
    }
    if let Some(lists) = &update.note_lists {
        summary.note_lists_written = replace_note_lists(device, lists);
    }
    if let Some(lists) = &update.control_lists {
        summary.control_lists_written = replace_control_lists(device, lists);
    }
    if let Some(active) = update
        .active_control_list
        .as_deref()
        .filter(|name| !name.is_empty())
    {
        set_active_control_list(device, active);
    }
    if let Some(enabled) = update.supports_standard_device_mode {
        set_standard_device_mode(
            device,
            enabled,
            update.standard_device_mode_name.as_deref(),
        );
    }
    summary.program_changes_promoted = promote_program_changes(device);

    debug!(?summary, "merged structure update");
    Ok(summary)
}

fn is_named(element: &Element, tag: &str, name: &str) -> bool {
    element.is(tag) && element.attr(ATTR_NAME) == Some(name)
}

fn merge_channel_name_sets(
    device: &mut Element,
    sets: &[ChannelNameSetData],
    summary: &mut MergeSummary,
) {
    let wanted: HashSet<&str> = sets.iter().map(|set| set.name.as_str()).collect();
    let removed = device.detach_where(|element| {
        element.is(CHANNEL_NAME_SET) && !wanted.contains(element.attr(ATTR_NAME).unwrap_or_default())
    });
    for set in removed {
        let name = set.attr(ATTR_NAME).unwrap_or_default().to_string();
        debug!(name = %name, "removed channel name set");
        summary.channel_name_sets_removed.push(name);
    }

    for data in sets {
        let index = match device.position_where(|e| is_named(e, CHANNEL_NAME_SET, &data.name)) {
            Some(index) => index,
            None => {
                let index = channel_name_set_insert_index(device);
                device.insert(
                    index,
                    Element::new(CHANNEL_NAME_SET).with_attr(ATTR_NAME, data.name.as_str()),
                );
                debug!(name = %data.name, "created channel name set");
                summary.channel_name_sets_created.push(data.name.clone());
                index
            }
        };
        if let Some(set) = device.child_at_mut(index) {
            rewrite_availability(set, &data.available_channels);
        }
    }
}

/// After the last channel name set, else before the first device-level
/// name list, else at the end.
fn channel_name_set_insert_index(device: &Element) -> usize {
    if let Some(last) = device.last_position(CHANNEL_NAME_SET) {
        return last + 1;
    }
    device
        .position_where(|e| e.is(NOTE_NAME_LIST) || e.is(CONTROL_NAME_LIST))
        .unwrap_or(device.len())
}

fn rewrite_availability(set: &mut Element, channels: &[AvailableChannelData]) {
    if set.child(AVAILABLE_FOR_CHANNELS).is_none() {
        set.insert(0, Element::new(AVAILABLE_FOR_CHANNELS));
    }
    if let Some(block) = set.child_mut(AVAILABLE_FOR_CHANNELS) {
        block.clear_children();
        for channel in channels {
            block.push(
                Element::new(AVAILABLE_CHANNEL)
                    .with_attr(ATTR_CHANNEL, channel.channel.to_string())
                    .with_attr(ATTR_AVAILABLE, if channel.available { "true" } else { "false" }),
            );
        }
    }
}

fn replace_patch_banks(device: &mut Element, banks: &[PatchBankData], summary: &mut MergeSummary) {
    let present: HashSet<String> = device
        .children_named(CHANNEL_NAME_SET)
        .filter_map(|set| set.attr(ATTR_NAME))
        .map(str::to_string)
        .collect();

    let mut by_set: HashMap<&str, Vec<&PatchBankData>> = HashMap::new();
    for bank in banks {
        match bank.channel_name_set.as_deref().filter(|name| !name.is_empty()) {
            Some(set) if present.contains(set) => by_set.entry(set).or_default().push(bank),
            Some(set) => {
                warn!(bank = %bank.name, channel_name_set = %set, "patch bank references unknown channel name set; skipping");
                summary.patch_banks_skipped.push(bank.name.clone());
            }
            None => {
                warn!(bank = %bank.name, "patch bank names no channel name set; skipping");
                summary.patch_banks_skipped.push(bank.name.clone());
            }
        }
    }

    for set in device.elements_mut().filter(|e| e.is(CHANNEL_NAME_SET)) {
        let name = set.attr(ATTR_NAME).unwrap_or_default().to_string();
        let anchor = set
            .position(PATCH_BANK)
            .unwrap_or_else(|| patch_bank_fallback_index(set));
        let dropped = set.detach_named(PATCH_BANK);
        let incoming = by_set.get(name.as_str()).map(Vec::as_slice).unwrap_or_default();
        for (offset, bank) in incoming.iter().enumerate() {
            set.insert(anchor + offset, build_patch_bank(bank));
        }
        summary.patch_banks_written += incoming.len();
        debug!(
            channel_name_set = %name,
            dropped = dropped.len(),
            written = incoming.len(),
            "replaced patch banks"
        );
    }
}

/// Banks go after the availability block and name-list references.
fn patch_bank_fallback_index(set: &Element) -> usize {
    set.last_position_where(|e| {
        e.is(AVAILABLE_FOR_CHANNELS)
            || e.is(USES_NOTE_NAME_LIST)
            || e.is(NOTE_NAME_LIST)
            || e.is(USES_CONTROL_NAME_LIST)
            || e.is(CONTROL_NAME_LIST)
    })
    .map(|index| index + 1)
    .unwrap_or(set.len())
}

fn build_patch_bank(bank: &PatchBankData) -> Element {
    let mut element = Element::new(PATCH_BANK).with_attr(ATTR_NAME, bank.name.as_str());

    let mut commands = Element::new(MIDI_COMMANDS);
    for command in &bank.midi_commands {
        match command {
            MidiCommand::ControlChange { control, value } => commands.push(
                Element::new(CONTROL_CHANGE)
                    .with_attr(ATTR_CONTROL, control.to_string())
                    .with_attr(ATTR_VALUE, value.to_string()),
            ),
            MidiCommand::Unsupported => {
                debug!(bank = %bank.name, "skipping unsupported bank MIDI command");
            }
        }
    }
    if !commands.is_empty() {
        element.push(commands);
    }

    let mut list = Element::new(PATCH_NAME_LIST);
    for patch in &bank.patches {
        list.push(build_patch(patch));
    }
    element.push(list);
    element
}

fn build_patch(patch: &PatchData) -> Element {
    let mut element = Element::new(PATCH)
        .with_attr(ATTR_NUMBER, patch.number.as_str())
        .with_attr(ATTR_NAME, patch.name.as_str());
    if let Some(program_change) = patch.program_change.as_deref() {
        element.set_attr(ATTR_PROGRAM_CHANGE, program_change);
    }
    if let Some(list) = patch.note_list_name.as_deref().filter(|name| !name.is_empty()) {
        element.push(Element::new(USES_NOTE_NAME_LIST).with_attr(ATTR_NAME, list));
    }
    element
}

fn replace_note_lists(device: &mut Element, lists: &[NoteListData]) -> usize {
    let removed = device.detach_named(NOTE_NAME_LIST);
    for list in lists {
        let mut element = Element::new(NOTE_NAME_LIST).with_attr(ATTR_NAME, list.name.as_str());
        for note in &list.notes {
            element.push(
                Element::new(NOTE)
                    .with_attr(ATTR_NUMBER, note.number.to_string())
                    .with_attr(ATTR_NAME, note.name.as_str()),
            );
        }
        device.push(element);
    }
    debug!(removed = removed.len(), written = lists.len(), "replaced note name lists");
    lists.len()
}

fn replace_control_lists(device: &mut Element, lists: &[ControlListData]) -> usize {
    let removed = device.detach_named(CONTROL_NAME_LIST);
    for list in lists {
        let mut element =
            Element::new(CONTROL_NAME_LIST).with_attr(ATTR_NAME, list.name.as_str());
        for control in &list.controls {
            element.push(
                Element::new(CONTROL)
                    .with_attr(ATTR_TYPE, control.control_type.as_str())
                    .with_attr(ATTR_NUMBER, control.number.as_str())
                    .with_attr(ATTR_NAME, control.name.as_str()),
            );
        }
        device.push(element);
    }
    debug!(removed = removed.len(), written = lists.len(), "replaced control name lists");
    lists.len()
}

fn set_active_control_list(device: &mut Element, active: &str) {
    for set in device.elements_mut().filter(|e| e.is(CHANNEL_NAME_SET)) {
        set.detach_named(USES_CONTROL_NAME_LIST);
        let index = set
            .last_position_where(|e| {
                e.is(AVAILABLE_FOR_CHANNELS) || e.is(USES_NOTE_NAME_LIST) || e.is(NOTE_NAME_LIST)
            })
            .map(|index| index + 1)
            .unwrap_or(0);
        set.insert(
            index,
            Element::new(USES_CONTROL_NAME_LIST).with_attr(ATTR_NAME, active),
        );
    }
    debug!(control_list = %active, "set active control name list");
}

fn set_standard_device_mode(device: &mut Element, enabled: bool, name: Option<&str>) {
    device.detach_named(SUPPORTS_STANDARD_DEVICE_MODE);
    if !enabled {
        debug!("removed standard device mode");
        return;
    }
    let index = device
        .last_position(MODEL)
        .map(|index| index + 1)
        .or_else(|| device.position(CUSTOM_DEVICE_MODE))
        .unwrap_or(0);
    let name = name
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_STANDARD_DEVICE_MODE);
    device.insert(
        index,
        Element::new(SUPPORTS_STANDARD_DEVICE_MODE).with_attr(ATTR_NAME, name),
    );
    debug!(mode = %name, "declared standard device mode");
}

/// Give every patch lacking a `ProgramChange` attribute the value of its
/// nested `PatchMIDICommands/ProgramChange/@Number`.
pub fn promote_program_changes(device: &mut Element) -> usize {
    let mut promoted = 0;
    device.walk_mut(&mut |element: &mut Element| {
        if !element.is(PATCH) || element.attr(ATTR_PROGRAM_CHANGE).is_some() {
            return;
        }
        if let Some(number) = nested_program_change(element).map(str::to_string) {
            element.set_attr(ATTR_PROGRAM_CHANGE, number);
            promoted += 1;
        }
    });
    promoted
}
