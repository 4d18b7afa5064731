//! DTD layout normalisation.
//!
//! Runs after every merge and is idempotent: a second pass over its own
//! output applies no fixes.

use std::fmt;

use midnam_xml::{Element, XmlNode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::names::*;

/// One layout correction applied by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fix {
    /// A `NoteNameList` nested in a channel name set moved to the device record.
    LiftedNoteNameList {
        channel_name_set: String,
        note_list: String,
    },
    /// Children of a channel name set were put back into canonical order.
    ReorderedChannelNameSet { channel_name_set: String },
    /// A `PatchBank` sitting directly under the device record was deleted.
    RemovedStrayPatchBank { bank: String },
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fix::LiftedNoteNameList {
                channel_name_set,
                note_list,
            } => write!(
                f,
                "moved NoteNameList '{note_list}' out of ChannelNameSet '{channel_name_set}'"
            ),
            Fix::ReorderedChannelNameSet { channel_name_set } => {
                write!(f, "reordered ChannelNameSet '{channel_name_set}'")
            }
            Fix::RemovedStrayPatchBank { bank } => {
                write!(f, "removed PatchBank '{bank}' from the device record")
            }
        }
    }
}

/// Fixes applied and data dropped by one normalisation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub fixes: Vec<Fix>,
    /// Lossy recoveries, e.g. surplus note references that were dropped.
    pub warnings: Vec<String>,
}

impl NormalizeReport {
    pub fn fix_count(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_clean(&self) -> bool {
        self.fixes.is_empty() && self.warnings.is_empty()
    }
}

/// Canonical position of a channel name set child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Availability,
    NoteRef,
    ControlRef,
    PatchBank,
    Other,
}

impl Bucket {
    fn of(element: &Element) -> Self {
        match element.name() {
            AVAILABLE_FOR_CHANNELS => Bucket::Availability,
            NOTE_NAME_LIST | USES_NOTE_NAME_LIST => Bucket::NoteRef,
            CONTROL_NAME_LIST | USES_CONTROL_NAME_LIST => Bucket::ControlRef,
            PATCH_BANK => Bucket::PatchBank,
            _ => Bucket::Other,
        }
    }
}

/// Bring every device record in the document into the canonical layout.
pub fn normalize(root: &mut Element) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    root.walk_mut(&mut |element: &mut Element| {
        if element.is(MASTER_DEVICE_NAMES) || element.is(EXTENDING_DEVICE_NAMES) {
            normalize_device(element, &mut report);
        }
    });
    debug!(
        fixes = report.fix_count(),
        warnings = report.warnings.len(),
        "normalised document"
    );
    report
}

fn normalize_device(device: &mut Element, report: &mut NormalizeReport) {
    for bank in device.detach_named(PATCH_BANK) {
        let bank = bank.attr(ATTR_NAME).unwrap_or_default().to_string();
        warn!(bank = %bank, "deleting PatchBank found directly under the device record");
        report.warnings.push(format!(
            "deleted PatchBank '{bank}' outside any ChannelNameSet"
        ));
        report.fixes.push(Fix::RemovedStrayPatchBank { bank });
    }

    let mut lifted = Vec::new();
    for set in device.elements_mut().filter(|e| e.is(CHANNEL_NAME_SET)) {
        let set_name = set.attr(ATTR_NAME).unwrap_or_default().to_string();
        for list in set.detach_named(NOTE_NAME_LIST) {
            report.fixes.push(Fix::LiftedNoteNameList {
                channel_name_set: set_name.clone(),
                note_list: list.attr(ATTR_NAME).unwrap_or_default().to_string(),
            });
            lifted.push(list);
        }
    }
    for list in lifted {
        device.push(list);
    }

    for set in device.elements_mut().filter(|e| e.is(CHANNEL_NAME_SET)) {
        reorder_channel_name_set(set, report);
    }
}

fn needs_reorder(set: &Element) -> bool {
    let buckets: Vec<Bucket> = set.elements().map(Bucket::of).collect();
    let in_order = buckets.windows(2).all(|pair| pair[0] <= pair[1]);
    let note_refs = buckets.iter().filter(|b| **b == Bucket::NoteRef).count();
    !in_order || note_refs > 1
}

fn reorder_channel_name_set(set: &mut Element, report: &mut NormalizeReport) {
    if !needs_reorder(set) {
        return;
    }
    let set_name = set.attr(ATTR_NAME).unwrap_or_default().to_string();

    // Comments travel with the element that follows them.
    let mut units: Vec<(Bucket, Vec<XmlNode>)> = Vec::new();
    let mut pending = Vec::new();
    for node in set.take_children() {
        let bucket = node.as_element().map(Bucket::of);
        pending.push(node);
        if let Some(bucket) = bucket {
            units.push((bucket, std::mem::take(&mut pending)));
        }
    }
    units.sort_by_key(|(bucket, _)| *bucket);

    let mut kept_note_ref = false;
    units.retain(|(bucket, nodes)| {
        if *bucket != Bucket::NoteRef {
            return true;
        }
        if !kept_note_ref {
            kept_note_ref = true;
            return true;
        }
        if let Some(element) = nodes.last().and_then(XmlNode::as_element) {
            let tag = element.name();
            let name = element.attr(ATTR_NAME).unwrap_or_default();
            warn!(channel_name_set = %set_name, reference = %name, tag = %tag, "dropping extra note reference");
            report.warnings.push(format!(
                "dropped {tag} '{name}' from ChannelNameSet '{set_name}': only one note reference is allowed"
            ));
        }
        false
    });

    for node in units.into_iter().flat_map(|(_, nodes)| nodes).chain(pending) {
        set.push(node);
    }
    debug!(channel_name_set = %set_name, "reordered channel name set");
    report
        .fixes
        .push(Fix::ReorderedChannelNameSet { channel_name_set: set_name });
}
