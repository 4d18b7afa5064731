//! Device identification and document summaries.

use midnam_xml::Element;
use serde::Serialize;
use tracing::trace;

use crate::names::*;
use crate::MidnamError;

const UNKNOWN: &str = "Unknown";

/// Which kind of device record a document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Master,
    Extending,
}

/// Identity of the primary device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    /// First model listed.
    pub model: String,
    /// Every non-empty `Model` of the record, in order.
    pub models: Vec<String>,
    pub family_id: Option<String>,
    pub member_id: Option<String>,
    pub kind: DeviceKind,
}

impl DeviceInfo {
    /// Catalog key, `Manufacturer|Model`.
    pub fn key(&self) -> String {
        format!("{}|{}", self.manufacturer, self.model)
    }
}

fn trimmed_text(element: Option<&Element>) -> String {
    element
        .and_then(Element::text)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Identify the device a document describes.
///
/// `MasterDeviceNames` takes precedence over `ExtendingDeviceNames`. A
/// record without a `Manufacturer` or `Model` child is rejected.
pub fn extract_device_info(root: &Element) -> Result<DeviceInfo, MidnamError> {
    if !root.is(MIDI_NAME_DOCUMENT) {
        return Err(MidnamError::UnexpectedRoot(root.name().to_string()));
    }
    let (record, kind) = match root.find_first(MASTER_DEVICE_NAMES) {
        Some(master) => (master, DeviceKind::Master),
        None => (
            root.find_first(EXTENDING_DEVICE_NAMES)
                .ok_or(MidnamError::NoDeviceRecord)?,
            DeviceKind::Extending,
        ),
    };

    let manufacturer = record
        .child(MANUFACTURER)
        .ok_or(MidnamError::Incomplete(MANUFACTURER))?;
    let first_model = record.child(MODEL).ok_or(MidnamError::Incomplete(MODEL))?;
    let models = record
        .children_named(MODEL)
        .filter_map(Element::text)
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect();
    let device_id = match kind {
        DeviceKind::Master => record.child(DEVICE_ID),
        DeviceKind::Extending => None,
    };

    let info = DeviceInfo {
        manufacturer: trimmed_text(Some(manufacturer)),
        model: trimmed_text(Some(first_model)),
        models,
        family_id: device_id.and_then(|id| id.attr(ATTR_FAMILY)).map(str::to_string),
        member_id: device_id.and_then(|id| id.attr(ATTR_MEMBER)).map(str::to_string),
        kind,
    };
    trace!(key = %info.key(), kind = ?info.kind, "extracted device info");
    Ok(info)
}

/// Patch count of one bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankSummary {
    pub name: String,
    pub patch_count: usize,
}

/// Counts and identity of a document, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub manufacturer: String,
    pub model: String,
    pub author: String,
    pub total_banks: usize,
    pub total_patches: usize,
    pub total_note_lists: usize,
    pub banks: Vec<BankSummary>,
}

/// Summarise any document; missing identity fields read as `Unknown`.
pub fn summarize(root: &Element) -> DocumentSummary {
    let text_or_unknown = |element: Option<&Element>| {
        let text = trimmed_text(element);
        if text.is_empty() {
            UNKNOWN.to_string()
        } else {
            text
        }
    };
    let master = root.find_first(MASTER_DEVICE_NAMES);
    let author = root
        .child(AUTHOR)
        .filter(|author| author.text().is_some())
        .or_else(|| root.find_first(AUTHOR));

    let banks: Vec<BankSummary> = root
        .find_all(PATCH_BANK)
        .map(|bank| BankSummary {
            name: bank.attr(ATTR_NAME).unwrap_or("Unnamed Bank").to_string(),
            patch_count: bank.find_all(PATCH).count(),
        })
        .collect();

    DocumentSummary {
        manufacturer: text_or_unknown(master.and_then(|m| m.child(MANUFACTURER))),
        model: text_or_unknown(master.and_then(|m| m.child(MODEL))),
        author: text_or_unknown(author),
        total_banks: banks.len(),
        total_patches: root.find_all(PATCH).count(),
        total_note_lists: root.find_all(NOTE_NAME_LIST).count(),
        banks,
    }
}
