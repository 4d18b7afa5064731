//! MIDNAM semantics on top of the `midnam-xml` element tree: structural
//! merge of editor payloads, DTD layout normalisation, and read views over
//! device records.

pub mod names;

mod details;
mod device;
mod merge;
mod normalize;
mod patch;
mod payload;
mod validate;

use midnam_xml::XmlError;
use thiserror::Error;

pub use details::{
    ChannelAssignment, ChannelNameSetDetails, CustomDeviceModeDetails, DeviceDetails,
    NoteGroupDetails, NoteListDetails,
};
pub use device::{
    extract_device_info, summarize, BankSummary, DeviceInfo, DeviceKind, DocumentSummary,
};
pub use merge::{
    merge_structure, primary_device_record, primary_device_record_mut, promote_program_changes,
    MergeSummary,
};
pub use normalize::{normalize, Fix, NormalizeReport};
pub use patch::{program_change, update_patch, PatchEdit};
pub use payload::{
    AvailableChannelData, ChannelNameSetData, ControlData, ControlListData, MidiCommand,
    NoteData, NoteListData, PatchBankData, PatchData, PatchFields, PatchUpdate,
    StructureUpdate,
};
pub use validate::{
    validate_bytes, validate_structure, IssueKind, ValidationIssue, ValidationReport,
};

/// Error type produced by MIDNAM operations.
#[derive(Debug, Error)]
pub enum MidnamError {
    /// The document could not be parsed.
    #[error(transparent)]
    Xml(#[from] XmlError),
    /// The root element is not `MIDINameDocument`.
    #[error("root element is <{0}>, expected <MIDINameDocument>")]
    UnexpectedRoot(String),
    /// Neither `MasterDeviceNames` nor `ExtendingDeviceNames` is present.
    #[error("document has no MasterDeviceNames or ExtendingDeviceNames")]
    NoDeviceRecord,
    /// The device record lacks a required child.
    #[error("device record has no {0}")]
    Incomplete(&'static str),
    /// Single-patch update could not locate its target.
    #[error("patch '{patch}' not found in bank '{bank}'")]
    PatchNotFound { bank: String, patch: String },
    /// The update payload is unusable.
    #[error("invalid payload: {0}")]
    Payload(String),
}
