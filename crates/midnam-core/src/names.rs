//! Element and attribute names from the MIDINameDocument 1.0 DTD.

/// Root element (`MIDINameDocument`).
pub const MIDI_NAME_DOCUMENT: &str = "MIDINameDocument";
/// Document author (`Author`).
pub const AUTHOR: &str = "Author";
/// Primary device record (`MasterDeviceNames`).
pub const MASTER_DEVICE_NAMES: &str = "MasterDeviceNames";
/// Device record extending other models (`ExtendingDeviceNames`).
pub const EXTENDING_DEVICE_NAMES: &str = "ExtendingDeviceNames";
/// Standard mode definition at document level (`StandardDeviceMode`).
pub const STANDARD_DEVICE_MODE: &str = "StandardDeviceMode";
pub const MANUFACTURER: &str = "Manufacturer";
pub const MODEL: &str = "Model";
pub const DEVICE_ID: &str = "DeviceID";
pub const CUSTOM_DEVICE_MODE: &str = "CustomDeviceMode";
pub const CHANNEL_NAME_SET_ASSIGN: &str = "ChannelNameSetAssign";
pub const SUPPORTS_STANDARD_DEVICE_MODE: &str = "SupportsStandardDeviceMode";
pub const CHANNEL_NAME_SET: &str = "ChannelNameSet";
/// Availability block of a channel name set (`AvailableForChannels`).
pub const AVAILABLE_FOR_CHANNELS: &str = "AvailableForChannels";
pub const AVAILABLE_CHANNEL: &str = "AvailableChannel";
pub const PATCH_BANK: &str = "PatchBank";
/// Bank-select command block of a patch bank (`MIDICommands`).
pub const MIDI_COMMANDS: &str = "MIDICommands";
pub const CONTROL_CHANGE: &str = "ControlChange";
pub const PATCH_NAME_LIST: &str = "PatchNameList";
pub const PATCH: &str = "Patch";
/// Per-patch command block carrying the legacy program-change form.
pub const PATCH_MIDI_COMMANDS: &str = "PatchMIDICommands";
pub const PROGRAM_CHANGE: &str = "ProgramChange";
pub const NOTE_NAME_LIST: &str = "NoteNameList";
pub const USES_NOTE_NAME_LIST: &str = "UsesNoteNameList";
pub const NOTE_GROUP: &str = "NoteGroup";
pub const NOTE: &str = "Note";
pub const CONTROL_NAME_LIST: &str = "ControlNameList";
pub const USES_CONTROL_NAME_LIST: &str = "UsesControlNameList";
pub const CONTROL: &str = "Control";

/// `Name` attribute, the identity key of every named section.
pub const ATTR_NAME: &str = "Name";
pub const ATTR_NUMBER: &str = "Number";
pub const ATTR_PROGRAM_CHANGE: &str = "ProgramChange";
pub const ATTR_CHANNEL: &str = "Channel";
pub const ATTR_AVAILABLE: &str = "Available";
pub const ATTR_CONTROL: &str = "Control";
pub const ATTR_VALUE: &str = "Value";
pub const ATTR_TYPE: &str = "Type";
pub const ATTR_FAMILY: &str = "Family";
pub const ATTR_MEMBER: &str = "Member";
pub const ATTR_NAME_SET: &str = "NameSet";

/// DOCTYPE written when the source document carried none.
pub const DEFAULT_DOCTYPE: &str = r#"<!DOCTYPE MIDINameDocument PUBLIC "-//MIDI Manufacturers Association//DTD MIDINameDocument 1.0//EN" "http://www.midi.org/dtds/MIDINameDocument10.dtd">"#;

/// Standard mode declared when the payload enables the flag without a name.
pub const DEFAULT_STANDARD_DEVICE_MODE: &str = "General MIDI";
