//! Typed partial-update payloads sent by the editor.
//!
//! Every section of [`StructureUpdate`] is optional: `None` leaves that part
//! of the document untouched, `Some` replaces it wholesale.

use serde::{Deserialize, Serialize};

/// Partial device structure to merge into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureUpdate {
    /// Complete desired set of channel name sets; sets not listed are removed.
    #[serde(
        rename = "channelNameSets",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_name_sets: Option<Vec<ChannelNameSetData>>,
    /// Patch banks, each tagged with its owning channel name set.
    #[serde(rename = "patchList", default, skip_serializing_if = "Option::is_none")]
    pub patch_banks: Option<Vec<PatchBankData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_lists: Option<Vec<NoteListData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_lists: Option<Vec<ControlListData>>,
    #[serde(
        rename = "activeControlListName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_control_list: Option<String>,
    #[serde(
        rename = "supportsStandardDeviceMode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub supports_standard_device_mode: Option<bool>,
    #[serde(
        rename = "standardDeviceModeName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub standard_device_mode_name: Option<String>,
}

impl StructureUpdate {
    /// `true` when no section is present.
    pub fn is_empty(&self) -> bool {
        self == &StructureUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNameSetData {
    pub name: String,
    #[serde(default)]
    pub available_channels: Vec<AvailableChannelData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableChannelData {
    #[serde(deserialize_with = "lenient::u8_value")]
    pub channel: u8,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBankData {
    pub name: String,
    #[serde(rename = "channelNameSet", default, skip_serializing_if = "Option::is_none")]
    pub channel_name_set: Option<String>,
    #[serde(default)]
    pub midi_commands: Vec<MidiCommand>,
    #[serde(rename = "patch", default)]
    pub patches: Vec<PatchData>,
}

/// Command sent when a bank is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MidiCommand {
    ControlChange {
        #[serde(deserialize_with = "lenient::u8_value")]
        control: u8,
        #[serde(deserialize_with = "lenient::u8_value")]
        value: u8,
    },
    /// Command types the engine does not write; skipped on merge.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchData {
    pub name: String,
    #[serde(
        rename = "Number",
        alias = "number",
        default,
        deserialize_with = "lenient::string"
    )]
    pub number: String,
    #[serde(
        rename = "programChange",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub program_change: Option<String>,
    /// Name of the note list this patch uses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_list_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteListData {
    pub name: String,
    #[serde(default)]
    pub notes: Vec<NoteData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    #[serde(deserialize_with = "lenient::u8_value")]
    pub number: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlListData {
    pub name: String,
    #[serde(default)]
    pub controls: Vec<ControlData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlData {
    #[serde(rename = "type", default = "default_control_type")]
    pub control_type: String,
    #[serde(deserialize_with = "lenient::string")]
    pub number: String,
    pub name: String,
}

fn default_control_type() -> String {
    "7bit".to_string()
}

/// Single-patch edit: rename/renumber a patch and optionally rewrite the
/// note list it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchUpdate {
    #[serde(rename = "patchBank")]
    pub bank: String,
    pub patch: PatchFields,
    /// Name used to locate the patch when it is being renamed.
    #[serde(
        rename = "originalPatchName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_name: Option<String>,
    #[serde(default)]
    pub notes: Vec<NoteData>,
    #[serde(rename = "noteListName", default, skip_serializing_if = "Option::is_none")]
    pub note_list_name: Option<String>,
}

impl PatchUpdate {
    /// Name the target patch currently carries in the document.
    pub fn lookup_name(&self) -> Option<&str> {
        self.original_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.patch.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,
}

/// The editor sends numbers both as JSON numbers and as strings.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Scalar::Text(text) => text,
                Scalar::Int(value) => value.to_string(),
                Scalar::Float(value) => value.to_string(),
            }
        }
    }

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Scalar::deserialize(deserializer)?.into_string())
    }

    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_string)
            .filter(|value| !value.is_empty()))
    }

    pub fn u8_value<'de, D>(deserializer: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Scalar::deserialize(deserializer)?.into_string();
        raw.trim()
            .parse()
            .map_err(|err| D::Error::custom(format!("expected a value in 0..=255, got {raw:?}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_sections_stay_none() {
        let update: StructureUpdate =
            serde_json::from_str(r#"{"note_lists": []}"#).expect("parse payload");
        assert!(update.channel_name_sets.is_none());
        assert!(update.patch_banks.is_none());
        assert_eq!(update.note_lists, Some(Vec::new()));
        assert!(!update.is_empty());
        assert!(StructureUpdate::default().is_empty());
    }

    #[test]
    fn numbers_accept_strings_and_integers() {
        let update: StructureUpdate = serde_json::from_str(
            r#"{
                "channelNameSets": [{"name": "Name Set 1", "available_channels": [{"channel": "2", "available": true}]}],
                "patchList": [{
                    "name": "Patches",
                    "channelNameSet": "Name Set 1",
                    "midi_commands": [{"type": "ControlChange", "control": 0, "value": "3"}, {"type": "SysEx"}],
                    "patch": [{"name": "New Patch", "Number": 1, "programChange": "1"}, {"name": "Bare", "Number": "2"}]
                }]
            }"#,
        )
        .expect("parse payload");
        let sets = update.channel_name_sets.expect("sets");
        assert_eq!(sets[0].available_channels[0].channel, 2);
        let banks = update.patch_banks.expect("banks");
        assert_eq!(
            banks[0].midi_commands,
            vec![
                MidiCommand::ControlChange { control: 0, value: 3 },
                MidiCommand::Unsupported
            ]
        );
        assert_eq!(banks[0].patches[0].number, "1");
        assert_eq!(banks[0].patches[0].program_change.as_deref(), Some("1"));
        assert_eq!(banks[0].patches[1].program_change, None);
    }

    #[test]
    fn patch_update_prefers_original_name() {
        let update: PatchUpdate = serde_json::from_str(
            r#"{"patchBank": "Bank A", "patch": {"name": "Renamed", "number": 4}, "originalPatchName": "Old"}"#,
        )
        .expect("parse patch update");
        assert_eq!(update.lookup_name(), Some("Old"));
        assert_eq!(update.patch.number.as_deref(), Some("4"));
    }

    #[test]
    fn out_of_range_note_number_is_rejected() {
        let err = serde_json::from_str::<NoteData>(r#"{"number": 300, "name": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("0..=255"));
    }
}
