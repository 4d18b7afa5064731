//! Read view of a device record, shaped like the editor's payload.

use midnam_xml::Element;
use serde::Serialize;

use crate::device::summarize;
use crate::merge::primary_device_record;
use crate::names::*;
use crate::patch::program_change;
use crate::payload::{
    AvailableChannelData, ChannelNameSetData, ControlData, ControlListData, MidiCommand,
    NoteData, NoteListData, PatchBankData, PatchData, StructureUpdate,
};
use crate::MidnamError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelNameSetDetails {
    pub name: String,
    pub available_channels: Vec<AvailableChannelData>,
    /// Names of the banks owned by this set, in document order.
    pub patch_banks: Vec<String>,
    pub note_list: Option<String>,
    pub control_list: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteGroupDetails {
    pub name: String,
    pub notes: Vec<NoteData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteListDetails {
    pub name: String,
    /// Ungrouped notes.
    pub notes: Vec<NoteData>,
    pub groups: Vec<NoteGroupDetails>,
}

impl NoteListDetails {
    /// Every note, grouped ones included, in document order.
    pub fn all_notes(&self) -> impl Iterator<Item = &NoteData> {
        self.notes
            .iter()
            .chain(self.groups.iter().flat_map(|group| group.notes.iter()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelAssignment {
    pub channel: u8,
    pub name_set: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomDeviceModeDetails {
    pub name: String,
    pub assignments: Vec<ChannelAssignment>,
}

/// Everything the editor shows for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDetails {
    pub manufacturer: String,
    pub model: String,
    pub author: String,
    pub channel_name_sets: Vec<ChannelNameSetDetails>,
    /// Banks tagged with their owning channel name set; banks outside any set
    /// carry `None`.
    pub patch_banks: Vec<PatchBankData>,
    pub note_lists: Vec<NoteListDetails>,
    pub control_lists: Vec<ControlListData>,
    pub custom_device_modes: Vec<CustomDeviceModeDetails>,
    pub standard_device_mode: Option<String>,
}

fn name_of(element: &Element) -> String {
    element.attr(ATTR_NAME).unwrap_or_default().to_string()
}

fn parse_u8(value: Option<&str>) -> Option<u8> {
    value.and_then(|v| v.trim().parse().ok())
}

fn notes_of(parent: &Element) -> Vec<NoteData> {
    parent
        .children_named(NOTE)
        .filter_map(|note| {
            Some(NoteData {
                number: parse_u8(note.attr(ATTR_NUMBER))?,
                name: note.attr(ATTR_NAME)?.to_string(),
            })
        })
        .collect()
}

fn patch_data(patch: &Element) -> PatchData {
    PatchData {
        name: name_of(patch),
        number: patch.attr(ATTR_NUMBER).unwrap_or_default().to_string(),
        program_change: program_change(patch).map(str::to_string),
        note_list_name: patch
            .find_first(USES_NOTE_NAME_LIST)
            .and_then(|uses| uses.attr(ATTR_NAME))
            .map(str::to_string),
    }
}

fn bank_data(bank: &Element, channel_name_set: Option<String>) -> PatchBankData {
    let midi_commands = bank
        .child(MIDI_COMMANDS)
        .map(|commands| {
            commands
                .elements()
                .map(|command| {
                    match (
                        command.is(CONTROL_CHANGE),
                        parse_u8(command.attr(ATTR_CONTROL)),
                        parse_u8(command.attr(ATTR_VALUE)),
                    ) {
                        (true, Some(control), Some(value)) => {
                            MidiCommand::ControlChange { control, value }
                        }
                        _ => MidiCommand::Unsupported,
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    PatchBankData {
        name: name_of(bank),
        channel_name_set,
        midi_commands,
        patches: bank.find_all(PATCH).map(patch_data).collect(),
    }
}

impl DeviceDetails {
    /// Read the primary device record of a document.
    pub fn extract(root: &Element) -> Result<Self, MidnamError> {
        let device = primary_device_record(root).ok_or(MidnamError::NoDeviceRecord)?;
        let summary = summarize(root);
        let text = |tag: &str| {
            device
                .child(tag)
                .and_then(Element::text)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };

        let mut channel_name_sets = Vec::new();
        let mut patch_banks = Vec::new();
        for set in device.children_named(CHANNEL_NAME_SET) {
            let set_name = name_of(set);
            let available_channels = set
                .find_all(AVAILABLE_CHANNEL)
                .filter_map(|channel| {
                    Some(AvailableChannelData {
                        channel: parse_u8(channel.attr(ATTR_CHANNEL))?,
                        available: channel.attr(ATTR_AVAILABLE) == Some("true"),
                    })
                })
                .collect();
            let banks: Vec<&Element> = set.children_named(PATCH_BANK).collect();
            channel_name_sets.push(ChannelNameSetDetails {
                name: set_name.clone(),
                available_channels,
                patch_banks: banks.iter().map(|bank| name_of(bank)).collect(),
                note_list: set
                    .elements()
                    .find(|e| e.is(USES_NOTE_NAME_LIST) || e.is(NOTE_NAME_LIST))
                    .map(name_of),
                control_list: set
                    .elements()
                    .find(|e| e.is(USES_CONTROL_NAME_LIST) || e.is(CONTROL_NAME_LIST))
                    .map(name_of),
            });
            patch_banks.extend(
                banks
                    .into_iter()
                    .map(|bank| bank_data(bank, Some(set_name.clone()))),
            );
        }
        patch_banks.extend(
            device
                .children_named(PATCH_BANK)
                .map(|bank| bank_data(bank, None)),
        );

        let note_lists = device
            .find_all(NOTE_NAME_LIST)
            .map(|list| NoteListDetails {
                name: name_of(list),
                notes: notes_of(list),
                groups: list
                    .children_named(NOTE_GROUP)
                    .map(|group| NoteGroupDetails {
                        name: name_of(group),
                        notes: notes_of(group),
                    })
                    .collect(),
            })
            .collect();

        let control_lists = device
            .find_all(CONTROL_NAME_LIST)
            .map(|list| ControlListData {
                name: name_of(list),
                controls: list
                    .children_named(CONTROL)
                    .map(|control| ControlData {
                        control_type: control.attr(ATTR_TYPE).unwrap_or("7bit").to_string(),
                        number: control.attr(ATTR_NUMBER).unwrap_or_default().to_string(),
                        name: name_of(control),
                    })
                    .collect(),
            })
            .collect();

        let custom_device_modes = device
            .children_named(CUSTOM_DEVICE_MODE)
            .map(|mode| CustomDeviceModeDetails {
                name: name_of(mode),
                assignments: mode
                    .find_all(CHANNEL_NAME_SET_ASSIGN)
                    .filter_map(|assign| {
                        Some(ChannelAssignment {
                            channel: parse_u8(assign.attr(ATTR_CHANNEL))?,
                            name_set: assign.attr(ATTR_NAME_SET)?.to_string(),
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(DeviceDetails {
            manufacturer: text(MANUFACTURER).unwrap_or(summary.manufacturer),
            model: text(MODEL).unwrap_or(summary.model),
            author: summary.author,
            channel_name_sets,
            patch_banks,
            note_lists,
            control_lists,
            custom_device_modes,
            standard_device_mode: device
                .child(SUPPORTS_STANDARD_DEVICE_MODE)
                .map(|mode| name_of(mode))
                .filter(|name| !name.is_empty()),
        })
    }

    /// Name of the control list shared by every channel name set. `None`
    /// when there are no sets or they disagree, including sets without one.
    pub fn active_control_list(&self) -> Option<&str> {
        let (first, rest) = self.channel_name_sets.split_first()?;
        let name = first.control_list.as_deref()?;
        rest.iter()
            .all(|set| set.control_list.as_deref() == Some(name))
            .then_some(name)
    }

    /// Complete update that, merged into the document these details came
    /// from, leaves its structure unchanged. Note groups are flattened.
    pub fn to_update(&self) -> StructureUpdate {
        StructureUpdate {
            channel_name_sets: Some(
                self.channel_name_sets
                    .iter()
                    .map(|set| ChannelNameSetData {
                        name: set.name.clone(),
                        available_channels: set.available_channels.clone(),
                    })
                    .collect(),
            ),
            patch_banks: Some(
                self.patch_banks
                    .iter()
                    .filter(|bank| bank.channel_name_set.is_some())
                    .cloned()
                    .collect(),
            ),
            note_lists: Some(
                self.note_lists
                    .iter()
                    .map(|list| NoteListData {
                        name: list.name.clone(),
                        notes: list.all_notes().cloned().collect(),
                    })
                    .collect(),
            ),
            control_lists: Some(self.control_lists.clone()),
            active_control_list: self.active_control_list().map(str::to_string),
            supports_standard_device_mode: Some(self.standard_device_mode.is_some()),
            standard_device_mode_name: self.standard_device_mode.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_structure;
    use crate::normalize::normalize;
    use midnam_xml::{parse_document, Indent};

    const FIXTURE: &str = r#"<MIDINameDocument>
        <Author>Jane</Author>
        <MasterDeviceNames>
            <Manufacturer>Acme</Manufacturer>
            <Model>Synth 1</Model>
            <SupportsStandardDeviceMode Name="General MIDI"/>
            <CustomDeviceMode Name="Default">
                <ChannelNameSetAssignments>
                    <ChannelNameSetAssign Channel="1" NameSet="Main"/>
                    <ChannelNameSetAssign Channel="10" NameSet="Drums"/>
                </ChannelNameSetAssignments>
            </CustomDeviceMode>
            <ChannelNameSet Name="Main">
                <AvailableForChannels>
                    <AvailableChannel Channel="1" Available="true"/>
                    <AvailableChannel Channel="2" Available="false"/>
                </AvailableForChannels>
                <UsesControlNameList Name="Controls"/>
                <PatchBank Name="Presets">
                    <MIDICommands>
                        <ControlChange Control="0" Value="0"/>
                        <ControlChange Control="32" Value="1"/>
                    </MIDICommands>
                    <PatchNameList>
                        <Patch Number="0" Name="Piano" ProgramChange="0"/>
                        <Patch Number="1" Name="Organ">
                            <PatchMIDICommands>
                                <ProgramChange Channel="1" Number="1"/>
                            </PatchMIDICommands>
                        </Patch>
                    </PatchNameList>
                </PatchBank>
            </ChannelNameSet>
            <ChannelNameSet Name="Drums">
                <AvailableForChannels>
                    <AvailableChannel Channel="10" Available="true"/>
                </AvailableForChannels>
                <UsesNoteNameList Name="Kit"/>
                <UsesControlNameList Name="Controls"/>
                <PatchBank Name="Kits">
                    <PatchNameList>
                        <Patch Number="0" Name="Standard" ProgramChange="0">
                            <UsesNoteNameList Name="Kit"/>
                        </Patch>
                    </PatchNameList>
                </PatchBank>
            </ChannelNameSet>
            <NoteNameList Name="Kit">
                <Note Number="35" Name="Acoustic Kick"/>
                <NoteGroup Name="Snares">
                    <Note Number="38" Name="Snare"/>
                    <Note Number="40" Name="Rim"/>
                </NoteGroup>
            </NoteNameList>
            <ControlNameList Name="Controls">
                <Control Type="7bit" Number="7" Name="Volume"/>
            </ControlNameList>
        </MasterDeviceNames>
    </MIDINameDocument>"#;

    fn details() -> DeviceDetails {
        let doc = parse_document(FIXTURE).expect("parse fixture");
        DeviceDetails::extract(&doc.root).expect("details")
    }

    #[test]
    fn extracts_sets_banks_and_modes() {
        let details = details();
        assert_eq!(details.manufacturer, "Acme");
        assert_eq!(details.author, "Jane");
        assert_eq!(details.standard_device_mode.as_deref(), Some("General MIDI"));
        assert_eq!(details.active_control_list(), Some("Controls"));

        let main = &details.channel_name_sets[0];
        assert_eq!(main.patch_banks, ["Presets"]);
        assert_eq!(main.available_channels[1], AvailableChannelData { channel: 2, available: false });
        assert_eq!(details.channel_name_sets[1].note_list.as_deref(), Some("Kit"));

        let presets = &details.patch_banks[0];
        assert_eq!(presets.channel_name_set.as_deref(), Some("Main"));
        assert_eq!(presets.midi_commands[1], MidiCommand::ControlChange { control: 32, value: 1 });
        assert_eq!(presets.patches[1].program_change.as_deref(), Some("1"));
        assert_eq!(details.patch_banks[1].patches[0].note_list_name.as_deref(), Some("Kit"));

        let mode = &details.custom_device_modes[0];
        assert_eq!(mode.assignments[1], ChannelAssignment { channel: 10, name_set: "Drums".into() });
    }

    #[test]
    fn note_groups_are_kept_apart_from_plain_notes() {
        let details = details();
        let kit = &details.note_lists[0];
        assert_eq!(kit.notes.len(), 1);
        assert_eq!(kit.groups[0].name, "Snares");
        let numbers: Vec<u8> = kit.all_notes().map(|n| n.number).collect();
        assert_eq!(numbers, [35, 38, 40]);
    }

    #[test]
    fn reextracting_a_merged_update_reproduces_it() {
        let original = details();
        let update = original.to_update();

        let mut doc = parse_document(FIXTURE).expect("parse fixture");
        merge_structure(&mut doc.root, &update).expect("merge");
        normalize(&mut doc.root);
        let merged = DeviceDetails::extract(&doc.root).expect("details");

        assert_eq!(merged.to_update(), update);
        assert_eq!(merged.custom_device_modes, original.custom_device_modes);
    }

    const MIXED_CONTROLS: &str = r#"<MIDINameDocument>
        <Author>Jane</Author>
        <MasterDeviceNames>
            <Manufacturer>Acme</Manufacturer>
            <Model>Synth 1</Model>
            <ChannelNameSet Name="S1">
                <AvailableForChannels>
                    <AvailableChannel Channel="1" Available="true"/>
                </AvailableForChannels>
                <UsesControlNameList Name="C"/>
            </ChannelNameSet>
            <ChannelNameSet Name="S2">
                <AvailableForChannels>
                    <AvailableChannel Channel="2" Available="true"/>
                </AvailableForChannels>
            </ChannelNameSet>
            <ControlNameList Name="C">
                <Control Type="7bit" Number="1" Name="Mod"/>
            </ControlNameList>
        </MasterDeviceNames>
    </MIDINameDocument>"#;

    #[test]
    fn control_list_is_active_only_when_shared() {
        assert_eq!(details().active_control_list(), Some("Controls"));

        let doc = parse_document(MIXED_CONTROLS).expect("parse");
        let mixed = DeviceDetails::extract(&doc.root).expect("details");
        assert_eq!(mixed.active_control_list(), None);
        assert_eq!(mixed.to_update().active_control_list, None);
    }

    #[test]
    fn round_trip_keeps_per_set_control_references() {
        let mut doc = parse_document(MIXED_CONTROLS).expect("parse");
        normalize(&mut doc.root);
        let before = doc.render("", Indent::TAB).expect("render");

        let update = DeviceDetails::extract(&doc.root).expect("details").to_update();
        merge_structure(&mut doc.root, &update).expect("merge");
        normalize(&mut doc.root);
        let after = doc.render("", Indent::TAB).expect("render");

        assert_eq!(before, after);
    }
}
