//! Patch-level reads and the single-patch edit.

use midnam_xml::Element;
use serde::Serialize;
use tracing::{debug, info};

use crate::merge::primary_device_record_mut;
use crate::names::*;
use crate::payload::{NoteData, PatchUpdate};
use crate::MidnamError;

/// Program-change number of a patch.
///
/// The `ProgramChange` attribute wins; patches written by older tools carry
/// it as `PatchMIDICommands/ProgramChange/@Number` instead.
pub fn program_change(patch: &Element) -> Option<&str> {
    patch
        .attr(ATTR_PROGRAM_CHANGE)
        .filter(|value| !value.is_empty())
        .or_else(|| nested_program_change(patch))
}

pub(crate) fn nested_program_change(patch: &Element) -> Option<&str> {
    patch
        .find_first(PATCH_MIDI_COMMANDS)?
        .find_first(PROGRAM_CHANGE)?
        .attr(ATTR_NUMBER)
        .filter(|value| !value.is_empty())
}

/// Result of [`update_patch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchEdit {
    pub bank: String,
    pub patch_name: String,
    /// Note list the patch now uses, when notes were written.
    pub note_list: Option<String>,
    pub note_list_created: bool,
    pub notes_written: usize,
}

/// Rename/renumber one patch and, when notes are supplied, rewrite the note
/// list it uses.
///
/// The patch is located by bank name and by its original name (falling back
/// to the new name). A note list that does not exist yet is created as a
/// direct child of the device record.
pub fn update_patch(root: &mut Element, update: &PatchUpdate) -> Result<PatchEdit, MidnamError> {
    let lookup = update
        .lookup_name()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MidnamError::Payload("patch update names no patch".into()))?
        .to_string();
    let not_found = || MidnamError::PatchNotFound {
        bank: update.bank.clone(),
        patch: lookup.clone(),
    };

    let (patch_name, note_list) = {
        let patch = find_patch_mut(root, &update.bank, &lookup).ok_or_else(not_found)?;
        if let Some(name) = update.patch.name.as_deref().filter(|n| !n.is_empty()) {
            patch.set_attr(ATTR_NAME, name);
        }
        if let Some(number) = update.patch.number.as_deref() {
            patch.set_attr(ATTR_NUMBER, number);
        }

        let list_name = update
            .note_list_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                patch
                    .child(USES_NOTE_NAME_LIST)
                    .and_then(|uses| uses.attr(ATTR_NAME))
            })
            .map(str::to_string);
        let note_list = list_name.filter(|_| !update.notes.is_empty());
        if let Some(list) = &note_list {
            match patch.child_mut(USES_NOTE_NAME_LIST) {
                Some(uses) => uses.set_attr(ATTR_NAME, list.as_str()),
                None => patch.push(Element::new(USES_NOTE_NAME_LIST).with_attr(ATTR_NAME, list.as_str())),
            }
        }
        (
            patch.attr(ATTR_NAME).unwrap_or_default().to_string(),
            note_list,
        )
    };

    let mut edit = PatchEdit {
        bank: update.bank.clone(),
        patch_name,
        note_list: None,
        note_list_created: false,
        notes_written: 0,
    };
    if let Some(list) = note_list {
        edit.note_list_created = write_note_list(root, &list, &update.notes)?;
        edit.notes_written = update.notes.len();
        edit.note_list = Some(list);
    }
    info!(
        bank = %edit.bank,
        patch = %edit.patch_name,
        notes = edit.notes_written,
        "updated patch"
    );
    Ok(edit)
}

/// First patch named `patch` inside a bank named `bank`.
fn find_patch_mut<'a>(root: &'a mut Element, bank: &str, patch: &str) -> Option<&'a mut Element> {
    let is_patch = |e: &Element| e.is(PATCH) && e.attr(ATTR_NAME) == Some(patch);
    root.find_first_mut_where(&|e: &Element| {
        e.is(PATCH_BANK) && e.attr(ATTR_NAME) == Some(bank) && e.descendants().any(is_patch)
    })?
    .find_first_mut_where(&is_patch)
}

/// Replace the notes of the named list, creating it when absent. Returns
/// whether the list was created.
fn write_note_list(root: &mut Element, name: &str, notes: &[NoteData]) -> Result<bool, MidnamError> {
    let note = |data: &NoteData| {
        Element::new(NOTE)
            .with_attr(ATTR_NUMBER, data.number.to_string())
            .with_attr(ATTR_NAME, data.name.as_str())
    };
    if let Some(list) =
        root.find_first_mut_where(&|e: &Element| e.is(NOTE_NAME_LIST) && e.attr(ATTR_NAME) == Some(name))
    {
        let dropped = list.detach_named(NOTE);
        for data in notes {
            list.push(note(data));
        }
        debug!(note_list = %name, dropped = dropped.len(), written = notes.len(), "rewrote note list");
        return Ok(false);
    }

    let device = primary_device_record_mut(root).ok_or(MidnamError::NoDeviceRecord)?;
    let mut list = Element::new(NOTE_NAME_LIST).with_attr(ATTR_NAME, name);
    for data in notes {
        list.push(note(data));
    }
    device.push(list);
    debug!(note_list = %name, written = notes.len(), "created note list");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PatchFields;
    use midnam_xml::parse_document;

    const FIXTURE: &str = r#"<MIDINameDocument>
        <Author>Test</Author>
        <MasterDeviceNames>
            <Manufacturer>Acme</Manufacturer>
            <Model>Drum 1</Model>
            <ChannelNameSet Name="Kit">
                <PatchBank Name="Kits">
                    <PatchNameList>
                        <Patch Number="0" Name="Rock" ProgramChange="0">
                            <UsesNoteNameList Name="Rock Notes"/>
                        </Patch>
                        <Patch Number="1" Name="Jazz">
                            <PatchMIDICommands>
                                <ProgramChange Channel="10" Number="5"/>
                            </PatchMIDICommands>
                        </Patch>
                    </PatchNameList>
                </PatchBank>
            </ChannelNameSet>
            <NoteNameList Name="Rock Notes">
                <Note Number="36" Name="Kick"/>
            </NoteNameList>
        </MasterDeviceNames>
    </MIDINameDocument>"#;

    fn load() -> Element {
        parse_document(FIXTURE).expect("parse fixture").root
    }

    fn patch_named<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
        root.find_all(PATCH).find(|p| p.attr(ATTR_NAME) == Some(name))
    }

    fn update(patch: &str, original: Option<&str>) -> PatchUpdate {
        PatchUpdate {
            bank: "Kits".into(),
            patch: PatchFields {
                name: Some(patch.into()),
                number: None,
            },
            original_name: original.map(str::to_string),
            notes: Vec::new(),
            note_list_name: None,
        }
    }

    #[test]
    fn program_change_prefers_attribute_then_nested_form() {
        let root = load();
        assert_eq!(patch_named(&root, "Rock").and_then(program_change), Some("0"));
        assert_eq!(patch_named(&root, "Jazz").and_then(program_change), Some("5"));
        let bare = Element::new(PATCH).with_attr(ATTR_PROGRAM_CHANGE, "");
        assert_eq!(program_change(&bare), None);
    }

    #[test]
    fn rename_uses_original_name() {
        let mut root = load();
        let mut request = update("Fusion", Some("Jazz"));
        request.patch.number = Some("7".into());
        let edit = update_patch(&mut root, &request).expect("update");
        assert_eq!(edit.patch_name, "Fusion");
        assert!(edit.note_list.is_none());
        let patch = patch_named(&root, "Fusion").expect("renamed patch");
        assert_eq!(patch.attr(ATTR_NUMBER), Some("7"));
        assert!(patch_named(&root, "Jazz").is_none());
    }

    #[test]
    fn notes_rewrite_the_referenced_list() {
        let mut root = load();
        let mut request = update("Rock", None);
        request.notes = vec![
            NoteData { number: 36, name: "Bass Drum".into() },
            NoteData { number: 38, name: "Snare".into() },
        ];
        let edit = update_patch(&mut root, &request).expect("update");
        assert_eq!(edit.note_list.as_deref(), Some("Rock Notes"));
        assert!(!edit.note_list_created);
        let list = root.find_first(NOTE_NAME_LIST).expect("list");
        let names: Vec<_> = list.elements().filter_map(|n| n.attr(ATTR_NAME)).collect();
        assert_eq!(names, ["Bass Drum", "Snare"]);
    }

    #[test]
    fn missing_note_list_is_created_on_device_record() {
        let mut root = load();
        let mut request = update("Jazz", None);
        request.note_list_name = Some("Jazz Notes".into());
        request.notes = vec![NoteData { number: 42, name: "Hat".into() }];
        let edit = update_patch(&mut root, &request).expect("update");
        assert!(edit.note_list_created);

        let device = root.child(MASTER_DEVICE_NAMES).expect("device");
        let created = device
            .children_named(NOTE_NAME_LIST)
            .find(|l| l.attr(ATTR_NAME) == Some("Jazz Notes"))
            .expect("created list");
        assert_eq!(created.child(NOTE).and_then(|n| n.attr(ATTR_NUMBER)), Some("42"));
        let uses = patch_named(&root, "Jazz")
            .and_then(|p| p.child(USES_NOTE_NAME_LIST))
            .expect("uses reference");
        assert_eq!(uses.attr(ATTR_NAME), Some("Jazz Notes"));
    }

    #[test]
    fn unknown_patch_or_bank_is_not_found() {
        let mut root = load();
        let err = update_patch(&mut root, &update("Nope", None)).unwrap_err();
        assert!(matches!(err, MidnamError::PatchNotFound { ref patch, .. } if patch == "Nope"));

        let mut request = update("Rock", None);
        request.bank = "Other".into();
        let err = update_patch(&mut root, &request).unwrap_err();
        assert!(matches!(err, MidnamError::PatchNotFound { ref bank, .. } if bank == "Other"));
    }
}
