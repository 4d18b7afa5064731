use std::path::{Path, PathBuf};

use midnam_core::{
    merge_structure, normalize, primary_device_record_mut, promote_program_changes, update_patch,
    MidnamError, NormalizeReport, StructureUpdate,
};
use midnam_xml::Document;
use tracing::{info, warn};

use crate::file::{load_document, save_document, SaveOptions};
use crate::lock::PathLocks;
use crate::request::{PatchOutcome, PatchRequest, SaveOutcome, StructureRequest};
use crate::StoreError;

/// Entry point for editing documents on disk.
///
/// Each operation loads the document fresh, mutates it, normalises it, and
/// writes it back while holding the lock for that path.
#[derive(Debug, Default)]
pub struct DocumentStore {
    options: SaveOptions,
    locks: PathLocks,
}

fn core_error(path: &Path, err: MidnamError) -> StoreError {
    match err {
        MidnamError::PatchNotFound { bank, patch } => StoreError::PatchNotFound {
            path: path.to_path_buf(),
            bank,
            patch,
        },
        MidnamError::Payload(message) => StoreError::Validation(message),
        other => StoreError::malformed(path, other),
    }
}

impl DocumentStore {
    pub fn new(options: SaveOptions) -> Self {
        Self {
            options,
            locks: PathLocks::new(),
        }
    }

    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    /// Validate a structure request and apply it.
    pub fn save_structure(&self, request: &StructureRequest) -> Result<SaveOutcome, StoreError> {
        let (path, update) = request.validate()?;
        self.merge_file(&path, update)
    }

    /// Merge `update` into the document at `path`, normalise, and save.
    pub fn merge_file(&self, path: &Path, update: &StructureUpdate) -> Result<SaveOutcome, StoreError> {
        self.locks.with_lock(path, || {
            let mut doc = load_document(path)?;
            let summary = merge_structure(&mut doc.root, update).map_err(|e| core_error(path, e))?;
            let (_, report) = tidy(&mut doc);
            let backup = save_document(&doc, path, &self.options)?;

            let mut outcome = SaveOutcome::new(path, backup);
            outcome.warnings = summary
                .patch_banks_skipped
                .iter()
                .map(|bank| format!("skipped PatchBank '{bank}': no matching ChannelNameSet"))
                .chain(report.warnings)
                .collect();
            outcome.fixes = report.fixes;
            info!(
                path = %path.display(),
                fixes = outcome.fixes.len(),
                warnings = outcome.warnings.len(),
                "saved structure"
            );
            outcome.merge = Some(summary);
            Ok(outcome)
        })
    }

    /// Validate a patch request and apply it.
    pub fn update_patch(&self, request: &PatchRequest) -> Result<PatchOutcome, StoreError> {
        let (path, update) = request.validate()?;
        self.locks.with_lock(&path, || {
            let mut doc = load_document(&path)?;
            let edit = update_patch(&mut doc.root, &update).map_err(|e| core_error(&path, e))?;
            let (_, report) = tidy(&mut doc);
            if !report.warnings.is_empty() {
                warn!(path = %path.display(), warnings = ?report.warnings, "normalisation dropped data");
            }
            let backup = save_document(&doc, &path, &self.options)?;
            Ok(PatchOutcome {
                success: true,
                backup: backup.map(|b| b.display().to_string()),
                file_path: path.display().to_string(),
                edit,
            })
        })
    }

    /// Normalise the document at `path`. With `write` unset, or when there
    /// is nothing to fix, the file is left untouched.
    pub fn normalize_file(&self, path: &Path, write: bool) -> Result<SaveOutcome, StoreError> {
        self.locks.with_lock(path, || {
            let mut doc = load_document(path)?;
            let (promoted, report) = tidy(&mut doc);
            let changed = promoted > 0 || report.fix_count() > 0;
            let backup: Option<PathBuf> = if write && changed {
                save_document(&doc, path, &self.options)?
            } else {
                None
            };
            let mut outcome = SaveOutcome::new(path, backup);
            outcome.fixes = report.fixes;
            outcome.warnings = report.warnings;
            Ok(outcome)
        })
    }
}

/// Program-change promotion and normalisation, run before every save.
fn tidy(doc: &mut Document) -> (usize, NormalizeReport) {
    let promoted = primary_device_record_mut(&mut doc.root)
        .map(promote_program_changes)
        .unwrap_or_default();
    (promoted, normalize(&mut doc.root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use midnam_core::{
        names::*, AvailableChannelData, ChannelNameSetData, DeviceDetails, NoteData, PatchBankData,
        PatchData, PatchFields,
    };
    use std::fs;

    const DEVICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE MIDINameDocument PUBLIC "-//MIDI Manufacturers Association//DTD MIDINameDocument 1.0//EN" "http://www.midi.org/dtds/MIDINameDocument10.dtd">
<MIDINameDocument>
	<Author>Test</Author>
	<MasterDeviceNames>
		<Manufacturer>Acme</Manufacturer>
		<Model>Synth 1</Model>
		<ChannelNameSet Name="Name Set 1">
			<AvailableForChannels>
				<AvailableChannel Channel="1" Available="true"/>
			</AvailableForChannels>
			<PatchBank Name="Patches">
				<PatchNameList>
					<Patch Number="0" Name="Default Patch" ProgramChange="0"/>
				</PatchNameList>
			</PatchBank>
		</ChannelNameSet>
	</MasterDeviceNames>
</MIDINameDocument>
"#;

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Acme_Synth1.midnam");
        fs::write(&path, DEVICE).expect("write fixture");
        (dir, path)
    }

    fn scenario_update(patch_name: &str, number: &str) -> StructureUpdate {
        StructureUpdate {
            channel_name_sets: Some(vec![ChannelNameSetData {
                name: "Name Set 1".into(),
                available_channels: vec![AvailableChannelData { channel: 1, available: true }],
            }]),
            patch_banks: Some(vec![PatchBankData {
                name: "Patches".into(),
                channel_name_set: Some("Name Set 1".into()),
                midi_commands: Vec::new(),
                patches: vec![PatchData {
                    name: patch_name.into(),
                    number: number.into(),
                    program_change: Some(number.into()),
                    note_list_name: None,
                }],
            }]),
            ..Default::default()
        }
    }

    fn backups(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .expect("list")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.to_string_lossy().contains(".backup."))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn structure_save_replaces_patch_list() {
        let (_dir, path) = setup();
        let store = DocumentStore::default();
        let request = StructureRequest::new(path.display().to_string(), scenario_update("New Patch", "1"));
        let outcome = store.save_structure(&request).expect("save");
        assert!(outcome.success);
        assert!(outcome.backup.is_some());

        let doc = load_document(&path).expect("reload");
        let patches: Vec<_> = doc.root.find_all(PATCH).collect();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].attr(ATTR_NAME), Some("New Patch"));
        assert_eq!(patches[0].attr(ATTR_NUMBER), Some("1"));
        assert_eq!(patches[0].attr(ATTR_PROGRAM_CHANGE), Some("1"));
        assert_eq!(doc.root.find_all(CHANNEL_NAME_SET).count(), 1);
    }

    #[test]
    fn two_saves_leave_two_backups_of_prior_content() {
        let (dir, path) = setup();
        let store = DocumentStore::default();

        store
            .merge_file(&path, &scenario_update("First", "1"))
            .expect("first save");
        let after_first = fs::read_to_string(&path).expect("read");
        store
            .merge_file(&path, &scenario_update("Second", "2"))
            .expect("second save");

        let found = backups(dir.path());
        assert_eq!(found.len(), 2, "{found:?}");
        let contents: Vec<String> = found
            .iter()
            .map(|p| fs::read_to_string(p).expect("read backup"))
            .collect();
        assert!(contents.contains(&DEVICE.to_string()));
        assert!(contents.contains(&after_first));

        let doc = load_document(&path).expect("reload");
        let details = DeviceDetails::extract(&doc.root).expect("details");
        let expected = scenario_update("Second", "2");
        assert_eq!(details.to_update().patch_banks, expected.patch_banks);
        assert_eq!(details.to_update().channel_name_sets, expected.channel_name_sets);
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::default();
        let err = store
            .merge_file(&dir.path().join("absent.midnam"), &scenario_update("x", "0"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
    }

    #[test]
    fn malformed_document_is_left_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.midnam");
        fs::write(&path, "<MIDINameDocument><Author>").expect("write");
        let store = DocumentStore::default();
        let err = store.merge_file(&path, &scenario_update("x", "0")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocumentError);
        assert_eq!(fs::read_to_string(&path).expect("read"), "<MIDINameDocument><Author>");
        assert!(backups(dir.path()).is_empty());
    }

    #[test]
    fn document_without_device_record_is_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.midnam");
        fs::write(&path, "<MIDINameDocument><Author/></MIDINameDocument>").expect("write");
        let err = DocumentStore::default()
            .merge_file(&path, &scenario_update("x", "0"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocumentError);
    }

    #[test]
    fn patch_update_writes_notes_and_reports_missing_patch() {
        let (_dir, path) = setup();
        let store = DocumentStore::new(SaveOptions::default().with_backup(false));
        let request = PatchRequest {
            file_path: Some(path.display().to_string()),
            patch_bank: Some("Patches".into()),
            patch: Some(PatchFields {
                name: Some("Drums".into()),
                number: None,
            }),
            original_patch_name: Some("Default Patch".into()),
            notes: vec![NoteData { number: 36, name: "Kick".into() }],
            note_list_name: Some("Drum Notes".into()),
        };
        let outcome = store.update_patch(&request).expect("update");
        assert_eq!(outcome.edit.patch_name, "Drums");
        assert!(outcome.edit.note_list_created);
        assert!(outcome.backup.is_none());

        let doc = load_document(&path).expect("reload");
        let device = doc.root.child(MASTER_DEVICE_NAMES).expect("device");
        assert_eq!(
            device.child(NOTE_NAME_LIST).and_then(|l| l.attr(ATTR_NAME)),
            Some("Drum Notes")
        );

        let err = store.update_patch(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PatchNotFoundError);
        assert!(err.to_string().contains("Default Patch"));
    }

    #[test]
    fn normalize_file_only_writes_when_needed() {
        let (dir, path) = setup();
        let store = DocumentStore::default();
        let outcome = store.normalize_file(&path, true).expect("normalize");
        assert!(outcome.fixes.is_empty());
        assert!(outcome.backup.is_none());
        assert_eq!(fs::read_to_string(&path).expect("read"), DEVICE);

        let messy = DEVICE.replace(
            "<PatchBank Name=\"Patches\">",
            "<UsesNoteNameList Name=\"A\"/><UsesNoteNameList Name=\"B\"/><PatchBank Name=\"Patches\">",
        );
        fs::write(&path, &messy).expect("write");
        let dry = store.normalize_file(&path, false).expect("dry run");
        assert_eq!(dry.fixes.len(), 1);
        assert_eq!(dry.warnings.len(), 1);
        assert_eq!(fs::read_to_string(&path).expect("read"), messy);

        let applied = store.normalize_file(&path, true).expect("normalize");
        assert!(applied.backup.is_some());
        assert_eq!(backups(dir.path()).len(), 1);
        let again = store.normalize_file(&path, true).expect("normalize again");
        assert!(again.fixes.is_empty());
    }
}
