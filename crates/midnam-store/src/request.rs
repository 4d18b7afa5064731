//! Request and response shapes exchanged with the editor.

use std::path::{Path, PathBuf};

use midnam_core::{
    Fix, MergeSummary, NoteData, PatchEdit, PatchFields, PatchUpdate, StructureUpdate,
};
use serde::{Deserialize, Serialize};

use crate::{ErrorKind, StoreError};

fn missing(fields: &[&str]) -> StoreError {
    StoreError::Validation(format!("missing required fields: {}", fields.join(", ")))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Whole-structure save: `{ "file_path": ..., "midnam": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub midnam: Option<StructureUpdate>,
}

impl StructureRequest {
    pub fn new(file_path: impl Into<String>, midnam: StructureUpdate) -> Self {
        Self {
            file_path: Some(file_path.into()),
            midnam: Some(midnam),
        }
    }

    /// Target path and payload, or a validation error naming what is missing.
    pub fn validate(&self) -> Result<(PathBuf, &StructureUpdate), StoreError> {
        let path = non_empty(&self.file_path);
        let update = self.midnam.as_ref().filter(|update| !update.is_empty());
        match (path, update) {
            (Some(path), Some(update)) => Ok((PathBuf::from(path), update)),
            (None, Some(_)) => Err(missing(&["file_path"])),
            (Some(_), None) => Err(missing(&["midnam"])),
            (None, None) => Err(missing(&["file_path", "midnam"])),
        }
    }
}

/// Single-patch save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(rename = "patchBank", default)]
    pub patch_bank: Option<String>,
    #[serde(default)]
    pub patch: Option<PatchFields>,
    #[serde(rename = "originalPatchName", default)]
    pub original_patch_name: Option<String>,
    #[serde(default)]
    pub notes: Vec<NoteData>,
    #[serde(rename = "noteListName", default)]
    pub note_list_name: Option<String>,
}

impl PatchRequest {
    pub fn validate(&self) -> Result<(PathBuf, PatchUpdate), StoreError> {
        let mut absent = Vec::new();
        let path = non_empty(&self.file_path);
        if path.is_none() {
            absent.push("file_path");
        }
        let bank = non_empty(&self.patch_bank);
        if bank.is_none() {
            absent.push("patchBank");
        }
        if self.patch.is_none() {
            absent.push("patch");
        }
        let (Some(path), Some(bank), Some(patch)) = (path, bank, self.patch.clone()) else {
            return Err(missing(&absent));
        };
        let update = PatchUpdate {
            bank: bank.to_string(),
            patch,
            original_name: self.original_patch_name.clone(),
            notes: self.notes.clone(),
            note_list_name: self.note_list_name.clone(),
        };
        if update.lookup_name().map_or(true, str::is_empty) {
            return Err(missing(&["patch.name"]));
        }
        Ok((PathBuf::from(path), update))
    }
}

/// Success result of a structural save or a normalisation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub backup: Option<String>,
    pub file_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,
    /// Data the normaliser dropped or skipped while saving.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeSummary>,
}

impl SaveOutcome {
    pub(crate) fn new(path: &Path, backup: Option<PathBuf>) -> Self {
        Self {
            success: true,
            backup: backup.map(|b| b.display().to_string()),
            file_path: path.display().to_string(),
            fixes: Vec::new(),
            warnings: Vec::new(),
            merge: None,
        }
    }
}

/// Success result of a single-patch save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOutcome {
    pub success: bool,
    pub backup: Option<String>,
    pub file_path: String,
    #[serde(flatten)]
    pub edit: PatchEdit,
}

/// Failure result: the error kind plus a message naming the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl From<&StoreError> for ErrorResponse {
    fn from(err: &StoreError) -> Self {
        Self {
            success: false,
            error: err.kind(),
            message: err.to_string(),
            file_path: err.path().map(|p| p.display().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_request_names_missing_fields() {
        let request: StructureRequest = serde_json::from_str("{}").expect("parse");
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("file_path, midnam"), "{err}");

        let request: StructureRequest =
            serde_json::from_str(r#"{"file_path": "a.midnam", "midnam": {}}"#).expect("parse");
        assert!(request.validate().unwrap_err().to_string().ends_with("midnam"));

        let request: StructureRequest = serde_json::from_str(
            r#"{"file_path": "a.midnam", "midnam": {"supportsStandardDeviceMode": true}}"#,
        )
        .expect("parse");
        let (path, update) = request.validate().expect("valid");
        assert_eq!(path, PathBuf::from("a.midnam"));
        assert_eq!(update.supports_standard_device_mode, Some(true));
    }

    #[test]
    fn patch_request_becomes_patch_update() {
        let request: PatchRequest = serde_json::from_str(
            r#"{
                "file_path": "d.midnam",
                "patchBank": "Kits",
                "patch": {"name": "Rock", "number": "3"},
                "notes": [{"number": 36, "name": "Kick"}],
                "noteListName": "Rock Notes"
            }"#,
        )
        .expect("parse");
        let (path, update) = request.validate().expect("valid");
        assert_eq!(path, PathBuf::from("d.midnam"));
        assert_eq!(update.bank, "Kits");
        assert_eq!(update.lookup_name(), Some("Rock"));
        assert_eq!(update.notes.len(), 1);

        let err = PatchRequest::default().validate().unwrap_err();
        assert!(err.to_string().contains("file_path, patchBank, patch"), "{err}");
    }

    #[test]
    fn error_response_carries_kind_and_path() {
        let err = StoreError::NotFound {
            path: PathBuf::from("gone.midnam"),
        };
        let response = ErrorResponse::from(&err);
        let json = serde_json::to_value(&response).expect("serialise");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "NotFoundError");
        assert_eq!(json["file_path"], "gone.midnam");
    }

    #[test]
    fn outcome_serialises_result_fields() {
        let outcome = SaveOutcome::new(Path::new("a.midnam"), None);
        let json = serde_json::to_value(&outcome).expect("serialise");
        assert_eq!(json["success"], true);
        assert!(json["backup"].is_null());
        assert_eq!(json["file_path"], "a.midnam");
        assert!(json.get("fixes").is_none());
    }
}
