use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use midnam_core::names::DEFAULT_DOCTYPE;
use midnam_xml::{Document, Indent};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::StoreError;

/// How documents are written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// DOCTYPE line used when the loaded document had none.
    pub default_doctype: String,
    pub indent: Indent,
    /// Copy the previous file aside before overwriting it.
    pub backup: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            default_doctype: DEFAULT_DOCTYPE.to_string(),
            indent: Indent::TAB,
            backup: true,
        }
    }
}

impl SaveOptions {
    pub fn with_default_doctype(mut self, doctype: impl Into<String>) -> Self {
        self.default_doctype = doctype.into();
        self
    }

    pub fn with_indent(mut self, indent: Indent) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }
}

/// Read and parse a document.
pub fn load_document(path: &Path) -> Result<Document, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(StoreError::io(path))?;
    let doc = Document::from_bytes(&bytes).map_err(|err| StoreError::malformed(path, err))?;
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        has_doctype = doc.doctype.is_some(),
        "loaded document"
    );
    Ok(doc)
}

/// Render `doc` and replace the file at `path` with it.
///
/// When the file already exists its current content is first copied to a
/// backup next to it; the backup path is returned. Rendering happens before
/// anything touches the disk, and the new content is written to a temporary
/// file in the same directory and renamed over the target.
pub fn save_document(
    doc: &Document,
    path: &Path,
    options: &SaveOptions,
) -> Result<Option<PathBuf>, StoreError> {
    let rendered = doc
        .render(&options.default_doctype, options.indent)
        .map_err(|err| StoreError::malformed(path, err))?;

    let backup = if options.backup && path.exists() {
        let backup = unique_backup_path(path, now());
        fs::copy(path, &backup).map_err(StoreError::io(&backup))?;
        info!(path = %path.display(), backup = %backup.display(), "backed up document");
        Some(backup)
    } else {
        None
    };

    write_atomic(path, rendered.as_bytes())?;
    info!(path = %path.display(), bytes = rendered.len(), "saved document");
    Ok(backup)
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `YYYY-MM-DD-HH-MM-SS`.
pub fn backup_stamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]-[hour]-[minute]-[second]");
    at.format(format).unwrap_or_else(|_| {
        format!(
            "{:04}-{:02}-{:02}-{:02}-{:02}-{:02}",
            at.year(),
            u8::from(at.month()),
            at.day(),
            at.hour(),
            at.minute(),
            at.second()
        )
    })
}

/// `<path>.backup.<stamp>`.
pub fn backup_path_for(path: &Path, at: OffsetDateTime) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup.");
    name.push(backup_stamp(at));
    PathBuf::from(name)
}

/// Backup path that does not exist yet; saves within the same second get a
/// numeric suffix.
fn unique_backup_path(path: &Path, at: OffsetDateTime) -> PathBuf {
    let base = backup_path_for(path, at);
    if !base.exists() {
        return base;
    }
    (1u32..)
        .map(|n| {
            let mut name = base.clone().into_os_string();
            name.push(format!(".{n}"));
            PathBuf::from(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(StoreError::io(path))?;
    temp.write_all(bytes).map_err(StoreError::io(path))?;
    // Temp files are created 0600; keep the mode of the file being replaced.
    if let Ok(existing) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(StoreError::io(path))?;
    }
    temp.as_file().sync_all().map_err(StoreError::io(path))?;
    temp.persist(path)
        .map_err(|err| StoreError::io(path)(err.error))?;
    Ok(())
}
