use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use midnam_store::{DocumentStore, ErrorResponse, SaveOptions, StoreError};
use midnam_xml::{Document, Indent};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub json: bool,
    pub default_doctype: Option<String>,
    pub indent_spaces: Option<usize>,
    pub no_backup: bool,
}

impl Globals {
    pub fn save_options(&self) -> SaveOptions {
        let mut options = SaveOptions::default().with_backup(!self.no_backup);
        if let Some(doctype) = &self.default_doctype {
            options = options.with_default_doctype(doctype.clone());
        }
        if let Some(size) = self.indent_spaces {
            options = options.with_indent(Indent::spaces(size));
        }
        options
    }

    pub fn store(&self) -> DocumentStore {
        DocumentStore::new(self.save_options())
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

/// Read a file, or stdin when `source` is `-`.
pub fn read_bytes(source: &Path) -> Result<Vec<u8>> {
    if source == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("read stdin")?;
        return Ok(bytes);
    }
    fs::read(source).with_context(|| format!("read {}", source.display()))
}

fn read_source(source: &Path) -> Result<String> {
    let bytes = read_bytes(source)?;
    String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", source.display()))
}

pub fn parse_json<T: DeserializeOwned>(source: &Path) -> Result<T> {
    let text = read_source(source)?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON from {}", source.display()))
}

/// Load a document for read-only commands.
pub fn load(path: &Path) -> Result<Document> {
    midnam_store::load_document(path).map_err(|err| anyhow!(err))
}

/// Print a store failure in the structured form when `--json` is set, then
/// hand it back as an error for the exit status.
pub fn store_failure(err: StoreError, json: bool) -> anyhow::Error {
    if json {
        if let Err(print_err) = print_json(&ErrorResponse::from(&err)) {
            return print_err;
        }
    }
    anyhow!(err)
}

pub fn display_backup(backup: Option<&str>) -> String {
    backup.map_or_else(|| "none".to_string(), str::to_string)
}
