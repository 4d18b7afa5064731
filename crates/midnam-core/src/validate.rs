//! Well-formedness and basic structure checks.
//!
//! Full DTD validation is out of reach here; this covers what the editor
//! needs before accepting a file.

use midnam_xml::{decode_text, parse_document, XmlError};
use serde::Serialize;
use tracing::debug;

use crate::names::*;
use crate::normalize::{normalize, Fix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Syntax,
    Structure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    /// 1-based; `None` for structure issues.
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ValidationIssue {
    fn structure(message: impl Into<String>) -> Self {
        ValidationIssue {
            kind: IssueKind::Structure,
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    /// Fixes the normaliser would apply to this document.
    pub layout_fixes: Vec<Fix>,
}

/// 1-based line and byte column of `offset` within `text`.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let prefix = &text.as_bytes()[..offset.min(text.len())];
    let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    (line, prefix.len() - line_start + 1)
}

fn syntax_issue(text: &str, err: XmlError) -> ValidationIssue {
    match err {
        XmlError::Syntax { offset, message } => {
            let (line, column) = line_column(text, offset);
            ValidationIssue {
                kind: IssueKind::Syntax,
                message,
                line: Some(line),
                column: Some(column),
            }
        }
        other => ValidationIssue {
            kind: IssueKind::Syntax,
            message: other.to_string(),
            line: None,
            column: None,
        },
    }
}

/// [`validate_structure`] over raw file content, decoded the way the loader
/// decodes it.
pub fn validate_bytes(bytes: &[u8]) -> ValidationReport {
    match decode_text(bytes) {
        Ok(xml) => validate_structure(&xml),
        Err(err) => ValidationReport {
            errors: vec![syntax_issue(&String::from_utf8_lossy(bytes), err)],
            ..ValidationReport::default()
        },
    }
}

/// Check that `xml` is well-formed and shaped like a MIDI Name Document.
///
/// The layout check is a dry run: the normaliser runs on a copy and the
/// fixes it would make are reported without affecting validity.
pub fn validate_structure(xml: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut doc = match parse_document(xml) {
        Ok(doc) => doc,
        Err(err) => {
            report.errors.push(syntax_issue(xml, err));
            return report;
        }
    };

    let root = &doc.root;
    if !root.is(MIDI_NAME_DOCUMENT) {
        report.errors.push(ValidationIssue::structure(format!(
            "root element must be {MIDI_NAME_DOCUMENT}, found {}",
            root.name()
        )));
    } else {
        if root.child(AUTHOR).is_none() {
            report
                .errors
                .push(ValidationIssue::structure("missing required Author element"));
        }
        let has_device = root.child(MASTER_DEVICE_NAMES).is_some()
            || root.child(EXTENDING_DEVICE_NAMES).is_some()
            || root.child(STANDARD_DEVICE_MODE).is_some();
        if !has_device {
            report.errors.push(ValidationIssue::structure(
                "missing device definition (MasterDeviceNames, ExtendingDeviceNames, or StandardDeviceMode)",
            ));
        }
    }

    report.layout_fixes = normalize(&mut doc.root).fixes;
    report.valid = report.errors.is_empty();
    debug!(
        valid = report.valid,
        errors = report.errors.len(),
        layout_fixes = report.layout_fixes.len(),
        "validated document"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_document_passes() {
        let report = validate_structure(
            "<MIDINameDocument><Author/><MasterDeviceNames><Manufacturer>A</Manufacturer></MasterDeviceNames></MIDINameDocument>",
        );
        assert!(report.valid, "{report:?}");
        assert!(report.layout_fixes.is_empty());
    }

    #[test]
    fn syntax_error_reports_line_and_column() {
        let xml = "<MIDINameDocument>\n  <Author>\n</MIDINameDocument>\n";
        let report = validate_structure(xml);
        assert!(!report.valid);
        let issue = &report.errors[0];
        assert_eq!(issue.kind, IssueKind::Syntax);
        assert_eq!(issue.line, Some(3));
        assert!(issue.column.is_some());
    }

    #[test]
    fn structure_checks_report_every_problem() {
        let report = validate_structure("<MIDINameDocument><Other/></MIDINameDocument>");
        assert!(!report.valid);
        let messages: Vec<_> = report.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("Author"));
        assert!(messages[1].contains("device definition"));

        let report = validate_structure("<Wrong/>");
        assert!(report.errors[0].message.contains("found Wrong"));
    }

    #[test]
    fn layout_problems_do_not_invalidate() {
        let report = validate_structure(
            "<MIDINameDocument><Author/><MasterDeviceNames><ChannelNameSet Name=\"A\"><PatchBank Name=\"P\"/><AvailableForChannels/></ChannelNameSet></MasterDeviceNames></MIDINameDocument>",
        );
        assert!(report.valid);
        assert_eq!(
            report.layout_fixes,
            vec![Fix::ReorderedChannelNameSet {
                channel_name_set: "A".into()
            }]
        );
    }

    #[test]
    fn line_column_counts_from_one() {
        assert_eq!(line_column("abc", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("ab", 99), (1, 3));
    }

    #[test]
    fn bytes_follow_declared_encoding() {
        let report = validate_bytes(
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<MIDINameDocument><Author>Jos\xe9</Author><MasterDeviceNames/></MIDINameDocument>",
        );
        assert!(report.valid, "{report:?}");

        let report = validate_bytes(b"<MIDINameDocument>\n<Author>\xff</Author></MIDINameDocument>");
        assert!(!report.valid);
        assert_eq!(report.errors[0].kind, IssueKind::Syntax);
        assert_eq!(report.errors[0].line, Some(2));
    }
}
