//! Parse MIDI Name Documents into an owned element tree and render them back
//! using quick-xml.

mod tree;

use std::borrow::Cow;

use quick_xml::encoding::{decode, detect_encoding};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;
use tracing::trace;

pub use tree::{Descendants, Element, XmlNode};

/// XML declaration written at the top of every rendered document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed; `offset` is the byte position reported
    /// by the reader.
    #[error("xml syntax at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("invalid document: {0}")]
    Invalid(String),
    #[error("xml: {0}")]
    Xml(String),
}

impl XmlError {
    fn syntax<S: Into<String>>(offset: usize, message: S) -> Self {
        XmlError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// Parsed document: the root element plus the out-of-band DOCTYPE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
    /// Full `<!DOCTYPE ...>` line as found in the source, if any.
    pub doctype: Option<String>,
}

impl Document {
    /// Wrap a root element without a DOCTYPE.
    pub fn new(root: Element) -> Self {
        Self {
            root,
            doctype: None,
        }
    }

    /// Parse a complete document.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        parse_document(xml)
    }

    /// Parse raw file content, honouring a byte order mark or the encoding
    /// named in the XML declaration.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XmlError> {
        parse_document(&decode_text(bytes)?)
    }

    /// Render with the XML declaration and the captured DOCTYPE, falling back
    /// to `fallback_doctype` when none was captured.
    pub fn render(&self, fallback_doctype: &str, indent: Indent) -> Result<String, XmlError> {
        let doctype = self.doctype.as_deref().unwrap_or(fallback_doctype);
        render_document(&self.root, doctype, indent)
    }
}

/// Indentation used by the pretty printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent {
    pub char: u8,
    pub size: usize,
}

impl Indent {
    pub const TAB: Indent = Indent {
        char: b'\t',
        size: 1,
    };

    pub fn spaces(size: usize) -> Self {
        Indent { char: b' ', size }
    }
}

impl Default for Indent {
    fn default() -> Self {
        Indent::TAB
    }
}

/// Decode raw document bytes to text.
///
/// A byte order mark wins; otherwise an ASCII-compatible encoding named in
/// the declaration (such as `ISO-8859-1`) is used, and anything else is read
/// as UTF-8.
pub fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, XmlError> {
    if let Some((encoding, bom @ 1..)) = detect_encoding(bytes) {
        return decode(&bytes[bom..], encoding)
            .map_err(|_| XmlError::Invalid(format!("content is not valid {}", encoding.name())));
    }

    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let declared = match reader.read_event_into(&mut buf) {
        Ok(Event::Decl(decl)) => decl.encoder(),
        _ => None,
    };
    match declared {
        Some(encoding) if encoding.is_ascii_compatible() && encoding.name() != "UTF-8" => {
            trace!(encoding = encoding.name(), "decoding declared encoding");
            decode(bytes, encoding)
                .map_err(|_| XmlError::Invalid(format!("content is not valid {}", encoding.name())))
        }
        _ => std::str::from_utf8(bytes).map(Cow::Borrowed).map_err(|err| {
            XmlError::syntax(err.valid_up_to(), format!("invalid UTF-8: {err}"))
        }),
    }
}

/// Parse an XML document into an element tree.
///
/// Whitespace-only text is dropped and remaining text is trimmed. Comments
/// inside the root element are kept; the XML declaration, processing
/// instructions, and comments outside the root are discarded. The DOCTYPE
/// declaration is captured separately.
pub fn parse_document(xml: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut doctype: Option<String> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| XmlError::syntax(reader.buffer_position(), err.to_string()))?;
        match event {
            Event::Start(e) => {
                let element = start_element(&e, &reader, reader.buffer_position())?;
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::syntax(
                        reader.buffer_position(),
                        format!("second root element <{}>", element.name()),
                    ));
                }
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = start_element(&e, &reader, reader.buffer_position())?;
                attach(&mut stack, &mut root, element, reader.buffer_position())?;
            }
            Event::End(e) => {
                let Some(element) = stack.pop() else {
                    return Err(XmlError::syntax(
                        reader.buffer_position(),
                        format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    ));
                };
                attach(&mut stack, &mut root, element, reader.buffer_position())?;
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| XmlError::syntax(reader.buffer_position(), err.to_string()))?;
                push_text(&mut stack, text, reader.buffer_position())?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut stack, Cow::Owned(text), reader.buffer_position())?;
            }
            Event::Comment(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push(XmlNode::Comment(String::from_utf8_lossy(&e).into_owned()));
                }
            }
            Event::DocType(e) => {
                let content = String::from_utf8_lossy(&e);
                doctype = Some(format!("<!DOCTYPE {}>", content.trim()));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::syntax(
            xml.len(),
            format!("unexpected end of document inside <{}>", open.name()),
        ));
    }
    let root = root.ok_or_else(|| XmlError::Invalid("document has no root element".into()))?;
    trace!(root = root.name(), has_doctype = doctype.is_some(), "parsed document");
    Ok(Document { root, doctype })
}

fn start_element<B>(event: &BytesStart<'_>, reader: &Reader<B>, offset: usize) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(event.name().as_ref()).into_owned());
    for attr in event.attributes() {
        let attr = attr.map_err(|err| XmlError::syntax(offset, err.to_string()))?;
        let value = attr
            .decode_and_unescape_value(reader)
            .map_err(|err| XmlError::syntax(offset, err.to_string()))?;
        element.set_attr(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        );
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    offset: usize,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(XmlError::syntax(
                offset,
                format!("second root element <{}>", element.name()),
            ))
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: Cow<'_, str>, offset: usize) -> Result<(), XmlError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.push(XmlNode::Text(trimmed.to_string()));
            Ok(())
        }
        None => Err(XmlError::syntax(offset, "text outside the root element")),
    }
}

/// Pretty-print `root` without any prolog. Lines containing only whitespace
/// are removed.
pub fn render_element(root: &Element, indent: Indent) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), indent.char, indent.size);
    write_element(&mut writer, root)?;
    let raw = String::from_utf8(writer.into_inner())
        .map_err(|err| XmlError::Xml(format!("invalid UTF-8: {err}")))?;
    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Render the XML declaration, `doctype`, and the pretty-printed tree, one
/// per line, with a trailing newline.
pub fn render_document(root: &Element, doctype: &str, indent: Indent) -> Result<String, XmlError> {
    let body = render_element(root, indent)?;
    let mut out = String::with_capacity(XML_DECLARATION.len() + doctype.len() + body.len() + 3);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    let doctype = doctype.trim();
    if !doctype.is_empty() {
        out.push_str(doctype);
        out.push('\n');
    }
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name());
    for (key, value) in element.attributes() {
        start.push_attribute((key, value));
    }
    if element.is_empty() {
        return write_event(writer, Event::Empty(start));
    }
    write_event(writer, Event::Start(start))?;
    for node in element.children() {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            XmlNode::Comment(comment) => write_event(
                writer,
                Event::Comment(BytesText::from_escaped(comment.as_str())),
            )?,
        }
    }
    write_event(writer, Event::End(BytesEnd::new(element.name())))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|err| XmlError::Xml(err.to_string()))
}
