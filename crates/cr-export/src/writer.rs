use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use cr_session::Session;
use cr_types::Value;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ExportResult;

/// Thin wrapper over the quick-xml writer with the handful of events the
/// exporters emit.
pub(crate) struct XmlOut<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlOut<W> {
    pub fn new(out: W, indent: usize) -> Self {
        let writer = if indent == 0 {
            Writer::new(out)
        } else {
            Writer::new_with_indent(out, b' ', indent)
        };
        Self { writer }
    }

    pub fn declaration(&mut self) -> ExportResult<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    pub fn start(&mut self, element: BytesStart<'_>) -> ExportResult<()> {
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    pub fn empty(&mut self, element: BytesStart<'_>) -> ExportResult<()> {
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> ExportResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Escaped character data.
    pub fn text(&mut self, text: &str) -> ExportResult<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// `<name>text</name>`, kept on one line even when indenting.
    pub fn text_element(&mut self, name: &str, text: &str) -> ExportResult<()> {
        self.start(BytesStart::new(name))?;
        self.text(text)?;
        self.end(name)
    }
}

/// String form of a value; BINARY is base64, or empty when skipped.
pub(crate) fn value_text(value: &Value, skip_binary: bool) -> ExportResult<String> {
    match value {
        Value::Binary(_) if skip_binary => Ok(String::new()),
        Value::Binary(bytes) => Ok(BASE64_ENGINE.encode(bytes)),
        other => Ok(other.get_string()?),
    }
}

/// `xmlns:<prefix>` attributes for every non-empty prefix in effect for
/// the session.
pub(crate) fn namespace_attributes(session: &Session) -> ExportResult<Vec<(String, String)>> {
    session
        .namespace_prefixes()
        .into_iter()
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| {
            let uri = session.namespace_uri(&prefix)?;
            Ok((format!("xmlns:{prefix}"), uri))
        })
        .collect()
}
