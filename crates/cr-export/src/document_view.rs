//! Document view: nodes become elements named after them and
//! single-valued properties become attributes.
//!
//! Element and attribute names are ISO 9075 encoded, so `news item`
//! becomes `news_x0020_item`. Multi-valued properties have no attribute
//! form and are left out. A `jcr:xmltext` node whose only property is
//! `jcr:xmlcharacters` is written as plain character data.

use std::io::Write;

use cr_session::Session;
use cr_types::NodeId;
use quick_xml::events::BytesStart;
use tracing::debug;

use crate::error::ExportResult;
use crate::names::encode_name;
use crate::options::ExportOptions;
use crate::snapshot::NodeSnapshot;
use crate::writer::{namespace_attributes, value_text, XmlOut};

const XML_TEXT: &str = "jcr:xmltext";
const XML_CHARACTERS: &str = "jcr:xmlcharacters";

/// Serialize the node at `abs_path` (and its subtree unless
/// `options.no_recurse`) in document view form.
pub fn export_document_view<W: Write>(
    session: &mut Session,
    abs_path: &str,
    out: W,
    options: &ExportOptions,
) -> ExportResult<()> {
    let start = session.node(abs_path)?.identifier();
    let namespaces = namespace_attributes(session)?;
    let mut xml = XmlOut::new(out, options.indent);
    xml.declaration()?;
    let count = write_node(session, &mut xml, &start, options, Some(namespaces.as_slice()))?;
    debug!(path = abs_path, nodes = count, "exported document view");
    Ok(())
}

fn write_node<W: Write>(
    session: &mut Session,
    xml: &mut XmlOut<W>,
    id: &NodeId,
    options: &ExportOptions,
    namespaces: Option<&[(String, String)]>,
) -> ExportResult<usize> {
    let node = NodeSnapshot::take(session, id)?;
    if let Some(text) = xml_text(&node)? {
        xml.text(&text)?;
        return Ok(1);
    }

    let element_name = encode_name(node.export_name());
    let mut element = BytesStart::new(element_name.as_str());
    for (name, uri) in namespaces.unwrap_or_default() {
        element.push_attribute((name.as_str(), uri.as_str()));
    }
    for property in node.properties.iter().filter(|p| !p.multiple) {
        if let Some(value) = property.values.first() {
            let text = value_text(value, options.skip_binary)?;
            let attribute = encode_name(&property.name);
            element.push_attribute((attribute.as_str(), text.as_str()));
        }
    }

    if options.no_recurse || node.children.is_empty() {
        xml.empty(element)?;
        return Ok(1);
    }

    xml.start(element)?;
    let mut count = 1;
    for child in &node.children {
        count += write_node(session, xml, child, options, None)?;
    }
    xml.end(&element_name)?;
    Ok(count)
}

/// Character data for a `jcr:xmltext` node, if it is one.
fn xml_text(node: &NodeSnapshot) -> ExportResult<Option<String>> {
    if node.name != XML_TEXT || !node.children.is_empty() || node.regular_properties().count() != 1
    {
        return Ok(None);
    }
    match node.property(XML_CHARACTERS) {
        Some(p) if !p.multiple => match p.values.first() {
            Some(value) => Ok(Some(value.get_string()?)),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}
