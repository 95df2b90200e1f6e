//! System view: every node is an `sv:node`, every property an
//! `sv:property` with its type, so the export loses nothing.

use std::io::Write;

use cr_namespace::NS_SV;
use cr_session::{Session, JCR_MIXIN_TYPES, JCR_PRIMARY_TYPE, JCR_UUID};
use cr_types::{NodeId, PropertyType};
use quick_xml::events::BytesStart;
use tracing::debug;

use crate::error::ExportResult;
use crate::options::ExportOptions;
use crate::snapshot::NodeSnapshot;
use crate::writer::{namespace_attributes, value_text, XmlOut};

const SV_NODE: &str = "sv:node";
const SV_PROPERTY: &str = "sv:property";
const SV_VALUE: &str = "sv:value";

/// Serialize the node at `abs_path` (and its subtree unless
/// `options.no_recurse`) in system view form.
///
/// Pending changes of the session are part of the output.
pub fn export_system_view<W: Write>(
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
    debug!(path = abs_path, nodes = count, "exported system view");
    Ok(())
}

/// Returns the number of nodes written.
fn write_node<W: Write>(
    session: &mut Session,
    xml: &mut XmlOut<W>,
    id: &NodeId,
    options: &ExportOptions,
    namespaces: Option<&[(String, String)]>,
) -> ExportResult<usize> {
    let node = NodeSnapshot::take(session, id)?;

    let mut element = BytesStart::new(SV_NODE);
    if let Some(namespaces) = namespaces {
        element.push_attribute(("xmlns:sv", NS_SV));
        for (name, uri) in namespaces {
            element.push_attribute((name.as_str(), uri.as_str()));
        }
    }
    element.push_attribute(("sv:name", node.export_name()));
    xml.start(element)?;

    write_property(
        xml,
        JCR_PRIMARY_TYPE,
        PropertyType::Name,
        false,
        &[node.primary_node_type.clone()],
    )?;
    let mixins = match node.property(JCR_MIXIN_TYPES) {
        Some(p) => p
            .values
            .iter()
            .map(|v| value_text(v, options.skip_binary))
            .collect::<ExportResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    write_property(xml, JCR_MIXIN_TYPES, PropertyType::Name, true, &mixins)?;
    write_property(
        xml,
        JCR_UUID,
        PropertyType::String,
        false,
        &[node.identifier.to_string()],
    )?;

    for property in node.regular_properties() {
        let texts = property
            .values
            .iter()
            .map(|v| value_text(v, options.skip_binary))
            .collect::<ExportResult<Vec<_>>>()?;
        write_property(
            xml,
            &property.name,
            property.property_type,
            property.multiple,
            &texts,
        )?;
    }

    let mut count = 1;
    if !options.no_recurse {
        for child in &node.children {
            count += write_node(session, xml, child, options, None)?;
        }
    }
    xml.end(SV_NODE)?;
    Ok(count)
}

fn write_property<W: Write>(
    xml: &mut XmlOut<W>,
    name: &str,
    property_type: PropertyType,
    multiple: bool,
    texts: &[String],
) -> ExportResult<()> {
    let mut element = BytesStart::new(SV_PROPERTY);
    element.push_attribute(("sv:name", name));
    element.push_attribute(("sv:type", property_type.name()));
    if multiple {
        element.push_attribute(("sv:multiple", "true"));
    }
    if texts.is_empty() {
        return xml.empty(element);
    }
    xml.start(element)?;
    for text in texts {
        xml.text_element(SV_VALUE, text)?;
    }
    xml.end(SV_PROPERTY)
}
