//! XML renderer over core output trees.

use std::fs;

use dataexport_core::{
    EnumNodeContent, ExportError, Result, SpecOutputNode, SpecTreeOptions, ToExportValue,
    build_tree,
};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use regex::Regex;
use tracing::info;

use crate::spec::{C_XML_ENCODING_UTF8, C_XML_VERSION, SpecXmlOptions};
use crate::util::{derive_name_invalid_regex, sanitize_element_name, split_cdata};

/// Attribute carrying the node's type label.
pub const C_ATTR_TYPE: &str = "Type";
/// Attribute carrying the `Property`/`Field` role.
pub const C_ATTR_MEMBER_TYPE: &str = "MemberType";
/// Attribute marking a cycle-truncated node.
pub const C_ATTR_RECURSIVE: &str = "Recursive";

/// Renders a [`SpecOutputNode`] tree as an XML document.
pub struct XmlWriter {
    options: SpecXmlOptions,
    re_name_invalid: Regex,
}

impl XmlWriter {
    pub fn new(options: SpecXmlOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            re_name_invalid: derive_name_invalid_regex()?,
        })
    }

    pub fn options(&self) -> &SpecXmlOptions {
        &self.options
    }

    /// Render `root` to a UTF-8 document string.
    pub fn render(&self, root: &SpecOutputNode) -> Result<String> {
        let mut writer = if self.options.if_indent {
            Writer::new_with_indent(Vec::new(), b' ', self.options.n_indent)
        } else {
            Writer::new(Vec::new())
        };

        writer
            .write_event(Event::Decl(BytesDecl::new(
                C_XML_VERSION,
                Some(C_XML_ENCODING_UTF8),
                None,
            )))
            .map_err(derive_render_error)?;
        self.write_node(&mut writer, root)?;

        String::from_utf8(writer.into_inner()).map_err(derive_render_error)
    }

    /// Render `root` and persist it when a path is configured.
    pub fn write(&self, root: &SpecOutputNode) -> Result<String> {
        let c_doc = self.render(root)?;
        if let Some(path) = &self.options.path {
            fs::write(path, &c_doc)
                .map_err(|e| ExportError::external(path.display().to_string(), e))?;
            info!(
                path = %path.display(),
                n_nodes = root.n_nodes(),
                "wrote xml file"
            );
        }
        Ok(c_doc)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, node: &SpecOutputNode) -> Result<()> {
        let c_name = sanitize_element_name(&self.re_name_invalid, &node.name);
        let mut start = BytesStart::new(c_name.as_str());
        if let Some(role) = node.role {
            start.push_attribute((C_ATTR_MEMBER_TYPE, role.as_str()));
        }
        if !node.type_label.is_empty() {
            start.push_attribute((C_ATTR_TYPE, node.type_label.as_str()));
        }

        match &node.content {
            EnumNodeContent::Empty => {
                writer
                    .write_event(Event::Empty(start))
                    .map_err(derive_render_error)?;
            }
            EnumNodeContent::Recursive { fingerprint } => {
                let c_fingerprint = fingerprint.to_string();
                start.push_attribute((C_ATTR_RECURSIVE, c_fingerprint.as_str()));
                writer
                    .write_event(Event::Empty(start))
                    .map_err(derive_render_error)?;
            }
            EnumNodeContent::Scalar { text, if_verbatim } => {
                writer
                    .write_event(Event::Start(start))
                    .map_err(derive_render_error)?;
                if *if_verbatim {
                    for c_chunk in split_cdata(text) {
                        writer
                            .write_event(Event::CData(BytesCData::new(c_chunk.as_str())))
                            .map_err(derive_render_error)?;
                    }
                } else {
                    writer
                        .write_event(Event::Text(BytesText::new(text)))
                        .map_err(derive_render_error)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(c_name.as_str())))
                    .map_err(derive_render_error)?;
            }
            EnumNodeContent::Children(l_children) if l_children.is_empty() => {
                writer
                    .write_event(Event::Empty(start))
                    .map_err(derive_render_error)?;
            }
            EnumNodeContent::Children(l_children) => {
                writer
                    .write_event(Event::Start(start))
                    .map_err(derive_render_error)?;
                for child in l_children {
                    self.write_node(writer, child)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(c_name.as_str())))
                    .map_err(derive_render_error)?;
            }
        }
        Ok(())
    }
}

fn derive_render_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::external("xml document", e)
}

/// Build the tree of `value` and render it as XML.
pub fn to_xml<V: ToExportValue + ?Sized>(
    value: &V,
    tree_options: &SpecTreeOptions,
    xml_options: &SpecXmlOptions,
) -> Result<String> {
    let writer = XmlWriter::new(xml_options.clone())?;
    let root = build_tree(value, tree_options)?;
    writer.write(&root)
}
