//! Minimal mutable element tree backing the XML archive.
//!
//! Documents are parsed with `roxmltree` and rendered with `quick-xml`. Only
//! elements, attributes and the first text node of each element are kept.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use seisgraph_core::{ArchiveError, ArchiveResult};

pub(crate) type NodeId = usize;

#[derive(Clone, Debug, Default)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Arena of nodes. Node 0 is the document itself; its children are the
/// top-level elements.
#[derive(Clone, Debug)]
pub(crate) struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    pub fn parse(text: &str) -> ArchiveResult<Self> {
        let parsed =
            roxmltree::Document::parse(text).map_err(|e| ArchiveError::Xml(e.to_string()))?;
        let mut document = Self::new();
        document.import(parsed.root_element(), Self::ROOT);
        Ok(document)
    }

    fn import(&mut self, element: roxmltree::Node<'_, '_>, parent: NodeId) {
        let id = self.add_element(parent, element.tag_name().name());
        self.nodes[id].attributes = element
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
        let has_elements = element.children().any(|c| c.is_element());
        self.nodes[id].text = element
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .find(|t| !has_elements || !t.trim().is_empty())
            .map(str::to_string);
        for child in element.children().filter(|c| c.is_element()) {
            self.import(child, id);
        }
    }

    /// First top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[Self::ROOT].children.first().copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Siblings following `id` in document order.
    pub fn following_siblings(&self, id: NodeId) -> &[NodeId] {
        let Some(parent) = self.nodes[id].parent else {
            return &[];
        };
        let siblings = &self.nodes[parent].children;
        match siblings.iter().position(|&s| s == id) {
            Some(index) => &siblings[index + 1..],
            None => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id]
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].text.as_deref()
    }

    pub fn add_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            ..Default::default()
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attributes = &mut self.nodes[id].attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id].text = Some(text.to_string());
    }

    pub fn rename(&mut self, id: NodeId, name: &str) {
        self.nodes[id].name = name.to_string();
    }

    /// Slash-separated element path, for diagnostics.
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor.filter(|&n| n != Self::ROOT) {
            names.push(self.nodes[node].name.as_str());
            cursor = self.nodes[node].parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    pub fn render(&self, formatted: bool) -> ArchiveResult<Vec<u8>> {
        let mut writer = if formatted {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        for &child in self.children(Self::ROOT) {
            self.write_node(&mut writer, child)?;
        }
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> ArchiveResult<()> {
        let node = &self.nodes[id];
        let mut start = BytesStart::new(node.name.as_str());
        for (key, value) in &node.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if node.children.is_empty() && node.text.is_none() {
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            return Ok(());
        }
        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        if let Some(text) = &node.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?;
        }
        for &child in &node.children {
            self.write_node(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(node.name.as_str())))
            .map_err(xml_error)?;
        Ok(())
    }
}

fn xml_error(e: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Xml(e.to_string())
}
