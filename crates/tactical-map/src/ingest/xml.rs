//! Generic XML element tree
//!
//! A minimal DOM built with `quick-xml`: element name, attributes, merged
//! text content, ordered children. Coordinate blocks stay verbatim text so
//! the pipeline's geometry normalizer owns tuple parsing. Namespace prefixes
//! are stripped; tactical overlay documents use a single default namespace.

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of a direct child, `None` when absent or empty
    pub fn child_text(&self, name: &str) -> Option<&str> {
        let text = self.child(name)?.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// First descendant with the given local name, depth-first
    pub fn find_first(&self, name: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_first(name) {
                return Some(found);
            }
        }
        None
    }

    /// Visit every descendant, depth-first pre-order
    pub fn for_each_descendant<'a>(&'a self, f: &mut impl FnMut(&'a XmlNode)) {
        for child in &self.children {
            f(child);
            child.for_each_descendant(f);
        }
    }
}

/// Parse a document into its root element
pub fn parse(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Synthetic root collects the document element
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("XML error at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(start) => {
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                let node = element_from(&start)?;
                attach(&mut stack, node);
            }
            Event::End(_) => {
                let node = stack.pop().expect("parser stack underflow");
                attach(&mut stack, node);
            }
            Event::Text(text) => {
                let text = text.unescape().context("bad text escape")?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::Eof => break,
            // Comments, processing instructions, doctypes
            _ => {}
        }
    }

    if stack.len() != 1 {
        bail!("unclosed element at end of document");
    }
    stack
        .pop()
        .and_then(|root| root.children.into_iter().next())
        .context("document has no root element")
}

fn element_from(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode> {
    let name = local_name(start.name().as_ref());
    let mut attrs = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.context("bad attribute")?;
        let key = local_name(attr.key.as_ref());
        let value = attr.unescape_value().context("bad attribute escape")?;
        attrs.insert(key, value.into_owned());
    }
    Ok(XmlNode {
        name,
        attrs,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlNode], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Strip any namespace prefix from a qualified name
fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    match name.rfind(':') {
        Some(pos) => name[pos + 1..].to_string(),
        None => name.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let root = parse(
            r#"<kml xmlns="http://www.opengis.net/kml/2.2">
                 <Document>
                   <name>doc</name>
                   <Folder><name>Frontline</name></Folder>
                 </Document>
               </kml>"#,
        )
        .unwrap();
        assert_eq!(root.name, "kml");
        let document = root.child("Document").unwrap();
        assert_eq!(document.child_text("name"), Some("doc"));
        assert_eq!(
            document.child("Folder").unwrap().child_text("name"),
            Some("Frontline")
        );
    }

    #[test]
    fn test_namespace_prefix_stripped() {
        let root = parse(r#"<kml:kml xmlns:kml="urn:x"><kml:Document/></kml:kml>"#).unwrap();
        assert_eq!(root.name, "kml");
        assert!(root.child("Document").is_some());
    }

    #[test]
    fn test_attributes_and_text() {
        let root = parse(r#"<Style id="front"><width> 2.5 </width></Style>"#).unwrap();
        assert_eq!(root.attrs.get("id").map(String::as_str), Some("front"));
        assert_eq!(root.child_text("width"), Some("2.5"));
    }

    #[test]
    fn test_coordinates_text_kept_verbatim() {
        let root = parse("<coordinates>36.0,48.5,0 37.0,49.0,0</coordinates>").unwrap();
        assert_eq!(root.text.trim(), "36.0,48.5,0 37.0,49.0,0");
    }

    #[test]
    fn test_find_first_depth_first() {
        let root = parse(
            "<a><b><coordinates>inner</coordinates></b><coordinates>outer</coordinates></a>",
        )
        .unwrap();
        assert_eq!(root.find_first("coordinates").unwrap().text, "inner");
    }

    #[test]
    fn test_truncated_document_is_an_error() {
        assert!(parse("<a><b></a>").is_err());
    }
}
