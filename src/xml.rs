//! Lossless XML tree used to edit WordprocessingML parts.
//!
//! Text and attribute values are stored in their escaped source form, so a
//! part that is parsed and serialized without edits comes back byte-for-byte
//! equivalent apart from quoting style and empty-element spelling.

use std::borrow::Cow;

use quick_xml::{
    Reader,
    escape::{escape, unescape},
    events::{BytesStart, Event},
};

use crate::error::{DocError, DocResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    /// Attribute names with their escaped values, in source order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((name.to_string(), escape(value).into_owned()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Unescaped value of the attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| unescape(value).unwrap_or(Cow::Borrowed(value.as_str())))
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |element| element.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> {
        self.elements_mut().filter(move |element| element.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|element| element.name == name)
    }

    /// Concatenated unescaped text of all direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => {
                    out.push_str(&unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str())))
                }
                Node::CData(raw) => out.push_str(raw),
                _ => {}
            }
        }
        out
    }

    pub fn set_text(&mut self, text: &str) {
        self.children = vec![Node::Text(escape(text).into_owned())];
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl Node {
    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_to(out),
            Node::Text(raw) => out.push_str(raw),
            Node::CData(raw) => {
                out.push_str("<![CDATA[");
                out.push_str(raw);
                out.push_str("]]>");
            }
            Node::Comment(raw) => {
                out.push_str("<!--");
                out.push_str(raw);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(raw) => {
                out.push_str("<?");
                out.push_str(raw);
                out.push_str("?>");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// Raw content of the `<?xml ...?>` declaration, if present.
    pub declaration: Option<String>,
    pub root: Element,
}

impl XmlDocument {
    pub fn parse(bytes: &[u8]) -> DocResult<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(false);
        reader.expand_empty_elements(false);

        let mut declaration = None;
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Decl(decl) => declaration = Some(utf8(&decl)?),
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        DocError::InvalidTemplate("unbalanced closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(utf8(&text)?));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::CData(utf8(&data)?));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Comment(utf8(&comment)?));
                    }
                }
                Event::PI(pi) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(Node::ProcessingInstruction(utf8(&pi)?));
                    }
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(DocError::InvalidTemplate(format!(
                "unclosed element <{}>",
                stack[stack.len() - 1].name
            )));
        }
        let root =
            root.ok_or_else(|| DocError::InvalidTemplate("XML part has no root".to_string()))?;
        Ok(Self { declaration, root })
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if let Some(declaration) = &self.declaration {
            out.push_str("<?");
            out.push_str(declaration);
            out.push_str("?>\r\n");
        }
        self.root.write_to(&mut out);
        out
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, node: Node) -> DocResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        Node::Element(element) if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        Node::Element(element) => Err(DocError::InvalidTemplate(format!(
            "second root element <{}>",
            element.name
        ))),
        _ => Ok(()),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> DocResult<Element> {
    let mut element = Element::new(utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        element.attributes.push((
            utf8(attribute.key.as_ref())?,
            utf8(attribute.value.as_ref())?,
        ));
    }
    Ok(element)
}

fn utf8(bytes: &[u8]) -> DocResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|err| DocError::InvalidTemplate(format!("XML is not valid UTF-8: {err}")))
}
