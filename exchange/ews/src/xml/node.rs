/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{io::Write, str::FromStr};

use ::xml::{
    reader::{EventReader, ParserConfig, XmlEvent as ReaderEvent},
    writer::{EventWriter, XmlEvent},
};

use super::WriteResult;
use crate::Error;

/// An attribute of a parsed [`XmlNode`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlNodeAttribute {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// An owned XML element tree.
///
/// Response documents are parsed into this representation before being
/// mapped onto typed values, which lets property bags pick the elements they
/// know about and skip the rest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub prefix: Option<String>,
    pub namespace: Option<String>,

    /// The local name of the element.
    pub name: String,
    pub attributes: Vec<XmlNodeAttribute>,
    pub children: Vec<XmlNode>,

    /// Concatenated text content, excluding that of child elements.
    pub text: String,
}

impl XmlNode {
    /// Parses a document and returns its root element.
    pub fn parse(document: &[u8]) -> Result<Self, Error> {
        let config = ParserConfig::new()
            .cdata_to_characters(true)
            .ignore_comments(true);
        let reader = EventReader::new_with_config(document, config);

        let mut stack: Vec<XmlNode> = Vec::new();
        for event in reader {
            match event? {
                ReaderEvent::StartElement {
                    name, attributes, ..
                } => stack.push(XmlNode {
                    prefix: name.prefix,
                    namespace: name.namespace,
                    name: name.local_name,
                    attributes: attributes
                        .into_iter()
                        .map(|attribute| XmlNodeAttribute {
                            prefix: attribute.name.prefix,
                            namespace: attribute.name.namespace,
                            name: attribute.name.local_name,
                            value: attribute.value,
                        })
                        .collect(),
                    children: Vec::new(),
                    text: String::new(),
                }),

                ReaderEvent::EndElement { .. } => {
                    let node = stack.pop().ok_or_else(|| {
                        Error::UnexpectedXml("unbalanced end of element".to_string())
                    })?;

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }

                ReaderEvent::Characters(text) | ReaderEvent::CData(text) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }

                _ => {}
            }
        }

        Err(Error::UnexpectedXml(
            "document contains no root element".to_string(),
        ))
    }

    /// Creates an element without namespace information, mostly useful for
    /// tests and for building replayable fragments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Gets the first child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Iterates over child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn required_child(&self, name: &str) -> Result<&XmlNode, Error> {
        self.child(name).ok_or_else(|| {
            Error::UnexpectedXml(format!(
                "element `{}` is missing child element `{name}`",
                self.name
            ))
        })
    }

    /// Gets the text of the first child element with the given local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text.as_str())
    }

    /// Searches the tree depth-first for an element with the given local name,
    /// starting with this element.
    pub fn find_descendant(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }

        self.children
            .iter()
            .find_map(|child| child.find_descendant(name))
    }

    /// Gets the value of an attribute by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    pub fn required_attribute(&self, name: &str) -> Result<&str, Error> {
        self.attribute(name).ok_or_else(|| {
            Error::UnexpectedXml(format!(
                "element `{}` is missing attribute `{name}`",
                self.name
            ))
        })
    }

    /// Parses the trimmed text content of the element.
    pub fn parse_text<T: FromStr>(&self) -> Result<T, Error> {
        self.text.trim().parse().map_err(|_| {
            Error::UnexpectedXml(format!(
                "invalid value `{}` in element `{}`",
                self.text, self.name
            ))
        })
    }

    /// Parses a `true`/`false` (or `1`/`0`) text content.
    pub fn parse_bool(&self) -> Result<bool, Error> {
        match self.text.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(Error::UnexpectedXml(format!(
                "invalid boolean `{other}` in element `{}`",
                self.name
            ))),
        }
    }

    /// Writes the element and its subtree, declaring the namespaces it was
    /// parsed with.
    ///
    /// Mixed content is not preserved: the text of an element is written
    /// before its children.
    pub fn write_to<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let element_name = qualified_name(self.prefix.as_deref(), &self.name);
        let attribute_names: Vec<String> = self
            .attributes
            .iter()
            .map(|attribute| qualified_name(attribute.prefix.as_deref(), &attribute.name))
            .collect();

        let mut builder = XmlEvent::start_element(element_name.as_str());
        if let Some(namespace) = &self.namespace {
            builder = match &self.prefix {
                Some(prefix) => builder.ns(prefix.as_str(), namespace.as_str()),
                None => builder.default_ns(namespace.as_str()),
            };
        }

        for attribute in &self.attributes {
            if let (Some(prefix), Some(namespace)) = (&attribute.prefix, &attribute.namespace) {
                if prefix != "xml" && prefix != "xmlns" {
                    builder = builder.ns(prefix.as_str(), namespace.as_str());
                }
            }
        }

        for (name, attribute) in attribute_names.iter().zip(&self.attributes) {
            builder = builder.attr(name.as_str(), attribute.value.as_str());
        }

        writer.write(builder)?;

        if !self.text.is_empty() {
            writer.write(XmlEvent::characters(&self.text))?;
        }

        for child in &self.children {
            child.write_to(writer)?;
        }

        writer.write(XmlEvent::end_element())
    }
}

fn qualified_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}
