/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{borrow::Cow, io::Write};

use ::xml::writer::{EmitterConfig, EventWriter, XmlEvent};
use time::{macros::format_description, Date};

pub use ews_derive::{XmlAttribute, XmlElement};

mod node;
pub use node::{XmlNode, XmlNodeAttribute};

use crate::Error;

pub const MESSAGES_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const SOAP_NS_URI: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const TYPES_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
pub const ERRORS_NS_URI: &str = "http://schemas.microsoft.com/exchange/services/2006/errors";

/// A namespace declaration: an optional prefix (`None` for the default
/// namespace) and the namespace URI.
pub type Namespace = (Option<&'static str>, &'static str);

pub type WriteResult = Result<(), ::xml::writer::Error>;

/// A value which can be written as the value of an XML attribute.
pub trait XmlAttribute {
    /// Gets the attribute value, or `None` if the attribute should be
    /// omitted.
    fn to_attribute_value(&self) -> Option<Cow<'_, str>>;
}

/// A value which can be written as an XML element.
pub trait XmlElement {
    /// Namespaces to declare on the element.
    fn namespaces(&self) -> &'static [Namespace] {
        &[]
    }

    /// Attributes to set on the element.
    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        Vec::new()
    }

    /// Writes the content of the element (text and child elements).
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult;

    /// Writes the value as a complete element with the given name.
    fn write_as_element<W: Write>(&self, writer: &mut EventWriter<W>, name: &str) -> WriteResult {
        let attributes = self.attributes();

        write_element(writer, name, self.namespaces(), &attributes, |writer| {
            self.write_children(writer)
        })
    }
}

/// Compile-time check that a field marked `is_attribute` can be written as an
/// attribute.
pub fn verify_attribute_field<T: XmlAttribute + ?Sized>(_: &T) {}

/// Compile-time check that a field can be written as an element.
pub fn verify_element_field<T: XmlElement + ?Sized>(_: &T) {}

/// Writes an element, its namespace declarations and attributes, then calls
/// `write_children` to write its content.
pub fn write_element<W, F>(
    writer: &mut EventWriter<W>,
    name: &str,
    namespaces: &[Namespace],
    attributes: &[(&str, Cow<'_, str>)],
    write_children: F,
) -> WriteResult
where
    W: Write,
    F: FnOnce(&mut EventWriter<W>) -> WriteResult,
{
    let mut builder = XmlEvent::start_element(name);
    for (prefix, uri) in namespaces {
        builder = match prefix {
            Some(prefix) => builder.ns(*prefix, *uri),
            None => builder.default_ns(*uri),
        };
    }
    for (name, value) in attributes {
        builder = builder.attr(*name, value.as_ref());
    }

    writer.write(builder)?;
    write_children(writer)?;
    writer.write(XmlEvent::end_element())
}

/// Writes an element without attributes containing only text.
pub fn write_text_element<W: Write>(
    writer: &mut EventWriter<W>,
    name: &str,
    text: &str,
) -> WriteResult {
    writer.write(XmlEvent::start_element(name))?;
    writer.write(XmlEvent::characters(text))?;
    writer.write(XmlEvent::end_element())
}

/// Creates a writer suitable for building a complete document.
pub(crate) fn document_writer<W: Write>(sink: W) -> EventWriter<W> {
    EmitterConfig::new()
        .write_document_declaration(true)
        .create_writer(sink)
}

/// Serializes a value as a standalone element, mostly useful for logging and
/// debugging.
pub fn to_xml_string<T: XmlElement + ?Sized>(value: &T, name: &str) -> Result<String, Error> {
    let mut buf = Vec::new();
    let mut writer = EmitterConfig::new()
        .write_document_declaration(false)
        .create_writer(&mut buf);
    value.write_as_element(&mut writer, name)?;

    String::from_utf8(buf).map_err(|err| Error::UnexpectedXml(err.to_string()))
}

impl XmlElement for str {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        writer.write(XmlEvent::characters(self))
    }
}

impl XmlElement for String {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        writer.write(XmlEvent::characters(self.as_str()))
    }
}

impl XmlElement for bool {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        writer.write(XmlEvent::characters(if *self { "true" } else { "false" }))
    }
}

impl XmlElement for Date {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let value = self
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(|err| ::xml::writer::Error::Io(std::io::Error::other(err)))?;

        writer.write(XmlEvent::characters(&value))
    }
}

impl<T: XmlElement + ?Sized> XmlElement for &T {
    fn namespaces(&self) -> &'static [Namespace] {
        T::namespaces(self)
    }

    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        T::attributes(self)
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        T::write_children(self, writer)
    }

    fn write_as_element<W: Write>(&self, writer: &mut EventWriter<W>, name: &str) -> WriteResult {
        T::write_as_element(self, writer, name)
    }
}

impl<T: XmlElement + ?Sized> XmlElement for Box<T> {
    fn namespaces(&self) -> &'static [Namespace] {
        T::namespaces(self)
    }

    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        T::attributes(self)
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        T::write_children(self, writer)
    }

    fn write_as_element<W: Write>(&self, writer: &mut EventWriter<W>, name: &str) -> WriteResult {
        T::write_as_element(self, writer, name)
    }
}

impl<T: XmlElement> XmlElement for Option<T> {
    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        match self {
            Some(value) => value.attributes(),
            None => Vec::new(),
        }
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        match self {
            Some(value) => value.write_children(writer),
            None => Ok(()),
        }
    }

    fn write_as_element<W: Write>(&self, writer: &mut EventWriter<W>, name: &str) -> WriteResult {
        match self {
            Some(value) => value.write_as_element(writer, name),
            None => Ok(()),
        }
    }
}

/// A sequence is written as the concatenated content of its items, so the
/// items are expected to produce their own elements.
impl<T: XmlElement> XmlElement for [T] {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        for item in self {
            item.write_children(writer)?;
        }

        Ok(())
    }
}

impl<T: XmlElement> XmlElement for Vec<T> {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        self.as_slice().write_children(writer)
    }
}

macro_rules! impl_xml_for_display {
    ($($ty:ty),*) => {
        $(
            impl XmlElement for $ty {
                fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
                    writer.write(XmlEvent::characters(&self.to_string()))
                }
            }

            impl XmlAttribute for $ty {
                fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
                    Some(Cow::Owned(self.to_string()))
                }
            }
        )*
    };
}

impl_xml_for_display!(u8, u16, u32, u64, usize, i8, i16, i32, i64, f64);

impl XmlAttribute for str {
    fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl XmlAttribute for String {
    fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl XmlAttribute for bool {
    fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(if *self { "true" } else { "false" }))
    }
}

impl<T: XmlAttribute + ?Sized> XmlAttribute for &T {
    fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
        T::to_attribute_value(self)
    }
}

impl<T: XmlAttribute> XmlAttribute for Option<T> {
    fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(|value| value.to_attribute_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_fragment;

    #[derive(XmlElement)]
    #[xml_serialize(default_ns = MESSAGES_NS_URI, ns = ("t", TYPES_NS_URI))]
    struct Request {
        #[xml_serialize(is_attribute)]
        traversal: String,

        #[xml_serialize(is_attribute)]
        max_entries: Option<u32>,

        #[xml_serialize(ns_prefix = "t")]
        subject: String,

        #[xml_serialize(rename = "ItemIds")]
        ids: Vec<Choice>,

        note: Option<String>,
    }

    #[derive(XmlElement)]
    #[xml_serialize(ns_prefix = "t")]
    enum Choice {
        ItemId {
            #[xml_serialize(is_attribute)]
            id: String,
        },
        Marker,
    }

    #[derive(XmlElement, XmlAttribute)]
    enum Shape {
        IdOnly,
        #[allow(dead_code)]
        AllProperties,
    }

    #[test]
    fn derived_struct_writes_names_namespaces_and_attributes() {
        let request = Request {
            traversal: "Shallow".to_string(),
            max_entries: None,
            subject: "Hello".to_string(),
            ids: vec![
                Choice::ItemId {
                    id: "AAMk".to_string(),
                },
                Choice::Marker,
            ],
            note: None,
        };

        let node = write_fragment(|writer| request.write_as_element(writer, "FindItem"));

        assert_eq!(node.name, "FindItem");
        assert_eq!(node.namespace.as_deref(), Some(MESSAGES_NS_URI));
        assert_eq!(node.attribute("Traversal"), Some("Shallow"));
        assert_eq!(node.attribute("MaxEntries"), None);

        let subject = node.child("Subject").expect("subject should be written");
        assert_eq!(subject.namespace.as_deref(), Some(TYPES_NS_URI));
        assert_eq!(subject.text, "Hello");

        let ids = node.child("ItemIds").expect("ids should be written");
        assert_eq!(ids.children.len(), 2);
        assert_eq!(ids.children[0].name, "ItemId");
        assert_eq!(ids.children[0].attribute("Id"), Some("AAMk"));
        assert_eq!(ids.children[1].name, "Marker");

        assert!(node.child("Note").is_none());
    }

    #[test]
    fn unit_enum_is_text_or_attribute() {
        let node = write_fragment(|writer| Shape::IdOnly.write_as_element(writer, "t:BaseShape"));
        assert_eq!(node.text, "IdOnly");

        assert_eq!(
            Shape::IdOnly.to_attribute_value().as_deref(),
            Some("IdOnly")
        );
    }

    #[test]
    fn to_xml_string_omits_declaration() {
        let value = to_xml_string("a < b", "Text").expect("writing should succeed");
        assert_eq!(value, "<Text>a &lt; b</Text>");
    }
}
