/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::io::Write;

use xml::EventWriter;

use super::{PropertyDefinition, PropertyKind};
use crate::{
    attachment::AttachmentCollection,
    recurrence::Recurrence,
    types::{BodyType, DateTime, EmailAddress, FolderId, ItemId, MessageBody},
    xml::{write_element, write_text_element, WriteResult, XmlElement, XmlNode},
    Error,
};

/// The value of a property in a property bag.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    DateTime(DateTime),
    Enum(String),
    ItemId(ItemId),
    FolderId(FolderId),
    Body(MessageBody),
    StringList(Vec<String>),
    EmailAddress(EmailAddress),
    EmailAddressList(Vec<EmailAddress>),
    Attachments(AttachmentCollection),
    Recurrence(Recurrence),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Boolean(_) => PropertyKind::Boolean,
            PropertyValue::Integer(_) => PropertyKind::Integer,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::DateTime(_) => PropertyKind::DateTime,
            PropertyValue::Enum(_) => PropertyKind::Enum,
            PropertyValue::ItemId(_) => PropertyKind::ItemId,
            PropertyValue::FolderId(_) => PropertyKind::FolderId,
            PropertyValue::Body(_) => PropertyKind::Body,
            PropertyValue::StringList(_) => PropertyKind::StringList,
            PropertyValue::EmailAddress(_) => PropertyKind::EmailAddress,
            PropertyValue::EmailAddressList(_) => PropertyKind::EmailAddressList,
            PropertyValue::Attachments(_) => PropertyKind::Attachments,
            PropertyValue::Recurrence(_) => PropertyKind::Recurrence,
        }
    }

    /// The value an auto-instantiated property starts with, for the kinds
    /// which have a natural empty value.
    pub(crate) fn empty(kind: PropertyKind) -> Option<Self> {
        match kind {
            PropertyKind::StringList => Some(PropertyValue::StringList(Vec::new())),
            PropertyKind::EmailAddressList => Some(PropertyValue::EmailAddressList(Vec::new())),
            PropertyKind::Attachments => {
                Some(PropertyValue::Attachments(AttachmentCollection::default()))
            }
            _ => None,
        }
    }

    /// Reads the value of `definition` from the element holding it.
    pub(crate) fn from_xml(definition: &PropertyDefinition, node: &XmlNode) -> Result<Self, Error> {
        let value = match definition.kind {
            PropertyKind::String => PropertyValue::String(node.text.clone()),
            PropertyKind::Boolean => PropertyValue::Boolean(node.parse_bool()?),
            PropertyKind::Integer => PropertyValue::Integer(node.parse_text()?),
            PropertyKind::Double => PropertyValue::Double(node.parse_text()?),
            PropertyKind::DateTime => PropertyValue::DateTime(DateTime::parse(&node.text)?),
            PropertyKind::Enum => PropertyValue::Enum(node.text.trim().to_string()),
            PropertyKind::ItemId => PropertyValue::ItemId(ItemId::from_xml(node)?),
            PropertyKind::FolderId => PropertyValue::FolderId(FolderId::from_xml(node)?),

            PropertyKind::Body => {
                let body_type = match node.attribute("BodyType") {
                    Some(body_type) => body_type.parse().map_err(|_| {
                        Error::UnexpectedXml(format!("invalid body type `{body_type}`"))
                    })?,
                    None => BodyType::Text,
                };
                let is_truncated = node
                    .attribute("IsTruncated")
                    .map(|value| value == "true" || value == "1");

                PropertyValue::Body(MessageBody {
                    body_type,
                    is_truncated,
                    text: node.text.clone(),
                })
            }

            PropertyKind::StringList => PropertyValue::StringList(
                node.children_named("String")
                    .map(|string| string.text.clone())
                    .collect(),
            ),

            PropertyKind::EmailAddress => {
                let mailbox = node.required_child("Mailbox")?;
                PropertyValue::EmailAddress(EmailAddress::from_xml(mailbox)?)
            }

            PropertyKind::EmailAddressList => PropertyValue::EmailAddressList(
                node.children_named("Mailbox")
                    .map(EmailAddress::from_xml)
                    .collect::<Result<_, _>>()?,
            ),

            PropertyKind::Attachments => {
                PropertyValue::Attachments(AttachmentCollection::from_xml(node)?)
            }

            PropertyKind::Recurrence => PropertyValue::Recurrence(Recurrence::from_xml(node)?),
        };

        Ok(value)
    }

    /// Writes the value as an element with the given (qualified) name.
    ///
    /// Attachments are saved through their own requests and write nothing.
    pub(crate) fn write_as<W: Write>(&self, writer: &mut EventWriter<W>, name: &str) -> WriteResult {
        match self {
            PropertyValue::String(value) | PropertyValue::Enum(value) => {
                write_text_element(writer, name, value)
            }
            PropertyValue::Boolean(value) => value.write_as_element(writer, name),
            PropertyValue::Integer(value) => value.write_as_element(writer, name),
            PropertyValue::Double(value) => value.write_as_element(writer, name),
            PropertyValue::DateTime(value) => value.write_as_element(writer, name),
            PropertyValue::ItemId(value) => value.write_as_element(writer, name),
            PropertyValue::FolderId(value) => value.write_as_element(writer, name),
            PropertyValue::Body(value) => value.write_as_element(writer, name),

            PropertyValue::StringList(values) => write_element(writer, name, &[], &[], |writer| {
                for value in values {
                    write_text_element(writer, "t:String", value)?;
                }

                Ok(())
            }),

            PropertyValue::EmailAddress(address) => {
                write_element(writer, name, &[], &[], |writer| {
                    address.write_as_element(writer, "t:Mailbox")
                })
            }

            PropertyValue::EmailAddressList(addresses) => {
                write_element(writer, name, &[], &[], |writer| {
                    for address in addresses {
                        address.write_as_element(writer, "t:Mailbox")?;
                    }

                    Ok(())
                })
            }

            PropertyValue::Attachments(_) => Ok(()),
            PropertyValue::Recurrence(recurrence) => recurrence.write_as_element(writer, name),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<DateTime> for PropertyValue {
    fn from(value: DateTime) -> Self {
        PropertyValue::DateTime(value)
    }
}

impl From<MessageBody> for PropertyValue {
    fn from(value: MessageBody) -> Self {
        PropertyValue::Body(value)
    }
}

impl From<EmailAddress> for PropertyValue {
    fn from(value: EmailAddress) -> Self {
        PropertyValue::EmailAddress(value)
    }
}

impl From<Recurrence> for PropertyValue {
    fn from(value: Recurrence) -> Self {
        PropertyValue::Recurrence(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        property::schema::{item, message},
        test_utils::{parse, write_fragment},
    };

    #[test]
    fn values_are_read_according_to_their_kind() {
        let recipients = parse(
            r#"<ToRecipients>
                <Mailbox><Name>Ada</Name><EmailAddress>ada@example.com</EmailAddress><RoutingType>SMTP</RoutingType><MailboxType>Mailbox</MailboxType></Mailbox>
                <Mailbox><EmailAddress>bob@example.com</EmailAddress></Mailbox>
            </ToRecipients>"#,
        );

        match PropertyValue::from_xml(&message::TO_RECIPIENTS, &recipients).unwrap() {
            PropertyValue::EmailAddressList(addresses) => {
                assert_eq!(addresses.len(), 2);
                assert_eq!(addresses[0].name.as_deref(), Some("Ada"));
                assert_eq!(
                    addresses[1].email_address.as_deref(),
                    Some("bob@example.com")
                );
            }
            other => panic!("unexpected value {other:?}"),
        }

        let body = parse(r#"<Body BodyType="HTML" IsTruncated="false">&lt;p&gt;Hi&lt;/p&gt;</Body>"#);
        assert_eq!(
            PropertyValue::from_xml(&item::BODY, &body).unwrap(),
            PropertyValue::Body(MessageBody {
                body_type: BodyType::HTML,
                is_truncated: Some(false),
                text: "<p>Hi</p>".to_string(),
            })
        );

        let size = parse("<Size>x</Size>");
        assert!(PropertyValue::from_xml(&item::SIZE, &size).is_err());
    }

    #[test]
    fn lists_are_written_with_their_item_elements() {
        let categories = PropertyValue::StringList(vec!["Red".to_string(), "Blue".to_string()]);

        let node = write_fragment(|writer| categories.write_as(writer, "t:Categories"));
        let values: Vec<_> = node
            .children_named("String")
            .map(|string| string.text.as_str())
            .collect();
        assert_eq!(values, vec!["Red", "Blue"]);
    }
}
