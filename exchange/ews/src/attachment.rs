/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{io::Write, path::Path};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use xml::EventWriter;

use crate::{
    item::{AnyItem, ServiceObject},
    property::PropertySet,
    types::{AttachmentId, DateTime, ExchangeVersion},
    xml::{write_element, write_text_element, WriteResult, XmlElement, XmlNode},
    Error,
};

/// A file attached to an item.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/fileattachment>.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileAttachment {
    pub id: Option<AttachmentId>,
    pub name: String,
    pub content_type: Option<String>,
    pub content_id: Option<String>,
    pub content_location: Option<String>,
    pub size: Option<i64>,
    pub last_modified_time: Option<DateTime>,
    pub is_inline: bool,
    pub is_contact_photo: bool,

    /// The decoded content, if it has been loaded.
    pub content: Option<Vec<u8>>,
}

/// An item embedded in another item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemAttachment {
    pub id: Option<AttachmentId>,
    pub name: String,
    pub content_type: Option<String>,
    pub content_id: Option<String>,
    pub content_location: Option<String>,
    pub size: Option<i64>,
    pub last_modified_time: Option<DateTime>,
    pub is_inline: bool,
    pub item: Option<Box<AnyItem>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Attachment {
    File(FileAttachment),
    Item(ItemAttachment),
}

impl Attachment {
    pub fn id(&self) -> Option<&AttachmentId> {
        match self {
            Attachment::File(file) => file.id.as_ref(),
            Attachment::Item(item) => item.id.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Attachment::File(file) => &file.name,
            Attachment::Item(item) => &item.name,
        }
    }

    /// Whether the attachment has not been saved yet.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    fn set_id(&mut self, id: AttachmentId) {
        match self {
            Attachment::File(file) => file.id = Some(id),
            Attachment::Item(item) => item.id = Some(id),
        }
    }

    pub fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        if self.name().is_empty() {
            return Err(Error::Validation("attachments must have a name".to_string()));
        }

        match self {
            Attachment::File(file) => {
                if file.is_new() && file.content.is_none() {
                    return Err(Error::Validation(format!(
                        "file attachment `{}` has no content",
                        file.name
                    )));
                }

                if file.is_contact_photo && version < ExchangeVersion::Exchange2010 {
                    return Err(Error::Version {
                        feature: "contact photo attachments".to_string(),
                        required: ExchangeVersion::Exchange2010,
                        actual: version,
                    });
                }
            }

            Attachment::Item(attachment) => match &attachment.item {
                Some(item) => item.property_bag().validate_version(version)?,
                None => {
                    return Err(Error::Validation(format!(
                        "item attachment `{}` has no item",
                        attachment.name
                    )))
                }
            },
        }

        Ok(())
    }

    /// Reads a `FileAttachment` or `ItemAttachment` element.
    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        let id = node.child("AttachmentId").map(AttachmentId::from_xml).transpose()?;
        let name = node.child_text("Name").unwrap_or_default().to_string();
        let content_type = node.child_text("ContentType").map(str::to_string);
        let content_id = node.child_text("ContentId").map(str::to_string);
        let content_location = node.child_text("ContentLocation").map(str::to_string);
        let size = node.child("Size").map(XmlNode::parse_text).transpose()?;
        let last_modified_time = node
            .child_text("LastModifiedTime")
            .map(DateTime::parse)
            .transpose()?;
        let is_inline = node
            .child("IsInline")
            .map(XmlNode::parse_bool)
            .transpose()?
            .unwrap_or(false);

        match node.name.as_str() {
            "FileAttachment" => {
                let content = node
                    .child_text("Content")
                    .map(|content| BASE64_STANDARD.decode(content.trim()))
                    .transpose()?;

                Ok(Attachment::File(FileAttachment {
                    id,
                    name,
                    content_type,
                    content_id,
                    content_location,
                    size,
                    last_modified_time,
                    is_inline,
                    is_contact_photo: node
                        .child("IsContactPhoto")
                        .map(XmlNode::parse_bool)
                        .transpose()?
                        .unwrap_or(false),
                    content,
                }))
            }

            "ItemAttachment" => {
                let shape = PropertySet::first_class_properties();
                let item = node
                    .children
                    .iter()
                    .find(|child| !ATTACHMENT_FIELDS.contains(&child.name.as_str()))
                    .map(|child| AnyItem::from_xml(child, &shape, false))
                    .transpose()?;

                Ok(Attachment::Item(ItemAttachment {
                    id,
                    name,
                    content_type,
                    content_id,
                    content_location,
                    size,
                    last_modified_time,
                    is_inline,
                    item: item.map(Box::new),
                }))
            }

            other => Err(Error::UnexpectedXml(format!(
                "unexpected attachment element `{other}`"
            ))),
        }
    }
}

impl FileAttachment {
    pub fn new(name: &str, content: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

impl ItemAttachment {
    pub fn new(name: &str, item: impl Into<AnyItem>) -> Self {
        Self {
            name: name.to_string(),
            item: Some(Box::new(item.into())),
            ..Default::default()
        }
    }
}

impl From<FileAttachment> for Attachment {
    fn from(file: FileAttachment) -> Self {
        Attachment::File(file)
    }
}

impl From<ItemAttachment> for Attachment {
    fn from(attachment: ItemAttachment) -> Self {
        Attachment::Item(attachment)
    }
}

const ATTACHMENT_FIELDS: &[&str] = &[
    "AttachmentId",
    "Name",
    "ContentType",
    "ContentId",
    "ContentLocation",
    "Size",
    "LastModifiedTime",
    "IsInline",
];

fn write_optional<W: Write>(
    writer: &mut EventWriter<W>,
    name: &str,
    value: Option<&str>,
) -> WriteResult {
    match value {
        Some(value) => write_text_element(writer, name, value),
        None => Ok(()),
    }
}

/// Written as the content of a `t:FileAttachment` or `t:ItemAttachment`
/// element, see [`Attachment::element_name`].
impl XmlElement for Attachment {
    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let (content_type, content_id, content_location, is_inline) = match self {
            Attachment::File(file) => (
                &file.content_type,
                &file.content_id,
                &file.content_location,
                file.is_inline,
            ),
            Attachment::Item(item) => (
                &item.content_type,
                &item.content_id,
                &item.content_location,
                item.is_inline,
            ),
        };

        write_text_element(writer, "t:Name", self.name())?;
        write_optional(writer, "t:ContentType", content_type.as_deref())?;
        write_optional(writer, "t:ContentId", content_id.as_deref())?;
        write_optional(writer, "t:ContentLocation", content_location.as_deref())?;
        if is_inline {
            is_inline.write_as_element(writer, "t:IsInline")?;
        }

        match self {
            Attachment::File(file) => {
                if file.is_contact_photo {
                    true.write_as_element(writer, "t:IsContactPhoto")?;
                }

                if let Some(content) = &file.content {
                    write_text_element(writer, "t:Content", &BASE64_STANDARD.encode(content))?;
                }
            }

            Attachment::Item(attachment) => {
                if let Some(item) = &attachment.item {
                    let name = format!("t:{}", item.xml_element_name());
                    write_element(writer, &name, &[], &[], |writer| {
                        item.property_bag().write_for_create(writer)
                    })?;
                }
            }
        }

        Ok(())
    }
}

impl Attachment {
    pub fn element_name(&self) -> &'static str {
        match self {
            Attachment::File(_) => "t:FileAttachment",
            Attachment::Item(_) => "t:ItemAttachment",
        }
    }
}

/// The attachments of an item, tracking which ones still need to be saved
/// and which ones were removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttachmentCollection {
    items: Vec<Attachment>,
    removed: Vec<Attachment>,
}

impl AttachmentCollection {
    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            items: node
                .children
                .iter()
                .map(Attachment::from_xml)
                .collect::<Result<_, _>>()?,
            removed: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    /// Adds a new attachment and returns its index.
    pub fn add(&mut self, attachment: impl Into<Attachment>) -> usize {
        self.items.push(attachment.into());
        self.items.len() - 1
    }

    pub fn add_file_attachment(&mut self, name: &str, content: Vec<u8>) -> usize {
        self.add(FileAttachment::new(name, content))
    }

    /// Attaches the content of a file, named after the file.
    pub fn add_file_attachment_from_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<usize, Error> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Validation(format!("`{}` is not a file", path.display())))?;
        let content = std::fs::read(path)?;

        Ok(self.add_file_attachment(&name, content))
    }

    pub fn add_item_attachment(&mut self, name: &str, item: impl Into<AnyItem>) -> usize {
        self.add(ItemAttachment::new(name, item))
    }

    /// Removes an attachment. Saved attachments are deleted from the server
    /// with the next save of the owning item.
    pub fn remove(&mut self, index: usize) -> Result<Attachment, Error> {
        if index >= self.items.len() {
            return Err(Error::Validation(format!(
                "no attachment at index {index}, the item has {}",
                self.items.len()
            )));
        }

        let attachment = self.items.remove(index);
        if !attachment.is_new() {
            self.removed.push(attachment.clone());
        }

        Ok(attachment)
    }

    pub fn clear(&mut self) {
        for attachment in self.items.drain(..) {
            if !attachment.is_new() {
                self.removed.push(attachment);
            }
        }
    }

    pub fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        self.items
            .iter()
            .filter(|attachment| attachment.is_new())
            .try_for_each(|attachment| attachment.validate(version))
    }

    /// Whether attachments were added or removed since the last save.
    pub fn has_unprocessed_changes(&self) -> bool {
        !self.removed.is_empty() || self.items.iter().any(Attachment::is_new)
    }

    /// The attachments which have not been saved yet, with their indices.
    pub(crate) fn unsaved(&self) -> Vec<(usize, Attachment)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, attachment)| attachment.is_new())
            .map(|(index, attachment)| (index, attachment.clone()))
            .collect()
    }

    pub(crate) fn mark_saved(&mut self, index: usize, id: AttachmentId) {
        if let Some(attachment) = self.items.get_mut(index) {
            attachment.set_id(id);
        }
    }

    pub(crate) fn take_removed(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.removed)
    }

    /// Queues attachments whose deletion did not go through for the next
    /// save.
    pub(crate) fn requeue_removed(&mut self, attachments: impl IntoIterator<Item = Attachment>) {
        self.removed.extend(attachments);
    }
}

impl<'a> IntoIterator for &'a AttachmentCollection {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        item::{ItemProperties, Item},
        task::Task,
        test_utils::{parse, write_fragment},
    };

    #[test]
    fn file_content_is_base64_on_the_wire() {
        let mut attachments = AttachmentCollection::default();
        let index = attachments.add(FileAttachment {
            content_type: Some("text/plain".to_string()),
            ..FileAttachment::new("hello.txt", b"Hello, world".to_vec())
        });
        assert_eq!(index, 0);

        let attachment = attachments.get(0).unwrap();
        let node = write_fragment(|writer| {
            attachment.write_as_element(writer, attachment.element_name())
        });

        assert_eq!(node.name, "FileAttachment");
        assert_eq!(node.child_text("Name"), Some("hello.txt"));
        assert_eq!(node.child_text("ContentType"), Some("text/plain"));
        assert_eq!(node.child_text("Content"), Some("SGVsbG8sIHdvcmxk"));
        assert!(node.child("IsInline").is_none());
    }

    #[test]
    fn attachments_are_read_with_embedded_items() {
        let node = parse(
            r#"<Attachments xmlns="http://schemas.microsoft.com/exchange/services/2006/types">
                <FileAttachment>
                    <AttachmentId Id="AAMkAtt1" RootItemId="AAMk" RootItemChangeKey="CQAA"/>
                    <Name>hello.txt</Name>
                    <Size>12</Size>
                    <IsInline>false</IsInline>
                    <Content>SGVsbG8sIHdvcmxk</Content>
                </FileAttachment>
                <ItemAttachment>
                    <AttachmentId Id="AAMkAtt2"/>
                    <Name>Forwarded</Name>
                    <Message>
                        <Subject>Original</Subject>
                    </Message>
                </ItemAttachment>
            </Attachments>"#,
        );

        let attachments = AttachmentCollection::from_xml(&node).unwrap();
        assert_eq!(attachments.len(), 2);
        assert!(!attachments.has_unprocessed_changes());

        match attachments.get(0).unwrap() {
            Attachment::File(file) => {
                assert_eq!(file.content.as_deref(), Some(&b"Hello, world"[..]));
                assert_eq!(file.size, Some(12));
                assert_eq!(
                    file.id.as_ref().and_then(|id| id.root_item_id.as_deref()),
                    Some("AAMk")
                );
            }
            other => panic!("unexpected attachment {other:?}"),
        }

        match attachments.get(1).unwrap() {
            Attachment::Item(attachment) => {
                let item = attachment.item.as_ref().unwrap();
                assert_eq!(item.subject().unwrap(), Some("Original"));
            }
            other => panic!("unexpected attachment {other:?}"),
        }
    }

    #[test]
    fn removing_saved_attachments_is_remembered() {
        let mut attachments = AttachmentCollection::default();
        attachments.add_file_attachment("a.txt", Vec::new());
        attachments.add_item_attachment("task", Task::new());
        attachments.mark_saved(0, AttachmentId::new("saved"));

        assert_eq!(attachments.unsaved().len(), 1);
        assert!(attachments.has_unprocessed_changes());

        attachments.clear();
        assert!(attachments.is_empty());

        let removed = attachments.take_removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].name(), "a.txt");
        assert!(!attachments.has_unprocessed_changes());

        attachments.requeue_removed(removed);
        assert!(attachments.has_unprocessed_changes());
        assert_eq!(attachments.take_removed().len(), 1);

        assert!(matches!(attachments.remove(0), Err(Error::Validation(_))));
    }

    #[test]
    fn validation() {
        let mut attachments = AttachmentCollection::default();
        attachments.add(FileAttachment {
            is_contact_photo: true,
            ..FileAttachment::new("photo.jpg", vec![0xff, 0xd8])
        });
        assert!(matches!(
            attachments.validate(ExchangeVersion::Exchange2007_SP1),
            Err(Error::Version { .. })
        ));
        assert!(attachments.validate(ExchangeVersion::Exchange2010).is_ok());

        let mut attachments = AttachmentCollection::default();
        attachments.add_item_attachment("", Item::new());
        assert!(matches!(
            attachments.validate(ExchangeVersion::Exchange2010),
            Err(Error::Validation(_))
        ));
    }
}
