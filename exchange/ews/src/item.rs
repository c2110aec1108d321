/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::borrow::Cow;

use crate::{
    attachment::AttachmentCollection,
    property::{
        schema::{item, ITEM_SCHEMA, MESSAGE_SCHEMA, TASK_SCHEMA},
        PropertyBag, PropertySet, PropertyValue, Schema,
    },
    task::Task,
    types::{
        DateTime, DistinguishedFolderName, FolderId, Importance, ItemId, MessageBody, Sensitivity,
    },
    xml::XmlNode,
    Error,
};

mod message;
pub use message::EmailMessage;

/// An object stored on the server, backed by a [`PropertyBag`].
pub trait ServiceObject {
    fn property_bag(&self) -> &PropertyBag;

    fn property_bag_mut(&mut self) -> &mut PropertyBag;

    /// The local name of the element representing the object, e.g. `Task`.
    fn xml_element_name(&self) -> &str;

    /// The folder new objects are saved to when no folder is given.
    fn default_folder(&self) -> Option<DistinguishedFolderName> {
        None
    }
}

/// An item type which can be bound to directly, e.g. with
/// [`ExchangeService::bind_to_item`](crate::ExchangeService::bind_to_item).
pub trait ItemType: ServiceObject + Sized {
    const SCHEMA: &'static Schema;

    /// Converts an item of unknown type, failing if it is of another type.
    fn from_any(item: AnyItem) -> Result<Self, Error>;
}

/// Typed accessors for the properties every item has.
pub trait ItemProperties: ServiceObject {
    fn id(&self) -> Result<Option<&ItemId>, Error> {
        self.property_bag().get_item_id(&item::ITEM_ID)
    }

    fn parent_folder_id(&self) -> Result<Option<&FolderId>, Error> {
        self.property_bag().get_folder_id(&item::PARENT_FOLDER_ID)
    }

    fn item_class(&self) -> Result<Option<&str>, Error> {
        self.property_bag().get_string(&item::ITEM_CLASS)
    }

    fn set_item_class(&mut self, item_class: &str) -> Result<(), Error> {
        self.property_bag_mut().set(&item::ITEM_CLASS, item_class)
    }

    fn subject(&self) -> Result<Option<&str>, Error> {
        self.property_bag().get_string(&item::SUBJECT)
    }

    fn set_subject(&mut self, subject: &str) -> Result<(), Error> {
        self.property_bag_mut().set(&item::SUBJECT, subject)
    }

    fn sensitivity(&self) -> Result<Option<Sensitivity>, Error> {
        self.property_bag().get_enum(&item::SENSITIVITY)
    }

    fn set_sensitivity(&mut self, sensitivity: Sensitivity) -> Result<(), Error> {
        self.property_bag_mut()
            .set(&item::SENSITIVITY, PropertyValue::Enum(sensitivity.to_string()))
    }

    fn body(&self) -> Result<Option<&MessageBody>, Error> {
        self.property_bag().get_body(&item::BODY)
    }

    fn set_body(&mut self, body: MessageBody) -> Result<(), Error> {
        self.property_bag_mut().set(&item::BODY, body)
    }

    fn attachments(&self) -> Result<Option<&AttachmentCollection>, Error> {
        match self.property_bag().get(&item::ATTACHMENTS)? {
            Some(PropertyValue::Attachments(attachments)) => Ok(Some(attachments)),
            Some(_) => Err(Error::PropertyType(item::ATTACHMENTS.name)),
            None => Ok(None),
        }
    }

    /// Gets the attachments for modification, creating an empty collection
    /// on items without attachments.
    fn attachments_mut(&mut self) -> Result<&mut AttachmentCollection, Error> {
        match self.property_bag_mut().value_mut(&item::ATTACHMENTS)? {
            PropertyValue::Attachments(attachments) => Ok(attachments),
            _ => Err(Error::PropertyType(item::ATTACHMENTS.name)),
        }
    }

    fn has_attachments(&self) -> Result<Option<bool>, Error> {
        self.property_bag().get_bool(&item::HAS_ATTACHMENTS)
    }

    fn date_time_received(&self) -> Result<Option<DateTime>, Error> {
        self.property_bag().get_date_time(&item::DATE_TIME_RECEIVED)
    }

    fn date_time_sent(&self) -> Result<Option<DateTime>, Error> {
        self.property_bag().get_date_time(&item::DATE_TIME_SENT)
    }

    fn date_time_created(&self) -> Result<Option<DateTime>, Error> {
        self.property_bag().get_date_time(&item::DATE_TIME_CREATED)
    }

    fn last_modified_time(&self) -> Result<Option<DateTime>, Error> {
        self.property_bag().get_date_time(&item::LAST_MODIFIED_TIME)
    }

    /// The size of the item in bytes.
    fn size(&self) -> Result<Option<i64>, Error> {
        self.property_bag().get_integer(&item::SIZE)
    }

    fn categories(&self) -> Result<Option<&[String]>, Error> {
        Ok(self
            .property_bag()
            .get_string_list(&item::CATEGORIES)?
            .map(Vec::as_slice))
    }

    fn categories_mut(&mut self) -> Result<&mut Vec<String>, Error> {
        match self.property_bag_mut().value_mut(&item::CATEGORIES)? {
            PropertyValue::StringList(categories) => Ok(categories),
            _ => Err(Error::PropertyType(item::CATEGORIES.name)),
        }
    }

    fn importance(&self) -> Result<Option<Importance>, Error> {
        self.property_bag().get_enum(&item::IMPORTANCE)
    }

    fn set_importance(&mut self, importance: Importance) -> Result<(), Error> {
        self.property_bag_mut()
            .set(&item::IMPORTANCE, PropertyValue::Enum(importance.to_string()))
    }

    fn is_draft(&self) -> Result<Option<bool>, Error> {
        self.property_bag().get_bool(&item::IS_DRAFT)
    }

    fn is_submitted(&self) -> Result<Option<bool>, Error> {
        self.property_bag().get_bool(&item::IS_SUBMITTED)
    }

    fn reminder_is_set(&self) -> Result<Option<bool>, Error> {
        self.property_bag().get_bool(&item::REMINDER_IS_SET)
    }

    fn set_reminder_is_set(&mut self, is_set: bool) -> Result<(), Error> {
        self.property_bag_mut().set(&item::REMINDER_IS_SET, is_set)
    }

    fn reminder_due_by(&self) -> Result<Option<DateTime>, Error> {
        self.property_bag().get_date_time(&item::REMINDER_DUE_BY)
    }

    fn set_reminder_due_by(&mut self, due_by: DateTime) -> Result<(), Error> {
        self.property_bag_mut().set(&item::REMINDER_DUE_BY, due_by)
    }

    fn reminder_minutes_before_start(&self) -> Result<Option<i64>, Error> {
        self.property_bag()
            .get_integer(&item::REMINDER_MINUTES_BEFORE_START)
    }

    fn set_reminder_minutes_before_start(&mut self, minutes: i64) -> Result<(), Error> {
        self.property_bag_mut()
            .set(&item::REMINDER_MINUTES_BEFORE_START, minutes)
    }

    fn culture(&self) -> Result<Option<&str>, Error> {
        self.property_bag().get_string(&item::CULTURE)
    }

    fn set_culture(&mut self, culture: &str) -> Result<(), Error> {
        self.property_bag_mut().set(&item::CULTURE, culture)
    }
}

impl<T: ServiceObject + ?Sized> ItemProperties for T {}

/// A generic item, used for item kinds without a dedicated type.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    bag: PropertyBag,
    element_name: Cow<'static, str>,
}

impl Item {
    pub fn new() -> Self {
        Self {
            bag: PropertyBag::new(&ITEM_SCHEMA),
            element_name: Cow::Borrowed("Item"),
        }
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceObject for Item {
    fn property_bag(&self) -> &PropertyBag {
        &self.bag
    }

    fn property_bag_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn xml_element_name(&self) -> &str {
        &self.element_name
    }
}

impl ItemType for Item {
    const SCHEMA: &'static Schema = &ITEM_SCHEMA;

    /// Any item can be viewed as a generic item.
    fn from_any(item: AnyItem) -> Result<Self, Error> {
        Ok(match item {
            AnyItem::Item(item) => item,
            AnyItem::Message(message) => Item {
                bag: message.into_property_bag(),
                element_name: Cow::Borrowed("Message"),
            },
            AnyItem::Task(task) => Item {
                bag: task.into_property_bag(),
                element_name: Cow::Borrowed("Task"),
            },
        })
    }
}

/// An item of a type only known once the response has been read.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyItem {
    Item(Item),
    Message(EmailMessage),
    Task(Task),
}

impl AnyItem {
    /// Builds an item from its response element, picking the type from the
    /// element name.
    pub(crate) fn from_xml(node: &XmlNode, shape: &PropertySet, for_find: bool) -> Result<Self, Error> {
        let schema = match node.name.as_str() {
            "Message" => &MESSAGE_SCHEMA,
            "Task" => &TASK_SCHEMA,
            _ => &ITEM_SCHEMA,
        };

        let mut bag = PropertyBag::new(schema);
        bag.load_from_xml(node, true, &shape.requested(schema, for_find))?;

        Ok(match node.name.as_str() {
            "Message" => AnyItem::Message(EmailMessage::from_property_bag(bag)),
            "Task" => AnyItem::Task(Task::from_property_bag(bag)),
            name => AnyItem::Item(Item {
                bag,
                element_name: Cow::Owned(name.to_string()),
            }),
        })
    }

    pub(crate) fn into_property_bag(self) -> PropertyBag {
        match self {
            AnyItem::Item(item) => item.bag,
            AnyItem::Message(message) => message.into_property_bag(),
            AnyItem::Task(task) => task.into_property_bag(),
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            AnyItem::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&EmailMessage> {
        match self {
            AnyItem::Message(message) => Some(message),
            _ => None,
        }
    }

    fn object(&self) -> &dyn ServiceObject {
        match self {
            AnyItem::Item(item) => item,
            AnyItem::Message(message) => message,
            AnyItem::Task(task) => task,
        }
    }

    fn object_mut(&mut self) -> &mut dyn ServiceObject {
        match self {
            AnyItem::Item(item) => item,
            AnyItem::Message(message) => message,
            AnyItem::Task(task) => task,
        }
    }
}

impl ServiceObject for AnyItem {
    fn property_bag(&self) -> &PropertyBag {
        self.object().property_bag()
    }

    fn property_bag_mut(&mut self) -> &mut PropertyBag {
        self.object_mut().property_bag_mut()
    }

    fn xml_element_name(&self) -> &str {
        self.object().xml_element_name()
    }

    fn default_folder(&self) -> Option<DistinguishedFolderName> {
        self.object().default_folder()
    }
}

impl ItemType for AnyItem {
    const SCHEMA: &'static Schema = &ITEM_SCHEMA;

    fn from_any(item: AnyItem) -> Result<Self, Error> {
        Ok(item)
    }
}

impl From<Item> for AnyItem {
    fn from(value: Item) -> Self {
        AnyItem::Item(value)
    }
}

impl From<EmailMessage> for AnyItem {
    fn from(value: EmailMessage) -> Self {
        AnyItem::Message(value)
    }
}

impl From<Task> for AnyItem {
    fn from(value: Task) -> Self {
        AnyItem::Task(value)
    }
}

/// The error returned when an item is bound as the wrong type.
pub(crate) fn wrong_item_type(expected: &str, item: &AnyItem) -> Error {
    Error::Validation(format!(
        "the item is a {}, not a {expected}",
        item.xml_element_name()
    ))
}
