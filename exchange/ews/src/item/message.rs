/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use super::{wrong_item_type, AnyItem, ItemType, ServiceObject};
use crate::{
    property::{
        schema::{message, MESSAGE_SCHEMA},
        PropertyBag, PropertyDefinition, PropertyValue, Schema,
    },
    types::{DistinguishedFolderName, EmailAddress},
    Error,
};

/// An email message.
#[derive(Clone, Debug, PartialEq)]
pub struct EmailMessage {
    bag: PropertyBag,
}

impl EmailMessage {
    pub fn new() -> Self {
        Self {
            bag: PropertyBag::new(&MESSAGE_SCHEMA),
        }
    }

    pub(crate) fn from_property_bag(bag: PropertyBag) -> Self {
        Self { bag }
    }

    pub(crate) fn into_property_bag(self) -> PropertyBag {
        self.bag
    }

    fn recipients(&self, definition: &'static PropertyDefinition) -> Result<&[EmailAddress], Error> {
        Ok(self
            .bag
            .get_email_addresses(definition)?
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    fn recipients_mut(
        &mut self,
        definition: &'static PropertyDefinition,
    ) -> Result<&mut Vec<EmailAddress>, Error> {
        match self.bag.value_mut(definition)? {
            PropertyValue::EmailAddressList(addresses) => Ok(addresses),
            _ => Err(Error::PropertyType(definition.name)),
        }
    }

    pub fn to_recipients(&self) -> Result<&[EmailAddress], Error> {
        self.recipients(&message::TO_RECIPIENTS)
    }

    pub fn to_recipients_mut(&mut self) -> Result<&mut Vec<EmailAddress>, Error> {
        self.recipients_mut(&message::TO_RECIPIENTS)
    }

    pub fn cc_recipients(&self) -> Result<&[EmailAddress], Error> {
        self.recipients(&message::CC_RECIPIENTS)
    }

    pub fn cc_recipients_mut(&mut self) -> Result<&mut Vec<EmailAddress>, Error> {
        self.recipients_mut(&message::CC_RECIPIENTS)
    }

    pub fn bcc_recipients(&self) -> Result<&[EmailAddress], Error> {
        self.recipients(&message::BCC_RECIPIENTS)
    }

    pub fn bcc_recipients_mut(&mut self) -> Result<&mut Vec<EmailAddress>, Error> {
        self.recipients_mut(&message::BCC_RECIPIENTS)
    }

    pub fn reply_to(&self) -> Result<&[EmailAddress], Error> {
        self.recipients(&message::REPLY_TO)
    }

    pub fn reply_to_mut(&mut self) -> Result<&mut Vec<EmailAddress>, Error> {
        self.recipients_mut(&message::REPLY_TO)
    }

    pub fn sender(&self) -> Result<Option<&EmailAddress>, Error> {
        self.bag.get_email_address(&message::SENDER)
    }

    pub fn set_sender(&mut self, sender: EmailAddress) -> Result<(), Error> {
        self.bag.set(&message::SENDER, sender)
    }

    pub fn from(&self) -> Result<Option<&EmailAddress>, Error> {
        self.bag.get_email_address(&message::FROM)
    }

    pub fn set_from(&mut self, from: EmailAddress) -> Result<(), Error> {
        self.bag.set(&message::FROM, from)
    }

    pub fn is_read(&self) -> Result<Option<bool>, Error> {
        self.bag.get_bool(&message::IS_READ)
    }

    pub fn set_is_read(&mut self, is_read: bool) -> Result<(), Error> {
        self.bag.set(&message::IS_READ, is_read)
    }

    pub fn is_read_receipt_requested(&self) -> Result<Option<bool>, Error> {
        self.bag.get_bool(&message::IS_READ_RECEIPT_REQUESTED)
    }

    pub fn set_is_read_receipt_requested(&mut self, requested: bool) -> Result<(), Error> {
        self.bag.set(&message::IS_READ_RECEIPT_REQUESTED, requested)
    }

    pub fn is_delivery_receipt_requested(&self) -> Result<Option<bool>, Error> {
        self.bag.get_bool(&message::IS_DELIVERY_RECEIPT_REQUESTED)
    }

    pub fn set_is_delivery_receipt_requested(&mut self, requested: bool) -> Result<(), Error> {
        self.bag
            .set(&message::IS_DELIVERY_RECEIPT_REQUESTED, requested)
    }

    pub fn internet_message_id(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&message::INTERNET_MESSAGE_ID)
    }

    pub fn conversation_topic(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&message::CONVERSATION_TOPIC)
    }

    pub fn references(&self) -> Result<Option<&str>, Error> {
        self.bag.get_string(&message::REFERENCES)
    }
}

impl Default for EmailMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceObject for EmailMessage {
    fn property_bag(&self) -> &PropertyBag {
        &self.bag
    }

    fn property_bag_mut(&mut self) -> &mut PropertyBag {
        &mut self.bag
    }

    fn xml_element_name(&self) -> &str {
        "Message"
    }

    fn default_folder(&self) -> Option<DistinguishedFolderName> {
        Some(DistinguishedFolderName::Drafts)
    }
}

impl ItemType for EmailMessage {
    const SCHEMA: &'static Schema = &MESSAGE_SCHEMA;

    fn from_any(item: AnyItem) -> Result<Self, Error> {
        match item {
            AnyItem::Message(message) => Ok(message),
            other => Err(wrong_item_type("Message", &other)),
        }
    }
}
