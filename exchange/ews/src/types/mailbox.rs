/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{
    types::{ItemId, MailboxType},
    xml::{XmlElement, XmlNode},
    Error,
};

/// A mailbox user or recipient.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/mailbox>.
#[derive(Clone, Debug, Default, PartialEq, Eq, XmlElement)]
pub struct EmailAddress {
    #[xml_serialize(ns_prefix = "t")]
    pub name: Option<String>,

    #[xml_serialize(ns_prefix = "t")]
    pub email_address: Option<String>,

    #[xml_serialize(ns_prefix = "t")]
    pub routing_type: Option<String>,

    #[xml_serialize(ns_prefix = "t")]
    pub mailbox_type: Option<MailboxType>,

    #[xml_serialize(ns_prefix = "t")]
    pub item_id: Option<ItemId>,
}

impl EmailAddress {
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            email_address: Some(email_address.into()),
            ..Default::default()
        }
    }

    pub fn with_name(name: impl Into<String>, email_address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email_address: Some(email_address.into()),
            ..Default::default()
        }
    }

    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            name: node.child_text("Name").map(str::to_string),
            email_address: node.child_text("EmailAddress").map(str::to_string),
            routing_type: node.child_text("RoutingType").map(str::to_string),
            mailbox_type: node
                .child("MailboxType")
                .map(XmlNode::parse_text)
                .transpose()?,
            item_id: node.child("ItemId").map(ItemId::from_xml).transpose()?,
        })
    }
}
