/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::borrow::Cow;

use strum::{AsRefStr, Display, EnumString};

use crate::{
    xml::{XmlAttribute, XmlElement, XmlNode},
    Error,
};

/// The identifier of an item, with the change key identifying its current
/// version.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/itemid>.
#[derive(Clone, Debug, PartialEq, Eq, Hash, XmlElement)]
pub struct ItemId {
    #[xml_serialize(is_attribute)]
    pub id: String,

    #[xml_serialize(is_attribute)]
    pub change_key: Option<String>,
}

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn with_change_key(id: impl Into<String>, change_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: Some(change_key.into()),
        }
    }

    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            id: node.required_attribute("Id")?.to_string(),
            change_key: node.attribute("ChangeKey").map(str::to_string),
        })
    }
}

/// An identifier for an item, an occurrence of a recurring series or the
/// master of the series an occurrence belongs to.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
#[xml_serialize(ns_prefix = "t")]
pub enum BaseItemId {
    ItemId(ItemId),

    OccurrenceItemId {
        #[xml_serialize(is_attribute)]
        recurring_master_id: String,

        #[xml_serialize(is_attribute)]
        change_key: Option<String>,

        #[xml_serialize(is_attribute)]
        instance_index: u32,
    },

    RecurringMasterItemId {
        #[xml_serialize(is_attribute)]
        occurrence_id: String,

        #[xml_serialize(is_attribute)]
        change_key: Option<String>,
    },
}

impl From<ItemId> for BaseItemId {
    fn from(value: ItemId) -> Self {
        BaseItemId::ItemId(value)
    }
}

impl From<&ItemId> for BaseItemId {
    fn from(value: &ItemId) -> Self {
        BaseItemId::ItemId(value.clone())
    }
}

/// An identifier for an arbitrary folder.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/folderid>.
#[derive(Clone, Debug, PartialEq, Eq, Hash, XmlElement)]
pub struct FolderId {
    #[xml_serialize(is_attribute)]
    pub id: String,

    #[xml_serialize(is_attribute)]
    pub change_key: Option<String>,
}

impl FolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            change_key: None,
        }
    }

    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            id: node.required_attribute("Id")?.to_string(),
            change_key: node.attribute("ChangeKey").map(str::to_string),
        })
    }
}

/// The identifier of an attachment, with the identity of the item it belongs
/// to when the server provides it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, XmlElement)]
pub struct AttachmentId {
    #[xml_serialize(is_attribute)]
    pub id: String,

    #[xml_serialize(is_attribute)]
    pub root_item_id: Option<String>,

    #[xml_serialize(is_attribute)]
    pub root_item_change_key: Option<String>,
}

impl AttachmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            root_item_id: None,
            root_item_change_key: None,
        }
    }

    pub(crate) fn from_xml(node: &XmlNode) -> Result<Self, Error> {
        Ok(Self {
            id: node.required_attribute("Id")?.to_string(),
            root_item_id: node.attribute("RootItemId").map(str::to_string),
            root_item_change_key: node.attribute("RootItemChangeKey").map(str::to_string),
        })
    }
}

/// The well-known folders of a mailbox.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/distinguishedfolderid>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DistinguishedFolderName {
    Calendar,
    Contacts,
    DeletedItems,
    Drafts,
    Inbox,
    Journal,
    JunkEmail,
    MsgFolderRoot,
    Notes,
    Outbox,
    Root,
    SearchFolders,
    SentItems,
    Tasks,
    VoiceMail,
}

impl XmlAttribute for DistinguishedFolderName {
    fn to_attribute_value(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_ref()))
    }
}

/// A mailbox other than the authenticated user's.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
pub struct Mailbox {
    #[xml_serialize(ns_prefix = "t")]
    pub email_address: String,
}

/// An identifier for a folder, either by id or by well-known name.
#[derive(Clone, Debug, PartialEq, Eq, XmlElement)]
#[xml_serialize(ns_prefix = "t")]
pub enum BaseFolderId {
    FolderId(FolderId),

    DistinguishedFolderId {
        #[xml_serialize(is_attribute)]
        id: DistinguishedFolderName,

        #[xml_serialize(is_attribute)]
        change_key: Option<String>,

        #[xml_serialize(ns_prefix = "t")]
        mailbox: Option<Mailbox>,
    },
}

impl BaseFolderId {
    /// A well-known folder in another user's mailbox.
    pub fn distinguished_in(name: DistinguishedFolderName, email_address: impl Into<String>) -> Self {
        BaseFolderId::DistinguishedFolderId {
            id: name,
            change_key: None,
            mailbox: Some(Mailbox {
                email_address: email_address.into(),
            }),
        }
    }
}

impl From<DistinguishedFolderName> for BaseFolderId {
    fn from(value: DistinguishedFolderName) -> Self {
        BaseFolderId::DistinguishedFolderId {
            id: value,
            change_key: None,
            mailbox: None,
        }
    }
}

impl From<FolderId> for BaseFolderId {
    fn from(value: FolderId) -> Self {
        BaseFolderId::FolderId(value)
    }
}
