/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{borrow::Cow, io::Write};

use xml::EventWriter;

use super::{ensure, Operation};
use crate::{
    item::{AnyItem, ItemProperties, ServiceObject},
    property::PropertySet,
    types::{
        AffectedTaskOccurrences, BasePoint, BaseFolderId, BaseItemId, ConflictResolution,
        DeleteType, ExchangeVersion, ItemId, MessageDisposition, Traversal,
    },
    xml::{
        write_element, Namespace, WriteResult, XmlAttribute, XmlElement, XmlNode, MESSAGES_NS_URI,
    },
    Error,
};

/// Reads the item elements of a response message's `Items` element.
fn items_of<'a>(message: &'a XmlNode) -> impl Iterator<Item = &'a XmlNode> + 'a {
    message
        .child("Items")
        .into_iter()
        .flat_map(|items| items.children.iter())
}

/// Gets items by id.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getitem>.
#[derive(Clone, Debug, XmlElement)]
#[xml_serialize(default_ns = MESSAGES_NS_URI)]
pub struct GetItem {
    pub item_shape: PropertySet,
    pub item_ids: Vec<BaseItemId>,
}

impl Operation for GetItem {
    const NAME: &'static str = "GetItem";
    type Response = AnyItem;

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.item_ids.is_empty(), || {
            "at least one item id is required".to_string()
        })?;

        self.item_shape.validate(version, false)
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<AnyItem, Error> {
        let node = items_of(message).next().ok_or_else(|| {
            Error::UnexpectedXml("GetItem response message contains no item".to_string())
        })?;

        AnyItem::from_xml(node, &self.item_shape, false)
    }

    fn expected_response_count(&self) -> usize {
        self.item_ids.len()
    }
}

/// A page of search results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, XmlElement)]
pub struct ItemView {
    #[xml_serialize(is_attribute, rename = "MaxEntriesReturned")]
    pub page_size: u32,

    #[xml_serialize(is_attribute)]
    pub offset: u32,

    #[xml_serialize(is_attribute)]
    pub base_point: BasePoint,
}

impl ItemView {
    /// The first `page_size` items.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            offset: 0,
            base_point: BasePoint::Beginning,
        }
    }

    pub fn with_offset(self, offset: u32) -> Self {
        Self { offset, ..self }
    }
}

/// Searches folders for items.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/finditem>.
#[derive(Clone, Debug, XmlElement)]
#[xml_serialize(default_ns = MESSAGES_NS_URI)]
pub struct FindItem {
    /// The manner in which to traverse nested folders.
    #[xml_serialize(is_attribute)]
    pub traversal: Traversal,

    /// The desired properties to include in the response.
    pub item_shape: PropertySet,

    #[xml_serialize(rename = "IndexedPageItemView")]
    pub view: Option<ItemView>,

    /// Identifiers for the folders in which to locate items.
    pub parent_folder_ids: Vec<BaseFolderId>,
}

/// The items found in one folder.
#[derive(Clone, Debug, PartialEq)]
pub struct FindItemsResults {
    pub items: Vec<AnyItem>,

    /// The number of items in the folder matching the search.
    pub total_count: u32,
    pub more_available: bool,

    /// The offset of the next page, if there is one.
    pub next_page_offset: Option<u32>,
}

impl Operation for FindItem {
    const NAME: &'static str = "FindItem";
    type Response = FindItemsResults;

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.parent_folder_ids.is_empty(), || {
            "at least one folder to search is required".to_string()
        })?;

        if let Some(view) = &self.view {
            ensure(view.page_size > 0, || {
                "the page size must be greater than zero".to_string()
            })?;
        }

        self.item_shape.validate(version, true)
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<FindItemsResults, Error> {
        let root = message.required_child("RootFolder")?;

        let attribute = |name: &str| -> Result<Option<u32>, Error> {
            root.attribute(name)
                .map(|value| {
                    value.parse().map_err(|_| {
                        Error::UnexpectedXml(format!("invalid `{name}` value `{value}`"))
                    })
                })
                .transpose()
        };

        let includes_last = root
            .attribute("IncludesLastItemInRange")
            .map(|value| value == "true")
            .unwrap_or(true);

        let items = items_of(root)
            .map(|node| AnyItem::from_xml(node, &self.item_shape, true))
            .collect::<Result<_, _>>()?;

        Ok(FindItemsResults {
            items,
            total_count: attribute("TotalItemsInView")?.unwrap_or(0),
            more_available: !includes_last,
            next_page_offset: if includes_last {
                None
            } else {
                attribute("IndexedPagingOffset")?
            },
        })
    }

    fn expected_response_count(&self) -> usize {
        self.parent_folder_ids.len()
    }
}

/// Creates items. Attachments are saved with separate requests once the
/// items exist.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/createitem>.
pub struct CreateItem<'a> {
    pub items: Vec<&'a dyn ServiceObject>,
    pub message_disposition: Option<MessageDisposition>,
    pub saved_item_folder_id: Option<BaseFolderId>,
}

impl XmlElement for CreateItem<'_> {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        self.message_disposition
            .to_attribute_value()
            .map(|value| ("MessageDisposition", value))
            .into_iter()
            .collect()
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        self.saved_item_folder_id
            .write_as_element(writer, "SavedItemFolderId")?;

        write_element(writer, "Items", &[], &[], |writer| {
            for item in &self.items {
                let name = format!("t:{}", item.xml_element_name());
                write_element(writer, &name, &[], &[], |writer| {
                    item.property_bag().write_for_create(writer)
                })?;
            }

            Ok(())
        })
    }
}

impl Operation for CreateItem<'_> {
    const NAME: &'static str = "CreateItem";

    /// The id of the created item, unless it was sent without being saved.
    type Response = Option<ItemId>;

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.items.is_empty(), || {
            "at least one item is required".to_string()
        })?;

        for item in &self.items {
            let bag = item.property_bag();
            ensure(bag.is_new(), || {
                "the item has already been saved, update it instead".to_string()
            })?;
            bag.validate_version(version)?;
        }

        Ok(())
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<Option<ItemId>, Error> {
        items_of(message)
            .next()
            .and_then(|item| item.child("ItemId"))
            .map(ItemId::from_xml)
            .transpose()
    }

    fn expected_response_count(&self) -> usize {
        self.items.len()
    }
}

/// Saves the changes made to an existing item.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/updateitem>.
pub struct UpdateItem<'a> {
    pub item: &'a dyn ServiceObject,
    pub conflict_resolution: ConflictResolution,
    pub message_disposition: Option<MessageDisposition>,
    pub saved_item_folder_id: Option<BaseFolderId>,
}

/// The outcome of an update.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItemResult {
    /// The item returned by the server: the updated item with its new change
    /// key, or a new item the update created, such as the next occurrence of
    /// a completed recurring task.
    pub returned_item: Option<AnyItem>,

    /// The number of properties whose change conflicted with a change made
    /// on the server.
    pub conflict_count: u32,
}

impl XmlElement for UpdateItem<'_> {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn attributes(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        let mut attributes = Vec::new();
        if let Some(value) = self.conflict_resolution.to_attribute_value() {
            attributes.push(("ConflictResolution", value));
        }
        if let Some(value) = self.message_disposition.to_attribute_value() {
            attributes.push(("MessageDisposition", value));
        }

        attributes
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        self.saved_item_folder_id
            .write_as_element(writer, "SavedItemFolderId")?;

        let item_id = self.item.id().ok().flatten();
        let element_name = format!("t:{}", self.item.xml_element_name());

        write_element(writer, "ItemChanges", &[], &[], |writer| {
            write_element(writer, "t:ItemChange", &[], &[], |writer| {
                item_id.write_as_element(writer, "t:ItemId")?;
                write_element(writer, "t:Updates", &[], &[], |writer| {
                    self.item
                        .property_bag()
                        .write_for_update(writer, &element_name)
                })
            })
        })
    }
}

impl Operation for UpdateItem<'_> {
    const NAME: &'static str = "UpdateItem";
    type Response = UpdateItemResult;

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        let bag = self.item.property_bag();
        ensure(!bag.is_new(), || {
            "the item has not been saved yet, create it instead".to_string()
        })?;
        ensure(matches!(self.item.id(), Ok(Some(_))), || {
            "the item id must be loaded to update an item".to_string()
        })?;

        bag.validate_version(version)
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<UpdateItemResult, Error> {
        let returned_item = items_of(message)
            .next()
            .map(|node| AnyItem::from_xml(node, &PropertySet::id_only(), false))
            .transpose()?;

        let conflict_count = match message.child("ConflictResults") {
            Some(results) => results
                .child("Count")
                .map(XmlNode::parse_text)
                .transpose()?
                .unwrap_or(0),
            None => 0,
        };

        Ok(UpdateItemResult {
            returned_item,
            conflict_count,
        })
    }

    fn expected_response_count(&self) -> usize {
        1
    }
}

/// Deletes items.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/deleteitem>.
#[derive(Clone, Debug, XmlElement)]
#[xml_serialize(default_ns = MESSAGES_NS_URI)]
pub struct DeleteItem {
    #[xml_serialize(is_attribute)]
    pub delete_type: DeleteType,

    /// Required when deleting tasks.
    #[xml_serialize(is_attribute)]
    pub affected_task_occurrences: Option<AffectedTaskOccurrences>,

    pub item_ids: Vec<BaseItemId>,
}

impl Operation for DeleteItem {
    const NAME: &'static str = "DeleteItem";
    type Response = ();

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.item_ids.is_empty(), || {
            "at least one item id is required".to_string()
        })
    }

    fn parse_response_message(&self, _message: &XmlNode) -> Result<(), Error> {
        Ok(())
    }

    fn expected_response_count(&self) -> usize {
        self.item_ids.len()
    }
}

/// Sends existing draft messages.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/senditem>.
#[derive(Clone, Debug, XmlElement)]
#[xml_serialize(default_ns = MESSAGES_NS_URI)]
pub struct SendItem {
    #[xml_serialize(is_attribute)]
    pub save_item_to_folder: bool,

    pub item_ids: Vec<BaseItemId>,
    pub saved_item_folder_id: Option<BaseFolderId>,
}

impl Operation for SendItem {
    const NAME: &'static str = "SendItem";
    type Response = ();

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.item_ids.is_empty(), || {
            "at least one item id is required".to_string()
        })?;
        ensure(
            self.save_item_to_folder || self.saved_item_folder_id.is_none(),
            || "a saved item folder requires saving the sent item".to_string(),
        )
    }

    fn parse_response_message(&self, _message: &XmlNode) -> Result<(), Error> {
        Ok(())
    }

    fn expected_response_count(&self) -> usize {
        self.item_ids.len()
    }
}
