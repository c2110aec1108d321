/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use strum::{AsRefStr, Display, EnumString};

use crate::{
    soap,
    types::{DateTime, EventType, FolderId, ItemId},
    xml::{write_element, write_text_element, XmlNode, MESSAGES_NS_URI},
    Error, ExchangeService,
};

/// A subscription whose events are fetched by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullSubscription {
    pub id: String,

    /// The position in the event stream events are fetched from.
    pub watermark: String,
    pub more_events_available: bool,
}

impl PullSubscription {
    /// Fetches the events since the last call and advances the watermark.
    pub async fn get_events(&mut self, service: &ExchangeService) -> Result<GetEventsResults, Error> {
        let results = service.get_events(&self.id, &self.watermark).await?;

        self.watermark = results.new_watermark.clone();
        self.more_events_available = results.more_events_available;

        Ok(results)
    }

    pub async fn unsubscribe(self, service: &ExchangeService) -> Result<(), Error> {
        service.unsubscribe(&self.id).await
    }
}

/// A subscription whose events the server posts to a callback URL.
///
/// See [`parse_push_notification`] and [`push_notification_response`] for
/// handling the requests the server sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushSubscription {
    pub id: String,
    pub watermark: Option<String>,
}

/// A subscription whose events are delivered over a held-open connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamingSubscription {
    pub id: String,
}

impl StreamingSubscription {
    /// Waits up to `connection_timeout` minutes for events.
    pub async fn get_events(
        &self,
        service: &ExchangeService,
        connection_timeout: u32,
    ) -> Result<GetStreamingEventsResults, Error> {
        service
            .get_streaming_events(std::slice::from_ref(&self.id), connection_timeout)
            .await
    }

    pub async fn unsubscribe(self, service: &ExchangeService) -> Result<(), Error> {
        service.unsubscribe(&self.id).await
    }
}

/// A change to an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemEvent {
    pub event_type: EventType,
    pub timestamp: DateTime,
    pub watermark: Option<String>,
    pub item_id: ItemId,
    pub parent_folder_id: FolderId,

    /// For moves and copies, where the item came from.
    pub old_item_id: Option<ItemId>,
    pub old_parent_folder_id: Option<FolderId>,
}

/// A change to a folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderEvent {
    pub event_type: EventType,
    pub timestamp: DateTime,
    pub watermark: Option<String>,
    pub folder_id: FolderId,
    pub parent_folder_id: FolderId,
    pub old_folder_id: Option<FolderId>,
    pub old_parent_folder_id: Option<FolderId>,

    /// Reported with modification events.
    pub unread_count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationEvent {
    Item(ItemEvent),
    Folder(FolderEvent),
}

impl NotificationEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            NotificationEvent::Item(event) => event.event_type,
            NotificationEvent::Folder(event) => event.event_type,
        }
    }

    pub fn timestamp(&self) -> DateTime {
        match self {
            NotificationEvent::Item(event) => event.timestamp,
            NotificationEvent::Folder(event) => event.timestamp,
        }
    }

    /// Reads an event element, returning `None` for status events.
    fn from_xml(node: &XmlNode) -> Result<Option<Self>, Error> {
        let event_type: EventType = node.name.parse().map_err(|_| {
            Error::UnexpectedXml(format!("unknown notification event `{}`", node.name))
        })?;

        if event_type == EventType::StatusEvent {
            return Ok(None);
        }

        let timestamp = DateTime::parse(&node.required_child("TimeStamp")?.text)?;
        let watermark = node.child_text("Watermark").map(str::to_string);
        let folder_id = |name: &str| node.child(name).map(FolderId::from_xml).transpose();
        let parent_folder_id = folder_id("ParentFolderId")?.ok_or_else(|| {
            Error::UnexpectedXml(format!("`{}` has no parent folder id", node.name))
        })?;

        let event = match node.child("ItemId") {
            Some(item_id) => NotificationEvent::Item(ItemEvent {
                event_type,
                timestamp,
                watermark,
                item_id: ItemId::from_xml(item_id)?,
                parent_folder_id,
                old_item_id: node.child("OldItemId").map(ItemId::from_xml).transpose()?,
                old_parent_folder_id: folder_id("OldParentFolderId")?,
            }),

            None => NotificationEvent::Folder(FolderEvent {
                event_type,
                timestamp,
                watermark,
                folder_id: folder_id("FolderId")?.ok_or_else(|| {
                    Error::UnexpectedXml(format!("`{}` has neither item nor folder id", node.name))
                })?,
                parent_folder_id,
                old_folder_id: folder_id("OldFolderId")?,
                old_parent_folder_id: folder_id("OldParentFolderId")?,
                unread_count: node
                    .child("UnreadCount")
                    .map(XmlNode::parse_text)
                    .transpose()?,
            }),
        };

        Ok(Some(event))
    }
}

/// The events of one subscription returned by a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetEventsResults {
    pub subscription_id: String,
    pub previous_watermark: Option<String>,

    /// The watermark to fetch the following events from.
    pub new_watermark: String,
    pub more_events_available: bool,
    pub events: Vec<NotificationEvent>,
}

impl GetEventsResults {
    /// Reads a `Notification` element.
    pub(crate) fn from_notification(node: &XmlNode) -> Result<Self, Error> {
        let previous_watermark = node.child_text("PreviousWatermark").map(str::to_string);

        let mut new_watermark = previous_watermark.clone().unwrap_or_default();
        let mut events = Vec::new();
        for child in &node.children {
            if !child.name.ends_with("Event") {
                continue;
            }

            // Status events carry a watermark too.
            if let Some(watermark) = child.child_text("Watermark") {
                new_watermark = watermark.to_string();
            }

            if let Some(event) = NotificationEvent::from_xml(child)? {
                events.push(event);
            }
        }

        Ok(Self {
            subscription_id: node.required_child("SubscriptionId")?.text.clone(),
            previous_watermark,
            new_watermark,
            more_events_available: node
                .child("MoreEvents")
                .map(XmlNode::parse_bool)
                .transpose()?
                .unwrap_or(false),
            events,
        })
    }

    pub fn item_events(&self) -> impl Iterator<Item = &ItemEvent> {
        self.events.iter().filter_map(|event| match event {
            NotificationEvent::Item(event) => Some(event),
            _ => None,
        })
    }

    pub fn folder_events(&self) -> impl Iterator<Item = &FolderEvent> {
        self.events.iter().filter_map(|event| match event {
            NotificationEvent::Folder(event) => Some(event),
            _ => None,
        })
    }
}

/// Whether a streaming connection stays open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum ConnectionStatus {
    OK,
    Closed,
}

/// The content of one `GetStreamingEvents` response envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetStreamingEventsResults {
    pub notifications: Vec<GetEventsResults>,
    pub connection_status: Option<ConnectionStatus>,

    /// Subscriptions the server could not serve, e.g. because they expired.
    pub error_subscription_ids: Vec<String>,
}

impl GetStreamingEventsResults {
    pub(crate) fn from_message(message: &XmlNode) -> Result<Self, Error> {
        let notifications = message
            .child("Notifications")
            .map(|notifications| {
                notifications
                    .children_named("Notification")
                    .map(GetEventsResults::from_notification)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let connection_status = message
            .child("ConnectionStatus")
            .map(XmlNode::parse_text)
            .transpose()?;

        let error_subscription_ids = message
            .child("ErrorSubscriptionIds")
            .map(|ids| {
                ids.children_named("SubscriptionId")
                    .map(|id| id.text.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            notifications,
            connection_status,
            error_subscription_ids,
        })
    }
}

/// What a push notification listener tells the server after receiving a
/// notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum SubscriptionStatus {
    /// Keep sending notifications.
    OK,
    Unsubscribe,
}

/// Reads the notification in a `SendNotification` request the server posted
/// to a push subscription's callback URL.
pub fn parse_push_notification(document: &[u8]) -> Result<GetEventsResults, Error> {
    let response = soap::parse_response(document)?;
    if response.body.name != "SendNotification" {
        return Err(Error::UnexpectedXml(format!(
            "expected `SendNotification`, got `{}`",
            response.body.name
        )));
    }

    let notification = response.body.find_descendant("Notification").ok_or_else(|| {
        Error::UnexpectedXml("push notification carries no `Notification`".to_string())
    })?;

    GetEventsResults::from_notification(notification)
}

/// Builds the reply to a `SendNotification` request.
pub fn push_notification_response(status: SubscriptionStatus) -> Result<Vec<u8>, Error> {
    soap::write_envelope(|writer| {
        write_element(
            writer,
            "SendNotificationResult",
            &[(None, MESSAGES_NS_URI)],
            &[],
            |writer| write_text_element(writer, "SubscriptionStatus", status.as_ref()),
        )
    })
}
