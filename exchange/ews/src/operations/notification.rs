/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{borrow::Cow, io::Write};

use xml::EventWriter;

use super::{ensure, ensure_version, Operation};
use crate::{
    subscription::{GetEventsResults, GetStreamingEventsResults},
    types::{BaseFolderId, EventType, ExchangeVersion},
    xml::{
        write_element, write_text_element, Namespace, WriteResult, XmlElement, XmlNode,
        MESSAGES_NS_URI,
    },
    Error,
};

/// The longest lifetime, in minutes, of a pull subscription between requests
/// and the longest interval between push status notifications.
const MAX_SUBSCRIPTION_MINUTES: u32 = 1440;

/// The longest time, in minutes, a streaming connection is held open.
const MAX_STREAMING_CONNECTION_MINUTES: u32 = 30;

/// How the server delivers the events of a new subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// The client polls with `GetEvents`. The subscription expires if it is
    /// not polled for `timeout` minutes.
    Pull { timeout: u32 },

    /// The server posts notifications to `url`, sending a status event every
    /// `status_frequency` minutes when nothing happened.
    Push { url: String, status_frequency: u32 },

    /// The client holds a `GetStreamingEvents` connection open.
    Streaming,
}

/// Creates a subscription to events in a set of folders or in the whole
/// mailbox.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/subscribe>.
#[derive(Clone, Debug)]
pub struct Subscribe {
    pub kind: SubscriptionKind,

    /// Empty when subscribing to all folders.
    pub folder_ids: Vec<BaseFolderId>,
    pub subscribe_to_all_folders: bool,
    pub event_types: Vec<EventType>,

    /// Resumes a previous subscription from this point. Not supported for
    /// streaming subscriptions.
    pub watermark: Option<String>,
}

impl Subscribe {
    fn request_element(&self) -> &'static str {
        match self.kind {
            SubscriptionKind::Pull { .. } => "PullSubscriptionRequest",
            SubscriptionKind::Push { .. } => "PushSubscriptionRequest",
            SubscriptionKind::Streaming => "StreamingSubscriptionRequest",
        }
    }
}

impl XmlElement for Subscribe {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        let attributes: Vec<(&str, Cow<str>)> = if self.subscribe_to_all_folders {
            vec![("SubscribeToAllFolders", Cow::Borrowed("true"))]
        } else {
            Vec::new()
        };

        write_element(writer, self.request_element(), &[], &attributes, |writer| {
            if !self.folder_ids.is_empty() {
                self.folder_ids.write_as_element(writer, "t:FolderIds")?;
            }

            write_element(writer, "t:EventTypes", &[], &[], |writer| {
                for event_type in &self.event_types {
                    write_text_element(writer, "t:EventType", event_type.as_ref())?;
                }

                Ok(())
            })?;

            if let Some(watermark) = &self.watermark {
                write_text_element(writer, "t:Watermark", watermark)?;
            }

            match &self.kind {
                SubscriptionKind::Pull { timeout } => {
                    write_text_element(writer, "t:Timeout", &timeout.to_string())
                }
                SubscriptionKind::Push {
                    url,
                    status_frequency,
                } => {
                    write_text_element(writer, "t:StatusFrequency", &status_frequency.to_string())?;
                    write_text_element(writer, "t:URL", url)
                }
                SubscriptionKind::Streaming => Ok(()),
            }
        })
    }
}

/// The identity of a new subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeResult {
    pub subscription_id: String,

    /// Absent for streaming subscriptions.
    pub watermark: Option<String>,
}

impl Operation for Subscribe {
    const NAME: &'static str = "Subscribe";
    type Response = SubscribeResult;

    fn minimum_version(&self) -> ExchangeVersion {
        match (&self.kind, self.subscribe_to_all_folders) {
            (SubscriptionKind::Streaming, _) => ExchangeVersion::Exchange2010_SP1,
            (_, true) => ExchangeVersion::Exchange2010,
            _ => ExchangeVersion::Exchange2007_SP1,
        }
    }

    fn validate(&self, version: ExchangeVersion) -> Result<(), Error> {
        if self.subscribe_to_all_folders {
            ensure_version("subscribing to all folders", ExchangeVersion::Exchange2010, version)?;
            ensure(self.folder_ids.is_empty(), || {
                "folder ids cannot be given when subscribing to all folders".to_string()
            })?;
        } else {
            ensure(!self.folder_ids.is_empty(), || {
                "at least one folder id is required".to_string()
            })?;
        }

        ensure(!self.event_types.is_empty(), || {
            "at least one event type is required".to_string()
        })?;
        ensure(!self.event_types.contains(&EventType::StatusEvent), || {
            "status events cannot be subscribed to".to_string()
        })?;

        match &self.kind {
            SubscriptionKind::Pull { timeout } => ensure(
                (1..=MAX_SUBSCRIPTION_MINUTES).contains(timeout),
                || format!("timeout must be between 1 and {MAX_SUBSCRIPTION_MINUTES} minutes"),
            ),

            SubscriptionKind::Push {
                url,
                status_frequency,
            } => {
                ensure(!url.is_empty(), || "a callback URL is required".to_string())?;
                ensure(
                    (1..=MAX_SUBSCRIPTION_MINUTES).contains(status_frequency),
                    || {
                        format!(
                            "status frequency must be between 1 and {MAX_SUBSCRIPTION_MINUTES} minutes"
                        )
                    },
                )
            }

            SubscriptionKind::Streaming => {
                ensure_version(
                    "streaming subscriptions",
                    ExchangeVersion::Exchange2010_SP1,
                    version,
                )?;
                ensure(self.watermark.is_none(), || {
                    "streaming subscriptions cannot resume from a watermark".to_string()
                })
            }
        }
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<SubscribeResult, Error> {
        Ok(SubscribeResult {
            subscription_id: message.required_child("SubscriptionId")?.text.clone(),
            watermark: message.child_text("Watermark").map(str::to_string),
        })
    }

    fn expected_response_count(&self) -> usize {
        1
    }
}

/// Fetches the events of a pull subscription.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getevents>.
#[derive(Clone, Debug, XmlElement)]
#[xml_serialize(default_ns = MESSAGES_NS_URI)]
pub struct GetEvents {
    pub subscription_id: String,
    pub watermark: String,
}

impl Operation for GetEvents {
    const NAME: &'static str = "GetEvents";
    type Response = GetEventsResults;

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.subscription_id.is_empty(), || {
            "a subscription id is required".to_string()
        })?;
        ensure(!self.watermark.is_empty(), || "a watermark is required".to_string())
    }

    fn parse_response_message(&self, message: &XmlNode) -> Result<GetEventsResults, Error> {
        GetEventsResults::from_notification(message.required_child("Notification")?)
    }

    fn expected_response_count(&self) -> usize {
        1
    }
}

/// Waits on a connection for the events of streaming subscriptions.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/getstreamingevents>.
#[derive(Clone, Debug)]
pub struct GetStreamingEvents {
    pub subscription_ids: Vec<String>,

    /// In minutes.
    pub connection_timeout: u32,
}

impl XmlElement for GetStreamingEvents {
    fn namespaces(&self) -> &'static [Namespace] {
        &[(None, MESSAGES_NS_URI)]
    }

    fn write_children<W: Write>(&self, writer: &mut EventWriter<W>) -> WriteResult {
        write_element(writer, "SubscriptionIds", &[], &[], |writer| {
            for id in &self.subscription_ids {
                write_text_element(writer, "t:SubscriptionId", id)?;
            }

            Ok(())
        })?;

        write_text_element(
            writer,
            "ConnectionTimeout",
            &self.connection_timeout.to_string(),
        )
    }
}

impl Operation for GetStreamingEvents {
    const NAME: &'static str = "GetStreamingEvents";
    type Response = GetStreamingEventsResults;

    fn minimum_version(&self) -> ExchangeVersion {
        ExchangeVersion::Exchange2010_SP1
    }

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.subscription_ids.is_empty(), || {
            "at least one subscription id is required".to_string()
        })?;
        ensure(
            (1..=MAX_STREAMING_CONNECTION_MINUTES).contains(&self.connection_timeout),
            || {
                format!(
                    "connection timeout must be between 1 and {MAX_STREAMING_CONNECTION_MINUTES} minutes"
                )
            },
        )
    }

    fn parse_response_message(
        &self,
        message: &XmlNode,
    ) -> Result<GetStreamingEventsResults, Error> {
        GetStreamingEventsResults::from_message(message)
    }

    fn expected_response_count(&self) -> usize {
        1
    }
}

/// Ends a pull or streaming subscription.
///
/// See <https://learn.microsoft.com/en-us/exchange/client-developer/web-service-reference/unsubscribe>.
#[derive(Clone, Debug, XmlElement)]
#[xml_serialize(default_ns = MESSAGES_NS_URI)]
pub struct Unsubscribe {
    pub subscription_id: String,
}

impl Operation for Unsubscribe {
    const NAME: &'static str = "Unsubscribe";
    type Response = ();

    fn validate(&self, _version: ExchangeVersion) -> Result<(), Error> {
        ensure(!self.subscription_id.is_empty(), || {
            "a subscription id is required".to_string()
        })
    }

    fn parse_response_message(&self, _message: &XmlNode) -> Result<(), Error> {
        Ok(())
    }

    fn expected_response_count(&self) -> usize {
        1
    }
}
