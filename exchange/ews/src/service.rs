/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use reqwest::Client;
use url::Url;

use crate::{
    attachment::Attachment,
    config::ServiceConfig,
    credentials::Credentials,
    item::{AnyItem, ItemProperties, ItemType, ServiceObject},
    net::{self, HttpResponse, SOAP_CONTENT_TYPE},
    operations::{
        ensure_version, CreateAttachment, CreateItem, DeleteAttachment, DeleteItem, FindItem,
        FindItemsResults, GetAttachment, GetEvents, GetItem, GetStreamingEvents, ItemView,
        Operation, SendItem, Subscribe, SubscribeResult, SubscriptionKind, Unsubscribe,
        UpdateItem,
    },
    property::{schema, PropertySet, PropertyValue},
    response::{ServiceErrorHandling, ServiceResponse, ServiceResponseCollection},
    soap::{self, ImpersonatedUserId, RequestHeaders, SecurityHeader},
    subscription::{
        GetEventsResults, GetStreamingEventsResults, PullSubscription, PushSubscription,
        StreamingSubscription,
    },
    timezone::TimeZoneDefinition,
    types::{
        AffectedTaskOccurrences, AttachmentId, BaseFolderId, ConflictResolution, DeleteType,
        EventType, ExchangeVersion, ItemId, MessageDisposition, ServerVersionInfo, Traversal,
    },
    Error,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Builds an [`ExchangeService`].
#[derive(Debug)]
pub struct ExchangeServiceBuilder {
    url: String,
    credentials: Credentials,
    version: ExchangeVersion,
    time_zone: Option<TimeZoneDefinition>,
    impersonation: Option<ImpersonatedUserId>,
    user_agent: Option<String>,
    timeout: Duration,
    trace_payloads: bool,
}

impl ExchangeServiceBuilder {
    /// The schema version requests are written for. Defaults to
    /// [`ExchangeVersion::default`].
    pub fn version(self, version: ExchangeVersion) -> Self {
        Self { version, ..self }
    }

    /// The time zone dates are interpreted in by the server, sent with
    /// requests to Exchange 2010 and later.
    pub fn time_zone(self, time_zone: TimeZoneDefinition) -> Self {
        Self {
            time_zone: Some(time_zone),
            ..self
        }
    }

    pub fn impersonate(self, user: ImpersonatedUserId) -> Self {
        Self {
            impersonation: Some(user),
            ..self
        }
    }

    pub fn user_agent(self, user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ..self
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Logs complete request and response documents at trace level.
    pub fn trace_payloads(self, trace_payloads: bool) -> Self {
        Self {
            trace_payloads,
            ..self
        }
    }

    pub fn build(self) -> Result<ExchangeService, Error> {
        let url = Url::parse(&self.url)?;
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("ews-rs/{}", env!("CARGO_PKG_VERSION")));

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .build()?;

        Ok(ExchangeService {
            client,
            url,
            credentials: self.credentials,
            version: self.version,
            time_zone: self.time_zone,
            impersonation: self.impersonation,
            trace_payloads: self.trace_payloads,
            server_info: Mutex::new(None),
        })
    }
}

/// A client for an EWS endpoint.
#[derive(Debug)]
pub struct ExchangeService {
    client: Client,
    url: Url,
    credentials: Credentials,
    version: ExchangeVersion,
    time_zone: Option<TimeZoneDefinition>,
    impersonation: Option<ImpersonatedUserId>,
    trace_payloads: bool,
    server_info: Mutex<Option<ServerVersionInfo>>,
}

impl ExchangeService {
    pub fn builder(url: impl Into<String>, credentials: Credentials) -> ExchangeServiceBuilder {
        ExchangeServiceBuilder {
            url: url.into(),
            credentials,
            version: ExchangeVersion::default(),
            time_zone: None,
            impersonation: None,
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            trace_payloads: false,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, Error> {
        let mut builder = Self::builder(&config.url, config.credentials.clone().into())
            .version(config.version)
            .trace_payloads(config.trace_payloads);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        if let Some(address) = &config.impersonate {
            builder = builder.impersonate(ImpersonatedUserId::smtp_address(address));
        }

        builder.build()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn version(&self) -> ExchangeVersion {
        self.version
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The version of the server which handled the last request.
    pub fn server_info(&self) -> Option<ServerVersionInfo> {
        self.server_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sends an operation and reads its response messages.
    ///
    /// With [`ServiceErrorHandling::ThrowOnError`], the first failed response
    /// message is returned as an error. Otherwise failures are left in the
    /// returned collection.
    pub async fn execute<O: Operation>(
        &self,
        operation: &O,
    ) -> Result<ServiceResponseCollection<O::Response>, Error> {
        ensure_version(O::NAME, operation.minimum_version(), self.version)?;
        operation.validate(self.version)?;

        let response = match self.send(operation).await {
            Err(Error::Unauthorized) => match &self.credentials {
                Credentials::WindowsLive(credentials) => {
                    log::warn!("{} was rejected, requesting a new security token", O::NAME);
                    credentials.invalidate();
                    self.send(operation).await?
                }
                _ => return Err(Error::Unauthorized),
            },
            response => response?,
        };

        let soap_response = match soap::parse_response(&response.body) {
            Ok(soap_response) => soap_response,
            Err(err @ (Error::RequestFault(_) | Error::ServerBusy { .. })) => return Err(err),
            Err(_) if !response.status.is_success() => {
                return Err(Error::HttpStatus {
                    status: response.status,
                    body: response.body_text(),
                })
            }
            Err(err) => return Err(err),
        };

        if let Some(server_info) = soap_response.server_version {
            *self
                .server_info
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(server_info);
        }

        let responses = operation.parse_response(&soap_response.body)?;
        if responses.len() != operation.expected_response_count() {
            return Err(Error::UnexpectedXml(format!(
                "{} returned {} response messages, expected {}",
                O::NAME,
                responses.len(),
                operation.expected_response_count()
            )));
        }

        if operation.error_handling() == ServiceErrorHandling::ThrowOnError {
            if let Some(error) = responses.errors().next() {
                return Err(Error::from_response_error(error.clone()));
            }
        }

        Ok(responses)
    }

    async fn send<O: Operation>(&self, operation: &O) -> Result<HttpResponse, Error> {
        let token = match &self.credentials {
            Credentials::WindowsLive(credentials) => Some(
                credentials
                    .security_token(&self.client, &self.url, self.trace_payloads)
                    .await?,
            ),
            _ => None,
        };

        let headers = RequestHeaders {
            time_zone: self.time_zone.as_ref(),
            impersonation: self.impersonation.as_ref(),
            security: token.as_ref().map(|token| SecurityHeader {
                to: self.url.as_str(),
                token,
            }),
            ..RequestHeaders::new(self.version)
        };
        let body = soap::write_request(operation, &headers)?;

        log::debug!("sending {} request to {}", O::NAME, self.url);
        net::post(
            &self.client,
            &self.url,
            SOAP_CONTENT_TYPE,
            Some(&self.credentials),
            body,
            self.trace_payloads,
        )
        .await
    }

    /// Loads an item and converts it to `T`.
    pub async fn bind_to_item<T: ItemType>(
        &self,
        id: &ItemId,
        property_set: &PropertySet,
    ) -> Result<T, Error> {
        let request = GetItem {
            item_shape: property_set.clone(),
            item_ids: vec![id.into()],
        };

        T::from_any(self.execute(&request).await?.into_single()?)
    }

    /// Loads the properties in `property_set` into an existing item,
    /// replacing local values of the same properties.
    pub async fn load_properties<T: ServiceObject>(
        &self,
        item: &mut T,
        property_set: &PropertySet,
    ) -> Result<(), Error> {
        let id = item.id()?.cloned().ok_or_else(|| {
            Error::Validation("properties can only be loaded for saved items".to_string())
        })?;

        let request = GetItem {
            item_shape: property_set.clone(),
            item_ids: vec![id.into()],
        };
        let loaded = self.execute(&request).await?.into_single()?;
        item.property_bag_mut()
            .merge_loaded(loaded.into_property_bag());

        Ok(())
    }

    /// Gets a page of the items directly in a folder.
    pub async fn find_items(
        &self,
        folder: impl Into<BaseFolderId>,
        view: ItemView,
        property_set: &PropertySet,
    ) -> Result<FindItemsResults, Error> {
        let request = FindItem {
            traversal: Traversal::Shallow,
            item_shape: property_set.clone(),
            view: Some(view),
            parent_folder_ids: vec![folder.into()],
        };

        self.execute(&request).await?.into_single()
    }

    /// Saves a new item, then its attachments.
    ///
    /// The item goes to `parent_folder`, or to the default folder of its
    /// type. Messages are saved as drafts unless `message_disposition` says
    /// otherwise; a message with attachments is saved before it is sent.
    /// Sent copies are kept in `parent_folder`, or in Sent Items.
    pub async fn create_item<T: ServiceObject>(
        &self,
        item: &mut T,
        parent_folder: Option<BaseFolderId>,
        message_disposition: Option<MessageDisposition>,
    ) -> Result<(), Error> {
        if let Ok(Some(attachments)) = item.attachments() {
            attachments.validate(self.version)?;
        }

        let folder = parent_folder
            .clone()
            .or_else(|| item.default_folder().map(BaseFolderId::from));
        let message_disposition = message_disposition.or_else(|| {
            (item.xml_element_name() == "Message").then_some(MessageDisposition::SaveOnly)
        });

        let deferred_send = has_attachment_changes(&*item)
            && matches!(
                message_disposition,
                Some(MessageDisposition::SendOnly | MessageDisposition::SendAndSaveCopy)
            );
        let create_disposition = if deferred_send {
            Some(MessageDisposition::SaveOnly)
        } else {
            message_disposition
        };

        let id = {
            let request = CreateItem {
                items: vec![&*item as &dyn ServiceObject],
                message_disposition: create_disposition,
                // Sent copies go to Sent Items unless a folder was given.
                saved_item_folder_id: match create_disposition {
                    Some(MessageDisposition::SendOnly) => None,
                    Some(MessageDisposition::SendAndSaveCopy) => parent_folder.clone(),
                    _ => folder,
                },
            };

            self.execute(&request).await?.into_single()?
        };

        let bag = item.property_bag_mut();
        if let Some(id) = id {
            bag.set_loaded(&schema::item::ITEM_ID, PropertyValue::ItemId(id));
        }
        bag.mark_saved();

        if has_attachment_changes(&*item) {
            self.save_attachment_changes(item).await?;
        }

        if deferred_send {
            let id = item.id()?.cloned().ok_or_else(|| {
                Error::UnexpectedXml("the saved message has no id".to_string())
            })?;
            let save_copy = message_disposition == Some(MessageDisposition::SendAndSaveCopy);

            self.send_item(&id, save_copy, parent_folder.filter(|_| save_copy))
                .await?;
        }

        Ok(())
    }

    /// Saves the changes made to an existing item, then its attachment
    /// changes.
    ///
    /// Returns the item the server created as a result of the update, if it
    /// is not the updated item itself, e.g. the next occurrence of a
    /// recurring task marked complete.
    pub async fn update_item<T: ServiceObject>(
        &self,
        item: &mut T,
        conflict_resolution: ConflictResolution,
        message_disposition: Option<MessageDisposition>,
    ) -> Result<Option<AnyItem>, Error> {
        let message_disposition = message_disposition.or_else(|| {
            (item.xml_element_name() == "Message").then_some(MessageDisposition::SaveOnly)
        });
        let mut created = None;

        if item.property_bag().is_dirty() {
            let result = {
                let request = UpdateItem {
                    item: &*item,
                    conflict_resolution,
                    message_disposition,
                    saved_item_folder_id: None,
                };

                self.execute(&request).await?.into_single()?
            };

            if result.conflict_count > 0 {
                log::warn!(
                    "update of {} conflicted with {} server changes",
                    item.xml_element_name(),
                    result.conflict_count
                );
            }

            let current_id = item.id()?.map(|id| id.id.clone());
            if let Some(returned) = result.returned_item {
                let returned_id = returned.id()?.cloned();
                match returned_id {
                    Some(id) if Some(&id.id) == current_id.as_ref() => item
                        .property_bag_mut()
                        .set_loaded(&schema::item::ITEM_ID, PropertyValue::ItemId(id)),
                    Some(_) => created = Some(returned),
                    None => {}
                }
            }

            item.property_bag_mut().mark_saved();
        }

        if has_attachment_changes(&*item) {
            self.save_attachment_changes(item).await?;
        }

        Ok(created)
    }

    /// Deletes and creates attachments after the owning item was saved,
    /// refreshing the owner's change key.
    ///
    /// Attachments the server rejected stay unsaved and are reported as
    /// [`Error::Batch`].
    async fn save_attachment_changes<T: ServiceObject>(&self, item: &mut T) -> Result<(), Error> {
        let parent_id = item.id()?.cloned().ok_or_else(|| {
            Error::Validation("attachments can only be saved on saved items".to_string())
        })?;

        let (removed, unsaved) = {
            let attachments = item.attachments_mut()?;
            (attachments.take_removed(), attachments.unsaved())
        };

        let mut change_key = None;
        let mut errors = Vec::new();

        // Attachments removed before they were saved have no id and nothing
        // to delete.
        let removed: Vec<(AttachmentId, Attachment)> = removed
            .into_iter()
            .filter_map(|attachment| Some((attachment.id()?.clone(), attachment)))
            .collect();
        if !removed.is_empty() {
            let request = DeleteAttachment {
                attachment_ids: removed.iter().map(|(id, _)| id.clone()).collect(),
            };

            let responses = match self.execute(&request).await {
                Ok(responses) => responses,
                Err(err) => {
                    item.attachments_mut()?
                        .requeue_removed(removed.into_iter().map(|(_, attachment)| attachment));
                    return Err(err);
                }
            };

            let mut failed = Vec::new();
            for ((_, attachment), response) in removed.into_iter().zip(responses) {
                match response {
                    ServiceResponse::Success(root) | ServiceResponse::Warning { value: root, .. } => {
                        if let Some(root) = root {
                            change_key = root.change_key.or(change_key);
                        }
                    }
                    ServiceResponse::Error(error) => {
                        failed.push(attachment);
                        errors.push(error);
                    }
                }
            }

            if !failed.is_empty() {
                item.attachments_mut()?.requeue_removed(failed);
            }
        }

        if !unsaved.is_empty() {
            let (indices, attachments): (Vec<usize>, Vec<Attachment>) =
                unsaved.into_iter().unzip();
            let request = CreateAttachment {
                parent_item_id: parent_id.clone(),
                attachments,
            };
            let responses = self.execute(&request).await?;

            let collection = item.attachments_mut()?;
            for (index, response) in indices.into_iter().zip(responses) {
                match response {
                    ServiceResponse::Success(id) | ServiceResponse::Warning { value: id, .. } => {
                        change_key = id.root_item_change_key.clone().or(change_key);
                        collection.mark_saved(index, id);
                    }
                    ServiceResponse::Error(error) => errors.push(error),
                }
            }
        }

        if let Some(change_key) = change_key {
            item.property_bag_mut().set_loaded(
                &schema::item::ITEM_ID,
                PropertyValue::ItemId(ItemId::with_change_key(parent_id.id, change_key)),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch(errors))
        }
    }

    /// Deletes an item. `affected_task_occurrences` is required for tasks.
    pub async fn delete_item(
        &self,
        item_id: &ItemId,
        delete_type: DeleteType,
        affected_task_occurrences: Option<AffectedTaskOccurrences>,
    ) -> Result<(), Error> {
        let request = DeleteItem {
            delete_type,
            affected_task_occurrences,
            item_ids: vec![item_id.into()],
        };

        self.execute(&request).await?.into_single()
    }

    /// Sends a saved message, keeping a copy in `saved_item_folder` (or Sent
    /// Items) when `save_copy` is set.
    pub async fn send_item(
        &self,
        item_id: &ItemId,
        save_copy: bool,
        saved_item_folder: Option<BaseFolderId>,
    ) -> Result<(), Error> {
        let request = SendItem {
            save_item_to_folder: save_copy,
            item_ids: vec![item_id.into()],
            saved_item_folder_id: saved_item_folder,
        };

        self.execute(&request).await?.into_single()
    }

    /// Loads attachments with their content.
    pub async fn get_attachments(&self, ids: &[AttachmentId]) -> Result<Vec<Attachment>, Error> {
        let request = GetAttachment {
            attachment_ids: ids.to_vec(),
        };

        self.execute(&request).await?.into_results()
    }

    async fn subscribe(&self, request: Subscribe) -> Result<SubscribeResult, Error> {
        self.execute(&request).await?.into_single()
    }

    /// Subscribes to events in `folder_ids`, fetched with
    /// [`PullSubscription::get_events`]. The subscription expires when it is
    /// not polled for `timeout` minutes.
    pub async fn subscribe_to_pull_notifications(
        &self,
        folder_ids: Vec<BaseFolderId>,
        timeout: u32,
        watermark: Option<String>,
        event_types: Vec<EventType>,
    ) -> Result<PullSubscription, Error> {
        self.pull_subscription(folder_ids, false, timeout, watermark, event_types)
            .await
    }

    pub async fn subscribe_to_pull_notifications_on_all_folders(
        &self,
        timeout: u32,
        watermark: Option<String>,
        event_types: Vec<EventType>,
    ) -> Result<PullSubscription, Error> {
        self.pull_subscription(Vec::new(), true, timeout, watermark, event_types)
            .await
    }

    async fn pull_subscription(
        &self,
        folder_ids: Vec<BaseFolderId>,
        subscribe_to_all_folders: bool,
        timeout: u32,
        watermark: Option<String>,
        event_types: Vec<EventType>,
    ) -> Result<PullSubscription, Error> {
        let result = self
            .subscribe(Subscribe {
                kind: SubscriptionKind::Pull { timeout },
                folder_ids,
                subscribe_to_all_folders,
                event_types,
                watermark,
            })
            .await?;

        let watermark = result.watermark.ok_or_else(|| {
            Error::UnexpectedXml("pull subscription was created without a watermark".to_string())
        })?;

        Ok(PullSubscription {
            id: result.subscription_id,
            watermark,
            more_events_available: false,
        })
    }

    /// Subscribes to events in `folder_ids`, posted by the server to `url`.
    pub async fn subscribe_to_push_notifications(
        &self,
        folder_ids: Vec<BaseFolderId>,
        url: &Url,
        status_frequency: u32,
        watermark: Option<String>,
        event_types: Vec<EventType>,
    ) -> Result<PushSubscription, Error> {
        self.push_subscription(folder_ids, false, url, status_frequency, watermark, event_types)
            .await
    }

    pub async fn subscribe_to_push_notifications_on_all_folders(
        &self,
        url: &Url,
        status_frequency: u32,
        watermark: Option<String>,
        event_types: Vec<EventType>,
    ) -> Result<PushSubscription, Error> {
        self.push_subscription(Vec::new(), true, url, status_frequency, watermark, event_types)
            .await
    }

    async fn push_subscription(
        &self,
        folder_ids: Vec<BaseFolderId>,
        subscribe_to_all_folders: bool,
        url: &Url,
        status_frequency: u32,
        watermark: Option<String>,
        event_types: Vec<EventType>,
    ) -> Result<PushSubscription, Error> {
        let result = self
            .subscribe(Subscribe {
                kind: SubscriptionKind::Push {
                    url: url.to_string(),
                    status_frequency,
                },
                folder_ids,
                subscribe_to_all_folders,
                event_types,
                watermark,
            })
            .await?;

        Ok(PushSubscription {
            id: result.subscription_id,
            watermark: result.watermark,
        })
    }

    /// Subscribes to events in `folder_ids`, delivered through
    /// [`StreamingSubscription::get_events`].
    pub async fn subscribe_to_streaming_notifications(
        &self,
        folder_ids: Vec<BaseFolderId>,
        event_types: Vec<EventType>,
    ) -> Result<StreamingSubscription, Error> {
        self.streaming_subscription(folder_ids, false, event_types)
            .await
    }

    pub async fn subscribe_to_streaming_notifications_on_all_folders(
        &self,
        event_types: Vec<EventType>,
    ) -> Result<StreamingSubscription, Error> {
        self.streaming_subscription(Vec::new(), true, event_types)
            .await
    }

    async fn streaming_subscription(
        &self,
        folder_ids: Vec<BaseFolderId>,
        subscribe_to_all_folders: bool,
        event_types: Vec<EventType>,
    ) -> Result<StreamingSubscription, Error> {
        let result = self
            .subscribe(Subscribe {
                kind: SubscriptionKind::Streaming,
                folder_ids,
                subscribe_to_all_folders,
                event_types,
                watermark: None,
            })
            .await?;

        Ok(StreamingSubscription {
            id: result.subscription_id,
        })
    }

    /// Fetches the events of a pull subscription since `watermark`.
    pub async fn get_events(
        &self,
        subscription_id: &str,
        watermark: &str,
    ) -> Result<GetEventsResults, Error> {
        let request = GetEvents {
            subscription_id: subscription_id.to_string(),
            watermark: watermark.to_string(),
        };

        self.execute(&request).await?.into_single()
    }

    /// Reads the events of streaming subscriptions from one response,
    /// waiting at most `connection_timeout` minutes.
    pub async fn get_streaming_events(
        &self,
        subscription_ids: &[String],
        connection_timeout: u32,
    ) -> Result<GetStreamingEventsResults, Error> {
        let request = GetStreamingEvents {
            subscription_ids: subscription_ids.to_vec(),
            connection_timeout,
        };

        self.execute(&request).await?.into_single()
    }

    pub async fn unsubscribe(&self, subscription_id: &str) -> Result<(), Error> {
        let request = Unsubscribe {
            subscription_id: subscription_id.to_string(),
        };

        self.execute(&request).await?.into_single()
    }
}

fn has_attachment_changes<T: ServiceObject + ?Sized>(item: &T) -> bool {
    matches!(item.attachments(), Ok(Some(attachments)) if attachments.has_unprocessed_changes())
}
