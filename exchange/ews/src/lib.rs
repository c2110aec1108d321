/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! A client for Exchange Web Services.
//!
//! Mailbox items are exposed as typed objects backed by a property bag which
//! tracks which properties have been loaded from the server and which have
//! been changed locally. [`ExchangeService`] turns operations on those
//! objects into SOAP requests and maps responses and faults back onto values
//! and [`Error`]s.

/// Attachments of items and the collection tracking their changes.
pub mod attachment;

/// POX autodiscover, resolving the EWS endpoint for an email address.
pub mod autodiscover;

/// Service configuration read from TOML.
pub mod config;

/// The credentials used to authenticate requests, including the Windows
/// Live WS-Trust flow.
pub mod credentials;

mod error;
pub use error::Error;

/// Typed service objects: items, email messages and tasks.
pub mod item;

/// The `net` module is responsible for making requests to the Exchange Web
/// Services API.
pub mod net;

/// The requests supported by the service and the parsing of their responses.
pub mod operations;

/// Property definitions, schemas and the property bag backing service
/// objects.
pub mod property;

/// Recurrence patterns and ranges, with occurrence date computation.
pub mod recurrence;

/// Response messages, response classes and batch results.
pub mod response;

mod service;
pub use service::{ExchangeService, ExchangeServiceBuilder};

/// SOAP envelopes and faults.
pub mod soap;

/// Pull, push and streaming notification subscriptions.
pub mod subscription;

/// Tasks and their recurrence.
pub mod task;

/// Time zone definitions and daylight saving time translation.
pub mod timezone;

/// The `types` module defines the various data structures used for EWS requests
/// and responses.
pub mod types;

/// The `xml` module provides utilities for processing of XML.
pub mod xml;

#[cfg(test)]
pub(crate) mod test_utils;
