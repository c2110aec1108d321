/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Value types shared by requests, responses and service objects.

mod common;
pub use common::*;

mod date_time;
pub use date_time::*;

mod ids;
pub use ids::*;

mod mailbox;
pub use mailbox::*;

mod response_code;
pub use response_code::ResponseCode;

mod version;
pub use version::*;
