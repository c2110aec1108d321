/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

mod bag;
pub use bag::PropertyBag;

mod definition;
pub use definition::{PropertyDefinition, PropertyFlags, PropertyKind};

pub mod schema;
pub use schema::Schema;

mod set;
pub use set::PropertySet;

mod value;
pub use value::PropertyValue;
