/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Derive macros generating the `ews::xml` serialization traits.
//!
//! Generated code refers to `crate::xml`, so these derives are only usable
//! from within the `ews` crate.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod xml_attribute;
use xml_attribute::write_attribute_derivation;

mod xml_element;
use xml_element::{
    write_element_derivation_for_enum, write_element_derivation_for_struct, ComponentOptions,
};

/// Derives `XmlAttribute` for a unit enum, using each variant's name as the
/// attribute value.
#[proc_macro_derive(XmlAttribute)]
pub fn derive_xml_attribute(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match input.data {
        syn::Data::Enum(enum_input) => write_attribute_derivation(input.ident, enum_input),

        _ => panic!("`XmlAttribute` derivation is only supported for unit enums"),
    }
}

/// Derives `XmlElement`.
///
/// Container options: `default_ns = EXPR`, `ns = ("prefix", EXPR)` and
/// `ns_prefix = "prefix"` (applied to enum variant element names).
///
/// Field options: `is_attribute`, `flatten`, `ns_prefix = "prefix"` and
/// `rename = "Name"`. Names default to the PascalCase form of the field.
#[proc_macro_derive(XmlElement, attributes(xml_serialize))]
pub fn derive_xml_element(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let options =
        ComponentOptions::try_from(input.attrs).expect("Unable to parse component attributes");

    match input.data {
        syn::Data::Struct(struct_input) => {
            write_element_derivation_for_struct(input.ident, input.generics, struct_input, options)
        }
        syn::Data::Enum(enum_input) => {
            write_element_derivation_for_enum(input.ident, input.generics, enum_input, options)
        }
        syn::Data::Union(_) => panic!("Using unions as XML elements is not supported"),
    }
}
