/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote, ToTokens};
use syn::{
    punctuated::Punctuated, token::Comma, Attribute, DataEnum, DataStruct, Expr, ExprLit, Fields,
    Generics, Ident, Lit, Meta, Token,
};

const MACRO_ATTRIBUTE: &str = "xml_serialize";

pub(super) fn write_element_derivation_for_struct(
    ident: Ident,
    generics: Generics,
    data: DataStruct,
    options: ComponentOptions,
) -> proc_macro::TokenStream {
    let fields: Vec<_> = match data.fields {
        Fields::Named(fields) => fields
            .named
            .into_iter()
            .map(|field| {
                let field_ident = field.ident.clone().expect("named fields have an identifier");
                Field::new(field.ident, quote!(&self.#field_ident), field.attrs)
            })
            .collect(),

        Fields::Unnamed(fields) => fields
            .unnamed
            .into_iter()
            .enumerate()
            .map(|(index, field)| {
                let positional = Literal::usize_unsuffixed(index);
                Field::new(None, quote!(&self.#positional), field.attrs)
            })
            .collect(),

        Fields::Unit => Vec::new(),
    };

    let calls = fields_to_calls(&fields);
    let verify_calls = &calls.verify;
    let element_calls = &calls.elements;

    let namespaces_fn = if options.namespaces.is_empty() {
        TokenStream::new()
    } else {
        let namespaces = namespaces_expr(&options.namespaces);
        quote!(
            fn namespaces(&self) -> &'static [crate::xml::Namespace] {
                #namespaces
            }
        )
    };

    let attributes_fn = if calls.attributes.is_empty() {
        TokenStream::new()
    } else {
        let attribute_calls = &calls.attributes;
        quote!(
            fn attributes(&self) -> Vec<(&'static str, std::borrow::Cow<'_, str>)> {
                let mut attributes = Vec::new();
                #(#attribute_calls)*
                attributes
            }
        )
    };

    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    quote!(
        #[automatically_derived]
        impl #impl_generics crate::xml::XmlElement for #ident #type_generics #where_clause {
            #namespaces_fn

            #attributes_fn

            #[allow(unused_variables)]
            fn write_children<W: std::io::Write>(
                &self,
                writer: &mut ::xml::EventWriter<W>,
            ) -> Result<(), ::xml::writer::Error> {
                #verify_calls

                #(#element_calls)*

                Ok(())
            }
        }
    )
    .into()
}

pub(super) fn write_element_derivation_for_enum(
    ident: Ident,
    generics: Generics,
    data: DataEnum,
    enum_options: ComponentOptions,
) -> proc_macro::TokenStream {
    let is_unit_enum = data
        .variants
        .iter()
        .all(|variant| matches!(variant.fields, Fields::Unit));

    if is_unit_enum {
        write_element_derivation_for_unit_enum(ident, generics, data, enum_options)
    } else {
        write_element_derivation_for_structured_enum(ident, generics, data, enum_options)
    }
}

/// Unit enums are written as the text content of their element.
fn write_element_derivation_for_unit_enum(
    ident: Ident,
    generics: Generics,
    data: DataEnum,
    options: ComponentOptions,
) -> proc_macro::TokenStream {
    let variant_arms: TokenStream = data
        .variants
        .into_iter()
        .map(|variant| {
            let variant_name = variant.ident;
            let as_string = variant_name.to_string();

            quote!(
                Self::#variant_name => #as_string,
            )
        })
        .collect();

    let namespaces_fn = if options.namespaces.is_empty() {
        TokenStream::new()
    } else {
        let namespaces = namespaces_expr(&options.namespaces);
        quote!(
            fn namespaces(&self) -> &'static [crate::xml::Namespace] {
                #namespaces
            }
        )
    };

    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    quote!(
        #[automatically_derived]
        impl #impl_generics crate::xml::XmlElement for #ident #type_generics #where_clause {
            #namespaces_fn

            fn write_children<W: std::io::Write>(
                &self,
                writer: &mut ::xml::EventWriter<W>,
            ) -> Result<(), ::xml::writer::Error> {
                let characters = match self {
                    #variant_arms
                };

                writer.write(::xml::writer::XmlEvent::characters(characters))
            }
        }
    )
    .into()
}

/// Each variant of a structured enum is written as its own element, named
/// after the variant.
fn write_element_derivation_for_structured_enum(
    ident: Ident,
    generics: Generics,
    data: DataEnum,
    options: ComponentOptions,
) -> proc_macro::TokenStream {
    let namespaces = namespaces_expr(&options.namespaces);

    let variant_arms: TokenStream = data
        .variants
        .into_iter()
        .map(|variant| {
            let variant_ident = variant.ident;
            let element_name = get_component_name(&variant_ident, &options.prefix);

            match variant.fields {
                Fields::Named(fields) => {
                    let (bindings, fields): (Vec<_>, Vec<_>) = fields
                        .named
                        .into_iter()
                        .map(|field| {
                            let field_ident =
                                field.ident.clone().expect("named fields have an identifier");
                            let binding = format_ident!("field_{}", unraw(&field_ident));

                            (
                                quote!(#field_ident: #binding),
                                Field::new(field.ident, quote!(#binding), field.attrs),
                            )
                        })
                        .unzip();

                    let calls = fields_to_calls(&fields);
                    let verify_calls = &calls.verify;
                    let attribute_calls = &calls.attributes;
                    let element_calls = &calls.elements;
                    let write_children = if element_calls.is_empty() {
                        quote!(|_| Ok(()))
                    } else {
                        quote!(|writer| {
                            #(#element_calls)*

                            Ok(())
                        })
                    };

                    quote!(Self::#variant_ident { #(#bindings),* } => {
                        #verify_calls

                        #[allow(unused_mut)]
                        let mut attributes: Vec<(&'static str, std::borrow::Cow<'_, str>)> =
                            Vec::new();
                        #(#attribute_calls)*

                        crate::xml::write_element(
                            writer,
                            #element_name,
                            #namespaces,
                            &attributes,
                            #write_children,
                        )
                    })
                }

                Fields::Unnamed(fields) => {
                    if fields.unnamed.len() != 1 {
                        panic!("Tuple variants must contain exactly one field");
                    }

                    quote!(Self::#variant_ident(field0) => {
                        crate::xml::verify_element_field(field0);

                        crate::xml::XmlElement::write_as_element(field0, writer, #element_name)
                    })
                }

                Fields::Unit => quote!(Self::#variant_ident => {
                    crate::xml::write_element(writer, #element_name, #namespaces, &[], |_| Ok(()))
                }),
            }
        })
        .collect();

    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    quote!(
        #[automatically_derived]
        impl #impl_generics crate::xml::XmlElement for #ident #type_generics #where_clause {
            fn write_children<W: std::io::Write>(
                &self,
                writer: &mut ::xml::EventWriter<W>,
            ) -> Result<(), ::xml::writer::Error> {
                match self {
                    #variant_arms
                }
            }
        }
    )
    .into()
}

fn get_component_name(ident: &Ident, prefix: &Option<TokenStream>) -> TokenStream {
    qualify_name(unraw(ident), prefix)
}

fn qualify_name(local_name: String, prefix: &Option<TokenStream>) -> TokenStream {
    match prefix {
        Some(prefix) => quote!(const_format::formatcp!("{}:{}", #prefix, #local_name)),
        None => local_name.into_token_stream(),
    }
}

#[derive(Default)]
struct FieldCalls {
    verify: TokenStream,
    attributes: Vec<TokenStream>,
    elements: Vec<TokenStream>,
}

fn fields_to_calls(fields: &[Field]) -> FieldCalls {
    let mut calls = FieldCalls::default();

    for field in fields {
        let accessor = &field.accessor;

        if field.options.is_attribute {
            let name = field.xml_name();
            calls
                .verify
                .extend(quote!(crate::xml::verify_attribute_field(#accessor);));
            calls.attributes.push(quote!(
                if let Some(value) = crate::xml::XmlAttribute::to_attribute_value(#accessor) {
                    attributes.push((#name, value));
                }
            ));
        } else if field.options.flatten || field.ident.is_none() {
            calls
                .verify
                .extend(quote!(crate::xml::verify_element_field(#accessor);));
            calls.elements.push(quote!(
                crate::xml::XmlElement::write_children(#accessor, writer)?;
            ));
        } else {
            let name = field.xml_name();
            calls
                .verify
                .extend(quote!(crate::xml::verify_element_field(#accessor);));
            calls.elements.push(quote!(
                crate::xml::XmlElement::write_as_element(#accessor, writer, #name)?;
            ));
        }
    }

    calls
}

fn namespaces_expr(namespaces: &[XmlNamespace]) -> TokenStream {
    let entries = namespaces.iter().map(|xmlns| match xmlns {
        XmlNamespace::Default(uri) => quote!((None, #uri)),
        XmlNamespace::Prefixed(prefix, uri) => quote!((Some(#prefix), #uri)),
    });

    quote!(&[#(#entries),*])
}

#[derive(Default, Debug)]
pub(super) struct ComponentOptions {
    prefix: Option<TokenStream>,
    namespaces: Vec<XmlNamespace>,
}

impl TryFrom<Vec<Attribute>> for ComponentOptions {
    type Error = &'static str;

    fn try_from(value: Vec<Attribute>) -> Result<Self, Self::Error> {
        let meta = try_get_serialize_meta(value)?;

        let mut prefix = None;
        let mut encountered_default = false;
        let namespaces = meta
            .into_iter()
            .map(|meta| match meta {
                Meta::NameValue(name_value) => {
                    if name_value.path.is_ident("default_ns") {
                        if encountered_default {
                            return Err(
                                "there must be at most one `default_ns` declaration per component",
                            );
                        }

                        encountered_default = true;

                        Ok(Some(XmlNamespace::Default(
                            name_value.value.into_token_stream(),
                        )))
                    } else if name_value.path.is_ident("ns") {
                        match name_value.value {
                            Expr::Tuple(tuple) if tuple.elems.len() == 2 => {
                                let mut elems = tuple.elems.into_iter();
                                match (elems.next(), elems.next()) {
                                    (Some(prefix), Some(uri)) => Ok(Some(XmlNamespace::Prefixed(
                                        prefix.into_token_stream(),
                                        uri.into_token_stream(),
                                    ))),
                                    _ => Err("`ns` takes a single tuple of two elements as argument"),
                                }
                            }

                            _ => Err("`ns` takes a single tuple of two elements as argument"),
                        }
                    } else if name_value.path.is_ident("ns_prefix") {
                        prefix = Some(name_value.value.into_token_stream());

                        Ok(None)
                    } else {
                        Err("unrecognized XML component attribute")
                    }
                }

                _ => Err("unrecognized XML component attribute"),
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();

        Ok(ComponentOptions { prefix, namespaces })
    }
}

fn try_get_serialize_meta(attrs: Vec<Attribute>) -> Result<Punctuated<Meta, Comma>, &'static str> {
    let mut parseable_attrs = attrs
        .into_iter()
        .filter(|attr| attr.path().is_ident(MACRO_ATTRIBUTE));

    let attr_to_parse = match (parseable_attrs.next(), parseable_attrs.next()) {
        (None, _) => return Ok(Default::default()),
        (Some(attr), None) => attr,

        _ => return Err("multiple attributes specified for component"),
    };

    attr_to_parse
        .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        .map_err(|_| "illegal attribute syntax")
}

#[derive(Default)]
struct FieldOptions {
    is_attribute: bool,
    flatten: bool,
    prefix: Option<TokenStream>,
    rename: Option<String>,
}

impl TryFrom<Vec<Attribute>> for FieldOptions {
    type Error = &'static str;

    fn try_from(value: Vec<Attribute>) -> Result<Self, Self::Error> {
        let meta = try_get_serialize_meta(value)?;

        meta.into_iter()
            .try_fold(FieldOptions::default(), |mut options, meta| {
                match meta {
                    Meta::Path(path) if path.is_ident("is_attribute") => {
                        options.is_attribute = true
                    }
                    Meta::Path(path) if path.is_ident("flatten") => options.flatten = true,
                    Meta::NameValue(name_value) if name_value.path.is_ident("ns_prefix") => {
                        options.prefix = Some(name_value.value.into_token_stream())
                    }
                    Meta::NameValue(name_value) if name_value.path.is_ident("rename") => {
                        match name_value.value {
                            Expr::Lit(ExprLit {
                                lit: Lit::Str(name),
                                ..
                            }) => options.rename = Some(name.value()),
                            _ => return Err("`rename` takes a string literal"),
                        }
                    }

                    _ => return Err("unrecognized XML field attribute"),
                }

                Ok(options)
            })
    }
}

#[derive(Debug)]
enum XmlNamespace {
    Default(TokenStream),
    Prefixed(TokenStream, TokenStream),
}

struct Field {
    ident: Option<Ident>,
    accessor: TokenStream,
    options: FieldOptions,
}

impl Field {
    fn new(ident: Option<Ident>, accessor: TokenStream, attrs: Vec<Attribute>) -> Self {
        let options = FieldOptions::try_from(attrs).expect("Unable to process field attributes");
        if ident.is_none() && options.is_attribute {
            panic!("Unnamed fields may not be XML attributes");
        }

        Self {
            ident,
            accessor,
            options,
        }
    }

    fn xml_name(&self) -> TokenStream {
        let local_name = match (&self.options.rename, &self.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => snake_to_pascal(&unraw(ident)),
            (None, None) => panic!("Unnamed fields need a `rename` to be written as elements"),
        };

        qualify_name(local_name, &self.options.prefix)
    }
}

fn unraw(ident: &Ident) -> String {
    ident.to_string().trim_start_matches("r#").to_string()
}

fn snake_to_pascal(ident: &str) -> String {
    let mut capitalize_next = true;
    ident
        .chars()
        .filter_map(|character| {
            if character == '_' {
                capitalize_next = true;

                None
            } else if capitalize_next {
                capitalize_next = false;

                Some(character.to_ascii_uppercase())
            } else {
                Some(character)
            }
        })
        .collect()
}
