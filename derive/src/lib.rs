use std::{collections::HashSet, fmt::Display, hash::Hash, str::FromStr};

use proc_macro::TokenStream;
use syn::{
    Data, DeriveInput, Error, Field, FieldsNamed, Ident, LitInt, Result, parse::Parse,
    parse_macro_input,
};

mod from_message;
mod from_messages;

#[proc_macro_derive(FromMessage, attributes(field))]
pub fn derive_from_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_message::expand_from_message(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

#[proc_macro_derive(FromMessages, attributes(message))]
pub fn derive_from_messages(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_messages::expand_from_messages(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// The named fields of the struct a derive is applied to.
fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a FieldsNamed> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            syn::Fields::Named(fields) => Ok(fields),
            _ => Err(Error::new_spanned(
                input,
                format!("`{derive}` may only be derived on structs with named fields."),
            )),
        },
        _ => Err(Error::new_spanned(
            input,
            format!("`{derive}` may only be derived on structs."),
        )),
    }
}

/// Fields carrying the attribute `name`, with its parsed arguments. Fields
/// without it are skipped.
fn annotated<'a, A: Parse>(
    fields: &'a FieldsNamed,
    name: &'static str,
) -> impl Iterator<Item = Result<(&'a Field, Ident, A)>> {
    fields.named.iter().filter_map(move |field| {
        let attr = field.attrs.iter().find(|a| a.path().is_ident(name))?;
        let ident = field.ident.clone()?;

        Some(
            attr.meta
                .require_list()
                .and_then(|list| list.parse_args::<A>())
                .map(|args| (field, ident, args)),
        )
    })
}

/// Reject repeated field or message numbers.
fn require_unique<'a, N>(numbers: impl IntoIterator<Item = &'a LitInt>, kind: &str) -> Result<()>
where
    N: FromStr + Eq + Hash,
    N::Err: Display,
{
    let mut seen = HashSet::new();

    for number in numbers {
        if !seen.insert(number.base10_parse::<N>()?) {
            Err(Error::new_spanned(
                number,
                format!("{kind} numbers must be unique."),
            ))?;
        }
    }

    Ok(())
}
