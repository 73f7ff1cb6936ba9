use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, LitInt, Result, Type};

use crate::{annotated, named_fields, require_unique};

/// How a receiver field stores the views of its message.
enum Collection {
    /// Keep the last message.
    Last,
    /// Keep every message in file order.
    All,
}

pub(crate) fn expand_from_messages(input: &DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(input, "FromMessages")?;

    let receivers = annotated::<LitInt>(fields, "message")
        .map(|entry| {
            let (field, name, number) = entry?;
            Ok((name, number, collection(&field.ty)?))
        })
        .collect::<Result<Vec<_>>>()?;

    require_unique::<u16>(receivers.iter().map(|(_, n, _)| n), "Message")?;

    let cases = receivers.iter().map(|(name, number, collection)| {
        let view = quote! { ::crankset::fit::FromMessage::from_message(message) };

        match collection {
            Collection::Last => {
                quote! { #number => self.#name = ::core::option::Option::Some(#view), }
            }
            Collection::All => quote! { #number => self.#name.push(#view), },
        }
    });

    let name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::crankset::fit::FromMessages for #name #type_generics #where_clause {
            fn add_message(&mut self, message: &::crankset::fit::Message) {
                match message.global {
                    #(#cases)*
                    _ => {}
                }
            }
        }
    })
}

fn collection(ty: &Type) -> Result<Collection> {
    let ident = match ty {
        Type::Path(path) => path.path.segments.last().map(|s| &s.ident),
        _ => None,
    };

    match ident {
        Some(i) if i == "Option" => Ok(Collection::Last),
        Some(i) if i == "Vec" => Ok(Collection::All),
        _ => Err(Error::new_spanned(
            ty,
            "Field must have an `Option<T>` or `Vec<T>` type.",
        )),
    }
}
