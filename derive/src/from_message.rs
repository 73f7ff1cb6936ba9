use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    DeriveInput, Error, ExprClosure, LitInt, Pat, PathArguments, Result, Token, Type,
    parse::{Parse, ParseStream},
};

use crate::{annotated, named_fields, require_unique};

pub(crate) fn expand_from_message(input: &DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(input, "FromMessage")?;

    let views = annotated::<FieldAttribute>(fields, "field")
        .map(|entry| {
            let (field, name, attribute) = entry?;

            match &attribute.handler {
                Some(handler) => check_handler(handler)?,
                None => require_option(&field.ty)?,
            }

            Ok((name, attribute))
        })
        .collect::<Result<Vec<_>>>()?;

    require_unique::<u8>(views.iter().map(|(_, a)| &a.number), "Field")?;

    let cases = views.iter().map(|(name, FieldAttribute { number, handler })| {
        let conversion = match handler {
            Some(handler) => quote! { (#handler)(value) },
            None => quote! { ::crankset::fit::FromValue::from_value(value) },
        };

        quote! { #number => this.#name = #conversion, }
    });

    let name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::crankset::fit::FromMessage for #name #type_generics #where_clause {
            fn from_message(message: &::crankset::fit::Message) -> Self {
                let mut this = <Self as ::core::default::Default>::default();

                for (number, field) in &message.fields {
                    let value = &field.value;

                    match *number {
                        #(#cases)*
                        _ => {}
                    }
                }

                this
            }
        }
    })
}

/// A handler receives the field's `&Value` through one typed parameter.
fn check_handler(handler: &ExprClosure) -> Result<()> {
    let parameters: Vec<_> = handler.inputs.iter().collect();

    match parameters.as_slice() {
        [Pat::Type(_)] => Ok(()),
        [parameter] => Err(Error::new_spanned(
            parameter,
            "Handler parameter must be annotated as `&Value`.",
        )),
        _ => Err(Error::new_spanned(
            handler,
            "Handler must take exactly one parameter.",
        )),
    }
}

/// Fields without a handler are assigned `FromValue::from_value` directly,
/// so they must be optional.
fn require_option(ty: &Type) -> Result<()> {
    let segment = match ty {
        Type::Path(path) => path.path.segments.last(),
        _ => None,
    };

    match segment {
        Some(s)
            if s.ident == "Option" && matches!(s.arguments, PathArguments::AngleBracketed(_)) =>
        {
            Ok(())
        }
        _ => Err(Error::new_spanned(
            ty,
            "Field without a handler must have type `Option<T>`.",
        )),
    }
}

/// `#[field(N)]` or `#[field(N, |v: &Value| ...)]`.
struct FieldAttribute {
    number: LitInt,
    handler: Option<ExprClosure>,
}

impl Parse for FieldAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let number = input.parse()?;

        let handler = match input.parse::<Option<Token![,]>>()? {
            Some(_) => Some(input.parse()?),
            None => None,
        };

        Ok(Self { number, handler })
    }
}
