use darling::ast::{Data, NestedMeta};
use darling::{Error, FromDeriveInput, FromField, FromMeta};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, Generics, Ident, Meta};

#[derive(FromDeriveInput)]
#[darling(supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: Ident,
    generics: Generics,
    data: Data<(), InjectableField>,
}

#[derive(FromField)]
#[darling(forward_attrs(inject))]
struct InjectableField {
    ident: Option<Ident>,
    attrs: Vec<Attribute>,
}

/// Arguments of `#[inject(...)]`.
#[derive(Default, FromMeta)]
#[darling(default)]
struct InjectArgs {
    key: Option<String>,
}

impl InjectArgs {
    /// `None` when the field carries no `#[inject]`.
    fn from_attrs(attrs: &[Attribute]) -> darling::Result<Option<Self>> {
        let mut found = None;

        for attr in attrs {
            if found.is_some() {
                return Err(Error::custom("duplicate #[inject] attribute").with_span(attr));
            }

            let args = match &attr.meta {
                Meta::Path(_) => InjectArgs::default(),
                Meta::List(list) => {
                    let items = NestedMeta::parse_meta_list(list.tokens.clone())?;
                    InjectArgs::from_list(&items).map_err(|err| err.with_span(attr))?
                }
                Meta::NameValue(_) => {
                    return Err(Error::custom("expected #[inject] or #[inject(key = \"...\")]")
                        .with_span(attr));
                }
            };
            found = Some(args);
        }

        Ok(found)
    }
}

pub fn derive_injectable_impl(input: &DeriveInput) -> darling::Result<TokenStream> {
    let input = InjectableInput::from_derive_input(input)?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = input
        .data
        .take_struct()
        .ok_or_else(|| Error::unsupported_shape("enum"))?;

    let mut errors = Error::accumulator();
    let mut slots = Vec::new();

    for field in fields.fields {
        let Some(args) = errors.handle(InjectArgs::from_attrs(&field.attrs)).flatten() else {
            continue;
        };
        let Some(name) = field.ident else {
            continue;
        };

        slots.push(match args.key {
            Some(key) => quote! {
                ::trellis::InjectionSlot::keyed(stringify!(#name), #key, &mut self.#name)
            },
            None => quote! {
                ::trellis::InjectionSlot::new(stringify!(#name), &mut self.#name)
            },
        });
    }

    errors.finish()?;

    Ok(quote! {
        impl #impl_generics ::trellis::Injectable for #ident #ty_generics #where_clause {
            fn injection_slots(&mut self) -> ::std::vec::Vec<::trellis::InjectionSlot<'_>> {
                ::std::vec![#(#slots),*]
            }
        }
    })
}
