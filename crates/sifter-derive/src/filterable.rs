use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Error, Fields, LitStr, Visibility};

// derive_filterable
pub fn derive_filterable(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = if let Data::Struct(data) = &input.data {
        if let Fields::Named(named) = &data.fields {
            &named.named
        } else {
            let err = Error::new_spanned(
                &data.fields,
                "Filterable can only be derived for structs with named fields",
            );
            return err.to_compile_error();
        }
    } else {
        let err = Error::new_spanned(
            &input.ident,
            "Filterable can only be derived for structs with named fields",
        );
        return err.to_compile_error();
    };

    let mut shape_entries = Vec::new();
    let mut value_inserts = Vec::new();

    for field in fields {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_name = field_ident.to_string();
        let field_ty = &field.ty;

        let attrs = match FieldAttrs::parse(&field.attrs) {
            Ok(attrs) => attrs,
            Err(err) => return err.to_compile_error(),
        };

        let public = matches!(field.vis, Visibility::Public(_));
        let tag = attrs.tag();
        let tag_tokens = match &tag {
            Some(tag) => quote!(::std::option::Option::Some(#tag.to_string())),
            None => quote!(::std::option::Option::None),
        };

        let shape_tokens = if attrs.opaque {
            // Opaque fields are present in the shape but never filterable,
            // and are left out of the lowered record.
            quote!(::sifter::shape::Shape::Unsupported)
        } else {
            quote!(<#field_ty as ::sifter::traits::Filterable>::shape())
        };

        shape_entries.push(quote! {
            ::sifter::shape::FieldShape {
                name: #field_name.to_string(),
                shape: #shape_tokens,
                tag: #tag_tokens,
                public: #public,
            }
        });

        if !attrs.opaque {
            value_inserts.push(quote! {
                fields.insert(
                    #field_name.to_string(),
                    ::sifter::traits::Filterable::to_value(&self.#field_ident),
                );
            });
        }
    }

    quote! {
        impl #impl_generics ::sifter::traits::Filterable for #ident #ty_generics #where_clause {
            fn shape() -> ::sifter::shape::Shape {
                ::sifter::shape::Shape::Record(::std::vec![
                    #( #shape_entries ),*
                ])
            }

            fn to_value(&self) -> ::sifter::value::Value {
                let mut fields = ::std::collections::BTreeMap::new();
                #( #value_inserts )*

                ::sifter::value::Value::Record(fields)
            }
        }
    }
}

///
/// FieldAttrs
///
/// Parsed `#[sifter(...)]` field attributes:
/// - `rename = "name,alias"` binds the field under the given names and
///   exposes it even when the field is private
/// - `skip` suppresses the field from the schema
/// - `opaque` marks the field's shape unsupported (not filterable)
///

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    opaque: bool,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> Result<Self, Error> {
        let mut parsed = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("sifter") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.rename = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    Ok(())
                } else if meta.path.is_ident("opaque") {
                    parsed.opaque = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported sifter attribute"))
                }
            })?;
        }

        Ok(parsed)
    }

    // The schema annotation carried on the field shape; `skip` wins.
    fn tag(&self) -> Option<String> {
        if self.skip {
            return Some("-".to_string());
        }

        self.rename.clone()
    }
}
