use proc_macro::TokenStream;
use quote::quote;

/// Derives `util::FromName` for a fieldless enum, matching variant names
/// case-insensitively, plus a `FromStr` impl backed by the same lookup so
/// the enum works with `str::parse`.
#[proc_macro_derive(FromName)]
pub fn from_name_derive(input: TokenStream) -> TokenStream {
    let syn_item: syn::DeriveInput = syn::parse(input).unwrap();
    let name = &syn_item.ident;
    let name_str = name.to_string();

    let variants = match &syn_item.data {
        syn::Data::Enum(enum_item) => &enum_item.variants,
        _ => panic!("FromName can only be derived for an enum."),
    };
    assert!(
        variants.iter().all(|v| v.fields.is_empty()),
        "FromName variants must have no fields."
    );

    let literals: Vec<String> = variants.iter().map(|v| v.ident.to_string()).collect();
    let identifiers: Vec<&syn::Ident> = variants.iter().map(|v| &v.ident).collect();

    let expanded = quote! {
        impl FromName for #name {
            fn from_name(name: &str) -> Result<#name, ::util::NoSuchVariant> {
                #(
                    if name.eq_ignore_ascii_case(#literals) {
                        return Ok(#name::#identifiers);
                    }
                )*
                Err(::util::NoSuchVariant {
                    token: name.to_string(),
                    expected: #name_str,
                })
            }
        }

        impl ::core::str::FromStr for #name {
            type Err = ::util::NoSuchVariant;

            fn from_str(name: &str) -> Result<#name, ::util::NoSuchVariant> {
                FromName::from_name(name)
            }
        }
    };

    expanded.into()
}
