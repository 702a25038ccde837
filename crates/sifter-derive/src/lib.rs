mod filterable;

use proc_macro::TokenStream;

#[proc_macro_derive(Filterable, attributes(sifter))]
pub fn derive_filterable(input: TokenStream) -> TokenStream {
    filterable::derive_filterable(input.into()).into()
}
