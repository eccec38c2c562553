//! Derive macros for Trellis DI.
//!
//! - [`Injectable`](derive@Injectable) lists `#[inject]` fields as
//!   injection slots.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod injectable;

/// Implements `trellis::Injectable` for a struct with named fields or a
/// unit struct.
///
/// Every field marked `#[inject]` becomes a slot and must be an
/// `Option<Arc<S>>`. `#[inject(key = "...")]` resolves a keyed binding.
/// Unmarked fields are ignored.
///
/// ```rust,ignore
/// #[derive(Injectable)]
/// struct GreetingFilter {
///     #[inject]
///     greeter: Option<Arc<dyn Greeter>>,
///     #[inject(key = "formal")]
///     formal: Option<Arc<dyn Greeter>>,
///     order: i32,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(&input)
        .unwrap_or_else(|err| err.write_errors())
        .into()
}
