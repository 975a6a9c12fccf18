//! Procedural macros used by `handsign`.
//!
//! Do not use this crate directly, use `handsign` instead.

use proc_macro::{Span, TokenStream};
use quote::quote;
use syn::{parse::Error, ItemFn};

/// Turns a `main` function into the application thread of a `handsign` program.
///
/// The generated entry point initializes logging, then runs the annotated function on a background
/// thread while the main thread drives the window event loop.
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    match expand_main(args, item.clone()) {
        Ok(tokens) => tokens,
        Err(err) => {
            // Emit the original item next to the error so IDEs still see the function.
            let mut error = item;
            error.extend(TokenStream::from(err.to_compile_error()));
            error
        }
    }
}

fn expand_main(args: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    if !args.is_empty() {
        return Err(Error::new(
            Span::call_site().into(),
            "`#[handsign::main]` does not accept arguments",
        ));
    }

    let item = syn::parse::<ItemFn>(item)?;

    if item.sig.ident != "main" {
        return Err(Error::new(
            item.sig.ident.span(),
            "`#[handsign::main]` must be applied to a function called `main`",
        ));
    }
    if let Some(asyncness) = &item.sig.asyncness {
        return Err(Error::new(
            asyncness.span,
            "`#[handsign::main]` cannot be applied to an `async fn`",
        ));
    }
    if !item.sig.inputs.is_empty() {
        return Err(Error::new(
            item.sig.ident.span(),
            "`main` must not take any arguments",
        ));
    }

    Ok(quote! {
        fn main() {
            #item

            ::handsign::init_logger!();

            ::handsign::run(main);
        }
    }
    .into())
}
