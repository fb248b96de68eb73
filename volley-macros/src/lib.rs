use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Ident, ItemFn};

/// Proc macro to denote a Transaction
///
/// Every call is timed and counted against the scenario it runs in: `Ok` counts as a success,
/// `Err` as an error. When the scenario has a TPS cap, the call waits for the rate limiter
/// first.
///
/// NOTE: Currently this macro only works on async functions with a `Result<T, E>` return value.
///
/// # Example
/// ```ignore
/// use volley::prelude::*;
///
/// #[transaction]
/// async fn my_transaction(arg_1: u32, arg_2: &str) -> Result<String, MyError> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    transaction_internal(attr, item).into()
}

fn transaction_internal(_attr: TokenStream, item: TokenStream) -> TokenStream2 {
    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;
    let name = &sig.ident;

    quote! {
        #(#attrs)* #vis #sig {
            let labels = ::volley::generate_labels!(#name);
            ::volley::transaction::transaction_hook(labels, async move {
                #(#stmts)*
            }).await
        }
    }
}

/// Proc macro to denote a Scenario
///
/// NOTE: Currently this macro only works on async functions which take no arguments and with no
/// return value. Use `Scenario::new` directly for closures that capture state.
///
/// See the `Scenario` struct for more information on the methods this macro provides on functions.
///
/// # Example
/// ```ignore
/// use volley::prelude::*;
///
/// #[scenario]
/// async fn my_scenario() {
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr, item).into()
}

fn scenario_internal(_attr: TokenStream, item: TokenStream) -> TokenStream2 {
    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;

    let new_name = Ident::new(&format!("__volley_{}", sig.ident), Span::call_site());
    let mut new_sig = sig.clone();
    new_sig.ident = new_name.clone();

    let mut scen_sig = sig.clone();
    let scen_name = sig.ident.clone();
    scen_sig.asyncness = None;
    scen_sig.output = match syn::parse2(quote! {
        -> impl ::volley::scenario::ConfigurableScenario
    }) {
        Ok(output) => output,
        Err(err) => return err.to_compile_error(),
    };

    quote! {
        #(#attrs)* #vis #scen_sig {
            ::volley::scenario::Scenario::new(stringify!(#scen_name), #new_name)
        }

        #(#attrs)* #vis #new_sig {
            #(#stmts)*
        }
    }
}
