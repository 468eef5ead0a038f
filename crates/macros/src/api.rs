use proc_macro2::{TokenStream, Span};
use quote::{quote, quote_spanned};
use syn::{Attribute, Ident, Lit, Meta, NestedMeta, spanned::Spanned};
use synstructure::{BindingInfo, Structure, VariantInfo};

#[derive(Debug)]
struct Error(TokenStream);

impl Error {
    fn new(span: Span, message: &str) -> Error {
        Error(quote_spanned! { span =>
            compile_error!(#message);
        })
    }
}

/// Contents of a single `#[api(...)]` attribute.
#[derive(Default)]
struct Api {
    internal: Option<Span>,
    code: Option<Lit>,
    status: Option<Ident>,
}

/// Derive `ApiError` from `#[api(...)]` annotations on each variant.
///
/// Variants without an annotation delegate to their `#[cause]` field.
pub fn derive_error(s: Structure) -> TokenStream {
    let statuses = s.each_variant(|v| match variant_api(v) {
        Ok(Some(api)) => match api.status {
            Some(status) => quote!(Status::#status),
            None => quote!(Status::InternalServerError),
        },
        Ok(None) => delegate(v, quote!(status)),
        Err(Error(tokens)) => tokens,
    });

    let codes = s.each_variant(|v| match variant_api(v) {
        Ok(Some(api)) => match api.code {
            Some(code) => quote!(Some(Cow::Borrowed(#code))),
            None => quote!(None),
        },
        Ok(None) => delegate(v, quote!(code)),
        Err(Error(tokens)) => tokens,
    });

    s.gen_impl(quote! {
        use std::borrow::Cow;
        use csaf_cms_error::{ApiError, Status};

        gen impl ApiError for @Self {
            fn status(&self) -> Status {
                match *self { #statuses }
            }

            fn code(&self) -> Option<Cow<str>> {
                match *self { #codes }
            }
        }
    })
}

/// Forward a method call to the variant's `#[cause]` binding.
fn delegate(v: &VariantInfo, method: TokenStream) -> TokenStream {
    match v.bindings().iter().find(is_cause) {
        Some(cause) => quote!(#cause.#method()),
        None => Error::new(
            v.ast().ident.span(),
            "each variant must be #[api]-annotated or have a #[cause]",
        ).0,
    }
}

/// Parse the `#[api(...)]` attribute of a variant, if there is one.
fn variant_api(v: &VariantInfo) -> Result<Option<Api>, Error> {
    let mut lists = api_attributes(v.ast().attrs);

    let meta = match lists.next() {
        Some(meta) => meta,
        None => return Ok(None),
    };

    if let Some(extra) = lists.next() {
        return Err(Error::new(extra.span(), "api attribute must be used exactly once"));
    }

    let list = match meta {
        Meta::List(list) => list,
        other => return Err(Error::new(
            other.span(), "api attribute must take a list in parentheses")),
    };

    if list.nested.is_empty() {
        return Err(Error::new(
            list.span(), "api attribute requires at least one argument"));
    }

    let mut api = Api::default();

    for item in list.nested {
        match item {
            NestedMeta::Meta(Meta::Path(ref path)) if path.is_ident("internal") =>
                api.internal = Some(path.span()),
            NestedMeta::Meta(Meta::NameValue(ref nv)) if nv.path.is_ident("code") =>
                api.code = Some(nv.lit.clone()),
            NestedMeta::Meta(Meta::NameValue(ref nv)) if nv.path.is_ident("status") =>
                match nv.lit {
                    Lit::Str(ref s) => api.status = Some(Ident::new(&s.value(), s.span())),
                    _ => return Err(Error::new(nv.lit.span(), "expected a string")),
                },
            _ => return Err(Error::new(
                item.span(), "expected one of: internal, code, status")),
        }
    }

    if let Some(span) = api.internal {
        if api.code.is_some() || api.status.is_some() {
            return Err(Error::new(span, "internal errors can't have codes or statuses"));
        }
    }

    Ok(Some(api))
}

fn api_attributes<'a>(attrs: &'a [Attribute]) -> impl Iterator<Item = Meta> + 'a {
    attrs.iter()
        .filter(|attr| attr.path.is_ident("api"))
        .filter_map(|attr| attr.parse_meta().ok())
}

fn is_cause(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .any(|attr| attr.path.is_ident("cause"))
}
