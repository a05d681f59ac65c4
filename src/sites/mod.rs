//! Concrete site adapters.

mod yamap;
mod yamareco;

pub use yamap::Yamap;
pub use yamareco::Yamareco;

use scraper::{ElementRef, Html, Selector};

/// Compiles a selector literal. The css strings in this module tree are
/// fixed at build time, so a parse failure is a programming error.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Trimmed text content of an element, empty string collapsed to `None`.
pub(crate) fn text_of(element: ElementRef) -> Option<String> {
    let text = element.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Text of the first element matching `css` in the document.
pub(crate) fn first_text(document: &Html, css: &str) -> Option<String> {
    document.select(&selector(css)).next().and_then(text_of)
}

/// Text of the first element matching `css` under `scope`.
pub(crate) fn child_text(scope: ElementRef, css: &str) -> Option<String> {
    scope.select(&selector(css)).next().and_then(text_of)
}

/// Text nodes of an element joined with newlines, as the sites' multi-line
/// narrative blocks are meant to be read.
pub(crate) fn lines_of(element: ElementRef) -> Option<String> {
    let text = element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!text.is_empty()).then_some(text)
}
