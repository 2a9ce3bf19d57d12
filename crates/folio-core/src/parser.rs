//! Extraction of description and themes from a book detail page.
//!
//! A page missing either block still parses; the missing part falls back to a
//! sentinel string. The HTTP layer succeeded, so this is never an error.

use crate::outcome::{BookDetails, DESCRIPTION_NOT_FOUND, NO_THEMES};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const DESCRIPTION_SELECTOR: &str = "div.read-more__content";
const THEMES_SELECTOR: &str = "div.section.link-box";
const THEME_LINK_SELECTOR: &str = "a";

/// Parses book detail pages.
#[derive(Debug, Clone)]
pub struct DetailsParser {
    description: Selector,
    themes: Selector,
    theme_link: Selector,
}

impl Default for DetailsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailsParser {
    pub fn new() -> Self {
        Self {
            description: parse_selector(DESCRIPTION_SELECTOR),
            themes: parse_selector(THEMES_SELECTOR),
            theme_link: parse_selector(THEME_LINK_SELECTOR),
        }
    }

    pub fn parse(&self, body: &str) -> BookDetails {
        let document = Html::parse_document(body);

        let description = document
            .select(&self.description)
            .next()
            .map(joined_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                debug!("No description block in page");
                DESCRIPTION_NOT_FOUND.to_string()
            });

        let themes = document
            .select(&self.themes)
            .next()
            .map(|block| {
                block
                    .select(&self.theme_link)
                    .map(joined_text)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_THEMES.to_string());

        BookDetails {
            description,
            themes,
        }
    }
}

// Selectors are compile-time constants.
fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// Trimmed text nodes of `element`, joined by single spaces.
fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
