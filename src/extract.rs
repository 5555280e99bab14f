use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::error::{ExtractionError, FetchError, ImportError};
use crate::models::{FetchedContent, count_words};

pub const UNTITLED: &str = "Untitled Article";

/// A candidate container must carry more than this many characters.
const MIN_CANDIDATE_CHARS: usize = 100;
/// Below this the page is considered to have no usable content.
const MIN_CONTENT_CHARS: usize = 50;

/// Likely main-content containers, most specific publishing markup last.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    ".content",
    ".article-content",
    ".post-content",
    ".entry-content",
    "#content",
    ".story-body",
    ".article-body",
];

const NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "aside"];

/// Fetch a web page and extract its article text.
///
/// One GET, no retries. Timeouts and the user agent come from `client`.
pub async fn fetch_article(client: &Client, url: &str) -> Result<FetchedContent, ImportError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        }
        .into());
    }

    debug!(url = %url, "fetching article");

    let response = client.get(parsed).send().await.map_err(|e| FetchError::Http {
        url: url.to_string(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
        .into());
    }

    let body = response.text().await.map_err(|e| FetchError::Http {
        url: url.to_string(),
        source: e,
    })?;

    let fetched = extract_article(url, &body)?;
    info!(url = %url, title = %fetched.title, words = fetched.word_count, "article extracted");
    Ok(fetched)
}

/// Extract title and main text from an HTML document.
pub fn extract_article(url: &str, html: &str) -> Result<FetchedContent, ExtractionError> {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title")
        .or_else(|| first_text(&document, "h1"))
        .unwrap_or_else(|| UNTITLED.to_string());

    let content = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| {
            let text = first_text(&document, selector)?;
            (text.chars().count() > MIN_CANDIDATE_CHARS).then(|| {
                debug!(selector = %selector, "content container matched");
                text
            })
        })
        .unwrap_or_else(|| {
            let body = first_element(&document, "body").unwrap_or_else(|| document.root_element());
            normalize_whitespace(&visible_text(body))
        });

    let chars = content.chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(ExtractionError::NoContent {
            url: url.to_string(),
            chars,
        });
    }

    Ok(FetchedContent {
        title,
        word_count: count_words(&content),
        content,
    })
}

/// First element matching `selector` that is not inside a noise region.
fn first_element<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).find(|el| !in_noise(*el))
}

/// Normalized visible text of the first matching element, if non-empty.
fn first_text(document: &Html, selector: &str) -> Option<String> {
    let element = first_element(document, selector)?;
    let text = normalize_whitespace(&visible_text(element));
    (!text.is_empty()).then_some(text)
}

/// Concatenated text nodes under `element`, skipping anything inside noise.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(is_noise);
        if !hidden {
            text.push_str(chunk);
        }
    }
    text
}

fn in_noise(element: ElementRef<'_>) -> bool {
    is_noise(element) || element.ancestors().filter_map(ElementRef::wrap).any(is_noise)
}

fn is_noise(element: ElementRef<'_>) -> bool {
    let el = element.value();
    NOISE_TAGS.contains(&el.name())
        || el.id().is_some_and(|id| id.to_ascii_lowercase().contains("sidebar"))
        || el.classes().any(|c| c.to_ascii_lowercase().contains("sidebar"))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
