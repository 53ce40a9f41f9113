/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::extract
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Low-level helpers that read values, lists, and URL sets out
    of catalog HTML by literal element id.

  Security / Safety Notes:
    Operates on already-downloaded markup; no I/O.

  Dependencies:
    scraper for the parse tree, regex for URL harvesting,
    chrono for catalog dates.

  Operational Scope:
    Shared by the results, postback, and details parsers.

  Revision History:
    2025-11-12 COD  Extracted field helpers from page parsers.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Missing markup is reported, never papered over
    - Distinct sentinel for "no links" versus "not parsed"
============================================================*/

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::error::MarkupError;

/// Placeholder the catalog renders for empty fields. Also returned by
/// [`urls_in`] when a container holds no links at all.
pub const NOT_APPLICABLE: &str = "n/a";

const CATALOG_DATE_FORMAT: &str = "%m/%d/%Y";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)",
    )
});

pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid static regex '{pattern}': {err}"))
}

/// Locate an element by its literal `id` attribute.
///
/// Catalog ids are not always valid CSS identifiers (update ids may start
/// with a digit), so the tree is walked instead of going through a selector.
pub fn find_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().id() == Some(id))
}

pub fn require_by_id<'a>(document: &'a Html, id: &str) -> Result<ElementRef<'a>, MarkupError> {
    find_by_id(document, id).ok_or_else(|| MarkupError::MissingElement { id: id.to_string() })
}

/// Trimmed inner text of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed inner text of the element with the given id.
pub fn text_by_id(document: &Html, id: &str) -> Result<String, MarkupError> {
    require_by_id(document, id).map(element_text)
}

/// `value` attribute of the element with the given id.
pub fn value_by_id(document: &Html, id: &str) -> Result<String, MarkupError> {
    let element = require_by_id(document, id)?;
    element
        .value()
        .attr("value")
        .map(str::to_string)
        .ok_or_else(|| MarkupError::MissingAttribute {
            id: id.to_string(),
            attribute: "value",
        })
}

/// Text of every direct child node, text nodes included, in document order.
///
/// Whitespace-only text nodes are kept so callers can reason about the
/// node count the catalog renders.
pub fn child_texts(element: ElementRef<'_>) -> Vec<String> {
    element
        .children()
        .map(|child| match child.value() {
            Node::Text(text) => String::from(&**text),
            Node::Element(_) => ElementRef::wrap(child)
                .map(|inner| inner.text().collect::<String>())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .collect()
}

/// Trimmed text of the last child node. A label followed only by
/// whitespace yields an empty string, never the label.
pub fn last_child_text(element: ElementRef<'_>) -> String {
    child_texts(element)
        .pop()
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn first_child_text(element: ElementRef<'_>) -> String {
    child_texts(element)
        .into_iter()
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Trimmed text of the last child of the element with the given id.
pub fn last_child_text_by_id(document: &Html, id: &str) -> Result<String, MarkupError> {
    require_by_id(document, id).map(last_child_text)
}

/// Split a comma separated catalog value, dropping empty pieces.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma separated list held in the last child of a labelled container
/// (architectures, languages).
pub fn list_by_id(document: &Html, id: &str) -> Result<Vec<String>, MarkupError> {
    last_child_text_by_id(document, id).map(|raw| split_list(&raw))
}

/// Distinct URLs found in an element's markup, in first-seen order.
///
/// Returns a single [`NOT_APPLICABLE`] entry when nothing matches.
pub fn urls_in(element: ElementRef<'_>) -> Vec<String> {
    let markup = element.inner_html().replace("&amp;", "&");
    let mut seen = HashSet::new();
    let urls: Vec<String> = URL_RE
        .find_iter(&markup)
        .map(|found| found.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect();

    if urls.is_empty() {
        vec![NOT_APPLICABLE.to_string()]
    } else {
        urls
    }
}

pub fn urls_by_id(document: &Html, id: &str) -> Result<Vec<String>, MarkupError> {
    require_by_id(document, id).map(urls_in)
}

/// Direct child elements with the given tag name.
pub fn child_elements<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// Descendant elements (excluding `element` itself) with the given tag name.
pub fn descendant_elements<'a>(
    element: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// Identifiers listed in a supersedence container (`supersededbyInfo`,
/// `supersedesInfo`).
///
/// Each row `div` contributes the update id from its link; rows without a
/// link contribute their trimmed text instead. A container whose first entry
/// reads `n/a` yields an empty list.
pub fn supersedence_by_id(document: &Html, id: &str) -> Result<Vec<String>, MarkupError> {
    let container = require_by_id(document, id)?;
    if first_child_text(container).eq_ignore_ascii_case(NOT_APPLICABLE) {
        return Ok(Vec::new());
    }

    let entries = child_elements(container, "div")
        .filter_map(|row| {
            let linked = descendant_elements(row, "a")
                .find_map(|anchor| anchor.value().attr("href"))
                .map(identifier_from_href);
            let entry = linked.unwrap_or_else(|| element_text(row));
            (!entry.is_empty()).then_some(entry)
        })
        .collect();

    Ok(entries)
}

/// Trailing identifier of a details link such as
/// `ScopedViewInline.aspx?updateid=<id>`.
pub fn identifier_from_href(href: &str) -> String {
    let tail = match href.rsplit_once("updateid=") {
        Some((_, tail)) => tail,
        None => href.rsplit('/').next().unwrap_or(href),
    };
    tail.split('&').next().unwrap_or(tail).trim().to_string()
}

/// Parse a catalog `M/D/YYYY` date.
pub fn parse_catalog_date(field: &'static str, raw: &str) -> Result<NaiveDate, MarkupError> {
    let value = raw.trim();
    NaiveDate::parse_from_str(value, CATALOG_DATE_FORMAT).map_err(|source| {
        MarkupError::InvalidDate {
            field,
            value: value.to_string(),
            source,
        }
    })
}
