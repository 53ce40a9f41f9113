/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::results
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Convert one catalog results page into ordered search
    results, the advertised total, and its postback state.

  Security / Safety Notes:
    Pure parsing; no I/O.

  Dependencies:
    scraper for the parse tree, regex for the results counter.

  Operational Scope:
    Invoked by the session controller after every search GET,
    re-sort, and next-page postback.

  Revision History:
    2025-11-12 COD  Authored results table parser.
  ------------------------------------------------------------
  SSE Principles Observed:
    - A missing table is transient, never an empty result
    - Row order preserved exactly as rendered
============================================================*/

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::{CatalogError, MarkupError, Result};
use crate::extract::{
    child_elements, compile_static_regex, descendant_elements, element_text, find_by_id,
    parse_catalog_date, split_list, text_by_id,
};
use crate::postback::PageState;
use crate::update_info::SearchResult;

pub const RESULTS_TABLE_ID: &str = "ctl00_catalogBody_updateMatches";
pub const NO_RESULTS_ID: &str = "ctl00_catalogBody_noResultText";
pub const SEARCH_DURATION_ID: &str = "ctl00_catalogBody_searchDuration";

const ROW_CELLS: usize = 8;

static RESULTS_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"of\s+(\d+)"));

/// One parsed page of search results.
#[derive(Debug, Clone)]
pub struct ResultsPage {
    pub results: Vec<SearchResult>,
    /// Total advertised by the catalog across every page.
    pub results_count: u32,
    pub state: PageState,
}

impl ResultsPage {
    pub fn is_final_page(&self) -> bool {
        self.state.is_final_page()
    }
}

/// Parse a results page fetched from `search_url`.
///
/// Fails with [`CatalogError::NoResults`] when the catalog rendered its
/// "no results" banner, and with [`CatalogError::TransientPage`] when the
/// results table is missing from an otherwise successful response.
pub fn parse_results_page(body: &str, search_url: &str) -> Result<ResultsPage> {
    let document = Html::parse_document(body);

    if find_by_id(&document, NO_RESULTS_ID).is_some() {
        return Err(CatalogError::NoResults(format!(
            "catalog found nothing for {search_url}"
        )));
    }

    let Some(table) = find_by_id(&document, RESULTS_TABLE_ID) else {
        return Err(CatalogError::TransientPage {
            url: search_url.to_string(),
            reason: "response does not contain a search results table".into(),
        });
    };

    let structure = |source| CatalogError::page_structure("search results page", source);

    let state = PageState::from_document(&document, search_url).map_err(structure)?;
    let results_count = parse_results_count(&document).map_err(structure)?;
    let results = descendant_elements(table, "tr")
        .skip(1)
        .enumerate()
        .map(|(index, row)| parse_row(row, index + 1))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(structure)?;

    Ok(ResultsPage {
        results,
        results_count,
        state,
    })
}

fn parse_results_count(document: &Html) -> std::result::Result<u32, MarkupError> {
    let banner = text_by_id(document, SEARCH_DURATION_ID)?;
    let digits = RESULTS_COUNT_RE
        .captures(&banner)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
        .ok_or_else(|| {
            MarkupError::Unexpected(format!("results counter `{banner}` has no total"))
        })?;
    digits
        .parse::<u32>()
        .map_err(|source| MarkupError::InvalidNumber {
            field: "results count",
            value: digits.to_string(),
            source,
        })
}

fn parse_row(row: ElementRef<'_>, index: usize) -> std::result::Result<SearchResult, MarkupError> {
    let cells: Vec<ElementRef<'_>> = child_elements(row, "td").collect();
    if cells.len() < ROW_CELLS {
        return Err(MarkupError::RowShape {
            row: index,
            expected: ROW_CELLS,
            found: cells.len(),
        });
    }

    let spans: Vec<ElementRef<'_>> = descendant_elements(cells[6], "span").collect();
    if spans.len() < 2 {
        return Err(MarkupError::Unexpected(format!(
            "results row {index} size cell has {} spans, expected 2",
            spans.len()
        )));
    }
    let raw_bytes = element_text(spans[1]);
    let size_in_bytes = raw_bytes
        .parse::<u64>()
        .map_err(|source| MarkupError::InvalidNumber {
            field: "size in bytes",
            value: raw_bytes.clone(),
            source,
        })?;

    let update_id = descendant_elements(cells[7], "input")
        .next()
        .and_then(|input| input.value().id())
        .map(str::to_string)
        .ok_or_else(|| {
            MarkupError::Unexpected(format!("results row {index} has no update checkbox id"))
        })?;

    Ok(SearchResult {
        title: element_text(cells[1]),
        products: split_list(&element_text(cells[2])),
        classification: element_text(cells[3]),
        last_updated: parse_catalog_date("last updated", &element_text(cells[4]))?,
        version: element_text(cells[5]),
        size: element_text(spans[0]),
        size_in_bytes,
        update_id,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const SEARCH_URL: &str = "https://catalog.invalid/Search.aspx?q=SQL%20Server%202012";

    fn row(id: &str, title: &str, bytes: u64) -> String {
        format!(
            r#"<tr id="{id}_R0">
                <td></td>
                <td><a>{title}</a></td>
                <td>SQL Server 2012 Service Pack 4, SQL Server 2012</td>
                <td>Security Updates</td>
                <td>1/5/2018</td>
                <td>n/a</td>
                <td><span id="{id}_size">4.2 MB</span><span id="{id}_originalSize" style="display:none">{bytes}</span></td>
                <td><input id="{id}" class="flatBlueButtonDownload" type="button" value="Download"></td>
            </tr>"#
        )
    }

    fn page(rows: &[String], next: bool) -> String {
        let next_link = if next {
            r#"<a id="ctl00_catalogBody_nextPageLinkText">Next</a>"#
        } else {
            ""
        };
        format!(
            r#"<html><body><form>
                <input type="hidden" id="__EVENTARGUMENT" value="">
                <input type="hidden" id="__VIEWSTATE" value="vs">
                <input type="hidden" id="__VIEWSTATEGENERATOR" value="gen">
                <input type="hidden" id="__EVENTVALIDATION" value="ev">
                <span id="ctl00_catalogBody_searchDuration">Updates: 1 - 2 of 49 (page 1 of 2)</span>
                <table id="ctl00_catalogBody_updateMatches">
                    <tr id="headerRow"><td></td><td>Title</td><td>Products</td><td>Classification</td><td>Last Updated</td><td>Version</td><td>Size</td><td></td></tr>
                    {}
                </table>
                {next_link}
            </form></body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn parses_rows_in_rendered_order() {
        let html = page(
            &[
                row("19c1225f-1576-4042-9189-4afbb134e892", "Update A", 4404019),
                row("b870730b-c565-4476-8e04-2961cb7966ca", "Update B", 12),
            ],
            true,
        );
        let parsed = parse_results_page(&html, SEARCH_URL).expect("page");

        assert_eq!(parsed.results_count, 49);
        assert!(!parsed.is_final_page());
        assert_eq!(parsed.results.len(), 2);

        let first = &parsed.results[0];
        assert_eq!(first.update_id, "19c1225f-1576-4042-9189-4afbb134e892");
        assert_eq!(first.title, "Update A");
        assert_eq!(
            first.products,
            vec!["SQL Server 2012 Service Pack 4", "SQL Server 2012"]
        );
        assert_eq!(first.classification, "Security Updates");
        assert_eq!(
            first.last_updated,
            NaiveDate::from_ymd_opt(2018, 1, 5).expect("valid")
        );
        assert_eq!(first.size, "4.2 MB");
        assert_eq!(first.size_in_bytes, 4404019);
        assert_eq!(parsed.results[1].update_id, "b870730b-c565-4476-8e04-2961cb7966ca");
    }

    #[test]
    fn parsing_twice_is_identical() {
        let html = page(&[row("a-1", "Update A", 1)], false);
        let first = parse_results_page(&html, SEARCH_URL).expect("page");
        let second = parse_results_page(&html, SEARCH_URL).expect("page");
        assert_eq!(first.results, second.results);
        assert_eq!(first.state, second.state);
    }

    #[test]
    fn missing_table_is_transient() {
        let html = r#"<html><body>
            <input id="__VIEWSTATE" value="vs"><input id="__VIEWSTATEGENERATOR" value="g">
            <input id="__EVENTVALIDATION" value="e">
        </body></html>"#;
        let err = parse_results_page(html, SEARCH_URL).unwrap_err();
        assert!(err.is_transient(), "expected transient, got {err:?}");
    }

    #[test]
    fn no_results_banner_is_reported() {
        let html = r#"<html><body><span id="ctl00_catalogBody_noResultText">We did not find any results</span></body></html>"#;
        let err = parse_results_page(html, SEARCH_URL).unwrap_err();
        assert!(matches!(err, CatalogError::NoResults(_)));
    }

    #[test]
    fn short_row_is_a_structure_error() {
        let html = page(&["<tr><td>only</td><td>two</td></tr>".to_string()], false);
        let err = parse_results_page(&html, SEARCH_URL).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PageStructure {
                source: MarkupError::RowShape { found: 2, .. },
                ..
            }
        ));
    }

    #[test]
    fn bad_byte_count_is_a_structure_error() {
        let html = page(&[row("a-1", "Update A", 1).replace(">1</span>", ">lots</span>")], false);
        let err = parse_results_page(&html, SEARCH_URL).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PageStructure {
                source: MarkupError::InvalidNumber { .. },
                ..
            }
        ));
    }
}
