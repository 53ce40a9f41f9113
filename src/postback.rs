/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::postback
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Capture the hidden WebForms tokens of a results page and
    turn them into next-page and re-sort postback bodies.

  Security / Safety Notes:
    Tokens are opaque server state; they are replayed verbatim
    and never logged.

  Dependencies:
    scraper (via extract) for reading hidden inputs.

  Operational Scope:
    Built by the results parser, consumed by the session
    controller when it advances or re-sorts a search.

  Revision History:
    2025-11-12 COD  Authored postback state capture.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Immutable state, replaced on every response
    - Literal field names kept in one place
============================================================*/

use std::fmt;

use scraper::Html;
use serde::Serialize;

use crate::error::MarkupError;
use crate::extract::{find_by_id, value_by_id};

pub const EVENT_TARGET_FIELD: &str = "__EVENTTARGET";
pub const EVENT_ARGUMENT_FIELD: &str = "__EVENTARGUMENT";
pub const VIEW_STATE_FIELD: &str = "__VIEWSTATE";
pub const VIEW_STATE_GENERATOR_FIELD: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION_FIELD: &str = "__EVENTVALIDATION";
pub const SEARCH_TEXT_FIELD: &str = "ctl00$searchTextBox";

pub const NEXT_PAGE_TARGET: &str = "ctl00$catalogBody$nextPageLinkText";
pub const NEXT_PAGE_LINK_ID: &str = "ctl00_catalogBody_nextPageLinkText";
const SORT_TARGET_PREFIX: &str = "ctl00$catalogBody$updateMatches$ctl02$";

/// Column the catalog can sort a results table by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    Title,
    Products,
    Classification,
    LastUpdated,
    Version,
    Size,
}

impl SortBy {
    /// Postback target of the column header link.
    pub fn event_target(self) -> String {
        let link = match self {
            SortBy::Title => "titleHeaderLink",
            SortBy::Products => "productsHeaderLink",
            SortBy::Classification => "classHeaderLink",
            SortBy::LastUpdated => "dateHeaderLink",
            SortBy::Version => "versionHeaderLink",
            SortBy::Size => "sizeHeaderLink",
        };
        format!("{SORT_TARGET_PREFIX}{link}")
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortBy::Title => "title",
            SortBy::Products => "products",
            SortBy::Classification => "classification",
            SortBy::LastUpdated => "last-updated",
            SortBy::Version => "version",
            SortBy::Size => "size",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// Header clicks needed from an unsorted table. The catalog toggles
    /// direction per click and always lands on ascending first.
    pub fn header_clicks(self) -> usize {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => 2,
        }
    }
}

/// Hidden form state of one results page, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    event_argument: String,
    event_validation: String,
    view_state: String,
    view_state_generator: String,
    search_url: String,
    final_page: bool,
}

impl PageState {
    /// Read the postback tokens from a parsed results page.
    ///
    /// `__EVENTARGUMENT` may be absent on a first load and then defaults to
    /// an empty string; the other three tokens are required.
    pub fn from_document(document: &Html, search_url: &str) -> Result<Self, MarkupError> {
        let event_argument = match find_by_id(document, EVENT_ARGUMENT_FIELD) {
            Some(element) => element.value().attr("value").unwrap_or_default().to_string(),
            None => String::new(),
        };

        Ok(Self {
            event_argument,
            event_validation: value_by_id(document, EVENT_VALIDATION_FIELD)?,
            view_state: value_by_id(document, VIEW_STATE_FIELD)?,
            view_state_generator: value_by_id(document, VIEW_STATE_GENERATOR_FIELD)?,
            search_url: search_url.to_string(),
            final_page: find_by_id(document, NEXT_PAGE_LINK_ID).is_none(),
        })
    }

    /// True when the page rendered no next-page link.
    pub fn is_final_page(&self) -> bool {
        self.final_page
    }

    /// URL the postbacks for this state are sent to.
    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Form body that advances to the following page.
    pub fn next_page_form(&self) -> Vec<(String, String)> {
        self.form(NEXT_PAGE_TARGET)
    }

    /// Form body that clicks the header of `sort_by` for `query`.
    pub fn sort_form(&self, sort_by: SortBy, query: &str) -> Vec<(String, String)> {
        let mut form = self.form(&sort_by.event_target());
        form.push((SEARCH_TEXT_FIELD.to_string(), query.to_string()));
        form
    }

    fn form(&self, event_target: &str) -> Vec<(String, String)> {
        vec![
            (EVENT_TARGET_FIELD.to_string(), event_target.to_string()),
            (EVENT_ARGUMENT_FIELD.to_string(), self.event_argument.clone()),
            (VIEW_STATE_FIELD.to_string(), self.view_state.clone()),
            (
                VIEW_STATE_GENERATOR_FIELD.to_string(),
                self.view_state_generator.clone(),
            ),
            (
                EVENT_VALIDATION_FIELD.to_string(),
                self.event_validation.clone(),
            ),
        ]
    }
}
