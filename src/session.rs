/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::session
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Drive catalog searches: initial query, optional re-sort,
    postback pagination, and per-update detail collection,
    all under one page reload policy.

  Security / Safety Notes:
    Read-only requests. Every network await races the caller's
    cancellation token; cancellation is never retried.

  Dependencies:
    tokio + tokio-util for timing and cancellation, futures for
    the page stream, serde_json for the download request,
    urlencoding for query strings, tracing for diagnostics.

  Operational Scope:
    Public entry point of the library; used by the syncat
    binary and by embedding applications.

  Revision History:
    2025-11-12 COD  Authored catalog session controller.
    2025-12-02 COD  Pagination exposed as a lazy page stream;
                    search reduced to a fold over it.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Reload budget resets on every successfully loaded page
    - Pages fetched strictly in sequence
    - No state retained between calls besides configuration
============================================================*/

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, TryStreamExt};
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::config::CatalogConfig;
use crate::details::{parse_details_page, parse_download_links};
use crate::error::{CatalogError, Result};
use crate::postback::{PageState, SortBy, SortDirection};
use crate::results::{parse_results_page, ResultsPage};
use crate::transport::{HttpReply, ReqwestTransport, Transport};
use crate::update_info::{SearchResult, UpdateDetail};

const DOWNLOAD_FIELD: &str = "updateIds";

/// How a search should be shaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Drop later rows sharing the (size in bytes, title) pair of an earlier one.
    pub ignore_duplicates: bool,
    pub sort_by: Option<SortBy>,
    pub sort_direction: SortDirection,
}

/// Entry of the download dialog request payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadRequest<'a> {
    size: u64,
    languages: &'a str,
    uid_info: &'a str,
    update_id: &'a str,
}

enum Cursor {
    Start,
    After(PageState),
    Done,
}

/// Client for the update catalog.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    config: CatalogConfig,
}

impl CatalogClient {
    /// Construct a client that talks to the catalog over HTTPS.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(config.clone(), Arc::new(transport)))
    }

    pub fn with_transport(config: CatalogConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Search page URL for `query`.
    pub fn search_url(&self, query: &str) -> String {
        format!("{}?q={}", self.config.search_url, encode(query))
    }

    pub fn details_url(&self, update_id: &str) -> String {
        format!("{}?updateid={}", self.config.details_url, encode(update_id))
    }

    /// Every result for `query` across all pages. A query the catalog has no
    /// results for yields an empty list.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let results = self
            .pages(query, *options, cancel)
            .try_fold(Vec::new(), |mut collected, page| async move {
                collected.extend(page.results);
                Ok(collected)
            })
            .await?;

        let results = if options.ignore_duplicates {
            retain_first_occurrences(results)
        } else {
            results
        };
        info!(
            code = "SEARCH",
            "Collected {} results for `{query}`",
            results.len()
        );
        Ok(results)
    }

    /// Lazy sequence of result pages for `query`, first page (sorted when
    /// requested) through the final page. Ends immediately when the catalog
    /// has no results.
    pub fn pages<'a>(
        &'a self,
        query: &'a str,
        options: SearchOptions,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<ResultsPage>> + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| {
            self.advance(cursor, query, options, cancel)
        })
    }

    async fn advance(
        &self,
        cursor: Cursor,
        query: &str,
        options: SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<(ResultsPage, Cursor)>> {
        let page = match cursor {
            Cursor::Start => {
                match self
                    .first_page(query, options.sort_by, options.sort_direction, cancel)
                    .await
                {
                    Ok(page) => page,
                    Err(CatalogError::NoResults(reason)) => {
                        debug!(code = "NORESULT", "{reason}");
                        return Ok(None);
                    }
                    Err(err) => return Err(err),
                }
            }
            Cursor::After(state) => self.next_page(&state, cancel).await?,
            Cursor::Done => return Ok(None),
        };
        let next = if page.is_final_page() {
            Cursor::Done
        } else {
            Cursor::After(page.state.clone())
        };
        Ok(Some((page, next)))
    }

    /// Load the first page for `query`, re-sorted when `sort_by` is set.
    ///
    /// Fails with [`CatalogError::NoResults`] when nothing matches.
    pub async fn first_page(
        &self,
        query: &str,
        sort_by: Option<SortBy>,
        sort_direction: SortDirection,
        cancel: &CancellationToken,
    ) -> Result<ResultsPage> {
        let url = self.search_url(query);
        let url = url.as_str();
        let mut page = self
            .with_reload("Search results page", url, cancel, move || async move {
                let reply = self.get(url, cancel).await?;
                parse_results_page(&reply.body, url)
            })
            .await?;
        info!(
            code = "PAGE",
            "Loaded first page for `{query}` ({} of {} results)",
            page.results.len(),
            page.results_count
        );

        if let Some(sort_by) = sort_by {
            // The header toggles per click and lands on ascending first.
            for _ in 0..sort_direction.header_clicks() {
                page = self.resort(&page.state, sort_by, query, cancel).await?;
            }
            info!(
                code = "RESORT",
                "Sorted `{query}` by {sort_by} ({sort_direction:?})"
            );
        }
        Ok(page)
    }

    async fn resort(
        &self,
        state: &PageState,
        sort_by: SortBy,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ResultsPage> {
        let form = state.sort_form(sort_by, query);
        let form = form.as_slice();
        let url = state.search_url();
        self.with_reload("Sorted results page", url, cancel, move || async move {
            let reply = self.post_form(url, form, cancel).await?;
            parse_postback_page(&reply.body, url)
        })
        .await
    }

    /// Follow the next-page postback of `state`.
    ///
    /// Fails with [`CatalogError::NoResults`] when `state` is already final.
    pub async fn next_page(
        &self,
        state: &PageState,
        cancel: &CancellationToken,
    ) -> Result<ResultsPage> {
        if state.is_final_page() {
            return Err(CatalogError::NoResults(format!(
                "{} has no pages past the final one",
                state.search_url()
            )));
        }
        let form = state.next_page_form();
        let form = form.as_slice();
        let url = state.search_url();
        let page = self
            .with_reload("Next results page", url, cancel, move || async move {
                let reply = self.post_form(url, form, cancel).await?;
                parse_postback_page(&reply.body, url)
            })
            .await?;
        debug!(
            code = "PAGE",
            "Loaded next page of {url} ({} results, final: {})",
            page.results.len(),
            page.is_final_page()
        );
        Ok(page)
    }

    /// Collect the details page and download links of `result`.
    pub async fn update_details(
        &self,
        result: &SearchResult,
        cancel: &CancellationToken,
    ) -> Result<UpdateDetail> {
        let url = self.details_url(&result.update_id);
        let url = url.as_str();
        let detail = self
            .with_reload("Update details page", url, cancel, move || async move {
                let reply = self.get(url, cancel).await?;
                parse_details_page(&reply.body, result, url)
            })
            .await?;
        let links = self.download_links(&result.update_id, cancel).await?;
        info!(
            code = "DETAILS",
            "Collected details for {} ({} download links)",
            result.update_id,
            links.len()
        );
        Ok(detail.with_download_links(links))
    }

    /// [`Self::update_details`] with every failure folded into `None`.
    pub async fn try_update_details(
        &self,
        result: &SearchResult,
        cancel: &CancellationToken,
    ) -> Option<UpdateDetail> {
        match self.update_details(result, cancel).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                warn!(
                    code = "DETAILS",
                    "Skipping details for {}: {err}", result.update_id
                );
                None
            }
        }
    }

    /// Binary URLs the download dialog offers for `update_id`.
    pub async fn download_links(
        &self,
        update_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let payload = download_payload(update_id)?;
        let url = self.config.download_url.as_str();
        let reply = self
            .guard(url, cancel, self.transport.post_multipart(url, DOWNLOAD_FIELD, payload))
            .await?;
        let links = parse_download_links(&reply.body);
        if links.is_empty() {
            return Err(CatalogError::Catalog(format!(
                "download dialog for {update_id} does not contain any download links"
            )));
        }
        Ok(links)
    }

    /// Run `attempt` until it succeeds, reloading after transient failures
    /// up to the configured budget. Each call starts with a full budget.
    async fn with_reload<T, F, Fut>(
        &self,
        operation: &str,
        url: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let budget = self.config.page_reload_attempts;
        let mut reloads: u8 = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if reloads >= budget {
                        return Err(CatalogError::attempts_exhausted(operation, budget));
                    }
                    reloads += 1;
                    warn!(
                        code = "RELOAD",
                        "{operation} failed ({err}); reload {reloads} of {budget}"
                    );
                    self.back_off(reloads, url, cancel).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn back_off(&self, reload: u8, url: &str, cancel: &CancellationToken) -> Result<()> {
        if self.config.retry_backoff_ms == 0 {
            return Ok(());
        }
        let exponent = u32::from(reload.saturating_sub(1)).min(8);
        let pause = Duration::from_millis(
            self.config
                .retry_backoff_ms
                .saturating_mul(1_u64 << exponent),
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CatalogError::Canceled { url: url.to_string() }),
            _ = sleep(pause) => Ok(()),
        }
    }

    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpReply> {
        self.guard(url, cancel, self.transport.get(url)).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        self.guard(url, cancel, self.transport.post_form(url, form))
            .await
    }

    /// Race `request` against `cancel` and reject non-success statuses.
    async fn guard<F>(&self, url: &str, cancel: &CancellationToken, request: F) -> Result<HttpReply>
    where
        F: Future<Output = Result<HttpReply>>,
    {
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CatalogError::Canceled { url: url.to_string() });
            }
            reply = request => reply?,
        };
        if !reply.is_success() {
            return Err(CatalogError::Network(format!(
                "Catalog responded with status {} for {url}",
                reply.status
            )));
        }
        Ok(reply)
    }
}

/// Parse a page reached by postback. The query already matched on the
/// initial load, so a no-results banner here is a misrendered page.
fn parse_postback_page(body: &str, url: &str) -> Result<ResultsPage> {
    parse_results_page(body, url).map_err(|err| match err {
        CatalogError::NoResults(reason) => CatalogError::TransientPage {
            url: url.to_string(),
            reason: format!("postback lost its results: {reason}"),
        },
        other => other,
    })
}

fn download_payload(update_id: &str) -> Result<String> {
    let request = [DownloadRequest {
        size: 0,
        languages: "",
        uid_info: update_id,
        update_id,
    }];
    serde_json::to_string(&request).map_err(|err| {
        CatalogError::Serialization(format!("Failed to encode download request: {err}"))
    })
}

/// Keep the first row for every (size in bytes, title) pair, order preserved.
fn retain_first_occurrences(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| {
            let (bytes, title) = result.duplicate_key();
            seen.insert((bytes, title.to_string()))
        })
        .collect()
}
