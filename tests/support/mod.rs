//! Shared fixtures for Syn-Cat integration tests.
//!
//! Builds catalog-shaped HTML pages and provides a scripted in-memory
//! transport that replays canned replies and records every request.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use syncat_core::{CatalogConfig, CatalogError, HttpReply, Result, Transport};

pub const BASE_URL: &str = "https://catalog.test";
pub const QUERY: &str = "SQL Server 2012";
pub const SIZE_ASCENDING_FIRST_ID: &str = "19c1225f-1576-4042-9189-4afbb134e892";
pub const VERSION_FIRST_ID: &str = "b870730b-c565-4476-8e04-2961cb7966ca";

/// Catalog configuration pointed at `base` with no back-off pauses.
pub fn test_config(base: &str, reload_attempts: u8) -> CatalogConfig {
    CatalogConfig {
        page_reload_attempts: reload_attempts,
        retry_backoff_ms: 0,
        ..CatalogConfig::with_base_url(base)
    }
}

/// One row of the results table.
#[derive(Debug, Clone)]
pub struct RowFixture {
    pub update_id: String,
    pub title: String,
    pub classification: String,
    pub size_in_bytes: u64,
}

impl RowFixture {
    pub fn new(update_id: &str, title: &str, size_in_bytes: u64) -> Self {
        Self {
            update_id: update_id.to_string(),
            title: title.to_string(),
            classification: "Security Updates".to_string(),
            size_in_bytes,
        }
    }

    pub fn classified(mut self, classification: &str) -> Self {
        self.classification = classification.to_string();
        self
    }

    fn render(&self) -> String {
        format!(
            r#"<tr id="{id}_R1">
                <td class="resultsbottomBorder resultspadding"></td>
                <td class="resultsbottomBorder resultspadding"><a id="{id}_link" href="javascript:void(0);">
                    {title}
                </a></td>
                <td class="resultsbottomBorder resultspadding">SQL Server 2012 Service Pack 4, SQL Server 2012</td>
                <td class="resultsbottomBorder resultspadding">{classification}</td>
                <td class="resultsbottomBorder resultspadding">1/5/2018</td>
                <td class="resultsbottomBorder resultspadding">n/a</td>
                <td class="resultsbottomBorder resultspadding"><span id="{id}_size">1 KB</span><span id="{id}_originalSize" style="display: none;">{bytes}</span></td>
                <td class="resultsbottomBorder resultspadding"><input id="{id}" class="flatBlueButtonDownload focus-only" type="button" value="Download"></td>
            </tr>"#,
            id = self.update_id,
            title = self.title,
            classification = self.classification,
            bytes = self.size_in_bytes,
        )
    }
}

/// `count` distinct rows whose ids carry `prefix`.
pub fn rows(prefix: &str, count: usize) -> Vec<RowFixture> {
    (0..count)
        .map(|index| {
            RowFixture::new(
                &format!("{prefix}{index:04}-0000-4000-8000-000000000000"),
                &format!("{QUERY} update {prefix}{index}"),
                1_000 + index as u64,
            )
        })
        .collect()
}

/// A results page. `token` seeds the hidden postback values so tests can
/// check which page a postback was built from.
pub fn results_page(rows: &[RowFixture], total: u32, has_next: bool, token: &str) -> String {
    let body: String = rows.iter().map(RowFixture::render).collect();
    let next = if has_next {
        r#"<span><a id="ctl00_catalogBody_nextPageLinkText" href="javascript:__doPostBack('ctl00$catalogBody$nextPageLinkText','')">Next</a></span>"#
    } else {
        ""
    };
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Microsoft Update Catalog</title></head>
<body><form method="post" action="./Search.aspx?q=SQL%20Server%202012" id="aspnetForm">
<div class="aspNetHidden">
<input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
<input type="hidden" name="__EVENTARGUMENT" id="__EVENTARGUMENT" value="" />
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="viewstate-{token}" />
</div>
<div class="aspNetHidden">
<input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="generator-{token}" />
<input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="validation-{token}" />
</div>
<span id="ctl00_catalogBody_searchDuration">Search results for "SQL Server 2012"<br/>Updates: 1 - 25 of {total} (page 1 of 2)</span>
<table class="resultsBorder" id="ctl00_catalogBody_updateMatches">
<tr id="headerRow">
    <td></td><td><a id="ctl00_catalogBody_updateMatches_ctl02_titleHeaderLink">Title</a></td>
    <td>Products</td><td>Classification</td><td>Last Updated</td><td>Version</td><td>Size</td><td></td>
</tr>
{body}
</table>
{next}
</form></body></html>"#
    )
}

/// A page whose results table failed to render.
pub fn tableless_page() -> String {
    r#"<html><body><form>
<input type="hidden" id="__VIEWSTATE" value="v" />
<input type="hidden" id="__VIEWSTATEGENERATOR" value="g" />
<input type="hidden" id="__EVENTVALIDATION" value="e" />
<span id="ctl00_catalogBody_searchDuration"></span>
</form></body></html>"#
        .to_string()
}

pub fn no_results_page() -> String {
    r#"<html><body><form>
<span id="ctl00_catalogBody_noResultText">We did not find any results for "zzzz".</span>
</form></body></html>"#
        .to_string()
}

fn common_details(uninstall_notes: &str) -> String {
    format!(
        r#"<span id="ScopedViewHandler_titleText">Sample</span>
<div id="dateDiv"><span>Last Modified:</span> 1/5/2018</div>
<span id="ScopedViewHandler_desc">A security issue has been identified in a Microsoft software product.</span>
<div id="archDiv">
    <span class="labelTitle">Architecture:</span>
    AMD64, X86
</div>
<div id="languagesDiv">
    <span class="labelTitle">Supported languages:</span>
    English, German
</div>
<div id="moreInfoDiv">
    <span class="labelTitle">More information:</span>
    <div><a href="https://support.microsoft.com/help/4057116" target="_blank">https://support.microsoft.com/help/4057116</a></div>
</div>
<div id="suportUrlDiv">
    <span class="labelTitle">Support Url:</span>
    <div><a href="https://support.microsoft.com" target="_blank">https://support.microsoft.com</a></div>
</div>
<span id="ScopedViewHandler_rebootBehavior">Can request restart</span>
<span id="ScopedViewHandler_userInput">No</span>
<span id="ScopedViewHandler_installationImpact">Normal</span>
<span id="ScopedViewHandler_connectivity">No</span>
{uninstall_notes}
<div id="uninstallStepsDiv"><span class="labelTitle">Uninstall Steps:</span><br/>n/a</div>"#
    )
}

/// Details page for a patch classification.
pub fn patch_details_page() -> String {
    format!(
        r#"<html><body>{}
<div id="securityBullitenDiv"><span class="labelTitle">MSRC Number:</span><br/>MS18-001</div>
<span id="ScopedViewHandler_msrcSeverity">Important</span>
<div id="kbDiv"><span class="labelTitle">KB article numbers:</span><br/>4057116</div>
<div id="supersededbyInfo" TABINDEX="1">
    <div><a href="ScopedViewInline.aspx?updateid=7d31c1b3-2b8a-4b7a-9f8e-1c0a5d2e3f40">Security Update for SQL Server 2012 SP4 GDR (KB4532097)</a></div>
</div>
<div id="supersedesInfo" TABINDEX="1">
    n/a
</div>
</body></html>"#,
        common_details(
            r#"<div id="uninstallNotesDiv"><span class="labelTitle">Uninstall Notes:</span><br/>This software update can be removed via Add or Remove Programs in Control Panel.</div>"#
        )
    )
}

/// Details page for a driver classification.
pub fn driver_details_page() -> String {
    format!(
        r#"<html><body>{}
<span id="ScopedViewHandler_company">Lenovo</span>
<span id="ScopedViewHandler_manufacturer">Intel Corporation</span>
<span id="ScopedViewHandler_driverClass">Net</span>
<span id="ScopedViewHandler_driverModel">Intel(R) Wi-Fi 6 AX201 160MHz</span>
<span id="ScopedViewHandler_driverProvider">Intel</span>
<span id="ScopedViewHandler_version">22.40.0.7</span>
<span id="ScopedViewHandler_versionDate">2/24/2023</span>
<div id="driverhwIDs">
    <div>pci\ven_8086&amp;dev_a0f0&amp;subsys_00748086
    </div>
    <div>pci\ven_8086&amp;dev_02f0&amp;subsys_00748086
    </div>
</div>
</body></html>"#,
        common_details(
            r#"<div id="uninstallNotesDiv"><span class="labelTitle">Uninstall Notes:</span><br/>n/a</div>"#
        )
    )
}

pub fn error_page(code: &str) -> String {
    format!(
        r#"<html><body><div id="errorPage"><div id="errorPageDisplayedError"><span>Error number:</span> {code}]</div></div></body></html>"#
    )
}

pub fn download_dialog(links: &[&str]) -> String {
    let assignments: String = links
        .iter()
        .enumerate()
        .map(|(index, link)| format!("downloadInformation[0].files[{index}].url = '{link}';\n"))
        .collect();
    format!(
        "<html><head><script type=\"text/javascript\">\nvar downloadInformation = new Array();\n{assignments}</script></head><body></body></html>"
    )
}

/// What a scripted step does when the controller issues a request.
pub enum Step {
    Reply(HttpReply),
    Fail(CatalogError),
    /// Never answers; only cancellation ends the request.
    Hang,
}

impl Step {
    pub fn page(body: String) -> Self {
        Step::Reply(HttpReply::ok(body))
    }

    pub fn status(status: u16) -> Self {
        Step::Reply(HttpReply {
            status,
            body: String::new(),
        })
    }

    pub fn timeout() -> Self {
        Step::Fail(CatalogError::Timeout {
            url: BASE_URL.to_string(),
        })
    }
}

/// A request as the controller issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Get(String),
    Form(String, Vec<(String, String)>),
    Multipart(String, String, String),
}

impl Recorded {
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match self {
            Recorded::Form(_, form) => form
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// Transport that replays a fixed script of steps in order.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().expect("steps lock").len()
    }

    async fn play(&self, request: Recorded) -> Result<HttpReply> {
        self.requests.lock().expect("requests lock").push(request);
        let step = self.steps.lock().expect("steps lock").pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(CatalogError::Network("script exhausted".into())),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        self.play(Recorded::Get(url.to_string())).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpReply> {
        self.play(Recorded::Form(url.to_string(), form.to_vec()))
            .await
    }

    async fn post_multipart(&self, url: &str, field: &str, value: String) -> Result<HttpReply> {
        self.play(Recorded::Multipart(
            url.to_string(),
            field.to_string(),
            value,
        ))
        .await
    }
}
