// src/scrape/mod.rs

pub mod extract;
pub mod model;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chromiumoxide::page::Page;
use chrono::{DateTime, Local, Utc};
use scraper::Html;
use serde::de::DeserializeOwned;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::browser::BrowserManager;
use crate::config::{
    AUTOCOMPLETE_TIMEOUT, DATE_TAB_INACTIVE_SELECTOR, DEFAULT_HOUSE_NUM, DEFAULT_STREET,
    DISCON_FACT_SELECTOR, FORM_SETTLE_DELAY, HOUSE_NUM_AUTOCOMPLETE_ITEM_SELECTOR,
    HOUSE_NUM_AUTOCOMPLETE_LIST_SELECTOR, HOUSE_NUM_INPUT_SELECTOR, INPUT_ENABLED_TIMEOUT,
    MODAL_CLASS_PATTERNS, NAVIGATION_TIMEOUT, OVERLAY_Z_INDEX_THRESHOLD, POLL_INTERVAL,
    SCHEDULE_URL, SCHEDULE_VISIBLE_TIMEOUT, STREET_AUTOCOMPLETE_ITEM_SELECTOR,
    STREET_AUTOCOMPLETE_LIST_SELECTOR, STREET_INPUT_SELECTOR, TAB_SETTLE_DELAY,
    WATCH_POLL_INTERVAL, WEEK_TABLE_SELECTOR, WEEK_TABLE_TIMEOUT,
};
use crate::error::ScrapeError;
use crate::schedule::{RefetchWindow, default_staleness, should_refetch, to_power_blocks, to_ranges};
use crate::scrape::model::{Address, DaySchedule, ScrapedData, WeekSchedule};
use crate::utils::{ensure_dir, js_string, resolve_env};

// ============================================================================
// Arguments
// ============================================================================

#[derive(clap::Args)]
pub struct ScrapeArgs {
    /// Street to pin the schedule to (falls back to STREET env, then the
    /// built-in default)
    #[arg(long)]
    street: Option<String>,

    /// House number (falls back to HOUSE_NUM env, then the built-in default)
    #[arg(long)]
    house: Option<String>,

    /// Write the result JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Street to pin the schedule to
    #[arg(long)]
    street: Option<String>,

    /// House number
    #[arg(long)]
    house: Option<String>,

    /// Directory where schedule snapshots are saved
    #[arg(short, long, default_value = "./storage/schedules")]
    output_dir: PathBuf,
}

fn resolve_address(street: Option<String>, house: Option<String>) -> Address {
    Address {
        street: street.unwrap_or_else(|| resolve_env("STREET", DEFAULT_STREET)),
        house_number: house.unwrap_or_else(|| resolve_env("HOUSE_NUM", DEFAULT_HOUSE_NUM)),
    }
}

// ============================================================================
// CLI entry points
// ============================================================================

/// One-shot scrape: fetch the schedule once and emit it as JSON.
pub async fn run(args: ScrapeArgs) -> Result<()> {
    let address = resolve_address(args.street, args.house);
    let manager = BrowserManager::new();

    let result = scrape_schedule(&manager, &address).await;
    manager.shutdown().await;

    let data = result?;
    let json = serde_json::to_string_pretty(&data)?;

    match args.output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("saved schedule to {:?}", path);
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Long-running mode: re-evaluate the refetch policy on a fixed cadence and
/// scrape only when cached data is stale inside the refresh window.
pub async fn watch(args: WatchArgs) -> Result<()> {
    ensure_dir(&args.output_dir)?;

    let address = resolve_address(args.street, args.house);
    let manager = BrowserManager::new();
    let window = RefetchWindow::default();
    let staleness = default_staleness();

    let mut cached: Option<ScrapedData> = None;
    let mut cached_at: Option<DateTime<Local>> = None;

    info!(
        "watching {} {} (window {} - {})",
        address.street, address.house_number, window.start, window.end
    );

    let mut ticker = tokio::time::interval(WATCH_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        let now = Local::now();

        if should_refetch(cached.as_ref(), cached_at, now, window, staleness) {
            match scrape_schedule(&manager, &address).await {
                Ok(data) => {
                    save_schedule(&args.output_dir, &data)?;
                    cached = Some(data);
                    cached_at = Some(Local::now());
                }
                // No automatic retry; the next policy tick decides.
                Err(e) => warn!("scrape attempt failed: {e}"),
            }
        } else if !window.contains(now.time()) && manager.is_alive().await {
            // Nothing can fire until the window opens again; don't keep a
            // browser process alive for hours.
            manager.shutdown().await;
        }
    }
}

fn save_schedule(base_dir: &Path, data: &ScrapedData) -> Result<()> {
    let filename = format!("schedule_{}.json", Local::now().format("%Y-%m-%d"));
    let path = base_dir.join(filename);

    let json_str = serde_json::to_string_pretty(data)?;
    fs::write(&path, json_str).with_context(|| format!("Failed to write {:?}", path))?;

    info!("saved schedule snapshot to {:?}", path);
    Ok(())
}

// ============================================================================
// Public operation
// ============================================================================

/// Scrape the current outage schedule for one address.
///
/// Acquires a page from the shared browser, drives the address form,
/// extracts today/tomorrow/week and returns the consolidated result. The
/// page is closed on every exit path, including failures.
pub async fn scrape_schedule(
    manager: &BrowserManager,
    address: &Address,
) -> Result<ScrapedData, ScrapeError> {
    info!(
        "scrape: start for {} {}",
        address.street, address.house_number
    );

    let page = manager.acquire_page().await?;
    let result = scrape_on_page(&page, address).await;

    if let Err(e) = page.close().await {
        warn!("page close failed: {e}");
    }

    if result.is_ok() {
        info!("scrape: done");
    }
    result
}

async fn scrape_on_page(page: &Page, address: &Address) -> Result<ScrapedData, ScrapeError> {
    navigate(page).await?;
    info!("scrape: page opened");

    nuke_overlays(page).await;
    prime_schedule_page(page, &address.street, &address.house_number).await?;
    info!("scrape: address form filled");

    // The schedule panel must be live before reading anything from it.
    if !wait_visible(page, DISCON_FACT_SELECTOR, SCHEDULE_VISIBLE_TIMEOUT)
        .await
        .map_err(ScrapeError::Extraction)?
    {
        return Err(ScrapeError::Extraction(
            "schedule panel never became visible".to_string(),
        ));
    }

    let doc = snapshot(page).await?;
    let queue_number = extract::parse_queue_number(&doc);
    let last_update = extract::parse_last_update(&doc);
    let today = extract::parse_active_day(&doc, "Today")?;
    info!("scrape: today extracted");

    // Tab switch, then re-read. Strictly serial with the today read: both
    // tabs render into the same active table.
    let tomorrow = extract_tomorrow(page).await?;
    info!("scrape: tomorrow extracted");

    if !wait_visible(page, WEEK_TABLE_SELECTOR, WEEK_TABLE_TIMEOUT)
        .await
        .map_err(ScrapeError::Extraction)?
    {
        return Err(ScrapeError::Extraction(
            "weekly table never became visible".to_string(),
        ));
    }

    let doc = snapshot(page).await?;
    let mut week = extract::parse_week(&doc)?;
    for day in &mut week {
        day.power_blocks = to_power_blocks(&day.hours);
    }
    if week.iter().filter(|d| d.is_today).count() != 1 {
        // Source order stays authoritative; flag it for operators only.
        warn!("weekly table does not mark exactly one current day");
    }
    info!("scrape: week extracted ({} rows)", week.len());

    Ok(ScrapedData {
        street: address.street.clone(),
        house_number: address.house_number.clone(),
        queue_number,
        last_update,
        today: to_ranges(&today.hours),
        today_date: today.date,
        tomorrow: to_ranges(&tomorrow.hours),
        tomorrow_date: tomorrow.date,
        week_schedule: WeekSchedule {
            schedule: week,
            timestamp: Utc::now().timestamp_millis(),
        },
    })
}

async fn extract_tomorrow(page: &Page) -> Result<DaySchedule, ScrapeError> {
    let tab = page
        .find_element(DATE_TAB_INACTIVE_SELECTOR)
        .await
        .map_err(|e| ScrapeError::Extraction(format!("tomorrow tab not found: {e}")))?;
    tab.click()
        .await
        .map_err(|e| ScrapeError::Extraction(format!("tomorrow tab click failed: {e}")))?;

    sleep(TAB_SETTLE_DELAY).await;

    let doc = snapshot(page).await?;
    extract::parse_active_day(&doc, "Tomorrow")
}

// ============================================================================
// Page Automation Driver
// ============================================================================

/// Drive the cascading street → house-number form until the schedule for
/// the requested address is rendered.
pub async fn prime_schedule_page(
    page: &Page,
    street: &str,
    house_number: &str,
) -> Result<(), ScrapeError> {
    fill_input(page, STREET_INPUT_SELECTOR, street).await?;
    debug!("driver: street input filled");

    // Overlays reappear after interaction, not only at load.
    nuke_overlays(page).await;

    wait_for_autocomplete(page, STREET_AUTOCOMPLETE_LIST_SELECTOR, "street autocomplete").await?;
    click_matching_item(
        page,
        STREET_AUTOCOMPLETE_ITEM_SELECTOR,
        street,
        "street autocomplete",
    )
    .await?;
    debug!("driver: street selected");

    // The house-number input unlocks only once a street is chosen.
    let enabled = poll_until(
        page,
        &enabled_check(HOUSE_NUM_INPUT_SELECTOR),
        INPUT_ENABLED_TIMEOUT,
    )
    .await
    .map_err(ScrapeError::FormFill)?;
    if !enabled {
        return Err(ScrapeError::FormFill(
            "house-number input stayed disabled".to_string(),
        ));
    }

    fill_input(page, HOUSE_NUM_INPUT_SELECTOR, house_number).await?;
    nuke_overlays(page).await;

    wait_for_autocomplete(
        page,
        HOUSE_NUM_AUTOCOMPLETE_LIST_SELECTOR,
        "house-number autocomplete",
    )
    .await?;
    click_matching_item(
        page,
        HOUSE_NUM_AUTOCOMPLETE_ITEM_SELECTOR,
        house_number,
        "house-number autocomplete",
    )
    .await?;
    debug!("driver: house number selected");

    // Let the schedule UI finish rendering after the selection.
    sleep(FORM_SETTLE_DELAY).await;
    Ok(())
}

async fn navigate(page: &Page) -> Result<(), ScrapeError> {
    let url = resolve_env("SCHEDULE_URL", SCHEDULE_URL);

    // DOM content is enough; waiting for full network idle is unreliable
    // against this target and causes spurious timeouts.
    match tokio::time::timeout(NAVIGATION_TIMEOUT, page.goto(url.clone())).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(ScrapeError::Navigation(format!("{url}: {e}"))),
        Err(_) => Err(ScrapeError::Navigation(format!(
            "{url}: timed out after {NAVIGATION_TIMEOUT:?}"
        ))),
    }
}

/// Remove every element matching a known modal class pattern and every
/// element stacked above the z-index threshold.
///
/// The upstream page injects overlay elements nondeterministically at
/// several points during automation; targeting one known modal selector
/// intermittently deadlocks on an invisible click-blocking layer. Absence
/// of overlays is not a failure, and neither is a sweep that cannot run:
/// the next driver step will surface its own typed error.
async fn nuke_overlays(page: &Page) {
    let script = format!(
        r#"(() => {{
            const patterns = {patterns};
            const threshold = {threshold};
            let removed = 0;
            for (const el of Array.from(document.querySelectorAll('body *'))) {{
                const cls = typeof el.className === 'string' ? el.className.toLowerCase() : '';
                const byClass = patterns.some((p) => cls.includes(p));
                const z = parseInt(window.getComputedStyle(el).zIndex, 10);
                const byStack = !Number.isNaN(z) && z > threshold;
                if (byClass || byStack) {{
                    el.remove();
                    removed += 1;
                }}
            }}
            return removed;
        }})()"#,
        patterns = serde_json::json!(MODAL_CLASS_PATTERNS),
        threshold = OVERLAY_Z_INDEX_THRESHOLD,
    );

    match eval_value::<i64>(page, &script).await {
        Ok(removed) if removed > 0 => debug!("driver: removed {removed} overlay element(s)"),
        Ok(_) => {}
        Err(e) => warn!("driver: overlay sweep failed: {e}"),
    }
}

/// Set an input's value and dispatch a real `input` event. The upstream
/// autocomplete widgets react only to DOM events, not to programmatic
/// value assignment.
async fn fill_input(page: &Page, selector: &str, value: &str) -> Result<(), ScrapeError> {
    let script = format!(
        r#"(() => {{
            const input = document.querySelector({sel});
            if (!input) return false;
            input.value = {val};
            input.dispatchEvent(new Event('input', {{ bubbles: true }}));
            return true;
        }})()"#,
        sel = js_string(selector),
        val = js_string(value),
    );

    let filled: bool = eval_value(page, &script)
        .await
        .map_err(ScrapeError::FormFill)?;
    if !filled {
        return Err(ScrapeError::FormFill(format!(
            "input `{selector}` not found"
        )));
    }
    Ok(())
}

async fn wait_for_autocomplete(
    page: &Page,
    selector: &str,
    step: &'static str,
) -> Result<(), ScrapeError> {
    let visible = wait_visible(page, selector, AUTOCOMPLETE_TIMEOUT)
        .await
        .map_err(|_| ScrapeError::AutocompleteTimeout { step })?;
    if !visible {
        return Err(ScrapeError::AutocompleteTimeout { step });
    }
    Ok(())
}

/// Click the first autocomplete entry whose text contains `text`, retrying
/// until the bounded wait elapses (entries stream in asynchronously).
async fn click_matching_item(
    page: &Page,
    selector: &str,
    text: &str,
    step: &'static str,
) -> Result<(), ScrapeError> {
    let script = format!(
        r#"(() => {{
            for (const el of Array.from(document.querySelectorAll({sel}))) {{
                if ((el.textContent || '').includes({text})) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()"#,
        sel = js_string(selector),
        text = js_string(text),
    );

    let clicked = poll_until(page, &script, AUTOCOMPLETE_TIMEOUT)
        .await
        .map_err(|_| ScrapeError::AutocompleteTimeout { step })?;
    if !clicked {
        return Err(ScrapeError::AutocompleteTimeout { step });
    }
    Ok(())
}

// ============================================================================
// CDP helpers
// ============================================================================

/// Capture the live DOM for offline parsing.
async fn snapshot(page: &Page) -> Result<Html, ScrapeError> {
    let html: String = eval_value(page, "document.documentElement.outerHTML")
        .await
        .map_err(|e| ScrapeError::Extraction(format!("dom snapshot failed: {e}")))?;
    Ok(Html::parse_document(&html))
}

async fn eval_value<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T, String> {
    page.evaluate(script.to_string())
        .await
        .map_err(|e| e.to_string())?
        .into_value()
        .map_err(|e| e.to_string())
}

fn visible_check(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); return !!el && el.offsetParent !== null; }})()",
        sel = js_string(selector)
    )
}

fn enabled_check(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); return !!el && !el.disabled; }})()",
        sel = js_string(selector)
    )
}

async fn wait_visible(page: &Page, selector: &str, timeout: Duration) -> Result<bool, String> {
    poll_until(page, &visible_check(selector), timeout).await
}

/// Poll a boolean script until it returns true or the bounded wait elapses.
/// `Ok(false)` is a timeout; `Err` is a transport/evaluation failure. There
/// is no unbounded wait anywhere in the driver.
async fn poll_until(page: &Page, script: &str, timeout: Duration) -> Result<bool, String> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if eval_value::<bool>(page, script).await? {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(POLL_INTERVAL).await;
    }
}
