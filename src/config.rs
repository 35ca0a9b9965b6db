// src/config.rs

use std::time::Duration;

// ============================================================================
// Source site
// ============================================================================

/// Address-driven outage schedule page. Override with `SCHEDULE_URL`.
pub const SCHEDULE_URL: &str = "https://www.dtek-kem.com.ua/ua/shutdowns";

/// Default address the schedule is pinned to. Override with `STREET` /
/// `HOUSE_NUM` env vars or the CLI flags.
pub const DEFAULT_STREET: &str = "вул. Зоологічна";
pub const DEFAULT_HOUSE_NUM: &str = "12/15";

// ============================================================================
// Selectors
//
// Every selector on the upstream page lives here. The page is not a stable
// API: class names and structure change without notice, so adaptation must
// never require touching the driver or extractor code.
// ============================================================================

// Address form
pub const STREET_INPUT_SELECTOR: &str = "#discon_form #street";
pub const STREET_AUTOCOMPLETE_LIST_SELECTOR: &str = "#streetautocomplete-list";
pub const STREET_AUTOCOMPLETE_ITEM_SELECTOR: &str = "#streetautocomplete-list div";
pub const HOUSE_NUM_INPUT_SELECTOR: &str = "#discon_form #house_num";
pub const HOUSE_NUM_AUTOCOMPLETE_LIST_SELECTOR: &str = "#house_numautocomplete-list";
pub const HOUSE_NUM_AUTOCOMPLETE_ITEM_SELECTOR: &str = "#house_numautocomplete-list div";

// Schedule data
pub const DISCON_FACT_SELECTOR: &str = "#discon-fact.active";
pub const QUEUE_NUMBER_SELECTOR: &str = r#"#group-name[style*="display: block"] span"#;
pub const LAST_UPDATE_SELECTOR: &str = ".discon-fact-info-text .update";
pub const DATE_TAB_ACTIVE_SELECTOR: &str = ".dates .date.active";
pub const DATE_TAB_INACTIVE_SELECTOR: &str = ".dates .date:not(.active)";
pub const DATE_SPAN_SELECTOR: &str = r#"span[rel="date"]"#;
pub const ACTIVE_TABLE_ROWS_SELECTOR: &str = ".discon-fact-table.active table tbody tr";
pub const TABLE_CELLS_SELECTOR: &str = "td:not([colspan])";

// Weekly table
pub const WEEK_TABLE_SELECTOR: &str = "#tableRenderElem";
pub const WEEK_ROWS_SELECTOR: &str = "#tableRenderElem table tbody tr";
pub const WEEK_DAY_NAME_SELECTOR: &str = r#"td[colspan="2"] div"#;
pub const WEEK_DAY_CELL_SELECTOR: &str = r#"td[colspan="2"]"#;
pub const WEEK_YESTERDAY_ROW_CLASS: &str = "yesterday-row";
pub const WEEK_CURRENT_DAY_CLASS: &str = "current-day";

// Status cell classes, substring-matched. "scheduled" variants must be
// checked before "non-scheduled"; the names are not disjoint.
pub const CELL_SCHEDULED_MAYBE_CLASS: &str = "cell-scheduled-maybe";
pub const CELL_SCHEDULED_CLASS: &str = "cell-scheduled";
pub const CELL_FIRST_HALF_CLASS: &str = "cell-first-half";
pub const CELL_SECOND_HALF_CLASS: &str = "cell-second-half";
pub const CELL_NON_SCHEDULED_CLASS: &str = "cell-non-scheduled";

// ============================================================================
// Overlay sweep
// ============================================================================

/// Class-name fragments that identify interstitial overlays.
pub const MODAL_CLASS_PATTERNS: [&str; 4] = ["modal", "popup", "overlay", "cookie"];

/// Anything stacked above this is treated as a click-blocking layer.
pub const OVERLAY_Z_INDEX_THRESHOLD: i64 = 1000;

// ============================================================================
// Timeouts and delays
// ============================================================================

pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const AUTOCOMPLETE_TIMEOUT: Duration = Duration::from_secs(15);
pub const INPUT_ENABLED_TIMEOUT: Duration = Duration::from_secs(15);
pub const SCHEDULE_VISIBLE_TIMEOUT: Duration = Duration::from_secs(5);
pub const WEEK_TABLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Interval between visibility polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Delay after the house-number selection for the schedule UI to render.
pub const FORM_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Delay after the today/tomorrow tab switch before re-reading the table.
pub const TAB_SETTLE_DELAY: Duration = Duration::from_millis(500);

// ============================================================================
// Browser lifecycle
// ============================================================================

/// Idle eviction threshold for the shared browser process.
pub const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Refetch policy
// ============================================================================

/// Daily clock window in which the upstream schedule changes/finalizes.
pub const REFETCH_WINDOW_START: (u32, u32) = (21, 0);
pub const REFETCH_WINDOW_END: (u32, u32) = (23, 30);

/// Cached data older than this (inside the window) is stale.
pub const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// How often the `watch` loop re-evaluates the refetch policy.
pub const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(60);
