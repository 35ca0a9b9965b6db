// src/scrape/extract.rs
//
// Pure extraction from captured DOM snapshots. The driver hands over the
// page HTML; everything here parses it with `scraper`, so the whole module
// is testable against fixture documents.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::{
    ACTIVE_TABLE_ROWS_SELECTOR, CELL_FIRST_HALF_CLASS, CELL_NON_SCHEDULED_CLASS,
    CELL_SCHEDULED_CLASS, CELL_SCHEDULED_MAYBE_CLASS, CELL_SECOND_HALF_CLASS,
    DATE_SPAN_SELECTOR, DATE_TAB_ACTIVE_SELECTOR, LAST_UPDATE_SELECTOR, QUEUE_NUMBER_SELECTOR,
    TABLE_CELLS_SELECTOR, WEEK_CURRENT_DAY_CLASS, WEEK_DAY_CELL_SELECTOR, WEEK_DAY_NAME_SELECTOR,
    WEEK_ROWS_SELECTOR, WEEK_YESTERDAY_ROW_CLASS,
};
use crate::error::ScrapeError;
use crate::scrape::model::{DaySchedule, HourStatus, PowerStatus, WeekDay, time_slot};

const HOURS_PER_DAY: usize = 24;

/// Map a status cell's CSS class to a power status.
///
/// The "scheduled" variants are checked before "non-scheduled": the class
/// names share substrings, and this ordering avoids the false positive.
/// Anything unrecognized (including a missing class) defaults to `On`:
/// absence of an outage flag is treated as power available.
pub fn map_status_class(class: Option<&str>) -> PowerStatus {
    let Some(class) = class else {
        return PowerStatus::On;
    };

    if class.contains(CELL_SCHEDULED_MAYBE_CLASS) {
        return PowerStatus::Off;
    }
    if class.contains(CELL_SCHEDULED_CLASS) && !class.contains(CELL_NON_SCHEDULED_CLASS) {
        return PowerStatus::Off;
    }
    if class.contains(CELL_FIRST_HALF_CLASS) {
        return PowerStatus::OffFirstHalf;
    }
    if class.contains(CELL_SECOND_HALF_CLASS) {
        return PowerStatus::OffSecondHalf;
    }

    PowerStatus::On
}

/// Translate a localized day name to its canonical English form.
/// Untranslatable names pass through unchanged.
pub fn map_day_name(localized: &str) -> String {
    match localized {
        "Понеділок" => "Monday",
        "Вівторок" => "Tuesday",
        "Середа" => "Wednesday",
        "Четвер" => "Thursday",
        "П'ятниця" => "Friday",
        "Субота" => "Saturday",
        "Неділя" => "Sunday",
        other => other,
    }
    .to_string()
}

fn classes<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().attr("class").unwrap_or("")
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse the currently active date tab's table into a day schedule.
///
/// Which date is active depends on prior driver actions: on arrival it is
/// today; after the tab switch it is tomorrow.
pub fn parse_active_day(doc: &Html, date_label: &str) -> Result<DaySchedule, ScrapeError> {
    let tab_selector = Selector::parse(DATE_TAB_ACTIVE_SELECTOR).unwrap();
    let span_selector = Selector::parse(DATE_SPAN_SELECTOR).unwrap();

    let tab = doc
        .select(&tab_selector)
        .next()
        .ok_or_else(|| ScrapeError::Extraction("active date tab not found".to_string()))?;

    let date = tab
        .select(&span_selector)
        .next()
        .map(|span| text_of(&span))
        .unwrap_or_default();

    let timestamp = tab
        .value()
        .attr("rel")
        .and_then(|rel| rel.parse::<i64>().ok())
        .unwrap_or(0);

    let row_selector = Selector::parse(ACTIVE_TABLE_ROWS_SELECTOR).unwrap();
    let cell_selector = Selector::parse(TABLE_CELLS_SELECTOR).unwrap();

    let hours: Vec<HourStatus> = doc
        .select(&row_selector)
        .flat_map(|row| row.select(&cell_selector).collect::<Vec<_>>())
        .enumerate()
        .map(|(index, cell)| HourStatus {
            time_slot: time_slot(index).to_string(),
            status: map_status_class(cell.value().attr("class")),
        })
        .collect();

    if hours.len() != HOURS_PER_DAY {
        return Err(ScrapeError::Extraction(format!(
            "expected {} status cells for `{}`, found {}",
            HOURS_PER_DAY,
            date_label,
            hours.len()
        )));
    }

    Ok(DaySchedule {
        date,
        date_label: date_label.to_string(),
        timestamp,
        hours,
    })
}

/// Parse the weekly table into its rows, in source order.
///
/// Row order is authoritative (Monday first as published); nothing is
/// recomputed from the calendar.
pub fn parse_week(doc: &Html) -> Result<Vec<WeekDay>, ScrapeError> {
    let row_selector = Selector::parse(WEEK_ROWS_SELECTOR).unwrap();
    let name_selector = Selector::parse(WEEK_DAY_NAME_SELECTOR).unwrap();
    let day_cell_selector = Selector::parse(WEEK_DAY_CELL_SELECTOR).unwrap();
    let cell_selector = Selector::parse(TABLE_CELLS_SELECTOR).unwrap();

    let mut days = Vec::new();

    for row in doc.select(&row_selector) {
        let day_name = row
            .select(&name_selector)
            .next()
            .map(|el| text_of(&el))
            .unwrap_or_default();

        let is_yesterday = classes(&row).contains(WEEK_YESTERDAY_ROW_CLASS);

        let is_today = row
            .select(&day_cell_selector)
            .next()
            .map(|cell| classes(&cell).contains(WEEK_CURRENT_DAY_CLASS))
            .unwrap_or(false);

        let hours: Vec<PowerStatus> = row
            .select(&cell_selector)
            .map(|cell| map_status_class(cell.value().attr("class")))
            .collect();

        if hours.len() != HOURS_PER_DAY {
            return Err(ScrapeError::Extraction(format!(
                "weekly row `{}` has {} status cells, expected {}",
                day_name,
                hours.len(),
                HOURS_PER_DAY
            )));
        }

        days.push(WeekDay {
            day_name_en: map_day_name(&day_name),
            day_name,
            is_today,
            is_yesterday,
            hours,
            power_blocks: Vec::new(),
        });
    }

    if days.len() != 7 {
        return Err(ScrapeError::Extraction(format!(
            "weekly table has {} rows, expected 7",
            days.len()
        )));
    }

    Ok(days)
}

/// Outage queue/group number. The element is only rendered for some
/// addresses; absence is not an error.
pub fn parse_queue_number(doc: &Html) -> String {
    let selector = Selector::parse(QUEUE_NUMBER_SELECTOR).unwrap();
    doc.select(&selector)
        .next()
        .map(|el| text_of(&el))
        .unwrap_or_default()
}

/// The upstream "last updated" stamp. Surrounding label text varies, so the
/// timestamp is picked out when present and the trimmed text kept otherwise.
pub fn parse_last_update(doc: &Html) -> String {
    let selector = Selector::parse(LAST_UPDATE_SELECTOR).unwrap();
    let raw = doc
        .select(&selector)
        .next()
        .map(|el| text_of(&el))
        .unwrap_or_default();

    let stamp_re = Regex::new(r"\d{2}\.\d{2}\.\d{4}\s+\d{1,2}:\d{2}").unwrap();
    match stamp_re.find(&raw) {
        Some(m) => m.as_str().split_whitespace().collect::<Vec<_>>().join(" "),
        None => raw,
    }
}
