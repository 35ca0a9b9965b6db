// src/scrape/model.rs

use serde::{Deserialize, Serialize};

/// One clock hour's power state, with half-hour resolution encoded via the
/// two `*Half` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerStatus {
    On,
    Off,
    OffFirstHalf,
    OffSecondHalf,
}

/// A labelled hour of the daily table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourStatus {
    /// Fixed label from [`time_slot`], "00-01" through "23-24".
    pub time_slot: String,
    pub status: PowerStatus,
}

/// Raw per-hour schedule for one date tab. `hours` always holds exactly
/// 24 entries, ordered 0..24.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    /// Date label as displayed, e.g. "17.11.25".
    pub date: String,
    pub date_label: String,
    /// Unix timestamp carried on the date tab's `rel` attribute.
    pub timestamp: i64,
    pub hours: Vec<HourStatus>,
}

/// One row of the weekly table. Day identity is carried by position, so
/// `hours` stores bare status codes without time-slot labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDay {
    /// Localized day name as scraped, e.g. "Понеділок".
    pub day_name: String,
    /// Canonical English name; untranslatable input passes through.
    pub day_name_en: String,
    pub is_today: bool,
    pub is_yesterday: bool,
    pub hours: Vec<PowerStatus>,
    /// Merged power-ON intervals derived from `hours`, for timeline
    /// rendering. Filled in after extraction.
    pub power_blocks: Vec<PowerBlock>,
}

/// Weekly grid in source table order (Monday first, as published).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub schedule: Vec<WeekDay>,
    pub timestamp: i64,
}

/// Consolidated scrape result handed to the caller. `today`/`tomorrow` are
/// derived, human-readable ON ranges, not raw hour arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedData {
    pub street: String,
    pub house_number: String,
    /// Outage queue/group, e.g. "1.2". Empty when the page doesn't show it.
    pub queue_number: String,
    /// Upstream "last updated" stamp, e.g. "16.11.2025 19:57".
    pub last_update: String,
    pub today: Vec<String>,
    pub today_date: String,
    pub tomorrow: Vec<String>,
    pub tomorrow_date: String,
    pub week_schedule: WeekSchedule,
}

/// A contiguous power-ON interval in half-hour-resolution hour coordinates,
/// for the weekly timeline rendering. `end_hour + end_offset` never exceeds
/// 24.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBlock {
    pub start_hour: u32,
    /// 0.0 on the hour, 0.5 on the half hour.
    pub start_offset: f64,
    pub end_hour: u32,
    pub end_offset: f64,
}

/// Address the schedule is pinned to.
#[derive(Debug, Clone)]
pub struct Address {
    pub street: String,
    pub house_number: String,
}

/// Fixed hour labels. Indexed, never computed, to keep the labels free of
/// off-by-one drift.
const TIME_SLOTS: [&str; 24] = [
    "00-01", "01-02", "02-03", "03-04", "04-05", "05-06", "06-07", "07-08", "08-09", "09-10",
    "10-11", "11-12", "12-13", "13-14", "14-15", "15-16", "16-17", "17-18", "18-19", "19-20",
    "20-21", "21-22", "22-23", "23-24",
];

pub fn time_slot(index: usize) -> &'static str {
    TIME_SLOTS.get(index).copied().unwrap_or(TIME_SLOTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_slot_labels_cover_the_day() {
        assert_eq!(time_slot(0), "00-01");
        assert_eq!(time_slot(9), "09-10");
        assert_eq!(time_slot(23), "23-24");
        // Out of range falls back to the first label rather than panicking.
        assert_eq!(time_slot(24), "00-01");
    }

    #[test]
    fn power_status_serializes_kebab_case() {
        let json = serde_json::to_string(&PowerStatus::OffFirstHalf).unwrap();
        assert_eq!(json, r#""off-first-half""#);
        let back: PowerStatus = serde_json::from_str(r#""off-second-half""#).unwrap();
        assert_eq!(back, PowerStatus::OffSecondHalf);
    }
}
