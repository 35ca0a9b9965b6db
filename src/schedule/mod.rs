// src/schedule/mod.rs
//
// Pure post-processing of scraped schedules: interval normalization and the
// refetch policy. No I/O anywhere in this module; everything is a
// deterministic function of its inputs.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime};

use crate::config::{REFETCH_WINDOW_END, REFETCH_WINDOW_START, STALE_AFTER};
use crate::scrape::model::{HourStatus, PowerBlock, PowerStatus};

/// Sentinel for a fully powered day (single merged "00:00 - 24:00" range).
pub const FULL_DAY_ON_MARKER: &str = "1";

/// Sentinel for a day with zero ON slots.
pub const NO_DATA_MARKER: &str = "0";

const SLOTS_PER_DAY: usize = 48;

// ============================================================================
// Interval Normalizer
// ============================================================================

/// Expand an hour status into its two half-hour slots.
fn half_hour_slots(status: PowerStatus) -> (bool, bool) {
    match status {
        PowerStatus::On => (true, true),
        PowerStatus::Off => (false, false),
        PowerStatus::OffFirstHalf => (false, true),
        PowerStatus::OffSecondHalf => (true, false),
    }
}

/// Per-half-hour ON flags for a day, indexed 0..48.
fn expand_day(hours: &[PowerStatus]) -> Vec<bool> {
    let mut slots = Vec::with_capacity(SLOTS_PER_DAY);
    for status in hours {
        let (first, second) = half_hour_slots(*status);
        slots.push(first);
        slots.push(second);
    }
    slots
}

/// Format a half-hour index as clock time. Index 48 is the day boundary
/// and renders as "24:00".
fn format_half_hour(index: usize) -> String {
    format!("{:02}:{:02}", index / 2, (index % 2) * 30)
}

/// Merge a day's hour statuses into human-readable power-ON ranges.
///
/// All arithmetic stays in integer half-hour indices; the strings are only
/// formatted at the boundaries, so "off-first-half" adjacency (e.g. 05:30)
/// merges exactly.
pub fn to_ranges(hours: &[HourStatus]) -> Vec<String> {
    let statuses: Vec<PowerStatus> = hours.iter().map(|h| h.status).collect();
    let slots = expand_day(&statuses);

    let mut ranges: Vec<String> = Vec::new();
    let mut run_start: Option<usize> = None;

    for (idx, on) in slots.iter().enumerate() {
        match (*on, run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                ranges.push(format!(
                    "{} - {}",
                    format_half_hour(start),
                    format_half_hour(idx)
                ));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        ranges.push(format!(
            "{} - {}",
            format_half_hour(start),
            format_half_hour(slots.len())
        ));
    }

    // Entire day ON collapses to the "no outages" sentinel.
    if ranges.len() == 1 && ranges[0] == "00:00 - 24:00" {
        return vec![FULL_DAY_ON_MARKER.to_string()];
    }

    // No ON slots at all.
    if ranges.is_empty() {
        return vec![NO_DATA_MARKER.to_string()];
    }

    ranges
}

/// Merge a day's statuses into contiguous power blocks for the weekly
/// timeline, with half-hour offsets.
pub fn to_power_blocks(hours: &[PowerStatus]) -> Vec<PowerBlock> {
    let mut half_hours: Vec<usize> = Vec::new();
    for (hour, status) in hours.iter().enumerate() {
        let (first, second) = half_hour_slots(*status);
        if first {
            half_hours.push(hour * 2);
        }
        if second {
            half_hours.push(hour * 2 + 1);
        }
    }
    half_hours.sort_unstable();

    let mut blocks: Vec<PowerBlock> = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev: Option<usize> = None;

    for h in half_hours {
        match (start, prev) {
            (Some(_), Some(p)) if h == p + 1 => prev = Some(h),
            (Some(s), Some(p)) => {
                blocks.push(block_from_run(s, p));
                start = Some(h);
                prev = Some(h);
            }
            _ => {
                start = Some(h);
                prev = Some(h);
            }
        }
    }
    if let (Some(s), Some(p)) = (start, prev) {
        blocks.push(block_from_run(s, p));
    }

    // No block may render past the 24-hour boundary.
    for block in &mut blocks {
        if block.end_hour as f64 + block.end_offset > 24.0 {
            block.end_hour = 24;
            block.end_offset = 0.0;
        }
    }

    blocks
}

/// Build a block from an inclusive half-hour run `[start, prev]`. The
/// exclusive end index `prev + 1` can legitimately reach 48 (hour 24).
fn block_from_run(start: usize, prev: usize) -> PowerBlock {
    let end = prev + 1;
    PowerBlock {
        start_hour: (start / 2) as u32,
        start_offset: if start % 2 == 1 { 0.5 } else { 0.0 },
        end_hour: (end / 2) as u32,
        end_offset: if end % 2 == 1 { 0.5 } else { 0.0 },
    }
}

// ============================================================================
// Refetch Scheduler
// ============================================================================

/// Daily clock window in which cached data is eligible for refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl RefetchWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

impl Default for RefetchWindow {
    fn default() -> Self {
        let (sh, sm) = REFETCH_WINDOW_START;
        let (eh, em) = REFETCH_WINDOW_END;
        Self {
            start: NaiveTime::from_hms_opt(sh, sm, 0).unwrap(),
            end: NaiveTime::from_hms_opt(eh, em, 0).unwrap(),
        }
    }
}

/// Default staleness threshold as a chrono duration.
pub fn default_staleness() -> ChronoDuration {
    ChronoDuration::from_std(STALE_AFTER).unwrap_or_else(|_| ChronoDuration::minutes(5))
}

/// Decide whether cached schedule data justifies a new scrape.
///
/// Policy, in order: no cached data always refetches; outside the window
/// never refetches regardless of staleness (the upstream schedule only
/// changes inside it); inside the window, refetch iff the cache is older
/// than the staleness threshold.
pub fn should_refetch<T>(
    cached: Option<&T>,
    cached_at: Option<DateTime<Local>>,
    now: DateTime<Local>,
    window: RefetchWindow,
    staleness: ChronoDuration,
) -> bool {
    let (Some(_), Some(cached_at)) = (cached, cached_at) else {
        return true;
    };

    if !window.contains(now.time()) {
        return false;
    }

    now.signed_duration_since(cached_at) > staleness
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::model::time_slot;
    use chrono::TimeZone;

    fn day(statuses: [PowerStatus; 24]) -> Vec<HourStatus> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| HourStatus {
                time_slot: time_slot(i).to_string(),
                status: *s,
            })
            .collect()
    }

    fn uniform(status: PowerStatus) -> [PowerStatus; 24] {
        [status; 24]
    }

    #[test]
    fn all_on_collapses_to_full_day_sentinel() {
        let hours = day(uniform(PowerStatus::On));
        assert_eq!(to_ranges(&hours), vec![FULL_DAY_ON_MARKER.to_string()]);
    }

    #[test]
    fn all_off_yields_no_data_sentinel_and_no_blocks() {
        let hours = day(uniform(PowerStatus::Off));
        assert_eq!(to_ranges(&hours), vec![NO_DATA_MARKER.to_string()]);
        assert!(to_power_blocks(&uniform(PowerStatus::Off)).is_empty());
    }

    #[test]
    fn midday_outage_produces_two_ranges() {
        // Hours 0-13 on, 14-17 off, 18-23 on.
        let mut statuses = uniform(PowerStatus::On);
        for h in 14..18 {
            statuses[h] = PowerStatus::Off;
        }
        let ranges = to_ranges(&day(statuses));
        assert_eq!(ranges, vec!["00:00 - 14:00", "18:00 - 24:00"]);

        let blocks = to_power_blocks(&statuses);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start_hour, 0);
        assert_eq!(blocks[0].end_hour, 14);
        assert_eq!(blocks[0].end_offset, 0.0);
        assert_eq!(blocks[1].start_hour, 18);
        assert_eq!(blocks[1].end_hour, 24);
    }

    #[test]
    fn off_first_half_splits_the_day_at_the_half_hour() {
        // Hour 5 off-first-half: the day splits at 05:00 and resumes at
        // 05:30, so this is two ranges, not the full-day sentinel.
        let mut statuses = uniform(PowerStatus::On);
        statuses[5] = PowerStatus::OffFirstHalf;
        let ranges = to_ranges(&day(statuses));
        assert_eq!(ranges, vec!["00:00 - 05:00", "05:30 - 24:00"]);

        // Whereas off-first-half at hour 0 leaves 00:30 onward contiguous.
        let mut statuses = uniform(PowerStatus::On);
        statuses[0] = PowerStatus::OffFirstHalf;
        let ranges = to_ranges(&day(statuses));
        assert_eq!(ranges, vec!["00:30 - 24:00"]);
    }

    #[test]
    fn half_variants_split_at_half_hour_boundaries() {
        let mut statuses = uniform(PowerStatus::Off);
        statuses[10] = PowerStatus::OffSecondHalf; // 10:00-10:30 ON
        statuses[11] = PowerStatus::OffFirstHalf; // 11:30-12:00 ON
        let ranges = to_ranges(&day(statuses));
        assert_eq!(ranges, vec!["10:00 - 10:30", "11:30 - 12:00"]);

        let blocks = to_power_blocks(&statuses);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            (blocks[0].start_hour, blocks[0].start_offset),
            (10, 0.0)
        );
        assert_eq!((blocks[0].end_hour, blocks[0].end_offset), (10, 0.5));
        assert_eq!(
            (blocks[1].start_hour, blocks[1].start_offset),
            (11, 0.5)
        );
        assert_eq!((blocks[1].end_hour, blocks[1].end_offset), (12, 0.0));
    }

    #[test]
    fn blocks_never_extend_past_midnight() {
        // Exhaustive single-hour patterns plus the all-on day.
        for hour in 0..24 {
            for status in [
                PowerStatus::On,
                PowerStatus::OffFirstHalf,
                PowerStatus::OffSecondHalf,
            ] {
                let mut statuses = uniform(PowerStatus::Off);
                statuses[hour] = status;
                for block in to_power_blocks(&statuses) {
                    assert!(block.end_hour as f64 + block.end_offset <= 24.0);
                }
            }
        }
        for block in to_power_blocks(&uniform(PowerStatus::On)) {
            assert!(block.end_hour as f64 + block.end_offset <= 24.0);
        }
    }

    #[test]
    fn ranges_and_blocks_describe_the_same_on_periods() {
        let patterns: Vec<[PowerStatus; 24]> = vec![
            uniform(PowerStatus::On),
            uniform(PowerStatus::Off),
            {
                let mut s = uniform(PowerStatus::On);
                s[0] = PowerStatus::Off;
                s[23] = PowerStatus::OffSecondHalf;
                s
            },
            {
                let mut s = uniform(PowerStatus::Off);
                s[6] = PowerStatus::OffFirstHalf;
                s[7] = PowerStatus::On;
                s[8] = PowerStatus::OffSecondHalf;
                s
            },
        ];

        for statuses in patterns {
            let hours = day(statuses);
            let ranges = to_ranges(&hours);
            let blocks = to_power_blocks(&statuses);

            // Total ON half-hours derived from each representation agree.
            let block_halves: usize = blocks
                .iter()
                .map(|b| {
                    let start = b.start_hour as usize * 2 + if b.start_offset > 0.0 { 1 } else { 0 };
                    let end = b.end_hour as usize * 2 + if b.end_offset > 0.0 { 1 } else { 0 };
                    end - start
                })
                .sum();

            let range_halves: usize = if ranges == vec![FULL_DAY_ON_MARKER.to_string()] {
                48
            } else if ranges == vec![NO_DATA_MARKER.to_string()] {
                0
            } else {
                ranges
                    .iter()
                    .map(|r| {
                        let (start, end) = r.split_once(" - ").unwrap();
                        let to_halves = |t: &str| {
                            let (h, m) = t.split_once(':').unwrap();
                            h.parse::<usize>().unwrap() * 2 + if m == "30" { 1 } else { 0 }
                        };
                        to_halves(end) - to_halves(start)
                    })
                    .sum()
            };

            assert_eq!(block_halves, range_halves);
        }
    }

    fn local(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 17, h, m, 0).unwrap()
    }

    #[test]
    fn refetch_always_true_without_cached_data() {
        let now = local(3, 0); // far outside the window
        assert!(should_refetch::<()>(
            None,
            None,
            now,
            RefetchWindow::default(),
            default_staleness()
        ));
        // Data without a timestamp is treated as uncached.
        assert!(should_refetch(
            Some(&"data"),
            None,
            now,
            RefetchWindow::default(),
            default_staleness()
        ));
    }

    #[test]
    fn refetch_never_fires_outside_the_window() {
        let cached_at = local(10, 0);
        for (h, m) in [(0, 0), (12, 0), (20, 59), (23, 31)] {
            let now = Local.with_ymd_and_hms(2025, 11, 17, h, m, 0).unwrap();
            assert!(
                !should_refetch(
                    Some(&"data"),
                    Some(cached_at),
                    now,
                    RefetchWindow::default(),
                    default_staleness()
                ),
                "{h:02}:{m:02} is outside the window"
            );
        }
    }

    #[test]
    fn refetch_inside_window_depends_on_staleness() {
        let now = local(22, 0);
        let window = RefetchWindow::default();

        // Fresh cache: no refetch.
        assert!(!should_refetch(
            Some(&"data"),
            Some(local(21, 58)),
            now,
            window,
            default_staleness()
        ));
        // Stale cache: refetch.
        assert!(should_refetch(
            Some(&"data"),
            Some(local(21, 50)),
            now,
            window,
            default_staleness()
        ));
        // Exactly at the threshold is not yet stale (strictly older).
        assert!(!should_refetch(
            Some(&"data"),
            Some(local(21, 55)),
            now,
            window,
            default_staleness()
        ));
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let window = RefetchWindow::default();
        assert!(window.contains(NaiveTime::from_hms_opt(21, 0, 0).unwrap()));
        assert!(window.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(20, 59, 59).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(23, 30, 1).unwrap()));
    }
}
