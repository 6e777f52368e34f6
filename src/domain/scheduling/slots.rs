//! Slot candidates and interval exclusion.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::TimeWindow;

use super::AvailabilityRule;

/// A bookable window derived at query time.
///
/// `window` is what the requester books; `footprint` is the window widened
/// by the rule's buffers and is what must be free for the slot to be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    window: TimeWindow,
    footprint: TimeWindow,
}

impl Slot {
    pub fn new(window: TimeWindow, footprint: TimeWindow) -> Self {
        Self { window, footprint }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn footprint(&self) -> TimeWindow {
        self.footprint
    }
}

/// Expands every rule over `range` and returns the candidates ordered by
/// start. When two rules produce the same window the widest footprint wins.
pub fn expand_rules(rules: &[AvailabilityRule], range: &TimeWindow) -> Vec<Slot> {
    let mut slots: Vec<Slot> = rules.iter().flat_map(|rule| rule.expand(range)).collect();
    slots.sort_by(|a, b| {
        a.window
            .cmp(&b.window)
            .then_with(|| b.footprint.duration().cmp(&a.footprint.duration()))
    });
    slots.dedup_by(|later, kept| later.window == kept.window);
    slots
}

/// Sorts and merges intervals so the result is disjoint and ordered.
/// Touching intervals are merged too.
pub fn merge_windows(mut windows: Vec<TimeWindow>) -> Vec<TimeWindow> {
    windows.sort();
    let mut merged: Vec<TimeWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        if let Some(last) = merged.last_mut() {
            if window.start() <= last.end() {
                if window.end() > last.end() {
                    if let Ok(grown) = TimeWindow::new(last.start(), window.end()) {
                        *last = grown;
                    }
                }
                continue;
            }
        }
        merged.push(window);
    }
    merged
}

/// Drops every candidate whose footprint overlaps an excluded interval,
/// even partially. `excluded` must come from [`merge_windows`].
pub fn exclude_overlapping(candidates: Vec<Slot>, excluded: &[TimeWindow]) -> Vec<Slot> {
    candidates
        .into_iter()
        .filter(|slot| first_overlap(excluded, &slot.footprint).is_none())
        .collect()
}

/// Finds an excluded interval overlapping `window` in a disjoint, sorted list.
pub fn first_overlap<'a>(excluded: &'a [TimeWindow], window: &TimeWindow) -> Option<&'a TimeWindow> {
    // ends are sorted because the list is disjoint
    let idx = excluded.partition_point(|e| e.end() <= window.start());
    excluded.get(idx).filter(|e| e.overlaps(window))
}
