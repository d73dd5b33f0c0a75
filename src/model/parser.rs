// File: ./src/model/parser.rs
// Turns the portal's free-text schedule ("Algebra: 3-5(A,C-E)") into courses
use crate::model::item::{Course, DAYS_PER_WEEK, DayCodes};
use std::collections::BTreeSet;

impl Course {
    /// Parses one course-list entry into one `Course` per `slots(days)`
    /// section. Never fails: text that does not follow the grammar yields a
    /// single unscheduled course, so the result is never empty. Slots past
    /// `slot_count` count as malformed.
    pub fn parse(id: &str, raw: &str, days: &DayCodes, slot_count: u32) -> Vec<Course> {
        let Some((name, body)) = raw.split_once(':') else {
            return vec![Course::unscheduled(id, raw.trim())];
        };
        let name = name.trim();

        match parse_sections(body, days, slot_count) {
            Some(sections) if !sections.is_empty() => sections
                .into_iter()
                .map(|(time_slots, active_days)| Course {
                    id: id.to_string(),
                    name: name.to_string(),
                    time_slots,
                    active_days,
                })
                .collect(),
            _ => vec![Course::unscheduled(id, name)],
        }
    }
}

type Section = (BTreeSet<u32>, [bool; DAYS_PER_WEEK]);

fn parse_sections(body: &str, days: &DayCodes, slot_count: u32) -> Option<Vec<Section>> {
    let mut sections = Vec::new();
    let mut rest = body.trim();

    while !rest.is_empty() {
        let open = rest.find('(')?;
        let close = open + rest[open..].find(')')?;

        let slots = parse_slots(&rest[..open], slot_count)?;
        let active = parse_days(&rest[open + 1..close], days)?;
        sections.push((slots, active));

        rest = rest[close + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
    Some(sections)
}

/// `3` or an ascending inclusive range `3-5`, numbered from 1 up to `slot_count`.
fn parse_slots(text: &str, slot_count: u32) -> Option<BTreeSet<u32>> {
    let text = text.trim();
    let (lo, hi) = match text.split_once('-') {
        Some((a, b)) => (a.trim().parse::<u32>().ok()?, b.trim().parse::<u32>().ok()?),
        None => {
            let n = text.parse::<u32>().ok()?;
            (n, n)
        }
    };
    if lo == 0 || lo > hi || hi > slot_count {
        return None;
    }
    Some((lo..=hi).collect())
}

/// `A,C-E` against the day alphabet; ranges follow alphabet order.
fn parse_days(text: &str, days: &DayCodes) -> Option<[bool; DAYS_PER_WEEK]> {
    let mut active = [false; DAYS_PER_WEEK];
    for token in text.split(',') {
        let token = token.trim();
        match token.split_once('-') {
            Some((a, b)) => {
                let from = days.index_of(a.trim())?;
                let to = days.index_of(b.trim())?;
                if from > to {
                    return None;
                }
                active[from..=to].iter_mut().for_each(|d| *d = true);
            }
            None => active[days.index_of(token)?] = true,
        }
    }
    Some(active)
}
