use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::Timestamp;

/// Frequency table that remembers the order in which keys were first seen.
#[derive(Debug, Clone)]
pub struct Counter<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K> Default for Counter<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Counter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, count: u64) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += count,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, count));
            }
        }
    }

    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|(key, count)| (key, *count))
    }

    /// Adds `other` into `self`; keys new to `self` keep `other`'s order.
    pub fn merge(&mut self, other: Counter<K>) {
        for (key, count) in other.entries {
            self.add(key, count);
        }
    }

    /// The `n` highest counts, ties in first-seen order.
    pub fn most_common(&self, n: usize) -> Vec<(K, u64)> {
        let mut ranked: Vec<&(K, u64)> = self.entries.iter().collect();
        // sort_by is stable, which keeps first-seen order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(n)
            .map(|(key, count)| (key.clone(), *count))
            .collect()
    }
}

/// Equal when every key has the same count; insertion order is ignored.
impl<K: Eq + Hash> PartialEq for Counter<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, count)| {
                other
                    .index
                    .get(key)
                    .is_some_and(|&slot| other.entries[slot].1 == *count)
            })
    }
}

impl<K: Eq + Hash> Eq for Counter<K> {}

impl<K: Eq + Hash + Clone> FromIterator<K> for Counter<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut counter = Counter::new();
        for key in iter {
            counter.increment(key);
        }
        counter
    }
}

/// How error lines are grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ErrorKeyMode {
    /// One entry per distinct message.
    Message,
    /// One entry per (timestamp, message) pair.
    #[default]
    TimestampMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ErrorKey {
    Message(String),
    Timed { at: Timestamp, message: String },
}

impl ErrorKey {
    pub fn new(mode: ErrorKeyMode, at: Timestamp, message: &str) -> Self {
        match mode {
            ErrorKeyMode::Message => ErrorKey::Message(message.to_string()),
            ErrorKeyMode::TimestampMessage => ErrorKey::Timed {
                at,
                message: message.to_string(),
            },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ErrorKey::Message(message) | ErrorKey::Timed { message, .. } => message,
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKey::Message(message) => f.write_str(message),
            ErrorKey::Timed { at, message } => write!(f, "[{at}] {message}"),
        }
    }
}

/// Aggregated counters of one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainStats {
    pub daily_access: BTreeMap<NaiveDate, u64>,
    pub hourly_access: BTreeMap<NaiveDate, BTreeMap<u32, u64>>,
    pub popular_pages: Counter<String>,
    pub error_counts: Counter<ErrorKey>,
    pub lines_read: u64,
}

impl DomainStats {
    pub fn record_access(&mut self, at: &Timestamp, hourly: bool) {
        *self.daily_access.entry(at.date()).or_insert(0) += 1;
        if hourly {
            *self
                .hourly_access
                .entry(at.date())
                .or_default()
                .entry(at.hour())
                .or_insert(0) += 1;
        }
    }

    pub fn record_page(&mut self, page: &str) {
        self.popular_pages.increment(page.to_string());
    }

    pub fn record_error(&mut self, key: ErrorKey) {
        self.error_counts.increment(key);
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: DomainStats) {
        for (date, count) in other.daily_access {
            *self.daily_access.entry(date).or_insert(0) += count;
        }
        for (date, hours) in other.hourly_access {
            let day = self.hourly_access.entry(date).or_default();
            for (hour, count) in hours {
                *day.entry(hour).or_insert(0) += count;
            }
        }
        self.popular_pages.merge(other.popular_pages);
        self.error_counts.merge(other.error_counts);
        self.lines_read += other.lines_read;
    }

    pub fn total_access(&self) -> u64 {
        self.daily_access.values().sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.error_counts.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> Timestamp {
        Timestamp::naive(
            NaiveDate::from_ymd_opt(2023, 10, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
        )
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, day).unwrap()
    }

    #[test]
    fn most_common_sorts_by_count_then_first_seen() {
        let counter: Counter<&str> = ["/b", "/a", "/c", "/a", "/c", "/d"].into_iter().collect();

        assert_eq!(
            counter.most_common(3),
            vec![("/a", 2), ("/c", 2), ("/b", 1)]
        );
        assert_eq!(counter.most_common(10).len(), 4);
        assert!(counter.most_common(0).is_empty());
    }

    #[test]
    fn most_common_never_exceeds_n() {
        let counter: Counter<u32> = (0..50).chain(0..25).collect();
        let top = counter.most_common(10);

        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(top[0], (0, 2));
        assert_eq!(top[9], (9, 2));
    }

    #[test]
    fn counter_equality_ignores_order() {
        let a: Counter<&str> = ["x", "y", "y"].into_iter().collect();
        let b: Counter<&str> = ["y", "x", "y"].into_iter().collect();
        let c: Counter<&str> = ["y", "x", "x"].into_iter().collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get(&"y"), 2);
        assert_eq!(a.get(&"z"), 0);
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn records_daily_and_hourly_access() {
        let mut stats = DomainStats::default();
        stats.record_access(&ts(10, 13), true);
        stats.record_access(&ts(10, 13), true);
        stats.record_access(&ts(11, 2), true);

        assert_eq!(stats.daily_access[&date(10)], 2);
        assert_eq!(stats.hourly_access[&date(10)][&13], 2);
        assert_eq!(stats.hourly_access[&date(11)][&2], 1);
        assert_eq!(stats.total_access(), 3);
    }

    #[test]
    fn hourly_tracking_can_be_disabled() {
        let mut stats = DomainStats::default();
        stats.record_access(&ts(10, 13), false);

        assert_eq!(stats.daily_access[&date(10)], 1);
        assert!(stats.hourly_access.is_empty());
    }

    #[test]
    fn merge_is_order_independent() {
        let mut a = DomainStats::default();
        a.record_access(&ts(10, 1), true);
        a.record_page("/a");
        a.record_error(ErrorKey::new(ErrorKeyMode::Message, ts(10, 1), "boom"));
        a.lines_read = 3;

        let mut b = DomainStats::default();
        b.record_access(&ts(10, 1), true);
        b.record_access(&ts(12, 5), true);
        b.record_page("/b");
        b.record_page("/a");
        b.lines_read = 4;

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);

        assert_eq!(ab, ba);
        assert_eq!(ab.daily_access[&date(10)], 2);
        assert_eq!(ab.hourly_access[&date(10)][&1], 2);
        assert_eq!(ab.popular_pages.get(&"/a".to_string()), 2);
        assert_eq!(ab.total_errors(), 1);
        assert_eq!(ab.lines_read, 7);
    }

    #[test]
    fn error_keys_follow_mode() {
        let at = ts(10, 13);
        let plain = ErrorKey::new(ErrorKeyMode::Message, at, "File not found");
        let timed = ErrorKey::new(ErrorKeyMode::TimestampMessage, at, "File not found");

        assert_eq!(plain, ErrorKey::Message("File not found".into()));
        assert_eq!(timed.message(), "File not found");
        assert_eq!(timed.to_string(), "[2023-10-10 13:00:00] File not found");
    }
}
