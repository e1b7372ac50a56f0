//! Date-keyed snapshot cache
//!
//! Keeps the last successful page per day as a fallback when the
//! downstream dependency is unavailable. Bounded by a retention window:
//! on insert, entries older than the window (and any overflow beyond it)
//! are evicted oldest-first.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::NaiveDate;

pub struct SnapshotCache<T> {
    inner: RwLock<BTreeMap<NaiveDate, T>>,
    retention_days: u64,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(retention_days: u64) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            retention_days: retention_days.max(1),
        }
    }

    /// Store the snapshot for `date`, evicting everything that falls out
    /// of the retention window relative to the newest key.
    pub fn put(&self, date: NaiveDate, snapshot: T) {
        let mut map = self.inner.write().unwrap();
        map.insert(date, snapshot);

        let newest = *map.keys().next_back().expect("just inserted");
        while let Some(oldest) = map.keys().next().copied() {
            let age = (newest - oldest).num_days();
            if age >= self.retention_days as i64 {
                map.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<T> {
        self.inner.read().unwrap().get(&date).cloned()
    }

    /// Newest snapshot at or before `date` (the fallback read).
    pub fn latest_up_to(&self, date: NaiveDate) -> Option<(NaiveDate, T)> {
        self.inner
            .read()
            .unwrap()
            .range(..=date)
            .next_back()
            .map(|(d, v)| (*d, v.clone()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = SnapshotCache::new(7);
        cache.put(day(1), vec![1, 2, 3]);
        assert_eq!(cache.get(day(1)), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(day(2)), None);
    }

    #[test]
    fn test_seven_day_retention_evicts_oldest_first() {
        let cache = SnapshotCache::new(7);
        for d in 1..=8 {
            cache.put(day(d), d);
        }
        // Day 1 is 7 days older than day 8 and falls out of the window.
        assert_eq!(cache.get(day(1)), None);
        assert_eq!(cache.get(day(2)), Some(2));
        assert_eq!(cache.len(), 7);
    }

    #[test]
    fn test_latest_up_to_falls_back_to_older_page() {
        let cache = SnapshotCache::new(7);
        cache.put(day(3), "page-3");
        cache.put(day(5), "page-5");

        assert_eq!(cache.latest_up_to(day(6)), Some((day(5), "page-5")));
        assert_eq!(cache.latest_up_to(day(4)), Some((day(3), "page-3")));
        assert_eq!(cache.latest_up_to(day(2)), None);
    }

    #[test]
    fn test_out_of_order_insert_still_bounded() {
        let cache = SnapshotCache::new(3);
        cache.put(day(10), 10);
        cache.put(day(1), 1);
        // Day 1 is far outside the window anchored at day 10.
        assert_eq!(cache.get(day(1)), None);
        assert_eq!(cache.get(day(10)), Some(10));
    }
}
