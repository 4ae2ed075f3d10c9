//! Presence registry: which beacons are currently in range.
//!
//! Each identity key is either absent or present. A present entry remembers
//! the latest [`BeaconInfo`] and the stamp of the sighting that produced it.
//! The expiry timer for an entry carries that stamp; an expiry whose stamp is
//! not the entry's latest, or whose session is over, is ignored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::BeaconInfo;

/// What a sighting did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The key was absent and is now present.
    Found,
    /// The key was already present; its info was replaced.
    Updated,
}

/// Result of [`PresenceRegistry::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    /// Found or Updated.
    pub transition: Transition,
    /// Stamp the expiry timer for this sighting must carry.
    pub stamp: u64,
}

/// A present beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    /// Latest sighting.
    pub info: BeaconInfo,
    /// Scan session the entry belongs to.
    pub session: u64,
    /// Stamp of the latest sighting.
    pub stamp: u64,
    /// Sightings since the entry was created.
    pub sightings: u64,
    /// When the beacon was found.
    pub first_seen_utc: DateTime<Utc>,
    /// When the beacon was last sighted.
    pub last_seen_utc: DateTime<Utc>,
}

/// Identity key to presence entry map.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: HashMap<String, PresenceEntry>,
    next_stamp: u64,
}

impl PresenceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `info` during `session`.
    pub fn observe(&mut self, info: BeaconInfo, session: u64) -> Sighting {
        self.next_stamp += 1;
        let stamp = self.next_stamp;
        let now = Utc::now();

        if let Some(entry) = self.entries.get_mut(&info.key) {
            if entry.session == session {
                entry.info = info;
                entry.stamp = stamp;
                entry.sightings += 1;
                entry.last_seen_utc = now;
                return Sighting {
                    transition: Transition::Updated,
                    stamp,
                };
            }
        }

        self.entries.insert(
            info.key.clone(),
            PresenceEntry {
                info,
                session,
                stamp,
                sightings: 1,
                first_seen_utc: now,
                last_seen_utc: now,
            },
        );
        Sighting {
            transition: Transition::Found,
            stamp,
        }
    }

    /// Remove `key` if `stamp` is still its latest sighting in `session`.
    ///
    /// Returns the last recorded info for the Lost notification, or `None`
    /// when the expiry is stale.
    pub fn expire(&mut self, key: &str, session: u64, stamp: u64) -> Option<BeaconInfo> {
        match self.entries.get(key) {
            Some(entry) if entry.session == session && entry.stamp == stamp => {
                self.entries.remove(key).map(|entry| entry.info)
            }
            _ => None,
        }
    }

    /// Look up a present beacon.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PresenceEntry> {
        self.entries.get(key)
    }

    /// Number of present beacons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no beacon is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry without reporting them lost.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Present beacons, ordered by first sighting.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.first_seen_utc
                .cmp(&b.first_seen_utc)
                .then_with(|| a.info.key.cmp(&b.info.key))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BeaconId;

    fn info(key: &str, rssi: i16) -> BeaconInfo {
        BeaconInfo {
            key: key.to_string(),
            id: BeaconId::Url {
                url: key.to_string(),
            },
            tx_power: -20,
            telemetry: None,
            rssi,
            device: "dev".into(),
        }
    }

    #[test]
    fn test_first_sighting_is_found_then_updated() {
        let mut registry = PresenceRegistry::new();
        let first = registry.observe(info("a", -60), 1);
        let second = registry.observe(info("a", -65), 1);

        assert_eq!(first.transition, Transition::Found);
        assert_eq!(second.transition, Transition::Updated);
        assert!(second.stamp > first.stamp);
        assert_eq!(registry.len(), 1);

        let entry = registry.get("a").unwrap();
        assert_eq!(entry.info.rssi, -65);
        assert_eq!(entry.sightings, 2);
    }

    #[test]
    fn test_expire_with_latest_stamp_removes() {
        let mut registry = PresenceRegistry::new();
        registry.observe(info("a", -60), 1);
        let latest = registry.observe(info("a", -61), 1);

        let lost = registry.expire("a", 1, latest.stamp).unwrap();
        assert_eq!(lost.rssi, -61);
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_stale_stamp_is_a_no_op() {
        let mut registry = PresenceRegistry::new();
        let first = registry.observe(info("a", -60), 1);
        registry.observe(info("a", -61), 1);

        assert_eq!(registry.expire("a", 1, first.stamp), None);
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_expire_after_removal_is_a_no_op() {
        let mut registry = PresenceRegistry::new();
        let sighting = registry.observe(info("a", -60), 1);
        assert!(registry.expire("a", 1, sighting.stamp).is_some());
        assert!(registry.expire("a", 1, sighting.stamp).is_none());
        assert!(registry.expire("missing", 1, sighting.stamp).is_none());
    }

    #[test]
    fn test_old_session_expiry_is_ignored() {
        let mut registry = PresenceRegistry::new();
        let sighting = registry.observe(info("a", -60), 1);
        assert!(registry.expire("a", 2, sighting.stamp).is_none());
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_entry_from_previous_session_is_found_again() {
        let mut registry = PresenceRegistry::new();
        registry.observe(info("a", -60), 1);
        let again = registry.observe(info("a", -60), 2);
        assert_eq!(again.transition, Transition::Found);
        assert_eq!(registry.get("a").unwrap().sightings, 1);
    }

    #[test]
    fn test_found_again_after_lost() {
        let mut registry = PresenceRegistry::new();
        let sighting = registry.observe(info("a", -60), 1);
        registry.expire("a", 1, sighting.stamp);
        assert_eq!(registry.observe(info("a", -60), 1).transition, Transition::Found);
    }

    #[test]
    fn test_clear_and_snapshot() {
        let mut registry = PresenceRegistry::new();
        registry.observe(info("b", -60), 1);
        registry.observe(info("a", -60), 1);
        assert_eq!(registry.snapshot().len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }
}
