//! Vector timestamps attached to logged events.
//!
//! A [`VectorTimestamp`] is immutable: every transformation returns a new
//! value. Entries with a zero value are dropped on construction, except the
//! owning host's own entry which is always kept so that [`own_time`] and
//! [`get`] agree for the owner.
//!
//! [`own_time`]: VectorTimestamp::own_time
//! [`get`]: VectorTimestamp::get

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::ClockError;

/// A vector clock owned by one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorTimestamp {
    host: String,
    clock: BTreeMap<String, u64>,
    #[serde(skip)]
    own_time: u64,
}

impl VectorTimestamp {
    /// Creates a timestamp for `host` from host → clock value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::MissingOwnHost`] if `clock` has no entry for
    /// `host`.
    pub fn new<K, I>(host: impl Into<String>, clock: I) -> Result<Self, ClockError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, u64)>,
    {
        let host = host.into();
        let clock: BTreeMap<String, u64> =
            clock.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let Some(&own_time) = clock.get(&host) else {
            return Err(ClockError::MissingOwnHost { host });
        };
        Ok(Self::normalized(host, clock, own_time))
    }

    /// The timestamp of a virtual event preceding everything on `host`.
    #[must_use]
    pub fn genesis(host: impl Into<String>) -> Self {
        let host = host.into();
        let clock = BTreeMap::from([(host.clone(), 0)]);
        Self {
            host,
            clock,
            own_time: 0,
        }
    }

    fn normalized(host: String, mut clock: BTreeMap<String, u64>, own_time: u64) -> Self {
        clock.retain(|h, v| *v != 0 || *h == host);
        Self {
            host,
            clock,
            own_time,
        }
    }

    /// Returns the host that owns this timestamp.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the owning host's own clock value.
    #[must_use]
    pub const fn own_time(&self) -> u64 {
        self.own_time
    }

    /// Returns the clock entry for `host`, if present.
    #[must_use]
    pub fn get(&self, host: &str) -> Option<u64> {
        self.clock.get(host).copied()
    }

    /// Returns the full host → value mapping.
    #[must_use]
    pub const fn clock(&self) -> &BTreeMap<String, u64> {
        &self.clock
    }

    /// Returns true if the clock references any host besides the owner.
    #[must_use]
    pub fn has_foreign_hosts(&self) -> bool {
        self.clock.keys().any(|h| *h != self.host)
    }

    fn value(&self, host: &str) -> u64 {
        self.get(host).unwrap_or(0)
    }

    /// Merges `other` into a new timestamp owned by `self`'s host.
    ///
    /// Every host present in either operand maps to the larger of the two
    /// values.
    #[must_use]
    pub fn update(&self, other: &Self) -> Self {
        let mut clock = self.clock.clone();
        for (host, &value) in &other.clock {
            let entry = clock.entry(host.clone()).or_insert(0);
            *entry = (*entry).max(value);
        }
        let own_time = clock.get(&self.host).copied().unwrap_or(self.own_time);
        Self::normalized(self.host.clone(), clock, own_time)
    }

    /// Returns a copy with the owning host's value advanced by one.
    #[must_use]
    pub fn increment(&self) -> Self {
        let own_time = self.own_time.saturating_add(1);
        let mut clock = self.clock.clone();
        clock.insert(self.host.clone(), own_time);
        Self {
            host: self.host.clone(),
            clock,
            own_time,
        }
    }

    /// Compares two timestamps under the happened-before partial order.
    ///
    /// Returns `Less` if `self` happened before `other`, `Greater` if
    /// `other` happened before `self`, and `Equal` when neither holds:
    /// the clocks are concurrent or identical. This is not a total order.
    #[must_use]
    pub fn compare_to(&self, other: &Self) -> Ordering {
        let mut self_le = true;
        let mut other_le = true;
        for host in self.clock.keys().chain(other.clock.keys()) {
            let (a, b) = (self.value(host), other.value(host));
            if a > b {
                self_le = false;
            }
            if a < b {
                other_le = false;
            }
        }
        match (self_le, other_le) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }

    /// Returns true if `self` happened before `other`.
    #[must_use]
    pub fn happened_before(&self, other: &Self) -> bool {
        self.compare_to(other) == Ordering::Less
    }

    /// Returns true if neither timestamp happened before the other.
    #[must_use]
    pub fn is_concurrent_with(&self, other: &Self) -> bool {
        self.compare_to(other) == Ordering::Equal && self.clock != other.clock
    }

    /// Compares own-host values of two timestamps from the same host.
    ///
    /// Returns the signed difference `self - other`, or 0 when the hosts
    /// differ since local times on different hosts are not comparable.
    #[must_use]
    pub fn compare_to_local(&self, other: &Self) -> i64 {
        if self.host != other.host {
            return 0;
        }
        let diff = i128::from(self.own_time) - i128::from(other.own_time);
        i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
    }

    /// Returns the hosts, other than the owner, whose entry in `self` was
    /// added or changed relative to `other`. Hosts come back in sorted order.
    #[must_use]
    pub fn compare_updated_hosts(&self, other: &Self) -> Vec<&str> {
        self.clock
            .iter()
            .filter(|(host, value)| {
                **host != self.host && other.get(host.as_str()) != Some(**value)
            })
            .map(|(host, _)| host.as_str())
            .collect()
    }

    /// Returns true if both timestamps have equal entries for every host in
    /// `hosts`. A host missing on either side fails the comparison.
    #[must_use]
    pub fn compare_hosts<'a, I>(&self, other: &Self, hosts: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        hosts.into_iter().all(|host| match (self.get(host), other.get(host)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        })
    }
}

impl PartialOrd for VectorTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match self.compare_to(other) {
            Ordering::Equal => None,
            ord => Some(ord),
        }
    }
}

impl fmt::Display for VectorTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.host)?;
        for (i, (host, value)) in self.clock.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{host}\": {value}")?;
        }
        write!(f, "}}")
    }
}
