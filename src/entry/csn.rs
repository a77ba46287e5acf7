//! Change sequence numbers
//!
//! Format: `YYYYMMDDhhmmss.ffffffZ#cccccc#sid#mmmmmm`, with the change
//! count, replica id and modification number in lowercase hex. String
//! order is change order.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

const TIME_FORMAT: &str = "%Y%m%d%H%M%S%.6f";

/// A change sequence number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Csn {
    timestamp: NaiveDateTime,
    change_count: u32,
    replica_id: u16,
    operation_number: u32,
}

impl Csn {
    /// Returns true if `s` is a well-formed CSN
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_some()
    }

    /// Parses the string form
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('#');
        let time = parts.next()?;
        let count = parts.next()?;
        let sid = parts.next()?;
        let op = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let time = time.strip_suffix('Z')?;
        if time.len() != 21 || count.len() != 6 || sid.len() != 3 || op.len() != 6 {
            return None;
        }

        Some(Self {
            timestamp: NaiveDateTime::parse_from_str(time, TIME_FORMAT).ok()?,
            change_count: u32::from_str_radix(count, 16).ok()?,
            replica_id: u16::from_str_radix(sid, 16).ok()?,
            operation_number: u32::from_str_radix(op, 16).ok()?,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp.and_utc()
    }

    pub fn change_count(&self) -> u32 {
        self.change_count
    }

    pub fn replica_id(&self) -> u16 {
        self.replica_id
    }
}

impl fmt::Display for Csn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Z#{:06x}#{:03x}#{:06x}",
            self.timestamp.format(TIME_FORMAT),
            self.change_count,
            self.replica_id,
            self.operation_number
        )
    }
}

/// Issues CSNs for one replica.
///
/// The change count disambiguates CSNs created within the same microsecond.
#[derive(Debug, Default)]
pub struct CsnFactory {
    replica_id: u16,
    change_count: AtomicU32,
}

impl CsnFactory {
    pub fn new(replica_id: u16) -> Self {
        Self {
            replica_id,
            change_count: AtomicU32::new(0),
        }
    }

    /// Creates a CSN stamped with the current time
    pub fn next(&self) -> Csn {
        let count = self.change_count.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        Csn {
            timestamp: Utc::now().naive_utc().trunc_subsecs(6),
            change_count: count,
            replica_id: self.replica_id & 0x0fff,
            operation_number: 0,
        }
    }
}
