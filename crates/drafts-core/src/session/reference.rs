//! Session identity.
//!
//! A session is addressed by `(partition, local_id)`: the creation day and a
//! time-ordered, collision-resistant token. Externally it is written `partition/local_id`.

use crate::error::{DraftsError, Result};
use crate::storage::{RecordKey, validate_segment};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of random hex characters in a local id.
pub const LOCAL_ID_SUFFIX_LEN: usize = 8;

const PARTITION_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H-%M-%S";

/// Composite key of a stored session.
///
/// Ordering compares the partition first and the local id second, which is the
/// chronological order of creation (up to the same second).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionRef {
    partition: String,
    local_id: String,
}

impl SessionRef {
    /// Creates a reference from its two components, validating both.
    pub fn new(partition: impl Into<String>, local_id: impl Into<String>) -> Result<Self> {
        let partition = partition.into();
        let local_id = local_id.into();
        validate_segment(&partition)?;
        validate_segment(&local_id)?;
        Ok(Self {
            partition,
            local_id,
        })
    }

    /// Mints a fresh reference for a session created at `now`.
    ///
    /// The result looks like `2026-01-28/15-03-04_512254cc`. Uniqueness is probabilistic
    /// here; the allocator reserves the namespace and re-mints on the rare collision.
    pub fn mint(now: NaiveDateTime) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            partition: now.format(PARTITION_FORMAT).to_string(),
            local_id: format!(
                "{}_{}",
                now.format(TIME_FORMAT),
                &suffix[..LOCAL_ID_SUFFIX_LEN]
            ),
        }
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// The time-of-day prefix of the local id, or an empty string for foreign ids.
    pub fn timestamp(&self) -> &str {
        match self.local_id.split_once('_') {
            Some((time, _)) => time,
            None => "",
        }
    }

    /// Store key of the partition namespace.
    pub fn partition_key(&self) -> RecordKey {
        RecordKey::from_validated(vec![self.partition.clone()])
    }

    /// Store key of the session namespace.
    pub fn namespace(&self) -> RecordKey {
        RecordKey::from_validated(vec![self.partition.clone(), self.local_id.clone()])
    }

    /// Store key of a record inside the session namespace.
    pub fn record(&self, name: &str) -> Result<RecordKey> {
        self.namespace().child(name)
    }
}

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.local_id)
    }
}

impl FromStr for SessionRef {
    type Err = DraftsError;

    fn from_str(s: &str) -> Result<Self> {
        let (partition, local_id) = s.split_once('/').ok_or_else(|| {
            DraftsError::invalid_reference(format!(
                "'{}' is not of the form partition/local_id",
                s
            ))
        })?;
        Self::new(partition, local_id)
    }
}

impl TryFrom<String> for SessionRef {
    type Error = DraftsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SessionRef> for String {
    fn from(value: SessionRef) -> Self {
        value.to_string()
    }
}

/// A parent reference as written in a metadata record.
///
/// Canonical references carry the partition; bare legacy references carry only the
/// local id and must be located by searching partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    Qualified(SessionRef),
    Bare(String),
}

impl ParentRef {
    /// Interprets a stored parent value. Returns `None` for values that cannot address
    /// any session; callers treat those like a dangling reference.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.contains('/') {
            return raw.parse().ok().map(Self::Qualified);
        }
        validate_segment(raw).ok()?;
        Some(Self::Bare(raw.to_string()))
    }
}
