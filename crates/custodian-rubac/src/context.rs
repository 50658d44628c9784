//! Request context and environment definitions for rule evaluation.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use custodian_types::InvalidInput;
use serde::{Deserialize, Serialize};

// ============================================================================
// Rule Context
// ============================================================================

/// Well-known context keys that `Equals` predicates resolve to typed fields.
pub const KEY_USER_DEPARTMENT: &str = "userDepartment";
pub const KEY_RESOURCE_DEPARTMENT: &str = "resourceDepartment";
pub const KEY_IP_ADDRESS: &str = "ipAddress";

/// Facts about a request that rules can be conditioned on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContext {
    pub actor_department: Option<String>,
    pub resource_department: Option<String>,
    pub network_origin: Option<String>,
    /// When the request is being evaluated.
    pub at: DateTime<Utc>,
    /// Arbitrary caller-supplied key/value pairs.
    pub extra: BTreeMap<String, String>,
}

impl RuleContext {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            actor_department: None,
            resource_department: None,
            network_origin: None,
            at,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_actor_department(mut self, department: &str) -> Self {
        self.actor_department = Some(department.to_string());
        self
    }

    pub fn with_resource_department(mut self, department: &str) -> Self {
        self.resource_department = Some(department.to_string());
        self
    }

    pub fn with_network_origin(mut self, origin: &str) -> Self {
        self.network_origin = Some(origin.to_string());
        self
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    /// Resolves a context key. Well-known keys map to typed fields; anything
    /// else is looked up in `extra`.
    pub fn value(&self, key: &str) -> Option<&str> {
        match key {
            KEY_USER_DEPARTMENT => self.actor_department.as_deref(),
            KEY_RESOURCE_DEPARTMENT => self.resource_department.as_deref(),
            KEY_IP_ADDRESS => self.network_origin.as_deref(),
            _ => self.extra.get(key).map(String::as_str),
        }
    }
}

// ============================================================================
// Working Hours
// ============================================================================

/// The fixed working-time window, `[start_hour, end_hour)` in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    start_hour: u32,
    end_hour: u32,
    offset: FixedOffset,
}

impl WorkingHours {
    /// Builds a window. Local time is UTC shifted by `utc_offset_minutes`.
    pub fn new(start_hour: u32, end_hour: u32, utc_offset_minutes: i32) -> Result<Self, InvalidInput> {
        if start_hour >= end_hour || end_hour > 24 {
            return Err(InvalidInput::Other(format!(
                "working hours must satisfy start < end <= 24, got {start_hour}..{end_hour}"
            )));
        }
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                InvalidInput::Other(format!("utc offset out of range: {utc_offset_minutes} minutes"))
            })?;
        Ok(Self {
            start_hour,
            end_hour,
            offset,
        })
    }

    /// Returns whether `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let hour = at.with_timezone(&self.offset).hour();
        (self.start_hour..self.end_hour).contains(&hour)
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }
}

impl Default for WorkingHours {
    /// 08:00-18:00 UTC.
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
            offset: Utc.fix(),
        }
    }
}

// ============================================================================
// Company Network
// ============================================================================

/// Which request origins count as the company network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyNetwork {
    /// Address prefixes (e.g. `"10."`).
    pub prefixes: Vec<String>,
    /// Individual addresses matched exactly.
    pub hosts: Vec<String>,
}

impl CompanyNetwork {
    pub fn contains(&self, origin: &str) -> bool {
        self.prefixes.iter().any(|p| origin.starts_with(p.as_str()))
            || self.hosts.iter().any(|h| h == origin)
    }
}

impl Default for CompanyNetwork {
    /// `10.*`, `192.168.*` and the IPv4 loopback host.
    fn default() -> Self {
        Self {
            prefixes: vec!["10.".to_string(), "192.168.".to_string()],
            hosts: vec!["127.0.0.1".to_string()],
        }
    }
}
