use std::{
    collections::BTreeMap,
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::foundation::error::BoothResult;

/// Usage cap assumed for records that do not set one.
pub const DEFAULT_MAX_USES: u64 = 9999;

/// How long a redeemed code keeps the booth unlocked.
pub const ACCESS_SESSION_HOURS: u64 = 12;

const HOUR_MS: u64 = 60 * 60 * 1000;

/// Rejections at the code-store boundary, each with its own user-facing message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Not 6-16 letters/digits after normalization.
    #[error("Invalid code format. Use letters and digits (6-16 characters).")]
    InvalidFormat,
    /// No record for the code.
    #[error("Code not found.")]
    NotFound,
    /// The record exists but is switched off.
    #[error("Code is inactive.")]
    Inactive,
    /// `used_count` already reached `max_uses`.
    #[error("Code has reached its usage limit.")]
    UsageCapReached,
    /// The store itself could not be used.
    #[error("Code service unavailable: {0}")]
    Unavailable(String),
}

/// Trim and upper-case a code, then check it is 6-16 ASCII letters or digits.
pub fn normalize_code(raw: &str) -> Result<String, AccessError> {
    let clean = raw.trim().to_ascii_uppercase();
    let ok = (6..=16).contains(&clean.len())
        && clean
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if ok {
        Ok(clean)
    } else {
        Err(AccessError::InvalidFormat)
    }
}

fn default_max_uses() -> u64 {
    DEFAULT_MAX_USES
}

/// Stored access code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeRecord {
    /// Normalized code.
    pub code: String,
    /// Only active codes can be redeemed.
    #[serde(default)]
    pub active: bool,
    /// Successful redemptions so far.
    #[serde(default)]
    pub used_count: u64,
    /// Redemption cap.
    #[serde(default = "default_max_uses")]
    pub max_uses: u64,
    /// Client the code was issued to.
    #[serde(default)]
    pub client_name: String,
    /// Event the code was issued for.
    #[serde(default)]
    pub event_name: String,
    /// Last redemption, unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at_ms: Option<u64>,
}

/// Successful redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    /// Normalized code.
    pub code: String,
    /// Client the code was issued to.
    pub client_name: String,
    /// Event the code was issued for.
    pub event_name: String,
    /// Use count including this redemption.
    pub used_count: u64,
    /// Redemption cap.
    pub max_uses: u64,
}

/// Validates a code and consumes one use of it in a single atomic step.
///
/// No two callers may both succeed on the last remaining use.
pub trait CodeStore {
    /// Validate `code` and, on success, increment its use counter.
    fn validate_and_consume(&self, code: &str) -> Result<AccessGrant, AccessError>;
}

/// Mutex-guarded in-process store, also used to back JSON code lists.
#[derive(Debug, Default)]
pub struct InMemoryCodeStore {
    records: Mutex<BTreeMap<String, AccessCodeRecord>>,
}

impl InMemoryCodeStore {
    /// Store holding `records`, keyed by their normalized code.
    ///
    /// Records whose code does not normalize are dropped.
    pub fn new(records: impl IntoIterator<Item = AccessCodeRecord>) -> Self {
        let mut map = BTreeMap::new();
        for mut rec in records {
            match normalize_code(&rec.code) {
                Ok(code) => {
                    rec.code = code.clone();
                    map.insert(code, rec);
                }
                Err(_) => tracing::warn!(code = %rec.code, "skipping malformed access code"),
            }
        }
        Self {
            records: Mutex::new(map),
        }
    }

    /// Load from a JSON array of records.
    pub fn from_json(raw: &str) -> BoothResult<Self> {
        let records: Vec<AccessCodeRecord> = serde_json::from_str(raw)?;
        Ok(Self::new(records))
    }

    /// Serialize every record as a JSON array.
    pub fn to_json(&self) -> BoothResult<String> {
        let records = self.snapshot()?;
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Copy of the current records in code order.
    pub fn snapshot(&self) -> Result<Vec<AccessCodeRecord>, AccessError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    /// Current record for `code`, if any.
    pub fn get(&self, code: &str) -> Option<AccessCodeRecord> {
        let code = normalize_code(code).ok()?;
        self.lock().ok()?.get(&code).cloned()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, AccessCodeRecord>>, AccessError> {
        self.records
            .lock()
            .map_err(|_| AccessError::Unavailable("code store lock poisoned".to_owned()))
    }
}

impl CodeStore for InMemoryCodeStore {
    fn validate_and_consume(&self, code: &str) -> Result<AccessGrant, AccessError> {
        let code = normalize_code(code)?;
        let mut records = self.lock()?;
        let rec = records.get_mut(&code).ok_or(AccessError::NotFound)?;
        if !rec.active {
            return Err(AccessError::Inactive);
        }
        if rec.used_count >= rec.max_uses {
            return Err(AccessError::UsageCapReached);
        }
        rec.used_count += 1;
        rec.last_used_at_ms = Some(now_ms());
        tracing::debug!(
            code = %rec.code,
            used = rec.used_count,
            max = rec.max_uses,
            "access code consumed"
        );
        Ok(AccessGrant {
            code: rec.code.clone(),
            client_name: rec.client_name.clone(),
            event_name: rec.event_name.clone(),
            used_count: rec.used_count,
            max_uses: rec.max_uses,
        })
    }
}

/// Current time in unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Local unlock recorded after a successful redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPass {
    /// What the store returned.
    pub grant: AccessGrant,
    /// Unlock expiry, unix milliseconds.
    pub expires_at_ms: u64,
}

impl AccessPass {
    /// Pass valid for [`ACCESS_SESSION_HOURS`] from `now_ms`.
    pub fn issue(grant: AccessGrant, now_ms: u64) -> Self {
        Self {
            grant,
            expires_at_ms: now_ms.saturating_add(ACCESS_SESSION_HOURS * HOUR_MS),
        }
    }

    /// `true` while the pass has not expired.
    pub fn is_unlocked_at(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms && !self.grant.code.is_empty()
    }

    /// Milliseconds left, zero once expired.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at_ms.saturating_sub(now_ms)
    }
}

/// Redeem `code` against `store` and issue a pass at `now_ms`.
pub fn redeem(
    store: &dyn CodeStore,
    code: &str,
    now_ms: u64,
) -> Result<AccessPass, AccessError> {
    let grant = store.validate_and_consume(code)?;
    Ok(AccessPass::issue(grant, now_ms))
}

#[cfg(test)]
#[path = "../../tests/unit/access/code_store.rs"]
mod tests;
