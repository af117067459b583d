pub mod cookie;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_COOKIE_NAME: &str = "_accept_cookies";
pub const DEFAULT_EXPIRY_DAYS: u32 = 365;

/// The visitor's answer to the consent banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accepted,
    Refused,
}

impl Decision {
    /// Literal cookie value. Tracking collaborators compare against these
    /// exact strings, so they are never localized.
    pub fn as_cookie_value(self) -> &'static str {
        match self {
            Decision::Accepted => "true",
            Decision::Refused => "false",
        }
    }
}

impl From<bool> for Decision {
    fn from(accepted: bool) -> Self {
        if accepted { Decision::Accepted } else { Decision::Refused }
    }
}

/// What the consent cookie currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredConsent {
    /// No cookie with the consent name exists.
    Absent,
    Accepted,
    Refused,
    /// A cookie exists but holds neither `"true"` nor `"false"`.
    Unrecognized(String),
}

impl StoredConsent {
    /// Classifies a decoded cookie value, `None` meaning the cookie is missing.
    pub fn from_value(value: Option<String>) -> Self {
        match value {
            None => StoredConsent::Absent,
            Some(v) if v == "true" => StoredConsent::Accepted,
            Some(v) if v == "false" => StoredConsent::Refused,
            Some(v) => StoredConsent::Unrecognized(v),
        }
    }

    /// Any stored value, even an unrecognized one, counts as a decision
    /// already made.
    pub fn is_present(&self) -> bool {
        !matches!(self, StoredConsent::Absent)
    }

    pub fn decision(&self) -> Option<Decision> {
        match self {
            StoredConsent::Accepted => Some(Decision::Accepted),
            StoredConsent::Refused => Some(Decision::Refused),
            StoredConsent::Absent | StoredConsent::Unrecognized(_) => None,
        }
    }
}

/// A consent decision together with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub decision: Decision,
    /// `None` for a session cookie (written with zero days).
    pub expires: Option<DateTime<Utc>>,
}

impl ConsentRecord {
    pub fn new(decision: Decision, days: u32, now: DateTime<Utc>) -> Self {
        Self {
            decision,
            expires: cookie::expiry_after(now, days),
        }
    }

    /// Wire form suitable for assignment to the page cookie.
    pub fn to_cookie(&self, name: &str) -> String {
        cookie::serialize_entry(name, self.decision.as_cookie_value(), self.expires)
    }
}

/// The page's cookie header, abstracted so consent logic runs outside a browser.
pub trait CookieStore {
    /// Full cookie header as the page sees it, e.g. `a=1; b=2`.
    fn header(&self) -> String;

    /// Equivalent of assigning to `document.cookie`. Failures are silent.
    fn set_cookie(&mut self, cookie: &str);

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn set_entry(&mut self, name: &str, value: &str, expiry_days: u32) {
        let expires = cookie::expiry_after(self.now(), expiry_days);
        let raw = cookie::serialize_entry(name, value, expires);
        self.set_cookie(&raw);
    }
}

/// Error categories for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Invalid banner or tracker configuration
    Config,
    /// Persisting or loading the cookie jar failed
    Storage,
}

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ConsentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConsentError::InvalidCookieName(_) | ConsentError::Config(_) => ErrorCategory::Config,
            ConsentError::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Storage errors leave the visitor re-prompted on the next load, nothing worse.
    pub fn recoverable(&self) -> bool {
        self.category() == ErrorCategory::Storage
    }
}
