use chrono::{DateTime, Duration, Utc};
use consent_core::{CookieStore, cookie};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    /// Value exactly as written, still percent-encoded.
    pub value: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// In-memory stand-in for a browser cookie store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCookieJar {
    cookies: Vec<StoredCookie>,
    #[serde(skip)]
    clock: Option<DateTime<Utc>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the jar's clock instead of reading the system time.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn advance(&mut self, by: Duration) {
        let now = self.now();
        self.clock = Some(now.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC));
    }

    pub fn get(&self, name: &str) -> Option<&StoredCookie> {
        let now = self.now();
        self.cookies
            .iter()
            .find(|c| c.name == name && !c.is_expired(now))
    }

    pub fn len(&self) -> usize {
        let now = self.now();
        self.cookies.iter().filter(|c| !c.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&mut self) {
        let now = self.now();
        self.cookies.retain(|c| !c.is_expired(now));
    }

    fn parse_assignment(&self, raw: &str) -> Option<StoredCookie> {
        let mut parts = raw.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        let name = name.trim();
        if !cookie::is_valid_name(name) {
            return None;
        }

        let mut path = String::from("/");
        let mut expires = None;
        let mut max_age = None;
        for attr in parts.map(str::trim).filter(|a| !a.is_empty()) {
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "expires" => expires = cookie::parse_expires(val),
                "max-age" => max_age = val.trim().parse::<i64>().ok(),
                "path" if val.starts_with('/') => path = val.trim().to_string(),
                _ => {}
            }
        }

        // max-age takes precedence over expires
        if let Some(secs) = max_age {
            let now = self.now();
            expires = Some(
                Duration::try_seconds(secs)
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(if secs > 0 { DateTime::<Utc>::MAX_UTC } else { now }),
            );
        }

        Some(StoredCookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            path,
            expires,
        })
    }
}

impl CookieStore for MemoryCookieJar {
    fn header(&self) -> String {
        let now = self.now();
        self.cookies
            .iter()
            .filter(|c| !c.is_expired(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&mut self, raw: &str) {
        let Some(entry) = self.parse_assignment(raw) else {
            debug!(cookie = raw, "ignoring malformed cookie assignment");
            return;
        };

        let existing = self
            .cookies
            .iter()
            .position(|c| c.name == entry.name && c.path == entry.path);

        if entry.is_expired(self.now()) {
            if let Some(idx) = existing {
                self.cookies.remove(idx);
            }
            debug!(name = %entry.name, "cookie expired on write, removed");
            return;
        }

        debug!(name = %entry.name, path = %entry.path, "cookie written");
        match existing {
            Some(idx) => self.cookies[idx] = entry,
            None => self.cookies.push(entry),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }
}
