//! Bootstrap for the page-view tracker, honouring the stored consent.
//!
//! The tracker is configured through a queue of commands (`window._paq`).
//! When the visitor refused cookies the queue gains `disableCookies` ahead
//! of the page view, so no tracking cookie is ever set for them.

use consent_core::{ConsentError, CookieStore, DEFAULT_COOKIE_NAME, Decision, cookie};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Tracker host, scheme-relative or absolute, e.g. `//stats.example.org/`.
    pub base_url: String,
    pub site_id: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

impl TrackerConfig {
    pub fn new(base_url: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            site_id: site_id.into(),
            cookie_name: default_cookie_name(),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConsentError> {
        if self.base_url.trim().is_empty() {
            return Err(ConsentError::Config("tracker base url is empty".to_string()));
        }
        if self.site_id.trim().is_empty() {
            return Err(ConsentError::Config("tracker site id is empty".to_string()));
        }
        if !cookie::is_valid_name(&self.cookie_name) {
            return Err(ConsentError::InvalidCookieName(self.cookie_name.clone()));
        }
        Ok(())
    }

    fn asset_url(&self, file: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, file)
        } else {
            format!("{}/{}", self.base_url, file)
        }
    }

    pub fn tracker_url(&self) -> String {
        self.asset_url("matomo.php")
    }

    pub fn script_url(&self) -> String {
        self.asset_url("matomo.js")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    SetDoNotTrack(bool),
    DisableCookies,
    TrackPageView,
    EnableLinkTracking,
    SetTrackerUrl(String),
    SetSiteId(String),
}

impl TrackerCommand {
    /// The queue entry as the tracker expects it: method name then arguments.
    pub fn to_value(&self) -> Value {
        match self {
            TrackerCommand::SetDoNotTrack(on) => json!(["setDoNotTrack", on]),
            TrackerCommand::DisableCookies => json!(["disableCookies"]),
            TrackerCommand::TrackPageView => json!(["trackPageView"]),
            TrackerCommand::EnableLinkTracking => json!(["enableLinkTracking"]),
            TrackerCommand::SetTrackerUrl(url) => json!(["setTrackerUrl", url]),
            TrackerCommand::SetSiteId(id) => json!(["setSiteId", id]),
        }
    }
}

impl Serialize for TrackerCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Tracking cookies are off only for an explicit refusal; absent or
/// unrecognized values leave them on.
pub fn cookies_disabled<C: CookieStore + ?Sized>(store: &C, cookie_name: &str) -> bool {
    cookie::read_entry(&store.header(), cookie_name).as_deref()
        == Some(Decision::Refused.as_cookie_value())
}

pub struct Tracker {
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConsentError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Commands for one page view, in the order the tracker must receive them.
    pub fn bootstrap_queue<C: CookieStore + ?Sized>(&self, store: &C) -> Vec<TrackerCommand> {
        let mut queue = vec![TrackerCommand::SetDoNotTrack(true)];
        if cookies_disabled(store, &self.config.cookie_name) {
            debug!(cookie = %self.config.cookie_name, "visitor refused cookies, tracking cookies disabled");
            queue.push(TrackerCommand::DisableCookies);
        }
        queue.extend([
            TrackerCommand::TrackPageView,
            TrackerCommand::EnableLinkTracking,
            TrackerCommand::SetTrackerUrl(self.config.tracker_url()),
            TrackerCommand::SetSiteId(self.config.site_id.clone()),
        ]);
        queue
    }

    /// Script that queues the commands and loads the tracker asynchronously.
    pub fn snippet<C: CookieStore + ?Sized>(&self, store: &C) -> String {
        render_snippet(&self.bootstrap_queue(store), &self.config)
    }
}

pub fn render_snippet(queue: &[TrackerCommand], config: &TrackerConfig) -> String {
    let mut js = String::from("var _paq = window._paq || [];\n");
    for command in queue {
        js.push_str(&format!("_paq.push({});\n", command.to_value()));
    }
    js.push_str(&format!(
        "(function() {{\n    var d=document, g=d.createElement('script'), s=d.getElementsByTagName('script')[0];\n    g.type='text/javascript'; g.async=true; g.defer=true; g.src={}; s.parentNode.insertBefore(g,s);\n}})();\n",
        json!(config.script_url())
    ));
    js
}
