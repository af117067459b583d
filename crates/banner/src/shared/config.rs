use chrono::Utc;
use consent_core::{ConsentError, DEFAULT_COOKIE_NAME, DEFAULT_EXPIRY_DAYS, cookie};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerConfig {
    pub cookie_name: String,
    /// Lifetime of the consent cookie. Zero writes a session cookie.
    pub expiry_days: u32,
    pub privacy_url: String,
    pub message: String,
    pub link_text: String,
    pub accept_label: String,
    pub refuse_label: String,
    /// Class of the banner container; every element carrying it is removed on a decision.
    pub container_class: String,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            expiry_days: DEFAULT_EXPIRY_DAYS,
            privacy_url: "/privacy".to_string(),
            message: "This site uses cookies for anonymous web statistics.".to_string(),
            link_text: "Find out more on how we use cookies and how you can opt-out".to_string(),
            accept_label: "I accept".to_string(),
            refuse_label: "I refuse cookies".to_string(),
            container_class: "cookie-consent".to_string(),
        }
    }
}

impl BannerConfig {
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = days;
        self
    }

    pub fn with_privacy_url(mut self, url: impl Into<String>) -> Self {
        self.privacy_url = url.into();
        self
    }

    pub fn with_labels(mut self, accept: impl Into<String>, refuse: impl Into<String>) -> Self {
        self.accept_label = accept.into();
        self.refuse_label = refuse.into();
        self
    }

    pub fn with_container_class(mut self, class: impl Into<String>) -> Self {
        self.container_class = class.into();
        self
    }

    /// Loads a config from JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConsentError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConsentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConsentError> {
        if !cookie::is_valid_name(&self.cookie_name) {
            return Err(ConsentError::InvalidCookieName(self.cookie_name.clone()));
        }
        if !cookie::expiry_in_range(Utc::now(), self.expiry_days) {
            return Err(ConsentError::Config(format!(
                "expiry of {} days runs past {}",
                self.expiry_days,
                cookie::format_expires(cookie::latest_expiry())
            )));
        }
        let class = self.container_class.trim();
        if class.is_empty() || class.contains(char::is_whitespace) {
            return Err(ConsentError::Config(format!(
                "container class must be a single class name, got {:?}",
                self.container_class
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_core::ErrorCategory;

    #[test]
    fn defaults_are_valid() {
        let config = BannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cookie_name, "_accept_cookies");
        assert_eq!(config.expiry_days, 365);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            BannerConfig::from_json(r#"{ "privacy_url": "/legal/privacy", "expiry_days": 30 }"#)
                .unwrap();
        assert_eq!(config.privacy_url, "/legal/privacy");
        assert_eq!(config.expiry_days, 30);
        assert_eq!(config.accept_label, "I accept");
    }

    #[test]
    fn rejects_bad_cookie_name() {
        let err = BannerConfig::from_json(r#"{ "cookie_name": "accept cookies" }"#);
        assert!(matches!(err, Err(ConsentError::InvalidCookieName(_))));
    }

    #[test]
    fn rejects_expiry_beyond_gmt_dates() {
        let err = BannerConfig::from_json(r#"{ "expiry_days": 3000000 }"#);
        assert!(matches!(err, Err(ConsentError::Config(_))));
        assert!(BannerConfig::default().with_expiry_days(u32::MAX).validate().is_err());
        assert!(BannerConfig::default().with_expiry_days(0).validate().is_ok());
    }

    #[test]
    fn privacy_url_builder() {
        let config = BannerConfig::default().with_privacy_url("/legal/privacy");
        assert_eq!(config.privacy_url, "/legal/privacy");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_container_class() {
        let config = BannerConfig::default().with_container_class("two classes");
        assert!(matches!(config.validate(), Err(ConsentError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = BannerConfig::from_json("{");
        assert!(err.is_err_and(|e| e.category() == ErrorCategory::Config));
    }
}
