//! Per-target configuration.
//!
//! A target is immutable once loaded; the runner and sessions only borrow it.

use serde::{Deserialize, Serialize};

/// One refresh target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Unique identifier, also passed to the mutator as context.
    pub id: String,

    /// Disabled targets are never run and their credentials never fetched.
    pub enabled: bool,

    /// Locator for the text field, opaque to everything but the session.
    pub field: FieldSelector,

    /// Accepted text must be at least this many characters.
    pub min_content_length: usize,

    /// Accepted text must be at most this many characters.
    pub max_content_length: usize,

    /// Login form locators (browser backend only).
    pub login: Option<LoginSelectors>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            field: FieldSelector::default(),
            min_content_length: 1,
            max_content_length: 2000,
            login: None,
        }
    }
}

impl TargetConfig {
    /// Length bounds the gate enforces for this target.
    pub fn length_bounds(&self) -> (usize, usize) {
        (self.min_content_length, self.max_content_length)
    }
}

/// Where the refreshed text lives on the target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FieldSelector {
    /// Page to open before touching the field.
    pub page_url: Option<String>,

    /// Element to click to open the editor, if the field is behind one.
    pub edit: Option<String>,

    /// The text field itself.
    pub field: String,

    /// Element to click to persist the edit.
    pub save: Option<String>,
}

impl Default for FieldSelector {
    fn default() -> Self {
        Self {
            page_url: None,
            edit: None,
            field: "textarea".to_string(),
            save: None,
        }
    }
}

/// Login form locators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginSelectors {
    pub url: String,
    pub username: String,
    pub password: String,
    pub submit: String,

    /// Present only once login succeeded.
    pub success: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let target = TargetConfig::default();
        assert!(target.enabled);
        assert_eq!(target.length_bounds(), (1, 2000));
        assert_eq!(target.field.field, "textarea");
        assert!(target.login.is_none());
    }

    #[test]
    fn test_parse_login_selectors() {
        let yaml = r##"
id: naukri
login:
  url: https://www.naukri.com/nlogin/login
  username: "#usernameField"
  password: "#passwordField"
  submit: "button[type=submit]"
  success: ".view-profile-wrapper"
field:
  page-url: https://www.naukri.com/mnjuser/profile
  edit: "#profileSummary .edit"
  field: "textarea#profileSummary"
  save: "button.btn-dark-ot"
"##;
        let target: TargetConfig = serde_yaml::from_str(yaml).unwrap();
        let login = target.login.unwrap();
        assert_eq!(login.username, "#usernameField");
        assert_eq!(target.field.edit.as_deref(), Some("#profileSummary .edit"));
        assert_eq!(target.field.save.as_deref(), Some("button.btn-dark-ot"));
    }
}
