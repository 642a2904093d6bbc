use std::fmt;

use serde::Deserialize;

/// Supplier of credentials and the user agent for API requests.
pub trait Configuration: Send + Sync {
    fn username(&self) -> String;

    fn password(&self) -> String;

    fn user_agent(&self) -> String {
        default_user_agent()
    }
}

pub fn default_user_agent() -> String {
    format!("Librobot {}", env!("CARGO_PKG_VERSION"))
}

/// Fixed credentials, e.g. deserialized from an application config file.
#[derive(Clone, Default, Deserialize)]
pub struct StaticConfiguration {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl StaticConfiguration {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Configuration for StaticConfiguration {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }
}

impl fmt::Debug for StaticConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticConfiguration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
