// Copyright (c) Microsoft. All rights reserved.

use crate::error::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub hub: Option<ResourceSettings>,

    #[serde(default)]
    pub dps: Option<ResourceSettings>,

    #[serde(default)]
    pub central: Option<CentralSettings>,

    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub http: HttpSettings,
}

/// A hub or DPS instance, addressed by a shared access policy connection string.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSettings {
    pub connection_string: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CentralSettings {
    pub app_id: String,
    pub api_token: String,

    /// Overrides `https://{app_id}.azureiotcentral.com`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSettings {
    /// Property sections to include in decoded events. Accepts `sys`, `app`, `anno` and `all`
    /// as well as the long forms.
    #[serde(default)]
    pub properties: Vec<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default = "default_token_duration_secs")]
    pub token_duration_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            properties: vec![],
            content_type: None,
            interface: None,
            token_duration_secs: default_token_duration_secs(),
        }
    }
}

fn default_token_duration_secs() -> u64 {
    3600
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpSettings {
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), Error> {
        if self.monitor.token_duration_secs == 0 {
            return Err(Error::InvalidValue {
                key: "monitor.token_duration_secs",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::InvalidValue {
                key: "http.timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }

        let resources = [
            ("hub.connection_string", &self.hub),
            ("dps.connection_string", &self.dps),
        ];

        for (key, resource) in resources {
            if let Some(resource) = resource {
                if resource.connection_string.trim().is_empty() {
                    return Err(Error::InvalidValue {
                        key,
                        reason: "must not be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
