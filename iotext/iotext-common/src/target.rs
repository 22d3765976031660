// Copyright (c) Microsoft. All rights reserved.

/// A shared access policy on an IoT Hub or DPS instance: the hostname plus the policy's keys.
///
/// The serde form uses the flat keys of a decomposed connection string
/// (`entity`, `policy`, `primarykey`, `secondarykey`).
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Target {
    pub entity: String,
    pub policy: String,
    #[serde(rename = "primarykey")]
    pub primary_key: String,
    #[serde(
        rename = "secondarykey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub secondary_key: Option<String>,
}

impl Target {
    /// The short resource name, i.e. the first label of the hostname.
    #[must_use]
    pub fn name(&self) -> &str {
        self.entity.split('.').next().unwrap_or(&self.entity)
    }

    /// A token for the hostname itself, signed with the primary key.
    pub fn sas_token(
        &self,
        lifetime: std::time::Duration,
    ) -> Result<crate::SasToken, crate::Error> {
        self.sas_token_for(&self.entity, lifetime)
    }

    /// A token for an arbitrary audience, signed with the primary key.
    pub fn sas_token_for(
        &self,
        audience: &str,
        lifetime: std::time::Duration,
    ) -> Result<crate::SasToken, crate::Error> {
        crate::SasToken::generate_for(audience, &self.primary_key, Some(&self.policy), lifetime)
    }
}

impl std::str::FromStr for Target {
    type Err = crate::Error;

    /// Parses a `HostName=...;SharedAccessKeyName=...;SharedAccessKey=...` connection string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entity = None;
        let mut policy = None;
        let mut primary_key = None;
        let mut secondary_key = None;

        for part in s.split(';').map(str::trim).filter(|part| !part.is_empty()) {
            // Keys are base64 and may end in '=', so only split on the first one.
            let (name, value) = part
                .split_once('=')
                .ok_or(crate::Error::ConnectionString("expected name=value pairs"))?;

            let slot = match name.trim().to_ascii_lowercase().as_str() {
                "hostname" => &mut entity,
                "sharedaccesskeyname" => &mut policy,
                "sharedaccesskey" => &mut primary_key,
                "secondarykey" => &mut secondary_key,
                _ => continue,
            };

            *slot = Some(value.trim().to_string());
        }

        Ok(Target {
            entity: entity.ok_or(crate::Error::ConnectionString("missing HostName"))?,
            policy: policy.ok_or(crate::Error::ConnectionString("missing SharedAccessKeyName"))?,
            primary_key: primary_key
                .ok_or(crate::Error::ConnectionString("missing SharedAccessKey"))?,
            secondary_key,
        })
    }
}
