// Copyright (c) Microsoft. All rights reserved.

use base64::Engine;

/// A shared access signature, ready to be used as an `Authorization` header value
/// or as an AMQP CBS token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SasToken {
    value: String,
    expiry: chrono::DateTime<chrono::Utc>,
}

impl SasToken {
    /// Signs a token for `audience` with the base64-encoded shared access `key`.
    ///
    /// `policy` is the shared access policy name. It is appended as `skn` when present;
    /// device-scoped keys have no policy.
    pub fn generate(
        audience: &str,
        key: &str,
        policy: Option<&str>,
        expiry: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self, crate::Error> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(key)
            .map_err(|err| crate::Error::InvalidKey(Box::new(err)))?;

        let expiry_seconds = expiry.timestamp().to_string();

        let audience = audience.to_lowercase();
        let resource_uri = percent_encoding::percent_encode(audience.as_bytes(), crate::ENCODE_SET);

        let sig_data = format!("{}\n{}", resource_uri, expiry_seconds);
        let signature = hmac_sha256(&key, sig_data.as_bytes())?;
        let signature = base64::engine::general_purpose::STANDARD.encode(signature);

        let token = {
            let mut token = url::form_urlencoded::Serializer::new(format!("sr={}", resource_uri));

            token
                .append_pair("sig", &signature)
                .append_pair("se", &expiry_seconds);

            if let Some(policy) = policy {
                token.append_pair("skn", policy);
            }

            token.finish()
        };

        Ok(SasToken {
            value: format!("SharedAccessSignature {}", token),
            expiry,
        })
    }

    /// Signs a token that expires `lifetime` from now.
    pub fn generate_for(
        audience: &str,
        key: &str,
        policy: Option<&str>,
        lifetime: std::time::Duration,
    ) -> Result<Self, crate::Error> {
        let lifetime = chrono::Duration::from_std(lifetime)
            .map_err(crate::Error::TokenLifetime)?;

        SasToken::generate(audience, key, policy, chrono::Utc::now() + lifetime)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn expiry(&self) -> chrono::DateTime<chrono::Utc> {
        self.expiry
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now())
    }

    #[must_use]
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now >= self.expiry
    }
}

impl std::fmt::Display for SasToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, openssl::error::ErrorStack> {
    let key = openssl::pkey::PKey::hmac(key)?;

    let mut signer = openssl::sign::Signer::new(openssl::hash::MessageDigest::sha256(), &key)?;
    signer.update(data)?;

    signer.sign_to_vec()
}
