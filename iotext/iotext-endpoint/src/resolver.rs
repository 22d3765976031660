// Copyright (c) Microsoft. All rights reserved.

use iotext_common::{SasToken, Target};

use crate::{AmqpTransport, Error, HandshakeOutcome, HandshakeRequest, ManagementRequest};

/// Lifetime of the tokens used only while resolving.
const HANDSHAKE_TOKEN_LIFETIME: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct Credential {
    /// `{policy}@sas.root.{hub name}`
    pub username: String,
    pub token: SasToken,
}

/// A resolved event stream. The credential is not renewed; callers resolve again once
/// it expires.
#[derive(Clone, Debug)]
pub struct EndpointTarget {
    pub hostname: String,
    pub path: String,
    pub partitions: Vec<String>,
    pub credential: Credential,
}

impl EndpointTarget {
    /// Address of the receiver link for one partition of the default consumer group.
    #[must_use]
    pub fn partition_address(&self, partition: &str) -> String {
        format!(
            "amqps://{}/{}/ConsumerGroups/$Default/Partitions/{}",
            self.hostname, self.path, partition
        )
    }
}

pub struct EndpointResolver<T> {
    transport: T,
    timeout: std::time::Duration,
}

impl<T> EndpointResolver<T>
where
    T: AmqpTransport,
{
    pub fn new(transport: T) -> Self {
        EndpointResolver {
            transport,
            timeout: std::time::Duration::from_secs(30),
        }
    }

    /// Bounds each of the two round-trips of [`EndpointResolver::resolve`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;

        self
    }

    pub async fn resolve(
        &self,
        target: &Target,
        token_duration: std::time::Duration,
    ) -> Result<EndpointTarget, Error> {
        let username = format!("{}@sas.root.{}", target.policy, target.name());

        let handshake = HandshakeRequest {
            address: format!(
                "amqps://{}/{}/$management",
                target.entity,
                crate::EVENTS_PATH
            ),
            username: username.clone(),
            token: target.sas_token(HANDSHAKE_TOKEN_LIFETIME)?,
        };

        log::debug!("Attaching to {}", handshake.address);

        let outcome = self.transport.attempt_handshake(&handshake);
        let outcome = tokio::time::timeout(self.timeout, outcome)
            .await
            .map_err(|_| Error::Timeout("the redirect handshake"))?
            .map_err(Error::Client)?;

        let (hostname, path) = match outcome {
            HandshakeOutcome::Redirected { hostname, path } => {
                log::info!("Redirected to {}/{}", hostname, path);
                (hostname, path)
            }
            HandshakeOutcome::Connected => {
                log::info!("{} accepted the link without a redirect", target.entity);
                (target.entity.clone(), crate::EVENTS_PATH.to_string())
            }
        };

        let audience = format!("sb://{}/{}", hostname, path);

        let management = ManagementRequest {
            address: format!("amqps://{}/{}/$management", hostname, path),
            username: username.clone(),
            token: target.sas_token_for(&audience, HANDSHAKE_TOKEN_LIFETIME)?,
            operation: crate::MANAGEMENT_OPERATION_READ,
            entity_type: crate::EVENTHUB_ENTITY_TYPE,
            name: path.clone(),
        };

        let metadata = self.transport.read_management(&management);
        let metadata = tokio::time::timeout(self.timeout, metadata)
            .await
            .map_err(|_| Error::Timeout("partition metadata"))?
            .map_err(Error::Client)?;

        let partition_count = match metadata.partition_count {
            Some(count) if count > 0 => count,
            _ => {
                return Err(Error::EndpointDiscovery(format!(
                    "No partitions were reported for the event endpoint of '{}'. \
                     Monitoring is not possible; please contact support if this persists.",
                    target.entity
                )))
            }
        };

        // An empty id list is treated as absent.
        let partitions = match metadata.partition_ids {
            Some(ids) if !ids.is_empty() => {
                if ids.len() != partition_count as usize {
                    log::warn!(
                        "{}/{} reported {} partitions but {} partition ids; using the ids",
                        hostname,
                        path,
                        partition_count,
                        ids.len()
                    );
                }
                ids
            }
            _ => (0..partition_count).map(|id| id.to_string()).collect(),
        };

        log::debug!("{}/{} has partitions {:?}", hostname, path, partitions);

        Ok(EndpointTarget {
            credential: Credential {
                username,
                token: target.sas_token_for(&audience, token_duration)?,
            },
            hostname,
            path,
            partitions,
        })
    }
}
