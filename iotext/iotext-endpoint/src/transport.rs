// Copyright (c) Microsoft. All rights reserved.

/// The AMQP session operations the resolver depends on.
///
/// Implementations open their own connection per call and close it before returning.
#[async_trait::async_trait]
pub trait AmqpTransport: Send + Sync {
    /// Attempts to attach a receiver at `request.address`.
    ///
    /// A redirect from the service is the expected answer and must be returned as
    /// [`HandshakeOutcome::Redirected`], not as an error.
    async fn attempt_handshake(
        &self,
        request: &HandshakeRequest,
    ) -> Result<HandshakeOutcome, std::io::Error>;

    /// Issues a management request and returns the partition properties of the response.
    async fn read_management(
        &self,
        request: &ManagementRequest,
    ) -> Result<PartitionMetadata, std::io::Error>;
}

#[derive(Clone, Debug)]
pub struct HandshakeRequest {
    /// `amqps://{hostname}/messages/events/$management`
    pub address: String,
    pub username: String,
    pub token: iotext_common::SasToken,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Redirected { hostname: String, path: String },

    /// The service accepted the link without redirecting.
    Connected,
}

#[derive(Clone, Debug)]
pub struct ManagementRequest {
    pub address: String,
    pub username: String,
    pub token: iotext_common::SasToken,

    /// Application property `operation`.
    pub operation: &'static str,

    /// Application property `type`.
    pub entity_type: &'static str,

    /// Application property `name`, the event hub path.
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub partition_count: Option<u32>,
    pub partition_ids: Option<Vec<String>>,
}
