//! # Message Envelope
//!
//! The wrapper every publish produces. An envelope is built exactly once per
//! publish and never mutated afterwards; the bus shares it behind an `Arc`
//! between the dispatcher, every handler and the history buffer.

use crate::ids::MessageId;
use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while constructing an envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The topic was empty or only whitespace.
    #[error("topic must not be empty")]
    EmptyTopic,
}

/// Immutable message record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<P> {
    id: MessageId,
    topic: String,
    payload: P,
    source_service: String,
    metadata: Metadata,
    created_at: DateTime<Utc>,
}

impl<P> Envelope<P> {
    /// Build an envelope with a fresh [`MessageId`].
    ///
    /// The source service is taken from `metadata.source_service`.
    ///
    /// # Errors
    ///
    /// - `EnvelopeError::EmptyTopic` - `topic` is empty or whitespace
    pub fn new(
        topic: impl Into<String>,
        payload: P,
        metadata: Metadata,
    ) -> Result<Self, EnvelopeError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(EnvelopeError::EmptyTopic);
        }

        Ok(Self {
            id: MessageId::new(),
            source_service: metadata.source_service.clone(),
            topic,
            payload,
            metadata,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn source_service(&self) -> &str {
        &self.source_service
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Consume the envelope, returning the payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}
