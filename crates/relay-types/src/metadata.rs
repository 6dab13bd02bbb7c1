//! Per-message metadata carried alongside every payload.

use crate::ids::CorrelationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header map. Keys are unique; iteration order is stable.
pub type Headers = BTreeMap<String, String>;

/// Well-known header names and values.
pub mod headers {
    /// Marks a publish made by the request/reply coordinator.
    pub const REQUEST_TYPE: &str = "RequestType";
    /// Type name of the response the requester expects (diagnostics only).
    pub const RESPONSE_TYPE: &str = "ResponseType";
    /// Value of [`REQUEST_TYPE`] for request publishes.
    pub const QUERY: &str = "Query";
}

/// Metadata attached to a publish.
///
/// In-process shape: `{correlationId?, sourceService, headers}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Correlation id; without one a publish cannot complete a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,

    /// Publishing service. The bus overwrites this with its own name.
    #[serde(default)]
    pub source_service: String,

    /// Free-form string headers.
    #[serde(default)]
    pub headers: Headers,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    #[must_use]
    pub fn with_source_service(mut self, source_service: impl Into<String>) -> Self {
        self.source_service = source_service.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Look up a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// The correlation id, if present and non-empty.
    ///
    /// This is the id a publish uses to try to complete a pending request.
    pub fn reply_correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref().filter(|id| !id.is_empty())
    }

    /// Whether this metadata was produced by a request publish.
    pub fn is_request(&self) -> bool {
        self.header(headers::REQUEST_TYPE) == Some(headers::QUERY)
    }

    /// Metadata for replying to the message carrying `self`.
    ///
    /// Keeps the correlation id and drops everything else, so the reply is not
    /// itself marked as a request.
    #[must_use]
    pub fn reply(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            ..Self::default()
        }
    }
}
