//! Per-operation context for correlating log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context attached to one inbound authority operation.
///
/// Every log line emitted while the context's span is entered carries the
/// operation name and id, so concurrent operations can be told apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique id of this operation.
    pub request_id: Uuid,
    /// Correlation id shared by operations a caller groups together.
    pub correlation_id: Uuid,
    /// Component that received the operation (e.g. `dispatch`, `cli`).
    pub source: String,
    /// Operation name (e.g. `submit-capability-request`).
    pub operation: Option<String>,
    /// Participant the operation concerns, when known.
    pub principal: Option<String>,
    /// When the operation started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a new context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            source: source.into(),
            operation: None,
            principal: None,
            started_at: Utc::now(),
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the participant the operation concerns.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Milliseconds since the operation started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Create a tracing span for this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "operation",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            source = %self.source,
            operation = self.operation.as_deref(),
            principal = self.principal.as_deref(),
        )
    }

    /// First 8 characters of the id, for compact logs.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Keeps a context's span entered and logs completion on drop.
pub struct RequestGuard {
    context: RequestContext,
    _span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("operation started");
        Self {
            context,
            _span: span,
        }
    }

    /// The guarded context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "operation completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = RequestContext::new("dispatch");
        assert_eq!(ctx.source, "dispatch");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(ctx.operation.is_none());
        assert!(ctx.principal.is_none());
    }

    #[test]
    fn test_context_builder() {
        let correlation = Uuid::new_v4();
        let ctx = RequestContext::new("dispatch")
            .with_correlation_id(correlation)
            .with_operation("grant-manually")
            .with_principal("app:1234");

        assert_eq!(ctx.correlation_id, correlation);
        assert_eq!(ctx.operation.as_deref(), Some("grant-manually"));
        assert_eq!(ctx.principal.as_deref(), Some("app:1234"));
    }

    #[test]
    fn test_elapsed() {
        let ctx = RequestContext::new("test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(RequestContext::new("test").short_id().len(), 8);
    }

    #[test]
    fn test_guard_exposes_context() {
        let ctx = RequestContext::new("test").with_operation("list-requests");
        let id = ctx.request_id;
        let guard = RequestGuard::new(ctx);
        assert_eq!(guard.context().request_id, id);
    }

    #[test]
    fn test_serialization() {
        let ctx = RequestContext::new("cli").with_operation("replay");

        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"source\":\"cli\""));
        assert!(json.contains("\"operation\":\"replay\""));

        let parsed: RequestContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.operation.as_deref(), Some("replay"));
    }
}
