//! Operation Context
//!
//! Who is acting and from where. Carried from the auth middleware into
//! handlers and written alongside activity log entries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, used for activity logging and tracing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationContext {
    /// Authenticated user performing the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Tenant of the authenticated user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: Uuid, company_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self.company_id = Some(company_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let user_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();

        let context = OperationContext::new()
            .with_user(user_id, company_id)
            .with_correlation_id(correlation_id)
            .with_client_ip("10.0.0.7")
            .with_user_agent("curl/8.0");

        assert_eq!(context.user_id, Some(user_id));
        assert_eq!(context.company_id, Some(company_id));
        assert_eq!(context.correlation_id, Some(correlation_id));
        assert_eq!(context.client_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(context.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_ensure_correlation_id() {
        let mut context = OperationContext::new();
        assert!(context.correlation_id.is_none());

        let id = context.ensure_correlation_id();
        assert_eq!(context.correlation_id, Some(id));

        // Calling again should return the same ID
        assert_eq!(context.ensure_correlation_id(), id);
    }

    #[test]
    fn test_empty_fields_are_not_serialized() {
        let json = serde_json::to_value(OperationContext::new()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
