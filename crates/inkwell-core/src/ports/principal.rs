use crate::domain::{Principal, RequestContext};

/// Resolves who is making the current call.
pub trait PrincipalProvider: Send + Sync {
    fn current_principal(&self) -> Option<Principal>;

    /// Identifier correlating log lines of one request, if known.
    fn correlation_id(&self) -> Option<&str> {
        None
    }
}

impl PrincipalProvider for RequestContext {
    fn current_principal(&self) -> Option<Principal> {
        self.principal.clone()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}
