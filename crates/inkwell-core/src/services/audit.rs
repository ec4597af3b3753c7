//! Audit interceptor - before/after trail for post mutations.
//!
//! The principal is resolved once per call from the caller's
//! [`PrincipalProvider`] and handed to the wrapped operation as an argument;
//! it lives only as long as that call.

use std::fmt;
use std::future::Future;

use tracing::Instrument;

use crate::domain::{Post, PostDraft, PostId, Principal};
use crate::error::DomainError;
use crate::ports::PrincipalProvider;

use super::validation::Operation;

/// Tracing target of every audit event.
pub const AUDIT_TARGET: &str = "audit";

/// A post mutation together with the arguments worth recording.
#[derive(Debug, Clone, Copy)]
pub enum AuditedCall<'a> {
    CreatePost { draft: &'a PostDraft },
    UpdatePost { id: PostId, draft: &'a PostDraft },
    DeletePost { id: PostId },
}

impl AuditedCall<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            AuditedCall::CreatePost { .. } => Operation::CreatePost,
            AuditedCall::UpdatePost { .. } => Operation::UpdatePost,
            AuditedCall::DeletePost { .. } => Operation::DeletePost,
        }
    }
}

/// Argument snapshot. Images appear only by their original file name.
impl fmt::Display for AuditedCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditedCall::CreatePost { draft } => write_draft(f, None, draft),
            AuditedCall::UpdatePost { id, draft } => write_draft(f, Some(*id), draft),
            AuditedCall::DeletePost { id } => write!(f, "[id={id}]"),
        }
    }
}

fn write_draft(f: &mut fmt::Formatter<'_>, id: Option<PostId>, draft: &PostDraft) -> fmt::Result {
    f.write_str("[")?;
    if let Some(id) = id {
        write!(f, "id={id}, ")?;
    }
    let image = draft
        .present_image()
        .map(|image| image.original_name.as_str())
        .unwrap_or_default();
    write!(
        f,
        "title='{}', content='{}', image='{}', tags='{}']",
        draft.title.trim(),
        draft.content.trim(),
        image,
        draft.tags.trim()
    )
}

/// One-line description of an operation's result for the audit trail.
pub trait AuditSummary {
    fn audit_summary(&self) -> String;
}

impl AuditSummary for Post {
    fn audit_summary(&self) -> String {
        format!("post[id={}, tags={:?}]", self.id, self.tag_names())
    }
}

impl AuditSummary for () {
    fn audit_summary(&self) -> String {
        "ok".to_string()
    }
}

/// Wraps post mutations with entry and success audit events.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditInterceptor;

impl AuditInterceptor {
    pub fn new() -> Self {
        Self
    }

    /// Run `operation` for the current principal, logging the call before it
    /// starts and its result once it succeeds. Anonymous callers are refused
    /// with [`DomainError::Unauthorized`] without running the operation.
    pub async fn around<T, F, Fut>(
        &self,
        principals: &dyn PrincipalProvider,
        call: AuditedCall<'_>,
        operation: F,
    ) -> Result<T, DomainError>
    where
        F: FnOnce(Principal) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
        T: AuditSummary,
    {
        let name = call.operation().name();
        let Some(principal) = principals.current_principal() else {
            tracing::warn!(
                target: AUDIT_TARGET,
                operation = name,
                "Rejected anonymous post mutation"
            );
            return Err(DomainError::Unauthorized);
        };

        let span = tracing::info_span!(
            "audit",
            operation = name,
            principal_id = principal.id,
            request_id = principals.correlation_id().unwrap_or("-"),
        );

        async move {
            tracing::info!(
                target: AUDIT_TARGET,
                principal_id = principal.id,
                principal = %principal.username,
                operation = name,
                arguments = %call,
                "Post mutation started"
            );

            let result = operation(principal.clone()).await;

            match &result {
                Ok(value) => tracing::info!(
                    target: AUDIT_TARGET,
                    principal_id = principal.id,
                    principal = %principal.username,
                    operation = name,
                    result = %value.audit_summary(),
                    "Post mutation completed"
                ),
                Err(err) => tracing::warn!(
                    target: AUDIT_TARGET,
                    principal_id = principal.id,
                    principal = %principal.username,
                    operation = name,
                    error = %err,
                    "Post mutation failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;
    use crate::domain::{ImageUpload, RequestContext};

    #[derive(Debug, Clone)]
    struct Captured {
        message: String,
        fields: Vec<(String, String)>,
    }

    impl Captured {
        fn field(&self, name: &str) -> Option<&str> {
            self.fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }
    }

    #[derive(Clone, Default)]
    struct AuditCapture(Arc<Mutex<Vec<Captured>>>);

    struct FieldVisitor(Captured);

    impl Visit for FieldVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0.message = format!("{value:?}");
            } else {
                self.0.fields.push((field.name().to_string(), format!("{value:?}")));
            }
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    impl<S: Subscriber> Layer<S> for AuditCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() != AUDIT_TARGET {
                return;
            }
            let mut visitor = FieldVisitor(Captured {
                message: String::new(),
                fields: Vec::new(),
            });
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }

    impl AuditCapture {
        fn events(&self) -> Vec<Captured> {
            self.0.lock().unwrap().clone()
        }
    }

    fn alice() -> RequestContext {
        RequestContext::for_principal(Principal {
            id: 7,
            username: "alice".to_string(),
        })
        .with_request_id("req-1")
    }

    #[tokio::test]
    async fn test_success_emits_entry_and_completion() {
        let capture = AuditCapture::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

        let draft = PostDraft::new(" Hello ", "World", "rust")
            .with_image(ImageUpload::new("cat.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]));

        let result = AuditInterceptor::new()
            .around(&alice(), AuditedCall::CreatePost { draft: &draft }, |principal| async move {
                assert_eq!(principal.username, "alice");
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "Post mutation started");
        assert_eq!(events[0].field("principal"), Some("alice"));
        assert_eq!(
            events[0].field("arguments"),
            Some("[title='Hello', content='World', image='cat.png', tags='rust']")
        );
        assert_eq!(events[1].message, "Post mutation completed");
        assert_eq!(events[1].field("result"), Some("ok"));
    }

    #[tokio::test]
    async fn test_failure_emits_no_completion() {
        let capture = AuditCapture::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

        let result: Result<(), _> = AuditInterceptor::new()
            .around(&alice(), AuditedCall::DeletePost { id: 3 }, |_| async {
                Err(DomainError::Internal("disk full".to_string()))
            })
            .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
        let messages: Vec<_> = capture.events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["Post mutation started", "Post mutation failed"]);
    }

    #[tokio::test]
    async fn test_anonymous_caller_never_runs_operation() {
        let mut ran = false;
        let result = AuditInterceptor::new()
            .around(&RequestContext::anonymous(), AuditedCall::DeletePost { id: 1 }, |_| {
                ran = true;
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(DomainError::Unauthorized)));
        assert!(!ran);
    }

    #[test]
    fn test_update_snapshot_includes_id_and_skips_empty_image() {
        let draft = PostDraft::new("t", "c", "a b").with_image(ImageUpload::default());
        let call = AuditedCall::UpdatePost { id: 9, draft: &draft };
        assert_eq!(
            call.to_string(),
            "[id=9, title='t', content='c', image='', tags='a b']"
        );
    }
}
