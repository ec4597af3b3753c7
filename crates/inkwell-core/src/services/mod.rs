//! Services - the use cases built on top of the ports.

mod audit;
mod posts;
mod tags;
mod users;
pub mod validation;

pub use audit::{AUDIT_TARGET, AuditInterceptor, AuditSummary, AuditedCall};
pub use posts::PostService;
pub use tags::{TagReconciliation, reconcile_tags};
pub use users::UserService;
pub use validation::{
    MAX_IMAGE_BYTES, Operation, PolicyTable, Target, ValidationPipeline, ValidationPolicy,
};
