pub mod permission_service;

pub use permission_service::{ApprovalCallback, CallbackOutcome, ExternalEntry, PermissionService, SpaceEntry};
