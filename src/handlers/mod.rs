// handlers/mod.rs - HTTP entry points
//
// external: identities from outside the platform, scoped by grants
// internal: session callers hitting the views directly
pub mod external;
pub mod internal;
