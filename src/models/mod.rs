pub mod catalog;
pub mod pattern;
pub mod permission;
pub mod space;

pub use catalog::{Favorite, FavoriteGroup, IndexSet};
pub use pattern::{PatternRow, Remark, SignatureConfig};
pub use permission::{ApplyStatus, AuthorizerSettings, ExternalPermission, ExternalPermissionApplyRecord};
pub use space::Space;
