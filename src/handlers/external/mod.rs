pub mod callback;
pub mod dispatch;
pub mod entry;
pub mod spaces;

// Re-export handler functions for use in routing
pub use callback::post as callback_post;
pub use dispatch::post as dispatch_post;
pub use entry::get as entry_get;
pub use spaces::get as spaces_get;
