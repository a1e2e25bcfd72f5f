pub mod callback;
pub mod health;
pub mod proxy;
pub mod spaces;
