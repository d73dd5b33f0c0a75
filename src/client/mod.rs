// File: ./src/client/mod.rs
// re-exports the portal client modules
pub mod cert;
pub mod core;

pub use self::core::{Fetched, PortalClient, PortalRequest};
