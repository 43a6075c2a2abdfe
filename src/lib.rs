pub mod auth;
pub mod catalog;
pub mod config;
pub mod contact;
pub mod error;
pub mod files;
pub mod handlers;
pub mod logging;
pub mod registry;
pub mod router;
pub mod state;
pub mod storage;

pub use error::{Outcome, PortalError, Result, Warning};
