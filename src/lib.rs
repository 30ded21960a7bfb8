pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod realtime;
pub mod reorder;
pub mod shutdown;
pub mod store;

pub use client::DeskClient;
pub use error::{DeskError, Result};
