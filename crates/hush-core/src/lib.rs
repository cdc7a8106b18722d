pub mod collab;
pub mod config;
pub mod decision;
pub mod error;
pub mod filter;
pub mod io;
pub mod notification;
pub mod paths;
pub mod policy;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{HushError, Result};
