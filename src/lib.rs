pub mod api;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod permission;
pub mod persistence;
pub mod router;
pub mod session;
pub mod tabs;
pub mod theme;
pub mod types;
pub mod user;

pub use console::{Console, ConsoleBuilder, Navigation, Redirect};

#[cfg(test)]
pub mod testing;
