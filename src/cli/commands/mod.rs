pub mod auth;
pub mod open;
pub mod routes;
pub mod tabs;
pub mod theme;
