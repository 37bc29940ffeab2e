pub mod admin;
pub mod auth;
pub mod flights;
pub mod notifications;
pub mod tickets;
pub mod users;
