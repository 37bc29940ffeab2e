pub mod flights;
pub mod notifications;
pub mod tickets;
