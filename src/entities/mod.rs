pub mod flight;
pub mod notification;
pub mod ticket;
pub mod user;
