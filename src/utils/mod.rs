pub mod jwt;
pub mod pdf;
