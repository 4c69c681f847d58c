pub mod access;
pub mod admin;
pub mod listing;
pub mod stats;
