pub mod cli;
pub mod config;
pub mod engine;
pub mod model;
pub mod service;
pub mod store;
pub mod supabase;
pub mod tui;
