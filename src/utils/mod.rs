pub mod config;
pub mod error;
pub mod live_feed;
pub mod live_table;
pub mod models;
pub mod realtime;
pub mod session;
pub mod submission;
pub mod supabase;
