pub mod config;
pub mod context;
pub mod node;
pub mod progress;
pub mod schema;
