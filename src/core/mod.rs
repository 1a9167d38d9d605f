pub mod alerts;
pub mod config;
pub mod model;
pub mod parser;
pub mod state;
pub mod store;
