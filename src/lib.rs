// src/lib.rs

pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod message;
pub mod pipeline;
pub mod repl;
pub mod server;
pub mod store;
