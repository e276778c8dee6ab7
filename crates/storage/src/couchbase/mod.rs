// Private module - not exposed in public API
mod bucket;
mod client;

pub use client::RestConnector;
