// Domain model for devices and attributes
pub mod device;

// Attribute filter engine
pub mod filter;

// In-memory device table
pub mod store;

// Cache facade and update ingestion
pub mod cache;

// Update fan-out to live subscribers
pub mod subscription;

// Upstream hub client
pub mod upstream;

// Session authentication
pub mod auth;

// HTTP API
pub mod api;

// Process configuration
pub mod config;
