// Module structure for the appliance syslog collector.

// Core
pub mod parser;
pub mod store;

// Pipeline and process lifecycle
pub mod ingest;
pub mod conf;
pub mod runtime;
