//! Runtime module: process lifecycle (boot, listen, serve, shutdown).

pub mod boot;
pub mod listen;
pub mod serve;
pub mod stop;
