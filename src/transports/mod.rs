// src/transports/mod.rs

pub mod console;
pub mod memory;
