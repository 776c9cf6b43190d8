// src/services/mod.rs

pub mod stats;
pub mod trivia;
