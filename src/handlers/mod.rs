// src/handlers/mod.rs

pub mod auth;
pub mod leaderboard;
pub mod quiz;
pub mod user;
