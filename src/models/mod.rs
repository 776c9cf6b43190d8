// src/models/mod.rs

pub mod leaderboard;
pub mod question;
pub mod score;
pub mod user;
