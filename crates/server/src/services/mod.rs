pub mod access;
pub mod ai;
pub mod invite;
pub mod leaderboard;
pub mod pdf;
pub mod prompts;
pub mod statistics;
