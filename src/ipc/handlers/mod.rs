pub mod attendance;
pub mod core;
pub mod coursework;
pub mod directory;
pub mod grading;
pub mod setup;
pub mod transcripts;
