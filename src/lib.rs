pub mod channels;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod logging;
pub mod media;
pub mod sessions;
