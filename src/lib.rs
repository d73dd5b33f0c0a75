pub mod cli;
pub mod client;
pub mod config;
pub mod extract;
pub mod model;
pub mod prompt;
pub mod roster;
pub mod storage;
pub mod translator;
