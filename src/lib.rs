pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod llm;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod util;
