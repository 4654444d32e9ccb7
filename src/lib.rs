pub mod aggregator;
pub mod analyzer;
pub mod api;
pub mod client;
pub mod config;
pub mod data_models;
pub mod driver;
pub mod error;
pub mod export;
pub mod extractor;
pub mod input;
pub mod similarity;
