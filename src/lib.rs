//! Lyrics dataset builder: resolve, clean and persist lyrics for a catalog
//! of tracks.

pub mod catalog;
pub mod cleaner;
pub mod client;
pub mod config;
pub mod credits;
pub mod error;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod observe;
pub mod pipeline;
pub mod progress;
pub mod providers;
pub mod resolver;
pub mod rules;
pub mod safety;
pub mod store;
