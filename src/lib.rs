//! Badge generation service
//!
//! Renders shields-style SVG badges whose content is either given in the
//! request path or fetched from third-party APIs (GitHub, Travis CI, AUR,
//! Liberapay, Twitch).

pub mod assets;
pub mod badge;
pub mod cache;
pub mod config;
pub mod errors;
pub mod services;
pub mod utils;
pub mod web;
