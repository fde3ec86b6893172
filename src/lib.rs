pub mod cards;
pub mod config;
pub mod monitor;
pub mod probe;
pub mod render;
pub mod version;
pub mod web;

// User-facing strings live in locales/<lang>.yml
rust_i18n::i18n!("locales", fallback = "en");
