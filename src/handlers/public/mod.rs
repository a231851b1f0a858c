// handlers/public/mod.rs - Anonymous endpoints
//
// Route Prefix: /api/* plus /health
// Only active and published content is visible here.

pub mod auth;
pub mod content;
pub mod health;
pub mod translations;
