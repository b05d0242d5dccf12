//! OAuth handler adapters.

mod http_handler;

pub use http_handler::{endpoints, HttpOAuthHandler, ProviderEndpoints};
