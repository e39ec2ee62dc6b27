//! Faceted search controller: filter and autocomplete scopes over an HTTP search endpoint.

pub mod config;
pub mod db_utils;
pub mod search;
