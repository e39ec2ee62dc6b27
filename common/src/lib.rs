//! Common library exports: query documents, filter and suggest state, result views.

extern crate serde;


pub mod search_const;
pub mod search_query;
pub mod search_result;
pub mod form_fields;
pub mod filter_state;
pub mod suggest_state;
