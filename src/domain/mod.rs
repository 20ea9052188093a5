//! Domain modules (vertical slices): wire types, domain types, conversions.

pub mod history;
pub mod special;
pub mod symbols;
