//! API request handlers

pub mod about;
pub mod corpus;
pub mod themes;
