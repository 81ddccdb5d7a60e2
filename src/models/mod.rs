//! Data models

pub mod record;
pub mod response;

pub use record::*;
pub use response::*;
