pub mod headers;
pub mod range;
