#![warn(unused_extern_crates)]

pub mod analyzer;
pub mod annotate;
pub mod decode;
pub mod shapes;
