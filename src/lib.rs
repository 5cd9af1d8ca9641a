#![forbid(unsafe_code)]
//! A binary wire codec for remote formatted logging: a compact, typed,
//! self-describing serialization that carries a format template and its
//! arguments from a resource-constrained producer to a host that
//! reconstructs a human-readable string.
//!
//! The producer ([`encode::print`]) validates a template, tags and emits
//! every argument through a [`io::Sink`]; the consumer ([`decode::parse`])
//! locates frames in a byte stream, resynchronizing past noise, and
//! renders them back to text using its own small runtime replacement-field
//! formatter ([`brace`]) since Rust has no equivalent of
//! `fmt::runtime(replacementField)` for a format string only known at
//! parse time.

pub mod brace;
pub mod catalog;
pub mod decode;
pub mod duration;
pub mod encode;
pub mod io;
pub mod protocol;
pub mod tag;
pub mod template;
pub mod value;

#[cfg(test)]
mod test;

pub use catalog::Catalog;
pub use decode::parse;
pub use encode::{print, EncoderConfig};
pub use io::Sink;
pub use value::Encodable;
