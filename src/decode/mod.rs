//! The consumer side: framing/resynchronization plus the recursive-descent
//! parser that turns tagged bytes back into rendered text.

mod framer;
mod parser;

pub use framer::parse;
