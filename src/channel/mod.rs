//! Length-delimited, bincode-encoded message channels over any async byte stream.
mod asymmetric;

pub use asymmetric::*;
