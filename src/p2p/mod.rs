// `network` owns the connection registry and the liveness table behind a single lock.
// `connection` is the write side of one peer transport; its read side lives in the
// server's reader task.
pub mod connection;
pub mod correlation;
pub mod liveness;
pub mod network;
pub mod prelude;

pub use connection::{Connection, EnvelopeReceiver, EnvelopeSender};
pub use liveness::{LivenessRecord, LivenessSnapshot};
pub use network::{ClientRecord, Network, Role, Tables};
