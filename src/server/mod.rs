// The server owns the connection registry and dispatches what its reader tasks receive.
// `router` forwards or handles each envelope, `heartbeat` keeps peers' liveness up to date.
pub mod application;
pub mod clock;
mod heartbeat;
pub mod node;
mod router;
mod server;
pub mod settings;


pub use application::*;
pub use clock::*;
pub use server::*;
pub use settings::*;
