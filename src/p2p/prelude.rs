pub use crate::{Error, Result};

pub use crate::peer_id::PeerId;

pub use crate::channel::{BoxedStream, Channel};
pub use crate::message::{Addressed, CorrelationId, Envelope, Payload};

pub use tokio::time::{timeout, Duration};

pub use std::time::Instant;

pub use std::collections::HashMap;
pub use std::net::SocketAddr;
pub use std::sync::Arc;

pub use crate::colored::Colorize;

pub use tracing::{debug, error, info, warn};
