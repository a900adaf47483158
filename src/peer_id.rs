//! Logical peer identities
//!
//! See the documentation of [PeerId] for details.

use std::convert::TryInto;
use std::fmt;
use std::str::FromStr;

use base58check::{FromBase58Check, ToBase58Check};
use rand::{self, Rng};

/// Opaque identity of a logical participant
///
/// A `PeerId` is generated once at instance startup and stays stable for the lifetime of the
/// process, independently of the transport connections the peer uses. It keys both the
/// connection registry and the liveness table.
///
/// They are displayed using the Base58check format. The all-zeroes value is the *nil* identity
/// and stands for "no peer" (for example the recipient of an initial handshake).
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize, Default)]
pub struct PeerId([u8; 32]);

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_base58check(0))
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_base58check(0))
    }
}

impl FromStr for PeerId {
    type Err = crate::Error;

    /// Converts a base58check encoded string to bytes of a PeerId
    fn from_str(id_str: &str) -> Result<Self, crate::Error> {
        let (vsn, bytes) =
            id_str.from_base58check().map_err(|_| crate::Error::TryFromStringError)?;
        if vsn != 0 {
            return Err(crate::Error::TryFromStringError);
        }
        let bytes: [u8; 32] =
            bytes.as_slice().try_into().map_err(|_| crate::Error::TryFromStringError)?;
        Ok(PeerId(bytes))
    }
}

impl PeerId {
    /// Generate a random `PeerId`
    pub fn generate() -> PeerId {
        let mut rng = rand::thread_rng();
        let v: [u8; 32] = rng.gen();
        PeerId(v)
    }

    /// The nil identity.
    pub fn nil() -> PeerId {
        PeerId([0u8; 32])
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Shortened form used in log lines.
    pub fn short(&self) -> String {
        let s = self.to_string();
        s.chars().take(6).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_and_not_nil() {
        let a = PeerId::generate();
        let b = PeerId::generate();
        assert_ne!(a, b);
        assert!(!a.is_nil());
        assert!(PeerId::nil().is_nil());
        assert_eq!(PeerId::default(), PeerId::nil());
    }

    #[test]
    fn parses_its_display_form() {
        let id = PeerId::generate();
        let parsed: PeerId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-an-id".parse::<PeerId>().is_err());
        assert_eq!(id.short().len(), 6);
        assert!(id.to_string().starts_with(&id.short()));
    }
}
