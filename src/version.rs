//! Wire protocol versioning, checked during the connection handshake.

/// Version of the envelope protocol spoken by this build.
pub const CURRENT_VERSION: u16 = 1;

/// Oldest remote version this build still understands.
pub const MIN_COMPATIBLE_VERSION: u16 = 1;

pub fn is_compatible(remote: u16) -> bool {
    remote >= MIN_COMPATIBLE_VERSION && remote <= CURRENT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_version_is_compatible() {
        assert!(is_compatible(CURRENT_VERSION));
        assert!(!is_compatible(CURRENT_VERSION + 1));
        assert!(!is_compatible(0));
    }
}
