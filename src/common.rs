//! Shared identifiers used across the codebase

/// Type-safe wrapper for a virtual client's index (0..N-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientId(pub u32);

impl ClientId {
    /// The client that performs the connectivity probe before the full launch
    pub const PROBE: ClientId = ClientId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ClientId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_client() {
        assert_eq!(ClientId::PROBE, ClientId::new(0));
        assert_ne!(ClientId::from(3), ClientId::PROBE);
        assert_eq!(ClientId::from(7).to_string(), "#7");
    }
}
