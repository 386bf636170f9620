//! Process identity: `{type, index, uuid}`.

use rollcall_core::error::{Result, RollcallError};

/// Immutable once allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    component_type: String,
    index: u32,
    uuid: String,
}

impl Identity {
    /// Derive a process-unique identity. The uuid is `"{index}-{token}"`
    /// where token is 16 random bytes, hex-encoded.
    pub fn allocate(component_type: &str, index: u32) -> Result<Self> {
        if component_type.trim().is_empty() {
            return Err(RollcallError::Config("type is required".into()));
        }
        let token: [u8; 16] = rand::random();
        Ok(Self {
            component_type: component_type.to_string(),
            index,
            uuid: format!("{index}-{}", hex::encode(token)),
        })
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn uuid_is_prefixed_by_index() {
        let id = Identity::allocate("router", 5).unwrap();
        assert!(id.uuid().starts_with("5-"));
        assert_eq!(id.uuid().len(), "5-".len() + 32);
        assert_eq!(id.component_type(), "router");
        assert_eq!(id.index(), 5);
    }

    #[test]
    fn uuids_differ_between_allocations() {
        let a = Identity::allocate("t", 0).unwrap();
        let b = Identity::allocate("t", 0).unwrap();
        assert_ne!(a.uuid(), b.uuid());
    }

    #[test]
    fn empty_type_is_a_config_error() {
        let err = Identity::allocate("  ", 0).unwrap_err();
        assert_eq!(err.client_code().as_str(), "CONFIG");
    }
}
