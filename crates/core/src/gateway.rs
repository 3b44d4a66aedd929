use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::GatewayId;

static GATEWAY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]{2,29}$")
        .expect("gateway name regex is valid")
});

/// Whether a gateway (or stage) currently serves traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    #[default]
    Inactive,
    Active,
}

impl ActivationStatus {
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// A tenant boundary owning stages, resources, and releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: GatewayId,
    /// Globally unique, immutable after creation.
    pub name: String,
    #[serde(default)]
    pub status: ActivationStatus,
}

impl Gateway {
    pub fn new(id: GatewayId, name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_gateway_name(&name)?;
        Ok(Self {
            id,
            name,
            status: ActivationStatus::Active,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Gateway names are lowercase, 3-30 chars, and start with a letter.
///
/// The restriction also guarantees a gateway never collides with the `-`
/// placeholder used by the global registry prefix.
pub fn validate_gateway_name(name: &str) -> Result<(), ValidationError> {
    if GATEWAY_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidGatewayName(name.to_owned()))
    }
}
