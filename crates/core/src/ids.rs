use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the raw numeric value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Gateway`](crate::Gateway).
    GatewayId
);
define_id!(
    /// Identifier of a [`Stage`](crate::Stage).
    StageId
);
define_id!(
    /// Identifier of a [`Backend`](crate::Backend).
    BackendId
);
define_id!(
    /// Identifier of a public resource inside a resource version.
    ResourceId
);
define_id!(
    /// Identifier of an immutable [`ResourceVersion`](crate::ResourceVersion).
    ResourceVersionId
);
define_id!(
    /// Identifier of one publish attempt. Doubles as the publish id.
    ReleaseHistoryId
);
define_id!(
    /// Identifier of a ledger row. Negative values mark backfilled events.
    PublishEventId
);
define_id!(
    /// Identifier of a TLS certificate bound to a stage.
    CertificateId
);

impl PublishEventId {
    /// Whether this id was synthesized by the status reducer.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let id = StageId(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: StageId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn synthetic_event_ids_are_negative() {
        assert!(PublishEventId(-1).is_synthetic());
        assert!(!PublishEventId(7).is_synthetic());
    }
}
