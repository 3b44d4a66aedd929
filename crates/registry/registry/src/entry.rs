/// One serialized resource to be stored under a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Resource kind, used as the key segment before the id.
    pub kind: String,
    pub id: String,
    /// JSON payload.
    pub value: String,
}

impl RegistryEntry {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            value: value.into(),
        }
    }
}

/// A resource that could not be written after the retry budget was spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub key: String,
    pub error: String,
}
