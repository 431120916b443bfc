use uuid::Uuid;

/// Per-call context passed explicitly into every read; there is no ambient
/// session lookup anywhere in the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
}

impl RequestContext {
    pub fn new() -> Self {
        Self { correlation_id: Uuid::new_v4().to_string() }
    }

    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into() }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
