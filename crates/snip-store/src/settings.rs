use typed_builder::TypedBuilder;

/// Attempts made to find a free short code before giving up.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 16;

/// Tuning knobs of a [`UrlStore`](crate::UrlStore).
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreSettings {
    /// How many freshly generated codes may collide with existing ones
    /// before a create fails with `Exhausted`. Must be at least 1.
    #[builder(default = DEFAULT_MAX_CODE_ATTEMPTS)]
    pub max_code_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
