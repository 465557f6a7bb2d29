pub mod types;

pub use types::{MediaKind, ParseKindError, ProviderKind, has_provider, has_provider_support};
