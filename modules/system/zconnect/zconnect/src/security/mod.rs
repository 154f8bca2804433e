pub mod provider;

pub use provider::{AuthenticationProvider, ProviderInitError};
