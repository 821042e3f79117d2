pub mod auth;
pub mod credentials;

pub use auth::{AuthStep, Authenticator};
pub use credentials::CredentialStore;
