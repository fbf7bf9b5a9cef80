//! Credential handling.
//!
//! SSRF protection lives with the fetcher trait as
//! [`UrlValidator`](crate::traits::fetcher::UrlValidator).

pub mod credentials;

pub use credentials::SecretString;
