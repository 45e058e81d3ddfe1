//! Provider adapters, one per vendor API.

mod http;

#[cfg(any(feature = "openai", feature = "azure_openai", feature = "meta"))]
pub mod openai_compatible;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "azure_openai")]
pub mod azure_openai;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "google")]
pub mod google;

#[cfg(feature = "meta")]
pub mod meta;

#[cfg(feature = "bedrock")]
pub mod aws;
