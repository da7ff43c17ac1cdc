//! Azure Blob Storage client
//!
//! Talks to the Blob service REST API directly: Put Blob, Delete Blob,
//! Get Blob Properties and List Blobs, authorized with either a SharedKey
//! signature or a SAS token.

pub mod client;
pub mod objects;
pub mod provider;
pub mod request;
pub mod signer;

pub use provider::AzureBlobStore;
