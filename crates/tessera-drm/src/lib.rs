#![forbid(unsafe_code)]

//! Protected-content session strategy for tessera.
//!
//! A manifest may carry a [`ProtectionElement`]. Source assembly hands it to a
//! [`ProtectionHandler`], which may open a [`DrmSession`]. The default
//! [`DeferredProtection`] never opens one: session negotiation is not
//! available yet, and sources built from protected manifests are marked as
//! unnegotiated instead.

mod error;
mod protection;

pub use error::{DrmError, DrmResult};
pub use protection::{
    DeferredProtection, DrmSession, MediaDrmCallback, ProtectionElement, ProtectionHandler,
};
