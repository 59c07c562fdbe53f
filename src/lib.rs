//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`provider-dropbox`, `core-runtime`, `core-metadata`).
//! Host applications can depend on `cloud-browser-workspace` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_metadata;
#[cfg(feature = "desktop-shims")]
pub use core_runtime;
#[cfg(feature = "desktop-shims")]
pub use provider_dropbox;
