//! Collector Layer
//!
//! Wrappers around external statistics tools. Each selected source gets one
//! [`CollectorAdapter`], which owns the tool's process group and raw output
//! file. The [`CollectorRegistry`] fans lifecycle calls out over the selected
//! adapters and applies the partial-failure policy.
//!
//! # Architecture
//!
//! - [`ToolProfile`]: per-source command line, markers, and stop signal
//! - [`Properties`]: typed property bag shared by every adapter
//! - [`CollectorAdapter`]: configure / start / end / save / validate
//! - [`CollectorRegistry`]: selection, property fan-out, failed-set
//!
//! # Example
//!
//! ```rust,no_run
//! use stc_agent::collector::CollectorRegistry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = CollectorRegistry::new();
//! registry.create("ipmi-inband")?;
//! registry.set_property("*", "outdir", "/var/tmp/stats")?;
//! registry.set_property("ipmi-inband", "interval", "1")?;
//! registry.configure().await?;
//! registry.start().await?;
//! // ... workload runs ...
//! registry.stop().await?;
//! # Ok(())
//! # }
//! ```

mod acpower;
mod adapter;
mod frequency;
mod ipmi;
mod property;
mod registry;
mod source;
mod stale;
mod traits;

pub use adapter::CollectorAdapter;
pub use ipmi::IPMI_HEADER_PREFIX;
pub use property::{Properties, PropertyKind, PropertyValue};
pub use registry::{CollectorRegistry, Method, RegistryError, WILDCARD};
pub use source::{Source, parse_selection};
pub use traits::{CollectorError, DEFAULT_EXIT_TIMEOUT, ToolProfile};
