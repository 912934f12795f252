//! efa-exporter-core — shared library for the efa-exporter tools.
//!
//! Provides:
//! - `collector` — sysfs discovery of Amazon EFA devices, ports and hardware
//!   counters, and the scrape entry point that turns them into samples
//! - `metrics` — metric descriptors, the sample sink and text exposition

pub mod collector;
pub mod metrics;
