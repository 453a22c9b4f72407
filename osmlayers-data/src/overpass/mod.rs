//! Overpass API implementation of [`osmlayers_core::TagQuery`].
//!
//! A [`TagFilter`](osmlayers_core::TagFilter) is compiled to Overpass QL
//! restricted to the boundary polygon, the JSON answer is assembled into
//! geometries and anything not intersecting the exact boundary is dropped.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use geo::{Geometry, polygon};
//! use osmlayers_core::{TagFilter, TagQuery, find_layer};
//! use osmlayers_data::{OverpassClient, OverpassConfig};
//!
//! let config = OverpassConfig::default().with_timeout(Duration::from_secs(300));
//! let client = OverpassClient::with_config(config)?;
//! let area = Geometry::Polygon(polygon![
//!     (x: 36.7, y: -1.4), (x: 37.0, y: -1.4), (x: 37.0, y: -1.2), (x: 36.7, y: -1.2)
//! ]);
//! let banks = find_layer("bank").expect("bank layer");
//! let table = client.query(&area, &banks.filter)?;
//! println!("{} banks", table.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod client;
mod config;
mod elements;
mod ql;
mod response;

pub use client::{ClientBuildError, OverpassClient};
pub use config::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, OverpassConfig, QuerySettings};
