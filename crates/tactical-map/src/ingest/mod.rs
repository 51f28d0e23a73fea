//! Input adapters for the batch build
//!
//! Everything that touches the filesystem or a wire format lives here; the
//! pipeline crate only ever sees in-memory trees and tables.

pub mod borders;
pub mod kml;
pub mod xml;
