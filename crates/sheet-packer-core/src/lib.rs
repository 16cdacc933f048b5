//! Core library for packing sprites into sheets.
//!
//! - Packers: MaxRects (BSSF/BLSF/BAF/BL/CP), Ordered rows, GridSearch,
//!   Growing binary tree, ShelfAllocator (etagere) and the Optimal meta-search
//! - Pipeline: `pack_images` packs decoded images and composites each sheet;
//!   `pack_layout` packs sizes only
//! - Data model is serde-serializable; JSON exporters live in `export`.
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use sheet_packer_core::{InputImage, PackerConfig, pack_images};
//! # fn main() -> anyhow::Result<()> {
//! let inputs = vec![
//!   InputImage { name: "a".into(), image: ImageReader::open("a.png")?.decode()? },
//!   InputImage { name: "b".into(), image: ImageReader::open("b.png")?.decode()? },
//! ];
//! let cfg = PackerConfig::builder().with_dimensions(1024, 1024).packer("Optimal", "Automatic").build();
//! let out = pack_images(inputs, cfg)?;
//! println!("sheets: {}", out.result.sheets.len());
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod source;

pub use compositing::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use source::*;

/// Convenience prelude for common types and functions.
/// Importing `sheet_packer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{PackerConfig, PackerConfigBuilder};
    pub use crate::error::{Result, SheetPackerError};
    pub use crate::model::{Frame, PackStats, Rect, Sheet, SourceSize};
    pub use crate::packer::optimal::{Combination, combinations};
    pub use crate::packer::{MethodProps, PackMethod, Packer, PackerKind, get_packer_by_type};
    pub use crate::source::{ImageSource, LayoutSource, SpriteSource};
    pub use crate::{
        InputImage, LayoutItem, PackOutput, PackResult, pack_images, pack_layout, pack_sprites,
    };
}
