use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetPackerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid sheet dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown packer: {0}")]
    UnknownPacker(String),
    #[error("Unknown method '{method}' for packer {packer}")]
    UnknownMethod { packer: &'static str, method: String },
    #[error(
        "Requested sheet size {width}x{height} is smaller than the minimum {min_width}x{min_height}"
    )]
    SizeTooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
    #[error("Nothing to pack")]
    Empty,
    #[error("{packer}/{method} could not place any of the {remaining} remaining rectangles")]
    Exhausted {
        packer: &'static str,
        method: String,
        remaining: usize,
    },
}

pub type Result<T> = std::result::Result<T, SheetPackerError>;
