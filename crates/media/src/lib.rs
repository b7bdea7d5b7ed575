//! Media side of the pipeline: float pixel buffers to PNG payloads, and the
//! output store that names and persists them.

pub mod encode;
pub mod error;
pub mod store;

pub use {
    encode::{EncodedImage, PNG_MIME_TYPE, PixelBuffer, PngMetadata, encode_png},
    error::{Error, Result},
    store::{ImageStore, OutputDir, SaveTarget, SavedImage, StorageClass},
};
