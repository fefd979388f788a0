//! # imago
//!
//! PNG and JPEG codecs over a statically-typed pixel model, written entirely
//! in Rust.
//!
//! - **Pixels**: fixed-layout pixel types (`Luma`, `LumaA`, `Rgb`, `Rgba`,
//!   `YCbCr` over `u8`/`f32`) with compile-time channel counts, lossless
//!   promotion between them, and RGB <-> YCbCr conversion.
//! - **PNG**: decoder for all standard color types at depths 1/2/4/8/16 with
//!   Adam7 de-interlacing and per-chunk CRC validation; encoder for 8-bit
//!   greyscale, RGB and RGBA.
//! - **JPEG**: baseline sequential decoder (Huffman coding, chroma
//!   subsampling, restart intervals) and a 4:2:0 encoder with
//!   quality-scaled Annex K tables.
//!
//! ## Quickstart
//!
//! ```rust
//! use imago::{decode_png, encode_png, Image, Rgb};
//!
//! # fn main() -> imago::Result<()> {
//! let img: Image<Rgb<u8>> = Image::generate(2, 2, |x, y| {
//!     Rgb([x as u8 * 255, y as u8 * 255, 0])
//! });
//! let bytes = encode_png(&img)?;
//! let decoded = decode_png(&bytes)?;
//! assert_eq!(decoded.width(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Typed decoding
//!
//! Format-agnostic decoding returns a [`DynamicImage`]; when the wanted
//! pixel type is known up front, [`decode_png_as`] promotes to it (and fails
//! on lossy requests):
//!
//! ```rust
//! use imago::{decode_png_as, encode_png, Image, Luma, Rgba};
//!
//! # fn main() -> imago::Result<()> {
//! let grey: Image<Luma<u8>> = Image::generate(4, 4, |x, _| Luma([x as u8 * 60]));
//! let bytes = encode_png(&grey)?;
//! let rgba = decode_png_as::<Rgba<u8>>(&bytes)?; // Y8 widens losslessly
//! assert_eq!(rgba.pixel_at(1, 0), Rgba([60, 60, 60, 255]));
//! # Ok(())
//! # }
//! ```
//!
//! ## JPEG
//!
//! The JPEG surface works in the codec's native color space: the decoder
//! yields `Image<YCbCr<u8>>` (or `Image<Luma<u8>>` for greyscale scans), and
//! the encoder takes the same.
//!
//! ```rust
//! use imago::{decode_jpeg, encode_jpeg, Image, YCbCr};
//!
//! # fn main() -> imago::Result<()> {
//! let img: Image<YCbCr<u8>> = Image::generate(16, 16, |_, _| YCbCr([128, 128, 128]));
//! let bytes = encode_jpeg(&img, 85)?;
//! let decoded = decode_jpeg(&bytes)?;
//! assert_eq!((decoded.width(), decoded.height()), (16, 16));
//! # Ok(())
//! # }
//! ```
//!
//! Decoding owns no process-wide state; separate calls may run freely on
//! separate threads. The shared zig-zag, Huffman and color tables are
//! immutable.

#![forbid(unsafe_code)]

pub mod bits;
pub mod color;
pub mod error;
pub mod image;
pub mod jpeg;
pub mod png;

pub use color::{rgb_to_ycbcr, ycbcr_to_rgb, Luma, LumaA, Pixel, Primitive, Promote, Rgb, Rgba, YCbCr};
pub use error::{Error, Result};
pub use image::{DynamicImage, FromDynamic, Image};
pub use jpeg::{decode_jpeg, encode_jpeg, encode_jpeg_gray, encode_jpeg_with_options, JpegOptions};
pub use png::{decode_png, decode_png_as, encode_png, encode_png_with_options, PngOptions};
