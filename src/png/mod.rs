//! PNG decoding and encoding.
//!
//! The decoder handles every standard color type at bit depths 1, 2, 4, 8
//! and 16, both interlace modes, and validates the CRC of every chunk it
//! reads. Sub-8-bit greyscale widens through the synthesized grey ramp,
//! 16-bit samples fold to 8 bits; the decoder always produces the narrowest
//! pixel type that losslessly represents the file.
//!
//! The encoder writes 8-bit greyscale, RGB and RGBA images as
//! non-interlaced, filter-0 scanlines compressed into a single IDAT.

pub mod adam7;
pub mod bit_depth;
pub mod chunk;
pub mod crc32;
pub mod filter;

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::color::{Luma, LumaA, Pixel, Rgb, Rgba};
use crate::error::{Error, Result};
use crate::image::{DynamicImage, FromDynamic, Image};
use bit_depth::{fold_16_to_8, grey_level_to_8, unpack_scanline};
use chunk::{write_chunk, ChunkReader};
use filter::{unfilter_scanline, FilterType};

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Dimension cap shared by decoder and encoder; bounds memory against
/// decompression bombs.
const MAX_DIMENSION: u32 = 1 << 24;

/// Color type field of the IHDR chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorKind {
    Grey,
    Rgb,
    Palette,
    GreyAlpha,
    Rgba,
}

impl ColorKind {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(ColorKind::Grey),
            2 => Ok(ColorKind::Rgb),
            3 => Ok(ColorKind::Palette),
            4 => Ok(ColorKind::GreyAlpha),
            6 => Ok(ColorKind::Rgba),
            other => Err(Error::MalformedStream(format!(
                "invalid color type {other}"
            ))),
        }
    }

    /// Samples per pixel in the encoded scanlines.
    fn sample_count(self) -> usize {
        match self {
            ColorKind::Grey | ColorKind::Palette => 1,
            ColorKind::GreyAlpha => 2,
            ColorKind::Rgb => 3,
            ColorKind::Rgba => 4,
        }
    }

    /// The allowed (color type, bit depth) matrix.
    fn allows_depth(self, depth: u8) -> bool {
        match self {
            ColorKind::Grey => matches!(depth, 1 | 2 | 4 | 8 | 16),
            ColorKind::Palette => matches!(depth, 1 | 2 | 4 | 8),
            ColorKind::Rgb | ColorKind::GreyAlpha | ColorKind::Rgba => matches!(depth, 8 | 16),
        }
    }
}

#[derive(Debug)]
struct Ihdr {
    width: u32,
    height: u32,
    bit_depth: u8,
    color: ColorKind,
    interlaced: bool,
}

fn parse_ihdr(data: &[u8]) -> Result<Ihdr> {
    if data.len() != 13 {
        return Err(Error::MalformedStream(format!(
            "IHDR length {} (expected 13)",
            data.len()
        )));
    }

    let width = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let height = u32::from_be_bytes(data[4..8].try_into().unwrap());
    let bit_depth = data[8];
    let color = ColorKind::from_byte(data[9])?;
    let compression = data[10];
    let filter_method = data[11];
    let interlace = data[12];

    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::ImageTooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }
    if !color.allows_depth(bit_depth) {
        return Err(Error::MalformedStream(format!(
            "bit depth {bit_depth} invalid for color type {color:?}"
        )));
    }
    if compression != 0 {
        return Err(Error::MalformedStream(format!(
            "unknown compression method {compression}"
        )));
    }
    if filter_method != 0 {
        return Err(Error::MalformedStream(format!(
            "unknown filter method {filter_method}"
        )));
    }
    let interlaced = match interlace {
        0 => false,
        1 => true,
        other => {
            return Err(Error::MalformedStream(format!(
                "unknown interlace method {other}"
            )))
        }
    };

    Ok(Ihdr {
        width,
        height,
        bit_depth,
        color,
        interlaced,
    })
}

/// Decode a PNG, returning the narrowest pixel type that represents the file
/// without loss.
pub fn decode_png(data: &[u8]) -> Result<DynamicImage> {
    if data.len() < 8 || data[..8] != PNG_SIGNATURE {
        return Err(Error::InvalidSignature);
    }

    let mut reader = ChunkReader::new(&data[8..]);

    let first = reader.next_chunk()?;
    if &first.kind != b"IHDR" {
        return Err(Error::MalformedStream(
            "first chunk is not IHDR".to_string(),
        ));
    }
    let ihdr = parse_ihdr(first.data)?;
    log::debug!(
        "PNG {}x{} depth {} {:?} interlaced={}",
        ihdr.width,
        ihdr.height,
        ihdr.bit_depth,
        ihdr.color,
        ihdr.interlaced
    );

    let mut palette: Option<Vec<Rgb<u8>>> = None;
    let mut idat = Vec::new();

    loop {
        let chunk = reader.next_chunk()?;
        match &chunk.kind {
            b"PLTE" => {
                if chunk.data.len() % 3 != 0 || chunk.data.len() / 3 > 256 {
                    return Err(Error::MalformedStream(format!(
                        "PLTE length {}",
                        chunk.data.len()
                    )));
                }
                palette = Some(
                    chunk
                        .data
                        .chunks_exact(3)
                        .map(|c| Rgb([c[0], c[1], c[2]]))
                        .collect(),
                );
            }
            b"IDAT" => idat.extend_from_slice(chunk.data),
            b"IEND" => break,
            b"IHDR" => {
                return Err(Error::MalformedStream("duplicate IHDR".to_string()));
            }
            _ => {} // ancillary chunk, CRC already verified
        }
    }

    // Smallest possible zlib stream: 2-byte header plus Adler-32.
    if idat.len() < 6 {
        return Err(Error::Truncated);
    }

    let mut inflated = Vec::new();
    ZlibDecoder::new(idat.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::MalformedStream(format!("zlib: {e}")),
        })?;

    let samples = reconstruct_samples(&ihdr, &inflated)?;
    finalize_image(&ihdr, samples, palette)
}

/// Decode a PNG into a specific pixel type, promoting losslessly if needed.
pub fn decode_png_as<P: FromDynamic>(data: &[u8]) -> Result<Image<P>> {
    decode_png(data)?.into_image()
}

/// Run filter reconstruction over every pass and collect all samples into a
/// `width * height * sample_count` grid in raster order.
fn reconstruct_samples(ihdr: &Ihdr, inflated: &[u8]) -> Result<Vec<u16>> {
    let samples = ihdr.color.sample_count();
    let (w, h) = (ihdr.width as usize, ihdr.height as usize);
    let mut grid = vec![0u16; w * h * samples];
    let mut pos = 0usize;

    if ihdr.interlaced {
        for pass in 0..adam7::PASS_COUNT {
            let (pw, ph) = adam7::pass_dimensions(pass, ihdr.width, ihdr.height);
            reconstruct_pass(inflated, &mut pos, pw, ph, ihdr.bit_depth, samples, |row, line| {
                for col in 0..pw {
                    let (x, y) = adam7::sample_position(pass, col, row);
                    let dst = (y as usize * w + x as usize) * samples;
                    let src = col as usize * samples;
                    grid[dst..dst + samples].copy_from_slice(&line[src..src + samples]);
                }
            })?;
        }
    } else {
        reconstruct_pass(
            inflated,
            &mut pos,
            ihdr.width,
            ihdr.height,
            ihdr.bit_depth,
            samples,
            |row, line| {
                let dst = row as usize * w * samples;
                grid[dst..dst + w * samples].copy_from_slice(line);
            },
        )?;
    }

    Ok(grid)
}

/// Reconstruct one pass worth of scanlines, handing each completed line of
/// unpacked samples to `write_row`. Passes with a zero dimension consume no
/// input.
fn reconstruct_pass(
    inflated: &[u8],
    pos: &mut usize,
    pass_w: u32,
    pass_h: u32,
    depth: u8,
    samples: usize,
    mut write_row: impl FnMut(u32, &[u16]),
) -> Result<()> {
    if pass_w == 0 || pass_h == 0 {
        return Ok(());
    }

    let bits_per_pixel = samples * depth as usize;
    let scanline_bytes = (pass_w as usize * bits_per_pixel).div_ceil(8);
    let stride = (bits_per_pixel / 8).max(1);

    let mut current = vec![0u8; scanline_bytes];
    let mut previous = vec![0u8; scanline_bytes];
    let mut line = Vec::with_capacity(pass_w as usize * samples);

    for row in 0..pass_h {
        let Some(&filter_byte) = inflated.get(*pos) else {
            return Err(Error::Truncated);
        };
        *pos += 1;
        let filter = FilterType::from_byte(filter_byte)?;

        let end = *pos + scanline_bytes;
        if end > inflated.len() {
            return Err(Error::Truncated);
        }
        current.copy_from_slice(&inflated[*pos..end]);
        *pos = end;

        unfilter_scanline(filter, &mut current, &previous, stride);

        line.clear();
        unpack_scanline(&current, depth, pass_w as usize * samples, &mut line);
        write_row(row, &line);

        std::mem::swap(&mut current, &mut previous);
    }

    Ok(())
}

/// Map the reconstructed sample grid to the output pixel type.
fn finalize_image(
    ihdr: &Ihdr,
    samples: Vec<u16>,
    palette: Option<Vec<Rgb<u8>>>,
) -> Result<DynamicImage> {
    let (w, h) = (ihdr.width, ihdr.height);

    match ihdr.color {
        ColorKind::Grey => {
            let data: Vec<u8> = match ihdr.bit_depth {
                8 => samples.into_iter().map(|s| s as u8).collect(),
                16 => samples.into_iter().map(fold_16_to_8).collect(),
                depth => samples
                    .into_iter()
                    .map(|s| grey_level_to_8(s, depth))
                    .collect(),
            };
            Ok(DynamicImage::Luma8(Image::<Luma<u8>>::from_raw(w, h, data)?))
        }
        ColorKind::GreyAlpha => {
            let data: Vec<u8> = if ihdr.bit_depth == 16 {
                samples.into_iter().map(fold_16_to_8).collect()
            } else {
                samples.into_iter().map(|s| s as u8).collect()
            };
            Ok(DynamicImage::LumaA8(Image::<LumaA<u8>>::from_raw(
                w, h, data,
            )?))
        }
        ColorKind::Rgb => {
            let data: Vec<u8> = if ihdr.bit_depth == 16 {
                samples.into_iter().map(fold_16_to_8).collect()
            } else {
                samples.into_iter().map(|s| s as u8).collect()
            };
            Ok(DynamicImage::Rgb8(Image::<Rgb<u8>>::from_raw(w, h, data)?))
        }
        ColorKind::Rgba => {
            let data: Vec<u8> = if ihdr.bit_depth == 16 {
                samples.into_iter().map(fold_16_to_8).collect()
            } else {
                samples.into_iter().map(|s| s as u8).collect()
            };
            Ok(DynamicImage::Rgba8(Image::<Rgba<u8>>::from_raw(w, h, data)?))
        }
        ColorKind::Palette => {
            let palette = palette.ok_or(Error::MissingPalette)?;
            let mut data = Vec::with_capacity(samples.len() * 3);
            for index in samples {
                let entry = palette.get(index as usize).ok_or_else(|| {
                    Error::MalformedStream(format!("palette index {index} out of range"))
                })?;
                data.extend_from_slice(&entry.0);
            }
            Ok(DynamicImage::Rgb8(Image::<Rgb<u8>>::from_raw(w, h, data)?))
        }
    }
}

/// PNG encoding options.
#[derive(Debug, Clone, Copy)]
pub struct PngOptions {
    /// DEFLATE compression level, clamped to 1..=9.
    pub compression_level: u8,
}

impl Default for PngOptions {
    fn default() -> Self {
        PngOptions {
            compression_level: 6,
        }
    }
}

impl PngOptions {
    pub fn builder() -> PngOptionsBuilder {
        PngOptionsBuilder::default()
    }
}

/// Builder for [`PngOptions`].
#[derive(Debug, Clone, Default)]
pub struct PngOptionsBuilder {
    options: PngOptions,
}

impl PngOptionsBuilder {
    pub fn compression_level(mut self, level: u8) -> Self {
        self.options.compression_level = level;
        self
    }

    #[must_use]
    pub fn build(self) -> PngOptions {
        self.options
    }
}

/// Pixel types the PNG encoder accepts.
pub trait PngEncodable: Pixel<Subpixel = u8> {
    /// IHDR color type byte for this pixel layout.
    const COLOR_TYPE: u8;
}

impl PngEncodable for Luma<u8> {
    const COLOR_TYPE: u8 = 0;
}

impl PngEncodable for Rgb<u8> {
    const COLOR_TYPE: u8 = 2;
}

impl PngEncodable for Rgba<u8> {
    const COLOR_TYPE: u8 = 6;
}

/// Encode an image as a non-interlaced 8-bit PNG.
pub fn encode_png<P: PngEncodable>(image: &Image<P>) -> Result<Vec<u8>> {
    encode_png_with_options(image, &PngOptions::default())
}

/// Encode with explicit options.
pub fn encode_png_with_options<P: PngEncodable>(
    image: &Image<P>,
    options: &PngOptions,
) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    encode_png_into(&mut output, image, options)?;
    Ok(output)
}

/// Encode into a caller-provided buffer, clearing it first.
pub fn encode_png_into<P: PngEncodable>(
    output: &mut Vec<u8>,
    image: &Image<P>,
    options: &PngOptions,
) -> Result<()> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::ImageTooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }

    output.clear();
    output.reserve(image.as_raw().len() / 2 + 256);
    output.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(P::COLOR_TYPE);
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // no interlace
    write_chunk(output, b"IHDR", &ihdr);

    // Filter 0 for every scanline.
    let raw = image.as_raw();
    let row_bytes = width as usize * P::CHANNELS;
    let mut filtered = Vec::with_capacity(height as usize * (row_bytes + 1));
    for row in raw.chunks_exact(row_bytes) {
        filtered.push(0);
        filtered.extend_from_slice(row);
    }

    let level = options.compression_level.clamp(1, 9);
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level as u32));
    encoder
        .write_all(&filtered)
        .expect("write to in-memory buffer");
    let compressed = encoder.finish().expect("write to in-memory buffer");
    write_chunk(output, b"IDAT", &compressed);

    write_chunk(output, b"IEND", &[]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Luma, Rgb, Rgba};

    fn encode_chunks(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        for (kind, data) in chunks {
            write_chunk(&mut out, kind, data);
        }
        out
    }

    fn ihdr_bytes(w: u32, h: u32, depth: u8, color: u8, interlace: u8) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&w.to_be_bytes());
        data.extend_from_slice(&h.to_be_bytes());
        data.extend_from_slice(&[depth, color, 0, 0, interlace]);
        data
    }

    fn deflate(raw: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn rejects_bad_signature() {
        assert_eq!(decode_png(b"not a png at all"), Err(Error::InvalidSignature));
        assert_eq!(decode_png(&[]), Err(Error::InvalidSignature));
    }

    #[test]
    fn rejects_missing_ihdr() {
        let bytes = encode_chunks(&[(b"IEND", vec![])]);
        assert!(matches!(
            decode_png(&bytes),
            Err(Error::MalformedStream(_))
        ));
    }

    #[test]
    fn rejects_bad_depth_for_color_type() {
        let bytes = encode_chunks(&[(b"IHDR", ihdr_bytes(1, 1, 4, 2, 0)), (b"IEND", vec![])]);
        assert!(matches!(decode_png(&bytes), Err(Error::MalformedStream(_))));
    }

    #[test]
    fn rejects_zero_dimensions() {
        let bytes = encode_chunks(&[(b"IHDR", ihdr_bytes(0, 1, 8, 0, 0)), (b"IEND", vec![])]);
        assert!(matches!(
            decode_png(&bytes),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn rejects_corrupt_crc() {
        let img: Image<Rgb<u8>> = Image::generate(2, 2, |x, y| Rgb([x as u8, y as u8, 0]));
        let mut bytes = encode_png(&img).unwrap();
        // Flip a bit inside the IHDR payload.
        bytes[16] ^= 1;
        assert_eq!(
            decode_png(&bytes),
            Err(Error::CrcMismatch { chunk: *b"IHDR" })
        );
    }

    #[test]
    fn rejects_missing_palette() {
        let raw = [0u8, 0]; // one filter byte + one index byte
        let bytes = encode_chunks(&[
            (b"IHDR", ihdr_bytes(1, 1, 8, 3, 0)),
            (b"IDAT", deflate(&raw)),
            (b"IEND", vec![]),
        ]);
        assert_eq!(decode_png(&bytes), Err(Error::MissingPalette));
    }

    #[test]
    fn rejects_invalid_filter_byte() {
        let raw = [7u8, 42];
        let bytes = encode_chunks(&[
            (b"IHDR", ihdr_bytes(1, 1, 8, 0, 0)),
            (b"IDAT", deflate(&raw)),
            (b"IEND", vec![]),
        ]);
        assert_eq!(decode_png(&bytes), Err(Error::InvalidFilter(7)));
    }

    #[test]
    fn truncated_scan_data_reports_truncated() {
        let raw = [0u8, 1, 2]; // 2x2 grey needs 2 rows of 1+2 bytes
        let bytes = encode_chunks(&[
            (b"IHDR", ihdr_bytes(2, 2, 8, 0, 0)),
            (b"IDAT", deflate(&raw)),
            (b"IEND", vec![]),
        ]);
        assert_eq!(decode_png(&bytes), Err(Error::Truncated));
    }

    #[test]
    fn chunks_after_iend_are_ignored() {
        let img: Image<Luma<u8>> = Image::generate(2, 1, |x, _| Luma([x as u8 * 80]));
        let mut bytes = encode_png(&img).unwrap();
        bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(decode_png(&bytes).is_ok());
    }

    #[test]
    fn roundtrip_grey() {
        let img: Image<Luma<u8>> = Image::generate(5, 3, |x, y| Luma([(x * 40 + y * 7) as u8]));
        let decoded = decode_png_as::<Luma<u8>>(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn roundtrip_rgb() {
        let img: Image<Rgb<u8>> =
            Image::generate(4, 4, |x, y| Rgb([x as u8 * 60, y as u8 * 60, 200]));
        let decoded = decode_png_as::<Rgb<u8>>(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn roundtrip_rgba() {
        let img: Image<Rgba<u8>> =
            Image::generate(3, 5, |x, y| Rgba([x as u8, y as u8, 128, 255 - x as u8]));
        let decoded = decode_png_as::<Rgba<u8>>(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn decode_as_promotes_grey_to_rgba() {
        let img: Image<Luma<u8>> = Image::generate(2, 2, |x, y| Luma([(x + y) as u8 * 90]));
        let rgba = decode_png_as::<Rgba<u8>>(&encode_png(&img).unwrap()).unwrap();
        assert_eq!(rgba.pixel_at(1, 1), Rgba([180, 180, 180, 255]));
    }

    #[test]
    fn decode_as_rejects_narrowing() {
        let img: Image<Rgba<u8>> = Image::generate(2, 2, |_, _| Rgba([1, 2, 3, 4]));
        let result = decode_png_as::<Luma<u8>>(&encode_png(&img).unwrap());
        assert!(matches!(
            result,
            Err(Error::IncompatiblePromotion { .. })
        ));
    }

    #[test]
    fn palette_decode_expands_to_rgb() {
        // 2x1, depth 8 palette: indices 1, 0.
        let raw = [0u8, 1, 0];
        let plte = vec![10, 20, 30, 200, 210, 220];
        let bytes = encode_chunks(&[
            (b"IHDR", ihdr_bytes(2, 1, 8, 3, 0)),
            (b"PLTE", plte),
            (b"IDAT", deflate(&raw)),
            (b"IEND", vec![]),
        ]);
        let decoded = decode_png_as::<Rgb<u8>>(&bytes).unwrap();
        assert_eq!(decoded.pixel_at(0, 0), Rgb([200, 210, 220]));
        assert_eq!(decoded.pixel_at(1, 0), Rgb([10, 20, 30]));
    }

    #[test]
    fn palette_index_out_of_range_is_malformed() {
        let raw = [0u8, 5];
        let plte = vec![10, 20, 30];
        let bytes = encode_chunks(&[
            (b"IHDR", ihdr_bytes(1, 1, 8, 3, 0)),
            (b"PLTE", plte),
            (b"IDAT", deflate(&raw)),
            (b"IEND", vec![]),
        ]);
        assert!(matches!(decode_png(&bytes), Err(Error::MalformedStream(_))));
    }

    #[test]
    fn sixteen_bit_grey_folds_to_eight() {
        // One pixel, value 0xFFFF -> 255; and 0x0101 -> 1.
        for (hi, lo, expected) in [(0xFFu8, 0xFFu8, 255u8), (0x01, 0x01, 1)] {
            let raw = [0u8, hi, lo];
            let bytes = encode_chunks(&[
                (b"IHDR", ihdr_bytes(1, 1, 16, 0, 0)),
                (b"IDAT", deflate(&raw)),
                (b"IEND", vec![]),
            ]);
            let decoded = decode_png_as::<Luma<u8>>(&bytes).unwrap();
            assert_eq!(decoded.pixel_at(0, 0), Luma([expected]));
        }
    }

    #[test]
    fn adam7_roundtrips_against_sequential_encoding() {
        // Hand-build an interlaced 8x8 greyscale PNG and check it equals the
        // straight decode of the same pixels.
        let img: Image<Luma<u8>> =
            Image::generate(8, 8, |x, y| Luma([(y * 8 + x) as u8 * 3]));

        let mut raw = Vec::new();
        for pass in 0..adam7::PASS_COUNT {
            let (pw, ph) = adam7::pass_dimensions(pass, 8, 8);
            for row in 0..ph {
                raw.push(0u8); // filter byte
                for col in 0..pw {
                    let (x, y) = adam7::sample_position(pass, col, row);
                    raw.push(img.pixel_at(x, y).0[0]);
                }
            }
        }

        let bytes = encode_chunks(&[
            (b"IHDR", ihdr_bytes(8, 8, 8, 0, 1)),
            (b"IDAT", deflate(&raw)),
            (b"IEND", vec![]),
        ]);
        let decoded = decode_png_as::<Luma<u8>>(&bytes).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn encode_into_reuses_buffer() {
        let img: Image<Luma<u8>> = Image::generate(2, 2, |x, _| Luma([x as u8]));
        let mut buf = Vec::new();
        encode_png_into(&mut buf, &img, &PngOptions::default()).unwrap();
        let first = buf.clone();
        encode_png_into(&mut buf, &img, &PngOptions::default()).unwrap();
        assert_eq!(first, buf);
        assert_eq!(&buf[..8], &PNG_SIGNATURE);
    }
}
