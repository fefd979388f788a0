//! Baseline JPEG decoding and encoding.
//!
//! The decoder implements sequential DCT with Huffman coding (SOF0): marker
//! parsing, quantization and Huffman table management, the byte-stuffed
//! entropy reader, per-MCU data unit decoding (differential DC, run-length
//! AC, dequantize, inverse zig-zag, IDCT), nearest-neighbor chroma
//! upsampling, and restart-interval re-synchronization.
//!
//! The encoder emits baseline sequential 4:2:0 YCbCr (or single-component
//! greyscale) with the Annex K tables scaled by a quality setting.

pub mod bit_reader;
pub mod dct;
pub mod huffman;
pub mod quantize;

use crate::bits::BitWriterMsb;
use crate::color::{Luma, YCbCr};
use crate::error::{Error, Result};
use crate::image::{DynamicImage, Image};
use bit_reader::BitReader;
use dct::{forward_dct, idct_8x8};
use huffman::{encode_block, HuffmanTables, HuffmanTree};
use quantize::{inverse_zigzag, QuantTables, ZIGZAG};

// Marker codes (the byte after 0xFF).
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOF0: u8 = 0xC0;
const DHT: u8 = 0xC4;
const DQT: u8 = 0xDB;
const DRI: u8 = 0xDD;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;

/// JPEG dimensions are 16-bit on the wire.
const MAX_DIMENSION: u32 = 65535;

/// Magnitude category of a coefficient: the number of bits needed to code it.
#[inline]
pub(crate) fn bits_of(value: i16) -> u8 {
    (16 - value.unsigned_abs().leading_zeros()) as u8
}

#[derive(Debug, Clone, Copy)]
struct Component {
    id: u8,
    h: usize,
    v: usize,
    quant: usize,
    dc_table: usize,
    ac_table: usize,
}

#[derive(Debug)]
struct Frame {
    width: usize,
    height: usize,
    components: Vec<Component>,
}

impl Frame {
    fn max_sampling(&self) -> (usize, usize) {
        let h = self.components.iter().map(|c| c.h).max().unwrap_or(1);
        let v = self.components.iter().map(|c| c.v).max().unwrap_or(1);
        (h, v)
    }
}

/// One component's padded sample plane during decoding.
struct Plane {
    width: usize,
    height: usize,
    samples: Vec<u8>,
}

impl Plane {
    fn new(width: usize, height: usize) -> Self {
        Plane {
            width,
            height,
            samples: vec![0; width * height],
        }
    }

    /// Copy a decoded 8x8 data unit to (x0, y0); writes past the plane edge
    /// are clipped.
    fn blit(&mut self, x0: usize, y0: usize, block: &[u8; 64]) {
        for (row, chunk) in block.chunks_exact(8).enumerate() {
            let y = y0 + row;
            if y >= self.height {
                break;
            }
            let copy = 8.min(self.width.saturating_sub(x0));
            let dst = y * self.width + x0;
            self.samples[dst..dst + copy].copy_from_slice(&chunk[..copy]);
        }
    }
}

/// Decode a baseline JPEG.
///
/// One-component scans produce [`DynamicImage::Luma8`], three-component
/// scans [`DynamicImage::YCbCr8`]; other counts fail with
/// [`Error::UnsupportedComponents`].
pub fn decode_jpeg(data: &[u8]) -> Result<DynamicImage> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
        return Err(Error::InvalidSignature);
    }

    let mut pos = 2usize;
    let mut quant: [Option<[u16; 64]>; 4] = [None; 4];
    let mut dc_trees: [Option<HuffmanTree>; 4] = [None, None, None, None];
    let mut ac_trees: [Option<HuffmanTree>; 4] = [None, None, None, None];
    let mut frame: Option<Frame> = None;
    let mut restart_interval = 0u16;

    loop {
        if data.get(pos) != Some(&0xFF) {
            return Err(Error::MalformedStream(format!(
                "expected marker at offset {pos}"
            )));
        }
        // Fill bytes before the marker code are legal padding.
        while data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        let Some(&marker) = data.get(pos + 1) else {
            return Err(Error::Truncated);
        };
        pos += 2;

        match marker {
            SOI => return Err(Error::MalformedStream("unexpected SOI".to_string())),
            EOI => {
                return Err(Error::MalformedStream(
                    "EOI before any scan data".to_string(),
                ))
            }
            0xD0..=0xD7 | 0x01 => {
                return Err(Error::MalformedStream(format!(
                    "standalone marker 0x{marker:02X} outside a scan"
                )))
            }
            _ => {}
        }

        // Everything else carries a big-endian length including itself.
        if pos + 2 > data.len() {
            return Err(Error::Truncated);
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if length < 2 {
            return Err(Error::MalformedStream(format!(
                "segment length {length} for marker 0x{marker:02X}"
            )));
        }
        if pos + length > data.len() {
            return Err(Error::Truncated);
        }
        let segment = &data[pos + 2..pos + length];

        match marker {
            SOF0 => {
                if frame.is_some() {
                    return Err(Error::MalformedStream("second frame header".to_string()));
                }
                frame = Some(parse_sof(segment)?);
            }
            // SOF1..SOF15 minus the table markers that share the range.
            0xC1..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                return Err(Error::UnsupportedFeature("non-baseline SOF"));
            }
            0xCC => return Err(Error::UnsupportedFeature("arithmetic coding")),
            DQT => parse_dqt(segment, &mut quant)?,
            DHT => parse_dht(segment, &mut dc_trees, &mut ac_trees)?,
            DRI => {
                if segment.len() != 2 {
                    return Err(Error::MalformedStream("DRI length".to_string()));
                }
                restart_interval = u16::from_be_bytes([segment[0], segment[1]]);
            }
            SOS => {
                let mut frame = frame
                    .ok_or_else(|| Error::MalformedStream("SOS before SOF".to_string()))?;
                let scan_order = parse_sos(segment, &mut frame.components)?;
                let scan = &data[pos + length..];
                return decode_scan(
                    &frame,
                    &scan_order,
                    scan,
                    &quant,
                    &dc_trees,
                    &ac_trees,
                    restart_interval,
                );
            }
            // APPn, JPGn, COM: skipped, but their length must frame correctly.
            0xE0..=0xEF | 0xF0..=0xFE => {}
            other => {
                return Err(Error::MalformedStream(format!(
                    "unexpected marker 0x{other:02X}"
                )))
            }
        }

        pos += length;
    }
}

fn parse_sof(segment: &[u8]) -> Result<Frame> {
    if segment.len() < 6 {
        return Err(Error::MalformedStream("SOF0 too short".to_string()));
    }
    let precision = segment[0];
    if precision != 8 {
        return Err(Error::UnsupportedFeature("sample precision other than 8"));
    }
    let height = u16::from_be_bytes([segment[1], segment[2]]) as usize;
    let width = u16::from_be_bytes([segment[3], segment[4]]) as usize;
    let count = segment[5];

    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions {
            width: width as u32,
            height: height as u32,
        });
    }
    if count != 1 && count != 3 {
        return Err(Error::UnsupportedComponents(count));
    }
    if segment.len() < 6 + count as usize * 3 {
        return Err(Error::MalformedStream("SOF0 component list".to_string()));
    }

    let mut components = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let base = 6 + i * 3;
        let id = segment[base];
        let (mut h, mut v) = (
            (segment[base + 1] >> 4) as usize,
            (segment[base + 1] & 0x0F) as usize,
        );
        let quant = segment[base + 2] as usize;
        if count == 1 {
            // A single-component frame has no MCU interleaving.
            h = 1;
            v = 1;
        }
        if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
            return Err(Error::MalformedStream(format!(
                "sampling factors {h}x{v} for component {id}"
            )));
        }
        if quant > 3 {
            return Err(Error::MalformedStream(format!(
                "quantization table id {quant}"
            )));
        }
        components.push(Component {
            id,
            h,
            v,
            quant,
            dc_table: 0,
            ac_table: 0,
        });
    }

    Ok(Frame {
        width,
        height,
        components,
    })
}

fn parse_dqt(segment: &[u8], tables: &mut [Option<[u16; 64]>; 4]) -> Result<()> {
    let mut pos = 0usize;
    while pos < segment.len() {
        let pq_tq = segment[pos];
        let precision = pq_tq >> 4;
        let dest = (pq_tq & 0x0F) as usize;
        pos += 1;
        if precision > 1 {
            return Err(Error::MalformedStream(format!(
                "quantization precision {precision}"
            )));
        }
        if dest > 3 {
            return Err(Error::MalformedStream(format!(
                "quantization table id {dest}"
            )));
        }

        let mut table = [0u16; 64];
        for entry in table.iter_mut() {
            if precision == 0 {
                let Some(&value) = segment.get(pos) else {
                    return Err(Error::Truncated);
                };
                *entry = value as u16;
                pos += 1;
            } else {
                let (Some(&hi), Some(&lo)) = (segment.get(pos), segment.get(pos + 1)) else {
                    return Err(Error::Truncated);
                };
                *entry = u16::from_be_bytes([hi, lo]);
                pos += 2;
            }
        }
        tables[dest] = Some(table);
    }
    Ok(())
}

fn parse_dht(
    segment: &[u8],
    dc_trees: &mut [Option<HuffmanTree>; 4],
    ac_trees: &mut [Option<HuffmanTree>; 4],
) -> Result<()> {
    let mut pos = 0usize;
    while pos < segment.len() {
        let tc_th = segment[pos];
        let class = tc_th >> 4;
        let dest = (tc_th & 0x0F) as usize;
        pos += 1;
        if class > 1 {
            return Err(Error::MalformedStream(format!("Huffman class {class}")));
        }
        if dest > 3 {
            return Err(Error::MalformedStream(format!("Huffman table id {dest}")));
        }
        if pos + 16 > segment.len() {
            return Err(Error::Truncated);
        }
        let mut counts = [0u8; 16];
        counts.copy_from_slice(&segment[pos..pos + 16]);
        pos += 16;

        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if pos + total > segment.len() {
            return Err(Error::Truncated);
        }
        let tree = HuffmanTree::build(&counts, &segment[pos..pos + total])?;
        pos += total;

        if class == 0 {
            dc_trees[dest] = Some(tree);
        } else {
            ac_trees[dest] = Some(tree);
        }
    }
    Ok(())
}

/// Parse the scan header: record each component's entropy table selections
/// and return the component indices in scan order.
fn parse_sos(segment: &[u8], components: &mut [Component]) -> Result<Vec<usize>> {
    if segment.is_empty() {
        return Err(Error::MalformedStream("empty scan header".to_string()));
    }
    let count = segment[0] as usize;
    if count != components.len() {
        return Err(Error::UnsupportedFeature("partial or multi-pass scans"));
    }
    if segment.len() < 1 + count * 2 + 3 {
        return Err(Error::MalformedStream("scan header too short".to_string()));
    }

    let mut scan_order = Vec::with_capacity(count);
    for i in 0..count {
        let id = segment[1 + i * 2];
        let tables = segment[2 + i * 2];
        let (dc_table, ac_table) = ((tables >> 4) as usize, (tables & 0x0F) as usize);
        if dc_table > 3 || ac_table > 3 {
            return Err(Error::MalformedStream(format!(
                "entropy table ids {dc_table}/{ac_table}"
            )));
        }
        let index = components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::MalformedStream(format!("scan references component {id}")))?;
        components[index].dc_table = dc_table;
        components[index].ac_table = ac_table;
        scan_order.push(index);
    }
    Ok(scan_order)
}

fn decode_scan(
    frame: &Frame,
    scan_order: &[usize],
    scan: &[u8],
    quant: &[Option<[u16; 64]>; 4],
    dc_trees: &[Option<HuffmanTree>; 4],
    ac_trees: &[Option<HuffmanTree>; 4],
    restart_interval: u16,
) -> Result<DynamicImage> {
    let (max_h, max_v) = frame.max_sampling();
    let (mcu_w, mcu_h) = (8 * max_h, 8 * max_v);
    let mcus_x = frame.width.div_ceil(mcu_w);
    let mcus_y = frame.height.div_ceil(mcu_h);

    let mut planes: Vec<Plane> = frame
        .components
        .iter()
        .map(|c| Plane::new(mcus_x * c.h * 8, mcus_y * c.v * 8))
        .collect();
    let mut dc_preds = vec![0i32; frame.components.len()];

    let mut reader = BitReader::new(scan);
    let mut rst_count = 0u32;
    let total_mcus = mcus_x * mcus_y;

    for mcu_index in 0..total_mcus {
        if restart_interval > 0 && mcu_index > 0 && mcu_index % restart_interval as usize == 0 {
            let found = reader.expect_restart()?;
            let expected = (rst_count & 7) as u8;
            if found != expected {
                log::warn!("restart marker RST{found} where RST{expected} was expected");
            }
            rst_count += 1;
            dc_preds.fill(0);
        }

        let (mcu_x, mcu_y) = (mcu_index % mcus_x, mcu_index / mcus_x);
        for &c in scan_order {
            let comp = &frame.components[c];
            for du_y in 0..comp.v {
                for du_x in 0..comp.h {
                    let block =
                        decode_data_unit(&mut reader, comp, quant, dc_trees, ac_trees, &mut dc_preds[c])?;
                    planes[c].blit(
                        (mcu_x * comp.h + du_x) * 8,
                        (mcu_y * comp.v + du_y) * 8,
                        &block,
                    );
                }
            }
        }
    }

    assemble_image(frame, &planes, max_h, max_v)
}

fn decode_data_unit(
    reader: &mut BitReader,
    comp: &Component,
    quant: &[Option<[u16; 64]>; 4],
    dc_trees: &[Option<HuffmanTree>; 4],
    ac_trees: &[Option<HuffmanTree>; 4],
    dc_pred: &mut i32,
) -> Result<[u8; 64]> {
    let table = quant[comp.quant]
        .as_ref()
        .ok_or_else(|| Error::MalformedStream(format!("missing quantization table {}", comp.quant)))?;
    let dc_tree = dc_trees[comp.dc_table]
        .as_ref()
        .ok_or_else(|| Error::MalformedStream(format!("missing DC table {}", comp.dc_table)))?;
    let ac_tree = ac_trees[comp.ac_table]
        .as_ref()
        .ok_or_else(|| Error::MalformedStream(format!("missing AC table {}", comp.ac_table)))?;

    let mut zz = [0i32; 64];

    // Differential DC.
    let ssss = dc_tree.decode(reader)?;
    if ssss > 15 {
        return Err(Error::MalformedStream(format!("DC category {ssss}")));
    }
    *dc_pred += reader.receive_extend(ssss)?;
    zz[0] = *dc_pred;

    // Run-length AC.
    let mut k = 1usize;
    while k < 64 {
        let symbol = ac_tree.decode(reader)?;
        if symbol == 0x00 {
            break; // end of block, rest stays zero
        }
        if symbol == 0xF0 {
            k += 16;
            if k > 64 {
                return Err(Error::InvalidAc);
            }
            continue;
        }
        let (run, size) = ((symbol >> 4) as usize, symbol & 0x0F);
        k += run;
        if k > 63 {
            return Err(Error::InvalidAc);
        }
        zz[k] = reader.receive_extend(size)?;
        k += 1;
    }

    // Dequantize in storage order, then back to natural order and transform.
    for (value, &q) in zz.iter_mut().zip(table.iter()) {
        *value *= q as i32;
    }
    let natural = inverse_zigzag(&zz);
    Ok(idct_8x8(&natural))
}

fn assemble_image(
    frame: &Frame,
    planes: &[Plane],
    max_h: usize,
    max_v: usize,
) -> Result<DynamicImage> {
    let (w, h) = (frame.width, frame.height);

    match frame.components.len() {
        1 => {
            let plane = &planes[0];
            let mut data = Vec::with_capacity(w * h);
            for y in 0..h {
                data.extend_from_slice(&plane.samples[y * plane.width..y * plane.width + w]);
            }
            Ok(DynamicImage::Luma8(Image::<Luma<u8>>::from_raw(
                w as u32, h as u32, data,
            )?))
        }
        3 => {
            let mut data = Vec::with_capacity(w * h * 3);
            for y in 0..h {
                for x in 0..w {
                    for (comp, plane) in frame.components.iter().zip(planes) {
                        // Nearest-neighbor downmap into the subsampled plane.
                        let sx = x * comp.h / max_h;
                        let sy = y * comp.v / max_v;
                        data.push(plane.samples[sy * plane.width + sx]);
                    }
                }
            }
            Ok(DynamicImage::YCbCr8(Image::<YCbCr<u8>>::from_raw(
                w as u32, h as u32, data,
            )?))
        }
        other => Err(Error::UnsupportedComponents(other as u8)),
    }
}

/// JPEG encoding options.
#[derive(Debug, Clone, Copy)]
pub struct JpegOptions {
    /// Quality 1..=100 (values outside are clamped).
    pub quality: u8,
    /// Restart interval in MCUs; `None` or `Some(0)` disables restarts.
    pub restart_interval: Option<u16>,
}

impl Default for JpegOptions {
    fn default() -> Self {
        JpegOptions {
            quality: 75,
            restart_interval: None,
        }
    }
}

impl JpegOptions {
    pub fn builder() -> JpegOptionsBuilder {
        JpegOptionsBuilder::default()
    }
}

/// Builder for [`JpegOptions`].
#[derive(Debug, Clone, Default)]
pub struct JpegOptionsBuilder {
    options: JpegOptions,
}

impl JpegOptionsBuilder {
    pub fn quality(mut self, quality: u8) -> Self {
        self.options.quality = quality;
        self
    }

    pub fn restart_interval(mut self, interval: Option<u16>) -> Self {
        self.options.restart_interval = interval;
        self
    }

    #[must_use]
    pub fn build(self) -> JpegOptions {
        self.options
    }
}

/// Encode a YCbCr image as baseline sequential 4:2:0 JPEG.
pub fn encode_jpeg(image: &Image<YCbCr<u8>>, quality: u8) -> Result<Vec<u8>> {
    encode_jpeg_with_options(
        image,
        &JpegOptions {
            quality,
            restart_interval: None,
        },
    )
}

/// Encode with explicit options.
pub fn encode_jpeg_with_options(
    image: &Image<YCbCr<u8>>,
    options: &JpegOptions,
) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    encode_jpeg_into(&mut output, image, options)?;
    Ok(output)
}

/// Encode into a caller-provided buffer, clearing it first.
pub fn encode_jpeg_into(
    output: &mut Vec<u8>,
    image: &Image<YCbCr<u8>>,
    options: &JpegOptions,
) -> Result<()> {
    validate_dimensions(image.width(), image.height())?;
    output.clear();

    let quant = QuantTables::with_quality(options.quality);
    let tables = HuffmanTables::default();
    let interval = options.restart_interval.filter(|&i| i > 0);

    write_soi(output);
    write_app0(output);
    write_dqt(output, &quant);
    write_sof0(output, image.width() as u16, image.height() as u16, false);
    write_dht(output);
    if let Some(interval) = interval {
        write_dri(output, interval);
    }
    write_sos(output, false);
    encode_color_scan(output, image, &quant, &tables, interval);
    write_eoi(output);
    Ok(())
}

/// Encode a greyscale image as a single-component baseline JPEG.
pub fn encode_jpeg_gray(image: &Image<Luma<u8>>, quality: u8) -> Result<Vec<u8>> {
    validate_dimensions(image.width(), image.height())?;
    let mut output = Vec::new();

    let quant = QuantTables::with_quality(quality);
    let tables = HuffmanTables::default();

    write_soi(&mut output);
    write_app0(&mut output);
    write_dqt(&mut output, &quant);
    write_sof0(&mut output, image.width() as u16, image.height() as u16, true);
    write_dht(&mut output);
    write_sos(&mut output, true);
    encode_gray_scan(&mut output, image, &quant, &tables);
    write_eoi(&mut output);
    Ok(output)
}

fn validate_dimensions(width: u32, height: u32) -> Result<()> {
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
    Ok(())
}

fn write_segment(output: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    output.extend_from_slice(&[0xFF, marker]);
    output.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    output.extend_from_slice(payload);
}

fn write_soi(output: &mut Vec<u8>) {
    output.extend_from_slice(&[0xFF, SOI]);
}

fn write_eoi(output: &mut Vec<u8>) {
    output.extend_from_slice(&[0xFF, EOI]);
}

fn write_app0(output: &mut Vec<u8>) {
    let mut payload = Vec::with_capacity(14);
    payload.extend_from_slice(b"JFIF\0");
    payload.extend_from_slice(&[1, 1]); // version 1.01
    payload.push(0); // aspect-ratio units
    payload.extend_from_slice(&1u16.to_be_bytes()); // x density
    payload.extend_from_slice(&1u16.to_be_bytes()); // y density
    payload.extend_from_slice(&[0, 0]); // no thumbnail
    write_segment(output, APP0, &payload);
}

fn write_dqt(output: &mut Vec<u8>, quant: &QuantTables) {
    let mut payload = Vec::with_capacity(65);
    payload.push(0x00); // 8-bit precision, table 0
    payload.extend_from_slice(&quant.luma);
    write_segment(output, DQT, &payload);

    payload.clear();
    payload.push(0x01); // table 1
    payload.extend_from_slice(&quant.chroma);
    write_segment(output, DQT, &payload);
}

fn write_sof0(output: &mut Vec<u8>, width: u16, height: u16, grayscale: bool) {
    let mut payload = Vec::new();
    payload.push(8); // sample precision
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&width.to_be_bytes());
    if grayscale {
        payload.push(1);
        payload.extend_from_slice(&[1, 0x11, 0]);
    } else {
        payload.push(3);
        payload.extend_from_slice(&[1, 0x22, 0]); // Y, 2x2 sampling, table 0
        payload.extend_from_slice(&[2, 0x11, 1]); // Cb
        payload.extend_from_slice(&[3, 0x11, 1]); // Cr
    }
    write_segment(output, SOF0, &payload);
}

fn write_dht(output: &mut Vec<u8>) {
    let mut table = |id: u8, bits: &[u8; 16], values: &[u8]| {
        let mut payload = Vec::with_capacity(17 + values.len());
        payload.push(id);
        payload.extend_from_slice(bits);
        payload.extend_from_slice(values);
        write_segment(output, DHT, &payload);
    };
    table(0x00, &huffman::DC_LUMA_BITS, &huffman::DC_LUMA_VALUES);
    table(0x01, &huffman::DC_CHROMA_BITS, &huffman::DC_CHROMA_VALUES);
    table(0x10, &huffman::AC_LUMA_BITS, &huffman::AC_LUMA_VALUES);
    table(0x11, &huffman::AC_CHROMA_BITS, &huffman::AC_CHROMA_VALUES);
}

fn write_dri(output: &mut Vec<u8>, interval: u16) {
    write_segment(output, DRI, &interval.to_be_bytes());
}

fn write_sos(output: &mut Vec<u8>, grayscale: bool) {
    let mut payload = Vec::new();
    if grayscale {
        payload.push(1);
        payload.extend_from_slice(&[1, 0x00]);
    } else {
        payload.push(3);
        payload.extend_from_slice(&[1, 0x00]); // Y: DC 0, AC 0
        payload.extend_from_slice(&[2, 0x11]); // Cb: DC 1, AC 1
        payload.extend_from_slice(&[3, 0x11]); // Cr
    }
    payload.extend_from_slice(&[0, 63, 0]); // full spectral range, no approximation
    write_segment(output, SOS, &payload);
}

/// Level-shifted sample fetch with edge replication.
#[inline]
fn sample_at(image: &Image<YCbCr<u8>>, x: usize, y: usize, channel: usize) -> f32 {
    let x = x.min(image.width() as usize - 1) as u32;
    let y = y.min(image.height() as usize - 1) as u32;
    image.pixel_at(x, y).0[channel] as f32
}

/// Extract one 16x16 MCU as four level-shifted Y blocks plus 2x2-averaged
/// Cb and Cr blocks.
fn extract_mcu_420(
    image: &Image<YCbCr<u8>>,
    mcu_x: usize,
    mcu_y: usize,
) -> ([[f32; 64]; 4], [f32; 64], [f32; 64]) {
    let mut y_blocks = [[0.0f32; 64]; 4];
    let mut cb = [0.0f32; 64];
    let mut cr = [0.0f32; 64];

    for by in 0..2 {
        for bx in 0..2 {
            let block = &mut y_blocks[by * 2 + bx];
            for dy in 0..8 {
                for dx in 0..8 {
                    let px = mcu_x + bx * 8 + dx;
                    let py = mcu_y + by * 8 + dy;
                    block[dy * 8 + dx] = sample_at(image, px, py, 0) - 128.0;

                    // Accumulate chroma at half resolution.
                    let cx = (bx * 8 + dx) / 2;
                    let cy = (by * 8 + dy) / 2;
                    cb[cy * 8 + cx] += sample_at(image, px, py, 1);
                    cr[cy * 8 + cx] += sample_at(image, px, py, 2);
                }
            }
        }
    }

    for i in 0..64 {
        cb[i] = cb[i] * 0.25 - 128.0;
        cr[i] = cr[i] * 0.25 - 128.0;
    }

    (y_blocks, cb, cr)
}

/// Forward DCT, zig-zag, quantize.
fn transform_block(block: &[f32; 64], table: &[u8; 64]) -> [i16; 64] {
    let dct = forward_dct(block);
    let zz: [f32; 64] = std::array::from_fn(|k| dct[ZIGZAG[k]]);
    quantize::quantize_block(&zz, table)
}

fn encode_color_scan(
    output: &mut Vec<u8>,
    image: &Image<YCbCr<u8>>,
    quant: &QuantTables,
    tables: &HuffmanTables,
    restart_interval: Option<u16>,
) {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mcus_x = width.div_ceil(16);
    let mcus_y = height.div_ceil(16);
    let total_mcus = mcus_x * mcus_y;

    let mut writer = BitWriterMsb::new();
    let (mut prev_y, mut prev_cb, mut prev_cr) = (0i16, 0i16, 0i16);
    let mut rst_index = 0u8;
    let mut mcu_count = 0usize;

    for mcu_y in 0..mcus_y {
        for mcu_x in 0..mcus_x {
            let (y_blocks, cb, cr) = extract_mcu_420(image, mcu_x * 16, mcu_y * 16);

            for y_block in &y_blocks {
                let zz = transform_block(y_block, &quant.luma);
                prev_y = encode_block(&mut writer, &zz, prev_y, true, tables);
            }
            let zz = transform_block(&cb, &quant.chroma);
            prev_cb = encode_block(&mut writer, &zz, prev_cb, false, tables);
            let zz = transform_block(&cr, &quant.chroma);
            prev_cr = encode_block(&mut writer, &zz, prev_cr, false, tables);

            mcu_count += 1;
            if let Some(interval) = restart_interval {
                // A marker only belongs between MCUs, never after the last.
                if mcu_count % interval as usize == 0 && mcu_count < total_mcus {
                    writer.flush();
                    writer.write_bytes(&[0xFF, 0xD0 + (rst_index & 7)]);
                    rst_index = (rst_index + 1) & 7;
                    prev_y = 0;
                    prev_cb = 0;
                    prev_cr = 0;
                }
            }
        }
    }

    output.extend_from_slice(&writer.finish());
}

fn encode_gray_scan(
    output: &mut Vec<u8>,
    image: &Image<Luma<u8>>,
    quant: &QuantTables,
    tables: &HuffmanTables,
) {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut writer = BitWriterMsb::new();
    let mut prev_dc = 0i16;

    for block_y in (0..height.div_ceil(8) * 8).step_by(8) {
        for block_x in (0..width.div_ceil(8) * 8).step_by(8) {
            let mut block = [0.0f32; 64];
            for dy in 0..8 {
                for dx in 0..8 {
                    let x = (block_x + dx).min(width - 1) as u32;
                    let y = (block_y + dy).min(height - 1) as u32;
                    block[dy * 8 + dx] = image.pixel_at(x, y).0[0] as f32 - 128.0;
                }
            }
            let zz = transform_block(&block, &quant.luma);
            prev_dc = encode_block(&mut writer, &zz, prev_dc, true, tables);
        }
    }

    output.extend_from_slice(&writer.finish());
}
