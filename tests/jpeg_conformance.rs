//! JPEG end-to-end conformance: hand-assembled streams against the decoder,
//! encoder output structure, restart-interval behavior, and quality bounds.

use imago::image::FromDynamic;
use imago::{
    decode_jpeg, encode_jpeg, encode_jpeg_gray, encode_jpeg_with_options, DynamicImage, Error,
    Image, JpegOptions, Luma, YCbCr,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Minimal grayscale 8x8 baseline JPEG with single-code Huffman tables.
///
/// The DC table holds only category 0 (code "0"), the AC table only EOB
/// (code "0"), so the entropy data for one DC-only block is two bits.
fn tiny_grayscale_jpeg(entropy: &[u8], dc_symbols: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];

    // DQT: table 0, 8-bit precision, all sixteens.
    let mut dqt = vec![0x00];
    dqt.extend_from_slice(&[16u8; 64]);
    bytes.extend_from_slice(&segment(0xDB, &dqt));

    // SOF0: 8-bit, 8x8, one component, no subsampling.
    bytes.extend_from_slice(&segment(0xC0, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0]));

    // DHT: DC table 0, symbols at the shortest canonical code lengths.
    let mut dht = vec![0x00];
    let mut counts = [0u8; 16];
    counts[0] = dc_symbols.len() as u8;
    dht.extend_from_slice(&counts);
    dht.extend_from_slice(dc_symbols);
    bytes.extend_from_slice(&segment(0xC4, &dht));

    // AC table 0: only the EOB symbol.
    let mut dht = vec![0x10];
    let mut counts = [0u8; 16];
    counts[0] = 1;
    dht.extend_from_slice(&counts);
    dht.push(0x00);
    bytes.extend_from_slice(&segment(0xC4, &dht));

    // SOS and the entropy-coded bits.
    bytes.extend_from_slice(&segment(0xDA, &[1, 1, 0x00, 0, 63, 0]));
    bytes.extend_from_slice(entropy);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

#[test]
fn hand_assembled_dc_only_block_is_mid_grey() {
    // DC category 0 ("0"), EOB ("0"), padded with ones: 0b00_111111.
    let bytes = tiny_grayscale_jpeg(&[0b0011_1111], &[0]);
    let decoded = Luma::<u8>::from_dynamic(decode_jpeg(&bytes).unwrap()).unwrap();
    assert_eq!(decoded.width(), 8);
    assert_eq!(decoded.height(), 8);
    assert!(decoded.pixels().all(|p| p.0[0] == 128));
}

#[test]
fn hand_assembled_dc_magnitude_shifts_the_block() {
    // DC table has one symbol: category 2. Bits: "0" (symbol), "11" (+3),
    // "0" (EOB), padding ones. DC = 3 * 16 = 48, pixel = 48/8 + 128 = 134.
    let bytes = tiny_grayscale_jpeg(&[0b0110_1111], &[2]);
    let decoded = Luma::<u8>::from_dynamic(decode_jpeg(&bytes).unwrap()).unwrap();
    assert!(decoded.pixels().all(|p| p.0[0] == 134));

    // Bits "0", "00" (-3), "0", padding: DC = -48, pixel = 122.
    let bytes = tiny_grayscale_jpeg(&[0b0000_1111], &[2]);
    let decoded = Luma::<u8>::from_dynamic(decode_jpeg(&bytes).unwrap()).unwrap();
    assert!(decoded.pixels().all(|p| p.0[0] == 122));
}

#[test]
fn dc_only_uniform_image_decodes_to_mid_grey() {
    let img: Image<YCbCr<u8>> = Image::generate(16, 16, |_, _| YCbCr([128, 128, 128]));
    let bytes = encode_jpeg(&img, 75).unwrap();
    let decoded = YCbCr::<u8>::from_dynamic(decode_jpeg(&bytes).unwrap()).unwrap();
    for px in decoded.pixels() {
        assert!((126..=130).contains(&px.0[0]), "Y = {}", px.0[0]);
    }
}

#[test]
fn grayscale_scan_produces_luma_image() {
    let img: Image<Luma<u8>> = Image::generate(8, 8, |x, y| Luma([(x * 8 + y) as u8]));
    let bytes = encode_jpeg_gray(&img, 90).unwrap();
    assert!(matches!(
        decode_jpeg(&bytes).unwrap(),
        DynamicImage::Luma8(_)
    ));
}

#[test]
fn quality_bound_on_luma_plane() {
    // Smooth gradients stay within floor((100 - q) / 3) + 1 on Y for q >= 50.
    let img: Image<YCbCr<u8>> = Image::generate(40, 24, |x, y| {
        YCbCr([(40 + x * 3 + y * 2) as u8, 128, 128])
    });

    for quality in [50u8, 75, 90] {
        let bound = ((100 - quality as i32) / 3) + 1;
        let bytes = encode_jpeg(&img, quality).unwrap();
        let decoded = YCbCr::<u8>::from_dynamic(decode_jpeg(&bytes).unwrap()).unwrap();
        for y in 0..24u32 {
            for x in 0..40u32 {
                let a = img.pixel_at(x, y).0[0] as i32;
                let b = decoded.pixel_at(x, y).0[0] as i32;
                assert!(
                    (a - b).abs() <= bound,
                    "q={quality} ({x},{y}): {a} vs {b} (bound {bound})"
                );
            }
        }
    }
}

#[test]
fn restart_interval_stream_equivalence() {
    // Two MCUs wide; DRI=1 puts one RST0 between them.
    let img: Image<YCbCr<u8>> = Image::generate(32, 16, |x, y| {
        YCbCr([(x * 8) as u8, (128 + y * 4) as u8, (128u32.wrapping_sub(y)) as u8])
    });

    let with_dri = encode_jpeg_with_options(
        &img,
        &JpegOptions::builder()
            .quality(80)
            .restart_interval(Some(1))
            .build(),
    )
    .unwrap();
    let without_dri = encode_jpeg(&img, 80).unwrap();

    assert!(with_dri.windows(2).any(|w| w == [0xFF, 0xD0]), "RST0 missing");

    // The restart stream decodes identically to the plain stream.
    assert_eq!(
        decode_jpeg(&with_dri).unwrap(),
        decode_jpeg(&without_dri).unwrap()
    );
}

#[test]
fn dropped_restart_marker_fails_with_missing_restart() {
    let img: Image<YCbCr<u8>> = Image::generate(32, 16, |x, y| {
        YCbCr([(x * 8) as u8, (128 + y * 4) as u8, 128])
    });
    let mut bytes = encode_jpeg_with_options(
        &img,
        &JpegOptions::builder()
            .quality(80)
            .restart_interval(Some(1))
            .build(),
    )
    .unwrap();

    let rst = bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xD0])
        .expect("restart marker present");
    bytes.drain(rst..rst + 2);

    assert_eq!(decode_jpeg(&bytes), Err(Error::MissingRestart));
}

#[test]
fn restart_marker_index_mismatch_is_tolerated() {
    let img: Image<YCbCr<u8>> = Image::generate(48, 16, |x, _| YCbCr([(x * 5) as u8, 128, 128]));
    let mut bytes = encode_jpeg_with_options(
        &img,
        &JpegOptions::builder()
            .quality(80)
            .restart_interval(Some(1))
            .build(),
    )
    .unwrap();

    // Swap RST0 -> RST5; decoding warns but proceeds.
    let rst = bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xD0])
        .expect("restart marker present");
    bytes[rst + 1] = 0xD5;

    assert!(decode_jpeg(&bytes).is_ok());
}

#[test]
fn chroma_subsampling_keeps_flat_chroma() {
    let img: Image<YCbCr<u8>> = Image::generate(16, 16, |x, y| {
        YCbCr([(x * 16 + y) as u8, 90, 170])
    });
    let bytes = encode_jpeg(&img, 90).unwrap();
    let decoded = YCbCr::<u8>::from_dynamic(decode_jpeg(&bytes).unwrap()).unwrap();
    for px in decoded.pixels() {
        assert!((px.0[1] as i32 - 90).abs() <= 3, "Cb = {}", px.0[1]);
        assert!((px.0[2] as i32 - 170).abs() <= 3, "Cr = {}", px.0[2]);
    }
}

#[test]
fn decoder_rejects_progressive_and_arithmetic() {
    let img: Image<YCbCr<u8>> = Image::generate(8, 8, |_, _| YCbCr([128, 128, 128]));
    let baseline = encode_jpeg(&img, 85).unwrap();
    let sof = baseline
        .windows(2)
        .position(|w| w == [0xFF, 0xC0])
        .unwrap();

    let mut progressive = baseline.clone();
    progressive[sof + 1] = 0xC2;
    assert_eq!(
        decode_jpeg(&progressive),
        Err(Error::UnsupportedFeature("non-baseline SOF"))
    );

    let mut arithmetic = baseline.clone();
    arithmetic[sof + 1] = 0xC9;
    assert_eq!(
        decode_jpeg(&arithmetic),
        Err(Error::UnsupportedFeature("non-baseline SOF"))
    );
}

#[test]
fn app_segments_are_skipped() {
    let img: Image<YCbCr<u8>> = Image::generate(8, 8, |_, _| YCbCr([200, 128, 128]));
    let bytes = encode_jpeg(&img, 85).unwrap();

    // Splice an APP13 segment right after SOI.
    let mut patched = bytes[..2].to_vec();
    patched.extend_from_slice(&segment(0xED, b"Photoshop 3.0\0"));
    patched.extend_from_slice(&bytes[2..]);

    assert_eq!(decode_jpeg(&patched).unwrap(), decode_jpeg(&bytes).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]
    #[test]
    fn encode_decode_preserves_dimensions(
        w in 1u32..48,
        h in 1u32..48,
        quality in 40u8..=95,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; (w * h * 3) as usize];
        rng.fill(data.as_mut_slice());
        let img: Image<YCbCr<u8>> = Image::from_raw(w, h, data).unwrap();

        let bytes = encode_jpeg(&img, quality).unwrap();
        prop_assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        prop_assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);

        let decoded = decode_jpeg(&bytes).unwrap();
        prop_assert_eq!((decoded.width(), decoded.height()), (w, h));
    }

    #[test]
    fn restart_intervals_never_change_the_pixels(
        interval in 1u16..6,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; 48 * 32 * 3];
        rng.fill(data.as_mut_slice());
        let img: Image<YCbCr<u8>> = Image::from_raw(48, 32, data).unwrap();

        let plain = encode_jpeg(&img, 85).unwrap();
        let restarts = encode_jpeg_with_options(
            &img,
            &JpegOptions::builder().quality(85).restart_interval(Some(interval)).build(),
        )
        .unwrap();

        prop_assert_eq!(decode_jpeg(&plain).unwrap(), decode_jpeg(&restarts).unwrap());
    }
}
