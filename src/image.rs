//! Image containers over the typed pixel model.
//!
//! [`Image<P>`] is width x height plus one flat interleaved component buffer;
//! pixel (x, y) lives at `data[(y * width + x) * P::CHANNELS ..]`, origin
//! top-left, y growing downward. The buffer length is
//! `width * height * CHANNELS` at all times.
//!
//! [`DynamicImage`] is the tagged union the format-agnostic decoders return
//! when the pixel type is not known statically.

use crate::color::{Luma, LumaA, Pixel, Promote, Rgb, Rgba, YCbCr};
use crate::error::{Error, Result};

/// A raster image with statically known pixel type.
///
/// The component buffer is exclusively owned by the image; decoding fills a
/// zero-initialized buffer in place and hands it off without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<P: Pixel> {
    width: u32,
    height: u32,
    data: Vec<P::Subpixel>,
}

impl<P: Pixel> Image<P> {
    /// Allocate a zeroed image.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * P::CHANNELS;
        Image {
            width,
            height,
            data: vec![Default::default(); len],
        }
    }

    /// Wrap an existing component buffer.
    ///
    /// Fails with [`Error::InvalidDataLength`] unless
    /// `data.len() == width * height * CHANNELS`.
    pub fn from_raw(width: u32, height: u32, data: Vec<P::Subpixel>) -> Result<Self> {
        let expected = width as usize * height as usize * P::CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Image {
            width,
            height,
            data,
        })
    }

    /// Build an image by calling `f(x, y)` for every pixel in raster order.
    pub fn generate<F: FnMut(u32, u32) -> P>(width: u32, height: u32, mut f: F) -> Self {
        let mut image = Image::new(width, height);
        for y in 0..height {
            for x in 0..width {
                image.put_pixel(x, y, f(x, y));
            }
        }
        image
    }

    /// Like [`Image::generate`] but threading an accumulator through the
    /// raster-order traversal. Returns the image and the final accumulator.
    pub fn generate_fold<A, F: FnMut(A, u32, u32) -> (A, P)>(
        width: u32,
        height: u32,
        acc: A,
        mut f: F,
    ) -> (Self, A) {
        let mut image = Image::new(width, height);
        let mut acc = acc;
        for y in 0..height {
            for x in 0..width {
                let (next, px) = f(acc, x, y);
                image.put_pixel(x, y, px);
                acc = next;
            }
        }
        (image, acc)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The flat interleaved component buffer.
    pub fn as_raw(&self) -> &[P::Subpixel] {
        &self.data
    }

    /// Mutable access to the component buffer.
    pub fn as_raw_mut(&mut self) -> &mut [P::Subpixel] {
        &mut self.data
    }

    /// Consume the image, returning the component buffer.
    pub fn into_raw(self) -> Vec<P::Subpixel> {
        self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize * self.width as usize + x as usize) * P::CHANNELS
    }

    /// Pixel at (x, y).
    ///
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn pixel_at(&self, x: u32, y: u32) -> P {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{} image",
            self.width,
            self.height
        );
        let offset = self.offset(x, y);
        P::from_slice(&self.data[offset..offset + P::CHANNELS])
    }

    /// Overwrite the pixel at (x, y).
    ///
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: P) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{} image",
            self.width,
            self.height
        );
        let offset = self.offset(x, y);
        pixel.write_to(&mut self.data[offset..offset + P::CHANNELS]);
    }

    /// Iterate over pixels in raster order.
    pub fn pixels(&self) -> impl Iterator<Item = P> + '_ {
        self.data.chunks_exact(P::CHANNELS).map(P::from_slice)
    }

    /// Map every pixel through `f`, producing an image of a possibly
    /// different pixel type. Each source pixel is visited exactly once, in
    /// raster order.
    pub fn pixel_map<Q: Pixel, F: FnMut(P) -> Q>(&self, mut f: F) -> Image<Q> {
        let mut data = vec![Default::default(); self.data.len() / P::CHANNELS * Q::CHANNELS];
        for (src, dst) in self
            .data
            .chunks_exact(P::CHANNELS)
            .zip(data.chunks_exact_mut(Q::CHANNELS))
        {
            f(P::from_slice(src)).write_to(dst);
        }
        Image {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Losslessly widen every pixel to type `Q`.
    pub fn promote<Q: Pixel>(&self) -> Image<Q>
    where
        P: Promote<Q>,
    {
        self.pixel_map(Promote::promote)
    }

    /// Copy one component of every pixel into a single-channel image.
    ///
    /// Panics if `channel >= P::CHANNELS`.
    pub fn extract_plane(&self, channel: usize) -> Image<Luma<P::Subpixel>>
    where
        Luma<P::Subpixel>: Pixel<Subpixel = P::Subpixel>,
    {
        assert!(
            channel < P::CHANNELS,
            "channel {channel} out of range for {}",
            P::NAME
        );
        let data = self
            .data
            .chunks_exact(P::CHANNELS)
            .map(|px| px[channel])
            .collect();
        Image {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// An image whose pixel type was chosen by the decoder.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DynamicImage {
    /// 8-bit greyscale.
    Luma8(Image<Luma<u8>>),
    /// Float greyscale.
    LumaF32(Image<Luma<f32>>),
    /// 8-bit greyscale with alpha.
    LumaA8(Image<LumaA<u8>>),
    /// 8-bit RGB.
    Rgb8(Image<Rgb<u8>>),
    /// Float RGB.
    RgbF32(Image<Rgb<f32>>),
    /// 8-bit RGBA.
    Rgba8(Image<Rgba<u8>>),
    /// 8-bit YCbCr (JPEG color space).
    YCbCr8(Image<YCbCr<u8>>),
}

impl DynamicImage {
    pub fn width(&self) -> u32 {
        match self {
            DynamicImage::Luma8(img) => img.width(),
            DynamicImage::LumaF32(img) => img.width(),
            DynamicImage::LumaA8(img) => img.width(),
            DynamicImage::Rgb8(img) => img.width(),
            DynamicImage::RgbF32(img) => img.width(),
            DynamicImage::Rgba8(img) => img.width(),
            DynamicImage::YCbCr8(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            DynamicImage::Luma8(img) => img.height(),
            DynamicImage::LumaF32(img) => img.height(),
            DynamicImage::LumaA8(img) => img.height(),
            DynamicImage::Rgb8(img) => img.height(),
            DynamicImage::RgbF32(img) => img.height(),
            DynamicImage::Rgba8(img) => img.height(),
            DynamicImage::YCbCr8(img) => img.height(),
        }
    }

    /// Name of the carried pixel type.
    pub fn pixel_type(&self) -> &'static str {
        match self {
            DynamicImage::Luma8(_) => Luma::<u8>::NAME,
            DynamicImage::LumaF32(_) => Luma::<f32>::NAME,
            DynamicImage::LumaA8(_) => LumaA::<u8>::NAME,
            DynamicImage::Rgb8(_) => Rgb::<u8>::NAME,
            DynamicImage::RgbF32(_) => Rgb::<f32>::NAME,
            DynamicImage::Rgba8(_) => Rgba::<u8>::NAME,
            DynamicImage::YCbCr8(_) => YCbCr::<u8>::NAME,
        }
    }

    /// Convert into a statically-typed image, promoting losslessly where the
    /// promotion DAG allows it.
    ///
    /// Fails with [`Error::IncompatiblePromotion`] when the carried pixel
    /// type cannot reach `P` without loss.
    pub fn into_image<P: FromDynamic>(self) -> Result<Image<P>> {
        P::from_dynamic(self)
    }

    fn incompatible(&self, requested: &'static str) -> Error {
        Error::IncompatiblePromotion {
            requested,
            actual: self.pixel_type(),
        }
    }
}

/// Pixel types a [`DynamicImage`] can be converted into.
///
/// Implemented for every concrete pixel type; each implementation accepts
/// exactly the source variants with a lossless path to it.
pub trait FromDynamic: Pixel + Sized {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>>;
}

impl FromDynamic for Luma<u8> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::Luma8(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}

impl FromDynamic for Luma<f32> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::Luma8(img) => Ok(img.promote()),
            DynamicImage::LumaF32(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}

impl FromDynamic for LumaA<u8> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::Luma8(img) => Ok(img.promote()),
            DynamicImage::LumaA8(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}

impl FromDynamic for Rgb<u8> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::Luma8(img) => Ok(img.promote()),
            DynamicImage::LumaA8(img) => Ok(img.promote()),
            DynamicImage::Rgb8(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}

impl FromDynamic for Rgb<f32> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::Luma8(img) => Ok(img.promote()),
            DynamicImage::LumaF32(img) => Ok(img.promote()),
            DynamicImage::Rgb8(img) => Ok(img.promote()),
            DynamicImage::RgbF32(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}

impl FromDynamic for Rgba<u8> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::Luma8(img) => Ok(img.promote()),
            DynamicImage::LumaA8(img) => Ok(img.promote()),
            DynamicImage::Rgb8(img) => Ok(img.promote()),
            DynamicImage::Rgba8(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}

impl FromDynamic for YCbCr<u8> {
    fn from_dynamic(dynamic: DynamicImage) -> Result<Image<Self>> {
        match dynamic {
            DynamicImage::YCbCr8(img) => Ok(img),
            other => Err(other.incompatible(Self::NAME)),
        }
    }
}
