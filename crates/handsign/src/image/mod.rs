//! Image manipulation.
//!
//! This module provides:
//!
//! - The [`Image`] type, an owned RGBA image.
//! - [`ImageView`], a borrowed rectangular region of an [`Image`] that may extend past its edges.
//! - The [`draw`] module, with guard-based drawing functions to visualize hands and labels.
//! - [`Rect`], [`Resolution`] and [`AspectRatio`] for describing image geometry.

pub mod draw;
mod rect;
mod resolution;

#[cfg(test)]
mod tests;

use std::{fmt, path::Path};

use anyhow::bail;
use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};
use image::{ImageBuffer, Rgba, RgbaImage};

pub use rect::*;
pub use resolution::*;

#[derive(Debug, Clone, Copy)]
enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            _ => bail!(
                "invalid image path '{}' (must have one of the supported extensions)",
                path.display()
            ),
        }
    }

    fn to_image_rs(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// An 8-bit sRGB image with alpha channel.
#[derive(Clone)]
pub struct Image {
    // RGBA8 matches the GPU texture format used by the GUI, so frames can be uploaded as-is.
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Loads an image from the filesystem.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let format = ImageFormat::from_path(path)?;
        let data = std::fs::read(path)?;
        let buf = image::load_from_memory_with_format(&data, format.to_image_rs())?.to_rgba8();
        Ok(Self { buf })
    }

    /// Decodes a JFIF JPEG or Motion JPEG from a byte slice.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        let buf = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgba8();
        Ok(Self { buf })
    }

    /// Saves an image to the file system.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path)?;
        self.buf.save_with_format(path, format.to_image_rs())?;
        Ok(())
    }

    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black and fully transparent.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates an image from raw RGBA8 data in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not contain exactly `4 * width * height` bytes.
    pub fn from_rgba8(res: Resolution, data: &[u8]) -> Self {
        let buf = ImageBuffer::from_raw(res.width(), res.height(), data.to_vec())
            .expect("RGBA data does not match image resolution");
        Self { buf }
    }

    /// Creates an image filled with a single color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            buf: ImageBuffer::from_pixel(width, height, Rgba(color.0)),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering the whole image.
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width() as f32, self.height() as f32)
    }

    /// Returns the color of the pixel at `(x, y)`.
    ///
    /// Coordinates outside of the image yield [`Color::NULL`].
    pub fn get(&self, x: u32, y: u32) -> Color {
        match self.buf.get_pixel_checked(x, y) {
            Some(pixel) => Color(pixel.0),
            None => Color::NULL,
        }
    }

    /// Sets the pixel at `(x, y)`. Coordinates outside of the image are ignored.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if let Some(pixel) = self.buf.get_pixel_mut_checked(x, y) {
            pixel.0 = color.0;
        }
    }

    /// Creates a view of a rectangular region of this image.
    ///
    /// The region may extend beyond the image's borders, the area outside reads as [`Color::NULL`].
    pub fn view(&self, rect: Rect) -> ImageView<'_> {
        ImageView { image: self, rect }
    }

    /// Mirrors the image along the vertical axis, in place.
    pub fn flip_horizontal_in_place(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Overwrites every pixel with `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pixel| pixel.0 = color.0);
    }

    /// Returns the raw RGBA8 pixel data in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image @ {}", self.resolution())
    }
}

/// A borrowed rectangular region of an [`Image`].
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    image: &'a Image,
    rect: Rect,
}

impl<'a> ImageView<'a> {
    /// Returns the region of the underlying image covered by this view.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Samples the view at normalized coordinates `u` and `v`, each in range `0.0..=1.0`.
    ///
    /// Uses nearest-neighbor sampling. Positions outside the underlying image yield
    /// [`Color::NULL`].
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let x = (self.rect.x() + u * self.rect.width()).floor();
        let y = (self.rect.y() + v * self.rect.height()).floor();
        if x < 0.0 || y < 0.0 {
            return Color::NULL;
        }
        self.image.get(x as u32, y as u32)
    }

    /// Maps a point in view coordinates scaled to `res` back into image coordinates.
    pub fn transform_out(&self, res: Resolution, x: f32, y: f32) -> [f32; 2] {
        [
            self.rect.x() + x / res.width() as f32 * self.rect.width(),
            self.rect.y() + y / res.height() as f32 * self.rect.height(),
        ]
    }
}

impl fmt::Debug for ImageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageView @ {:?} of {:?}", self.rect, self.image)
    }
}

/// Types that can be treated as read-only views of image data.
pub trait AsImageView {
    /// Returns an [`ImageView`] covering `self`.
    fn as_view(&self) -> ImageView<'_>;
}

impl AsImageView for Image {
    fn as_view(&self) -> ImageView<'_> {
        self.view(self.rect())
    }
}

impl<'a> AsImageView for ImageView<'a> {
    fn as_view(&self) -> ImageView<'_> {
        *self
    }
}

/// An 8-bit sRGB color with alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    /// Fully transparent black (all components are 0).
    pub const NULL: Self = Self([0, 0, 0, 0]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);
    pub const YELLOW: Self = Self([255, 255, 0, 255]);

    /// Creates an opaque color from its red, green and blue components.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    pub fn a(&self) -> u8 {
        self.0[3]
    }
}

impl PixelColor for Color {
    type Raw = RawU32;
}
