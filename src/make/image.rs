//! Image factories

use crate::error::{Result, host_call};
use crate::host::Runtime;
use crate::types::{ColorSpace, PixelElement};
use crate::views::{Image3DView, ImageView};

/// Channel count, layout and colour space of a new image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub channels: usize,
    pub interleaved: bool,
    pub color_space: ColorSpace,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            channels: 1,
            interleaved: true,
            color_space: ColorSpace::Automatic,
        }
    }
}

impl ImageOptions {
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }

    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }
}

/// Zero-initialised 2-D image, `width` columns by `height` rows
pub fn image<'h, T: PixelElement>(
    host: &'h dyn Runtime,
    width: usize,
    height: usize,
    opts: ImageOptions,
) -> Result<ImageView<'h, T>> {
    let handle = host_call(
        host.image_new_2d(
            width,
            height,
            opts.channels,
            T::KIND,
            opts.color_space,
            opts.interleaved,
        ),
        "image_new_2d",
    )?;
    crate::views::image::adopt(host, handle)
}

/// Zero-initialised 3-D image of `slices` frames
pub fn image_3d<'h, T: PixelElement>(
    host: &'h dyn Runtime,
    slices: usize,
    width: usize,
    height: usize,
    opts: ImageOptions,
) -> Result<Image3DView<'h, T>> {
    let handle = host_call(
        host.image_new_3d(
            slices,
            width,
            height,
            opts.channels,
            T::KIND,
            opts.color_space,
            opts.interleaved,
        ),
        "image_new_3d",
    )?;
    crate::views::image::adopt(host, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::memory::MemoryRuntime;
    use crate::types::PixelKind;

    #[test]
    fn default_options() {
        let host = MemoryRuntime::new();
        let im = image::<u8>(&host, 4, 3, ImageOptions::default()).unwrap();
        assert_eq!((im.rows(), im.cols(), im.channels()), (3, 4, 1));
        assert!(im.is_interleaved());
        assert!(!im.has_alpha_channel());
        assert_eq!(im.color_space(), ColorSpace::Automatic);
        assert_eq!(im.pixel_kind(), Some(PixelKind::Byte));
        assert_eq!(im.len(), 12);
    }

    #[test]
    fn rgba_planar() {
        let host = MemoryRuntime::new();
        let opts = ImageOptions::default()
            .channels(4)
            .interleaved(false)
            .color_space(ColorSpace::RGB);
        let im = image::<f32>(&host, 2, 2, opts).unwrap();
        assert!(im.has_alpha_channel());
        assert_eq!(im.non_alpha_channels(), 3);
        assert!(!im.is_interleaved());
        assert_eq!(im.offset(0, 0, 1, 3), 13);
    }

    #[test]
    fn three_d() {
        let host = MemoryRuntime::new();
        let im = image_3d::<u16>(&host, 5, 2, 3, ImageOptions::default().channels(2)).unwrap();
        assert_eq!(im.rank(), 3);
        assert_eq!((im.slices(), im.rows(), im.cols()), (5, 3, 2));
        assert_eq!(im.len(), 60);
    }

    #[test]
    fn zero_channels_fail() {
        let host = MemoryRuntime::new();
        let err = image::<f64>(&host, 2, 2, ImageOptions::default().channels(0)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DIMENSION);
        assert_eq!(err.message(), Some("image_new_2d() failed."));
        assert_eq!(host.live_handles(), 0);
    }
}
