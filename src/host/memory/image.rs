//! Image storage for the in-process runtime

use super::MemoryRuntime;
use super::scalar::{Scalar, load, store};
use super::storage::Storage;
use crate::error::ErrorCode;
use crate::host::{ImageFunctions, ImageHandle};
use crate::types::{ColorSpace, PixelKind};
use std::cell::{Ref, RefMut};

pub(super) struct ImageEntry {
    kind: PixelKind,
    rank: usize,
    slices: usize,
    rows: usize,
    cols: usize,
    channels: usize,
    interleaved: bool,
    alpha: bool,
    color_space: ColorSpace,
    storage: Storage,
    pub(super) shares: usize,
}

impl ImageEntry {
    #[allow(clippy::too_many_arguments)]
    fn new(
        kind: PixelKind,
        rank: usize,
        slices: usize,
        rows: usize,
        cols: usize,
        channels: usize,
        color_space: ColorSpace,
        interleaved: bool,
    ) -> Result<Self, ErrorCode> {
        if channels == 0 {
            return Err(ErrorCode::DIMENSION);
        }
        let bytes = [slices, rows, cols, channels, kind.element_size()]
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(ErrorCode::DIMENSION)?;
        let alpha = match color_space.color_channels() {
            Some(n) => channels > n,
            None => channels == 2 || channels == 4,
        };
        Ok(ImageEntry {
            kind,
            rank,
            slices,
            rows,
            cols,
            channels,
            interleaved,
            alpha,
            color_space,
            storage: Storage::zeroed(bytes)?,
            shares: 0,
        })
    }

    fn len(&self) -> usize {
        self.slices * self.rows * self.cols * self.channels
    }

    fn offset(&self, slice: usize, row: usize, col: usize, channel: usize) -> usize {
        let plane = self.rows * self.cols;
        if self.interleaved {
            ((slice * plane + row * self.cols + col) * self.channels) + channel
        } else {
            channel * self.slices * plane + slice * plane + row * self.cols + col
        }
    }

    fn duplicate(&self) -> Result<Self, ErrorCode> {
        Ok(ImageEntry {
            storage: self.storage.duplicate()?,
            shares: 0,
            ..*self
        })
    }
}

/// Pixel value on the common 0..1 scale
fn normalise(kind: PixelKind, v: Scalar) -> f64 {
    let x = v.to_real();
    match kind {
        PixelKind::Bit => x,
        PixelKind::Byte => x / u8::MAX as f64,
        PixelKind::Bit16 => x / u16::MAX as f64,
        PixelKind::Real32 | PixelKind::Real => x,
    }
}

fn denormalise(kind: PixelKind, x: f64) -> Scalar {
    match kind {
        PixelKind::Bit => Scalar::Int((x >= 0.5) as i128),
        PixelKind::Byte => Scalar::Real((x.clamp(0.0, 1.0) * u8::MAX as f64).round()),
        PixelKind::Bit16 => Scalar::Real((x.clamp(0.0, 1.0) * u16::MAX as f64).round()),
        PixelKind::Real32 | PixelKind::Real => Scalar::Real(x),
    }
}

impl MemoryRuntime {
    fn image(&self, im: ImageHandle) -> Ref<'_, ImageEntry> {
        Ref::map(self.arena.borrow(), |a| {
            a.images
                .get(&im.into_raw())
                .unwrap_or_else(|| panic!("unknown image handle {:?}", im))
        })
    }

    pub(super) fn image_mut(&self, im: ImageHandle) -> RefMut<'_, ImageEntry> {
        RefMut::map(self.arena.borrow_mut(), |a| {
            a.images
                .get_mut(&im.into_raw())
                .unwrap_or_else(|| panic!("unknown image handle {:?}", im))
        })
    }

    fn insert_image(&self, entry: ImageEntry) -> ImageHandle {
        let mut arena = self.arena.borrow_mut();
        let id = arena.id();
        arena.images.insert(id, entry);
        ImageHandle::from_raw(id)
    }
}

impl ImageFunctions for MemoryRuntime {
    fn image_new_2d(
        &self,
        width: usize,
        height: usize,
        channels: usize,
        kind: PixelKind,
        color_space: ColorSpace,
        interleaved: bool,
    ) -> Result<ImageHandle, ErrorCode> {
        self.charge()?;
        let entry = ImageEntry::new(
            kind,
            2,
            1,
            height,
            width,
            channels,
            color_space,
            interleaved,
        )?;
        Ok(self.insert_image(entry))
    }

    fn image_new_3d(
        &self,
        slices: usize,
        width: usize,
        height: usize,
        channels: usize,
        kind: PixelKind,
        color_space: ColorSpace,
        interleaved: bool,
    ) -> Result<ImageHandle, ErrorCode> {
        self.charge()?;
        let entry = ImageEntry::new(
            kind,
            3,
            slices,
            height,
            width,
            channels,
            color_space,
            interleaved,
        )?;
        Ok(self.insert_image(entry))
    }

    fn image_free(&self, im: ImageHandle) {
        self.arena.borrow_mut().images.remove(&im.into_raw());
    }

    fn image_clone(&self, im: ImageHandle) -> Result<ImageHandle, ErrorCode> {
        self.charge()?;
        let copy = self.image(im).duplicate()?;
        Ok(self.insert_image(copy))
    }

    fn image_disown(&self, im: ImageHandle) {
        let mut entry = self.image_mut(im);
        entry.shares = entry.shares.saturating_sub(1);
    }

    fn image_disown_all(&self, im: ImageHandle) {
        self.image_mut(im).shares = 0;
    }

    fn image_share_count(&self, im: ImageHandle) -> usize {
        self.image(im).shares
    }

    fn image_type(&self, im: ImageHandle) -> i32 {
        self.image(im).kind.tag()
    }

    fn image_rank(&self, im: ImageHandle) -> usize {
        self.image(im).rank
    }

    fn image_rows(&self, im: ImageHandle) -> usize {
        self.image(im).rows
    }

    fn image_columns(&self, im: ImageHandle) -> usize {
        self.image(im).cols
    }

    fn image_slices(&self, im: ImageHandle) -> usize {
        self.image(im).slices
    }

    fn image_channels(&self, im: ImageHandle) -> usize {
        self.image(im).channels
    }

    fn image_interleaved(&self, im: ImageHandle) -> bool {
        self.image(im).interleaved
    }

    fn image_has_alpha(&self, im: ImageHandle) -> bool {
        self.image(im).alpha
    }

    fn image_color_space(&self, im: ImageHandle) -> i32 {
        self.image(im).color_space.tag()
    }

    fn image_flattened_length(&self, im: ImageHandle) -> usize {
        self.image(im).len()
    }

    fn image_data(&self, im: ImageHandle) -> *mut u8 {
        self.image(im).storage.as_ptr()
    }

    fn image_convert(
        &self,
        im: ImageHandle,
        kind: PixelKind,
        interleaved: bool,
    ) -> Result<ImageHandle, ErrorCode> {
        self.charge()?;
        let converted = {
            let src = self.image(im);
            let dst = ImageEntry::new(
                kind,
                src.rank,
                src.slices,
                src.rows,
                src.cols,
                src.channels,
                src.color_space,
                interleaved,
            )?;
            for s in 0..src.slices {
                for r in 0..src.rows {
                    for c in 0..src.cols {
                        for ch in 0..src.channels {
                            // SAFETY: offsets are within both images' `len`
                            unsafe {
                                let v = load(
                                    src.storage.as_ptr(),
                                    src.kind.into(),
                                    src.offset(s, r, c, ch),
                                );
                                let x = denormalise(kind, normalise(src.kind, v));
                                store(dst.storage.as_ptr(), kind.into(), dst.offset(s, r, c, ch), x);
                            }
                        }
                    }
                }
            }
            ImageEntry { alpha: src.alpha, ..dst }
        };
        Ok(self.insert_image(converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_is_columns_height_is_rows() {
        let host = MemoryRuntime::new();
        let im = host
            .image_new_2d(4, 3, 1, PixelKind::Byte, ColorSpace::Gray, true)
            .unwrap();
        assert_eq!(host.image_rows(im), 3);
        assert_eq!(host.image_columns(im), 4);
        assert_eq!(host.image_slices(im), 1);
        assert_eq!(host.image_rank(im), 2);
        assert_eq!(host.image_flattened_length(im), 12);
        assert!(!host.image_has_alpha(im));
    }

    #[test]
    fn alpha_follows_channel_count() {
        let host = MemoryRuntime::new();
        let auto = host
            .image_new_2d(1, 1, 2, PixelKind::Byte, ColorSpace::Automatic, true)
            .unwrap();
        assert!(host.image_has_alpha(auto));
        let rgba = host
            .image_new_2d(1, 1, 4, PixelKind::Byte, ColorSpace::RGB, true)
            .unwrap();
        assert!(host.image_has_alpha(rgba));
        let cmyk = host
            .image_new_2d(1, 1, 4, PixelKind::Byte, ColorSpace::CMYK, true)
            .unwrap();
        assert!(!host.image_has_alpha(cmyk));
    }

    #[test]
    fn zero_channels_rejected() {
        let host = MemoryRuntime::new();
        assert_eq!(
            host.image_new_2d(2, 2, 0, PixelKind::Real, ColorSpace::Gray, true),
            Err(ErrorCode::DIMENSION)
        );
    }

    #[test]
    fn byte_to_real_rescales() {
        let host = MemoryRuntime::new();
        let im = host
            .image_new_2d(2, 1, 1, PixelKind::Byte, ColorSpace::Gray, true)
            .unwrap();
        // SAFETY: two bytes
        unsafe {
            *host.image_data(im) = 255;
            *host.image_data(im).add(1) = 51;
        }
        let real = host.image_convert(im, PixelKind::Real, true).unwrap();
        let data = host.image_data(real) as *const f64;
        // SAFETY: two f64 pixels
        let px = unsafe { std::slice::from_raw_parts(data, 2) };
        assert_eq!(px[0], 1.0);
        assert!((px[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn convert_reorders_layout() {
        let host = MemoryRuntime::new();
        let im = host
            .image_new_2d(2, 1, 2, PixelKind::Byte, ColorSpace::Automatic, true)
            .unwrap();
        // interleaved: (c0 ch0, c0 ch1, c1 ch0, c1 ch1)
        let data = host.image_data(im);
        for (i, v) in [1u8, 2, 3, 4].into_iter().enumerate() {
            // SAFETY: four bytes
            unsafe { *data.add(i) = v };
        }
        let planar = host.image_convert(im, PixelKind::Byte, false).unwrap();
        assert!(!host.image_interleaved(planar));
        // SAFETY: four bytes
        let out = unsafe { std::slice::from_raw_parts(host.image_data(planar), 4) };
        assert_eq!(out, &[1, 3, 2, 4]);
    }
}
