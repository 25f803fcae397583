//! Image views: 2-D and 3-D pixel arrays with channels
//!
//! Interleaved images store the channel fastest (`rgbrgb...`); planar images
//! store each channel as one contiguous block of `channel_size` pixels
//! (`rr..gg..bb..`). [`PixelCursor`] and [`PixelIter`] walk a single channel
//! in either layout.

use super::Elements;
use crate::error::{LibraryError, Result, host_call};
use crate::guard::Release;
use crate::host::{ImageHandle, Runtime};
use crate::types::{ColorSpace, PixelElement, PixelKind};
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ops::Deref;

/// Image view that does not fix the pixel type or rank
#[derive(Clone, Copy)]
pub struct GenericImageView<'h> {
    host: &'h dyn Runtime,
    handle: ImageHandle,
    len: usize,
    rows: usize,
    cols: usize,
    slices: usize,
    channels: usize,
    interleaved: bool,
    alpha: bool,
}

impl fmt::Debug for GenericImageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericImageView")
            .field("handle", &self.handle)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("slices", &self.slices)
            .field("channels", &self.channels)
            .field("interleaved", &self.interleaved)
            .field("alpha", &self.alpha)
            .finish()
    }
}

impl<'h> GenericImageView<'h> {
    pub fn from_handle(host: &'h dyn Runtime, handle: ImageHandle) -> Self {
        GenericImageView {
            host,
            handle,
            len: host.image_flattened_length(handle),
            rows: host.image_rows(handle),
            cols: host.image_columns(handle),
            slices: host.image_slices(handle),
            channels: host.image_channels(handle),
            interleaved: host.image_interleaved(handle),
            alpha: host.image_has_alpha(handle),
        }
    }

    pub fn handle(&self) -> ImageHandle {
        self.handle
    }

    pub fn host(&self) -> &'h dyn Runtime {
        self.host
    }

    /// Total number of pixels across all channels
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of slices; 1 for 2-D images
    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Pixels in a single channel
    pub fn channel_size(&self) -> usize {
        self.slices * self.rows * self.cols
    }

    /// 2 for 2-D images, 3 for 3-D images
    pub fn rank(&self) -> usize {
        self.host.image_rank(self.handle)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Channels excluding the alpha channel
    pub fn non_alpha_channels(&self) -> usize {
        if self.alpha {
            self.channels - 1
        } else {
            self.channels
        }
    }

    pub fn is_interleaved(&self) -> bool {
        self.interleaved
    }

    pub fn has_alpha_channel(&self) -> bool {
        self.alpha
    }

    /// Colour space; tags the host does not define read as `Automatic`
    pub fn color_space(&self) -> ColorSpace {
        ColorSpace::from_tag(self.host.image_color_space(self.handle)).unwrap_or_default()
    }

    /// Host tag of the pixel type
    pub fn type_tag(&self) -> i32 {
        self.host.image_type(self.handle)
    }

    pub fn pixel_kind(&self) -> Option<PixelKind> {
        PixelKind::from_tag(self.type_tag())
    }

    /// Flat offset of a pixel channel value
    pub fn offset(&self, slice: usize, row: usize, col: usize, channel: usize) -> usize {
        if self.interleaved {
            slice * self.rows * self.cols * self.channels
                + row * self.cols * self.channels
                + col * self.channels
                + channel
        } else {
            channel * self.slices * self.rows * self.cols
                + slice * self.rows * self.cols
                + row * self.cols
                + col
        }
    }

    /// Free the image.
    ///
    /// # Safety
    /// Every view of the handle is dangling afterwards.
    pub unsafe fn free(self) {
        self.host.image_free(self.handle);
    }

    pub fn disown(&self) {
        self.host.image_disown(self.handle);
    }

    pub fn disown_all(&self) {
        self.host.image_disown_all(self.handle);
    }

    pub fn share_count(&self) -> usize {
        self.host.image_share_count(self.handle)
    }

    pub fn duplicate(&self) -> Result<GenericImageView<'h>> {
        let handle = host_call(self.host.image_clone(self.handle), "image_clone")?;
        Ok(GenericImageView::from_handle(self.host, handle))
    }

    /// New image with pixel type `U` in the requested layout
    pub fn convert_to<U: PixelElement>(&self, interleaved: bool) -> Result<GenericImageView<'h>> {
        let handle = host_call(
            self.host.image_convert(self.handle, U::KIND, interleaved),
            "image_convert",
        )?;
        Ok(GenericImageView::from_handle(self.host, handle))
    }

    /// New image with pixel type `U`, keeping the interleaving of `self`
    pub fn convert_to_same_layout<U: PixelElement>(&self) -> Result<GenericImageView<'h>> {
        self.convert_to::<U>(self.interleaved)
    }

    /// Pixel storage, after checking the pixel type and rank
    fn typed<T: PixelElement>(&self, rank: usize) -> Result<Elements<T>> {
        let received = self.type_tag();
        if received != T::KIND.tag() {
            return Err(LibraryError::type_mismatch(format!(
                "Image of type {} received, {} expected.",
                PixelKind::tag_name(received),
                T::KIND.name()
            )));
        }
        if self.rank() != rank {
            return Err(LibraryError::rank(format!("{}D image expected.", rank)));
        }
        Elements::new(self.host.image_data(self.handle), self.len, "ImageView")
    }

    fn channel_cursor<T>(&self, elems: Elements<T>, channel: usize) -> PixelCursor<'h, T> {
        assert!(
            channel < self.channels,
            "channel {} out of range for {} channels",
            channel,
            self.channels
        );
        let (base, step) = if self.interleaved {
            (channel, self.channels)
        } else {
            (self.channel_size() * channel, 1)
        };
        PixelCursor {
            elems,
            pos: base as isize,
            step: step as isize,
            _host: PhantomData,
        }
    }
}

macro_rules! typed_image_common {
    ($view:ident) => {
        impl<T: PixelElement> Clone for $view<'_, T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T: PixelElement> Copy for $view<'_, T> {}

        impl<T: PixelElement> fmt::Debug for $view<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($view))
                    .field("image", &self.generic)
                    .field("kind", &T::KIND)
                    .finish()
            }
        }

        impl<'h, T: PixelElement> Deref for $view<'h, T> {
            type Target = GenericImageView<'h>;

            fn deref(&self) -> &Self::Target {
                &self.generic
            }
        }

        impl<'h, T: PixelElement> $view<'h, T> {
            pub fn from_handle(host: &'h dyn Runtime, handle: ImageHandle) -> Result<Self> {
                Self::from_generic(GenericImageView::from_handle(host, handle))
            }

            pub fn as_generic(&self) -> GenericImageView<'h> {
                self.generic
            }

            pub fn kind(&self) -> PixelKind {
                T::KIND
            }

            pub fn data(&self) -> *mut T {
                self.elems.as_ptr()
            }

            /// Element `i` of the raw pixel storage
            #[track_caller]
            pub fn get(&self, i: usize) -> T {
                self.elems.get(i)
            }

            #[track_caller]
            pub fn set(&self, i: usize, value: T) {
                self.elems.set(i, value)
            }

            /// Every stored value in storage order
            pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator + 'h {
                self.elems.iter()
            }

            pub fn fill_from(&self, src: &[T]) -> Result<()> {
                self.elems.copy_from(src)
            }

            /// # Safety
            /// The handle must stay live, and no alias may write the pixels while the slice exists.
            pub unsafe fn as_slice(&self) -> &[T] {
                // SAFETY: forwarded to the caller
                unsafe { self.elems.as_slice() }
            }

            /// # Safety
            /// The handle must stay live, and the slice must be the only access to the pixels.
            #[allow(clippy::mut_from_ref)]
            pub unsafe fn as_mut_slice(&self) -> &mut [T] {
                // SAFETY: forwarded to the caller
                unsafe { self.elems.as_mut_slice() }
            }

            /// Cursor at the first pixel of `channel`
            pub fn pixel_begin(&self, channel: usize) -> PixelCursor<'h, T> {
                self.generic.channel_cursor(self.elems, channel)
            }

            /// Cursor one past the last pixel of `channel`
            pub fn pixel_end(&self, channel: usize) -> PixelCursor<'h, T> {
                self.pixel_begin(channel)
                    .offset(self.generic.channel_size() as isize)
            }

            /// Pixels of one channel in row-major order, in either layout
            pub fn channel_pixels(&self, channel: usize) -> PixelIter<'h, T> {
                PixelIter {
                    front: self.pixel_begin(channel),
                    back: self.pixel_end(channel),
                }
            }

            pub fn duplicate(&self) -> Result<$view<'h, T>> {
                let handle = host_call(self.host.image_clone(self.handle), "image_clone")?;
                adopt(self.host, handle)
            }

            /// New image with pixel type `U` in the requested layout
            pub fn convert_to<U: PixelElement>(&self, interleaved: bool) -> Result<$view<'h, U>> {
                let handle = host_call(
                    self.host.image_convert(self.handle, U::KIND, interleaved),
                    "image_convert",
                )?;
                adopt(self.host, handle)
            }

            pub fn convert_to_same_layout<U: PixelElement>(&self) -> Result<$view<'h, U>> {
                self.convert_to::<U>(self.is_interleaved())
            }
        }
    };
}

/// 2-D image of `T` pixels.
///
/// `bool` is the one-bit pixel type; the host stores it as one byte holding 0 or 1.
pub struct ImageView<'h, T: PixelElement> {
    generic: GenericImageView<'h>,
    elems: Elements<T>,
}

typed_image_common!(ImageView);

impl<'h, T: PixelElement> ImageView<'h, T> {
    /// Fails with `TypeMismatch` for another pixel type and `ShapeMismatch`
    /// for a 3-D image
    pub fn from_generic(generic: GenericImageView<'h>) -> Result<Self> {
        let elems = generic.typed::<T>(2)?;
        Ok(ImageView { generic, elems })
    }

    #[track_caller]
    pub fn at(&self, row: usize, col: usize, channel: usize) -> T {
        self.elems.get(self.generic.offset(0, row, col, channel))
    }

    #[track_caller]
    pub fn set_at(&self, row: usize, col: usize, channel: usize, value: T) {
        self.elems.set(self.generic.offset(0, row, col, channel), value)
    }
}

/// 3-D image of `T` pixels
pub struct Image3DView<'h, T: PixelElement> {
    generic: GenericImageView<'h>,
    elems: Elements<T>,
}

typed_image_common!(Image3DView);

impl<'h, T: PixelElement> Image3DView<'h, T> {
    pub fn from_generic(generic: GenericImageView<'h>) -> Result<Self> {
        let elems = generic.typed::<T>(3)?;
        Ok(Image3DView { generic, elems })
    }

    #[track_caller]
    pub fn at(&self, slice: usize, row: usize, col: usize, channel: usize) -> T {
        self.elems.get(self.generic.offset(slice, row, col, channel))
    }

    #[track_caller]
    pub fn set_at(&self, slice: usize, row: usize, col: usize, channel: usize, value: T) {
        self.elems
            .set(self.generic.offset(slice, row, col, channel), value)
    }
}

pub(crate) trait FromGeneric<'h>: Sized {
    fn from_generic(generic: GenericImageView<'h>) -> Result<Self>;
}

impl<'h, T: PixelElement> FromGeneric<'h> for ImageView<'h, T> {
    fn from_generic(generic: GenericImageView<'h>) -> Result<Self> {
        ImageView::from_generic(generic)
    }
}

impl<'h, T: PixelElement> FromGeneric<'h> for Image3DView<'h, T> {
    fn from_generic(generic: GenericImageView<'h>) -> Result<Self> {
        Image3DView::from_generic(generic)
    }
}

pub(crate) fn adopt<'h, V: FromGeneric<'h>>(
    host: &'h dyn Runtime,
    handle: ImageHandle,
) -> Result<V> {
    let guard = Release::new(host, handle);
    let view = V::from_generic(GenericImageView::from_handle(host, guard.handle()))?;
    guard.disarm();
    Ok(view)
}

/// Random-access position in one channel of an image.
///
/// Moving by one steps to the next pixel of the same channel: `channels`
/// elements in interleaved images, one element in planar images. Cursors of
/// the same channel compare by position, and `distance` counts pixels.
pub struct PixelCursor<'h, T> {
    elems: Elements<T>,
    pos: isize,
    step: isize,
    _host: PhantomData<&'h ()>,
}

impl<T> Clone for PixelCursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PixelCursor<'_, T> {}

impl<T> fmt::Debug for PixelCursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelCursor")
            .field("pos", &self.pos)
            .field("step", &self.step)
            .finish()
    }
}

impl<T> PartialEq for PixelCursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl<T> Eq for PixelCursor<'_, T> {}

impl<T> PartialOrd for PixelCursor<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for PixelCursor<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pos.cmp(&other.pos)
    }
}

impl<T: Copy> PixelCursor<'_, T> {
    /// Cursor moved by `n` pixels
    pub fn offset(self, n: isize) -> Self {
        PixelCursor {
            pos: self.pos + n * self.step,
            ..self
        }
    }

    pub fn advance(&mut self) {
        self.pos += self.step;
    }

    pub fn retreat(&mut self) {
        self.pos -= self.step;
    }

    /// Pixels from `other` to `self`
    pub fn distance(&self, other: &Self) -> isize {
        (self.pos - other.pos) / self.step
    }

    /// Element offset in the image storage
    pub fn position(&self) -> usize {
        self.pos as usize
    }

    #[track_caller]
    pub fn get(&self) -> T {
        self.elems.get(self.checked(self.pos))
    }

    #[track_caller]
    pub fn set(&self, value: T) {
        self.elems.set(self.checked(self.pos), value)
    }

    /// Pixel `i` steps from the cursor
    #[track_caller]
    pub fn at(&self, i: isize) -> T {
        self.elems.get(self.checked(self.pos + i * self.step))
    }

    #[track_caller]
    fn checked(&self, pos: isize) -> usize {
        usize::try_from(pos).unwrap_or_else(|_| panic!("pixel cursor before start of image"))
    }
}

/// Iterator over the pixels of one channel
#[derive(Debug, Clone)]
pub struct PixelIter<'h, T> {
    front: PixelCursor<'h, T>,
    back: PixelCursor<'h, T>,
}

impl<T: Copy> Iterator for PixelIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        let value = self.front.get();
        self.front.advance();
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back.distance(&self.front).max(0) as usize;
        (n, Some(n))
    }
}

impl<T: Copy> DoubleEndedIterator for PixelIter<'_, T> {
    fn next_back(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        self.back.retreat();
        Some(self.back.get())
    }
}

impl<T: Copy> ExactSizeIterator for PixelIter<'_, T> {}

impl<T: Copy> FusedIterator for PixelIter<'_, T> {}
