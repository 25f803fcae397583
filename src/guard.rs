//! Scoped release of freshly allocated handles
//!
//! A factory that allocates a handle and then runs more host calls (copy
//! loops, abort checks, view validation) holds the handle in a [`Release`]
//! until it succeeds. Any early return, including a `UserAbort` unwind,
//! drops the guard and frees the handle.

use crate::host::{ImageHandle, RawArrayHandle, Runtime, SparseHandle, TensorHandle};
use std::fmt::Debug;

/// A handle family with an explicit free call
pub(crate) trait HostHandle: Copy + Debug {
    fn release(self, host: &dyn Runtime);
}

impl HostHandle for TensorHandle {
    fn release(self, host: &dyn Runtime) {
        host.tensor_free(self);
    }
}

impl HostHandle for SparseHandle {
    fn release(self, host: &dyn Runtime) {
        host.sparse_free(self);
    }
}

impl HostHandle for RawArrayHandle {
    fn release(self, host: &dyn Runtime) {
        host.raw_free(self);
    }
}

impl HostHandle for ImageHandle {
    fn release(self, host: &dyn Runtime) {
        host.image_free(self);
    }
}

/// Frees `handle` on drop unless disarmed
pub(crate) struct Release<'h, H: HostHandle> {
    host: &'h dyn Runtime,
    handle: Option<H>,
}

impl<'h, H: HostHandle> Release<'h, H> {
    pub(crate) fn new(host: &'h dyn Runtime, handle: H) -> Self {
        Release {
            host,
            handle: Some(handle),
        }
    }

    pub(crate) fn handle(&self) -> H {
        match self.handle {
            Some(handle) => handle,
            None => unreachable!("guard used after disarm"),
        }
    }

    /// Keep the handle alive and return it to the caller
    pub(crate) fn disarm(mut self) -> H {
        let handle = self.handle();
        self.handle = None;
        handle
    }
}

impl<H: HostHandle> Drop for Release<'_, H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::trace!("releasing unreturned handle {:?}", handle);
            handle.release(self.host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryRuntime;
    use crate::host::TensorFunctions;
    use crate::types::TensorKind;

    #[test]
    fn dropped_guard_frees() {
        let host = MemoryRuntime::new();
        let t = host.tensor_new(TensorKind::Real, &[3]).unwrap();
        {
            let guard = Release::new(&host, t);
            assert_eq!(guard.handle(), t);
        }
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn disarmed_guard_keeps_handle() {
        let host = MemoryRuntime::new();
        let t = host.tensor_new(TensorKind::Real, &[3]).unwrap();
        let kept = Release::new(&host, t).disarm();
        assert_eq!(kept, t);
        assert_eq!(host.live_handles(), 1);
    }

    #[test]
    fn early_return_frees() {
        fn fails(host: &MemoryRuntime) -> Result<TensorHandle, ()> {
            let t = host.tensor_new(TensorKind::Integer, &[2]).map_err(|_| ())?;
            let guard = Release::new(host, t);
            if guard.handle() == t {
                return Err(());
            }
            Ok(guard.disarm())
        }
        let host = MemoryRuntime::new();
        assert!(fails(&host).is_err());
        assert_eq!(host.live_handles(), 0);
    }
}
