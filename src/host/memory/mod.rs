//! In-process host runtime
//!
//! `MemoryRuntime` implements every host function table on plain heap
//! allocations. It behaves like a foreign host: handles are opaque ids,
//! storage is zero-initialised, nothing is freed unless asked, and share
//! counts are bookkeeping only.

mod image;
mod scalar;
mod sparse;
mod storage;

use super::{
    ImageHandle, RawArrayFunctions, RawArrayHandle, Session, SparseHandle, TensorFunctions,
    TensorHandle,
};
use crate::error::ErrorCode;
use crate::session::Severity;
use crate::types::{DType, TensorKind};
use image::ImageEntry;
use scalar::{Elem, load, store};
use sparse::SparseEntry;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use storage::Storage;

/// A dense block: tensors and raw arrays share this layout
struct Dense<K> {
    kind: K,
    dims: Vec<usize>,
    len: usize,
    storage: Storage,
    shares: usize,
}

impl<K: Copy + Into<Elem>> Dense<K> {
    fn new(kind: K, element_size: usize, dims: &[usize]) -> Result<Self, ErrorCode> {
        let len = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(ErrorCode::DIMENSION)?;
        let bytes = len
            .checked_mul(element_size)
            .ok_or(ErrorCode::DIMENSION)?;
        Ok(Dense {
            kind,
            dims: dims.to_vec(),
            len,
            storage: Storage::zeroed(bytes)?,
            shares: 0,
        })
    }

    fn duplicate(&self) -> Result<Self, ErrorCode> {
        Ok(Dense {
            kind: self.kind,
            dims: self.dims.clone(),
            len: self.len,
            storage: self.storage.duplicate()?,
            shares: 0,
        })
    }

    /// Copy of `self` with every element converted to `kind`
    fn converted(&self, kind: K, element_size: usize) -> Result<Self, ErrorCode> {
        let out = Dense::new(kind, element_size, &self.dims)?;
        let (from, to) = (self.kind.into(), kind.into());
        for i in 0..self.len {
            // SAFETY: both blocks hold `len` elements of their kinds
            unsafe {
                let v = load(self.storage.as_ptr(), from, i);
                store(out.storage.as_ptr(), to, i, v);
            }
        }
        Ok(out)
    }
}

#[derive(Default)]
struct Arena {
    next: u64,
    tensors: HashMap<u64, Dense<TensorKind>>,
    sparse: HashMap<u64, SparseEntry>,
    raws: HashMap<u64, Dense<DType>>,
    images: HashMap<u64, ImageEntry>,
}

impl Arena {
    fn id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

/// Host runtime backed by the process heap
#[derive(Default)]
pub struct MemoryRuntime {
    arena: RefCell<Arena>,
    abort: Cell<bool>,
    budget: Cell<Option<usize>>,
    messages: RefCell<Vec<(Severity, String)>>,
    printed: RefCell<Vec<String>>,
}

impl MemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise or clear the abort flag seen by [`Session::abort_requested`]
    pub fn set_abort(&self, abort: bool) {
        self.abort.set(abort);
    }

    /// Let only `budget` more allocations succeed; `None` removes the limit
    pub fn set_allocation_budget(&self, budget: Option<usize>) {
        self.budget.set(budget);
    }

    /// Messages issued so far, oldest first
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.borrow().clone()
    }

    /// Printed lines, oldest first
    pub fn printed(&self) -> Vec<String> {
        self.printed.borrow().clone()
    }

    /// Number of live handles of every family, including sparse components
    pub fn live_handles(&self) -> usize {
        let arena = self.arena.borrow();
        arena.tensors.len() + arena.sparse.len() + arena.raws.len() + arena.images.len()
    }

    /// Record an additional shared owner, as the host does when it passes a handle shared
    pub fn share_tensor(&self, t: TensorHandle) {
        self.tensor_mut(t).shares += 1;
    }

    pub fn share_sparse(&self, s: SparseHandle) {
        self.sparse_mut(s).shares += 1;
    }

    pub fn share_raw(&self, r: RawArrayHandle) {
        self.raw_mut(r).shares += 1;
    }

    pub fn share_image(&self, im: ImageHandle) {
        self.image_mut(im).shares += 1;
    }

    fn charge(&self) -> Result<(), ErrorCode> {
        match self.budget.get() {
            Some(0) => Err(ErrorCode::MEMORY),
            Some(n) => {
                self.budget.set(Some(n - 1));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn insert_tensor(&self, dense: Dense<TensorKind>) -> TensorHandle {
        let mut arena = self.arena.borrow_mut();
        let id = arena.id();
        arena.tensors.insert(id, dense);
        TensorHandle::from_raw(id)
    }

    fn new_tensor(&self, kind: TensorKind, dims: &[usize]) -> Result<TensorHandle, ErrorCode> {
        self.charge()?;
        let dense = Dense::new(kind, kind.element_size(), dims)?;
        Ok(self.insert_tensor(dense))
    }

    fn tensor(&self, t: TensorHandle) -> Ref<'_, Dense<TensorKind>> {
        Ref::map(self.arena.borrow(), |a| {
            a.tensors
                .get(&t.into_raw())
                .unwrap_or_else(|| panic!("unknown tensor handle {:?}", t))
        })
    }

    fn tensor_mut(&self, t: TensorHandle) -> RefMut<'_, Dense<TensorKind>> {
        RefMut::map(self.arena.borrow_mut(), |a| {
            a.tensors
                .get_mut(&t.into_raw())
                .unwrap_or_else(|| panic!("unknown tensor handle {:?}", t))
        })
    }

    fn raw(&self, r: RawArrayHandle) -> Ref<'_, Dense<DType>> {
        Ref::map(self.arena.borrow(), |a| {
            a.raws
                .get(&r.into_raw())
                .unwrap_or_else(|| panic!("unknown raw array handle {:?}", r))
        })
    }

    fn raw_mut(&self, r: RawArrayHandle) -> RefMut<'_, Dense<DType>> {
        RefMut::map(self.arena.borrow_mut(), |a| {
            a.raws
                .get_mut(&r.into_raw())
                .unwrap_or_else(|| panic!("unknown raw array handle {:?}", r))
        })
    }

    fn insert_raw(&self, dense: Dense<DType>) -> RawArrayHandle {
        let mut arena = self.arena.borrow_mut();
        let id = arena.id();
        arena.raws.insert(id, dense);
        RawArrayHandle::from_raw(id)
    }
}

impl Session for MemoryRuntime {
    fn abort_requested(&self) -> bool {
        self.abort.get()
    }

    fn message(&self, text: &str, severity: Severity) {
        log::debug!("host message [{}]: {}", severity.tag(), text);
        self.messages
            .borrow_mut()
            .push((severity, text.to_string()));
    }

    fn print(&self, text: &str) {
        self.printed.borrow_mut().push(text.to_string());
    }
}

impl TensorFunctions for MemoryRuntime {
    fn tensor_new(&self, kind: TensorKind, dims: &[usize]) -> Result<TensorHandle, ErrorCode> {
        self.new_tensor(kind, dims)
    }

    fn tensor_free(&self, t: TensorHandle) {
        self.arena.borrow_mut().tensors.remove(&t.into_raw());
    }

    fn tensor_clone(&self, t: TensorHandle) -> Result<TensorHandle, ErrorCode> {
        self.charge()?;
        let copy = self.tensor(t).duplicate()?;
        Ok(self.insert_tensor(copy))
    }

    fn tensor_disown(&self, t: TensorHandle) {
        let mut dense = self.tensor_mut(t);
        dense.shares = dense.shares.saturating_sub(1);
    }

    fn tensor_disown_all(&self, t: TensorHandle) {
        self.tensor_mut(t).shares = 0;
    }

    fn tensor_share_count(&self, t: TensorHandle) -> usize {
        self.tensor(t).shares
    }

    fn tensor_type(&self, t: TensorHandle) -> i32 {
        self.tensor(t).kind.tag()
    }

    fn tensor_rank(&self, t: TensorHandle) -> usize {
        self.tensor(t).dims.len()
    }

    fn tensor_dimensions(&self, t: TensorHandle) -> Vec<usize> {
        self.tensor(t).dims.clone()
    }

    fn tensor_flattened_length(&self, t: TensorHandle) -> usize {
        self.tensor(t).len
    }

    fn tensor_data(&self, t: TensorHandle) -> *mut u8 {
        self.tensor(t).storage.as_ptr()
    }

    fn tensor_convert(
        &self,
        t: TensorHandle,
        kind: TensorKind,
    ) -> Result<TensorHandle, ErrorCode> {
        self.charge()?;
        let converted = self.tensor(t).converted(kind, kind.element_size())?;
        Ok(self.insert_tensor(converted))
    }
}

impl RawArrayFunctions for MemoryRuntime {
    fn raw_new(&self, dtype: DType, dims: &[usize]) -> Result<RawArrayHandle, ErrorCode> {
        self.charge()?;
        let dense = Dense::new(dtype, dtype.element_size(), dims)?;
        Ok(self.insert_raw(dense))
    }

    fn raw_free(&self, r: RawArrayHandle) {
        self.arena.borrow_mut().raws.remove(&r.into_raw());
    }

    fn raw_clone(&self, r: RawArrayHandle) -> Result<RawArrayHandle, ErrorCode> {
        self.charge()?;
        let copy = self.raw(r).duplicate()?;
        Ok(self.insert_raw(copy))
    }

    fn raw_disown(&self, r: RawArrayHandle) {
        let mut dense = self.raw_mut(r);
        dense.shares = dense.shares.saturating_sub(1);
    }

    fn raw_disown_all(&self, r: RawArrayHandle) {
        self.raw_mut(r).shares = 0;
    }

    fn raw_share_count(&self, r: RawArrayHandle) -> usize {
        self.raw(r).shares
    }

    fn raw_type(&self, r: RawArrayHandle) -> i32 {
        self.raw(r).kind.tag()
    }

    fn raw_rank(&self, r: RawArrayHandle) -> usize {
        self.raw(r).dims.len()
    }

    fn raw_dimensions(&self, r: RawArrayHandle) -> Vec<usize> {
        self.raw(r).dims.clone()
    }

    fn raw_flattened_length(&self, r: RawArrayHandle) -> usize {
        self.raw(r).len
    }

    fn raw_data(&self, r: RawArrayHandle) -> *mut u8 {
        self.raw(r).storage.as_ptr()
    }

    fn raw_convert(&self, r: RawArrayHandle, dtype: DType) -> Result<RawArrayHandle, ErrorCode> {
        self.charge()?;
        let converted = self.raw(r).converted(dtype, dtype.element_size())?;
        Ok(self.insert_raw(converted))
    }
}
