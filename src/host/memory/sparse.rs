//! Compressed-row storage for the in-process runtime

use super::scalar::{Scalar, load, store};
use super::{Dense, MemoryRuntime};
use crate::error::ErrorCode;
use crate::host::{SparseFunctions, SparseHandle, TensorFunctions, TensorHandle};
use crate::types::TensorKind;
use std::cell::{Ref, RefMut};

pub(super) struct SparseEntry {
    dims: Vec<usize>,
    row_pointers: TensorHandle,
    column_indices: Option<TensorHandle>,
    explicit_values: Option<TensorHandle>,
    implicit: TensorHandle,
    pub(super) shares: usize,
}

impl SparseEntry {
    fn components(&self) -> impl Iterator<Item = TensorHandle> + '_ {
        [Some(self.row_pointers), self.column_indices, self.explicit_values, Some(self.implicit)]
            .into_iter()
            .flatten()
    }
}

/// One stored position (0-based) with its value
type Entry = (Vec<usize>, Scalar);

/// Number of CSR rows for an array of these dimensions
fn csr_rows(dims: &[usize]) -> usize {
    if dims.len() <= 1 { 1 } else { dims[0] }
}

/// Column-index width: one index per non-row axis
fn csr_width(dims: &[usize]) -> usize {
    dims.len().saturating_sub(1).max(1)
}

fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for axis in (0..dims.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * dims[axis + 1];
    }
    strides
}

fn ravel(pos: &[usize], strides: &[usize]) -> usize {
    pos.iter().zip(strides).map(|(p, s)| p * s).sum()
}

fn unravel(mut flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut pos = vec![0; dims.len()];
    for axis in (0..dims.len()).rev() {
        if dims[axis] > 0 {
            pos[axis] = flat % dims[axis];
            flat /= dims[axis];
        }
    }
    pos
}

impl MemoryRuntime {
    fn sparse(&self, s: SparseHandle) -> Ref<'_, SparseEntry> {
        Ref::map(self.arena.borrow(), |a| {
            a.sparse
                .get(&s.into_raw())
                .unwrap_or_else(|| panic!("unknown sparse array handle {:?}", s))
        })
    }

    pub(super) fn sparse_mut(&self, s: SparseHandle) -> RefMut<'_, SparseEntry> {
        RefMut::map(self.arena.borrow_mut(), |a| {
            a.sparse
                .get_mut(&s.into_raw())
                .unwrap_or_else(|| panic!("unknown sparse array handle {:?}", s))
        })
    }

    fn scalars(&self, t: TensorHandle) -> (TensorKind, Vec<Scalar>) {
        let dense = self.tensor(t);
        let values = (0..dense.len)
            // SAFETY: the tensor holds `len` elements of its kind
            .map(|i| unsafe { load(dense.storage.as_ptr(), dense.kind.into(), i) })
            .collect();
        (dense.kind, values)
    }

    fn integers(&self, t: TensorHandle) -> Result<Vec<i64>, ErrorCode> {
        let (kind, values) = self.scalars(t);
        if kind != TensorKind::Integer {
            return Err(ErrorCode::TYPE);
        }
        Ok(values
            .into_iter()
            .map(|v| match v {
                Scalar::Int(i) => i as i64,
                other => other.to_real() as i64,
            })
            .collect())
    }

    fn tensor_of(
        &self,
        kind: TensorKind,
        dims: &[usize],
        values: &[Scalar],
    ) -> Result<TensorHandle, ErrorCode> {
        self.charge()?;
        let dense = Dense::new(kind, kind.element_size(), dims)?;
        for (i, v) in values.iter().enumerate() {
            // SAFETY: `values.len()` equals the product of `dims`
            unsafe { store(dense.storage.as_ptr(), kind.into(), i, *v) };
        }
        Ok(self.insert_tensor(dense))
    }

    fn implicit_scalar(&self, kind: TensorKind, implicit: Option<TensorHandle>) -> Scalar {
        let value = match implicit {
            Some(t) => {
                let dense = self.tensor(t);
                // SAFETY: a rank-0 tensor holds one element
                unsafe { load(dense.storage.as_ptr(), dense.kind.into(), 0) }
            }
            None => Scalar::Int(0),
        };
        value.cast(kind.into())
    }

    /// Build a sparse array from sorted, de-duplicated entries
    fn build_sparse(
        &self,
        kind: TensorKind,
        dims: Vec<usize>,
        entries: Vec<Entry>,
        implicit: Scalar,
        pattern: bool,
    ) -> Result<SparseHandle, ErrorCode> {
        let rows = csr_rows(&dims);
        let width = csr_width(&dims);
        let rank1 = dims.len() == 1;

        let mut counts = vec![0i128; rows + 1];
        let mut columns = Vec::with_capacity(entries.len() * width);
        let mut values = Vec::with_capacity(entries.len());
        for (pos, value) in &entries {
            let row = if rank1 { 0 } else { pos[0] };
            counts[row + 1] += 1;
            let rest = if rank1 { &pos[..] } else { &pos[1..] };
            columns.extend(rest.iter().map(|&c| Scalar::Int(c as i128 + 1)));
            values.push(*value);
        }
        for r in 0..rows {
            counts[r + 1] += counts[r];
        }
        let row_pointers: Vec<Scalar> = counts.into_iter().map(Scalar::Int).collect();

        let mut made = Vec::new();
        let result = (|| -> Result<SparseEntry, ErrorCode> {
            let rp = self.tensor_of(TensorKind::Integer, &[rows + 1], &row_pointers)?;
            made.push(rp);
            let iv = self.tensor_of(kind, &[], &[implicit])?;
            made.push(iv);
            let (ci, ev) = if pattern && entries.is_empty() {
                (None, None)
            } else {
                let ci =
                    self.tensor_of(TensorKind::Integer, &[entries.len(), width], &columns)?;
                made.push(ci);
                let ev = self.tensor_of(kind, &[entries.len()], &values)?;
                made.push(ev);
                (Some(ci), Some(ev))
            };
            self.charge()?;
            Ok(SparseEntry {
                dims: dims.clone(),
                row_pointers: rp,
                column_indices: ci,
                explicit_values: ev,
                implicit: iv,
                shares: 0,
            })
        })();

        match result {
            Ok(entry) => {
                let mut arena = self.arena.borrow_mut();
                let id = arena.id();
                arena.sparse.insert(id, entry);
                Ok(SparseHandle::from_raw(id))
            }
            Err(code) => {
                for t in made {
                    self.tensor_free(t);
                }
                Err(code)
            }
        }
    }

    /// Decode the stored entries of `s`; pattern arrays yield the implicit value
    fn entries(&self, s: SparseHandle) -> (TensorKind, Vec<usize>, Vec<Entry>, Scalar) {
        let (dims, rp, ci, ev, iv) = {
            let e = self.sparse(s);
            (
                e.dims.clone(),
                e.row_pointers,
                e.column_indices,
                e.explicit_values,
                e.implicit,
            )
        };
        let (kind, implicit) = {
            let (kind, v) = self.scalars(iv);
            (kind, v[0])
        };
        let rp = self.integers(rp).unwrap_or_default();
        let ci = ci
            .map(|ci| self.integers(ci).unwrap_or_default())
            .unwrap_or_default();
        let values = ev.map(|ev| self.scalars(ev).1);

        let width = csr_width(&dims);
        let rank1 = dims.len() == 1;
        let mut entries = Vec::new();
        for row in 0..rp.len().saturating_sub(1) {
            for k in rp[row] as usize..rp[row + 1] as usize {
                let cols = ci[k * width..(k + 1) * width].iter().map(|&c| (c - 1) as usize);
                let pos: Vec<usize> = if rank1 {
                    cols.collect()
                } else {
                    std::iter::once(row).chain(cols).collect()
                };
                let value = values.as_ref().map_or(implicit, |v| v[k]);
                entries.push((pos, value));
            }
        }
        (kind, dims, entries, implicit)
    }

    fn dense_scalars(&self, s: SparseHandle) -> (TensorKind, Vec<usize>, Vec<Scalar>) {
        let (kind, dims, entries, implicit) = self.entries(s);
        let len = dims.iter().product();
        let strides = strides(&dims);
        let mut out = vec![implicit; len];
        for (pos, value) in entries {
            out[ravel(&pos, &strides)] = value;
        }
        (kind, dims, out)
    }

    fn sparse_from_dense_values(
        &self,
        kind: TensorKind,
        dims: Vec<usize>,
        values: &[Scalar],
        implicit: Scalar,
    ) -> Result<SparseHandle, ErrorCode> {
        let entries = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != implicit)
            .map(|(i, v)| (unravel(i, &dims), *v))
            .collect();
        self.build_sparse(kind, dims, entries, implicit, false)
    }
}

impl SparseFunctions for MemoryRuntime {
    fn sparse_free(&self, s: SparseHandle) {
        let removed = self.arena.borrow_mut().sparse.remove(&s.into_raw());
        if let Some(entry) = removed {
            for t in entry.components() {
                self.tensor_free(t);
            }
        }
    }

    fn sparse_clone(&self, s: SparseHandle) -> Result<SparseHandle, ErrorCode> {
        let (kind, dims, entries, implicit) = self.entries(s);
        let pattern = self.sparse(s).explicit_values.is_none();
        self.build_sparse(kind, dims, entries, implicit, pattern)
    }

    fn sparse_disown(&self, s: SparseHandle) {
        let mut entry = self.sparse_mut(s);
        entry.shares = entry.shares.saturating_sub(1);
    }

    fn sparse_disown_all(&self, s: SparseHandle) {
        self.sparse_mut(s).shares = 0;
    }

    fn sparse_share_count(&self, s: SparseHandle) -> usize {
        self.sparse(s).shares
    }

    fn sparse_rank(&self, s: SparseHandle) -> usize {
        self.sparse(s).dims.len()
    }

    fn sparse_dimensions(&self, s: SparseHandle) -> Vec<usize> {
        self.sparse(s).dims.clone()
    }

    fn sparse_row_pointers(&self, s: SparseHandle) -> TensorHandle {
        self.sparse(s).row_pointers
    }

    fn sparse_column_indices(&self, s: SparseHandle) -> Option<TensorHandle> {
        self.sparse(s).column_indices
    }

    fn sparse_set_column_indices(&self, s: SparseHandle, ci: TensorHandle) {
        let old = self.sparse_mut(s).column_indices.replace(ci);
        if let Some(old) = old.filter(|&old| old != ci) {
            self.tensor_free(old);
        }
    }

    fn sparse_explicit_values(&self, s: SparseHandle) -> Option<TensorHandle> {
        self.sparse(s).explicit_values
    }

    fn sparse_set_explicit_values(&self, s: SparseHandle, ev: TensorHandle) {
        let old = self.sparse_mut(s).explicit_values.replace(ev);
        if let Some(old) = old.filter(|&old| old != ev) {
            self.tensor_free(old);
        }
    }

    fn sparse_implicit_value(&self, s: SparseHandle) -> TensorHandle {
        self.sparse(s).implicit
    }

    fn sparse_explicit_positions(&self, s: SparseHandle) -> Result<TensorHandle, ErrorCode> {
        let (_, dims, entries, _) = self.entries(s);
        if entries.is_empty() {
            // the host answers an empty query with a rank-0 tensor
            return self.tensor_of(TensorKind::Integer, &[], &[Scalar::Int(0)]);
        }
        let flat: Vec<Scalar> = entries
            .iter()
            .flat_map(|(pos, _)| pos.iter().map(|&p| Scalar::Int(p as i128 + 1)))
            .collect();
        self.tensor_of(TensorKind::Integer, &[entries.len(), dims.len()], &flat)
    }

    fn sparse_from_explicit_positions(
        &self,
        positions: TensorHandle,
        values: TensorHandle,
        dims: TensorHandle,
        implicit: Option<TensorHandle>,
    ) -> Result<SparseHandle, ErrorCode> {
        let dims: Vec<usize> = self
            .integers(dims)?
            .into_iter()
            .map(|d| usize::try_from(d).map_err(|_| ErrorCode::DIMENSION))
            .collect::<Result<_, _>>()?;
        if dims.is_empty() {
            return Err(ErrorCode::RANK);
        }
        let pos_dims = self.tensor_dimensions(positions);
        let (kind, vals) = self.scalars(values);
        let count = vals.len();
        let flat = self.integers(positions)?;
        if count > 0 && (pos_dims.len() != 2 || pos_dims[1] != dims.len()) {
            return Err(ErrorCode::RANK);
        }
        if flat.len() != count * dims.len() {
            return Err(ErrorCode::DIMENSION);
        }

        let mut entries: Vec<Entry> = Vec::with_capacity(count);
        for (k, value) in vals.into_iter().enumerate() {
            let pos = flat[k * dims.len()..(k + 1) * dims.len()]
                .iter()
                .zip(&dims)
                .map(|(&p, &d)| {
                    if p >= 1 && (p as usize) <= d {
                        Ok(p as usize - 1)
                    } else {
                        Err(ErrorCode::DIMENSION)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            entries.push((pos, value));
        }
        // first occurrence of a repeated position wins
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|later, earlier| later.0 == earlier.0);

        let implicit = self.implicit_scalar(kind, implicit);
        self.build_sparse(kind, dims, entries, implicit, true)
    }

    fn sparse_from_tensor(
        &self,
        t: TensorHandle,
        implicit: Option<TensorHandle>,
    ) -> Result<SparseHandle, ErrorCode> {
        let dims = self.tensor_dimensions(t);
        if dims.is_empty() {
            return Err(ErrorCode::RANK);
        }
        let (kind, values) = self.scalars(t);
        let implicit = self.implicit_scalar(kind, implicit);
        self.sparse_from_dense_values(kind, dims, &values, implicit)
    }

    fn sparse_to_tensor(&self, s: SparseHandle) -> Result<TensorHandle, ErrorCode> {
        let (kind, dims, values) = self.dense_scalars(s);
        self.tensor_of(kind, &dims, &values)
    }

    fn sparse_reset_implicit_value(
        &self,
        s: SparseHandle,
        implicit: Option<TensorHandle>,
    ) -> Result<SparseHandle, ErrorCode> {
        match implicit {
            None => {
                let (kind, dims, entries, implicit) = self.entries(s);
                let pattern = self.sparse(s).explicit_values.is_none();
                let kept = if pattern {
                    entries
                } else {
                    entries.into_iter().filter(|(_, v)| *v != implicit).collect()
                };
                self.build_sparse(kind, dims, kept, implicit, pattern)
            }
            Some(iv) => {
                let (kind, dims, values) = self.dense_scalars(s);
                let implicit = self.implicit_scalar(kind, Some(iv));
                self.sparse_from_dense_values(kind, dims, &values, implicit)
            }
        }
    }
}
