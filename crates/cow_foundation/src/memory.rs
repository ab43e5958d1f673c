//! Aligned element storage.
//!
//! Provides a truly aligned, zero-initialized buffer backed by std::alloc,
//! used as the owning storage of [`crate::array::Array`]. Includes Serde support.

use bytemuck::Pod;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Alignment requirement.
pub trait Alignment: 'static {
    /// Requested byte alignment.
    const ALIGN: usize;
}

/// CPU alignment (64-byte cache line / AVX-512).
#[derive(Debug, Clone, Copy)]
pub struct CpuAlign;
impl Alignment for CpuAlign {
    const ALIGN: usize = 64;
}

/// Default alignment (8-byte).
#[derive(Debug, Clone, Copy)]
pub struct DefaultAlign;
impl Alignment for DefaultAlign {
    const ALIGN: usize = 8;
}

/// 对齐连续缓冲区（定长）
pub struct AlignedVec<T: Pod + Default, A: Alignment = CpuAlign> {
    ptr: *mut T,
    len: usize,
    _align: PhantomData<A>,
}

unsafe impl<T: Pod + Default + Send, A: Alignment> Send for AlignedVec<T, A> {}
unsafe impl<T: Pod + Default + Sync, A: Alignment> Sync for AlignedVec<T, A> {}

impl<T: Pod + Default, A: Alignment> AlignedVec<T, A> {
    /// Create zero-initialized buffer of length len.
    pub fn zeros(len: usize) -> Self {
        if len == 0 || std::mem::size_of::<T>() == 0 {
            return Self::default();
        }

        let layout = Self::layout_for(len);
        let ptr = unsafe { alloc_zeroed(layout) as *mut T };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }

        debug_assert_eq!((ptr as usize) % layout.align(), 0, "Alignment guarantee violated");

        Self { ptr, len, _align: PhantomData }
    }

    /// Copy an existing slice into a fresh aligned buffer.
    pub fn from_slice(values: &[T]) -> Self {
        let mut aligned = Self::zeros(values.len());
        aligned.as_mut_slice().copy_from_slice(values);
        aligned
    }

    /// Re-align from an existing Vec.
    pub fn from_vec(vec: Vec<T>) -> Self {
        Self::from_slice(&vec)
    }

    /// Raw pointer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    /// Length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Empty check.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Immutable slice view.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    /// Mutable slice view.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.len == 0 {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
        }
    }

    /// Convert into Vec.
    pub fn into_vec(self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    #[inline]
    fn layout_for(len: usize) -> Layout {
        let size = len
            .checked_mul(std::mem::size_of::<T>())
            .unwrap_or_else(|| panic!("AlignedVec: {} elements overflow usize", len));
        match Layout::from_size_align(size, A::ALIGN.max(std::mem::align_of::<T>())) {
            Ok(layout) => layout,
            Err(_) => panic!("AlignedVec: invalid layout for {} elements", len),
        }
    }
}

impl<T: Pod + Default + std::fmt::Debug, A: Alignment> std::fmt::Debug for AlignedVec<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Pod + Default, A: Alignment> Deref for AlignedVec<T, A> {
    type Target = [T];
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T: Pod + Default, A: Alignment> DerefMut for AlignedVec<T, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: Pod + Default, A: Alignment> Clone for AlignedVec<T, A> {
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl<T: Pod + Default, A: Alignment> Default for AlignedVec<T, A> {
    fn default() -> Self {
        Self { ptr: std::ptr::null_mut(), len: 0, _align: PhantomData }
    }
}

impl<T: Pod + Default, A: Alignment> Drop for AlignedVec<T, A> {
    fn drop(&mut self) {
        if self.ptr.is_null() || self.len == 0 {
            return;
        }
        // Pod 元素无需逐个析构
        let layout = Self::layout_for(self.len);
        unsafe { dealloc(self.ptr as *mut u8, layout) };
    }
}

impl<T: Pod + Default + PartialEq, A: Alignment> PartialEq for AlignedVec<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Pod + Default, A: Alignment> FromIterator<T> for AlignedVec<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let vec: Vec<T> = iter.into_iter().collect();
        Self::from_vec(vec)
    }
}

impl<T: Pod + Default + Serialize, A: Alignment> Serialize for AlignedVec<T, A> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_slice().serialize(serializer)
    }
}

impl<'de, T: Pod + Default + Deserialize<'de>, A: Alignment> Deserialize<'de> for AlignedVec<T, A> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let vec = Vec::<T>::deserialize(deserializer)?;
        Ok(Self::from_vec(vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_vec_basic() {
        let mut vec: AlignedVec<f64, CpuAlign> = AlignedVec::zeros(10);
        assert_eq!(vec.len(), 10);
        assert!(vec.iter().all(|&v| v == 0.0));
        vec[0] = 1.5;
        assert!((vec[0] - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_aligned_vec_empty() {
        let vec: AlignedVec<f64, CpuAlign> = AlignedVec::zeros(0);
        assert!(vec.is_empty());
        assert_eq!(vec.as_slice(), &[] as &[f64]);
        let cloned = vec.clone();
        assert!(cloned.is_empty());
    }

    #[test]
    fn test_aligned_vec_from_iter() {
        let vec: AlignedVec<f64, DefaultAlign> = (0..5).map(f64::from).collect();
        assert_eq!(vec.len(), 5);
        assert_eq!(vec[4], 4.0);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut v1: AlignedVec<f64, CpuAlign> = AlignedVec::zeros(5);
        v1[0] = 3.25;
        let mut v2 = v1.clone();
        v2[0] = 0.0;
        assert_eq!(v1[0], 3.25);
        assert_ne!(v1.as_ptr(), v2.as_ptr());
    }

    #[test]
    fn test_aligned_vec_alignment() {
        let vec: AlignedVec<f64, CpuAlign> = AlignedVec::zeros(100);
        assert_eq!((vec.as_ptr() as usize) % 64, 0);
    }

    #[test]
    fn test_aligned_vec_serde_roundtrip() {
        let v: AlignedVec<f64, CpuAlign> = AlignedVec::from_vec(vec![1.0, 2.0, 3.5]);
        let json = serde_json::to_string(&v).unwrap();
        let de: AlignedVec<f64, CpuAlign> = serde_json::from_str(&json).unwrap();
        assert_eq!(de, v);
    }
}
