// cow\crates\cow_foundation\src/array.rs

//! 五轴稠密数组
//!
//! [`Array`] 持有一块 `n1*n2*n3*n4*n5` 个 `f64` 的对齐缓冲区（行主序），
//! 并缓存五个轴步长，使任意五轴坐标的地址为 `S0*i + S1*j + S2*k + S3*m + S4*n`。
//!
//! # 不变量
//!
//! - 缓冲区长度始终等于各轴长度之积
//! - 重塑不改变元素总数
//! - 拷贝为深拷贝；`std::mem::take` 转移缓冲区并把源重置为 0 元素的空数组
//!
//! # 示例
//!
//! ```
//! use cow_foundation::array::Array;
//! use cow_foundation::region::{Range, Region};
//!
//! let mut a = Array::from_extents(&[4, 3]).unwrap();
//! *a.get_mut(&[2, 1]).unwrap() = 7.0;
//!
//! let row = a.extract(&Region::new().with_range(0, Range::at(2))).unwrap();
//! assert_eq!(row.shape(), [1, 3, 1, 1, 1]);
//! assert_eq!(row.get(&[0, 1]).unwrap(), 7.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index as IndexOp, IndexMut};

use crate::ensure;
use crate::error::{CowError, CowResult};
use crate::memory::AlignedVec;
use crate::region::Region;
use crate::shape::{index_from, row_major_strides, shape_from, Index, Shape, ShapeExt, AXES};
use crate::view::{for_each_offset, View, ViewMut};

/// 五轴稠密 `f64` 数组
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArray", into = "RawArray")]
pub struct Array {
    shape: Shape,
    strides: [usize; AXES],
    data: AlignedVec<f64>,
}

/// 序列化表示：形状 + 行主序数据
#[derive(Serialize, Deserialize)]
struct RawArray {
    shape: Shape,
    data: Vec<f64>,
}

impl TryFrom<RawArray> for Array {
    type Error = CowError;

    fn try_from(raw: RawArray) -> CowResult<Self> {
        Array::from_vec(raw.shape, raw.data)
    }
}

impl From<Array> for RawArray {
    fn from(array: Array) -> Self {
        RawArray {
            shape: array.shape,
            data: array.data.into_vec(),
        }
    }
}

impl Default for Array {
    /// 0 元素的空数组，形状 `[0, 1, 1, 1, 1]`
    fn default() -> Self {
        Self::new([0, 1, 1, 1, 1])
    }
}

/// 区域拷贝方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyMode {
    /// 区域坐标位于源数组：`dst[k] = src[region(k)]`
    Extract,
    /// 区域坐标位于目标数组：`dst[region(k)] = src[k]`
    Insert,
}

impl Array {
    // ========================================================================
    // 构造
    // ========================================================================

    /// 按形状创建零初始化数组
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            strides: row_major_strides(&shape),
            data: AlignedVec::zeros(shape.volume()),
        }
    }

    /// 按 1–5 个轴长创建，缺省轴补 1
    pub fn from_extents(extents: &[usize]) -> CowResult<Self> {
        Ok(Self::new(shape_from(extents)?))
    }

    /// 由行主序数据创建
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> CowResult<Self> {
        CowError::check_size("array data", shape.volume(), data.len())?;
        Ok(Self {
            shape,
            strides: row_major_strides(&shape),
            data: AlignedVec::from_vec(data),
        })
    }

    /// 按坐标函数填充
    pub fn from_fn(shape: Shape, mut f: impl FnMut(Index) -> f64) -> Self {
        let mut array = Self::new(shape);
        let region = Region::whole(&shape);
        for (slot, index) in array
            .data
            .as_mut_slice()
            .iter_mut()
            .zip(crate::view::RegionCursor::new(&region))
        {
            *slot = f(index);
        }
        array
    }

    // ========================================================================
    // 形状查询
    // ========================================================================

    /// 元素总数
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 五轴形状
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// 某轴长度
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        self.shape[axis]
    }

    /// 行主序步长
    #[inline]
    pub fn strides(&self) -> [usize; AXES] {
        self.strides
    }

    /// 展示用的逻辑形状（去掉尾部长度为 1 的轴）
    pub fn logical_shape(&self) -> Vec<usize> {
        self.shape.logical()
    }

    /// 原始缓冲区（行主序）
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    /// 可变原始缓冲区
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data.as_mut_slice()
    }

    /// 转为 `Vec<f64>`
    pub fn into_vec(self) -> Vec<f64> {
        self.data.into_vec()
    }

    // ========================================================================
    // 寻址
    // ========================================================================

    /// 五轴坐标对应的缓冲区偏移（不检查边界）
    #[inline]
    pub fn offset(&self, index: &Index) -> usize {
        let s = &self.strides;
        s[0] * index[0] + s[1] * index[1] + s[2] * index[2] + s[3] * index[3] + s[4] * index[4]
    }

    /// 检查 1–5 个坐标并返回偏移
    pub fn checked_offset(&self, coords: &[usize]) -> CowResult<usize> {
        ensure!(!coords.is_empty(), CowError::invalid_input("至少需要 1 个坐标"));
        let index = index_from(coords)?;
        for (axis, (&i, &n)) in index.iter().zip(self.shape.iter()).enumerate() {
            CowError::check_index(axis, i, n)?;
        }
        Ok(self.offset(&index))
    }

    /// 按坐标读取
    pub fn get(&self, coords: &[usize]) -> CowResult<f64> {
        let offset = self.checked_offset(coords)?;
        Ok(self.data[offset])
    }

    /// 按坐标获取可变引用
    pub fn get_mut(&mut self, coords: &[usize]) -> CowResult<&mut f64> {
        let offset = self.checked_offset(coords)?;
        Ok(&mut self.data[offset])
    }

    /// 按线性偏移读取
    pub fn linear(&self, index: usize) -> CowResult<f64> {
        self.data
            .get(index)
            .copied()
            .ok_or_else(|| CowError::linear_out_of_bounds(index, self.len()))
    }

    /// 按线性偏移获取可变引用
    pub fn linear_mut(&mut self, index: usize) -> CowResult<&mut f64> {
        let len = self.len();
        self.data
            .get_mut(index)
            .ok_or_else(|| CowError::linear_out_of_bounds(index, len))
    }

    // ========================================================================
    // 区域操作
    // ========================================================================

    /// 只读视图
    pub fn view(&self, region: &Region) -> CowResult<View<'_>> {
        let resolved = region.resolve_within(&self.shape)?;
        Ok(View::new(self, resolved))
    }

    /// 可写视图
    pub fn view_mut(&mut self, region: &Region) -> CowResult<ViewMut<'_>> {
        let resolved = region.resolve_within(&self.shape)?;
        Ok(ViewMut::new(self, resolved))
    }

    /// 深拷贝区域为新数组
    pub fn extract(&self, region: &Region) -> CowResult<Array> {
        let resolved = region.resolve_within(&self.shape)?;
        let mut out = Array::new(resolved.shape());
        Self::copy_region(&mut out, self, &resolved, CopyMode::Extract);
        Ok(out)
    }

    /// 把 `source` 整体写入本数组的区域
    ///
    /// `source.shape()` 必须与解析后的区域形状完全一致。
    pub fn insert(&mut self, source: &Array, region: &Region) -> CowResult<()> {
        let resolved = region.resolve_within(&self.shape)?;
        if source.shape != resolved.shape() {
            return Err(CowError::shape_mismatch(
                "insert",
                resolved.shape(),
                source.shape,
            ));
        }
        Self::copy_region(self, source, &resolved, CopyMode::Insert);
        Ok(())
    }

    /// 区域拷贝：同一套五层遍历，两种对称的偏移规则
    fn copy_region(dst: &mut Array, src: &Array, region: &Region, mode: CopyMode) {
        let mut packed = 0usize;
        match mode {
            CopyMode::Extract => {
                let out = dst.data.as_mut_slice();
                let input = src.data.as_slice();
                for_each_offset(region, &src.strides, |offset| {
                    out[packed] = input[offset];
                    packed += 1;
                });
            }
            CopyMode::Insert => {
                let input = src.data.as_slice();
                let strides = dst.strides;
                let out = dst.data.as_mut_slice();
                for_each_offset(region, &strides, |offset| {
                    out[offset] = input[packed];
                    packed += 1;
                });
            }
        }
    }

    // ========================================================================
    // 变换
    // ========================================================================

    /// 轴序完全反转：`B(n, m, k, j, i) == A(i, j, k, m, n)`
    pub fn transpose(&self) -> Array {
        self.permute([4, 3, 2, 1, 0])
    }

    /// 交换两个轴，其余不变
    pub fn transpose_axes(&self, axis1: usize, axis2: usize) -> CowResult<Array> {
        CowError::check_axis(axis1, AXES)?;
        CowError::check_axis(axis2, AXES)?;
        let mut perm = [0, 1, 2, 3, 4];
        perm.swap(axis1, axis2);
        Ok(self.permute(perm))
    }

    /// 结果的第 `d` 轴取自源的第 `perm[d]` 轴
    fn permute(&self, perm: [usize; AXES]) -> Array {
        let shape = perm.map(|p| self.shape[p]);
        let mut out = Array::new(shape);
        let region = Region::whole(&self.shape);
        for (value, index) in self
            .data
            .iter()
            .zip(crate::view::RegionCursor::new(&region))
        {
            let target = perm.map(|p| index[p]);
            let offset = out.offset(&target);
            out.data[offset] = *value;
        }
        out
    }

    /// 原地重解释形状，元素总数必须不变
    pub fn reshape(&mut self, extents: &[usize]) -> CowResult<()> {
        let shape = shape_from(extents)?;
        ensure!(
            shape.volume() == self.len(),
            CowError::reshape_size(self.len(), shape.volume())
        );
        self.shape = shape;
        self.strides = row_major_strides(&shape);
        Ok(())
    }

    /// 逐元素映射为同形状的新数组
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Array {
        Array {
            shape: self.shape,
            strides: self.strides,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// 全部元素置为 `value`
    pub fn fill(&mut self, value: f64) {
        self.data.as_mut_slice().fill(value);
    }

    /// 迭代全部元素（行主序）
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }
}

// ============================================================================
// 运算符
// ============================================================================

impl IndexOp<usize> for Array {
    type Output = f64;

    /// 线性索引，越界 panic
    fn index(&self, index: usize) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<usize> for Array {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.data[index]
    }
}

impl IndexOp<Index> for Array {
    type Output = f64;

    /// 五轴索引，越界 panic 并指出出错的轴
    fn index(&self, index: Index) -> &f64 {
        match self.checked_offset(&index) {
            Ok(offset) => &self.data[offset],
            Err(err) => panic!("{}", err),
        }
    }
}

impl IndexMut<Index> for Array {
    fn index_mut(&mut self, index: Index) -> &mut f64 {
        match self.checked_offset(&index) {
            Ok(offset) => &mut self.data[offset],
            Err(err) => panic!("{}", err),
        }
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape)
            .field("len", &self.len())
            .finish()
    }
}

impl<'a> From<View<'a>> for Array {
    fn from(view: View<'a>) -> Self {
        view.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Range;

    fn filled(extents: &[usize]) -> Array {
        let mut a = Array::from_extents(extents).unwrap();
        for (n, x) in a.as_mut_slice().iter_mut().enumerate() {
            *x = n as f64;
        }
        a
    }

    #[test]
    fn test_new_is_zeroed() {
        let a = Array::from_extents(&[3, 4]).unwrap();
        assert_eq!(a.len(), 12);
        assert_eq!(a.shape(), [3, 4, 1, 1, 1]);
        assert!(a.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_linear_and_multi_axis_agree() {
        let a = filled(&[2, 3, 4, 5, 6]);
        let s = a.shape();
        let mut n = 0;
        for i in 0..s[0] {
            for j in 0..s[1] {
                for k in 0..s[2] {
                    for m in 0..s[3] {
                        for l in 0..s[4] {
                            assert_eq!(a.get(&[i, j, k, m, l]).unwrap(), a.linear(n).unwrap());
                            n += 1;
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_bounds_errors_name_axis() {
        let a = Array::from_extents(&[4, 5, 6]).unwrap();
        let err = a.get(&[1, 5, 0]).unwrap_err();
        assert!(matches!(
            err,
            CowError::IndexOutOfBounds {
                axis: 1,
                index: 5,
                len: 5
            }
        ));
        assert!(matches!(
            a.linear(120),
            Err(CowError::LinearIndexOutOfBounds { index: 120, len: 120 })
        ));
    }

    #[test]
    fn test_empty_coordinates_rejected() {
        let mut a = Array::from_extents(&[3, 2]).unwrap();
        assert!(matches!(a.get(&[]), Err(CowError::InvalidInput { .. })));
        assert!(a.get_mut(&[]).is_err());
        assert_eq!(a.get(&[0]).unwrap(), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_index_operator_panics_out_of_range() {
        let a = Array::from_extents(&[2, 2]).unwrap();
        let _ = a[[2, 0, 0, 0, 0]];
    }

    #[test]
    fn test_extract_shape_matches_region() {
        let a = filled(&[6, 7, 8]);
        let r = Region::new()
            .with_range(0, Range::new(1, -1, 2))
            .with_range(2, Range::new(-3, 0, 1));
        let e = a.extract(&r).unwrap();
        assert_eq!(e.shape(), r.absolute(&a.shape()).unwrap().shape());
        assert_eq!(e.shape(), [2, 7, 3, 1, 1]);
        // e(1, 2, 0) == a(3, 2, 5)
        assert_eq!(e.get(&[1, 2, 0]).unwrap(), a.get(&[3, 2, 5]).unwrap());
    }

    #[test]
    fn test_extract_insert_roundtrip() {
        let a = filled(&[5, 6, 7]);
        let r = Region::new()
            .with_range(1, Range::new(1, 5, 2))
            .with_range(2, Range::new(2, 0, 1));
        let piece = a.extract(&r).unwrap();

        let mut b = Array::new(a.shape());
        b.insert(&piece, &r).unwrap();
        assert_eq!(b.extract(&r).unwrap(), piece);

        let mut c = a.clone();
        c.insert(&piece, &r).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_insert_shape_mismatch() {
        let mut a = Array::from_extents(&[12, 12, 12]).unwrap();
        let src = Array::from_extents(&[2, 12, 12]).unwrap();
        let r = Region::new().with_lower(0, 6).with_upper(0, 7);
        let err = a.insert(&src, &r).unwrap_err();
        assert!(matches!(err, CowError::ShapeMismatch { operation: "insert", .. }));
    }

    #[test]
    fn test_transpose_reverses_axes() {
        let a = filled(&[2, 3, 4, 5, 6]);
        let t = a.transpose();
        assert_eq!(t.shape(), [6, 5, 4, 3, 2]);
        assert_eq!(t.get(&[5, 4, 3, 2, 1]).unwrap(), a.get(&[1, 2, 3, 4, 5]).unwrap());
        assert_eq!(t.transpose(), a);
    }

    #[test]
    fn test_transpose_axes_twice_is_identity() {
        let a = filled(&[12, 13, 14]);
        let t = a.transpose_axes(0, 1).unwrap();
        assert_eq!(t.shape(), [13, 12, 14, 1, 1]);
        assert_eq!(t.get(&[3, 7, 2]).unwrap(), a.get(&[7, 3, 2]).unwrap());

        let back = t.transpose_axes(0, 1).unwrap();
        for n in 0..a.len() {
            assert_eq!(back[n], a[n]);
        }
        assert!(a.transpose_axes(0, 5).is_err());
    }

    #[test]
    fn test_reshape() {
        let mut a = filled(&[4, 6]);
        a.reshape(&[2, 3, 4]).unwrap();
        assert_eq!(a.shape(), [2, 3, 4, 1, 1]);
        assert_eq!(a.get(&[1, 2, 3]).unwrap(), 23.0);
        assert!(matches!(
            a.reshape(&[5, 5]),
            Err(CowError::ReshapeSize { from: 24, to: 25 })
        ));
        assert_eq!(a.shape(), [2, 3, 4, 1, 1]);
    }

    #[test]
    fn test_map_leaves_source() {
        let a = filled(&[3, 3]);
        let b = a.map(|x| 2.0 * x + 1.0);
        assert_eq!(b.shape(), a.shape());
        assert_eq!(b[4], 9.0);
        assert_eq!(a[4], 4.0);
    }

    #[test]
    fn test_take_resets_source() {
        let mut a = Array::from_extents(&[128]).unwrap();
        let b = std::mem::take(&mut a);
        assert_eq!(a.len(), 0);
        assert_eq!(a.shape(), [0, 1, 1, 1, 1]);
        assert_eq!(b.len(), 128);
    }

    #[test]
    fn test_clone_is_deep() {
        let a = filled(&[4]);
        let mut b = a.clone();
        b[0] = -1.0;
        assert_eq!(a[0], 0.0);
    }

    #[test]
    fn test_serde_roundtrip_restores_strides() {
        let a = filled(&[3, 4, 5]);
        let json = serde_json::to_string(&a).unwrap();
        let b: Array = serde_json::from_str(&json).unwrap();
        assert_eq!(b.strides(), a.strides());
        assert_eq!(b, a);
    }

    #[test]
    fn test_serde_rejects_bad_length() {
        let json = r#"{"shape":[2,2,1,1,1],"data":[1.0,2.0,3.0]}"#;
        assert!(serde_json::from_str::<Array>(json).is_err());
    }

    #[test]
    fn test_from_fn_uses_coordinates() {
        let a = Array::from_fn([2, 3, 1, 1, 1], |[i, j, ..]| (10 * i + j) as f64);
        assert_eq!(a.get(&[1, 2]).unwrap(), 12.0);
        assert_eq!(a.logical_shape(), vec![2, 3]);
    }
}
