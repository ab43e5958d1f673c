// cow\crates\cow_foundation\src/view.rs

//! 区域视图与里程表游标
//!
//! - [`RegionCursor`]: 按行主序逐点访问绝对区域，轴 4 最快，溢出时向慢轴进位
//! - [`View`] / [`ViewMut`]: 借用数组的只读/可写区域视图，生命周期绑定到数组
//! - [`for_each_offset`]: 区域拷贝和交换布局共用的五层偏移遍历
//!
//! # 示例
//!
//! ```
//! use cow_foundation::array::Array;
//! use cow_foundation::region::{Range, Region};
//!
//! let mut a = Array::from_extents(&[4, 4]).unwrap();
//! a.view_mut(&Region::new().with_range(1, Range::at(0)))
//!     .unwrap()
//!     .fill(1.0);
//!
//! let column = a.view(&Region::new().with_range(1, Range::at(0))).unwrap();
//! assert_eq!(column.values().sum::<f64>(), 4.0);
//! ```

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::array::Array;
use crate::error::{CowError, CowResult};
use crate::region::Region;
use crate::shape::{Index, Shape, AXES};

// ============================================================================
// 偏移遍历
// ============================================================================

/// 按行主序访问绝对区域内每一点的缓冲区偏移
///
/// 每轴恰好访问 `size()` 个位置 `lower + stride * k`。
/// 区域为空（任一轴长度为 0）时不调用 `visit`。
#[inline]
pub fn for_each_offset(region: &Region, strides: &[usize; AXES], mut visit: impl FnMut(usize)) {
    let r = region.ranges();
    let n = region.shape();
    if n.contains(&0) {
        return;
    }
    for a in 0..n[0] {
        let o0 = r[0].position(a) * strides[0];
        for b in 0..n[1] {
            let o1 = o0 + r[1].position(b) * strides[1];
            for c in 0..n[2] {
                let o2 = o1 + r[2].position(c) * strides[2];
                for d in 0..n[3] {
                    let o3 = o2 + r[3].position(d) * strides[3];
                    for e in 0..n[4] {
                        visit(o3 + r[4].position(e) * strides[4]);
                    }
                }
            }
        }
    }
}

// ============================================================================
// 游标
// ============================================================================

/// 区域里程表游标
///
/// 状态机：当前位置 + 是否耗尽。`advance` 推进最快轴，
/// 越过该轴长度时归零并向前一轴进位；最慢轴溢出后游标耗尽。
#[derive(Debug, Clone)]
pub struct RegionCursor {
    region: Region,
    sizes: Shape,
    steps: [usize; AXES],
    remaining: usize,
}

impl RegionCursor {
    /// 在绝对区域上创建游标
    pub fn new(region: &Region) -> Self {
        Self {
            region: *region,
            sizes: region.shape(),
            steps: [0; AXES],
            remaining: region.volume(),
        }
    }

    /// 是否已耗尽
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// 当前坐标（耗尽时为 `None`）
    pub fn index(&self) -> Option<Index> {
        if self.is_exhausted() {
            return None;
        }
        let mut index = [0; AXES];
        for (axis, slot) in index.iter_mut().enumerate() {
            *slot = self.region.range(axis).position(self.steps[axis]);
        }
        Some(index)
    }

    /// 推进一步并返回新位置
    pub fn advance(&mut self) -> Option<Index> {
        if self.is_exhausted() {
            return None;
        }
        self.remaining -= 1;
        for axis in (0..AXES).rev() {
            self.steps[axis] += 1;
            if self.steps[axis] < self.sizes[axis] {
                break;
            }
            self.steps[axis] = 0;
        }
        self.index()
    }

    /// 遍历的区域
    pub fn region(&self) -> &Region {
        &self.region
    }
}

impl Iterator for RegionCursor {
    type Item = Index;

    fn next(&mut self) -> Option<Index> {
        let current = self.index()?;
        self.advance();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RegionCursor {}
impl FusedIterator for RegionCursor {}

#[inline]
fn offset_of(strides: &[usize; AXES], index: &Index) -> usize {
    strides.iter().zip(index).map(|(s, i)| s * i).sum()
}

// ============================================================================
// 只读视图
// ============================================================================

/// 只读区域视图
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    array: &'a Array,
    region: Region,
}

impl<'a> View<'a> {
    pub(crate) fn new(array: &'a Array, region: Region) -> Self {
        Self { array, region }
    }

    /// 解析后的绝对区域
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// 视图形状
    pub fn shape(&self) -> Shape {
        self.region.shape()
    }

    /// 视图内元素数
    pub fn len(&self) -> usize {
        self.region.volume()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 逐元素迭代
    pub fn iter(&self) -> Iter<'a> {
        Iter {
            data: self.array.as_slice(),
            strides: self.array.strides(),
            cursor: RegionCursor::new(&self.region),
        }
    }

    /// 逐值迭代
    pub fn values(&self) -> impl Iterator<Item = f64> + 'a {
        self.iter().map(|e| e.value())
    }

    /// 深拷贝为新数组
    pub fn to_array(&self) -> Array {
        let mut out = Array::new(self.shape());
        for (slot, value) in out.as_mut_slice().iter_mut().zip(self.values()) {
            *slot = value;
        }
        out
    }
}

impl<'a> IntoIterator for View<'a> {
    type Item = Element<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// 视图中的一个元素
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    data: &'a [f64],
    index: Index,
    offset: usize,
}

impl Element<'_> {
    /// 五轴坐标
    #[inline]
    pub fn index(&self) -> Index {
        self.index
    }

    /// 缓冲区偏移
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 元素值
    #[inline]
    pub fn value(&self) -> f64 {
        self.data[self.offset]
    }

    /// 缓冲区中向后第 `k` 个元素（越出缓冲区为 `None`）
    #[inline]
    pub fn ahead(&self, k: usize) -> Option<f64> {
        self.data.get(self.offset + k).copied()
    }
}

/// [`View::iter`] 返回的迭代器
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    data: &'a [f64],
    strides: [usize; AXES],
    cursor: RegionCursor,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Element<'a>> {
        let index = self.cursor.next()?;
        Some(Element {
            data: self.data,
            index,
            offset: offset_of(&self.strides, &index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

// ============================================================================
// 可写视图
// ============================================================================

/// 可写区域视图
#[derive(Debug)]
pub struct ViewMut<'a> {
    array: &'a mut Array,
    region: Region,
}

impl<'a> ViewMut<'a> {
    pub(crate) fn new(array: &'a mut Array, region: Region) -> Self {
        Self { array, region }
    }

    /// 解析后的绝对区域
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// 视图形状
    pub fn shape(&self) -> Shape {
        self.region.shape()
    }

    /// 视图内元素数
    pub fn len(&self) -> usize {
        self.region.volume()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 重新借用为只读视图
    pub fn as_view(&self) -> View<'_> {
        View::new(self.array, self.region)
    }

    /// 整块写入，形状须与视图一致
    pub fn assign(&mut self, source: &Array) -> CowResult<()> {
        self.array.insert(source, &self.region)
    }

    /// 从另一数组的视图逐元素拷贝
    pub fn assign_view(&mut self, source: &View<'_>) -> CowResult<()> {
        if source.shape() != self.shape() {
            return Err(CowError::shape_mismatch(
                "assign_view",
                self.shape(),
                source.shape(),
            ));
        }
        for (slot, value) in self.iter_mut().zip(source.values()) {
            *slot = value;
        }
        Ok(())
    }

    /// 视图内全部元素置为 `value`
    pub fn fill(&mut self, value: f64) {
        let strides = self.array.strides();
        let data = self.array.as_mut_slice();
        for_each_offset(&self.region, &strides, |offset| data[offset] = value);
    }

    /// 可变逐元素迭代
    pub fn iter_mut(&mut self) -> IterMut<'_> {
        let strides = self.array.strides();
        let data = self.array.as_mut_slice();
        IterMut {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            strides,
            cursor: RegionCursor::new(&self.region),
            _marker: PhantomData,
        }
    }
}

/// [`ViewMut::iter_mut`] 返回的迭代器
pub struct IterMut<'a> {
    ptr: *mut f64,
    len: usize,
    strides: [usize; AXES],
    cursor: RegionCursor,
    _marker: PhantomData<&'a mut f64>,
}

impl<'a> Iterator for IterMut<'a> {
    type Item = &'a mut f64;

    fn next(&mut self) -> Option<&'a mut f64> {
        let index = self.cursor.next()?;
        let offset = offset_of(&self.strides, &index);
        assert!(offset < self.len, "视图偏移 {} 越出缓冲区 {}", offset, self.len);
        // SAFETY: 区域已在构造视图时确认落在数组内，游标对每个坐标只产出一次，
        // 行主序步长使不同坐标映射到不同偏移，因此返回的引用互不重叠。
        Some(unsafe { &mut *self.ptr.add(offset) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl ExactSizeIterator for IterMut<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Range;

    fn counting(extents: &[usize]) -> Array {
        let mut a = Array::from_extents(extents).unwrap();
        for (n, x) in a.as_mut_slice().iter_mut().enumerate() {
            *x = n as f64;
        }
        a
    }

    #[test]
    fn test_cursor_odometer_order() {
        let region = Region::whole(&[2, 3, 1, 1, 1]);
        let visited: Vec<Index> = RegionCursor::new(&region).collect();
        assert_eq!(visited.len(), 6);
        assert_eq!(visited[0], [0, 0, 0, 0, 0]);
        assert_eq!(visited[2], [0, 2, 0, 0, 0]);
        assert_eq!(visited[3], [1, 0, 0, 0, 0]);
        assert_eq!(visited[5], [1, 2, 0, 0, 0]);
    }

    #[test]
    fn test_cursor_strided_positions() {
        let region = Region::new()
            .with_range(0, Range::new(1, 6, 2))
            .absolute(&[7, 1, 1, 1, 1])
            .unwrap();
        let rows: Vec<usize> = RegionCursor::new(&region).map(|i| i[0]).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_cursor_advance_reports_exhaustion() {
        let region = Region::whole(&[1, 2, 1, 1, 1]);
        let mut cursor = RegionCursor::new(&region);
        assert_eq!(cursor.index(), Some([0, 0, 0, 0, 0]));
        assert_eq!(cursor.advance(), Some([0, 1, 0, 0, 0]));
        assert_eq!(cursor.advance(), None);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn test_empty_region_visits_nothing() {
        let region = Region::new().with_stride(1, 0).absolute(&[3, 3, 1, 1, 1]).unwrap();
        assert_eq!(RegionCursor::new(&region).count(), 0);
        let mut hits = 0;
        for_each_offset(&region, &[3, 1, 1, 1, 1], |_| hits += 1);
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_cursor_agrees_with_offset_walk() {
        let a = counting(&[4, 5, 6]);
        let region = Region::new()
            .with_range(1, Range::new(1, 5, 3))
            .with_range(2, Range::new(-4, -1, 1))
            .resolve_within(&a.shape())
            .unwrap();
        let mut walked = Vec::new();
        for_each_offset(&region, &a.strides(), |o| walked.push(o));
        let cursored: Vec<usize> = RegionCursor::new(&region).map(|i| a.offset(&i)).collect();
        assert_eq!(walked, cursored);
    }

    #[test]
    fn test_view_iter_elements() {
        let a = counting(&[3, 4]);
        let view = a.view(&Region::new().with_range(0, Range::at(1))).unwrap();
        assert_eq!(view.shape(), [1, 4, 1, 1, 1]);
        let first = view.iter().next().unwrap();
        assert_eq!(first.index(), [1, 0, 0, 0, 0]);
        assert_eq!(first.value(), 4.0);
        assert_eq!(first.ahead(1), Some(5.0));
        assert_eq!(first.ahead(100), None);
        assert_eq!(view.values().collect::<Vec<_>>(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_view_to_array_matches_extract() {
        let a = counting(&[5, 5, 5]);
        let r = Region::new().with_range(2, Range::new(0, 5, 2));
        assert_eq!(a.view(&r).unwrap().to_array(), a.extract(&r).unwrap());
    }

    #[test]
    fn test_view_mut_fill_and_iter_mut() {
        let mut a = Array::from_extents(&[4, 4]).unwrap();
        let border = Region::new().with_range(0, Range::new(-1, 0, 1));
        a.view_mut(&border).unwrap().fill(2.0);
        for x in a.view_mut(&Region::new().with_range(0, Range::at(0))).unwrap().iter_mut() {
            *x += 1.0;
        }
        assert_eq!(a.get(&[3, 2]).unwrap(), 2.0);
        assert_eq!(a.get(&[0, 2]).unwrap(), 1.0);
        assert_eq!(a.get(&[1, 2]).unwrap(), 0.0);
    }

    #[test]
    fn test_assign_and_assign_view() {
        let src = counting(&[2, 3]);
        let mut dst = Array::from_extents(&[4, 3]).unwrap();
        let top = Region::new().with_range(0, Range::new(0, 2, 1));
        let bottom = Region::new().with_range(0, Range::new(2, 4, 1));

        dst.view_mut(&top).unwrap().assign(&src).unwrap();
        dst.view_mut(&bottom)
            .unwrap()
            .assign_view(&src.view(&Region::new()).unwrap())
            .unwrap();
        assert_eq!(dst.get(&[1, 2]).unwrap(), 5.0);
        assert_eq!(dst.get(&[3, 2]).unwrap(), 5.0);

        let wrong = Array::from_extents(&[3, 3]).unwrap();
        assert!(dst.view_mut(&top).unwrap().assign(&wrong).is_err());
        assert!(dst
            .view_mut(&top)
            .unwrap()
            .assign_view(&wrong.view(&Region::new()).unwrap())
            .is_err());
    }

    #[test]
    fn test_view_rejects_region_outside_array() {
        let a = Array::from_extents(&[3]).unwrap();
        let r = Region::new().with_range(0, Range::new(1, 5, 1));
        assert!(a.view(&r).is_err());
    }
}
