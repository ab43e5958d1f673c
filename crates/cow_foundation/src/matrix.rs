// cow\crates\cow_foundation\src/matrix.rs

//! 小型稠密矩阵

use std::ops::{Div, Index, IndexMut, Mul};

use crate::error::{CowError, CowResult};

/// 行主序稠密矩阵
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// `(rows, cols)` 单位矩阵：对角线为 1，其余为 0
    pub fn identity(rows: usize, cols: usize) -> Self {
        let mut m = Self::zeros(rows, cols);
        for i in 0..rows.min(cols) {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// 零矩阵
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// 行数
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 列数
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 带检查的读取
    pub fn get(&self, i: usize, j: usize) -> CowResult<f64> {
        CowError::check_index(0, i, self.rows)?;
        CowError::check_index(1, j, self.cols)?;
        Ok(self.data[i * self.cols + j])
    }

    /// 矩阵乘积，要求 `self.cols == other.rows`
    pub fn matmul(&self, other: &Matrix) -> CowResult<Matrix> {
        if self.cols != other.rows {
            return Err(CowError::shape_mismatch(
                "matmul",
                [self.cols, other.cols, 1, 1, 1],
                [other.rows, other.cols, 1, 1, 1],
            ));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(i, k)];
                for j in 0..other.cols {
                    out[(i, j)] += a * other[(k, j)];
                }
            }
        }
        Ok(out)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(i < self.rows && j < self.cols, "矩阵索引 ({}, {}) 越界", i, j);
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        assert!(i < self.rows && j < self.cols, "矩阵索引 ({}, {}) 越界", i, j);
        &mut self.data[i * self.cols + j]
    }
}

impl Mul<f64> for &Matrix {
    type Output = Matrix;

    fn mul(self, a: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x * a).collect(),
        }
    }
}

impl Div<f64> for &Matrix {
    type Output = Matrix;

    fn div(self, a: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x / a).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rectangular() {
        let m = Matrix::identity(2, 3);
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(1, 1)], 1.0);
        assert_eq!(m[(1, 2)], 0.0);
        assert!(m.get(2, 0).is_err());
    }

    #[test]
    fn test_scalar_ops() {
        let m = &Matrix::identity(2, 2) * 4.0;
        assert_eq!(m[(1, 1)], 4.0);
        assert_eq!((&m / 2.0)[(0, 0)], 2.0);
    }

    #[test]
    fn test_matmul() {
        let mut a = Matrix::zeros(2, 3);
        let mut b = Matrix::zeros(3, 2);
        for i in 0..2 {
            for j in 0..3 {
                a[(i, j)] = (i * 3 + j) as f64;
                b[(j, i)] = 1.0;
            }
        }
        let c = a.matmul(&b).unwrap();
        assert_eq!((c.rows(), c.cols()), (2, 2));
        assert_eq!(c[(0, 0)], 3.0);
        assert_eq!(c[(1, 1)], 12.0);
        assert_eq!(a.matmul(&Matrix::identity(3, 3)).unwrap(), a);
        assert!(a.matmul(&a).is_err());
    }
}
