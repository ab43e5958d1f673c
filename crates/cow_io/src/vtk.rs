// cow\crates\cow_io\src/vtk.rs

//! 旧式 VTK 直线网格输出
//!
//! 写出 `# vtk DataFile Version 3.0` 的 `RECTILINEAR_GRID` 数据集，
//! 支持 ASCII 与大端二进制两种编码。
//!
//! # 字段形状
//!
//! 网格形状为 `(S0, S1, S2)`：
//! - 单元字段前三轴为 `(S0, S1, S2)`，顶点字段为 `(S0+1, S1+1, S2+1)`
//! - 标量字段轴 3 长度为 1，矢量字段为 3，轴 4 长度为 1
//!
//! 写出前交换轴 0 与轴 2，使 x 成为变化最快的轴。
//!
//! # 示例
//!
//! ```
//! use cow_foundation::Array;
//! use cow_io::vtk::{DataSet, MeshLocation};
//!
//! let mut ds = DataSet::new([4, 3, 1]);
//! ds.set_binary(false);
//! ds.add_scalar_field("rho", Array::from_extents(&[4, 3, 1]).unwrap(), MeshLocation::Cell)
//!     .unwrap();
//!
//! let mut out = Vec::new();
//! ds.write(&mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("# vtk DataFile Version 3.0"));
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use cow_foundation::Array;

use crate::error::{IoError, IoResult};

/// 字段所在位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshLocation {
    /// 单元中心
    Cell,
    /// 顶点
    Vertex,
}

#[derive(Debug, Default, Clone)]
struct Fields {
    scalars: BTreeMap<String, Array>,
    vectors: BTreeMap<String, Array>,
}

/// VTK 数据集
#[derive(Debug, Clone)]
pub struct DataSet {
    mesh_shape: [usize; 3],
    title: String,
    binary: bool,
    cells: Fields,
    vertices: Fields,
}

impl DataSet {
    /// 按网格单元数创建，默认二进制
    pub fn new(mesh_shape: [usize; 3]) -> Self {
        Self {
            mesh_shape,
            title: "title".to_string(),
            binary: true,
            cells: Fields::default(),
            vertices: Fields::default(),
        }
    }

    /// 设置标题行
    pub fn set_title(&mut self, title: impl Into<String>) {
        // 标题占一行
        self.title = title.into().replace('\n', " ");
    }

    /// 选择二进制或 ASCII
    pub fn set_binary(&mut self, binary: bool) {
        self.binary = binary;
    }

    /// 添加标量字段（轴 3 长度为 1）
    pub fn add_scalar_field(
        &mut self,
        name: impl Into<String>,
        data: Array,
        location: MeshLocation,
    ) -> IoResult<()> {
        let name = name.into();
        self.check_field(&name, &data, location, 1)?;
        self.fields_mut(location).scalars.insert(name, data);
        Ok(())
    }

    /// 添加矢量字段（轴 3 长度为 3）
    pub fn add_vector_field(
        &mut self,
        name: impl Into<String>,
        data: Array,
        location: MeshLocation,
    ) -> IoResult<()> {
        let name = name.into();
        self.check_field(&name, &data, location, 3)?;
        self.fields_mut(location).vectors.insert(name, data);
        Ok(())
    }

    fn fields_mut(&mut self, location: MeshLocation) -> &mut Fields {
        match location {
            MeshLocation::Cell => &mut self.cells,
            MeshLocation::Vertex => &mut self.vertices,
        }
    }

    fn check_field(
        &self,
        name: &str,
        data: &Array,
        location: MeshLocation,
        components: usize,
    ) -> IoResult<()> {
        let extra = match location {
            MeshLocation::Cell => 0,
            MeshLocation::Vertex => 1,
        };
        let s = self.mesh_shape;
        let expected = [s[0] + extra, s[1] + extra, s[2] + extra, components, 1];
        if data.shape() != expected {
            return Err(IoError::FieldShape {
                field: name.to_string(),
                expected,
                actual: data.shape(),
            });
        }
        Ok(())
    }

    /// 各轴顶点坐标，从 -0.5 起；长度为 1 的轴用 0.01 的薄层
    ///
    /// 三维网格的 x/y 间距按 z 轴长度缩放，单元保持立方，z 轴覆盖 [-0.5, 0.5]。
    fn coordinates(&self, axis: usize) -> Vec<f64> {
        let s = self.mesh_shape;
        let n = s[axis];
        let aspect = if axis < 2 && s[2] > 1 {
            s[2] as f64 / n as f64
        } else {
            1.0
        };
        let dx = if n > 1 { 1.0 / n as f64 / aspect } else { 1e-2 };
        (0..=n).map(|k| -0.5 + dx * k as f64).collect()
    }

    /// 写出数据集
    pub fn write<W: Write>(&self, w: &mut W) -> IoResult<()> {
        let s = self.mesh_shape;

        writeln!(w, "# vtk DataFile Version 3.0")?;
        writeln!(w, "{}", self.title)?;
        writeln!(w, "{}", if self.binary { "BINARY" } else { "ASCII" })?;
        writeln!(w, "DATASET RECTILINEAR_GRID")?;
        writeln!(w, "DIMENSIONS {} {} {}", s[0] + 1, s[1] + 1, s[2] + 1)?;

        for (axis, label) in ["X", "Y", "Z"].iter().enumerate() {
            writeln!(w, "{}_COORDINATES {} double", label, s[axis] + 1)?;
            self.write_values(w, &self.coordinates(axis), 1)?;
        }

        writeln!(w, "CELL_DATA {}", s[0] * s[1] * s[2])?;
        self.write_fields(w, &self.cells)?;

        writeln!(w, "POINT_DATA {}", (s[0] + 1) * (s[1] + 1) * (s[2] + 1))?;
        self.write_fields(w, &self.vertices)?;
        Ok(())
    }

    /// 写出到文件
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> IoResult<()> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        self.write(&mut w)?;
        w.flush()?;
        tracing::debug!(path = %path.display(), "vtk dataset written");
        Ok(())
    }

    fn write_fields<W: Write>(&self, w: &mut W, fields: &Fields) -> IoResult<()> {
        for (name, data) in &fields.scalars {
            writeln!(w, "SCALARS {} double", name)?;
            writeln!(w, "LOOKUP_TABLE default")?;
            let xfast = data.transpose_axes(0, 2)?;
            self.write_values(w, xfast.as_slice(), 1)?;
        }
        for (name, data) in &fields.vectors {
            writeln!(w, "VECTORS {} double", name)?;
            let xfast = data.transpose_axes(0, 2)?;
            self.write_values(w, xfast.as_slice(), 3)?;
        }
        Ok(())
    }

    /// 二进制为大端；ASCII 每行 `per_line` 个值（标量与坐标整段一行）
    fn write_values<W: Write>(&self, w: &mut W, values: &[f64], per_line: usize) -> IoResult<()> {
        if self.binary {
            for v in values {
                w.write_all(&v.to_be_bytes())?;
            }
            writeln!(w)?;
        } else if per_line == 1 {
            for v in values {
                write!(w, "{} ", v)?;
            }
            writeln!(w)?;
        } else {
            for tuple in values.chunks(per_line) {
                let line: Vec<String> = tuple.iter().map(f64::to_string).collect();
                writeln!(w, "{}", line.join(" "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii(ds: &DataSet) -> String {
        let mut out = Vec::new();
        ds.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_and_counts() {
        let mut ds = DataSet::new([2, 3, 1]);
        ds.set_binary(false);
        ds.set_title("run\n7");
        let text = ascii(&ds);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "run 7");
        assert_eq!(lines[2], "ASCII");
        assert_eq!(lines[4], "DIMENSIONS 3 4 2");
        assert!(text.contains("X_COORDINATES 3 double\n-0.5 0 0.5 \n"));
        assert!(text.contains("CELL_DATA 6\n"));
        assert!(text.contains("POINT_DATA 24\n"));
    }

    #[test]
    fn test_3d_cells_are_cubic() {
        let ds = DataSet::new([2, 8, 4]);
        assert_eq!(ds.coordinates(0), vec![-0.5, -0.25, 0.0]);
        assert_eq!(ds.coordinates(1).len(), 9);
        assert_eq!(ds.coordinates(1)[8], 1.5);
        assert_eq!(ds.coordinates(2), vec![-0.5, -0.25, 0.0, 0.25, 0.5]);

        let mut ds = DataSet::new([2, 1, 4]);
        ds.set_binary(false);
        let text = ascii(&ds);
        assert!(text.contains("X_COORDINATES 3 double\n-0.5 -0.25 0 \n"));
        assert!(text.contains("Y_COORDINATES 2 double\n-0.5 -0.49 \n"));
    }

    #[test]
    fn test_scalar_field_is_x_fastest() {
        let mut ds = DataSet::new([2, 2, 1]);
        ds.set_binary(false);
        let a = Array::from_fn([2, 2, 1, 1, 1], |[i, j, ..]| (10 * i + j) as f64);
        ds.add_scalar_field("f", a, MeshLocation::Cell).unwrap();
        let text = ascii(&ds);
        assert!(text.contains("SCALARS f double\nLOOKUP_TABLE default\n0 10 1 11 \n"));
    }

    #[test]
    fn test_vector_field_lines() {
        let mut ds = DataSet::new([1, 1, 1]);
        ds.set_binary(false);
        let v = Array::from_fn([2, 2, 2, 3, 1], |[.., c, _]| c as f64);
        ds.add_vector_field("u", v, MeshLocation::Vertex).unwrap();
        let text = ascii(&ds);
        assert!(text.contains("VECTORS u double\n0 1 2\n0 1 2\n"));
    }

    #[test]
    fn test_field_shape_checked() {
        let mut ds = DataSet::new([4, 4, 1]);
        let wrong = Array::from_extents(&[4, 4, 1, 3]).unwrap();
        assert!(matches!(
            ds.add_scalar_field("p", wrong.clone(), MeshLocation::Cell),
            Err(IoError::FieldShape { .. })
        ));
        assert!(ds.add_vector_field("p", wrong.clone(), MeshLocation::Vertex).is_err());
        assert!(ds.add_vector_field("p", wrong, MeshLocation::Cell).is_ok());
    }

    #[test]
    fn test_binary_is_big_endian() {
        let mut ds = DataSet::new([1, 1, 1]);
        let mut a = Array::from_extents(&[1, 1, 1]).unwrap();
        a[0] = 1.5;
        ds.add_scalar_field("one", a, MeshLocation::Cell).unwrap();
        let mut out = Vec::new();
        ds.write(&mut out).unwrap();
        let marker = b"LOOKUP_TABLE default\n";
        let at = out
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap()
            + marker.len();
        assert_eq!(&out[at..at + 8], &1.5f64.to_be_bytes());
    }
}
