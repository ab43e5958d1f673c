// cow\crates\cow_io\src/dataset.rs

//! 数组数据集存储
//!
//! [`DatasetStore`] 以名称存取数组、标量和参数值。名称可用 `/` 分组，
//! 一组参数值 ([`NamedValues`]) 存为组下的一串单值数据集。
//!
//! - [`MemoryStore`]: 内存实现，用于测试
//! - [`DirectoryStore`]: 目录实现，每个数据集一个文件
//!
//! # 数组文件格式 (`.cowa`)
//!
//! ```text
//! [魔数: 4 bytes] "COWA"
//! [版本: u32]
//! [逻辑秩 r: u32]
//! [轴长: r * u64]
//! [数据: n * f64]
//! ```
//!
//! 全部为小端，数据按行主序排列。标量与参数值保存为 `<名称>.json`，
//! 扩展名追加在名称之后，名称中的 `.` 保持原样。

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cow_config::{NamedValues, Variant};
use cow_foundation::shape::shape_from;
use cow_foundation::{Array, CowError, Range, Region, View, AXES};

use crate::error::{IoError, IoResult};

const MAGIC: &[u8; 4] = b"COWA";
const VERSION: u32 = 1;
const ARRAY_EXT: &str = "cowa";
const VALUE_EXT: &str = "json";

/// 标量数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// 整数
    Int(i64),
    /// 浮点
    Double(f64),
    /// 字符串
    Str(String),
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// 数据集存储接口
pub trait DatasetStore {
    /// 写入数组（覆盖同名数据集）
    fn write_array(&mut self, name: &str, array: &Array) -> IoResult<()>;

    /// 读取数组
    fn read_array(&self, name: &str) -> IoResult<Array>;

    /// 写入标量
    fn write_scalar(&mut self, name: &str, value: &Scalar) -> IoResult<()>;

    /// 读取标量
    fn read_scalar(&self, name: &str) -> IoResult<Scalar>;

    /// 写入参数值；空值不可写
    fn write_variant(&mut self, name: &str, value: &Variant) -> IoResult<()>;

    /// 读取参数值
    fn read_variant(&self, name: &str) -> IoResult<Variant>;

    /// 是否存在该名称的数据集
    fn contains(&self, name: &str) -> bool;

    /// 全部数据集名称（有序、去重）
    fn names(&self) -> IoResult<Vec<String>>;

    /// 只读取数组的一个区域
    fn read_array_region(&self, name: &str, region: &Region) -> IoResult<Array> {
        Ok(self.read_array(name)?.extract(region)?)
    }

    /// 把视图覆盖的元素写为一个数组
    fn write_view(&mut self, name: &str, view: &View<'_>) -> IoResult<()> {
        self.write_array(name, &view.to_array())
    }

    /// 沿 `axis` 堆叠多个数据集
    ///
    /// 每个数据集在 `axis` 上的长度必须为 1，形状相同；先各自取 `region`，
    /// 第 n 个结果放在输出 `axis` 的第 n 层。
    fn read_stacked(&self, names: &[&str], axis: usize, region: &Region) -> IoResult<Array> {
        CowError::check_axis(axis, AXES)?;
        let Some(first) = names.first() else {
            return Err(CowError::invalid_input("没有要堆叠的数据集").into());
        };
        let source_shape = self.read_array(first)?.shape();
        if source_shape[axis] != 1 {
            return Err(CowError::invalid_input(format!(
                "数据集 {} 在轴 {} 上长度为 {}，不能堆叠",
                first, axis, source_shape[axis]
            ))
            .into());
        }

        let mut target_shape = region.resolve_within(&source_shape)?.shape();
        target_shape[axis] = names.len();
        let mut stacked = Array::new(target_shape);

        for (n, name) in names.iter().enumerate() {
            let source = self.read_array(name)?;
            if source.shape() != source_shape {
                return Err(
                    CowError::shape_mismatch("read_stacked", source_shape, source.shape()).into(),
                );
            }
            let layer = source.extract(region)?;
            let slot = n as isize;
            stacked.insert(&layer, &Region::new().with_range(axis, Range::new(slot, slot + 1, 1)))?;
        }
        Ok(stacked)
    }

    /// 把一组参数值写在 `group` 之下，每项一个数据集
    fn write_named_values(&mut self, group: &str, values: &NamedValues) -> IoResult<()> {
        for (key, value) in values {
            self.write_variant(&child_name(group, key), value)?;
        }
        Ok(())
    }

    /// 读取 `group` 的直接子项中全部单值数据集；空组名表示根
    fn read_named_values(&self, group: &str) -> IoResult<NamedValues> {
        let prefix = if group.is_empty() {
            String::new()
        } else {
            format!("{}/", group)
        };
        let mut values = NamedValues::new();
        for name in self.names()? {
            let Some(key) = name.strip_prefix(&prefix) else {
                continue;
            };
            if key.contains('/') {
                continue;
            }
            match self.read_variant(&name) {
                Ok(value) => {
                    values.insert(key.to_string(), value);
                }
                Err(IoError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(values)
    }
}

/// 名称须非空，各段非空且不为 `.` / `..`
fn check_name(name: &str) -> IoResult<()> {
    let valid = !name.is_empty()
        && name
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != ".." && !part.contains('\\'));
    if valid {
        Ok(())
    } else {
        Err(IoError::InvalidName {
            name: name.to_string(),
        })
    }
}

fn child_name(group: &str, key: &str) -> String {
    if group.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", group, key)
    }
}

fn check_variant(name: &str, value: &Variant) -> IoResult<()> {
    if matches!(value, Variant::Null) {
        return Err(CowError::invalid_input(format!("不能写入空值: {}", name)).into());
    }
    Ok(())
}

// ============================================================================
// 内存实现
// ============================================================================

#[derive(Debug, Clone)]
enum Entry {
    Array(Array),
    Value(serde_json::Value),
}

/// 内存数据集存储
///
/// 标量与参数值以 JSON 值保存，和目录实现的读写规则一致。
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Entry>,
}

impl MemoryStore {
    /// 空存储
    pub fn new() -> Self {
        Self::default()
    }

    fn write_value<T: Serialize>(&mut self, name: &str, value: &T) -> IoResult<()> {
        check_name(name)?;
        let json = serde_json::to_value(value)?;
        self.entries.insert(name.to_string(), Entry::Value(json));
        Ok(())
    }

    fn read_value<T: for<'de> Deserialize<'de>>(&self, name: &str) -> IoResult<T> {
        match self.entries.get(name) {
            Some(Entry::Value(json)) => Ok(serde_json::from_value(json.clone())?),
            _ => Err(IoError::not_found(name)),
        }
    }
}

impl DatasetStore for MemoryStore {
    fn write_array(&mut self, name: &str, array: &Array) -> IoResult<()> {
        check_name(name)?;
        self.entries.insert(name.to_string(), Entry::Array(array.clone()));
        Ok(())
    }

    fn read_array(&self, name: &str) -> IoResult<Array> {
        match self.entries.get(name) {
            Some(Entry::Array(a)) => Ok(a.clone()),
            _ => Err(IoError::not_found(name)),
        }
    }

    fn write_scalar(&mut self, name: &str, value: &Scalar) -> IoResult<()> {
        self.write_value(name, value)
    }

    fn read_scalar(&self, name: &str) -> IoResult<Scalar> {
        self.read_value(name)
    }

    fn write_variant(&mut self, name: &str, value: &Variant) -> IoResult<()> {
        check_variant(name, value)?;
        self.write_value(name, value)
    }

    fn read_variant(&self, name: &str) -> IoResult<Variant> {
        self.read_value(name)
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn names(&self) -> IoResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

// ============================================================================
// 目录实现
// ============================================================================

/// 目录数据集存储
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// 打开目录，不存在时创建
    pub fn create(root: impl AsRef<Path>) -> IoResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// 打开已存在的目录
    pub fn open(root: impl AsRef<Path>) -> IoResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IoError::not_found(root.display().to_string()));
        }
        Ok(Self { root })
    }

    /// 根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str, extension: &str) -> IoResult<PathBuf> {
        check_name(name)?;
        Ok(self.root.join(format!("{}.{}", name, extension)))
    }

    fn prepare(path: &Path) -> IoResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn write_value<T: Serialize>(&self, name: &str, value: &T) -> IoResult<()> {
        let path = self.path_for(name, VALUE_EXT)?;
        Self::prepare(&path)?;
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    fn read_value<T: for<'de> Deserialize<'de>>(&self, name: &str) -> IoResult<T> {
        let path = self.path_for(name, VALUE_EXT)?;
        if !path.is_file() {
            return Err(IoError::not_found(name));
        }
        Ok(serde_json::from_str(&fs::read_to_string(&path)?)?)
    }

    fn collect_names(dir: &Path, prefix: &str, out: &mut BTreeSet<String>) -> IoResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if path.is_dir() {
                Self::collect_names(&path, &child_name(prefix, &file_name), out)?;
                continue;
            }
            for ext in [ARRAY_EXT, VALUE_EXT] {
                if let Some(stem) = file_name.strip_suffix(&format!(".{}", ext)) {
                    if !stem.is_empty() {
                        out.insert(child_name(prefix, stem));
                    }
                }
            }
        }
        Ok(())
    }
}

impl DatasetStore for DirectoryStore {
    fn write_array(&mut self, name: &str, array: &Array) -> IoResult<()> {
        let path = self.path_for(name, ARRAY_EXT)?;
        Self::prepare(&path)?;
        let mut w = BufWriter::new(File::create(&path)?);
        write_array_to(&mut w, array)?;
        w.flush()?;
        tracing::debug!(name, path = %path.display(), len = array.len(), "array dataset written");
        Ok(())
    }

    fn read_array(&self, name: &str) -> IoResult<Array> {
        let path = self.path_for(name, ARRAY_EXT)?;
        if !path.is_file() {
            return Err(IoError::not_found(name));
        }
        let mut r = BufReader::new(File::open(&path)?);
        read_array_from(&mut r).map_err(|err| match err {
            IoError::Format { reason, .. } => IoError::format(path.display().to_string(), reason),
            other => other,
        })
    }

    fn write_scalar(&mut self, name: &str, value: &Scalar) -> IoResult<()> {
        self.write_value(name, value)
    }

    fn read_scalar(&self, name: &str) -> IoResult<Scalar> {
        self.read_value(name)
    }

    fn write_variant(&mut self, name: &str, value: &Variant) -> IoResult<()> {
        check_variant(name, value)?;
        self.write_value(name, value)
    }

    fn read_variant(&self, name: &str) -> IoResult<Variant> {
        self.read_value(name)
    }

    fn contains(&self, name: &str) -> bool {
        [ARRAY_EXT, VALUE_EXT].iter().any(|ext| {
            self.path_for(name, ext)
                .map(|p| p.is_file())
                .unwrap_or(false)
        })
    }

    fn names(&self) -> IoResult<Vec<String>> {
        let mut names = BTreeSet::new();
        Self::collect_names(&self.root, "", &mut names)?;
        Ok(names.into_iter().collect())
    }
}

// ============================================================================
// 数组编码
// ============================================================================

/// 按 `.cowa` 格式写出数组
pub fn write_array_to<W: Write>(w: &mut W, array: &Array) -> IoResult<()> {
    let extents = array.logical_shape();
    w.write_all(MAGIC)?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&(extents.len() as u32).to_le_bytes())?;
    for n in &extents {
        w.write_all(&(*n as u64).to_le_bytes())?;
    }
    for v in array.as_slice() {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// 读取 `.cowa` 格式数组
///
/// 头部给出的轴长不可信：元素数按检查过的乘法计算，数据按实际读到的字节增长，
/// 不预先按头部分配。
pub fn read_array_from<R: Read>(r: &mut R) -> IoResult<Array> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(IoError::format("<stream>", "魔数不是 COWA"));
    }
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(IoError::format(
            "<stream>",
            format!("不支持的版本 {}", version),
        ));
    }
    let rank = read_u32(r)? as usize;
    if rank > AXES {
        return Err(IoError::format("<stream>", format!("秩 {} 超过 {}", rank, AXES)));
    }
    let mut extents = Vec::with_capacity(rank);
    for _ in 0..rank {
        let mut buf = [0u8; 8];
        r.read_exact(&mut buf)?;
        let n = usize::try_from(u64::from_le_bytes(buf))
            .map_err(|_| IoError::format("<stream>", "轴长超出地址范围"))?;
        extents.push(n);
    }

    let byte_len = extents
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .and_then(|count| count.checked_mul(std::mem::size_of::<f64>()))
        .ok_or_else(|| IoError::format("<stream>", "轴长乘积溢出"))?;

    let mut bytes = Vec::new();
    r.take(byte_len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != byte_len {
        return Err(IoError::format(
            "<stream>",
            format!("数据截断: 期望 {} 字节, 实际 {} 字节", byte_len, bytes.len()),
        ));
    }
    let data = bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect();
    Ok(Array::from_vec(shape_from(&extents)?, data)?)
}

fn read_u32<R: Read>(r: &mut R) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
