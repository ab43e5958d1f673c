// crates/cow_config/src/variant.rs

//! Variant - 带类型标签的参数值
//!
//! 命令行 `key=value` 参数先收集为字符串，再按目标表中已有值的类型重新解析，
//! 目标表中不存在的键被拒绝。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// 按名称排序的参数表
pub type NamedValues = BTreeMap<String, Variant>;

/// 参数值
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    /// 空值
    #[default]
    Null,
    /// 布尔
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点
    Double(f64),
    /// 字符串
    Str(String),
}

impl Variant {
    /// 类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
        }
    }

    /// 按本值的类型解析字符串
    ///
    /// 空值不携带类型，解析结果为字符串。
    pub fn parse_as(&self, rep: &str) -> Result<Variant, ConfigError> {
        let fail = |reason: String| ConfigError::invalid(self.type_name(), rep, reason);
        Ok(match self {
            Self::Bool(_) => Self::Bool(parse_bool(rep).ok_or_else(|| fail("不是布尔值".into()))?),
            Self::Int(_) => Self::Int(rep.trim().parse().map_err(|e| fail(format!("{}", e)))?),
            Self::Double(_) => {
                Self::Double(rep.trim().parse().map_err(|e| fail(format!("{}", e)))?)
            }
            Self::Str(_) | Self::Null => Self::Str(rep.to_string()),
        })
    }

    /// 转为布尔：数值非零为真，字符串除 `False/false/FALSE/0` 外为真
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Double(d) => *d != 0.0,
            Self::Str(s) => !matches!(s.as_str(), "False" | "false" | "FALSE" | "0"),
        }
    }

    /// 转为整数，浮点向零截断
    pub fn as_int(&self) -> Result<i64, ConfigError> {
        match self {
            Self::Null => Ok(0),
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Int(i) => Ok(*i),
            Self::Double(d) => Ok(*d as i64),
            Self::Str(s) => s
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("int", s, format!("{}", e))),
        }
    }

    /// 转为浮点
    pub fn as_double(&self) -> Result<f64, ConfigError> {
        match self {
            Self::Null => Ok(0.0),
            Self::Bool(b) => Ok(f64::from(u8::from(*b))),
            Self::Int(i) => Ok(*i as f64),
            Self::Double(d) => Ok(*d),
            Self::Str(s) => s
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("double", s, format!("{}", e))),
        }
    }

    /// 从命令行参数收集 `key=value`，不含 `=` 的参数被忽略
    pub fn from_command_line<I, S>(args: I) -> NamedValues
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        args.into_iter()
            .filter_map(|arg| {
                let arg = arg.as_ref();
                arg.split_once('=')
                    .map(|(k, v)| (k.to_string(), Variant::Str(v.to_string())))
            })
            .collect()
    }

    /// 用 `source` 更新 `target`，每个值按目标中已有的类型重新解析
    ///
    /// `source` 中出现 `target` 没有的键时返回 [`ConfigError::Unrecognized`]，
    /// 此时 `target` 不被修改。
    pub fn update(target: &mut NamedValues, source: &NamedValues) -> Result<(), ConfigError> {
        let mut parsed = Vec::with_capacity(source.len());
        for (key, value) in source {
            let Some(current) = target.get(key) else {
                return Err(ConfigError::Unrecognized(key.clone()));
            };
            let value = current.parse_as(&value.to_string()).map_err(|err| match err {
                ConfigError::InvalidValue { value, reason, .. } => ConfigError::InvalidValue {
                    key: key.clone(),
                    value,
                    reason,
                },
                other => other,
            })?;
            parsed.push((key.clone(), value));
        }
        target.extend(parsed);
        Ok(())
    }

    /// 以点线对齐的两列表格
    pub fn describe(values: &NamedValues) -> String {
        values
            .iter()
            .map(|(k, v)| format!("{:.<32} {}\n", k, v))
            .collect()
    }
}

fn parse_bool(rep: &str) -> Option<bool> {
    match rep.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        other => other.parse::<i64>().ok().map(|i| i != 0),
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "<null>"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Double(d) => write!(f, "{}", d),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> NamedValues {
        let mut v = NamedValues::new();
        v.insert("steps".into(), Variant::from(10_i64));
        v.insert("cfl".into(), Variant::from(0.5));
        v.insert("vtk".into(), Variant::from(false));
        v.insert("title".into(), Variant::from("run"));
        v
    }

    #[test]
    fn test_from_command_line() {
        let args = ["cow", "steps=20", "--verbose", "title=a=b"];
        let named = Variant::from_command_line(args);
        assert_eq!(named.len(), 2);
        assert_eq!(named["steps"], Variant::Str("20".into()));
        assert_eq!(named["title"], Variant::Str("a=b".into()));
    }

    #[test]
    fn test_update_keeps_target_types() {
        let mut target = defaults();
        let source = Variant::from_command_line(["steps=20", "cfl=0.25", "vtk=1", "title=blast"]);
        Variant::update(&mut target, &source).unwrap();
        assert_eq!(target["steps"], Variant::Int(20));
        assert_eq!(target["cfl"], Variant::Double(0.25));
        assert_eq!(target["vtk"], Variant::Bool(true));
        assert_eq!(target["title"], Variant::Str("blast".into()));
    }

    #[test]
    fn test_update_rejects_unknown_key() {
        let mut target = defaults();
        let source = Variant::from_command_line(["steps=3", "gamma=1.4"]);
        let err = Variant::update(&mut target, &source).unwrap_err();
        assert_eq!(err.to_string(), "unrecognized 'gamma'");
        assert_eq!(target["steps"], Variant::Int(10));
    }

    #[test]
    fn test_update_reports_bad_value() {
        let mut target = defaults();
        let source = Variant::from_command_line(["steps=many"]);
        match Variant::update(&mut target, &source) {
            Err(ConfigError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "steps");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_conversions() {
        assert!(Variant::from("yes").as_bool());
        assert!(!Variant::from("FALSE").as_bool());
        assert_eq!(Variant::from(2.9).as_int().unwrap(), 2);
        assert_eq!(Variant::from(true).as_double().unwrap(), 1.0);
        assert!(Variant::from("x").as_double().is_err());
        assert_eq!(Variant::Null.to_string(), "<null>");
    }

    #[test]
    fn test_describe_pads_with_dots() {
        let mut v = NamedValues::new();
        v.insert("steps".into(), Variant::from(4_i64));
        let table = Variant::describe(&v);
        assert!(table.starts_with("steps..."));
        assert!(table.ends_with(" 4\n"));
        assert_eq!(table.find(' '), Some(32));
    }
}
