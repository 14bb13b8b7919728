use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 分型标记。只有顶、底两种，非法标记在类型层面不可表达。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    Top,
    Bottom,
}

impl Mark {
    /// 以该分型为起点的笔方向。
    pub fn stroke_direction(self) -> Direction {
        match self {
            Self::Top => Direction::Down,
            Self::Bottom => Direction::Up,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FractalStrength {
    Strong,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    BarAppended,
    BarReplaced,
    StrokeFinalized,
    StrokeRetracted,
    BufferOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::D1 => "1d",
            Self::W1 => "1w",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DataError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Self::M1),
            "5m" => Ok(Self::M5),
            "15m" => Ok(Self::M15),
            "30m" => Ok(Self::M30),
            "1h" | "60m" => Ok(Self::H1),
            "1d" => Ok(Self::D1),
            "1w" => Ok(Self::W1),
            _ => Err(DataError::InvalidTimeframe(value.to_string())),
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum DataError {
    InvalidTimeframe(String),
    InvalidDatetime(String),
    InvalidConfig(String),
    UnsupportedFormat(String),
    OutOfOrderBar {
        last: DateTime<Utc>,
        received: DateTime<Utc>,
    },
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Polars(polars::error::PolarsError),
}

pub struct Const;

impl Const {
    /// 单根合并 K 线保留的原始 K 线上限。
    pub const MAX_ELEMENTS: usize = 100;
    /// 一笔至少包含的无包含 K 线数量。
    pub const MIN_STROKE_BARS: usize = 7;
    /// 未完成笔缓冲超过该长度时报告诊断信息。
    pub const LOOKBACK_LIMIT: usize = 300;
    pub const DEFAULT_MAX_STROKES: usize = 100;
    /// 快照中逐笔统计的深度（倒1..倒5）。
    pub const TRAILING_DEPTH: usize = 5;
    /// 快照中形态标签的深度（倒1..倒7）。
    pub const SHAPE_DEPTH: usize = 7;
}

impl Display for DataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimeframe(v) => write!(f, "invalid timeframe: {v}"),
            Self::InvalidDatetime(v) => write!(f, "invalid datetime: {v}"),
            Self::InvalidConfig(v) => write!(f, "invalid config: {v}"),
            Self::UnsupportedFormat(v) => write!(f, "unsupported file format: {v}"),
            Self::OutOfOrderBar { last, received } => {
                write!(f, "bar at {received} is older than last bar at {last}")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Yaml(e) => write!(f, "yaml error: {e}"),
            Self::Polars(e) => write!(f, "polars error: {e}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<std::io::Error> for DataError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for DataError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<serde_yaml::Error> for DataError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

impl From<polars::error::PolarsError> for DataError {
    fn from(value: polars::error::PolarsError) -> Self {
        Self::Polars(value)
    }
}
