use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constant::{FractalStrength, Mark};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn body(&self) -> f64 {
        (self.close_price - self.open_price).abs()
    }

    pub fn total_range(&self) -> f64 {
        self.high_price - self.low_price
    }
}

/// 去除包含关系后的 K 线。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedBar {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
    pub elements: Vec<RawBar>,
}

impl MergedBar {
    pub fn from_raw(bar: &RawBar) -> Self {
        Self {
            symbol: bar.symbol.clone(),
            datetime: bar.datetime,
            open_price: bar.open_price,
            high_price: bar.high_price,
            low_price: bar.low_price,
            close_price: bar.close_price,
            volume: bar.volume,
            elements: vec![bar.clone()],
        }
    }

    /// 不带成分 K 线的副本，分型只需要价格与时间。
    pub fn outline(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            datetime: self.datetime,
            open_price: self.open_price,
            high_price: self.high_price,
            low_price: self.low_price,
            close_price: self.close_price,
            volume: self.volume,
            elements: Vec::new(),
        }
    }

    pub fn is_inclusive(&self, other: &Self) -> bool {
        is_inclusive(self.high_price, self.low_price, other.high_price, other.low_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fractal {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub mark: Mark,
    pub high_price: f64,
    pub low_price: f64,
    /// 分型极值：顶分型取中间 K 线高点，底分型取低点。
    pub extreme: f64,
    pub strength: FractalStrength,
    /// 构成分型的三根 K 线，不含成分列表。
    pub elements: [MergedBar; 3],
}

impl Fractal {
    pub fn first_datetime(&self) -> DateTime<Utc> {
        self.elements[0].datetime
    }

    pub fn last_datetime(&self) -> DateTime<Utc> {
        self.elements[2].datetime
    }

    /// 两个分型的价格区间是否严格互相包含。
    pub fn range_contains(&self, other: &Self) -> bool {
        (self.high_price > other.high_price && self.low_price < other.low_price)
            || (self.high_price < other.high_price && self.low_price > other.low_price)
    }
}

pub(crate) fn is_inclusive(a_high: f64, a_low: f64, b_high: f64, b_low: f64) -> bool {
    (a_high >= b_high && a_low <= b_low) || (a_high <= b_high && a_low >= b_low)
}
