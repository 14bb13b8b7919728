//! 包含关系处理。
//!
//! 负责：
//! - 根据前两根无包含 K 线判断方向；
//! - 新原始 K 线与最后一根无包含 K 线存在包含关系时按方向合并；
//! - 维护合并 K 线的原始 K 线列表（上限 `Const::MAX_ELEMENTS`）。

use crate::bar::{MergedBar, RawBar, is_inclusive};
use crate::constant::{Const, Direction};

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// k3 被并入 k2，结果替换 k2。
    Merged(MergedBar),
    /// 无包含关系（或方向无法判断），k3 独立成一根新的 K 线。
    Standalone(MergedBar),
}

impl MergeOutcome {
    pub fn bar(&self) -> &MergedBar {
        match self {
            Self::Merged(bar) | Self::Standalone(bar) => bar,
        }
    }

    pub fn into_bar(self) -> MergedBar {
        match self {
            Self::Merged(bar) | Self::Standalone(bar) => bar,
        }
    }
}

/// 去除包含关系：k1、k2 为无包含 K 线，k3 为新的原始 K 线。
pub fn remove_include(k1: &MergedBar, k2: &MergedBar, k3: &RawBar) -> MergeOutcome {
    let direction = if k1.high_price < k2.high_price {
        Direction::Up
    } else if k1.high_price > k2.high_price {
        Direction::Down
    } else {
        return MergeOutcome::Standalone(MergedBar::from_raw(k3));
    };

    if !is_inclusive(k2.high_price, k2.low_price, k3.high_price, k3.low_price) {
        return MergeOutcome::Standalone(MergedBar::from_raw(k3));
    }

    // 价格相等时两个方向取时间的规则并不对称，保持原样
    let (high_price, low_price, datetime) = match direction {
        Direction::Up => (
            k2.high_price.max(k3.high_price),
            k2.low_price.max(k3.low_price),
            if k2.high_price > k3.high_price {
                k2.datetime
            } else {
                k3.datetime
            },
        ),
        Direction::Down => (
            k2.high_price.min(k3.high_price),
            k2.low_price.min(k3.low_price),
            if k2.low_price < k3.low_price {
                k2.datetime
            } else {
                k3.datetime
            },
        ),
    };

    let (open_price, close_price) = if k3.open_price > k3.close_price {
        (high_price, low_price)
    } else {
        (low_price, high_price)
    };

    let skip = k2.elements.len().saturating_sub(Const::MAX_ELEMENTS);
    let mut elements: Vec<RawBar> = k2.elements[skip..]
        .iter()
        .filter(|x| x.datetime != k3.datetime)
        .cloned()
        .collect();
    elements.push(k3.clone());

    MergeOutcome::Merged(MergedBar {
        symbol: k3.symbol.clone(),
        datetime,
        open_price,
        high_price,
        low_price,
        close_price,
        volume: k2.volume + k3.volume,
        elements,
    })
}

/// 将原始 K 线并入 `bars[floor..]` 这段无包含序列的尾部。
///
/// 段内不足两根时直接追加。
pub(crate) fn push_raw(bars: &mut Vec<MergedBar>, floor: usize, bar: &RawBar) {
    let window = &bars[floor.min(bars.len())..];
    if window.len() < 2 {
        bars.push(MergedBar::from_raw(bar));
        return;
    }

    let k1 = &window[window.len() - 2];
    let k2 = &window[window.len() - 1];
    match remove_include(k1, k2, bar) {
        MergeOutcome::Merged(merged) => {
            if let Some(last) = bars.last_mut() {
                *last = merged;
            }
        }
        MergeOutcome::Standalone(standalone) => bars.push(standalone),
    }
}

/// 对一段原始 K 线批量去除包含关系。
pub fn merge_bars(raw: &[RawBar]) -> Vec<MergedBar> {
    let mut bars = Vec::with_capacity(raw.len());
    for bar in raw {
        push_raw(&mut bars, 0, bar);
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn raw(minute: i64, high: f64, low: f64) -> RawBar {
        RawBar {
            symbol: "T".to_string(),
            datetime: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap() + Duration::minutes(minute),
            open_price: low,
            high_price: high,
            low_price: low,
            close_price: high,
            volume: 1.0,
        }
    }

    #[test]
    fn push_raw_respects_floor() {
        let mut bars = vec![
            MergedBar::from_raw(&raw(0, 10.0, 9.0)),
            MergedBar::from_raw(&raw(1, 11.0, 10.0)),
        ];
        // floor 之后只有一根，新 K 线即便被包含也只能独立追加
        push_raw(&mut bars, 1, &raw(2, 10.8, 10.2));
        assert_eq!(bars.len(), 3);

        let mut bars = vec![
            MergedBar::from_raw(&raw(0, 10.0, 9.0)),
            MergedBar::from_raw(&raw(1, 11.0, 10.0)),
        ];
        push_raw(&mut bars, 0, &raw(2, 10.8, 10.2));
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].elements.len(), 2);
    }
}
