//! 单周期增量引擎。
//!
//! 负责：
//! - 接收原始 K 线（同一时间戳视为对未完成 K 线的修订）；
//! - 在未完成缓冲上去除包含关系，识别分型与笔；
//! - 最后一笔被新极值破坏时撤销并重建；
//! - 维护有限的历史，并为分类器生成快照。
//!
//! 所有无包含 K 线存放在一个数组里，`ubi_start` 之后为未完成缓冲，
//! 之前为已完成笔覆盖的部分。撤销笔只需把 `ubi_start` 回退到对应位置。

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bar::{MergedBar, RawBar};
use crate::config::EngineConfig;
use crate::constant::{Const, DataError, Direction, EventType, Mark};
use crate::events::{EventPayload, Observable, Subscriber};
use crate::fractal::scan_fractals;
use crate::frame::{merged_bar_frame, raw_bar_frame, stroke_frame};
use crate::merger::push_raw;
use crate::signals::{NeutralClassifier, PatternClassifier, Snapshot, build_snapshot};
use crate::stroke::{Stroke, build_stroke};

/// 笔端点，用于绘图与导出。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrokePoint {
    pub datetime: DateTime<Utc>,
    pub mark: Mark,
    pub price: f64,
}

pub struct StrokeEngine {
    config: EngineConfig,
    raw_bars: Vec<RawBar>,
    bars: Vec<MergedBar>,
    ubi_start: usize,
    strokes: Vec<Stroke>,
    observable: Observable,
    classifier: Box<dyn PatternClassifier>,
    snapshot: Option<Snapshot>,
}

impl StrokeEngine {
    pub fn new(config: EngineConfig) -> Result<Self, DataError> {
        Self::with_classifier(config, Box::new(NeutralClassifier))
    }

    pub fn with_classifier(
        config: EngineConfig,
        classifier: Box<dyn PatternClassifier>,
    ) -> Result<Self, DataError> {
        config.validate()?;
        Ok(Self {
            config,
            raw_bars: Vec::new(),
            bars: Vec::new(),
            ubi_start: 0,
            strokes: Vec::new(),
            observable: Observable::default(),
            classifier,
            snapshot: None,
        })
    }

    pub fn subscribe(&mut self, event_type: Option<EventType>, subscriber: Subscriber) {
        self.observable.subscribe(event_type, subscriber);
    }

    pub fn update(&mut self, bar: RawBar) -> Result<(), DataError> {
        let replaced = match self.raw_bars.last() {
            Some(last) if bar.datetime < last.datetime => {
                return Err(DataError::OutOfOrderBar {
                    last: last.datetime,
                    received: bar.datetime,
                });
            }
            Some(last) => bar.datetime == last.datetime,
            None => false,
        };

        let datetime = bar.datetime;
        if replaced {
            self.replace_last(bar);
        } else {
            push_raw(&mut self.bars, self.ubi_start, &bar);
            self.raw_bars.push(bar);
        }
        self.emit(
            if replaced {
                EventType::BarReplaced
            } else {
                EventType::BarAppended
            },
            Some(datetime),
            self.raw_bars.len(),
            None,
        );

        self.update_strokes();
        self.apply_retention();

        if let Some(last) = self.raw_bars.last() {
            self.snapshot = Some(build_snapshot(
                last,
                &self.bars[self.ubi_start..],
                &self.strokes,
                self.classifier.as_ref(),
            ));
        }
        Ok(())
    }

    /// 修订最后一根原始 K 线：弹出最后一根无包含 K 线，用修订后的成分重新喂入。
    fn replace_last(&mut self, bar: RawBar) {
        let mut elements = if self.bars.len() > self.ubi_start {
            self.bars.pop().map(|x| x.elements).unwrap_or_default()
        } else {
            Vec::new()
        };
        match elements.last_mut() {
            Some(last) => *last = bar.clone(),
            None => elements.push(bar.clone()),
        }

        for element in &elements {
            push_raw(&mut self.bars, self.ubi_start, element);
        }
        if let Some(last) = self.raw_bars.last_mut() {
            *last = bar;
        }
    }

    fn update_strokes(&mut self) {
        if self.bars.len() - self.ubi_start < 3 {
            return;
        }

        if self.strokes.is_empty() {
            self.cold_start();
        } else {
            self.extend_or_retract();
        }
    }

    fn cold_start(&mut self) {
        let fractals = scan_fractals(&self.bars[self.ubi_start..]);
        let Some(first) = fractals.first() else {
            return;
        };

        let mut fx_a = first;
        for fx in fractals.iter().filter(|x| x.mark == first.mark) {
            let more_extreme = match first.mark {
                Mark::Bottom => fx.low_price <= fx_a.low_price,
                Mark::Top => fx.high_price >= fx_a.high_price,
            };
            if more_extreme {
                fx_a = fx;
            }
        }

        let start = fx_a.first_datetime();
        self.ubi_start = self.position_of(start);
        self.extract_stroke();
    }

    fn extend_or_retract(&mut self) {
        let tail = &self.bars[self.ubi_start + 2..];
        let max_high = tail
            .iter()
            .map(|x| x.high_price)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_low = tail
            .iter()
            .map(|x| x.low_price)
            .fold(f64::INFINITY, f64::min);

        let Some(last) = self.strokes.last() else {
            return;
        };
        let (broken, opposite_breached) = match last.direction {
            Direction::Up => (max_high > last.high_price, min_low < last.low_price),
            Direction::Down => (min_low < last.low_price, max_high > last.high_price),
        };

        if broken {
            let retract = if opposite_breached && self.strokes.len() > 2 {
                2
            } else {
                1
            };
            let keep = self.strokes.len() - retract;
            let restart = self.strokes[keep].first_bar_datetime();
            self.strokes.truncate(keep);
            self.ubi_start = self.position_of(restart);

            info!(
                symbol = %self.config.symbol,
                timeframe = %self.config.timeframe,
                retracted = retract,
                restart = %restart,
                "stroke retracted"
            );
            self.emit(EventType::StrokeRetracted, Some(restart), retract, None);
        }

        let buffered = self.bars.len() - self.ubi_start;
        if buffered > Const::LOOKBACK_LIMIT {
            warn!(
                symbol = %self.config.symbol,
                timeframe = %self.config.timeframe,
                buffered,
                "unfinished stroke buffer too long"
            );
            self.emit(
                EventType::BufferOverflow,
                self.raw_bars.last().map(|x| x.datetime),
                buffered,
                Some(format!("unfinished buffer holds {buffered} bars")),
            );
        }

        self.extract_stroke();
    }

    /// 在未完成缓冲上查找一笔；找到则追加并把缓冲起点移到终点分型。
    fn extract_stroke(&mut self) {
        let buffer = &self.bars[self.ubi_start..];
        let Some((stroke, rest)) = build_stroke(buffer) else {
            return;
        };
        let consumed = buffer.len() - rest.len();

        debug!(
            symbol = %self.config.symbol,
            timeframe = %self.config.timeframe,
            direction = ?stroke.direction,
            start = %stroke.start(),
            end = %stroke.end(),
            power = stroke.power,
            "stroke finalized"
        );

        let end = stroke.end();
        self.ubi_start += consumed;
        self.strokes.push(stroke);
        self.emit(
            EventType::StrokeFinalized,
            Some(end),
            self.strokes.len(),
            None,
        );
    }

    fn apply_retention(&mut self) {
        if self.strokes.len() > self.config.max_strokes {
            let drop = self.strokes.len() - self.config.max_strokes;
            self.strokes.drain(..drop);
        }

        // 尚无笔时，缓冲起点之前的 K 线不再被任何分型引用
        let Some(first) = self.strokes.first() else {
            if self.ubi_start > 0 {
                self.bars.drain(..self.ubi_start);
                self.ubi_start = 0;
            }
            return;
        };
        let start = first.first_bar_datetime();

        if let Some(index) = self.raw_bars.iter().position(|x| x.datetime >= start) {
            self.raw_bars.drain(..index);
        }

        let floor = self.position_of(start).min(self.ubi_start);
        if floor > 0 {
            self.bars.drain(..floor);
            self.ubi_start -= floor;
        }
    }

    /// 无包含 K 线数组中第一根时间不早于 `datetime` 的位置。
    fn position_of(&self, datetime: DateTime<Utc>) -> usize {
        self.bars.partition_point(|x| x.datetime < datetime)
    }

    fn emit(
        &self,
        event_type: EventType,
        datetime: Option<DateTime<Utc>>,
        count: usize,
        note: Option<String>,
    ) {
        if self.observable.is_empty() {
            return;
        }
        self.observable.notify(
            self.config.timeframe,
            event_type,
            EventPayload {
                symbol: self.config.symbol.clone(),
                datetime,
                count,
                note,
            },
        );
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn raw_bars(&self) -> &[RawBar] {
        &self.raw_bars
    }

    pub fn unfinished_bars(&self) -> &[MergedBar] {
        &self.bars[self.ubi_start..]
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn last_stroke(&self) -> Option<&Stroke> {
        self.strokes.last()
    }

    pub fn last_n_strokes(&self, length: usize) -> &[Stroke] {
        let start = self.strokes.len().saturating_sub(length);
        &self.strokes[start..]
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// 每笔的起点分型，加上最后一笔的终点分型。
    pub fn stroke_points(&self) -> Vec<StrokePoint> {
        let mut points: Vec<StrokePoint> = self
            .strokes
            .iter()
            .map(|x| StrokePoint {
                datetime: x.fx_a.datetime,
                mark: x.fx_a.mark,
                price: x.fx_a.extreme,
            })
            .collect();
        if let Some(last) = self.strokes.last() {
            points.push(StrokePoint {
                datetime: last.fx_b.datetime,
                mark: last.fx_b.mark,
                price: last.fx_b.extreme,
            });
        }
        points
    }

    pub fn raw_bar_dataframe(&self) -> Result<DataFrame, DataError> {
        raw_bar_frame(&self.raw_bars)
    }

    pub fn unfinished_dataframe(&self) -> Result<DataFrame, DataError> {
        merged_bar_frame(self.unfinished_bars())
    }

    pub fn stroke_dataframe(&self) -> Result<DataFrame, DataError> {
        stroke_frame(&self.strokes)
    }
}
