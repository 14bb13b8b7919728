//! 分析快照与形态识别接口。
//!
//! 每次 update 之后，引擎把最近几笔的统计量和形态标签整理成 `Snapshot`，
//! 具体的形态判定交给外部实现的 `PatternClassifier`。

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bar::{MergedBar, RawBar};
use crate::constant::{Const, Direction};
use crate::stroke::{ElementarySegment, Stroke};
use crate::utils::trailing_window;

/// 形态识别窗口长度（笔数或内部线段数）。
const SHAPE_RUNS: [usize; 5] = [5, 7, 9, 11, 13];
const THREE_STROKE_RUN: usize = 3;

/// 形态标签。`Other` 表示无法判断或历史不足。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PatternLabel {
    Other,

    // 多头形态
    /// aAb 式底背驰
    LongA0,
    /// aAbcd 式底背驰
    LongB0,
    /// aAbBc 式底背驰
    LongC0,
    /// abcAd 式底背驰
    LongD0,
    /// ABC 式底背驰
    LongE0,
    /// 类趋势底背驰
    LongF0,
    /// 上颈线突破
    LongG0,
    /// 向上中枢完成
    LongH0,
    /// 三买
    LongI0,
    /// 向上三角扩张中枢
    LongJ0,
    /// 向上三角收敛中枢
    LongK0,
    /// 向上平台型中枢
    LongL0,

    // 空头形态，与多头一一对应
    ShortA0,
    ShortB0,
    ShortC0,
    ShortD0,
    ShortE0,
    ShortF0,
    ShortG0,
    ShortH0,
    ShortI0,
    ShortJ0,
    ShortK0,
    ShortL0,

    // 三笔形态
    /// 向下不重合
    DownNonOverlap,
    /// 向下奔走型
    DownRunaway,
    /// 向下收敛
    DownConverging,
    /// 向下扩张
    DownExpanding,
    /// 向下盘背
    DownConsolidationDivergence,
    /// 向下无背
    DownNoDivergence,
    UpNonOverlap,
    UpRunaway,
    UpConverging,
    UpExpanding,
    UpConsolidationDivergence,
    UpNoDivergence,
}

/// 形态识别器，输入按时间排序的一段走势窗口。
///
/// 窗口可能比期望的短甚至为空，实现方需自行返回 `PatternLabel::Other`。
pub trait PatternClassifier: Send + Sync {
    fn classify(&self, window: &[ElementarySegment]) -> PatternLabel;
}

/// 默认识别器：始终返回 `Other`。
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralClassifier;

impl PatternClassifier for NeutralClassifier {
    fn classify(&self, _window: &[ElementarySegment]) -> PatternLabel {
        PatternLabel::Other
    }
}

/// 最后三根无包含 K 线的高点形态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ThreeBarShape {
    Other,
    BottomTurn,
    Rising,
    TopTurn,
    Falling,
}

/// 最后一笔与其后未完成走势的关系（表里关系）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SurfaceRelation {
    Other,
    /// 向上笔顶分完成
    UpComplete,
    /// 向上笔走势延伸
    UpExtending,
    /// 向下笔底分完成
    DownComplete,
    /// 向下笔走势延伸
    DownExtending,
}

impl SurfaceRelation {
    pub fn is_extending(self) -> bool {
        matches!(self, Self::UpExtending | Self::DownExtending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailingStroke {
    /// 倒数第几笔，从 1 开始。
    pub offset: usize,
    pub direction: Direction,
    pub length: usize,
    pub power: f64,
    pub change: f64,
    pub rsq: f64,
    pub fractal_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub close_price: f64,
    pub unfinished_len: usize,
    pub three_bar: ThreeBarShape,
    pub surface: SurfaceRelation,
    /// 倒1 起的逐笔统计，条数为 min(5, 已确认笔数 - 1)，最早的一笔不出现。
    pub trailing: Vec<TrailingStroke>,
    pub inner_shape: PatternLabel,
    /// 倒1..倒5 的三笔形态。
    pub three_stroke: Vec<PatternLabel>,
    /// 倒1..倒7 的多笔形态。
    pub shapes: Vec<PatternLabel>,
}

impl Snapshot {
    pub fn trailing_at(&self, offset: usize) -> Option<&TrailingStroke> {
        self.trailing.iter().find(|x| x.offset == offset)
    }
}

pub(crate) fn build_snapshot(
    last_bar: &RawBar,
    unfinished: &[MergedBar],
    strokes: &[Stroke],
    classifier: &dyn PatternClassifier,
) -> Snapshot {
    let mut snapshot = Snapshot {
        symbol: last_bar.symbol.clone(),
        datetime: last_bar.datetime,
        close_price: last_bar.close_price,
        unfinished_len: unfinished.len(),
        three_bar: three_bar_shape(unfinished),
        surface: SurfaceRelation::Other,
        trailing: Vec::new(),
        inner_shape: PatternLabel::Other,
        three_stroke: vec![PatternLabel::Other; Const::TRAILING_DEPTH],
        shapes: vec![PatternLabel::Other; Const::SHAPE_DEPTH],
    };

    snapshot.surface = surface_relation(unfinished, strokes.last());

    let confirmed = if snapshot.surface.is_extending() {
        if let Some(last) = strokes.last() {
            snapshot.unfinished_len = (unfinished.len() + last.length).saturating_sub(3);
        }
        &strokes[..strokes.len() - 1]
    } else {
        strokes
    };

    let Some(last) = confirmed.last() else {
        return snapshot;
    };

    snapshot.inner_shape = last_match(&last.segments, 0, classifier);

    for (idx, stroke) in confirmed
        .iter()
        .rev()
        .take(Const::TRAILING_DEPTH.min(confirmed.len() - 1))
        .enumerate()
    {
        snapshot.trailing.push(TrailingStroke {
            offset: idx + 1,
            direction: stroke.direction,
            length: stroke.length,
            power: stroke.power,
            change: stroke.change,
            rsq: stroke.rsq,
            fractal_count: stroke.fractals.len(),
        });
    }

    let segments: Vec<ElementarySegment> = confirmed.iter().map(Stroke::as_segment).collect();
    for (idx, label) in snapshot.three_stroke.iter_mut().enumerate() {
        *label = classifier.classify(trailing_window(&segments, idx, THREE_STROKE_RUN));
    }
    for (idx, label) in snapshot.shapes.iter_mut().enumerate() {
        *label = last_match(&segments, idx, classifier);
    }

    snapshot
}

/// 在 5/7/9/11/13 长度的窗口上依次识别，保留最后一个非 `Other` 的结果。
fn last_match(
    segments: &[ElementarySegment],
    end_offset: usize,
    classifier: &dyn PatternClassifier,
) -> PatternLabel {
    let mut label = PatternLabel::Other;
    for run in SHAPE_RUNS {
        let value = classifier.classify(trailing_window(segments, end_offset, run));
        if value != PatternLabel::Other {
            label = value;
        }
    }
    label
}

fn three_bar_shape(unfinished: &[MergedBar]) -> ThreeBarShape {
    let [a, b, c] = match unfinished {
        [.., a, b, c] => [a.high_price, b.high_price, c.high_price],
        _ => return ThreeBarShape::Other,
    };
    if a > b && b < c {
        ThreeBarShape::BottomTurn
    } else if a < b && b < c {
        ThreeBarShape::Rising
    } else if a < b && b > c {
        ThreeBarShape::TopTurn
    } else if a > b && b > c {
        ThreeBarShape::Falling
    } else {
        ThreeBarShape::Other
    }
}

fn surface_relation(unfinished: &[MergedBar], last: Option<&Stroke>) -> SurfaceRelation {
    let Some(last) = last else {
        return SurfaceRelation::Other;
    };
    match last.direction {
        Direction::Up => {
            let max_high = unfinished
                .iter()
                .map(|x| x.high_price)
                .fold(f64::NEG_INFINITY, f64::max);
            if max_high > last.high_price {
                SurfaceRelation::UpExtending
            } else {
                SurfaceRelation::UpComplete
            }
        }
        Direction::Down => {
            let min_low = unfinished
                .iter()
                .map(|x| x.low_price)
                .fold(f64::INFINITY, f64::min);
            if min_low < last.low_price {
                SurfaceRelation::DownExtending
            } else {
                SurfaceRelation::DownComplete
            }
        }
    }
}
