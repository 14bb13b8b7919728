use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bar::{Fractal, MergedBar};
use crate::constant::{Const, Direction, Mark};
use crate::fractal::scan_fractals;
use crate::utils::{round_to, rsq};

/// 笔内部相邻两个分型之间的走势，用于内部形态识别。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementarySegment {
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub direction: Direction,
    pub high_price: f64,
    pub low_price: f64,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub symbol: String,
    pub direction: Direction,
    pub fx_a: Fractal,
    pub fx_b: Fractal,
    pub fractals: Vec<Fractal>,
    pub segments: Vec<ElementarySegment>,
    pub high_price: f64,
    pub low_price: f64,
    pub power: f64,
    pub change: f64,
    pub rsq: f64,
    pub length: usize,
    pub bars: Vec<MergedBar>,
}

impl Stroke {
    pub fn start(&self) -> DateTime<Utc> {
        self.fx_a.datetime
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.fx_b.datetime
    }

    /// 笔覆盖的第一根无包含 K 线时间。
    pub fn first_bar_datetime(&self) -> DateTime<Utc> {
        self.fx_a.first_datetime()
    }

    pub fn as_segment(&self) -> ElementarySegment {
        ElementarySegment {
            symbol: self.symbol.clone(),
            start: self.fx_a.datetime,
            end: self.fx_b.datetime,
            direction: self.direction,
            high_price: self.high_price,
            low_price: self.low_price,
            power: self.power,
        }
    }
}

/// 由分型序列生成内部线段；分型数量为奇数时丢弃最后一个。
pub fn elementary_segments(fractals: &[Fractal]) -> Vec<ElementarySegment> {
    let usable = fractals.len() - fractals.len() % 2;
    fractals[..usable]
        .windows(2)
        .map(|pair| {
            let (fx1, fx2) = (&pair[0], &pair[1]);
            match fx1.mark {
                Mark::Bottom => ElementarySegment {
                    symbol: fx1.symbol.clone(),
                    start: fx1.datetime,
                    end: fx2.datetime,
                    direction: Direction::Up,
                    high_price: fx2.high_price,
                    low_price: fx1.low_price,
                    power: round_to(fx2.high_price - fx1.low_price, 2),
                },
                Mark::Top => ElementarySegment {
                    symbol: fx1.symbol.clone(),
                    start: fx1.datetime,
                    end: fx2.datetime,
                    direction: Direction::Down,
                    high_price: fx1.high_price,
                    low_price: fx2.low_price,
                    power: round_to(fx1.high_price - fx2.low_price, 2),
                },
            }
        })
        .collect()
}

/// 在一串无包含 K 线中查找第一笔。
///
/// 成功时返回笔以及从终点分型第一根 K 线开始的剩余序列；
/// 找不到合格终点时返回 `None`，调用方保留原序列继续等待。
pub fn build_stroke(bars: &[MergedBar]) -> Option<(Stroke, &[MergedBar])> {
    let fractals = scan_fractals(bars);
    if fractals.len() < 2 {
        return None;
    }

    let fx_a = &fractals[0];
    let direction = fx_a.mark.stroke_direction();
    let fx_b = select_end_fractal(&fractals, fx_a)?;

    let span_start = fx_a.first_datetime();
    let span_end = fx_b.last_datetime();
    let span: Vec<MergedBar> = bars
        .iter()
        .filter(|x| x.datetime >= span_start && x.datetime <= span_end)
        .cloned()
        .collect();

    if span.len() < Const::MIN_STROKE_BARS || fx_a.range_contains(fx_b) {
        return None;
    }

    let inner: Vec<Fractal> = fractals
        .iter()
        .filter(|x| x.datetime >= span_start && x.datetime <= span_end)
        .cloned()
        .collect();
    let closes: Vec<f64> = span[1..span.len() - 1]
        .iter()
        .map(|x| x.close_price)
        .collect();

    let stroke = Stroke {
        symbol: fx_a.symbol.clone(),
        direction,
        power: round_to((fx_b.extreme - fx_a.extreme).abs(), 2),
        change: round_to((fx_b.extreme - fx_a.extreme) / fx_a.extreme, 4),
        high_price: fx_a.high_price.max(fx_b.high_price),
        low_price: fx_a.low_price.min(fx_b.low_price),
        rsq: rsq(&closes),
        length: span.len(),
        segments: elementary_segments(&inner),
        fractals: inner,
        bars: span,
        fx_a: fx_a.clone(),
        fx_b: fx_b.clone(),
    };

    let rest_from = bars.partition_point(|x| x.datetime < stroke.fx_b.first_datetime());
    Some((stroke, &bars[rest_from..]))
}

/// 终点候选：方向相反、时间在后且极值突破起点的分型，取最极端者（相同取最晚）。
fn select_end_fractal<'a>(fractals: &'a [Fractal], fx_a: &Fractal) -> Option<&'a Fractal> {
    let target = fx_a.mark.opposite();
    let mut candidates = fractals.iter().filter(|x| {
        x.mark == target
            && x.datetime > fx_a.datetime
            && match fx_a.mark {
                Mark::Bottom => x.extreme > fx_a.extreme,
                Mark::Top => x.extreme < fx_a.extreme,
            }
    });

    let mut best = candidates.next()?;
    for fx in candidates {
        let better = match fx_a.mark {
            Mark::Bottom => fx.high_price >= best.high_price,
            Mark::Top => fx.low_price <= best.low_price,
        };
        if better {
            best = fx;
        }
    }
    Some(best)
}
