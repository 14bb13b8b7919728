use chrono::{DateTime, Utc};

use crate::constant::Direction;
use crate::stroke::Stroke;

/// 取出时间区间 `[start, end]` 内的笔，首尾方向与 `direction` 不一致时各去掉一笔。
///
/// 跨越起点或终点的笔也会保留，便于小级别笔完整覆盖大级别的一笔。
pub fn sub_span<'a>(
    strokes: &'a [Stroke],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    direction: Direction,
) -> Vec<&'a Stroke> {
    let mut span: Vec<&Stroke> = strokes
        .iter()
        .filter(|x| {
            let (a, b) = (x.fx_a.datetime, x.fx_b.datetime);
            (a < start && start < b) || (start <= a && a < b && b <= end) || (a < end && end < b)
        })
        .collect();

    if span.first().is_some_and(|x| x.direction != direction) {
        span.remove(0);
    }
    if span.last().is_some_and(|x| x.direction != direction) {
        span.pop();
    }
    span
}

/// 小级别笔序列中与大级别某一笔对应的部分。
pub fn sub_strokes_of<'a>(strokes: &'a [Stroke], coarse: &Stroke) -> Vec<&'a Stroke> {
    sub_span(
        strokes,
        coarse.fx_a.datetime,
        coarse.fx_b.datetime,
        coarse.direction,
    )
}
