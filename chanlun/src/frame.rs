//! polars 表格视图，供研究端批量读取。

use polars::df;
use polars::prelude::DataFrame;

use crate::bar::{MergedBar, RawBar};
use crate::constant::{DataError, Direction};
use crate::stroke::Stroke;

pub fn raw_bar_frame(bars: &[RawBar]) -> Result<DataFrame, DataError> {
    let datetime: Vec<i64> = bars.iter().map(|x| x.datetime.timestamp_millis()).collect();
    let open_price: Vec<f64> = bars.iter().map(|x| x.open_price).collect();
    let high_price: Vec<f64> = bars.iter().map(|x| x.high_price).collect();
    let low_price: Vec<f64> = bars.iter().map(|x| x.low_price).collect();
    let close_price: Vec<f64> = bars.iter().map(|x| x.close_price).collect();
    let volume: Vec<f64> = bars.iter().map(|x| x.volume).collect();

    let frame = df!(
        "datetime" => datetime,
        "open_price" => open_price,
        "high_price" => high_price,
        "low_price" => low_price,
        "close_price" => close_price,
        "volume" => volume
    )?;
    Ok(frame)
}

pub fn merged_bar_frame(bars: &[MergedBar]) -> Result<DataFrame, DataError> {
    let datetime: Vec<i64> = bars.iter().map(|x| x.datetime.timestamp_millis()).collect();
    let high_price: Vec<f64> = bars.iter().map(|x| x.high_price).collect();
    let low_price: Vec<f64> = bars.iter().map(|x| x.low_price).collect();
    let volume: Vec<f64> = bars.iter().map(|x| x.volume).collect();
    let elements: Vec<u32> = bars.iter().map(|x| x.elements.len() as u32).collect();

    let frame = df!(
        "datetime" => datetime,
        "high_price" => high_price,
        "low_price" => low_price,
        "volume" => volume,
        "elements" => elements
    )?;
    Ok(frame)
}

pub fn stroke_frame(strokes: &[Stroke]) -> Result<DataFrame, DataError> {
    let direction: Vec<i32> = strokes
        .iter()
        .map(|x| match x.direction {
            Direction::Up => 1,
            Direction::Down => -1,
        })
        .collect();
    let start: Vec<i64> = strokes.iter().map(|x| x.start().timestamp_millis()).collect();
    let end: Vec<i64> = strokes.iter().map(|x| x.end().timestamp_millis()).collect();
    let start_price: Vec<f64> = strokes.iter().map(|x| x.fx_a.extreme).collect();
    let end_price: Vec<f64> = strokes.iter().map(|x| x.fx_b.extreme).collect();
    let high_price: Vec<f64> = strokes.iter().map(|x| x.high_price).collect();
    let low_price: Vec<f64> = strokes.iter().map(|x| x.low_price).collect();
    let power: Vec<f64> = strokes.iter().map(|x| x.power).collect();
    let change: Vec<f64> = strokes.iter().map(|x| x.change).collect();
    let rsq: Vec<f64> = strokes.iter().map(|x| x.rsq).collect();
    let length: Vec<u32> = strokes.iter().map(|x| x.length as u32).collect();
    let fractal_count: Vec<u32> = strokes.iter().map(|x| x.fractals.len() as u32).collect();

    let frame = df!(
        "direction" => direction,
        "start" => start,
        "end" => end,
        "start_price" => start_price,
        "end_price" => end_price,
        "high_price" => high_price,
        "low_price" => low_price,
        "power" => power,
        "change" => change,
        "rsq" => rsq,
        "length" => length,
        "fractal_count" => fractal_count
    )?;
    Ok(frame)
}
