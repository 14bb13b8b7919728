use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::bar::RawBar;
use crate::constant::DataError;
use crate::engine::StrokeEngine;

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    #[serde(alias = "dt", alias = "date")]
    datetime: String,
    #[serde(alias = "open")]
    open_price: f64,
    #[serde(alias = "high")]
    high_price: f64,
    #[serde(alias = "low")]
    low_price: f64,
    #[serde(alias = "close")]
    close_price: f64,
    #[serde(default, alias = "vol")]
    volume: f64,
}

/// 从 csv 读取原始 K 线，列名兼容 `open`/`open_price` 等写法。
pub fn load_raw_bars(
    file_path: impl AsRef<Path>,
    symbol: impl Into<String>,
) -> Result<Vec<RawBar>, DataError> {
    let symbol = symbol.into();
    let mut reader = csv::Reader::from_path(file_path)?;
    let mut out = Vec::new();

    for row in reader.deserialize::<CsvBarRow>() {
        let row = row?;
        out.push(RawBar {
            symbol: symbol.clone(),
            datetime: parse_datetime(&row.datetime)?,
            open_price: row.open_price,
            high_price: row.high_price,
            low_price: row.low_price,
            close_price: row.close_price,
            volume: row.volume,
        });
    }

    Ok(out)
}

/// 读取 csv 并逐根推送给引擎，返回推送的 K 线数量。
pub fn ingest_csv(engine: &mut StrokeEngine, file_path: impl AsRef<Path>) -> Result<usize, DataError> {
    let symbol = engine.config().symbol.clone();
    let bars = load_raw_bars(file_path, symbol)?;
    let count = bars.len();
    for bar in bars {
        engine.update(bar)?;
    }
    Ok(count)
}

pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, DataError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let patterns = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y%m%d%H%M%S%.f",
    ];

    for pattern in patterns {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    for pattern in ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"] {
        if let Some(dt) = NaiveDate::parse_from_str(value, pattern)
            .ok()
            .and_then(|x| x.and_hms_opt(0, 0, 0))
        {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    Err(DataError::InvalidDatetime(value.to_string()))
}
