use chrono::{DateTime, Duration, TimeZone, Utc};

use chanlun::{FractalStrength, Mark, MergedBar, RawBar, detect_fractal, merge_bars, scan_fractals};

#[test]
fn top_without_gap_takes_low_from_first_bar() {
    let k1 = merged(0, 11.0, 9.0, 10.0);
    let k2 = merged(1, 12.0, 10.0, 11.0);
    let k3 = merged(2, 11.0, 9.5, 8.5);

    let fx = detect_fractal(&k1, &k2, &k3).expect("top fractal");
    assert_eq!(fx.mark, Mark::Top);
    assert_eq!(fx.datetime, minute(1));
    assert_eq!(fx.high_price, 12.0);
    assert_eq!(fx.extreme, 12.0);
    assert_eq!(fx.low_price, 9.0);
    assert_eq!(fx.strength, FractalStrength::Strong);
    assert_eq!(fx.first_datetime(), minute(0));
    assert_eq!(fx.last_datetime(), minute(2));
}

#[test]
fn top_after_gap_takes_low_from_middle_bar() {
    let k1 = merged(0, 10.0, 9.0, 9.5);
    let k2 = merged(1, 12.0, 10.5, 11.0);
    let k3 = merged(2, 11.0, 9.5, 10.0);

    let fx = detect_fractal(&k1, &k2, &k3).expect("top fractal");
    assert_eq!(fx.low_price, 10.5);
    assert_eq!(fx.strength, FractalStrength::Weak);
}

#[test]
fn bottom_takes_high_from_first_bar_when_overlapping() {
    let k1 = merged(0, 12.0, 10.0, 10.5);
    let k2 = merged(1, 11.0, 9.0, 9.5);
    let k3 = merged(2, 11.5, 9.5, 12.5);

    let fx = detect_fractal(&k1, &k2, &k3).expect("bottom fractal");
    assert_eq!(fx.mark, Mark::Bottom);
    assert_eq!(fx.low_price, 9.0);
    assert_eq!(fx.extreme, 9.0);
    assert_eq!(fx.high_price, 12.0);
    assert_eq!(fx.strength, FractalStrength::Strong);
}

#[test]
fn flat_middle_bar_falls_back_to_first_bar_boundary() {
    // 有缺口时本应取 k2 低点，但它与 k2 高点相同，改取 k1 低点
    let top = detect_fractal(
        &merged(0, 10.0, 9.0, 9.5),
        &merged(1, 12.0, 12.0, 12.0),
        &merged(2, 11.0, 10.0, 10.5),
    )
    .expect("top fractal");
    assert_eq!(top.mark, Mark::Top);
    assert_eq!(top.high_price, 12.0);
    assert_eq!(top.low_price, 9.0);

    let bottom = detect_fractal(
        &merged(0, 12.0, 11.0, 11.5),
        &merged(1, 9.0, 9.0, 9.0),
        &merged(2, 10.0, 9.5, 9.8),
    )
    .expect("bottom fractal");
    assert_eq!(bottom.mark, Mark::Bottom);
    assert_eq!(bottom.low_price, 9.0);
    assert_eq!(bottom.high_price, 12.0);
}

#[test]
fn fractal_elements_drop_constituents() {
    let raw: Vec<RawBar> = [(10.0, 9.0), (12.0, 10.0), (11.5, 10.5), (11.0, 9.5), (10.5, 8.5)]
        .iter()
        .enumerate()
        .map(|(i, (h, l))| RawBar {
            symbol: "RB2405".to_string(),
            datetime: minute(i as i64),
            open_price: *l,
            high_price: *h,
            low_price: *l,
            close_price: *h,
            volume: 1.0,
        })
        .collect();
    let bars = merge_bars(&raw);
    assert_eq!(bars[1].elements.len(), 2);

    let fractals = scan_fractals(&bars);
    assert_eq!(fractals.len(), 1);
    let fx = &fractals[0];
    assert_eq!(fx.mark, Mark::Top);
    assert_eq!(fx.elements[1].datetime, bars[1].datetime);
    assert_eq!(fx.elements[1].high_price, 12.0);
    assert!(fx.elements.iter().all(|x| x.elements.is_empty()));
}

#[test]
fn monotonic_run_has_no_fractal() {
    let k1 = merged(0, 10.0, 9.0, 9.5);
    let k2 = merged(1, 11.0, 10.0, 10.5);
    let k3 = merged(2, 12.0, 11.0, 11.5);
    assert!(detect_fractal(&k1, &k2, &k3).is_none());
}

#[test]
fn scan_replaces_repeated_mark_after_two_accepted() {
    let hl = [
        (10.0, 9.0),
        (9.0, 8.0),
        (9.5, 8.5),
        (9.5, 8.1),
        (10.0, 8.6),
        (9.8, 8.4),
        (10.5, 8.0),
        (10.6, 8.3),
        (10.6, 7.9),
        (11.0, 8.2),
    ];
    let bars: Vec<MergedBar> = hl
        .iter()
        .enumerate()
        .map(|(i, (h, l))| merged(i as i64, *h, *l, *h))
        .collect();

    let fractals = scan_fractals(&bars);
    let marks: Vec<Mark> = fractals.iter().map(|x| x.mark).collect();
    // 最前面的两个底分型都保留，后面的重复底分型被替换
    assert_eq!(marks, vec![Mark::Bottom, Mark::Bottom, Mark::Top, Mark::Bottom]);
    assert_eq!(fractals[3].datetime, minute(8));
    assert_eq!(fractals[3].extreme, 7.9);
}

#[test]
fn zigzag_fractals_alternate_and_hit_pivots() {
    let bars = merge_bars(&centers_to_bars(&zigzag_centers(&[10.0, 15.0, 8.0, 20.0, 5.0], 8)));
    let fractals = scan_fractals(&bars);

    let extremes: Vec<f64> = fractals.iter().map(|x| x.extreme).collect();
    assert_eq!(extremes, vec![10.0, 15.0, 8.0, 20.0]);
    for pair in fractals.windows(2) {
        assert_ne!(pair[0].mark, pair[1].mark);
    }
    assert_eq!(fractals[0].datetime, minute(8));
    assert_eq!(fractals[3].datetime, minute(32));
}

fn minute(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap() + Duration::minutes(offset)
}

fn merged(offset: i64, high: f64, low: f64, close: f64) -> MergedBar {
    MergedBar::from_raw(&RawBar {
        symbol: "RB2405".to_string(),
        datetime: minute(offset),
        open_price: low,
        high_price: high,
        low_price: low,
        close_price: close,
        volume: 1.0,
    })
}

fn centers_to_bars(centers: &[f64]) -> Vec<RawBar> {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| RawBar {
            symbol: "RB2405".to_string(),
            datetime: minute(i as i64),
            open_price: c - 0.5,
            high_price: c + 0.5,
            low_price: c - 0.5,
            close_price: c + 0.5,
            volume: 1.0,
        })
        .collect()
}

/// 按拐点生成折线走势，每段 `steps` 根 K 线；底部 K 线低点、顶部 K 线高点恰好落在拐点。
fn zigzag_centers(pivots: &[f64], steps: usize) -> Vec<f64> {
    let center = |i: usize| {
        let bottom = (i + 1 < pivots.len() && pivots[i + 1] > pivots[i])
            || (i > 0 && pivots[i - 1] > pivots[i]);
        if bottom { pivots[i] + 0.5 } else { pivots[i] - 0.5 }
    };

    let first = center(0);
    let lead = if pivots.len() > 1 && pivots[1] > pivots[0] {
        first + 2.0
    } else {
        first - 2.0
    };
    let mut out: Vec<f64> = (0..steps)
        .map(|k| lead + (first - lead) * k as f64 / steps as f64)
        .collect();
    for i in 0..pivots.len() - 1 {
        let (a, b) = (center(i), center(i + 1));
        out.extend((0..steps).map(|k| a + (b - a) * k as f64 / steps as f64));
    }
    out.push(center(pivots.len() - 1));
    out
}
