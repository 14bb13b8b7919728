use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use chanlun::{
    DataError, Direction, EventPayload, EventType, MultiTimeframeContext, RawBar, Timeframe,
};

#[test]
fn timeframes_are_processed_independently() {
    let mut mtc = MultiTimeframeContext::new("RB2405");
    mtc.register(Timeframe::M1).expect("register 1m");
    mtc.register(Timeframe::M5).expect("register 5m");

    for bar in sample_bars() {
        mtc.append(Timeframe::M1, bar).expect("ordered bars");
    }

    assert_eq!(mtc.symbol(), "RB2405");
    assert_eq!(mtc.strokes(Timeframe::M1).len(), 4);
    assert!(mtc.strokes(Timeframe::M5).is_empty());
    assert!(mtc.strokes(Timeframe::D1).is_empty());
    assert!(mtc.snapshot(Timeframe::M1).is_some());
    assert!(mtc.snapshot(Timeframe::M5).is_none());
}

#[test]
fn unregistered_timeframe_is_rejected() {
    let mut mtc = MultiTimeframeContext::new("RB2405");
    mtc.register(Timeframe::M1).expect("register 1m");

    let bar = sample_bars().remove(0);
    let err = mtc.append(Timeframe::H1, bar).unwrap_err();
    assert!(matches!(err, DataError::InvalidTimeframe(_)));
}

#[test]
fn latest_alignment_maps_last_coarse_stroke() {
    let mut mtc = MultiTimeframeContext::new("RB2405");
    mtc.register(Timeframe::M1).expect("register 1m");
    mtc.register(Timeframe::M5).expect("register 5m");

    for bar in sample_bars() {
        mtc.append(Timeframe::M1, bar.clone()).expect("ordered bars");
        mtc.append(Timeframe::M5, bar).expect("ordered bars");
    }

    let alignment = mtc
        .latest_alignment(Timeframe::M5, Timeframe::M1)
        .expect("coarse strokes exist");
    assert_eq!(alignment.coarse.direction, Direction::Down);
    assert_eq!(alignment.fine.len(), 1);
    assert_eq!(alignment.fine[0].fx_a.datetime, minute(32));

    let first = &mtc.strokes(Timeframe::M5)[0];
    let fine = mtc.sub_strokes(Timeframe::M1, first);
    assert_eq!(fine.len(), 1);
    assert_eq!(fine[0].direction, Direction::Up);

    assert!(mtc.latest_alignment(Timeframe::D1, Timeframe::M1).is_none());
}

#[test]
fn subscription_reaches_engines_registered_later() {
    let mut mtc = MultiTimeframeContext::new("RB2405").with_max_strokes(2);

    let finalized = Arc::new(Mutex::new(Vec::<(Timeframe, usize)>::new()));
    let sink = Arc::clone(&finalized);
    mtc.subscribe(
        Some(EventType::StrokeFinalized),
        Arc::new(move |tf: Timeframe, _evt: EventType, payload: &EventPayload| {
            sink.lock().expect("lock").push((tf, payload.count));
        }),
    );
    mtc.register(Timeframe::M15).expect("register 15m");

    for bar in sample_bars() {
        mtc.append(Timeframe::M15, bar).expect("ordered bars");
    }

    let guard = finalized.lock().expect("lock");
    assert_eq!(guard.len(), 4);
    assert!(guard.iter().all(|(tf, _)| *tf == Timeframe::M15));
    assert_eq!(mtc.strokes(Timeframe::M15).len(), 2);
}

#[test]
fn zero_retention_fails_registration() {
    let mut mtc = MultiTimeframeContext::new("RB2405").with_max_strokes(0);
    assert!(mtc.register(Timeframe::M1).is_err());
}

fn minute(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap() + Duration::minutes(offset)
}

fn sample_bars() -> Vec<RawBar> {
    let mut centers = zigzag_centers(&[10.0, 15.0, 8.0, 20.0, 5.0], 8);
    centers.extend([6.0, 7.0, 8.0]);
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
