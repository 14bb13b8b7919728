use std::path::PathBuf;

use chanlun::{
    Direction, EngineConfig, StrokeEngine, StrokePoint, Timeframe, init_logging, load_raw_bars,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct AuditReport {
    symbol: String,
    timeframe: String,
    bars: usize,
    retained_bars: usize,
    unfinished: usize,
    strokes: usize,
    violations: Vec<String>,
    stroke_points: Vec<StrokePoint>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "usage: cargo run -q -p replay --bin audit_strokes -- <csv_path> <symbol> <timeframe:1m|5m|15m|30m|1h|1d|1w> [max_strokes]"
        );
        std::process::exit(2);
    }

    init_logging();

    let csv_path = PathBuf::from(&args[1]);
    let symbol = args[2].clone();
    let timeframe = Timeframe::parse(&args[3])?;
    let max_strokes = if args.len() >= 5 {
        args[4].parse::<usize>()?
    } else {
        100
    };

    let config = EngineConfig::new(symbol.clone(), timeframe).with_max_strokes(max_strokes);
    let mut engine = StrokeEngine::new(config)?;

    let bars = load_raw_bars(&csv_path, symbol.clone())?;
    let count = bars.len();
    for bar in bars {
        engine.update(bar)?;
    }

    let mut violations = Vec::<String>::new();

    for pair in engine.unfinished_bars().windows(2) {
        if pair[0].is_inclusive(&pair[1]) {
            violations.push(format!(
                "MERGED inclusive violation: {} / {}",
                pair[0].datetime, pair[1].datetime
            ));
        }
    }

    for stroke in engine.strokes() {
        for pair in stroke.bars.windows(2) {
            if pair[0].is_inclusive(&pair[1]) {
                violations.push(format!(
                    "STROKE bars inclusive at {} / {}",
                    pair[0].datetime, pair[1].datetime
                ));
            }
        }
        if stroke.length < 7 {
            violations.push(format!(
                "STROKE too short start={} length={}",
                stroke.start(),
                stroke.length
            ));
        }
        let expected = stroke.fx_a.mark.stroke_direction();
        if stroke.direction != expected {
            violations.push(format!(
                "STROKE direction mismatch start={} got={:?} expected={:?}",
                stroke.start(),
                stroke.direction,
                expected
            ));
        }
        let extreme_ok = match stroke.direction {
            Direction::Up => stroke.fx_b.extreme > stroke.fx_a.extreme,
            Direction::Down => stroke.fx_b.extreme < stroke.fx_a.extreme,
        };
        if !extreme_ok {
            violations.push(format!("STROKE extreme not breached start={}", stroke.start()));
        }
    }

    for pair in engine.strokes().windows(2) {
        if pair[0].direction == pair[1].direction {
            violations.push(format!(
                "STROKE alternation violation at {} / {}",
                pair[0].start(),
                pair[1].start()
            ));
        }
        if pair[0].fx_b.datetime != pair[1].fx_a.datetime {
            violations.push(format!(
                "STROKE continuity gap between {} and {}",
                pair[0].end(),
                pair[1].start()
            ));
        }
    }

    if let (Some(first_bar), Some(first_stroke)) = (engine.raw_bars().first(), engine.strokes().first()) {
        if first_bar.datetime > first_stroke.first_bar_datetime() {
            violations.push("RAW history trimmed past the first retained stroke".to_string());
        }
    }

    let report = AuditReport {
        symbol,
        timeframe: timeframe.to_string(),
        bars: count,
        retained_bars: engine.raw_bars().len(),
        unfinished: engine.unfinished_bars().len(),
        strokes: engine.strokes().len(),
        violations,
        stroke_points: engine.stroke_points(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.violations.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
