//! 多周期上下文（MTC）对外入口。
//!
//! 该模块负责：
//! - 同一品种下，每个登记的周期持有一个 `StrokeEngine`；
//! - 按周期分发原始 K 线；
//! - 将大级别的一笔映射到小级别的笔序列，做多级别联立。

use std::collections::HashMap;

use crate::aligner::sub_strokes_of;
use crate::bar::RawBar;
use crate::config::EngineConfig;
use crate::constant::{Const, DataError, EventType, Timeframe};
use crate::engine::StrokeEngine;
use crate::events::Subscriber;
use crate::signals::Snapshot;
use crate::stroke::Stroke;

/// 大级别最后一笔及其对应的小级别笔。
#[derive(Debug, Clone)]
pub struct Alignment<'a> {
    pub coarse: &'a Stroke,
    pub fine: Vec<&'a Stroke>,
}

pub struct MultiTimeframeContext {
    symbol: String,
    max_strokes: usize,
    engines: HashMap<Timeframe, StrokeEngine>,
    subscribers: Vec<(Option<EventType>, Subscriber)>,
}

impl MultiTimeframeContext {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            max_strokes: Const::DEFAULT_MAX_STROKES,
            engines: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn with_max_strokes(mut self, max_strokes: usize) -> Self {
        self.max_strokes = max_strokes;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn register(&mut self, timeframe: Timeframe) -> Result<(), DataError> {
        if self.engines.contains_key(&timeframe) {
            return Ok(());
        }

        let config = EngineConfig::new(self.symbol.clone(), timeframe)
            .with_max_strokes(self.max_strokes);
        let mut engine = StrokeEngine::new(config)?;
        for (event_type, subscriber) in &self.subscribers {
            engine.subscribe(*event_type, subscriber.clone());
        }
        self.engines.insert(timeframe, engine);
        Ok(())
    }

    /// 订阅所有周期的事件，之后登记的周期同样生效。
    pub fn subscribe(&mut self, event_type: Option<EventType>, subscriber: Subscriber) {
        for engine in self.engines.values_mut() {
            engine.subscribe(event_type, subscriber.clone());
        }
        self.subscribers.push((event_type, subscriber));
    }

    pub fn append(&mut self, timeframe: Timeframe, bar: RawBar) -> Result<(), DataError> {
        let engine = self
            .engines
            .get_mut(&timeframe)
            .ok_or_else(|| DataError::InvalidTimeframe(format!("{timeframe} is not registered")))?;
        engine.update(bar)
    }

    pub fn engine(&self, timeframe: Timeframe) -> Option<&StrokeEngine> {
        self.engines.get(&timeframe)
    }

    pub fn strokes(&self, timeframe: Timeframe) -> &[Stroke] {
        self.engines
            .get(&timeframe)
            .map(|x| x.strokes())
            .unwrap_or_default()
    }

    pub fn snapshot(&self, timeframe: Timeframe) -> Option<&Snapshot> {
        self.engines.get(&timeframe).and_then(|x| x.snapshot())
    }

    pub fn sub_strokes(&self, fine_tf: Timeframe, coarse: &Stroke) -> Vec<&Stroke> {
        sub_strokes_of(self.strokes(fine_tf), coarse)
    }

    pub fn latest_alignment(&self, coarse_tf: Timeframe, fine_tf: Timeframe) -> Option<Alignment<'_>> {
        let coarse = self.strokes(coarse_tf).last()?;
        Some(Alignment {
            coarse,
            fine: self.sub_strokes(fine_tf, coarse),
        })
    }
}
