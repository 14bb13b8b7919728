pub mod aligner;
pub mod bar;
pub mod config;
pub mod constant;
pub mod engine;
pub mod events;
pub mod fractal;
pub mod frame;
pub mod logging;
pub mod merger;
pub mod mtc;
pub mod receiver;
pub mod signals;
pub mod stroke;
pub mod utils;

pub use aligner::{sub_span, sub_strokes_of};
pub use bar::{Fractal, MergedBar, RawBar};
pub use config::EngineConfig;
pub use constant::{
	Const, DataError, Direction, EventType, FractalStrength, Mark, Timeframe,
};
pub use engine::{StrokeEngine, StrokePoint};
pub use events::{EventPayload, Observable, Subscriber};
pub use fractal::{detect_fractal, scan_fractals};
pub use logging::init_logging;
pub use merger::{MergeOutcome, merge_bars, remove_include};
pub use mtc::{Alignment, MultiTimeframeContext};
pub use receiver::{ingest_csv, load_raw_bars, parse_datetime};
pub use signals::{
	NeutralClassifier, PatternClassifier, PatternLabel, Snapshot, SurfaceRelation,
	ThreeBarShape, TrailingStroke,
};
pub use stroke::{ElementarySegment, Stroke, build_stroke, elementary_segments};
pub use utils::rsq;
