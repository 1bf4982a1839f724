//! Dream signal classifier and symbol evolution engine.
//!
//! Classifies dream narratives on two axes (valence: Upper/Downer, energy:
//! Dynamic/Static), folds each classification into a per-user running
//! aggregate, and maps that aggregate to deterministic, monotonically
//! growing symbol parameters.
//!
//! Zero I/O: persistence comes in through [`AggregateStore`], rendering
//! through [`SymbolRenderer`].

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod extract;
pub mod lexicon;
pub mod quadrant;
pub mod sentiment;
pub mod store;
pub mod symbol;
pub mod tokenizer;

pub use aggregate::{AxisSum, QuadrantCounts, QuadrantTally, UserAggregate, UserStats};
pub use classify::{ClassifiedDream, Classifier};
pub use config::Config;
pub use engine::{DreamEngine, DreamRecord, Submission};
pub use error::{DreamError, Result};
pub use extract::{DreamText, Extractor, Signal};
pub use quadrant::{AxisScore, Quadrant};
pub use store::{AggregateStore, CasOutcome, MemoryStore};
pub use symbol::{SymbolMapper, SymbolParams, SymbolRenderer, growth_stage};
pub use tokenizer::tokenize;
