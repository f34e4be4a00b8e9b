//! # Tactus - tempo-map metronome engine
//!
//! A metronome driven by a *tempo map*: an ordered program of musical
//! sections, each with a bar count, meter, tempo (constant, linearly
//! changing or per-beat), accent pattern and volume. The engine turns
//! the map into sample-accurate click events against the audio device's
//! frame clock.
//!
//! # Primary API
//!
//! - [`TactusSystem`] / [`TactusSystemBuilder`]: Main entry point
//! - [`TempoMap`]: Parse, build, join and dump tempo maps
//! - [`Position`]: Frame-domain cursor (locate / advance / tick)
//! - [`MetronomeHandle`]: Runtime control (start/stop/volume/seek)
//!
//! # Example
//!
//! ```ignore
//! use tactus::{TactusSystem, Preroll};
//!
//! let system = TactusSystem::builder()
//!     .map_text("intro: 4 4/4 96\nmain: * 4/4 120-132 Xx.x")?
//!     .preroll(Preroll::TwoBeats)
//!     .build()?;
//!
//! system.metronome().volume(0.8).start();
//! ```
//!
//! # Tempo-map grammar
//!
//! One section per line, `#` for comments:
//!
//! ```text
//! [label:] (bars|*) [beats/denom] tempo [pattern] [volume]
//! ```
//!
//! `tempo` is `T`, `T1-T2` (linear change) or `[t1,t2,...]` (per beat);
//! `pattern` is a string over `X` (emphasis), `x` (normal), `.` (silent)
//! with one character per beat.

// Error types
pub mod error;
pub use error::{Error, Result};

// Configuration
mod config;
pub use config::{EmphasisMode, MetronomeConfig, Preroll};

// Tempo map model and parser
pub mod tempomap;
pub use tempomap::{BeatType, Entry, Tempo, TempoMap};

// Position engine
mod position;
pub use position::{Position, Tick};

// Click sounds and mixing
mod click;
pub use click::{AudioChunk, ClickSounds};

mod mixer;
pub use mixer::{ClickSink, Mixer, MAX_VOICES};

// Metronome engine
mod metronome;
pub use metronome::{Metronome, MetronomeMap};

// Transport publication
mod transport;
pub use transport::{TransportInfo, TransportSnapshot, TICKS_PER_BEAT};

// Main entry point
mod system;
pub use system::{TactusSystem, TactusSystemBuilder};

mod handle;
pub use handle::MetronomeHandle;

// Lock-free primitives
pub(crate) mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

// Realtime callback plumbing
pub(crate) mod callback;
pub use callback::EngineCommand;

pub(crate) mod output;
pub use output::AudioOutput;
