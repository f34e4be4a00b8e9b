//! Tempo map: an immutable, ordered program of musical sections.
//!
//! A [`TempoMap`] is parsed from text (one section per line) or built
//! programmatically, validated once, and never mutated afterwards.
//! Cursors ([`crate::Position`]) share it through `Arc`.

mod parse;

use std::collections::HashSet;
use std::fmt::Write as _;
use std::ops::Index;
use std::path::Path;

use crate::config::EmphasisMode;
use crate::{Error, Result};

/// How a single click sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatType {
    Emphasis,
    Normal,
    Silent,
}

/// How a section's tempo evolves over its beats.
#[derive(Debug, Clone, PartialEq)]
pub enum Tempo {
    /// Fixed BPM for the whole section.
    Constant(f32),
    /// Linear change from `from` to `to` BPM across the section,
    /// interpolated over the beat index.
    Ramp { from: f32, to: f32 },
    /// One BPM value per beat; length equals `bars * beats`.
    PerBeat(Vec<f32>),
}

impl Tempo {
    /// Tempo at the first beat of the section.
    pub fn initial_bpm(&self) -> f32 {
        match self {
            Tempo::Constant(t) => *t,
            Tempo::Ramp { from, .. } => *from,
            Tempo::PerBeat(tempi) => tempi[0],
        }
    }
}

/// One section of a tempo map.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Optional identifier, unique within a map, usable as a start point.
    pub label: Option<String>,
    /// Bar count; `None` means the section repeats forever.
    pub bars: Option<u32>,
    /// Meter numerator.
    pub beats: u32,
    /// Meter denominator.
    pub denom: u32,
    pub tempo: Tempo,
    /// Accent pattern of length `beats`; empty selects the default
    /// (emphasis on beat 0, normal elsewhere).
    pub pattern: Vec<BeatType>,
    /// Section volume in `0.0..=1.0`.
    pub volume: f32,
}

impl Entry {
    /// Total beats spanned by the section; `None` when it repeats forever.
    pub fn total_beats(&self) -> Option<u32> {
        self.bars.map(|b| b * self.beats)
    }

    fn validate(&self) -> Result<()> {
        if self.bars == Some(0) {
            return Err(Error::InvalidSection("bar count must be positive".into()));
        }
        if self.beats < 1 {
            return Err(Error::InvalidSection(
                "meter numerator must be at least 1".into(),
            ));
        }
        if self.denom < 1 {
            return Err(Error::InvalidSection(
                "meter denominator must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::InvalidSection(format!(
                "volume {} out of range (0.0-1.0)",
                self.volume
            )));
        }
        match &self.tempo {
            Tempo::Constant(t) => {
                if !(*t > 0.0 && t.is_finite()) {
                    return Err(Error::InvalidTempo(*t));
                }
            }
            Tempo::Ramp { from, to } => {
                for t in [*from, *to] {
                    if !(t > 0.0 && t.is_finite()) {
                        return Err(Error::InvalidTempo(t));
                    }
                }
                if self.bars.is_none() {
                    return Err(Error::InvalidSection(
                        "gradual tempo change requires a finite bar count".into(),
                    ));
                }
            }
            Tempo::PerBeat(tempi) => {
                for t in tempi {
                    if !(*t > 0.0 && t.is_finite()) {
                        return Err(Error::InvalidTempo(*t));
                    }
                }
                match self.total_beats() {
                    Some(total) if tempi.len() == total as usize => {}
                    Some(total) => {
                        return Err(Error::TempiLength {
                            expected: total as usize,
                            found: tempi.len(),
                        });
                    }
                    None => {
                        return Err(Error::InvalidSection(
                            "per-beat tempo requires a finite bar count".into(),
                        ));
                    }
                }
            }
        }
        if !self.pattern.is_empty() && self.pattern.len() != self.beats as usize {
            return Err(Error::PatternLength {
                expected: self.beats as usize,
                found: self.pattern.len(),
            });
        }
        Ok(())
    }
}

/// Immutable ordered program of sections.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    entries: Vec<Entry>,
}

impl TempoMap {
    /// Build a map from already-constructed sections, re-checking every
    /// structural invariant.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::EmptyMap);
        }
        let mut labels = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            entry.validate()?;
            if entry.bars.is_none() && i + 1 != entries.len() {
                return Err(Error::InfiniteNotLast);
            }
            if let Some(label) = &entry.label {
                if !labels.insert(label.clone()) {
                    return Err(Error::DuplicateLabel(label.clone()));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Parse a tempo-map file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text)
    }

    /// Parse tempo-map text, one section per line.
    pub fn from_text(text: &str) -> Result<Self> {
        parse::parse_text(text)
    }

    /// Parse a command-line tempo argument: either a full grammar line,
    /// or a bare tempo as shorthand for `* 4/4 TEMPO`.
    pub fn from_cmdline(line: &str) -> Result<Self> {
        parse::parse_cmdline(line)
    }

    /// Build a single-section map; used for preroll bars and ad-hoc maps.
    pub fn new_simple(
        bars: u32,
        tempo: f32,
        beats: u32,
        denom: u32,
        pattern: Vec<BeatType>,
        volume: f32,
    ) -> Result<Self> {
        Self::from_entries(vec![Entry {
            label: None,
            bars: Some(bars),
            beats,
            denom,
            tempo: Tempo::Constant(tempo),
            pattern,
            volume,
        }])
    }

    /// Concatenate two maps. Fails if `a` ends with a section that plays
    /// forever; label uniqueness is re-checked across the seam.
    pub fn join(a: &TempoMap, b: &TempoMap) -> Result<TempoMap> {
        if a.entries.last().is_some_and(|e| e.bars.is_none()) {
            return Err(Error::JoinAfterInfinite);
        }
        let mut entries = a.entries.clone();
        entries.extend(b.entries.iter().cloned());
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, n: usize) -> &Entry {
        &self.entries[n]
    }

    /// First section carrying `label`.
    pub fn entry_by_label(&self, label: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.label.as_deref() == Some(label))
    }

    pub(crate) fn index_of_label(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.label.as_deref() == Some(label))
    }

    /// Derive a map with every accent pattern overridden per `mode`.
    pub fn with_emphasis(&self, mode: EmphasisMode) -> TempoMap {
        let beat = match mode {
            EmphasisMode::Normal => return self.clone(),
            EmphasisMode::None => BeatType::Normal,
            EmphasisMode::All => BeatType::Emphasis,
        };
        let entries = self
            .entries
            .iter()
            .map(|e| Entry {
                pattern: vec![beat; e.beats as usize],
                ..e.clone()
            })
            .collect();
        TempoMap { entries }
    }

    /// Canonical text form; parsing it back yields an equal map.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            if let Some(label) = &e.label {
                let _ = write!(out, "{}: ", label);
            }
            match e.bars {
                Some(bars) => {
                    let _ = write!(out, "{} ", bars);
                }
                None => out.push_str("* "),
            }
            let _ = write!(out, "{}/{} ", e.beats, e.denom);
            match &e.tempo {
                Tempo::Constant(t) => {
                    let _ = write!(out, "{}", t);
                }
                Tempo::Ramp { from, to } => {
                    let _ = write!(out, "{}-{}", from, to);
                }
                Tempo::PerBeat(tempi) => {
                    out.push('[');
                    for (i, t) in tempi.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        let _ = write!(out, "{}", t);
                    }
                    out.push(']');
                }
            }
            if !e.pattern.is_empty() {
                out.push(' ');
                for b in &e.pattern {
                    out.push(match b {
                        BeatType::Emphasis => 'X',
                        BeatType::Normal => 'x',
                        BeatType::Silent => '.',
                    });
                }
            }
            let _ = writeln!(out, " {}", e.volume);
        }
        out
    }
}

impl Index<usize> for TempoMap {
    type Output = Entry;

    fn index(&self, n: usize) -> &Entry {
        &self.entries[n]
    }
}
