//! Frame-domain cursor over a tempo map.
//!
//! A [`Position`] walks a [`TempoMap`] in units of audio frames and
//! yields one [`Tick`] per beat. Frame positions are kept as `f64`
//! throughout; only the emitted tick truncates to an integer frame, so
//! that `tick().frame <= f` always holds after `locate(f)`.

use std::sync::Arc;

use crate::config::Preroll;
use crate::tempomap::{BeatType, Entry, Tempo, TempoMap};
use crate::Result;

/// One click event: frame offset on the timeline, accent kind, volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub frame: u64,
    pub beat_type: BeatType,
    pub volume: f32,
}

/// Stateful cursor over a tempo map, in audio frames.
#[derive(Debug, Clone)]
pub struct Position {
    map: Arc<TempoMap>,
    multiplier: f64,
    samplerate: f64,

    /// Absolute frame at which each section begins; one extra element for
    /// the end of the map (`f64::INFINITY` when the last section repeats
    /// forever).
    start_frames: Vec<f64>,
    /// Absolute bar index at each section start, same shape.
    start_bars: Vec<u64>,

    entry: usize,
    bar: u32,
    beat: u32,
    bar_total: u64,
    frame: f64,
    /// True immediately after `locate`/`reset`; the first `advance` is a
    /// no-op so the tick at the located frame is not skipped.
    init: bool,
    end: bool,
}

impl Position {
    pub fn new(map: Arc<TempoMap>, multiplier: f64, samplerate: u32) -> Self {
        let mut pos = Self {
            map,
            multiplier,
            samplerate: samplerate as f64,
            start_frames: Vec::new(),
            start_bars: Vec::new(),
            entry: 0,
            bar: 0,
            beat: 0,
            bar_total: 0,
            frame: 0.0,
            init: true,
            end: false,
        };
        pos.compute_tables();
        pos.reset();
        pos
    }

    fn compute_tables(&mut self) {
        self.start_frames.clear();
        self.start_bars.clear();

        let map = Arc::clone(&self.map);
        let mut frame = 0.0;
        let mut bar = 0u64;
        for entry in map.entries() {
            self.start_frames.push(frame);
            self.start_bars.push(bar);
            match entry.bars {
                Some(bars) => {
                    frame += self.frame_dist(entry, 0, bars * entry.beats);
                    bar += bars as u64;
                }
                None => {
                    frame = f64::INFINITY;
                    bar = u64::MAX;
                }
            }
        }
        self.start_frames.push(frame);
        self.start_bars.push(bar);
    }

    pub fn reset(&mut self) {
        self.frame = 0.0;
        self.entry = 0;
        self.bar = 0;
        self.beat = 0;
        self.bar_total = 0;
        self.init = true;
        self.end = false;
    }

    pub fn tempomap(&self) -> &Arc<TempoMap> {
        &self.map
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn samplerate(&self) -> u32 {
        self.samplerate as u32
    }

    pub fn end(&self) -> bool {
        self.end
    }

    /// Bars elapsed since frame 0.
    pub fn bar_total(&self) -> u64 {
        self.bar_total
    }

    /// Indices of the current tick: (section, bar within section, beat).
    pub fn location(&self) -> (usize, u32, u32) {
        (self.entry, self.bar, self.beat)
    }

    /// Frame distance between two beat indices within one section.
    fn frame_dist(&self, e: &Entry, start: u32, end: u32) -> f64 {
        if start == end {
            return 0.0;
        }
        debug_assert!(start < end);

        let nbeats = (end - start) as f64;
        let denom = e.denom as f64;
        let secs = match &e.tempo {
            Tempo::Constant(t) => nbeats * 240.0 / (*t as f64 * denom),
            Tempo::Ramp { from, to } => {
                // Tempo is linear in the beat index; the exact traversal
                // time is nbeats / logarithmic mean of the endpoint tempi.
                let total = e
                    .total_beats()
                    .expect("ramp sections have a finite bar count")
                    as f64;
                let from = *from as f64;
                let to = *to as f64;
                let t1 = from + (to - from) * (start as f64 / total);
                let t2 = from + (to - from) * (end as f64 / total);
                let avg = if t1 == t2 {
                    t1
                } else {
                    (t1 - t2) / (t1.ln() - t2.ln())
                };
                nbeats * 240.0 / (avg * denom)
            }
            Tempo::PerBeat(tempi) => tempi[start as usize..end as usize]
                .iter()
                .map(|t| 240.0 / (*t as f64 * denom))
                .sum(),
        };

        secs * self.samplerate / self.multiplier
    }

    /// Relocate to the last tick at or before frame `f`.
    pub fn locate(&mut self, f: u64) {
        self.reset();
        if f == 0 {
            return;
        }
        let target = f as f64;

        // Section containing f: the last one starting at or before it.
        let idx = self.start_frames.partition_point(|&s| s <= target);
        debug_assert!(idx > 0);
        self.entry = idx - 1;

        if self.entry == self.map.len() {
            // Past the end of the map.
            self.entry -= 1;
            self.frame = self.start_frames[self.map.len()];
            self.bar_total = self.start_bars[self.map.len()];
            self.end = true;
            return;
        }

        let map = Arc::clone(&self.map);
        let e = &map[self.entry];
        let delta = target - self.start_frames[self.entry];

        let nbeats = match &e.tempo {
            Tempo::Constant(t) => {
                let secs = delta / self.samplerate * self.multiplier;
                let mut n = (secs * *t as f64 * e.denom as f64 / 240.0) as u32;
                if let Some(total) = e.total_beats() {
                    n = n.min(total - 1);
                }
                n
            }
            Tempo::Ramp { .. } => {
                // Largest beat index m with frame_dist(e, 0, m) <= delta.
                let total = e.total_beats().expect("ramp sections are finite");
                let mut lo = 0;
                let mut hi = total;
                while lo < hi {
                    let mid = lo + (hi - lo + 1) / 2;
                    if self.frame_dist(e, 0, mid) <= delta {
                        lo = mid;
                    } else {
                        hi = mid - 1;
                    }
                }
                lo.min(total - 1)
            }
            Tempo::PerBeat(_) => {
                // Walk beat by beat from the section start.
                self.bar = 0;
                self.beat = 0;
                self.frame = self.start_frames[self.entry];
                self.bar_total = self.start_bars[self.entry];
                while self.frame + self.dist_to_next() <= target && !self.end {
                    self.advance();
                }
                self.init = self.frame == target;
                return;
            }
        };

        self.bar = nbeats / e.beats;
        self.beat = nbeats % e.beats;
        // Recompute from the beat index to shed accumulated float error.
        self.frame = self.start_frames[self.entry] + self.frame_dist(e, 0, nbeats);
        self.bar_total = self.start_bars[self.entry] + self.bar as u64;
        self.init = self.frame == target;
    }

    /// Step to the next tick. The first call after `locate`/`reset` only
    /// clears the init state, leaving the cursor on the located tick.
    pub fn advance(&mut self) {
        if self.init {
            self.init = false;
            return;
        }

        self.frame += self.dist_to_next();

        let (beats, bars) = {
            let e = &self.map[self.entry];
            (e.beats, e.bars)
        };

        self.beat += 1;
        if self.beat >= beats {
            self.beat = 0;
            self.bar += 1;
            if bars.is_some_and(|b| self.bar >= b) {
                self.bar = 0;
                self.entry += 1;
                if self.entry >= self.map.len() {
                    self.entry -= 1;
                    self.end = true;
                }
            }
            self.bar_total += 1;
        }
    }

    /// Frames from the current tick to the next one.
    pub fn dist_to_next(&self) -> f64 {
        if self.init {
            return 0.0;
        }
        if self.end {
            return f64::INFINITY;
        }
        let e = &self.map[self.entry];
        let b = self.bar * e.beats + self.beat;
        self.frame_dist(e, b, b + 1)
    }

    /// Frame of the next tick.
    pub fn next_frame(&self) -> f64 {
        self.frame + self.dist_to_next()
    }

    /// The current tick. Past the end of the map this is silent.
    pub fn tick(&self) -> Tick {
        if self.end {
            return Tick {
                frame: self.frame as u64,
                beat_type: BeatType::Silent,
                volume: 0.0,
            };
        }
        let e = &self.map[self.entry];
        let beat_type = if e.pattern.is_empty() {
            if self.beat == 0 {
                BeatType::Emphasis
            } else {
                BeatType::Normal
            }
        } else {
            e.pattern[self.beat as usize]
        };
        Tick {
            frame: self.frame as u64,
            beat_type,
            volume: e.volume,
        }
    }

    /// Instantaneous tempo at the current tick, in BPM.
    pub fn current_tempo(&self) -> f32 {
        let e = &self.map[self.entry];
        let b = self.bar * e.beats + self.beat;
        match &e.tempo {
            Tempo::Constant(t) => *t,
            Tempo::Ramp { from, to } => {
                let total = e.total_beats().expect("ramp sections are finite") as f32;
                from + (to - from) * (b as f32 / total)
            }
            Tempo::PerBeat(tempi) => tempi[(b as usize).min(tempi.len() - 1)],
        }
    }

    /// Rebind to the suffix of the map starting at `label`.
    pub fn set_start_label(&mut self, label: &str) -> Result<()> {
        let idx = self
            .map
            .index_of_label(label)
            .ok_or_else(|| crate::Error::UnknownLabel(label.to_owned()))?;
        let entries = self.map.entries()[idx..].to_vec();
        self.map = Arc::new(TempoMap::from_entries(entries)?);
        self.compute_tables();
        self.reset();
        Ok(())
    }

    /// Prepend count-in bars. The preroll always uses the *initial* tempo
    /// of the first section and plays at reduced volume.
    pub fn add_preroll(&mut self, preroll: Preroll) -> Result<()> {
        let e = &self.map[0];
        let tempo = e.tempo.initial_bpm();

        let preroll_map = match preroll {
            Preroll::None => return Ok(()),
            Preroll::TwoBeats => TempoMap::new_simple(
                1,
                tempo,
                2,
                e.denom,
                vec![BeatType::Normal; 2],
                PREROLL_VOLUME,
            )?,
            Preroll::Bars(bars) => TempoMap::new_simple(
                bars,
                tempo,
                e.beats,
                e.denom,
                e.pattern.clone(),
                PREROLL_VOLUME,
            )?,
        };

        self.map = Arc::new(TempoMap::join(&preroll_map, &self.map)?);
        self.compute_tables();
        self.reset();
        Ok(())
    }
}

const PREROLL_VOLUME: f32 = 0.66;
