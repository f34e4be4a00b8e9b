//! Metronome engine configuration.

use crate::{Error, Result};

/// Count-in bars inserted before the first tempo-map section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preroll {
    /// No count-in.
    #[default]
    None,
    /// One bar of two beats at the initial tempo, all normal accents.
    TwoBeats,
    /// `n` bars in the meter and accent pattern of the first section.
    Bars(u32),
}

/// Override for the accent pattern of every section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmphasisMode {
    /// Use each section's own pattern (or the default: emphasis on beat 0).
    #[default]
    Normal,
    /// Play every beat as a normal click.
    None,
    /// Play every beat as an emphasized click.
    All,
}

/// Configuration for the metronome engine.
///
/// Validated once on the control thread before the engine is built.
#[derive(Debug, Clone)]
pub struct MetronomeConfig {
    /// Global tempo scale; multiplying tempo by `m` shortens every frame
    /// distance by `m`.
    pub tempo_multiplier: f64,
    /// Count-in inserted before the first section.
    pub preroll: Preroll,
    /// Drop all sections before the first one carrying this label.
    pub start_label: Option<String>,
    /// Accent pattern override.
    pub emphasis: EmphasisMode,
    /// Master output volume.
    pub volume: f32,
    /// Gain applied to emphasized clicks.
    pub volume_emphasis: f32,
    /// Gain applied to normal clicks.
    pub volume_normal: f32,
    /// Synthesized click frequency for emphasized beats, in Hz.
    pub frequency_emphasis: f32,
    /// Synthesized click frequency for normal beats, in Hz.
    pub frequency_normal: f32,
    /// Gate click output on the transport rolling state.
    pub transport_enabled: bool,
    /// Publish bar/beat/tempo for host observers.
    pub transport_master: bool,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            tempo_multiplier: 1.0,
            preroll: Preroll::None,
            start_label: None,
            emphasis: EmphasisMode::Normal,
            volume: 1.0,
            volume_emphasis: 1.0,
            volume_normal: 1.0,
            frequency_emphasis: 1200.0,
            frequency_normal: 1000.0,
            transport_enabled: false,
            transport_master: false,
        }
    }
}

impl MetronomeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tempo_multiplier > 0.0 && self.tempo_multiplier.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "tempo multiplier {} must be positive",
                self.tempo_multiplier
            )));
        }
        if let Preroll::Bars(0) = self.preroll {
            return Err(Error::InvalidConfig(
                "preroll bar count must be at least 1".into(),
            ));
        }
        for (name, v) in [
            ("volume", self.volume),
            ("volume_emphasis", self.volume_emphasis),
            ("volume_normal", self.volume_normal),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!(
                    "{} {} out of range (0.0-1.0)",
                    name, v
                )));
            }
        }
        for (name, f) in [
            ("frequency_emphasis", self.frequency_emphasis),
            ("frequency_normal", self.frequency_normal),
        ] {
            if !(f > 0.0 && f.is_finite()) {
                return Err(Error::InvalidConfig(format!(
                    "{} {} must be positive",
                    name, f
                )));
            }
        }
        Ok(())
    }
}
