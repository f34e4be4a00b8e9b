//! Tactus system - metronome engine wired to an audio output.

use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::callback::{AudioCallbackState, EngineCommand};
use crate::click::ClickSounds;
use crate::config::{EmphasisMode, MetronomeConfig, Preroll};
use crate::handle::MetronomeHandle;
use crate::lockfree::{AtomicFlag, AtomicFloat};
use crate::metronome::MetronomeMap;
use crate::mixer::Mixer;
use crate::output::AudioOutput;
use crate::position::Position;
use crate::tempomap::TempoMap;
use crate::transport::TransportInfo;
use crate::{Error, Result};

/// How many retired engines may wait for control-side disposal.
const RETIRED_CAPACITY: usize = 8;

/// Complete metronome system: tempo map, position engine, click mixer
/// and device output.
pub struct TactusSystem {
    output: Mutex<AudioOutput>,
    /// The map the engine is playing, after start-label trimming,
    /// emphasis override and preroll insertion. Swapped atomically so
    /// observers always see a fully built map.
    map: ArcSwap<TempoMap>,
    config: MetronomeConfig,
    active: Arc<AtomicFlag>,
    master: Arc<AtomicFloat>,
    transport: Arc<TransportInfo>,
    commands: Sender<EngineCommand>,
    retired: Receiver<Box<MetronomeMap>>,
    sample_rate: u32,
}

impl TactusSystem {
    /// Create a new system builder.
    pub fn builder() -> TactusSystemBuilder {
        TactusSystemBuilder::default()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_running(&self) -> bool {
        self.output.lock().is_running()
    }

    pub fn channels(&self) -> usize {
        self.output.lock().channels()
    }

    /// List available output devices.
    pub fn list_output_devices() -> Result<Vec<String>> {
        AudioOutput::list_devices()
    }

    /// Name of the output device in use.
    pub fn output_device_name(&self) -> Result<String> {
        self.output.lock().device_name()
    }

    /// The map currently driving the engine.
    pub fn tempomap(&self) -> Arc<TempoMap> {
        self.map.load_full()
    }

    /// Fluent control handle (start/stop, volume, seek, position).
    pub fn metronome(&self) -> MetronomeHandle {
        MetronomeHandle::new(
            Arc::clone(&self.active),
            Arc::clone(&self.master),
            Arc::clone(&self.transport),
            self.commands.clone(),
        )
    }

    /// Replace the tempo map while the engine runs.
    ///
    /// The full replacement (trimmed, emphasized, prerolled, with a
    /// fresh position) is built here on the control thread; the
    /// realtime thread swaps pointers and ships the old engine back for
    /// disposal.
    pub fn set_tempomap(&self, map: TempoMap) -> Result<()> {
        let engine = build_engine(
            &map,
            &self.config,
            self.sample_rate,
            Arc::clone(&self.active),
            Arc::clone(&self.transport),
        )?;
        self.map.store(Arc::clone(engine.position().tempomap()));

        self.commands
            .send(EngineCommand::Replace(Box::new(engine)))
            .map_err(|_| Error::InvalidConfig("engine is gone".into()))?;

        // Dispose of any engines the callback has retired.
        while self.retired.try_recv().is_ok() {}
        log::debug!("tempo map replaced");
        Ok(())
    }
}

/// Build the realtime engine for `map` under `config`.
///
/// Wiring order matters: trim to the start label first, then apply the
/// emphasis override, then join the preroll in front.
fn build_engine(
    map: &TempoMap,
    config: &MetronomeConfig,
    sample_rate: u32,
    active: Arc<AtomicFlag>,
    transport: Arc<TransportInfo>,
) -> Result<MetronomeMap> {
    let map = map.with_emphasis(config.emphasis);
    let mut pos = Position::new(Arc::new(map), config.tempo_multiplier, sample_rate);
    if let Some(label) = &config.start_label {
        pos.set_start_label(label)?;
    }
    pos.add_preroll(config.preroll)?;

    let sounds = ClickSounds::synthesize(
        sample_rate,
        config.frequency_emphasis,
        config.frequency_normal,
    );
    Ok(MetronomeMap::new(pos, sounds, config, active, transport))
}

/// Builder for [`TactusSystem`].
#[derive(Default)]
pub struct TactusSystemBuilder {
    map: Option<TempoMap>,
    config: MetronomeConfig,
    device_index: Option<usize>,
    start_inactive: bool,
}

impl TactusSystemBuilder {
    /// The tempo map to play.
    pub fn tempomap(mut self, map: TempoMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Parse and use tempo-map text.
    pub fn map_text(mut self, text: &str) -> Result<Self> {
        self.map = Some(TempoMap::from_text(text)?);
        Ok(self)
    }

    /// Load and use a tempo-map file.
    pub fn map_file(mut self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        self.map = Some(TempoMap::from_file(path)?);
        Ok(self)
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MetronomeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tempo_multiplier(mut self, multiplier: f64) -> Self {
        self.config.tempo_multiplier = multiplier;
        self
    }

    pub fn preroll(mut self, preroll: Preroll) -> Self {
        self.config.preroll = preroll;
        self
    }

    pub fn start_label(mut self, label: impl Into<String>) -> Self {
        self.config.start_label = Some(label.into());
        self
    }

    pub fn emphasis(mut self, mode: EmphasisMode) -> Self {
        self.config.emphasis = mode;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.config.volume = volume;
        self
    }

    pub fn output_device(mut self, index: Option<usize>) -> Self {
        self.device_index = index;
        self
    }

    /// Build the system without starting the click (start it later via
    /// the handle).
    pub fn inactive(mut self) -> Self {
        self.start_inactive = true;
        self
    }

    pub fn build(self) -> Result<TactusSystem> {
        self.config.validate()?;
        let map = self.map.ok_or(Error::EmptyMap)?;

        let mut output = AudioOutput::new(self.device_index)?;
        let sample_rate = output.sample_rate();

        let active = Arc::new(AtomicFlag::new(!self.start_inactive));
        let master = Arc::new(AtomicFloat::new(self.config.volume));
        // With transport following enabled the click waits for a roll
        // command; otherwise the transport is considered always rolling.
        let transport = Arc::new(TransportInfo::new(!self.config.transport_enabled));

        let engine = build_engine(
            &map,
            &self.config,
            sample_rate,
            Arc::clone(&active),
            Arc::clone(&transport),
        )?;
        let published = Arc::clone(engine.position().tempomap());

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (retired_tx, retired_rx) = crossbeam_channel::bounded(RETIRED_CAPACITY);

        let state = AudioCallbackState::new(
            Box::new(engine),
            Mixer::new(Arc::clone(&master)),
            command_rx,
            retired_tx,
        );
        output.start(state)?;

        log::info!(
            "metronome started: {} sections at {} Hz",
            published.len(),
            sample_rate
        );

        Ok(TactusSystem {
            output: Mutex::new(output),
            map: ArcSwap::from(published),
            config: self.config,
            active,
            master,
            transport,
            commands: command_tx,
            retired: retired_rx,
            sample_rate,
        })
    }
}
