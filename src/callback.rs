//! Realtime audio callback state.
//!
//! Owns the metronome engine and the click mixer exclusively on the
//! audio thread. Control requests arrive through a lock-free channel
//! and are drained at the top of each callback; replaced engines are
//! shipped back to the control thread so the callback never frees
//! memory.

use crossbeam_channel::{Receiver, Sender};

use crate::metronome::{Metronome, MetronomeMap};
use crate::mixer::Mixer;

/// Requests the control thread sends into the callback.
pub enum EngineCommand {
    /// Move the frame clock to an absolute frame; the engine relocates.
    Locate(u64),
    /// Swap in a fully built replacement engine.
    Replace(Box<MetronomeMap>),
}

pub struct AudioCallbackState {
    engine: Box<MetronomeMap>,
    mixer: Mixer,
    /// Frame at which the next window starts, maintained by accumulation
    /// since the host supplies no absolute clock.
    frame: u64,
    commands: Receiver<EngineCommand>,
    retired: Sender<Box<MetronomeMap>>,
}

impl AudioCallbackState {
    pub fn new(
        engine: Box<MetronomeMap>,
        mixer: Mixer,
        commands: Receiver<EngineCommand>,
        retired: Sender<Box<MetronomeMap>>,
    ) -> Self {
        Self {
            engine,
            mixer,
            frame: 0,
            commands,
            retired,
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                EngineCommand::Locate(frame) => {
                    self.frame = frame;
                    self.engine.relocate();
                }
                EngineCommand::Replace(mut engine) => {
                    std::mem::swap(&mut self.engine, &mut engine);
                    self.engine.relocate();
                    // The retired ring has ample capacity; it can only fill
                    // up if the control thread stopped draining it.
                    let _ = self.retired.try_send(engine);
                }
            }
        }
    }
}

/// Render one mono window. Zeroes the buffer, pulls due clicks from the
/// engine and mixes active voices on top.
pub fn process_audio(state: &mut AudioCallbackState, buffer: &mut [f32]) {
    state.drain_commands();

    buffer.fill(0.0);
    let nframes = buffer.len() as u32;
    state.engine.process(state.frame, nframes, &mut state.mixer);
    state.mixer.mix_into(buffer);
    state.frame += nframes as u64;
}
