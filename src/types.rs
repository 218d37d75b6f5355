// src/types.rs
use crate::drivers::DisplayFrame;

// Commands the front end sends to the engine thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Stop,
}

// Messages the engine thread sends to the front end
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    WarmingUp { buffered: usize, needed: usize },
    Frame(DisplayFrame),
    // No update this tick; the last frame stays on screen
    Skipped(String),
    Stopped,
}
