/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Lobby admission: request store, event fan-out, the engine that ties them
//! together and the background reaper.

pub mod channel;
pub mod engine;
pub mod reaper;
pub mod store;

pub use engine::{
    AdmissionEngine, CreateOutcome, Decision, LobbyError, SweepReport, VisitorBinding, VisitorInfo,
};
pub use reaper::Reaper;
pub use store::{LobbyRequest, Role};
