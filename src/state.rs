//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the server-default settings, the completion client, the render
//! engine, and the one render slot the service draws into. The slot sits
//! behind an async mutex; holding the guard is what makes a cycle exclusive.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Settings;
use crate::llm::ChatCompletion;
use crate::render::{RenderEngine, RenderSlot};

#[derive(Clone)]
pub struct AppState {
    /// Defaults that per-request fields override.
    pub settings: Arc<Settings>,
    pub llm: Arc<dyn ChatCompletion>,
    pub engine: Arc<dyn RenderEngine>,
    pub slot: Arc<Mutex<RenderSlot>>,
}

impl AppState {
    #[must_use]
    pub fn new(settings: Settings, llm: Arc<dyn ChatCompletion>, engine: Arc<dyn RenderEngine>) -> Self {
        Self { settings: Arc::new(settings), llm, engine, slot: Arc::new(Mutex::new(RenderSlot::new())) }
    }
}
