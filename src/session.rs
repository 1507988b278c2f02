//! One engine bound to one output sink, fed from one event stream.
//!
//! Frames and key events run on the caller's thread. The deferred single-tap
//! fallback runs on a short-lived thread of its own and takes the same lock
//! before it checks and clears the pending tap.
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use log::{error, trace};

use crate::config::Settings;
use crate::event::Dispatch;
use crate::output::OutputSink;
use crate::recognizer::GestureEngine;
use crate::tap::DeferredTap;

pub struct Session<S> {
    engine: Arc<Mutex<GestureEngine<S>>>,
    settings: Settings,
    epoch: Instant,
}

impl<S: OutputSink + Send + 'static> Session<S> {
    pub fn new(engine: GestureEngine<S>, settings: Settings) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            settings,
            epoch: Instant::now(),
        }
    }

    /// Shared handle to the engine, for inspection and shutdown.
    pub fn engine(&self) -> Arc<Mutex<GestureEngine<S>>> {
        Arc::clone(&self.engine)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings snapshot; the next frame sees the new values.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Milliseconds since the session started.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Feed one assembled input item, stamped with the session clock.
    pub fn handle(&self, dispatch: &Dispatch) {
        self.handle_at(dispatch, self.now_ms());
    }

    /// Feed one assembled input item at an explicit timestamp.
    pub fn handle_at(&self, dispatch: &Dispatch, now_ms: u64) {
        let scheduled = {
            let Ok(mut engine) = self.engine.lock() else {
                error!("Gesture engine lock poisoned, dropping input");
                return;
            };
            match dispatch {
                Dispatch::Key { code, value } => engine.on_key_event(*code, *value, &self.settings),
                Dispatch::Frame(frame) => engine.on_frame(frame, now_ms, &self.settings),
            }
            engine.take_scheduled_tap()
        };

        if let Some(tap) = scheduled {
            self.spawn_fallback(tap);
        }
    }

    /// Release anything the current gesture holds.
    pub fn shutdown(&self) {
        match self.engine.lock() {
            Ok(mut engine) => engine.shutdown(),
            Err(_) => error!("Gesture engine lock poisoned, cannot release held input"),
        }
    }

    fn spawn_fallback(&self, tap: DeferredTap) {
        let engine = Arc::clone(&self.engine);
        let spawned = thread::Builder::new()
            .name("tap-fallback".to_string())
            .spawn(move || {
                thread::sleep(tap.delay);
                match engine.lock() {
                    Ok(mut engine) => {
                        engine.fire_deferred_tap(tap);
                    }
                    Err(_) => error!("Gesture engine lock poisoned, dropping tap fallback"),
                }
            });
        match spawned {
            Ok(_) => trace!("Scheduled tap fallback in {:?}", tap.delay),
            Err(e) => error!("Failed to spawn tap fallback thread: {e}"),
        }
    }
}
