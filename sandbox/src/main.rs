// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Tandem Sandbox
// Opens a window and exercises the cross-thread API.
//
// Usage: sandbox [--headless] [config.ron]

use anyhow::Result;
use tandem_sdk::prelude::*;
use tandem_sdk::{ApplicationListener, Engine, Frame, LifecycleListener};

/// Frames a headless run renders before exiting on its own.
const HEADLESS_FRAMES: u64 = 120;

struct SandboxApp {
    headless: bool,
    secondary: bool,
    last_fps: u32,
}

impl SandboxApp {
    fn new(headless: bool) -> Self {
        Self {
            headless,
            secondary: false,
            last_fps: 0,
        }
    }
}

impl ApplicationListener for SandboxApp {
    fn create(&mut self, frame: &Frame<'_>) -> Result<()> {
        log::info!(
            "Sandbox created on {} ({}x{}, backbuffer {}x{}).",
            frame.window.context(),
            frame.window.width(),
            frame.window.height(),
            frame.window.backbuffer_width(),
            frame.window.backbuffer_height()
        );
        for monitor in frame.app.monitors() {
            log::info!(
                "Monitor '{}': {}x{}@{}Hz",
                monitor.name,
                monitor.current_mode.width,
                monitor.current_mode.height,
                monitor.current_mode.refresh_rate
            );
        }
        frame.app.add_lifecycle_listener(LoggingLifecycle);
        frame.window.set_title("Tandem Sandbox (Esc quits, N opens a window, C copies)");
        Ok(())
    }

    fn resize(&mut self, _frame: &Frame<'_>, width: u32, height: u32) -> Result<()> {
        log::info!("Resized to {width}x{height}.");
        Ok(())
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        let input = frame.input;
        if input.is_key_just_pressed("Escape") {
            frame.app.exit();
        }
        if input.is_key_just_pressed("KeyN") && !self.secondary {
            self.secondary = true;
            let config = WindowConfig {
                title: "Tandem Sandbox (secondary)".to_string(),
                width: 320,
                height: 240,
                ..WindowConfig::default()
            };
            frame.app.new_window(SecondaryWindow, config)?;
        }
        if input.is_key_just_pressed("KeyC") {
            let (x, y) = input.cursor_position();
            frame.app.clipboard().set_contents(format!("{x:.0},{y:.0}"));
            log::info!("Copied the cursor position to the clipboard.");
        }

        let fps = frame.clock.fps();
        if fps != self.last_fps {
            self.last_fps = fps;
            log::debug!("{fps} fps");
        }
        if self.headless && frame.clock.frame_id() >= HEADLESS_FRAMES {
            log::info!("Headless run complete after {HEADLESS_FRAMES} frames.");
            frame.app.exit();
        }
        Ok(())
    }

    fn pause(&mut self, _frame: &Frame<'_>) -> Result<()> {
        log::info!("Sandbox paused.");
        Ok(())
    }

    fn resume(&mut self, _frame: &Frame<'_>) -> Result<()> {
        log::info!("Sandbox resumed.");
        Ok(())
    }

    fn dispose(&mut self, _frame: &Frame<'_>) -> Result<()> {
        log::info!("Sandbox disposed.");
        Ok(())
    }
}

struct SecondaryWindow;

impl ApplicationListener for SecondaryWindow {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        if frame.input.is_key_just_pressed("Escape") {
            frame.window.close();
        }
        Ok(())
    }
}

struct LoggingLifecycle;

impl LifecycleListener for LoggingLifecycle {
    fn pause(&mut self) {
        log::info!("Application paused.");
    }

    fn resume(&mut self) {
        log::info!("Application resumed.");
    }

    fn dispose(&mut self) {
        log::info!("Application disposed.");
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("winit", log::LevelFilter::Warn)
        .init();

    let mut headless = false;
    let mut config = AppConfig::default();
    for arg in std::env::args().skip(1) {
        if arg == "--headless" {
            headless = true;
            continue;
        }
        config = match AppConfig::load(&arg) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Ignoring {arg}: {err}. Using defaults.");
                AppConfig::default()
            }
        };
    }

    let engine = Engine::new(config);
    if headless {
        let (platform, _controller) = HeadlessPlatform::builder().build();
        engine.run(Box::new(platform), SandboxApp::new(true))
    } else {
        engine.run_desktop(SandboxApp::new(false))
    }
}
