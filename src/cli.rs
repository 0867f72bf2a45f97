// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::Parser;
use visitor_gag_config::{BackendPreference, Config};

/// Play a GIF in a window that pretends to be part of the screen
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// GIF to play; a file picker opens when omitted
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Enable the graphics debug layer
    #[arg(long = "debug-layer")]
    pub debug_layer: bool,

    /// Always capture with the graphics capture API
    #[arg(long = "force-graphics-capture", conflicts_with = "force_duplication")]
    pub force_graphics_capture: bool,

    /// Always capture with desktop duplication
    #[arg(long = "force-duplication")]
    pub force_duplication: bool,

    /// Appear at a fixed spot near the top right corner
    #[arg(long = "demo")]
    pub demo: bool,
}

impl Args {
    /// Layer the flags over `config`. Flags only ever switch things on.
    pub fn apply(&self, mut config: Config) -> Config {
        if self.debug_layer {
            config = config.debug_layer(true);
        }
        if self.demo {
            config = config.demo(true);
        }
        if self.force_graphics_capture {
            config = config.capture_backend(BackendPreference::GraphicsCapture);
        } else if self.force_duplication {
            config = config.capture_backend(BackendPreference::Duplication);
        }
        config
    }
}
