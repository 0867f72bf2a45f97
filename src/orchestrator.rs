// SPDX-License-Identifier: MPL-2.0

//! The prank cycle.
//!
//! ```text
//! Loading ─▶ capture + place ─▶ Revealing ─▶ Revealed
//!                 ▲                              │ click
//!                 │                              ▼
//!           ScheduledRerun ◀── hide ◀──── Concealing
//! ```
//!
//! Each appearance captures the primary output, picks a spot, copies the
//! screen under that spot into the shade, shows the window there with the
//! shade closed over the animation and wipes it open. A click wipes it shut,
//! hides the window and waits a random while before the next appearance.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, info};
use visitor_gag_config::{Config, DelayRange};

use crate::{
    animated::FramePlayer,
    capture::{CaptureBackend, CaptureProvider},
    compose::Scene,
    error::{Error, Result},
    geometry::{Point, Region},
    gpu::{DrawContext, GraphicsDevice},
    placement::{PlacementMode, choose_position, rerun_delay},
    shade::{ShadePanels, ShadeSurface, Wipe, WipeDirection},
    window::PrankWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Loading,
    /// Shade filled and window placed, not yet wiping.
    Positioned,
    Revealing,
    Revealed,
    Concealing,
    ScheduledRerun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSettings {
    pub placement: PlacementMode,
    pub wipe_duration: Duration,
    pub rerun_delay: DelayRange,
}

impl CycleSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            placement: if config.demo {
                PlacementMode::Demo(config.demo_margin)
            } else {
                PlacementMode::Random
            },
            wipe_duration: Duration::from_millis(config.wipe_duration_ms),
            rerun_delay: config.rerun_delay_ms,
        }
    }
}

/// Outcome of advancing the running wipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeStep {
    /// No wipe in progress.
    Idle,
    Running,
    Revealed,
    /// The window is hidden; the next appearance is due after `rerun_in`.
    Concealed { rerun_in: Duration },
}

pub struct Orchestrator<G: GraphicsDevice> {
    device: Arc<G>,
    player: FramePlayer<G>,
    capture: Box<dyn CaptureProvider<G>>,
    backend: CaptureBackend,
    window: Box<dyn PrankWindow<G>>,
    shade: ShadeSurface<G::Texture>,
    panels: ShadePanels,
    wipe: Option<Wipe>,
    settings: CycleSettings,
    rng: StdRng,
    state: CycleState,
    position: Option<Point>,
}

impl<G: GraphicsDevice> Orchestrator<G> {
    pub fn new(
        device: Arc<G>,
        player: FramePlayer<G>,
        capture: Box<dyn CaptureProvider<G>>,
        backend: CaptureBackend,
        window: Box<dyn PrankWindow<G>>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            device,
            player,
            capture,
            backend,
            window,
            shade: ShadeSurface::default(),
            panels: ShadePanels::default(),
            wipe: None,
            settings,
            rng: StdRng::from_os_rng(),
            state: CycleState::Idle,
            position: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn player(&self) -> &FramePlayer<G> {
        &self.player
    }

    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Window position of the current or last appearance.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    #[must_use]
    pub fn panels(&self) -> &ShadePanels {
        &self.panels
    }

    pub fn begin_loading(&mut self) {
        self.state = CycleState::Loading;
    }

    /// Capture the screen, place the window and start the reveal wipe.
    ///
    /// # Errors
    ///
    /// Fails if nothing is loaded, the animation does not fit on the output,
    /// or capturing, drawing or showing the window fails.
    pub fn capture_and_reveal(&mut self, now: Instant) -> Result<()> {
        let footprint = self.player.size().ok_or(Error::NotLoaded)?;

        let mut source = self.capture.create_source(self.backend)?;
        let bounds = source.bounds();
        let position = choose_position(bounds, footprint, self.settings.placement, &mut self.rng)?;
        let captured = source.capture()?;
        drop(source);

        // The captured texture starts at the output's top left corner.
        let region = Region::new(
            (i64::from(position.x) - i64::from(bounds.left)) as u32,
            (i64::from(position.y) - i64::from(bounds.top)) as u32,
            footprint.width,
            footprint.height,
        );
        let staging = self.device.create_texture(footprint, None)?;
        self.device
            .context()
            .with(|ctx| ctx.copy_region(&staging, (0, 0), &captured, region))?;

        self.shade.resize(&*self.device, footprint)?;
        self.shade.update(&*self.device, &staging)?;
        self.panels = ShadePanels::at_rest(footprint);
        self.position = Some(position);
        self.state = CycleState::Positioned;
        debug!(?bounds, ?position, backend = ?self.backend, "shade captured");

        self.player.play()?;
        self.window.show(position, footprint)?;
        self.present()?;

        self.wipe = Some(Wipe::new(
            WipeDirection::Reveal,
            now,
            self.settings.wipe_duration,
        ));
        self.state = CycleState::Revealing;
        info!(x = position.x, y = position.y, "revealing animation");
        Ok(())
    }

    /// Advance the running wipe to `now` and present the result.
    pub fn step_wipe(&mut self, now: Instant) -> Result<WipeStep> {
        let Some(wipe) = self.wipe else {
            return Ok(WipeStep::Idle);
        };

        let sample = wipe.sample(now);
        self.panels.set_offsets(sample.left, sample.right);
        if !sample.finished {
            self.present()?;
            return Ok(WipeStep::Running);
        }

        self.wipe = None;
        match wipe.direction() {
            WipeDirection::Reveal => {
                self.present()?;
                self.state = CycleState::Revealed;
                debug!("animation revealed");
                Ok(WipeStep::Revealed)
            }
            WipeDirection::Conceal => {
                self.window.hide()?;
                self.player.stop();
                let rerun_in = rerun_delay(self.settings.rerun_delay, &mut self.rng);
                self.state = CycleState::ScheduledRerun;
                info!(?rerun_in, "animation concealed");
                Ok(WipeStep::Concealed { rerun_in })
            }
        }
    }

    /// A click on the window. Starts the conceal wipe if the animation is
    /// showing; returns whether it did.
    pub fn on_primary_button_up(&mut self, now: Instant) -> bool {
        let wipe = match (self.state, self.wipe) {
            (CycleState::Revealing, Some(reveal)) => reveal.reversed(now),
            (CycleState::Revealed, _) => {
                Wipe::new(WipeDirection::Conceal, now, self.settings.wipe_duration)
            }
            (state, _) => {
                debug!(?state, "ignoring click");
                return false;
            }
        };
        self.wipe = Some(wipe);
        self.state = CycleState::Concealing;
        true
    }

    /// Start the next appearance once the rerun delay has passed.
    pub fn on_rerun_due(&mut self, now: Instant) -> Result<()> {
        if self.state != CycleState::ScheduledRerun {
            debug!(state = ?self.state, "rerun no longer due");
            return Ok(());
        }
        self.capture_and_reveal(now)
    }

    /// Redraw the window from the current animation frame and panel offsets.
    pub fn present(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            CycleState::Positioned
                | CycleState::Revealing
                | CycleState::Revealed
                | CycleState::Concealing
        ) {
            return Ok(());
        }

        let animation = self.player.surface();
        let scene = Scene {
            size: self.shade.size(),
            animation: animation.as_ref(),
            shade: self.shade.texture(),
            panels: &self.panels,
        };
        self.window.present(&*self.device, &scene)
    }
}
