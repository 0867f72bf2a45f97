// SPDX-License-Identifier: MPL-2.0

//! Event loop wiring.
//!
//! Everything that drives the cycle arrives on the calloop thread: the
//! decode result, frame ticks, clicks forwarded by the window, the wipe
//! animation timer and the rerun timer.

use std::{
    io::Read,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use calloop::{
    EventLoop, LoopHandle, RegistrationToken, channel,
    timer::{TimeoutAction, Timer},
};
use tracing::{debug, error};

use crate::{
    animated::FramePlayer,
    capture::{CaptureBackend, CaptureProvider},
    dispatch::LoopQueue,
    error::{Error, Result},
    gpu::GraphicsDevice,
    orchestrator::{CycleSettings, Orchestrator, WipeStep},
    window::PrankWindow,
};

/// Time between two wipe animation steps.
const WIPE_STEP: Duration = Duration::from_millis(16);

pub enum AppEvent {
    /// The animation finished loading, or failed to.
    Loaded(Result<()>),
    /// The primary mouse button was released inside the window.
    PrimaryButtonUp,
    /// The player presented a new frame.
    FrameUpdated,
    Quit,
}

pub struct App<G: GraphicsDevice> {
    orchestrator: Orchestrator<G>,
    handle: LoopHandle<'static, App<G>>,
    wipe_timer: Option<RegistrationToken>,
    rerun_timer: Option<RegistrationToken>,
    exit: Option<Result<()>>,
}

impl<G: GraphicsDevice> App<G> {
    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Loaded(Ok(())) => {
                match self.orchestrator.capture_and_reveal(Instant::now()) {
                    Ok(()) => self.start_wipe(),
                    Err(err) => self.fail(err),
                }
            }
            AppEvent::Loaded(Err(err)) => self.fail(err),
            AppEvent::PrimaryButtonUp => {
                if self.orchestrator.on_primary_button_up(Instant::now()) {
                    self.start_wipe();
                }
            }
            AppEvent::FrameUpdated => {
                if let Err(err) = self.orchestrator.present() {
                    self.fail(err);
                }
            }
            AppEvent::Quit => {
                debug!("quit requested");
                self.exit.get_or_insert(Ok(()));
            }
        }
    }

    fn start_wipe(&mut self) {
        if self.wipe_timer.is_some() {
            return;
        }
        let inserted = self
            .handle
            .insert_source(Timer::immediate(), |_, _, app: &mut App<G>| {
                app.on_wipe_timer()
            });
        match inserted {
            Ok(token) => self.wipe_timer = Some(token),
            Err(err) => self.fail(err.into()),
        }
    }

    fn on_wipe_timer(&mut self) -> TimeoutAction {
        match self.orchestrator.step_wipe(Instant::now()) {
            Ok(WipeStep::Running) => TimeoutAction::ToDuration(WIPE_STEP),
            Ok(WipeStep::Concealed { rerun_in }) => {
                self.wipe_timer = None;
                self.schedule_rerun(rerun_in);
                TimeoutAction::Drop
            }
            Ok(WipeStep::Revealed | WipeStep::Idle) => {
                self.wipe_timer = None;
                TimeoutAction::Drop
            }
            Err(err) => {
                self.wipe_timer = None;
                self.fail(err);
                TimeoutAction::Drop
            }
        }
    }

    fn schedule_rerun(&mut self, delay: Duration) {
        if let Some(token) = self.rerun_timer.take() {
            self.handle.remove(token);
        }
        let inserted = self.handle.insert_source(
            Timer::from_duration(delay),
            |_, _, app: &mut App<G>| {
                app.rerun_timer = None;
                match app.orchestrator.on_rerun_due(Instant::now()) {
                    Ok(()) => app.start_wipe(),
                    Err(err) => app.fail(err),
                }
                TimeoutAction::Drop
            },
        );
        match inserted {
            Ok(token) => self.rerun_timer = Some(token),
            Err(err) => self.fail(err.into()),
        }
    }

    fn fail(&mut self, err: Error) {
        error!("{err}");
        self.exit.get_or_insert(Err(err));
    }
}

/// Everything the cycle needs from the platform.
pub struct SessionParts<G: GraphicsDevice> {
    pub device: Arc<G>,
    pub capture: Box<dyn CaptureProvider<G>>,
    pub backend: CaptureBackend,
    pub window: Box<dyn PrankWindow<G>>,
    pub settings: CycleSettings,
}

/// The application's event loop together with its state.
pub struct Session<G: GraphicsDevice> {
    event_loop: EventLoop<'static, App<G>>,
    app: App<G>,
    events: channel::Sender<AppEvent>,
}

impl<G: GraphicsDevice> Session<G> {
    /// Build the loop on the calling thread, which becomes the UI thread.
    ///
    /// `events` is the channel the window forwards its input on; `sender`
    /// must belong to it.
    pub fn new(
        parts: SessionParts<G>,
        sender: channel::Sender<AppEvent>,
        events: channel::Channel<AppEvent>,
    ) -> Result<Self> {
        let event_loop = EventLoop::try_new()?;
        let handle = event_loop.handle();

        let queue = LoopQueue::insert(&handle)?;
        let player = FramePlayer::new(Arc::clone(&parts.device), queue);
        let frames = Mutex::new(sender.clone());
        player.set_frame_listener(move |_| {
            if let Ok(frames) = frames.lock() {
                let _ = frames.send(AppEvent::FrameUpdated);
            }
        });

        handle.insert_source(events, |event, _, app: &mut App<G>| {
            if let channel::Event::Msg(event) = event {
                app.handle_event(event);
            }
        })?;

        let orchestrator = Orchestrator::new(
            parts.device,
            player,
            parts.capture,
            parts.backend,
            parts.window,
            parts.settings,
        );

        Ok(Self {
            event_loop,
            app: App {
                orchestrator,
                handle,
                wipe_timer: None,
                rerun_timer: None,
                exit: None,
            },
            events: sender,
        })
    }

    /// Start decoding `reader`; the cycle begins once it is loaded.
    pub fn load<R: Read + Send + 'static>(&mut self, reader: R) -> Result<()> {
        self.app.orchestrator.begin_loading();
        let events = self.events.clone();
        self.app
            .orchestrator
            .player()
            .load_async(reader, move |result| {
                let _ = events.send(AppEvent::Loaded(result));
            })
    }

    /// Run one loop iteration. Returns `false` once the application should exit.
    ///
    /// # Errors
    ///
    /// Fails with the error that ended the cycle.
    pub fn dispatch(&mut self, timeout: Option<Duration>) -> Result<bool> {
        self.event_loop.dispatch(timeout, &mut self.app)?;
        match self.app.exit.take() {
            None => Ok(true),
            Some(Ok(())) => Ok(false),
            Some(Err(err)) => Err(err),
        }
    }

    #[cfg(test)]
    pub(crate) fn orchestrator(&self) -> &Orchestrator<G> {
        &self.app.orchestrator
    }

    #[cfg(test)]
    pub(crate) fn with_seed(mut self, seed: u64) -> Self {
        self.app.orchestrator = self.app.orchestrator.with_seed(seed);
        self
    }
}
