// SPDX-License-Identifier: MPL-2.0

//! Capture and window doubles shared by the cycle tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{
    capture::{CaptureBackend, CaptureError, CaptureProvider, CaptureSource},
    compose::{Scene, render},
    error::Result,
    geometry::{Point, Rect, Size},
    gpu::{
        DrawContext, GraphicsDevice,
        software::{SoftwareDevice, SoftwareTexture},
    },
    window::PrankWindow,
};

/// Pixel (x, y) of every fake capture.
pub fn capture_pixel(x: u32, y: u32) -> [u8; 4] {
    [x as u8, y as u8, 0xC0, 255]
}

/// Captures a deterministic pattern the size of `bounds`.
#[derive(Clone)]
pub struct PatternCapture {
    device: Arc<SoftwareDevice>,
    bounds: Rect,
    captures: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl PatternCapture {
    pub fn new(device: Arc<SoftwareDevice>, bounds: Rect) -> Self {
        Self {
            device,
            bounds,
            captures: Arc::default(),
            fail: Arc::default(),
        }
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl CaptureProvider<SoftwareDevice> for PatternCapture {
    fn create_source(
        &self,
        _backend: CaptureBackend,
    ) -> Result<Box<dyn CaptureSource<SoftwareDevice>>, CaptureError> {
        Ok(Box::new(self.clone()))
    }
}

impl CaptureSource<SoftwareDevice> for PatternCapture {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn capture(&mut self) -> Result<SoftwareTexture, CaptureError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::NoFrame);
        }
        let size = Size::new(self.bounds.width() as u32, self.bounds.height() as u32);
        let mut pixels = Vec::with_capacity(size.byte_len());
        for y in 0..size.height {
            for x in 0..size.width {
                pixels.extend_from_slice(&capture_pixel(x, y));
            }
        }
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.device.create_texture(size, Some(&pixels))?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Show(Point, Size),
    Hide,
}

#[derive(Default)]
struct WindowLog {
    calls: Vec<WindowCall>,
    last_frame: Option<Vec<u8>>,
    presents: usize,
}

/// Records window calls and keeps the pixels of the last presentation.
#[derive(Clone, Default)]
pub struct RecordingWindow(Arc<Mutex<WindowLog>>);

impl RecordingWindow {
    pub fn calls(&self) -> Vec<WindowCall> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.0.lock().unwrap().last_frame.clone()
    }

    pub fn presents(&self) -> usize {
        self.0.lock().unwrap().presents
    }
}

impl PrankWindow<SoftwareDevice> for RecordingWindow {
    fn show(&mut self, position: Point, size: Size) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .calls
            .push(WindowCall::Show(position, size));
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.0.lock().unwrap().calls.push(WindowCall::Hide);
        Ok(())
    }

    fn present(
        &mut self,
        device: &SoftwareDevice,
        scene: &Scene<'_, SoftwareTexture>,
    ) -> Result<()> {
        let target = device.create_texture(scene.size, None)?;
        let pixels = device.context().with(|ctx| {
            render(ctx, &target, scene)?;
            ctx.read_pixels(&target)
        })?;
        let mut log = self.0.lock().unwrap();
        log.last_frame = Some(pixels);
        log.presents += 1;
        Ok(())
    }
}
