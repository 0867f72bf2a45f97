// SPDX-License-Identifier: MPL-2.0

mod capture;
mod window;

use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc, time::Duration};

use calloop::channel;
use visitor_gag_config::Config;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage, WM_QUIT,
};

use self::{
    capture::{WindowsCapabilities, WindowsCaptureProvider},
    window::PopupWindow,
};
use crate::{
    animated::GIF_EXTENSIONS,
    app::{Session, SessionParts},
    capture::{PlatformCapabilities, select_backend},
    error::{Error, Result},
    gpu::d3d11::D3D11Device,
    orchestrator::CycleSettings,
};

/// How long one loop iteration may block before window messages are pumped.
const MESSAGE_POLL: Duration = Duration::from_millis(16);

fn pick_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Choose a GIF")
        .add_filter("GIF", GIF_EXTENSIONS)
        .pick_file()
}

/// Drain the thread's message queue. Returns `false` once `WM_QUIT` arrives.
fn pump_messages() -> bool {
    let mut message = MSG::default();
    unsafe {
        while PeekMessageW(&mut message, None, 0, 0, PM_REMOVE).as_bool() {
            if message.message == WM_QUIT {
                return false;
            }
            let _ = TranslateMessage(&message);
            DispatchMessageW(&message);
        }
    }
    true
}

pub fn run(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(pick_file) else {
        tracing::info!("no file chosen");
        return Ok(());
    };
    let file = File::open(&path).map_err(|source| Error::Open {
        path: path.clone(),
        source,
    })?;

    let device = Arc::new(D3D11Device::new(config.debug_layer)?);
    let capabilities = WindowsCapabilities;
    let hide_border = capabilities.borderless_capture_supported();
    let backend = select_backend(&capabilities, config.capture_backend);
    tracing::info!(?backend, hide_border, "capture backend selected");

    let (sender, events) = channel::channel();
    let window = PopupWindow::new(Arc::clone(&device), sender.clone())?;
    let parts = SessionParts {
        device: Arc::clone(&device),
        capture: Box::new(WindowsCaptureProvider {
            device,
            hide_border,
        }),
        backend,
        window: Box::new(window),
        settings: CycleSettings::from_config(config),
    };

    let mut session = Session::new(parts, sender, events)?;
    session.load(BufReader::new(file))?;
    tracing::info!(path = %path.display(), "loading animation");

    while pump_messages() {
        if !session.dispatch(Some(MESSAGE_POLL))? {
            break;
        }
    }
    Ok(())
}
