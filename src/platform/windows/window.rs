// SPDX-License-Identifier: MPL-2.0

//! The popup window and its composition swap chain.

use std::sync::{Arc, OnceLock};

use calloop::channel::Sender;
use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, WPARAM},
        Graphics::{
            Direct3D11::ID3D11Texture2D,
            DirectComposition::{
                DCompositionCreateDevice, IDCompositionDevice, IDCompositionTarget,
                IDCompositionVisual,
            },
            Dxgi::{
                Common::{
                    DXGI_ALPHA_MODE_PREMULTIPLIED, DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC,
                },
                CreateDXGIFactory2, DXGI_CREATE_FACTORY_FLAGS, DXGI_PRESENT, DXGI_SCALING_STRETCH,
                DXGI_SWAP_CHAIN_DESC1, DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
                DXGI_USAGE_RENDER_TARGET_OUTPUT, IDXGIDevice, IDXGIFactory2, IDXGISwapChain1,
            },
        },
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, DestroyWindow, GWLP_USERDATA, GetWindowLongPtrW,
            HWND_TOPMOST, IDC_ARROW, LoadCursorW, PostQuitMessage, RegisterClassW, SW_HIDE,
            SWP_NOACTIVATE, SWP_SHOWWINDOW, SetWindowLongPtrW, SetWindowPos, ShowWindow,
            WM_CLOSE, WM_DESTROY, WM_LBUTTONUP, WNDCLASSW, WS_EX_NOACTIVATE,
            WS_EX_NOREDIRECTIONBITMAP, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
        },
    },
    core::{Interface, PCWSTR, w},
};

use crate::{
    app::AppEvent,
    compose::{Scene, render},
    error::Result,
    geometry::{Point, Size},
    gpu::{
        GpuError, GraphicsDevice,
        d3d11::{D3D11Device, D3D11Texture},
    },
    window::PrankWindow,
};

const CLASS_NAME: PCWSTR = w!("VisitorGag.PopupWindow");

fn register_class() -> windows::core::Result<()> {
    static REGISTERED: OnceLock<windows::core::Result<()>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| unsafe {
            let instance = GetModuleHandleW(None)?;
            let class = WNDCLASSW {
                lpfnWndProc: Some(window_proc),
                hInstance: instance.into(),
                lpszClassName: CLASS_NAME,
                hCursor: LoadCursorW(None, IDC_ARROW)?,
                ..Default::default()
            };
            if RegisterClassW(&class) == 0 {
                return Err(windows::core::Error::from_win32());
            }
            Ok(())
        })
        .clone()
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let events = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const Sender<AppEvent>;
    // SAFETY: the pointer is set right after creation and cleared before the
    // box it points to is dropped.
    let events = unsafe { events.as_ref() };

    match message {
        WM_LBUTTONUP => {
            if let Some(events) = events {
                let _ = events.send(AppEvent::PrimaryButtonUp);
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            if let Some(events) = events {
                let _ = events.send(AppEvent::Quit);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, message, wparam, lparam) },
    }
}

/// Swap chain bound to the window through DirectComposition.
struct Surface {
    size: Size,
    swap_chain: IDXGISwapChain1,
    composition: IDCompositionDevice,
    _target: IDCompositionTarget,
    _visual: IDCompositionVisual,
}

impl Surface {
    fn new(device: &D3D11Device, hwnd: HWND, size: Size) -> windows::core::Result<Self> {
        unsafe {
            let dxgi_device: IDXGIDevice = device.raw().cast()?;
            let factory: IDXGIFactory2 = CreateDXGIFactory2(DXGI_CREATE_FACTORY_FLAGS(0))?;
            let desc = DXGI_SWAP_CHAIN_DESC1 {
                Width: size.width,
                Height: size.height,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                BufferCount: 2,
                Scaling: DXGI_SCALING_STRETCH,
                SwapEffect: DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
                AlphaMode: DXGI_ALPHA_MODE_PREMULTIPLIED,
                ..Default::default()
            };
            let swap_chain = factory.CreateSwapChainForComposition(&dxgi_device, &desc, None)?;

            let composition: IDCompositionDevice = DCompositionCreateDevice(&dxgi_device)?;
            let target = composition.CreateTargetForHwnd(hwnd, true)?;
            let visual = composition.CreateVisual()?;
            visual.SetContent(&swap_chain)?;
            target.SetRoot(&visual)?;
            composition.Commit()?;

            Ok(Self {
                size,
                swap_chain,
                composition,
                _target: target,
                _visual: visual,
            })
        }
    }
}

/// Borderless, topmost tool window that never takes focus.
pub struct PopupWindow {
    hwnd: HWND,
    device: Arc<D3D11Device>,
    // Read by the window procedure through GWLP_USERDATA.
    _events: Box<Sender<AppEvent>>,
    surface: Option<Surface>,
}

impl PopupWindow {
    pub fn new(device: Arc<D3D11Device>, events: Sender<AppEvent>) -> Result<Self, GpuError> {
        register_class()?;

        let events = Box::new(events);
        let hwnd = unsafe {
            let instance = GetModuleHandleW(None)?;
            let hwnd = CreateWindowExW(
                WS_EX_NOREDIRECTIONBITMAP
                    | WS_EX_TOOLWINDOW
                    | WS_EX_TOPMOST
                    | WS_EX_NOACTIVATE,
                CLASS_NAME,
                w!("VisitorGag"),
                WS_POPUP,
                0,
                0,
                1,
                1,
                None,
                None,
                instance,
                None,
            )?;
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, &*events as *const Sender<AppEvent> as isize);
            hwnd
        };

        Ok(Self {
            hwnd,
            device,
            _events: events,
            surface: None,
        })
    }

    fn surface(&mut self, size: Size) -> Result<&Surface, GpuError> {
        if self.surface.as_ref().is_none_or(|surface| surface.size != size) {
            self.surface = None;
            self.surface = Some(Surface::new(&self.device, self.hwnd, size)?);
        }
        self.surface.as_ref().ok_or(GpuError::Missing("swap chain"))
    }
}

impl PrankWindow<D3D11Device> for PopupWindow {
    fn show(&mut self, position: Point, size: Size) -> Result<()> {
        self.surface(size)?;
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                position.x,
                position.y,
                size.width as i32,
                size.height as i32,
                SWP_NOACTIVATE | SWP_SHOWWINDOW,
            )
            .map_err(GpuError::from)?;
        }
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
        Ok(())
    }

    fn present(
        &mut self,
        device: &D3D11Device,
        scene: &Scene<'_, D3D11Texture>,
    ) -> Result<()> {
        let surface = self.surface(scene.size)?;
        let backbuffer: ID3D11Texture2D =
            unsafe { surface.swap_chain.GetBuffer(0) }.map_err(GpuError::from)?;
        let backbuffer = D3D11Texture::from_raw(backbuffer);

        device.context().with(|ctx| render(ctx, &backbuffer, scene))?;

        unsafe { surface.swap_chain.Present(1, DXGI_PRESENT(0)) }
            .ok()
            .map_err(GpuError::from)?;
        unsafe { surface.composition.Commit() }.map_err(GpuError::from)?;
        Ok(())
    }
}

impl Drop for PopupWindow {
    fn drop(&mut self) {
        self.surface = None;
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            if let Err(why) = DestroyWindow(self.hwnd) {
                tracing::warn!(?why, "failed to destroy window");
            }
        }
    }
}
