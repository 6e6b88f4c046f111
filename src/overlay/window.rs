// Overlay strip: the topmost tool window that hosts the bubbles

use super::bubble::{strip_size, BUBBLE_SIZE, MARGIN, SIDE_BUTTON_H, SIDE_BUTTON_W};
use super::utils::{loword, show_error, to_wstring};
use super::{with_session, BUBBLE_CMD_CLEAR, BUBBLE_CMD_CLOSE, CONFIG, WM_APP_BUBBLE};
use crate::config::{save_config, Config};
use crate::storage::BubbleId;
use anyhow::Context;
use std::ffi::c_void;
use std::mem::size_of;
use std::sync::Once;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Dwm::{
    DwmSetWindowAttribute, DWMWA_WINDOW_CORNER_PREFERENCE, DWMWCP_ROUND,
};
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Controls::{
    InitCommonControlsEx, ICC_WIN95_CLASSES, INITCOMMONCONTROLSEX, TOOLTIPS_CLASSW,
    TTM_SETMAXTIPWIDTH, TTS_ALWAYSTIP, TTS_NOPREFIX,
};
use windows::Win32::UI::Input::KeyboardAndMouse::ReleaseCapture;
use windows::Win32::UI::WindowsAndMessaging::*;

pub const MAIN_CLASS: PCWSTR = w!("DragDropOverlayMain");

const IDC_ADD: u16 = 100;
const IDC_QUIT: u16 = 101;

static REGISTER_MAIN_CLASS: Once = Once::new();

/// Handles of the strip and the controls it owns.
#[derive(Clone, Copy, Debug)]
pub struct MainWindow {
    pub hwnd: HWND,
    pub add_button: HWND,
    pub quit_button: HWND,
    pub tooltip: HWND,
}

fn default_position(max_bubbles: usize) -> (i32, i32) {
    // Leave room for the strip at full width
    let (width, height) = strip_size(max_bubbles);

    let mut work_area = RECT::default();
    let found = unsafe {
        SystemParametersInfoW(
            SPI_GETWORKAREA,
            0,
            Some(&mut work_area as *mut _ as *mut c_void),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
        .is_ok()
    };
    if !found {
        work_area = unsafe {
            RECT {
                left: 0,
                top: 0,
                right: GetSystemMetrics(SM_CXSCREEN),
                bottom: GetSystemMetrics(SM_CYSCREEN),
            }
        };
    }

    (
        (work_area.right - width - 20).max(work_area.left),
        (work_area.bottom - height - 20).max(work_area.top),
    )
}

unsafe fn create_side_button(
    parent: HWND,
    instance: HINSTANCE,
    text: &str,
    id: u16,
    y: i32,
) -> anyhow::Result<HWND> {
    let wide = to_wstring(text);
    let hwnd = CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        w!("BUTTON"),
        PCWSTR(wide.as_ptr()),
        WS_CHILD | WS_VISIBLE | WINDOW_STYLE(BS_PUSHBUTTON as u32),
        MARGIN + BUBBLE_SIZE + 8,
        y,
        SIDE_BUTTON_W,
        SIDE_BUTTON_H,
        Some(parent),
        Some(HMENU(id as usize as *mut c_void)),
        Some(instance),
        None,
    )
    .with_context(|| format!("cannot create the {} button", text))?;

    let font = GetStockObject(DEFAULT_GUI_FONT);
    SendMessageW(
        hwnd,
        WM_SETFONT,
        Some(WPARAM(font.0 as usize)),
        Some(LPARAM(1)),
    );
    Ok(hwnd)
}

pub fn create_main_window(config: &Config) -> anyhow::Result<MainWindow> {
    unsafe {
        let instance: HINSTANCE = GetModuleHandleW(None)
            .context("GetModuleHandleW failed")?
            .into();

        REGISTER_MAIN_CLASS.call_once(|| {
            let wc = WNDCLASSW {
                lpfnWndProc: Some(main_wnd_proc),
                hInstance: instance,
                lpszClassName: MAIN_CLASS,
                hCursor: LoadCursorW(None, IDC_SIZEALL).unwrap_or_default(),
                hbrBackground: CreateSolidBrush(COLORREF(0x00181818)),
                ..Default::default()
            };
            RegisterClassW(&wc);
        });

        let icc = INITCOMMONCONTROLSEX {
            dwSize: size_of::<INITCOMMONCONTROLSEX>() as u32,
            dwICC: ICC_WIN95_CLASSES,
        };
        let _ = InitCommonControlsEx(&icc);

        let (x, y) = config
            .window_position
            .unwrap_or_else(|| default_position(config.max_bubbles));
        let (width, height) = strip_size(1);

        let hwnd = CreateWindowExW(
            WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
            MAIN_CLASS,
            w!("Drag Drop Overlay"),
            WS_POPUP | WS_CLIPCHILDREN,
            x,
            y,
            width,
            height,
            None,
            None,
            Some(instance),
            None,
        )
        .context("CreateWindowExW failed for the overlay")?;

        let corner_pref = DWMWCP_ROUND;
        let _ = DwmSetWindowAttribute(
            hwnd,
            DWMWA_WINDOW_CORNER_PREFERENCE,
            std::ptr::addr_of!(corner_pref) as *const _,
            std::mem::size_of_val(&corner_pref) as u32,
        );

        let add_button = create_side_button(hwnd, instance, "+", IDC_ADD, MARGIN)?;
        let quit_button = create_side_button(
            hwnd,
            instance,
            "Quit",
            IDC_QUIT,
            MARGIN + BUBBLE_SIZE - SIDE_BUTTON_H,
        )?;

        let tooltip = CreateWindowExW(
            WS_EX_TOPMOST,
            TOOLTIPS_CLASSW,
            w!(""),
            WS_POPUP | WINDOW_STYLE(TTS_ALWAYSTIP | TTS_NOPREFIX),
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            Some(hwnd),
            None,
            Some(instance),
            None,
        )
        .context("cannot create the tooltip window")?;
        // A max width turns on multi-line tips
        SendMessageW(
            tooltip,
            TTM_SETMAXTIPWIDTH,
            Some(WPARAM(0)),
            Some(LPARAM(400)),
        );

        Ok(MainWindow {
            hwnd,
            add_button,
            quit_button,
            tooltip,
        })
    }
}

/// Raises an overlay already running in another process. Returns false when none is found.
pub fn focus_existing_overlay() -> bool {
    unsafe {
        match FindWindowW(MAIN_CLASS, PCWSTR::null()) {
            Ok(hwnd) if !hwnd.is_invalid() => {
                let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
                let _ = SetForegroundWindow(hwnd);
                true
            }
            _ => false,
        }
    }
}

fn save_window_position(hwnd: HWND) {
    let mut rect = RECT::default();
    if unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
        return;
    }

    let moved = CONFIG.with(|config| {
        let mut config = config.borrow_mut();
        let moved = config.update_window_position((rect.left, rect.top));
        if moved {
            save_config(&config);
        }
        moved
    });
    if moved {
        tracing::debug!("overlay moved to ({}, {})", rect.left, rect.top);
    }
}

fn add_bubble(hwnd: HWND) {
    if let Some(Err(e)) = with_session(|s| s.add_next_bubble()) {
        tracing::error!("add bubble failed: {:#}", e);
        show_error(Some(hwnd), &format!("Could not add a bubble: {:#}", e));
    }
}

fn handle_bubble_command(hwnd: HWND, command: usize, id: BubbleId) {
    match command {
        BUBBLE_CMD_CLEAR => {
            if let Some(Err(e)) = with_session(|s| s.clear_bubble(id)) {
                tracing::error!("clear bubble {} failed: {:#}", id, e);
                show_error(Some(hwnd), &format!("Could not clear bubble {}: {:#}", id, e));
            }
        }
        BUBBLE_CMD_CLOSE => {
            with_session(|s| s.remove_bubble(id));
        }
        _ => {}
    }
}

unsafe extern "system" fn main_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_LBUTTONDOWN => {
            // Background drag moves the whole strip
            let _ = ReleaseCapture();
            SendMessageW(
                hwnd,
                WM_NCLBUTTONDOWN,
                Some(WPARAM(HTCAPTION as usize)),
                Some(LPARAM(0)),
            );
            LRESULT(0)
        }

        WM_EXITSIZEMOVE => {
            save_window_position(hwnd);
            LRESULT(0)
        }

        WM_COMMAND => {
            match loword(wparam.0) {
                IDC_ADD => add_bubble(hwnd),
                IDC_QUIT => {
                    let _ = DestroyWindow(hwnd);
                }
                _ => {}
            }
            LRESULT(0)
        }

        WM_APP_BUBBLE => {
            let id = BubbleId(lparam.0 as u32);
            handle_bubble_command(hwnd, wparam.0, id);
            LRESULT(0)
        }

        WM_CLOSE => {
            let _ = DestroyWindow(hwnd);
            LRESULT(0)
        }

        WM_DESTROY => {
            super::drop_target::revoke(hwnd);
            PostQuitMessage(0);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
