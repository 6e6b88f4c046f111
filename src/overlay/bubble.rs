// Bubble child windows and the Win32 side of the session

use super::utils::{loword, point_from_lparam, show_notice, to_wstring};
use super::window::MainWindow;
use super::{drag_source, drop_target, with_session, TRACKER};
use super::{BUBBLE_CMD_CLEAR, BUBBLE_CMD_CLOSE, WM_APP_BUBBLE};
use crate::session::{BubbleLabel, BubbleSurface, DragOutRejected, DropSite, MAX_BUBBLES_CEILING};
use crate::storage::BubbleId;
use anyhow::Context;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::mem::size_of;
use std::sync::Once;
use windows::core::{w, PCWSTR, PWSTR};
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Controls::{TTF_IDISHWND, TTF_SUBCLASS, TTM_ADDTOOLW, TTM_DELTOOLW, TTM_UPDATETIPTEXTW, TTTOOLINFOW};
use windows::Win32::UI::Input::KeyboardAndMouse::{EnableWindow, ReleaseCapture, SetCapture};
use windows::Win32::UI::WindowsAndMessaging::*;

pub const BUBBLE_SIZE: i32 = 96;
pub const MARGIN: i32 = 8;
const GAP: i32 = 8;
pub const SIDE_BUTTON_W: i32 = 36;
pub const SIDE_BUTTON_H: i32 = 40;

const IDC_CLEAR: u16 = 1;
const IDC_CLOSE: u16 = 2;

const MK_LBUTTON: usize = 0x0001;

// BGR; the primary bubble keeps the darkest shade
const BUBBLE_PALETTE: [u32; 5] = [
    0x00303030, // Charcoal
    0x002d4a22, // Forest Green
    0x00553322, // Deep Blue
    0x00442233, // Muted Purple
    0x00223344, // Brown
];

static REGISTER_BUBBLE_CLASS: Once = Once::new();

struct BubbleVisual {
    id: BubbleId,
    label: BubbleLabel,
}

thread_local! {
    // Keyed by hwnd; painting reads this instead of the session
    static BUBBLE_VISUALS: RefCell<HashMap<isize, BubbleVisual>> = RefCell::new(HashMap::new());
}

fn bubble_color(id: BubbleId) -> u32 {
    let idx = (id.0.saturating_sub(1) as usize) % BUBBLE_PALETTE.len();
    BUBBLE_PALETTE[idx]
}

/// Client size of the overlay strip holding `count` bubbles plus the side buttons.
pub fn strip_size(count: usize) -> (i32, i32) {
    let count = count.clamp(1, MAX_BUBBLES_CEILING) as i32;
    let width = MARGIN + count * (BUBBLE_SIZE + GAP) + SIDE_BUTTON_W + MARGIN;
    let height = BUBBLE_SIZE + 2 * MARGIN;
    (width, height)
}

fn bubble_id(hwnd: HWND) -> Option<BubbleId> {
    BUBBLE_VISUALS.with(|v| v.borrow().get(&(hwnd.0 as isize)).map(|b| b.id))
}

fn tool_info(owner: HWND, bubble: HWND, text: &mut [u16]) -> TTTOOLINFOW {
    TTTOOLINFOW {
        // Sized without lpReserved so comctl32 v5 accepts it as well
        cbSize: (size_of::<TTTOOLINFOW>() - size_of::<*mut c_void>()) as u32,
        uFlags: TTF_IDISHWND | TTF_SUBCLASS,
        hwnd: owner,
        uId: bubble.0 as usize,
        lpszText: PWSTR(text.as_mut_ptr()),
        ..Default::default()
    }
}

/// `BubbleSurface` backed by child windows of the overlay strip.
pub struct Win32Surface {
    main: MainWindow,
}

impl Win32Surface {
    pub fn new(main: MainWindow) -> Self {
        Self { main }
    }

    unsafe fn create_button(
        parent: HWND,
        instance: HINSTANCE,
        text: &str,
        id: u16,
        rect: (i32, i32, i32, i32),
    ) -> anyhow::Result<HWND> {
        let wide = to_wstring(text);
        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            w!("BUTTON"),
            PCWSTR(wide.as_ptr()),
            WS_CHILD | WS_VISIBLE | WINDOW_STYLE(BS_PUSHBUTTON as u32),
            rect.0,
            rect.1,
            rect.2,
            rect.3,
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

    unsafe fn create_bubble_buttons(
        hwnd: HWND,
        instance: HINSTANCE,
        id: BubbleId,
    ) -> anyhow::Result<()> {
        Self::create_button(
            hwnd,
            instance,
            "Clear",
            IDC_CLEAR,
            (8, BUBBLE_SIZE - 28, 52, 20),
        )?;
        let close = Self::create_button(
            hwnd,
            instance,
            "✕",
            IDC_CLOSE,
            (BUBBLE_SIZE - 28, 6, 20, 20),
        )?;
        if id.is_primary() {
            let _ = EnableWindow(close, false);
        }
        Ok(())
    }
}

impl BubbleSurface for Win32Surface {
    type Handle = HWND;

    fn create_bubble(&mut self, id: BubbleId) -> anyhow::Result<HWND> {
        unsafe {
            let instance: HINSTANCE = GetModuleHandleW(None)
                .context("GetModuleHandleW failed")?
                .into();
            let class_name = w!("DragDropOverlayBubble");

            REGISTER_BUBBLE_CLASS.call_once(|| {
                let wc = WNDCLASSW {
                    lpfnWndProc: Some(bubble_wnd_proc),
                    hInstance: instance,
                    lpszClassName: class_name,
                    hCursor: LoadCursorW(None, IDC_HAND).unwrap_or_default(),
                    style: CS_HREDRAW | CS_VREDRAW,
                    ..Default::default()
                };
                RegisterClassW(&wc);
            });

            let hwnd = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                class_name,
                w!(""),
                WS_CHILD | WS_VISIBLE | WS_CLIPCHILDREN,
                0,
                0,
                BUBBLE_SIZE,
                BUBBLE_SIZE,
                Some(self.main.hwnd),
                None,
                Some(instance),
                None,
            )
            .context("CreateWindowExW failed for bubble")?;

            BUBBLE_VISUALS.with(|v| {
                v.borrow_mut().insert(
                    hwnd.0 as isize,
                    BubbleVisual {
                        id,
                        label: BubbleLabel::for_files(id, &[]),
                    },
                )
            });

            if let Err(e) = drop_target::register(hwnd, DropSite::Bubble(id)) {
                let _ = DestroyWindow(hwnd);
                return Err(e);
            }

            let rgn = CreateRoundRectRgn(0, 0, BUBBLE_SIZE + 1, BUBBLE_SIZE + 1, 18, 18);
            let _ = SetWindowRgn(hwnd, Some(rgn), true);

            // WM_DESTROY revokes the drop target and drops the visual.
            if let Err(e) = Self::create_bubble_buttons(hwnd, instance, id) {
                let _ = DestroyWindow(hwnd);
                return Err(e);
            }

            let mut text = to_wstring(&format!("Bubble {}: No files", id));
            let info = tool_info(self.main.hwnd, hwnd, &mut text);
            SendMessageW(
                self.main.tooltip,
                TTM_ADDTOOLW,
                Some(WPARAM(0)),
                Some(LPARAM(&info as *const _ as isize)),
            );

            Ok(hwnd)
        }
    }

    fn destroy_bubble(&mut self, handle: HWND) {
        unsafe {
            let mut empty = vec![0u16];
            let info = tool_info(self.main.hwnd, handle, &mut empty);
            SendMessageW(
                self.main.tooltip,
                TTM_DELTOOLW,
                Some(WPARAM(0)),
                Some(LPARAM(&info as *const _ as isize)),
            );
            let _ = DestroyWindow(handle);
        }
    }

    fn show_contents(&mut self, handle: &HWND, label: &BubbleLabel) {
        BUBBLE_VISUALS.with(|v| {
            if let Some(visual) = v.borrow_mut().get_mut(&(handle.0 as isize)) {
                visual.label = label.clone();
            }
        });

        unsafe {
            let mut text = to_wstring(&label.tooltip);
            let info = tool_info(self.main.hwnd, *handle, &mut text);
            SendMessageW(
                self.main.tooltip,
                TTM_UPDATETIPTEXTW,
                Some(WPARAM(0)),
                Some(LPARAM(&info as *const _ as isize)),
            );
            let _ = InvalidateRect(Some(*handle), None, true);
        }
    }

    fn arrange(&mut self, order: &[&HWND]) {
        unsafe {
            for (i, hwnd) in order.iter().enumerate() {
                let x = MARGIN + i as i32 * (BUBBLE_SIZE + GAP);
                let _ = SetWindowPos(
                    **hwnd,
                    None,
                    x,
                    MARGIN,
                    0,
                    0,
                    SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
                );
            }

            let side_x = MARGIN + order.len().max(1) as i32 * (BUBBLE_SIZE + GAP);
            let _ = SetWindowPos(
                self.main.add_button,
                None,
                side_x,
                MARGIN,
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            );
            let _ = SetWindowPos(
                self.main.quit_button,
                None,
                side_x,
                MARGIN + BUBBLE_SIZE - SIDE_BUTTON_H,
                0,
                0,
                SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            );

            let (width, height) = strip_size(order.len());
            let _ = SetWindowPos(
                self.main.hwnd,
                None,
                0,
                0,
                width,
                height,
                SWP_NOMOVE | SWP_NOZORDER | SWP_NOACTIVATE,
            );
        }
    }

    fn set_add_enabled(&mut self, enabled: bool) {
        unsafe {
            let _ = EnableWindow(self.main.add_button, enabled);
        }
    }
}

fn start_drag_out(hwnd: HWND) {
    let Some(id) = bubble_id(hwnd) else {
        return;
    };

    match with_session(|s| s.begin_drag_out(id)) {
        Some(Ok(files)) => {
            // The session must stay unborrowed while DoDragDrop pumps messages
            drag_source::drag_files(&files);
            with_session(|s| {
                s.finish_drag_out();
                s.refresh(id);
            });
        }
        Some(Err(e @ DragOutRejected::Empty(_))) => show_notice(Some(hwnd), &e.to_string()),
        Some(Err(e)) => tracing::debug!("drag out ignored: {}", e),
        None => {}
    }
}

unsafe fn draw_text_line(hdc: HDC, text: &str, rect: RECT, size: i32, weight: i32) {
    let hfont = CreateFontW(
        size,
        0,
        0,
        0,
        weight,
        0,
        0,
        0,
        DEFAULT_CHARSET,
        OUT_DEFAULT_PRECIS,
        CLIP_DEFAULT_PRECIS,
        CLEARTYPE_QUALITY,
        (VARIABLE_PITCH.0 | FF_SWISS.0) as u32,
        w!("Segoe UI"),
    );
    let old_font = SelectObject(hdc, hfont.into());

    let mut wide: Vec<u16> = text.encode_utf16().collect();
    let mut rect = rect;
    DrawTextW(
        hdc,
        &mut wide,
        &mut rect,
        DT_CENTER | DT_VCENTER | DT_SINGLELINE | DT_END_ELLIPSIS,
    );

    SelectObject(hdc, old_font);
    let _ = DeleteObject(hfont.into());
}

unsafe fn paint_bubble(hwnd: HWND) {
    let mut ps = PAINTSTRUCT::default();
    let hdc = BeginPaint(hwnd, &mut ps);
    let mut rect = RECT::default();
    let _ = GetClientRect(hwnd, &mut rect);

    let visual = BUBBLE_VISUALS.with(|v| {
        v.borrow()
            .get(&(hwnd.0 as isize))
            .map(|b| (b.id, b.label.count_text.clone()))
    });

    if let Some((id, count_text)) = visual {
        let brush = CreateSolidBrush(COLORREF(bubble_color(id)));
        FillRect(hdc, &rect, brush);
        let _ = DeleteObject(brush.into());

        SetBkMode(hdc, TRANSPARENT);
        SetTextColor(hdc, COLORREF(0x00AAAAAA));
        draw_text_line(
            hdc,
            &format!("#{}", id),
            RECT { left: 6, top: 6, right: 40, bottom: 24 },
            13,
            FW_NORMAL.0 as i32,
        );

        SetTextColor(hdc, COLORREF(0x00FFFFFF));
        draw_text_line(
            hdc,
            "Drag Files",
            RECT { left: 4, top: 26, right: rect.right - 4, bottom: 46 },
            15,
            FW_BOLD.0 as i32,
        );
        draw_text_line(
            hdc,
            &count_text,
            RECT { left: 4, top: 46, right: rect.right - 4, bottom: 64 },
            13,
            FW_NORMAL.0 as i32,
        );
    }

    let _ = EndPaint(hwnd, &ps);
}

unsafe extern "system" fn bubble_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAINT => {
            paint_bubble(hwnd);
            LRESULT(0)
        }

        WM_ERASEBKGND => LRESULT(1),

        WM_LBUTTONDOWN => {
            let (x, y) = point_from_lparam(lparam);
            TRACKER.with(|t| t.borrow_mut().press(x, y));
            let _ = SetCapture(hwnd);
            LRESULT(0)
        }

        WM_MOUSEMOVE => {
            if (wparam.0 & MK_LBUTTON) != 0 {
                let (x, y) = point_from_lparam(lparam);
                let crossed = TRACKER.with(|t| t.borrow_mut().update(x, y));
                if crossed {
                    let _ = ReleaseCapture();
                    start_drag_out(hwnd);
                }
            }
            LRESULT(0)
        }

        WM_LBUTTONUP => {
            TRACKER.with(|t| t.borrow_mut().release());
            let _ = ReleaseCapture();
            LRESULT(0)
        }

        WM_CAPTURECHANGED => {
            TRACKER.with(|t| t.borrow_mut().release());
            LRESULT(0)
        }

        WM_COMMAND => {
            let command = match loword(wparam.0) {
                IDC_CLEAR => Some(BUBBLE_CMD_CLEAR),
                IDC_CLOSE => Some(BUBBLE_CMD_CLOSE),
                _ => None,
            };
            if let (Some(command), Some(id)) = (command, bubble_id(hwnd)) {
                // The strip destroys bubbles, never this handler
                if let Ok(parent) = GetParent(hwnd) {
                    let _ = PostMessageW(
                        Some(parent),
                        WM_APP_BUBBLE,
                        WPARAM(command),
                        LPARAM(id.0 as isize),
                    );
                }
            }
            LRESULT(0)
        }

        WM_DESTROY => {
            drop_target::revoke(hwnd);
            BUBBLE_VISUALS.with(|v| v.borrow_mut().remove(&(hwnd.0 as isize)));
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_size_is_bounded() {
        let (one_w, height) = strip_size(1);
        assert_eq!(strip_size(0), (one_w, height));
        assert_eq!(one_w, MARGIN + BUBBLE_SIZE + GAP + SIDE_BUTTON_W + MARGIN);

        let (max_w, _) = strip_size(MAX_BUBBLES_CEILING);
        assert_eq!(strip_size(usize::MAX).0, max_w);
        assert_eq!(strip_size(2_000_000).0, max_w);
        assert!(max_w < 2000);
    }
}
