use windows::core::PCWSTR;
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;

pub fn to_wstring(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[inline]
pub fn loword(value: usize) -> u16 {
    (value & 0xFFFF) as u16
}

/// Signed client coordinates packed in a mouse message LPARAM.
#[inline]
pub fn point_from_lparam(lparam: LPARAM) -> (i32, i32) {
    let x = (lparam.0 & 0xFFFF) as u16 as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xFFFF) as u16 as i16 as i32;
    (x, y)
}

pub fn show_notice(owner: Option<HWND>, text: &str) {
    message_box(owner, text, "Drag Drop Overlay", MB_OK | MB_ICONINFORMATION);
}

pub fn show_error(owner: Option<HWND>, text: &str) {
    message_box(owner, text, "Drag Drop Overlay", MB_OK | MB_ICONERROR);
}

fn message_box(owner: Option<HWND>, text: &str, title: &str, style: MESSAGEBOX_STYLE) {
    let wide_msg = to_wstring(text);
    let wide_title = to_wstring(title);
    unsafe {
        MessageBoxW(
            owner,
            PCWSTR(wide_msg.as_ptr()),
            PCWSTR(wide_title.as_ptr()),
            style,
        );
    }
}
