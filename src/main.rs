#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg_attr(not(windows), allow(dead_code))]
mod config;
#[cfg_attr(not(windows), allow(dead_code))]
mod drag;
#[cfg(windows)]
mod overlay;
#[cfg_attr(not(windows), allow(dead_code))]
mod session;
#[cfg_attr(not(windows), allow(dead_code))]
mod storage;

use config::{get_config_dir, load_config};
use std::fs::OpenOptions;
use std::panic;
use std::sync::Mutex;

fn init_logging(level: tracing::Level) {
    let log_path = get_config_dir().join("overlay.log");
    let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("failed to open log file {}: {err}", log_path.display());
            let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn install_crash_handler() {
    panic::set_hook(Box::new(|panic_info| {
        let location = if let Some(location) = panic_info.location() {
            format!("File: {}\nLine: {}", location.file(), location.line())
        } else {
            "Unknown location".to_string()
        };

        let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic payload".to_string()
        };

        tracing::error!("panic: {} at {}", payload, location.replace('\n', " "));

        #[cfg(windows)]
        {
            use windows::core::PCWSTR;
            use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

            let error_msg = format!(
                "CRASH DETECTED!\n\nError: {}\n\nLocation:\n{}",
                payload, location
            );
            let wide_msg: Vec<u16> = error_msg.encode_utf16().chain(std::iter::once(0)).collect();
            let wide_title: Vec<u16> = "Drag Drop Overlay Crash Report"
                .encode_utf16()
                .chain(std::iter::once(0))
                .collect();

            unsafe {
                MessageBoxW(
                    None,
                    PCWSTR(wide_msg.as_ptr()),
                    PCWSTR(wide_title.as_ptr()),
                    MB_ICONERROR | MB_OK,
                );
            }
        }
    }));
}

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use windows::core::w;
    use windows::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS};
    use windows::Win32::System::Threading::CreateMutexW;

    let config = load_config();
    init_logging(config.log_level());
    install_crash_handler();

    // Keep the handle alive for the duration of the program
    let _single_instance_mutex = unsafe {
        let instance = CreateMutexW(None, true, w!("Global\\DragDropOverlaySingleInstance"));
        if let Ok(handle) = instance {
            if GetLastError() == ERROR_ALREADY_EXISTS {
                tracing::info!("overlay already running, raising it");
                if !overlay::focus_existing_overlay() {
                    tracing::warn!("another instance holds the mutex but has no overlay window");
                }
                let _ = CloseHandle(handle);
                return Ok(());
            }
            Some(handle)
        } else {
            None
        }
    };

    tracing::info!("starting drag drop overlay {}", env!("CARGO_PKG_VERSION"));
    overlay::run_overlay(config)
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    let config = load_config();
    init_logging(config.log_level());
    install_crash_handler();
    anyhow::bail!("the drag drop overlay is Windows-only")
}
