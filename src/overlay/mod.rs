// Win32 overlay: the bubble strip, OLE drop targets and outgoing file drags.
// Everything here runs on the UI thread; shared state lives in thread-locals.

mod bubble;
mod drag_source;
mod drop_target;
mod utils;
mod window;

use crate::config::Config;
use crate::drag::{DragThreshold, DragTracker};
use crate::session::{BubbleSession, DropSite, SessionLimits};
use crate::storage::FolderStore;
use anyhow::Context;
use bubble::Win32Surface;
use std::cell::RefCell;
use windows::Win32::System::Ole::{OleInitialize, OleUninitialize};
use windows::Win32::UI::WindowsAndMessaging::*;

pub use window::focus_existing_overlay;

/// Posted by a bubble to the strip: WPARAM is a `BUBBLE_CMD_*`, LPARAM the bubble id.
pub(crate) const WM_APP_BUBBLE: u32 = WM_APP + 1;
pub(crate) const BUBBLE_CMD_CLEAR: usize = 1;
pub(crate) const BUBBLE_CMD_CLOSE: usize = 2;

thread_local! {
    static SESSION: RefCell<Option<BubbleSession<Win32Surface>>> = const { RefCell::new(None) };
    static TRACKER: RefCell<DragTracker> = RefCell::new(DragTracker::new(DragThreshold::system()));
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Runs `f` against the live session. Returns None when there is no session or it is
/// already borrowed further up the stack (a nested message loop).
pub(crate) fn with_session<R>(f: impl FnOnce(&mut BubbleSession<Win32Surface>) -> R) -> Option<R> {
    SESSION.with(|cell| match cell.try_borrow_mut() {
        Ok(mut guard) => guard.as_mut().map(f),
        Err(_) => {
            tracing::debug!("session busy, event skipped");
            None
        }
    })
}

/// Creates the overlay, restores bubbles from disk and pumps messages until it is closed.
pub fn run_overlay(config: Config) -> anyhow::Result<()> {
    unsafe { OleInitialize(None) }.context("OleInitialize failed")?;

    let result = run_message_loop(config);

    SESSION.with(|cell| cell.borrow_mut().take());
    unsafe { OleUninitialize() };
    result
}

fn run_message_loop(config: Config) -> anyhow::Result<()> {
    let main = window::create_main_window(&config)?;

    TRACKER.with(|t| *t.borrow_mut() = DragTracker::new(config.drag_threshold()));

    let store = FolderStore::in_temp_dir(&config.storage_folder_name);
    tracing::info!("bubble folders under {}", store.root().display());
    let limits = SessionLimits {
        max_bubbles: config.max_bubbles,
        delete_folder_on_close: config.delete_folder_on_close,
    };
    CONFIG.with(|c| *c.borrow_mut() = config);
    SESSION.with(|cell| {
        *cell.borrow_mut() = Some(BubbleSession::new(store, Win32Surface::new(main), limits));
    });

    let restored = with_session(|s| s.restore()).unwrap_or(Ok(()));
    if let Err(e) = restored {
        utils::show_error(Some(main.hwnd), &format!("Init error: {:#}", e));
        unsafe {
            let _ = DestroyWindow(main.hwnd);
        }
        return Err(e);
    }

    if let Err(e) = drop_target::register(main.hwnd, DropSite::Background) {
        tracing::warn!("background drops disabled: {:#}", e);
    }

    unsafe {
        let _ = ShowWindow(main.hwnd, SW_SHOWNOACTIVATE);

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).into() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    tracing::info!("overlay closed");
    Ok(())
}
