// Incoming file drops for bubble windows and the overlay background

use super::drag_source::hdrop_format;
use crate::session::{DropEffect, DropPayload, DropSite};
use std::cell::Cell;
use std::path::PathBuf;
use windows::core::implement;
use windows::Win32::Foundation::{HWND, POINTL};
use windows::Win32::System::Com::{IDataObject, TYMED_HGLOBAL};
use windows::Win32::System::Ole::{
    RegisterDragDrop, ReleaseStgMedium, RevokeDragDrop, IDropTarget, IDropTarget_Impl, DROPEFFECT,
    DROPEFFECT_COPY, DROPEFFECT_NONE,
};
use windows::Win32::System::SystemServices::MODIFIERKEYS_FLAGS;
use windows::Win32::UI::Shell::{DragQueryFileW, HDROP};
use windows_core::Ref;

pub fn register(hwnd: HWND, site: DropSite) -> anyhow::Result<()> {
    let target: IDropTarget = DropTargetImpl::new(site).into();
    unsafe { RegisterDragDrop(hwnd, &target) }
        .map_err(|e| anyhow::anyhow!("RegisterDragDrop failed for {:?}: {}", site, e))
}

pub fn revoke(hwnd: HWND) {
    let _ = unsafe { RevokeDragDrop(hwnd) };
}

#[implement(IDropTarget)]
struct DropTargetImpl {
    site: DropSite,
    has_files: Cell<bool>,
}

impl DropTargetImpl {
    fn new(site: DropSite) -> Self {
        Self {
            site,
            has_files: Cell::new(false),
        }
    }

    fn effect(&self) -> DROPEFFECT {
        let payload = if self.has_files.get() {
            DropPayload::Files(Vec::new())
        } else {
            DropPayload::Unsupported
        };
        let effect = super::with_session(|s| s.drop_effect(&payload)).unwrap_or(DropEffect::None);
        match effect {
            DropEffect::Copy => DROPEFFECT_COPY,
            DropEffect::None => DROPEFFECT_NONE,
        }
    }
}

fn offers_files(data: &IDataObject) -> bool {
    let format = hdrop_format();
    unsafe { data.QueryGetData(&format) }.is_ok()
}

unsafe fn extract_file_paths(data: &IDataObject) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let format = hdrop_format();

    if let Ok(mut medium) = data.GetData(&format) {
        if medium.tymed == TYMED_HGLOBAL.0 as u32 && !medium.u.hGlobal.0.is_null() {
            let hdrop = HDROP(medium.u.hGlobal.0);
            let count = DragQueryFileW(hdrop, 0xFFFFFFFF, None);

            for i in 0..count {
                let len = DragQueryFileW(hdrop, i, None);
                if len > 0 {
                    let mut buf = vec![0u16; (len + 1) as usize];
                    DragQueryFileW(hdrop, i, Some(&mut buf));
                    paths.push(PathBuf::from(String::from_utf16_lossy(&buf[..len as usize])));
                }
            }
        }
        ReleaseStgMedium(&mut medium);
    }

    paths
}

impl IDropTarget_Impl for DropTargetImpl_Impl {
    fn DragEnter(
        &self,
        pdataobj: Ref<'_, IDataObject>,
        _grfkeystate: MODIFIERKEYS_FLAGS,
        _pt: &POINTL,
        pdweffect: *mut DROPEFFECT,
    ) -> windows_core::Result<()> {
        let has_files = pdataobj.as_ref().map(offers_files).unwrap_or(false);
        self.has_files.set(has_files);
        tracing::debug!("drag enter {:?}, files: {}", self.site, has_files);

        if !pdweffect.is_null() {
            unsafe { *pdweffect = self.effect() };
        }
        Ok(())
    }

    fn DragOver(
        &self,
        _grfkeystate: MODIFIERKEYS_FLAGS,
        _pt: &POINTL,
        pdweffect: *mut DROPEFFECT,
    ) -> windows_core::Result<()> {
        if !pdweffect.is_null() {
            unsafe { *pdweffect = self.effect() };
        }
        Ok(())
    }

    fn DragLeave(&self) -> windows_core::Result<()> {
        self.has_files.set(false);
        Ok(())
    }

    fn Drop(
        &self,
        pdataobj: Ref<'_, IDataObject>,
        _grfkeystate: MODIFIERKEYS_FLAGS,
        _pt: &POINTL,
        pdweffect: *mut DROPEFFECT,
    ) -> windows_core::Result<()> {
        let payload = match pdataobj.as_ref() {
            Some(data) if self.has_files.get() => {
                DropPayload::Files(unsafe { extract_file_paths(data) })
            }
            _ => DropPayload::Unsupported,
        };
        self.has_files.set(false);

        let result = super::with_session(|s| s.accept_drop(self.site, payload));
        let accepted = match result {
            Some(Ok(Some(_))) => true,
            Some(Ok(None)) | None => false,
            Some(Err(e)) => {
                tracing::error!("drop on {:?} failed: {:#}", self.site, e);
                false
            }
        };

        if !pdweffect.is_null() {
            unsafe { *pdweffect = if accepted { DROPEFFECT_COPY } else { DROPEFFECT_NONE } };
        }
        Ok(())
    }
}
