// Bubble session - the live bubble table and the operations the UI drives
// The surface (window toolkit) is reached only through `BubbleSurface`.

use crate::storage::{BatchOutcome, BubbleId, FolderStore};
use anyhow::Context;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Upper bound on `max_bubbles`; the strip has to fit on one screen.
pub const MAX_BUBBLES_CEILING: usize = 10;

/// Seam between the bookkeeping and whatever draws the bubbles.
pub trait BubbleSurface {
    type Handle;

    fn create_bubble(&mut self, id: BubbleId) -> anyhow::Result<Self::Handle>;
    fn destroy_bubble(&mut self, handle: Self::Handle);
    fn show_contents(&mut self, handle: &Self::Handle, label: &BubbleLabel);
    /// Handles are passed in ascending id order.
    fn arrange(&mut self, order: &[&Self::Handle]);
    fn set_add_enabled(&mut self, enabled: bool);
}

pub struct Bubble<H> {
    pub id: BubbleId,
    pub folder: PathBuf,
    pub files: Vec<PathBuf>,
    pub handle: H,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BubbleLabel {
    pub count_text: String,
    pub tooltip: String,
}

impl BubbleLabel {
    pub fn for_files(id: BubbleId, files: &[PathBuf]) -> Self {
        let count_text = if files.len() == 1 {
            "1 item".to_string()
        } else {
            format!("{} items", files.len())
        };

        let tooltip = if files.is_empty() {
            format!("Bubble {}: No files", id)
        } else {
            let names: Vec<String> = files
                .iter()
                .map(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                })
                .collect();
            format!("Bubble {}:\n{}", id, names.join("\n"))
        };

        Self {
            count_text,
            tooltip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_bubbles: usize,
    pub delete_folder_on_close: bool,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_bubbles: 7,
            delete_folder_on_close: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropPayload {
    Files(Vec<PathBuf>),
    Unsupported,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropEffect {
    Copy,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropSite {
    Bubble(BubbleId),
    /// The window background, which feeds the primary bubble.
    Background,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragOutRejected {
    AlreadyDragging,
    NotLive(BubbleId),
    Empty(BubbleId),
}

impl fmt::Display for DragOutRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragOutRejected::AlreadyDragging => write!(f, "A drag is already in progress."),
            DragOutRejected::NotLive(id) => write!(f, "Bubble {} is not open.", id),
            DragOutRejected::Empty(id) => write!(
                f,
                "No files in bubble {}. Drag some files into the bubble.",
                id
            ),
        }
    }
}

impl std::error::Error for DragOutRejected {}

pub struct BubbleSession<S: BubbleSurface> {
    store: FolderStore,
    surface: S,
    limits: SessionLimits,
    bubbles: BTreeMap<BubbleId, Bubble<S::Handle>>,
    dragging_out: bool,
}

impl<S: BubbleSurface> BubbleSession<S> {
    pub fn new(store: FolderStore, surface: S, limits: SessionLimits) -> Self {
        Self {
            store,
            surface,
            limits: SessionLimits {
                max_bubbles: limits.max_bubbles.clamp(1, MAX_BUBBLES_CEILING),
                ..limits
            },
            bubbles: BTreeMap::new(),
            dragging_out: false,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &FolderStore {
        &self.store
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    #[cfg(test)]
    pub fn is_live(&self, id: BubbleId) -> bool {
        self.bubbles.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<BubbleId> {
        self.bubbles.keys().copied().collect()
    }

    #[cfg(test)]
    pub fn files(&self, id: BubbleId) -> Option<&[PathBuf]> {
        self.bubbles.get(&id).map(|b| b.files.as_slice())
    }

    pub fn can_add(&self) -> bool {
        self.bubbles.len() < self.limits.max_bubbles
    }

    #[cfg(test)]
    pub fn is_dragging_out(&self) -> bool {
        self.dragging_out
    }

    fn max_id(&self) -> u32 {
        self.limits.max_bubbles as u32
    }

    fn in_range(&self, id: BubbleId) -> bool {
        (1..=self.max_id()).contains(&id.0)
    }

    /// Lowest id in `1..=max_bubbles` that is not live.
    pub fn next_free_id(&self) -> Option<BubbleId> {
        (1..=self.max_id())
            .map(BubbleId)
            .find(|id| !self.bubbles.contains_key(id))
    }

    /// Brings back every bubble whose folder still holds files, or the primary one if none do.
    pub fn restore(&mut self) -> anyhow::Result<()> {
        for n in 1..=self.max_id() {
            let id = BubbleId(n);
            if !self.store.list_files(id).is_empty() {
                self.add_bubble(id)?;
                self.refresh(id);
            }
        }

        if self.bubbles.is_empty() {
            self.add_bubble(BubbleId::PRIMARY)?;
            self.refresh(BubbleId::PRIMARY);
        }

        tracing::info!("restored bubbles {:?}", self.ids());
        Ok(())
    }

    /// Returns Ok(false) when the id is already live, out of range, or the table is full.
    pub fn add_bubble(&mut self, id: BubbleId) -> anyhow::Result<bool> {
        if self.bubbles.contains_key(&id) || !self.can_add() || !self.in_range(id) {
            return Ok(false);
        }

        let folder = self
            .store
            .ensure_folder(id)
            .with_context(|| format!("cannot prepare bubble {}", id))?;
        let handle = self
            .surface
            .create_bubble(id)
            .with_context(|| format!("cannot create bubble {}", id))?;

        self.bubbles.insert(
            id,
            Bubble {
                id,
                folder,
                files: Vec::new(),
                handle,
            },
        );
        self.sync_layout();
        tracing::info!("bubble {} added", id);
        Ok(true)
    }

    pub fn add_next_bubble(&mut self) -> anyhow::Result<Option<BubbleId>> {
        if !self.can_add() {
            return Ok(None);
        }
        let Some(id) = self.next_free_id() else {
            return Ok(None);
        };

        if self.add_bubble(id)? {
            self.refresh(id);
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    /// Pops a bubble. The primary bubble cannot be removed.
    pub fn remove_bubble(&mut self, id: BubbleId) -> bool {
        if id.is_primary() {
            return false;
        }
        let Some(bubble) = self.bubbles.remove(&id) else {
            return false;
        };

        self.surface.destroy_bubble(bubble.handle);
        if self.limits.delete_folder_on_close {
            if let Err(e) = self.store.delete_bubble_folder(id) {
                tracing::warn!("{}", e);
            }
        }
        self.sync_layout();
        tracing::info!("bubble {} removed", id);
        true
    }

    /// Re-reads the bubble folder and redraws its label.
    pub fn refresh(&mut self, id: BubbleId) {
        let Some(bubble) = self.bubbles.get_mut(&id) else {
            return;
        };

        bubble.files = self.store.list_files(id);
        let label = BubbleLabel::for_files(id, &bubble.files);
        self.surface.show_contents(&bubble.handle, &label);
    }

    pub fn clear_bubble(&mut self, id: BubbleId) -> anyhow::Result<Option<BatchOutcome>> {
        if !self.bubbles.contains_key(&id) {
            return Ok(None);
        }

        let outcome = self.store.clear(id)?;
        self.refresh(id);
        tracing::info!("bubble {} cleared ({} files)", id, outcome.items.len());
        Ok(Some(outcome))
    }

    pub fn drop_effect(&self, payload: &DropPayload) -> DropEffect {
        match payload {
            DropPayload::Files(_) => DropEffect::Copy,
            DropPayload::Unsupported => DropEffect::None,
        }
    }

    /// Saves dropped files into the target bubble. Returns None when the drop was declined.
    pub fn accept_drop(
        &mut self,
        site: DropSite,
        payload: DropPayload,
    ) -> anyhow::Result<Option<BatchOutcome>> {
        let DropPayload::Files(paths) = payload else {
            return Ok(None);
        };

        let id = match site {
            DropSite::Bubble(id) if self.bubbles.contains_key(&id) => id,
            DropSite::Bubble(_) => return Ok(None),
            DropSite::Background => {
                // Background drops still land in the primary folder when it has no slot
                if !self.bubbles.contains_key(&BubbleId::PRIMARY) {
                    self.add_bubble(BubbleId::PRIMARY)?;
                }
                BubbleId::PRIMARY
            }
        };

        let outcome = self.store.save_files(id, &paths)?;
        self.refresh(id);
        tracing::info!(
            "drop on bubble {}: {} saved, {} failed",
            id,
            outcome.succeeded().count(),
            outcome.failed().count()
        );
        Ok(Some(outcome))
    }

    /// Claims the drag flag and returns the files to offer. Pair with `finish_drag_out`.
    pub fn begin_drag_out(&mut self, id: BubbleId) -> Result<Vec<PathBuf>, DragOutRejected> {
        if self.dragging_out {
            return Err(DragOutRejected::AlreadyDragging);
        }
        let bubble = self.bubbles.get(&id).ok_or(DragOutRejected::NotLive(id))?;

        let existing: Vec<PathBuf> = bubble
            .files
            .iter()
            .filter(|p| p.exists())
            .cloned()
            .collect();
        if existing.is_empty() {
            return Err(DragOutRejected::Empty(id));
        }

        self.dragging_out = true;
        tracing::debug!(
            "drag out of bubble {} ({}) with {} files",
            id,
            bubble.folder.display(),
            existing.len()
        );
        Ok(existing)
    }

    pub fn finish_drag_out(&mut self) {
        self.dragging_out = false;
    }

    fn sync_layout(&mut self) {
        let order: Vec<&S::Handle> = self.bubbles.values().map(|b| &b.handle).collect();
        self.surface.arrange(&order);
        let enabled = self.bubbles.len() < self.limits.max_bubbles;
        self.surface.set_add_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSurface {
        next_handle: u32,
        live: Vec<(u32, BubbleId)>,
        labels: Vec<(BubbleId, BubbleLabel)>,
        order: Vec<BubbleId>,
        add_enabled: Option<bool>,
        fail_create: bool,
    }

    impl RecordingSurface {
        fn last_label(&self, id: BubbleId) -> Option<&BubbleLabel> {
            self.labels.iter().rev().find(|(i, _)| *i == id).map(|(_, l)| l)
        }
    }

    impl BubbleSurface for RecordingSurface {
        type Handle = (u32, BubbleId);

        fn create_bubble(&mut self, id: BubbleId) -> anyhow::Result<Self::Handle> {
            if self.fail_create {
                anyhow::bail!("no window");
            }
            self.next_handle += 1;
            let handle = (self.next_handle, id);
            self.live.push(handle);
            Ok(handle)
        }

        fn destroy_bubble(&mut self, handle: Self::Handle) {
            self.live.retain(|h| *h != handle);
        }

        fn show_contents(&mut self, handle: &Self::Handle, label: &BubbleLabel) {
            self.labels.push((handle.1, label.clone()));
        }

        fn arrange(&mut self, order: &[&Self::Handle]) {
            self.order = order.iter().map(|h| h.1).collect();
        }

        fn set_add_enabled(&mut self, enabled: bool) {
            self.add_enabled = Some(enabled);
        }
    }

    fn create_test_session(max: usize) -> (BubbleSession<RecordingSurface>, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path().join("DragDropOverlay"));
        let limits = SessionLimits {
            max_bubbles: max,
            delete_folder_on_close: false,
        };
        (
            BubbleSession::new(store, RecordingSurface::default(), limits),
            temp,
        )
    }

    fn write_source(temp: &TempDir, name: &str) -> PathBuf {
        let dir = temp.path().join("sources");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_label_text() {
        let label = BubbleLabel::for_files(BubbleId(2), &[]);
        assert_eq!(label.count_text, "0 items");
        assert_eq!(label.tooltip, "Bubble 2: No files");

        let one = BubbleLabel::for_files(BubbleId(2), &[PathBuf::from("/x/a.txt")]);
        assert_eq!(one.count_text, "1 item");
        assert_eq!(one.tooltip, "Bubble 2:\na.txt");

        let two = BubbleLabel::for_files(
            BubbleId(3),
            &[PathBuf::from("/x/a.txt"), PathBuf::from("/x/b.png")],
        );
        assert_eq!(two.count_text, "2 items");
        assert_eq!(two.tooltip, "Bubble 3:\na.txt\nb.png");
    }

    #[test]
    fn test_restore_fresh_start_adds_primary() {
        let (mut session, _temp) = create_test_session(7);
        session.restore().unwrap();
        assert_eq!(session.ids(), vec![BubbleId::PRIMARY]);
        assert_eq!(session.surface().add_enabled, Some(true));
    }

    #[test]
    fn test_restore_brings_back_non_empty_folders() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        session.store().save_files(BubbleId(3), &[&a]).unwrap();
        session.store().save_files(BubbleId(5), &[&a]).unwrap();
        session.store().ensure_folder(BubbleId(4)).unwrap();

        session.restore().unwrap();
        assert_eq!(session.ids(), vec![BubbleId(3), BubbleId(5)]);
        assert_eq!(session.files(BubbleId(3)).unwrap().len(), 1);
        assert_eq!(
            session.surface().last_label(BubbleId(5)).unwrap().count_text,
            "1 item"
        );
    }

    #[test]
    fn test_add_is_idempotent_and_sorted() {
        let (mut session, _temp) = create_test_session(7);
        assert!(session.add_bubble(BubbleId(4)).unwrap());
        assert!(session.add_bubble(BubbleId(2)).unwrap());
        assert!(!session.add_bubble(BubbleId(4)).unwrap());

        assert_eq!(session.len(), 2);
        assert_eq!(session.surface().live.len(), 2);
        assert_eq!(session.surface().order, vec![BubbleId(2), BubbleId(4)]);
        assert!(session.store().folder_path(BubbleId(4)).is_dir());
        assert_eq!(session.files(BubbleId(4)), Some(&[][..]));
    }

    #[test]
    fn test_add_rejects_out_of_range_ids() {
        let (mut session, _temp) = create_test_session(3);
        assert!(!session.add_bubble(BubbleId(0)).unwrap());
        assert!(!session.add_bubble(BubbleId(4)).unwrap());
        assert!(session.is_empty());
    }

    #[test]
    fn test_max_bubbles_enforced() {
        let (mut session, _temp) = create_test_session(3);
        for _ in 0..5 {
            session.add_next_bubble().unwrap();
        }
        assert_eq!(session.len(), 3);
        assert!(!session.can_add());
        assert_eq!(session.surface().add_enabled, Some(false));
        assert_eq!(session.add_next_bubble().unwrap(), None);
    }

    #[test]
    fn test_huge_limit_is_capped() {
        let (mut session, temp) = create_test_session(usize::MAX);
        let a = write_source(&temp, "a.txt");
        let beyond = BubbleId(MAX_BUBBLES_CEILING as u32 + 1);
        session.store().save_files(beyond, &[&a]).unwrap();

        session.restore().unwrap();
        assert_eq!(session.ids(), vec![BubbleId::PRIMARY]);

        while session.add_next_bubble().unwrap().is_some() {}
        assert_eq!(session.len(), MAX_BUBBLES_CEILING);
        assert!(!session.add_bubble(beyond).unwrap());
        assert_eq!(session.surface().live.len(), MAX_BUBBLES_CEILING);
    }

    #[test]
    fn test_lowest_free_id_is_reused() {
        let (mut session, _temp) = create_test_session(7);
        for _ in 0..4 {
            session.add_next_bubble().unwrap();
        }
        assert!(session.remove_bubble(BubbleId(3)));
        assert_eq!(session.add_next_bubble().unwrap(), Some(BubbleId(3)));
        assert_eq!(session.add_next_bubble().unwrap(), Some(BubbleId(5)));
    }

    #[test]
    fn test_remove_exactly_once() {
        let (mut session, _temp) = create_test_session(7);
        session.add_bubble(BubbleId(2)).unwrap();

        assert!(session.remove_bubble(BubbleId(2)));
        assert!(!session.remove_bubble(BubbleId(2)));
        assert!(!session.remove_bubble(BubbleId(6)));
        assert!(session.surface().live.is_empty());
    }

    #[test]
    fn test_primary_cannot_be_removed() {
        let (mut session, _temp) = create_test_session(7);
        session.add_bubble(BubbleId::PRIMARY).unwrap();
        assert!(!session.remove_bubble(BubbleId::PRIMARY));
        assert!(session.is_live(BubbleId::PRIMARY));
    }

    #[test]
    fn test_remove_keeps_files_by_default() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId(2)).unwrap();
        session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Files(vec![a]))
            .unwrap();

        session.remove_bubble(BubbleId(2));
        assert_eq!(session.store().list_files(BubbleId(2)).len(), 1);
    }

    #[test]
    fn test_remove_can_delete_folder() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path().join("DragDropOverlay"));
        let limits = SessionLimits {
            max_bubbles: 7,
            delete_folder_on_close: true,
        };
        let mut session = BubbleSession::new(store, RecordingSurface::default(), limits);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId(2)).unwrap();
        session.store().save_files(BubbleId(2), &[a]).unwrap();

        session.remove_bubble(BubbleId(2));
        assert!(!session.store().folder_path(BubbleId(2)).exists());
    }

    #[test]
    fn test_drop_saves_and_refreshes() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        let b = write_source(&temp, "b.txt");
        session.add_bubble(BubbleId(2)).unwrap();

        let outcome = session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Files(vec![a, b]))
            .unwrap()
            .unwrap();
        assert!(outcome.is_complete());
        assert_eq!(session.files(BubbleId(2)).unwrap().len(), 2);

        let label = session.surface().last_label(BubbleId(2)).unwrap();
        assert_eq!(label.count_text, "2 items");
        assert!(label.tooltip.contains("a.txt"));
        assert!(label.tooltip.contains("b.txt"));
    }

    #[test]
    fn test_unsupported_payload_declined() {
        let (mut session, _temp) = create_test_session(7);
        session.add_bubble(BubbleId(2)).unwrap();

        assert_eq!(session.drop_effect(&DropPayload::Unsupported), DropEffect::None);
        assert_eq!(
            session.drop_effect(&DropPayload::Files(Vec::new())),
            DropEffect::Copy
        );
        let result = session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Unsupported)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_drop_on_closed_bubble_declined() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        let result = session
            .accept_drop(DropSite::Bubble(BubbleId(4)), DropPayload::Files(vec![a]))
            .unwrap();
        assert!(result.is_none());
        assert!(session.store().list_files(BubbleId(4)).is_empty());
    }

    #[test]
    fn test_background_drop_goes_to_primary() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId(2)).unwrap();

        session
            .accept_drop(DropSite::Background, DropPayload::Files(vec![a]))
            .unwrap();
        assert!(session.is_live(BubbleId::PRIMARY));
        assert_eq!(session.files(BubbleId::PRIMARY).unwrap().len(), 1);
        assert!(session.files(BubbleId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_background_drop_when_full_still_saves() {
        let (mut session, temp) = create_test_session(1);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId::PRIMARY).unwrap();

        session
            .accept_drop(DropSite::Background, DropPayload::Files(vec![a]))
            .unwrap();
        assert_eq!(session.store().list_files(BubbleId::PRIMARY).len(), 1);
    }

    #[test]
    fn test_clear_bubble() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId(2)).unwrap();
        session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Files(vec![a.clone()]))
            .unwrap();

        session.clear_bubble(BubbleId(2)).unwrap();
        assert!(session.files(BubbleId(2)).unwrap().is_empty());
        assert_eq!(
            session.surface().last_label(BubbleId(2)).unwrap().count_text,
            "0 items"
        );
        assert!(a.exists());
        assert!(session.clear_bubble(BubbleId(5)).unwrap().is_none());
    }

    #[test]
    fn test_refresh_sees_external_changes() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        let b = write_source(&temp, "b.txt");
        session.add_bubble(BubbleId(2)).unwrap();
        session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Files(vec![a, b]))
            .unwrap();

        let victim = session.files(BubbleId(2)).unwrap()[0].clone();
        fs::remove_file(&victim).unwrap();
        session.refresh(BubbleId(2));

        assert_eq!(session.files(BubbleId(2)).unwrap().len(), 1);
        assert!(!session.files(BubbleId(2)).unwrap().contains(&victim));
    }

    #[test]
    fn test_drag_out_of_empty_bubble_rejected() {
        let (mut session, _temp) = create_test_session(7);
        session.add_bubble(BubbleId(2)).unwrap();

        let err = session.begin_drag_out(BubbleId(2)).unwrap_err();
        assert_eq!(err, DragOutRejected::Empty(BubbleId(2)));
        assert_eq!(
            err.to_string(),
            "No files in bubble 2. Drag some files into the bubble."
        );
        assert!(!session.is_dragging_out());
    }

    #[test]
    fn test_drag_out_is_not_reentrant() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId(2)).unwrap();
        session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Files(vec![a]))
            .unwrap();

        let files = session.begin_drag_out(BubbleId(2)).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(
            session.begin_drag_out(BubbleId(2)),
            Err(DragOutRejected::AlreadyDragging)
        );

        session.finish_drag_out();
        assert!(session.begin_drag_out(BubbleId(2)).is_ok());
    }

    #[test]
    fn test_drag_out_skips_vanished_files() {
        let (mut session, temp) = create_test_session(7);
        let a = write_source(&temp, "a.txt");
        session.add_bubble(BubbleId(2)).unwrap();
        session
            .accept_drop(DropSite::Bubble(BubbleId(2)), DropPayload::Files(vec![a]))
            .unwrap();

        let cached = session.files(BubbleId(2)).unwrap()[0].clone();
        fs::remove_file(cached).unwrap();
        assert_eq!(
            session.begin_drag_out(BubbleId(2)),
            Err(DragOutRejected::Empty(BubbleId(2)))
        );
    }

    #[test]
    fn test_drag_out_of_closed_bubble() {
        let (mut session, _temp) = create_test_session(7);
        assert_eq!(
            session.begin_drag_out(BubbleId(3)),
            Err(DragOutRejected::NotLive(BubbleId(3)))
        );
    }

    #[test]
    fn test_surface_failure_leaves_table_untouched() {
        let temp = TempDir::new().unwrap();
        let store = FolderStore::new(temp.path().join("DragDropOverlay"));
        let surface = RecordingSurface {
            fail_create: true,
            ..Default::default()
        };
        let mut session = BubbleSession::new(store, surface, SessionLimits::default());

        let err = session.add_bubble(BubbleId(2)).unwrap_err();
        assert!(format!("{:#}", err).contains("no window"));
        assert!(session.is_empty());
    }
}
