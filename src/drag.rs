// Click-vs-drag detection for outgoing file drags

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragThreshold {
    pub dx: i32,
    pub dy: i32,
}

impl DragThreshold {
    pub const fn uniform(pixels: i32) -> Self {
        Self {
            dx: pixels,
            dy: pixels,
        }
    }

    /// The system drag rectangle (SM_CXDRAG / SM_CYDRAG), or 4px off Windows.
    pub fn system() -> Self {
        #[cfg(windows)]
        {
            use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXDRAG, SM_CYDRAG};
            let (dx, dy) = unsafe { (GetSystemMetrics(SM_CXDRAG), GetSystemMetrics(SM_CYDRAG)) };
            if dx > 0 && dy > 0 {
                return Self { dx, dy };
            }
        }
        Self::uniform(4)
    }
}

/// Tracks one primary-button press. `update` fires once the pointer moves past the threshold.
#[derive(Debug)]
pub struct DragTracker {
    threshold: DragThreshold,
    start: Option<(i32, i32)>,
}

impl DragTracker {
    pub fn new(threshold: DragThreshold) -> Self {
        Self {
            threshold,
            start: None,
        }
    }

    pub fn press(&mut self, x: i32, y: i32) {
        self.start = Some((x, y));
    }

    /// Returns true exactly once per press, when either axis exceeds its threshold.
    pub fn update(&mut self, x: i32, y: i32) -> bool {
        let Some((sx, sy)) = self.start else {
            return false;
        };

        if (x - sx).abs() > self.threshold.dx || (y - sy).abs() > self.threshold.dy {
            self.start = None;
            return true;
        }
        false
    }

    pub fn release(&mut self) {
        self.start = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.start.is_some()
    }
}
