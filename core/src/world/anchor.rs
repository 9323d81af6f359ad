//! Anchor election and distribution (§4.4). The buffer holds either an
//! incomplete in-progress set of byte segments or a committed,
//! immutable sequence — never both at once.

use crate::ids::HeadsetId;

#[derive(Debug, Default)]
pub struct AnchorBuffer {
    segments: Vec<Vec<u8>>,
    completed: bool,
}

impl AnchorBuffer {
    pub fn push_segment(&mut self, data: Vec<u8>) {
        debug_assert!(!self.completed, "pushing a segment into a committed anchor buffer");
        self.segments.push(data);
    }

    pub fn commit(&mut self) {
        self.completed = true;
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub fn reset(&mut self) {
        self.segments.clear();
        self.completed = false;
    }
}

#[derive(Debug, Default)]
pub struct AnchorState {
    pub provider: Option<HeadsetId>,
    pub buffer: AnchorBuffer,
}

impl AnchorState {
    pub fn new() -> Self {
        AnchorState::default()
    }

    /// True while an upload is in progress and not yet committed —
    /// only the provider may send segments during this window.
    pub fn upload_in_progress(&self) -> bool {
        self.provider.is_some() && !self.buffer.is_completed()
    }

    pub fn reset_for_reelection(&mut self, new_provider: Option<HeadsetId>) {
        self.buffer.reset();
        self.provider = new_provider;
    }
}
