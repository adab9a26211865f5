// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Recorded command lists and the per-frame tracker keeping executed lists alive.

use super::api::CommandListFlags;
use super::disposal::{DisposalItem, Disposer};
use super::handle::CommandListId;

/// A replayable sequence of commands produced by a deferred queue's `end()`.
///
/// Owned by the caller until handed to
/// [`GraphicsQueue::execute`](super::GraphicsQueue::execute); the device then
/// keeps it for `frame_buffer_size` frames before releasing it.
#[derive(Debug)]
pub struct CommandList {
    id: CommandListId,
    flags: CommandListFlags,
    device_id: u64,
    queue_id: Option<u32>,
    disposer: Disposer,
}

impl CommandList {
    pub(crate) fn new(
        id: CommandListId,
        flags: CommandListFlags,
        device_id: u64,
        queue_id: Option<u32>,
        disposer: Disposer,
    ) -> Self {
        Self {
            id,
            flags,
            device_id,
            queue_id,
            disposer,
        }
    }

    /// The native command list.
    pub fn id(&self) -> CommandListId {
        self.id
    }

    /// Flags the recording queue was begun with.
    pub fn flags(&self) -> CommandListFlags {
        self.flags
    }

    /// `true` if the list was recorded for deferred replay.
    pub fn is_deferred(&self) -> bool {
        self.flags.contains(CommandListFlags::DEFERRED)
    }

    /// The recording device.
    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    /// Id of the deferred queue that recorded the list.
    pub fn queue_id(&self) -> Option<u32> {
        self.queue_id
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        self.disposer.mark(DisposalItem::CommandList(self.id));
    }
}

/// Ring of per-frame slots holding executed command lists.
///
/// A list executed during frame `n` is released when its slot is reused at
/// frame `n + frame_count`, once the GPU can no longer be reading it.
#[derive(Debug)]
pub struct FrameTracker {
    slots: Vec<Vec<CommandList>>,
    current: usize,
}

impl FrameTracker {
    /// A tracker with `frame_count` slots (at least one).
    pub fn new(frame_count: u32) -> Self {
        let count = frame_count.max(1) as usize;
        Self {
            slots: (0..count).map(|_| Vec::new()).collect(),
            current: 0,
        }
    }

    /// Keeps `list` alive until its slot comes around again.
    pub fn track(&mut self, list: CommandList) {
        self.slots[self.current].push(list);
    }

    /// Moves to the next frame, dropping the lists of the slot being reused.
    /// Returns how many lists were dropped.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.slots.len();
        let released = self.slots[self.current].len();
        self.slots[self.current].clear();
        released
    }

    /// Number of lists still tracked.
    pub fn tracked(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Drops every tracked list.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::handle::HandleArena;

    #[test]
    fn test_lists_survive_frame_count_frames() {
        let (disposer, rx) = Disposer::channel();
        let mut arena = HandleArena::new();
        let mut tracker = FrameTracker::new(3);

        let id = CommandListId(arena.insert(()));
        tracker.track(CommandList::new(id, CommandListFlags::DEFERRED, 1, Some(0), disposer));

        assert_eq!(tracker.advance(), 0);
        assert_eq!(tracker.advance(), 0);
        assert!(rx.is_empty());
        assert_eq!(tracker.advance(), 1, "The slot is reused on the third advance");
        assert_eq!(rx.try_recv().ok(), Some(DisposalItem::CommandList(id)));
        assert_eq!(tracker.tracked(), 0);
    }

    #[test]
    fn test_zero_frames_is_clamped() {
        let mut tracker = FrameTracker::new(0);
        assert_eq!(tracker.advance(), 0);
    }
}
