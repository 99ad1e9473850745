//! The frame table and its free list.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use core::task::Waker;

use crate::mem::virt::{Owner, SpaceId};
use crate::mem::{FrameIndex, Vpn};

/// The state of one physical frame.
#[derive(Clone)]
pub(super) struct FrameDescriptor {
    pub(super) free: bool,
    pub(super) locked: bool,
    pub(super) owner: Option<Owner>,
    pub(super) virtual_page: Vpn,
}

impl FrameDescriptor {
    const FREE: FrameDescriptor = FrameDescriptor {
        free: true,
        locked: false,
        owner: None,
        virtual_page: 0,
    };
}

/// A snapshot of a frame's descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub free: bool,
    pub locked: bool,
    /// The backed page, if the frame is in use.
    pub virtual_page: Option<Vpn>,
    /// The owning address space, if the frame is in use.
    pub owner: Option<SpaceId>,
}

impl From<&FrameDescriptor> for FrameInfo {
    fn from(d: &FrameDescriptor) -> FrameInfo {
        FrameInfo {
            free: d.free,
            locked: d.locked,
            virtual_page: if d.free { None } else { Some(d.virtual_page) },
            owner: d.owner.as_ref().map(Owner::id),
        }
    }
}

/// Everything guarded by the frame manager's critical section.
pub(super) struct Frames {
    table: Vec<FrameDescriptor>,
    /// Unused frames. Popped from and pushed to the front.
    free: VecDeque<FrameIndex>,
    /// The clock hand: the last frame the scan looked at.
    pub(super) cursor: FrameIndex,
    /// Bumped on every unlock; lets a suspended scan tell whether it missed one.
    pub(super) unlocks: u64,
    pub(super) unlock_waiters: Vec<Waker>,
}

impl Frames {
    pub(super) fn new(capacity: usize) -> Frames {
        assert!(capacity > 0, "Physical memory without frames.");

        Frames {
            table: vec![FrameDescriptor::FREE; capacity],
            free: (0..capacity).collect(),
            cursor: capacity - 1,
            unlocks: 0,
            unlock_waiters: Vec::new(),
        }
    }

    pub(super) fn capacity(&self) -> usize {
        self.table.len()
    }

    pub(super) fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(super) fn get(&self, frame: FrameIndex) -> &FrameDescriptor {
        let capacity = self.capacity();
        self.table
            .get(frame)
            .unwrap_or_else(|| panic!("Frame {} outside table of {} frames.", frame, capacity))
    }

    pub(super) fn get_mut(&mut self, frame: FrameIndex) -> &mut FrameDescriptor {
        let capacity = self.capacity();
        self.table
            .get_mut(frame)
            .unwrap_or_else(|| panic!("Frame {} outside table of {} frames.", frame, capacity))
    }

    /// Take a frame off the free list, reserved: not free, and locked so the
    /// clock will not touch it before its owner is filled in.
    pub(super) fn pop_free(&mut self) -> Option<FrameIndex> {
        let frame = self.free.pop_front()?;
        let desc = self.get_mut(frame);
        assert!(desc.free, "Frame {} on the free list is in use.", frame);

        desc.free = false;
        desc.locked = true;
        Some(frame)
    }

    /// Clear a frame's descriptor and put it at the front of the free list.
    /// Returns who owned it and which page it backed.
    pub(super) fn push_free(&mut self, frame: FrameIndex) -> (Option<Owner>, Vpn) {
        let desc = self.get_mut(frame);
        assert!(!desc.free, "Frame {} is already free.", frame);
        assert!(!desc.locked, "Frame {} is locked.", frame);

        let old = core::mem::replace(desc, FrameDescriptor::FREE);
        self.free.push_front(frame);
        (old.owner, old.virtual_page)
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = &FrameDescriptor> {
        self.table.iter()
    }

    /// Check the free list against the descriptors.
    #[cfg(test)]
    pub(super) fn check(&self) {
        for (frame, desc) in self.table.iter().enumerate() {
            let listed = self.free.iter().filter(|&&f| f == frame).count();
            if desc.free {
                assert_eq!(listed, 1, "Free frame {} listed {} times.", frame, listed);
                assert!(!desc.locked, "Free frame {} is locked.", frame);
                assert!(desc.owner.is_none(), "Free frame {} has an owner.", frame);
            } else {
                assert_eq!(listed, 0, "Used frame {} is on the free list.", frame);
            }
        }
        assert!(self.cursor < self.capacity());
    }
}
