//! The bytes behind the frames.

use alloc::boxed::Box;
use alloc::vec;

use crate::config::Config;
use crate::mem::FrameIndex;
use crate::util::sync::Spinlock;

/// Physical memory: `frame_count` frames of `page_size` bytes each.
pub struct MainMemory {
    page_size: usize,
    frame_count: usize,
    bytes: Spinlock<Box<[u8]>>,
}

impl MainMemory {
    pub fn new(config: &Config) -> MainMemory {
        MainMemory {
            page_size: config.page_size(),
            frame_count: config.frame_count(),
            bytes: Spinlock::new(vec![0; config.memory_size()].into_boxed_slice()),
        }
    }

    /// Run `f` over the contents of a frame.
    pub fn with_frame<R>(&self, frame: FrameIndex, f: impl FnOnce(&[u8]) -> R) -> R {
        let start = self.offset(frame);
        f(&self.bytes.lock()[start..start + self.page_size])
    }

    /// Run `f` over the contents of a frame, mutably.
    pub fn with_frame_mut<R>(&self, frame: FrameIndex, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let start = self.offset(frame);
        f(&mut self.bytes.lock()[start..start + self.page_size])
    }

    /// Set every byte of a frame to `byte`.
    pub fn fill(&self, frame: FrameIndex, byte: u8) {
        self.with_frame_mut(frame, |bytes| {
            for b in bytes {
                *b = byte;
            }
        })
    }

    fn offset(&self, frame: FrameIndex) -> usize {
        assert!(
            frame < self.frame_count,
            "Frame {} outside memory of {} frames.",
            frame,
            self.frame_count
        );
        frame * self.page_size
    }
}
