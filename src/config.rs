//! Memory configuration, passed explicitly to the components that need it.

use core::fmt::{self, Display, Formatter};

use crate::consts;

/// Reasons a [Config] can be rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// There must be at least one physical frame.
    NoFrames,
    /// Pages must be a nonzero power of two bytes.
    BadPageSize(usize),
    /// Address spaces must have at least one page.
    NoVirtualPages,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ConfigError::NoFrames => write!(f, "physical memory must have at least one frame"),
            ConfigError::BadPageSize(size) => {
                write!(f, "page size {} is not a nonzero power of two", size)
            }
            ConfigError::NoVirtualPages => {
                write!(f, "address spaces must have at least one page")
            }
        }
    }
}

/// Sizes of physical memory and of address spaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    frame_count: usize,
    page_size: usize,
    virtual_pages: usize,
}

impl Config {
    /// Validate and build a configuration.
    pub fn new(
        frame_count: usize,
        page_size: usize,
        virtual_pages: usize,
    ) -> Result<Config, ConfigError> {
        if frame_count == 0 {
            return Err(ConfigError::NoFrames);
        }
        if !page_size.is_power_of_two() {
            return Err(ConfigError::BadPageSize(page_size));
        }
        if virtual_pages == 0 {
            return Err(ConfigError::NoVirtualPages);
        }

        Ok(Config {
            frame_count,
            page_size,
            virtual_pages,
        })
    }

    /// The default configuration with a different number of frames.
    pub fn with_frames(frame_count: usize) -> Result<Config, ConfigError> {
        Config::new(frame_count, consts::PAGE_SIZE, consts::MAX_VIRTUAL_PAGES)
    }

    /// The number of physical frames.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// The size of one page in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The number of pages in each address space.
    pub fn virtual_pages(&self) -> usize {
        self.virtual_pages
    }

    /// The number of bytes of physical memory.
    pub fn memory_size(&self) -> usize {
        self.frame_count * self.page_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            frame_count: consts::NUM_PHYS_PAGES,
            page_size: consts::PAGE_SIZE,
            virtual_pages: consts::MAX_VIRTUAL_PAGES,
        }
    }
}
