//! Errors reported by the page table walker

use core::fmt::{self, Display, Formatter};

/// Error returned by mapping operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// The frame allocator ran out of frames
    OutOfMemory,
    /// The virtual page already has a valid leaf entry
    Remap,
    /// Some entry on the way to the virtual page is invalid
    NotMapped,
    /// A leaf entry sits at an interior level
    HugePage,
    /// Virtual or physical address is not page aligned
    Misaligned,
    /// Virtual address is not canonical, or outside the part of the address
    /// space the table may touch
    OutOfRange,
    /// Permission grants none of `R|W|X`
    InvalidPermission,
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let msg = match self {
            VmError::OutOfMemory => "out of physical frames",
            VmError::Remap => "virtual page is already mapped",
            VmError::NotMapped => "virtual page is not mapped",
            VmError::HugePage => "huge page entries are not supported",
            VmError::Misaligned => "address is not page aligned",
            VmError::OutOfRange => "virtual address out of range",
            VmError::InvalidPermission => "mapping needs at least one of R, W, X",
        };
        f.write_str(msg)
    }
}
