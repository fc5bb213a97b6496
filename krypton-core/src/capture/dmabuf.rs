//! dma-buf handle export
//!
//! Converts the memory handles of a framebuffer descriptor into read-only
//! dma-buf file descriptors for zero-copy hand-off. The descriptors are held
//! as `OwnedFd` so each one closes exactly once, when the set goes out of
//! scope at the end of the iteration that exported it.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use tracing::warn;

use crate::device::KmsDevice;
use crate::types::SurfaceInfo;

/// Exported dma-buf descriptors for one frame
#[derive(Debug, Default)]
pub struct DmabufSet {
    fds: [Option<OwnedFd>; 4],
    count: usize,
}

impl DmabufSet {
    /// A set with no planes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of populated planes in the source descriptor
    ///
    /// This is the index of the first absent memory handle, not the number of
    /// successfully exported descriptors; see [`DmabufSet::valid`].
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of successfully exported descriptors
    pub fn valid(&self) -> usize {
        self.fds.iter().filter(|fd| fd.is_some()).count()
    }

    /// Borrow the descriptor for one plane slot
    pub fn fd(&self, plane: usize) -> Option<BorrowedFd<'_>> {
        self.fds.get(plane)?.as_ref().map(|fd| fd.as_fd())
    }

    /// Borrow all descriptors in slot order
    pub fn borrowed(&self) -> [Option<BorrowedFd<'_>>; 4] {
        [self.fd(0), self.fd(1), self.fd(2), self.fd(3)]
    }
}

/// Export every populated plane of a descriptor as a read-only dma-buf
///
/// Plane slots are contiguous; the walk stops at the first absent handle. An
/// export failure on one plane leaves that slot empty and continues, so the
/// caller can distinguish total failure (`valid() == 0`, typically a
/// privilege problem) from partial failure on later planes.
pub fn export<D: KmsDevice>(device: &D, surface: &SurfaceInfo) -> DmabufSet {
    let mut set = DmabufSet::empty();
    for (i, plane) in surface.planes.iter().enumerate() {
        if plane.handle == 0 {
            break;
        }
        set.count = i + 1;
        match device.export_buffer(plane.handle) {
            Ok(fd) => set.fds[i] = Some(fd),
            Err(e) => warn!("dma-buf export failed for plane {}: {}", i, e),
        }
    }
    set
}
