//! DRM device node access
//!
//! [`Card`] owns the opened device node and implements [`KmsDevice`] with a
//! mix of `drm` crate queries (resources, connectors, encoders, planes) and
//! raw ioctls for the entry points the crate does not bind: the CRTC sequence
//! pair, the extended framebuffer fetch (whose raw handle array we need),
//! GEM handle release, and PRIME export with an explicit read-only flag.

use std::fs::{File, OpenOptions};
use std::num::NonZeroU32;
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};
use std::os::unix::io::AsRawFd;
use std::path::Path;

use drm::control::{connector, Device as ControlDevice};
use drm::{ClientCapability, Device};
use tracing::{debug, trace, warn};

use super::KmsDevice;
use crate::error::{KryptonError, Result};
use crate::types::{
    ConnectorInfo, CrtcId, DisplayMode, EncoderId, FbId, PlaneId, PlaneState, SequenceEvent,
    SurfaceInfo,
};

/// An opened DRM device node
pub struct Card {
    file: File,
    universal_planes: bool,
}

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Device for Card {}
impl ControlDevice for Card {}

impl Card {
    /// Open a DRM device node read-only and negotiate plane addressing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| KryptonError::device("open", e))?;
        let mut card = Self {
            file,
            universal_planes: false,
        };

        // Without this the kernel hides overlay and cursor planes.
        match card.set_client_capability(ClientCapability::UniversalPlanes, true) {
            Ok(()) => card.universal_planes = true,
            Err(e) => warn!("universal planes capability rejected: {}", e),
        }

        debug!("opened DRM device {}", path.display());
        Ok(card)
    }

    /// Whether the kernel accepted universal plane addressing
    pub fn universal_planes(&self) -> bool {
        self.universal_planes
    }

    fn ioctl<T>(&self, request: libc::c_ulong, arg: &mut T) -> std::io::Result<()> {
        loop {
            let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request, arg as *mut T) };
            if rc == 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
                _ => return Err(err),
            }
        }
    }
}

fn nonzero(raw: u32, op: &'static str) -> Result<NonZeroU32> {
    NonZeroU32::new(raw).ok_or_else(|| {
        KryptonError::device(op, std::io::Error::from_raw_os_error(libc::EINVAL))
    })
}

fn is_einval(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINVAL)
}

impl KmsDevice for Card {
    fn crtcs(&self) -> Result<Vec<CrtcId>> {
        let res = self
            .resource_handles()
            .map_err(|e| KryptonError::device("get resources", e))?;
        Ok(res
            .crtcs()
            .iter()
            .map(|h| CrtcId::new(u32::from(*h)))
            .collect())
    }

    fn connectors(&self) -> Result<Vec<ConnectorInfo>> {
        let res = self
            .resource_handles()
            .map_err(|e| KryptonError::device("get resources", e))?;

        let mut out = Vec::with_capacity(res.connectors().len());
        for handle in res.connectors() {
            let info = match self.get_connector(*handle, false) {
                Ok(info) => info,
                Err(e) => {
                    warn!("skipping connector {}: {}", u32::from(*handle), e);
                    continue;
                }
            };
            out.push(ConnectorInfo {
                connector: crate::types::ConnectorId::new(u32::from(*handle)),
                interface: info.interface().as_str().to_string(),
                instance: info.interface_id(),
                connected: info.state() == connector::State::Connected,
                encoder: info
                    .current_encoder()
                    .map(|enc| EncoderId::new(u32::from(enc))),
                preferred_mode: info.modes().first().map(|mode| DisplayMode {
                    width: mode.size().0 as u32,
                    height: mode.size().1 as u32,
                    refresh: mode.vrefresh(),
                }),
            });
        }
        Ok(out)
    }

    fn encoder_crtc(&self, encoder: EncoderId) -> Result<Option<CrtcId>> {
        let handle = drm::control::encoder::Handle::from(nonzero(encoder.raw(), "get encoder")?);
        let info = self
            .get_encoder(handle)
            .map_err(|e| KryptonError::device("get encoder", e))?;
        Ok(info.crtc().map(|c| CrtcId::new(u32::from(c))))
    }

    fn crtc_sequence(&self, crtc: CrtcId) -> Result<Option<(u64, u64)>> {
        let mut arg = ioctl::CrtcGetSequence {
            crtc_id: crtc.raw(),
            ..Default::default()
        };
        match self.ioctl(ioctl::CRTC_GET_SEQUENCE, &mut arg) {
            Ok(()) => Ok(Some((arg.sequence, arg.sequence_ns as u64))),
            // EINVAL means the CRTC is currently disabled
            Err(e) if is_einval(&e) => Ok(None),
            Err(e) => Err(KryptonError::device("get sequence", e)),
        }
    }

    fn queue_sequence(&self, crtc: CrtcId) -> Result<bool> {
        let mut arg = ioctl::CrtcQueueSequence {
            crtc_id: crtc.raw(),
            flags: ioctl::SEQUENCE_RELATIVE | ioctl::SEQUENCE_NEXT_ON_MISS,
            sequence: 1,
            user_data: u64::from(crtc.raw()),
        };
        match self.ioctl(ioctl::CRTC_QUEUE_SEQUENCE, &mut arg) {
            Ok(()) => Ok(true),
            Err(e) if is_einval(&e) => Ok(false),
            Err(e) => Err(KryptonError::device("queue sequence", e)),
        }
    }

    fn wait_events(&self) -> Result<Vec<SequenceEvent>> {
        let mut buf = [0u8; 1024];
        let n = unsafe {
            libc::read(
                self.file.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EINTR) => Ok(Vec::new()),
                _ => Err(KryptonError::device("read events", err)),
            };
        }

        let n = n as usize;
        let mut events = Vec::new();
        let mut offset = 0;
        let header_len = std::mem::size_of::<ioctl::EventHeader>();
        while offset + header_len <= n {
            let header: ioctl::EventHeader =
                unsafe { std::ptr::read_unaligned(buf[offset..].as_ptr() as *const _) };
            let length = header.length as usize;
            if length < header_len || offset + length > n {
                warn!("malformed DRM event stream, dropping {} bytes", n - offset);
                break;
            }
            if header.kind == ioctl::EVENT_CRTC_SEQUENCE
                && length >= std::mem::size_of::<ioctl::CrtcSequenceEvent>()
            {
                let ev: ioctl::CrtcSequenceEvent =
                    unsafe { std::ptr::read_unaligned(buf[offset..].as_ptr() as *const _) };
                events.push(SequenceEvent {
                    crtc: CrtcId::new(ev.user_data as u32),
                    sequence: ev.sequence,
                    timestamp_ns: ev.time_ns as u64,
                });
            } else {
                trace!("ignoring DRM event type {}", header.kind);
            }
            offset += length;
        }
        Ok(events)
    }

    fn plane_states(&self) -> Result<Vec<PlaneState>> {
        let handles = self
            .plane_handles()
            .map_err(|e| KryptonError::device("get planes", e))?;
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            let info = self
                .get_plane(handle)
                .map_err(|e| KryptonError::device("get plane", e))?;
            out.push(PlaneState {
                plane: PlaneId::new(u32::from(handle)),
                crtc: info.crtc().map(|c| CrtcId::new(u32::from(c))),
                framebuffer: info.framebuffer().map(|f| FbId::new(u32::from(f))),
            });
        }
        Ok(out)
    }

    fn plane_state(&self, plane: PlaneId) -> Result<PlaneState> {
        let handle = drm::control::plane::Handle::from(nonzero(plane.raw(), "get plane")?);
        let info = self
            .get_plane(handle)
            .map_err(|e| KryptonError::device("get plane", e))?;
        Ok(PlaneState {
            plane,
            crtc: info.crtc().map(|c| CrtcId::new(u32::from(c))),
            framebuffer: info.framebuffer().map(|f| FbId::new(u32::from(f))),
        })
    }

    fn crtc_framebuffer(&self, crtc: CrtcId) -> Result<Option<FbId>> {
        let handle = drm::control::crtc::Handle::from(nonzero(crtc.raw(), "get crtc")?);
        let info = self
            .get_crtc(handle)
            .map_err(|e| KryptonError::device("get crtc", e))?;
        Ok(info.framebuffer().map(|f| FbId::new(u32::from(f))))
    }

    fn framebuffer(&self, fb: FbId) -> Result<Option<SurfaceInfo>> {
        let mut arg = ioctl::FbCmd2 {
            fb_id: fb.raw(),
            ..Default::default()
        };
        match self.ioctl(ioctl::MODE_GETFB2, &mut arg) {
            Ok(()) => {
                let mut planes = [crate::types::PlaneLayout::default(); 4];
                for (i, plane) in planes.iter_mut().enumerate() {
                    plane.pitch = arg.pitches[i];
                    plane.offset = arg.offsets[i];
                    plane.handle = arg.handles[i];
                }
                Ok(Some(SurfaceInfo {
                    width: arg.width,
                    height: arg.height,
                    fourcc: arg.pixel_format,
                    modifier: arg.modifier[0],
                    planes,
                }))
            }
            // The framebuffer can vanish between plane lookup and fetch.
            Err(e) if is_einval(&e) || e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
            Err(e) => Err(KryptonError::device("get framebuffer", e)),
        }
    }

    fn export_buffer(&self, handle: u32) -> Result<OwnedFd> {
        let mut arg = ioctl::PrimeHandle {
            handle,
            flags: (libc::O_RDONLY | libc::O_CLOEXEC) as u32,
            fd: -1,
        };
        self.ioctl(ioctl::PRIME_HANDLE_TO_FD, &mut arg)
            .map_err(|e| KryptonError::device("prime export", e))?;
        if arg.fd < 0 {
            return Err(KryptonError::device(
                "prime export",
                std::io::Error::from_raw_os_error(libc::EBADF),
            ));
        }
        Ok(unsafe { OwnedFd::from_raw_fd(arg.fd) })
    }

    fn release_buffer(&self, handle: u32) -> Result<()> {
        let mut arg = ioctl::GemClose { handle, pad: 0 };
        self.ioctl(ioctl::GEM_CLOSE, &mut arg)
            .map_err(|e| KryptonError::device("gem close", e))
    }
}

/// Raw DRM ioctl plumbing not covered by the `drm` crate
mod ioctl {
    use std::mem::size_of;

    const IOC_NRSHIFT: u64 = 0;
    const IOC_TYPESHIFT: u64 = 8;
    const IOC_SIZESHIFT: u64 = 16;
    const IOC_DIRSHIFT: u64 = 30;

    const IOC_WRITE: u64 = 1;
    const IOC_READ: u64 = 2;

    const DRM_IOCTL_BASE: u64 = 0x64; // 'd'

    const fn drm_iowr(nr: u64, size: usize) -> libc::c_ulong {
        (((IOC_READ | IOC_WRITE) << IOC_DIRSHIFT)
            | (DRM_IOCTL_BASE << IOC_TYPESHIFT)
            | ((size as u64) << IOC_SIZESHIFT)
            | (nr << IOC_NRSHIFT)) as libc::c_ulong
    }

    const fn drm_iow(nr: u64, size: usize) -> libc::c_ulong {
        ((IOC_WRITE << IOC_DIRSHIFT)
            | (DRM_IOCTL_BASE << IOC_TYPESHIFT)
            | ((size as u64) << IOC_SIZESHIFT)
            | (nr << IOC_NRSHIFT)) as libc::c_ulong
    }

    pub const SEQUENCE_RELATIVE: u32 = 0x0000_0001;
    pub const SEQUENCE_NEXT_ON_MISS: u32 = 0x0000_0002;

    pub const EVENT_CRTC_SEQUENCE: u32 = 0x03;

    #[repr(C)]
    #[derive(Default)]
    pub struct CrtcGetSequence {
        pub crtc_id: u32,
        pub active: u32,
        pub sequence: u64,
        pub sequence_ns: i64,
    }

    #[repr(C)]
    #[derive(Default)]
    pub struct CrtcQueueSequence {
        pub crtc_id: u32,
        pub flags: u32,
        pub sequence: u64,
        pub user_data: u64,
    }

    #[repr(C)]
    #[derive(Default)]
    pub struct FbCmd2 {
        pub fb_id: u32,
        pub width: u32,
        pub height: u32,
        pub pixel_format: u32,
        pub flags: u32,
        pub handles: [u32; 4],
        pub pitches: [u32; 4],
        pub offsets: [u32; 4],
        pub modifier: [u64; 4],
    }

    #[repr(C)]
    #[derive(Default)]
    pub struct GemClose {
        pub handle: u32,
        pub pad: u32,
    }

    #[repr(C)]
    pub struct PrimeHandle {
        pub handle: u32,
        pub flags: u32,
        pub fd: i32,
    }

    #[repr(C)]
    pub struct EventHeader {
        pub kind: u32,
        pub length: u32,
    }

    #[repr(C)]
    pub struct CrtcSequenceEvent {
        pub base: EventHeader,
        pub user_data: u64,
        pub time_ns: i64,
        pub sequence: u64,
    }

    pub const CRTC_GET_SEQUENCE: libc::c_ulong = drm_iowr(0x3b, size_of::<CrtcGetSequence>());
    pub const CRTC_QUEUE_SEQUENCE: libc::c_ulong = drm_iowr(0x3c, size_of::<CrtcQueueSequence>());
    pub const MODE_GETFB2: libc::c_ulong = drm_iowr(0xce, size_of::<FbCmd2>());
    pub const GEM_CLOSE: libc::c_ulong = drm_iow(0x09, size_of::<GemClose>());
    pub const PRIME_HANDLE_TO_FD: libc::c_ulong = drm_iowr(0x2d, size_of::<PrimeHandle>());

}
