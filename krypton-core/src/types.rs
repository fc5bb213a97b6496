//! Core types for Krypton
//!
//! These types represent the kernel-side objects the acquisition pipeline
//! tracks: mode-setting resources, scan-out surface descriptors, and refresh
//! sequence events.

/// XRGB8888 fourcc ('XR24'), the packed 32-bit format handed to sinks
pub const FOURCC_XRGB8888: u32 = 0x3432_5258;

macro_rules! resource_id {
    ($(#[$attr:meta])* $name:ident, $prefix:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw kernel object id
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw kernel object id
            pub fn raw(&self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

resource_id!(
    /// Display controller (CRTC) id
    CrtcId,
    "crtc"
);
resource_id!(
    /// Connector id (physical or logical output port)
    ConnectorId,
    "connector"
);
resource_id!(
    /// Encoder id
    EncoderId,
    "encoder"
);
resource_id!(
    /// Hardware plane id (primary, overlay, or cursor)
    PlaneId,
    "plane"
);
resource_id!(
    /// Framebuffer id
    FbId,
    "fb"
);

/// A refresh-completion event delivered for one CRTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceEvent {
    /// CRTC the event belongs to
    pub crtc: CrtcId,
    /// Hardware sequence counter at completion
    pub sequence: u64,
    /// Completion timestamp in nanoseconds
    pub timestamp_ns: u64,
}

/// Current binding of a hardware plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneState {
    /// The plane itself
    pub plane: PlaneId,
    /// CRTC the plane is currently bound to, if any
    pub crtc: Option<CrtcId>,
    /// Framebuffer currently scanned out from this plane, if any
    pub framebuffer: Option<FbId>,
}

/// Display mode geometry for listing purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    /// Vertical refresh in Hz
    pub refresh: u32,
}

/// One enumerated connector with its associations
#[derive(Debug, Clone)]
pub struct ConnectorInfo {
    /// Connector id
    pub connector: ConnectorId,
    /// Connector type name (e.g. "DP", "HDMI-A")
    pub interface: String,
    /// Instance index within the connector type
    pub instance: u32,
    /// Whether a display is attached
    pub connected: bool,
    /// Active encoder, if the connector is being driven
    pub encoder: Option<EncoderId>,
    /// Preferred mode, for display listings
    pub preferred_mode: Option<DisplayMode>,
}

impl ConnectorInfo {
    /// Canonical output name: `{interface}-{instance}`, e.g. "DP-1"
    pub fn name(&self) -> String {
        format!("{}-{}", self.interface, self.instance)
    }
}

/// Per-plane memory layout within a framebuffer descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Row pitch in bytes
    pub pitch: u32,
    /// Byte offset into the backing memory
    pub offset: u32,
    /// GEM memory handle, 0 if the plane slot is unused
    pub handle: u32,
}

/// Extended framebuffer descriptor for a resolved scan-out surface
///
/// Fetched fresh for every frame and owned by that iteration. The fourcc is
/// whatever the kernel reported; sinks receive [`FOURCC_XRGB8888`] since the
/// hand-off format is fixed to packed 32-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    /// Pixel format fourcc as reported by the kernel
    pub fourcc: u32,
    /// Buffer layout modifier, opaque
    pub modifier: u64,
    /// Up to four memory planes; unused slots have handle == 0
    pub planes: [PlaneLayout; 4],
}

impl SurfaceInfo {
    /// Number of populated planes: the index of the first zero handle
    ///
    /// Plane slots are contiguous; the kernel never reports a sparse set.
    pub fn plane_count(&self) -> usize {
        self.planes
            .iter()
            .position(|p| p.handle == 0)
            .unwrap_or(self.planes.len())
    }

    /// Per-plane pitches in slot order
    pub fn pitches(&self) -> [u32; 4] {
        [
            self.planes[0].pitch,
            self.planes[1].pitch,
            self.planes[2].pitch,
            self.planes[3].pitch,
        ]
    }

    /// Per-plane byte offsets in slot order
    pub fn offsets(&self) -> [u32; 4] {
        [
            self.planes[0].offset,
            self.planes[1].offset,
            self.planes[2].offset,
            self.planes[3].offset,
        ]
    }
}

/// One observed frame boundary on a monitored CRTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    /// CRTC that completed a refresh
    pub crtc: CrtcId,
    /// Sequence counter at completion
    pub sequence: u64,
    /// Completion timestamp in nanoseconds
    pub timestamp_ns: u64,
    /// Sequence delta since the previous observation
    pub delta_sequence: u64,
    /// Timestamp delta since the previous observation
    pub delta_ns: u64,
}
