//! Mock infrastructure for testing
//!
//! Provides an in-memory [`KmsDevice`] with scripted events, call counters,
//! and open-reference accounting, plus a frame-recording sink.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::os::fd::OwnedFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use krypton_core::device::KmsDevice;
use krypton_core::error::{KryptonError, Result};
use krypton_core::sink::{FrameSink, SharedFrame};
use krypton_core::types::{
    ConnectorId, ConnectorInfo, CrtcId, EncoderId, FbId, PlaneId, PlaneLayout, PlaneState,
    SequenceEvent, SurfaceInfo, FOURCC_XRGB8888,
};

/// Per-method call counters
#[derive(Default, Debug)]
pub struct Counters {
    pub crtc_sequence: Cell<u64>,
    pub queue_sequence: Cell<u64>,
    pub wait_events: Cell<u64>,
    pub plane_state: Cell<u64>,
    pub plane_states: Cell<u64>,
    pub framebuffer: Cell<u64>,
    pub export_buffer: Cell<u64>,
    pub release_buffer: Cell<u64>,
}

/// Scriptable in-memory display device
#[derive(Default, Debug)]
pub struct MockDevice {
    crtcs: Vec<CrtcId>,
    connectors: Vec<ConnectorInfo>,
    encoder_map: HashMap<u32, u32>,
    sequences: RefCell<HashMap<u32, (u64, u64)>>,
    planes: RefCell<Vec<PlaneState>>,
    framebuffers: RefCell<HashMap<u32, SurfaceInfo>>,
    crtc_fbs: RefCell<HashMap<u32, u32>>,
    events: RefCell<VecDeque<Vec<SequenceEvent>>>,
    /// GEM handle references handed out minus references released
    open_refs: Cell<i64>,
    /// When set, every export attempt fails like an unprivileged process
    pub deny_exports: Cell<bool>,
    /// Raised when the event script runs dry, to stop a pipeline under test
    stop_when_idle: RefCell<Option<Arc<AtomicBool>>>,
    /// Raise the stop flag after this many exports (0 = never)
    pub stop_after_exports: Cell<u64>,
    pub counters: Counters,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crtcs(ids: &[u32]) -> Self {
        let mut mock = Self::new();
        for &id in ids {
            mock.crtcs.push(CrtcId::new(id));
        }
        mock
    }

    pub fn add_connector(
        &mut self,
        id: u32,
        interface: &str,
        instance: u32,
        connected: bool,
        encoder: Option<u32>,
    ) {
        self.connectors.push(ConnectorInfo {
            connector: ConnectorId::new(id),
            interface: interface.to_string(),
            instance,
            connected,
            encoder: encoder.map(EncoderId::new),
            preferred_mode: None,
        });
    }

    pub fn link_encoder(&mut self, encoder: u32, crtc: u32) {
        self.encoder_map.insert(encoder, crtc);
    }

    pub fn set_sequence(&self, crtc: u32, seq: u64, ns: u64) {
        self.sequences.borrow_mut().insert(crtc, (seq, ns));
    }

    pub fn push_events(&self, batch: Vec<SequenceEvent>) {
        self.events.borrow_mut().push_back(batch);
    }

    pub fn add_plane(&self, plane: u32, crtc: Option<u32>, fb: Option<u32>) {
        self.planes.borrow_mut().push(PlaneState {
            plane: PlaneId::new(plane),
            crtc: crtc.map(CrtcId::new),
            framebuffer: fb.map(FbId::new),
        });
    }

    pub fn set_plane_framebuffer(&self, plane: u32, fb: Option<u32>) {
        let mut planes = self.planes.borrow_mut();
        if let Some(state) = planes.iter_mut().find(|p| p.plane == PlaneId::new(plane)) {
            state.framebuffer = fb.map(FbId::new);
        }
    }

    pub fn add_framebuffer(&self, fb: u32, surface: SurfaceInfo) {
        self.framebuffers.borrow_mut().insert(fb, surface);
    }

    pub fn remove_framebuffer(&self, fb: u32) {
        self.framebuffers.borrow_mut().remove(&fb);
    }

    pub fn set_crtc_framebuffer(&self, crtc: u32, fb: u32) {
        self.crtc_fbs.borrow_mut().insert(crtc, fb);
    }

    pub fn stop_when_idle(&self, flag: Arc<AtomicBool>) {
        *self.stop_when_idle.borrow_mut() = Some(flag);
    }

    /// Outstanding GEM handle references
    pub fn open_refs(&self) -> i64 {
        self.open_refs.get()
    }

    fn raise_stop(&self) {
        if let Some(flag) = self.stop_when_idle.borrow().as_ref() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

/// Build a surface descriptor with the given memory handles
pub fn surface(width: u32, height: u32, handles: &[u32]) -> SurfaceInfo {
    let mut planes = [PlaneLayout::default(); 4];
    for (i, &handle) in handles.iter().take(4).enumerate() {
        planes[i] = PlaneLayout {
            pitch: width * 4,
            offset: 0,
            handle,
        };
    }
    SurfaceInfo {
        width,
        height,
        fourcc: FOURCC_XRGB8888,
        modifier: 0,
        planes,
    }
}

fn os_err(code: i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(code)
}

impl KmsDevice for MockDevice {
    fn crtcs(&self) -> Result<Vec<CrtcId>> {
        Ok(self.crtcs.clone())
    }

    fn connectors(&self) -> Result<Vec<ConnectorInfo>> {
        Ok(self.connectors.clone())
    }

    fn encoder_crtc(&self, encoder: EncoderId) -> Result<Option<CrtcId>> {
        Ok(self.encoder_map.get(&encoder.raw()).map(|&c| CrtcId::new(c)))
    }

    fn crtc_sequence(&self, crtc: CrtcId) -> Result<Option<(u64, u64)>> {
        self.counters
            .crtc_sequence
            .set(self.counters.crtc_sequence.get() + 1);
        Ok(self.sequences.borrow().get(&crtc.raw()).copied())
    }

    fn queue_sequence(&self, crtc: CrtcId) -> Result<bool> {
        self.counters
            .queue_sequence
            .set(self.counters.queue_sequence.get() + 1);
        Ok(self.sequences.borrow().contains_key(&crtc.raw()))
    }

    fn wait_events(&self) -> Result<Vec<SequenceEvent>> {
        self.counters
            .wait_events
            .set(self.counters.wait_events.get() + 1);
        match self.events.borrow_mut().pop_front() {
            Some(batch) => Ok(batch),
            None => {
                self.raise_stop();
                Ok(Vec::new())
            }
        }
    }

    fn plane_states(&self) -> Result<Vec<PlaneState>> {
        self.counters
            .plane_states
            .set(self.counters.plane_states.get() + 1);
        Ok(self.planes.borrow().clone())
    }

    fn plane_state(&self, plane: PlaneId) -> Result<PlaneState> {
        self.counters
            .plane_state
            .set(self.counters.plane_state.get() + 1);
        self.planes
            .borrow()
            .iter()
            .find(|p| p.plane == plane)
            .copied()
            .ok_or_else(|| KryptonError::device("get plane", os_err(libc::ENOENT)))
    }

    fn crtc_framebuffer(&self, crtc: CrtcId) -> Result<Option<FbId>> {
        Ok(self.crtc_fbs.borrow().get(&crtc.raw()).map(|&f| FbId::new(f)))
    }

    fn framebuffer(&self, fb: FbId) -> Result<Option<SurfaceInfo>> {
        self.counters
            .framebuffer
            .set(self.counters.framebuffer.get() + 1);
        let Some(surface) = self.framebuffers.borrow().get(&fb.raw()).copied() else {
            return Ok(None);
        };
        // The fetch hands out one reference per distinct memory handle.
        let mut seen = [0u32; 4];
        let mut n = 0;
        for plane in &surface.planes {
            if plane.handle != 0 && !seen[..n].contains(&plane.handle) {
                seen[n] = plane.handle;
                n += 1;
            }
        }
        self.open_refs.set(self.open_refs.get() + n as i64);
        Ok(Some(surface))
    }

    fn export_buffer(&self, _handle: u32) -> Result<OwnedFd> {
        self.counters
            .export_buffer
            .set(self.counters.export_buffer.get() + 1);
        let threshold = self.stop_after_exports.get();
        if threshold > 0 && self.counters.export_buffer.get() >= threshold {
            self.raise_stop();
        }
        if self.deny_exports.get() {
            return Err(KryptonError::device("prime export", os_err(libc::EACCES)));
        }
        let file = File::open("/dev/null").map_err(KryptonError::Io)?;
        Ok(file.into())
    }

    fn release_buffer(&self, _handle: u32) -> Result<()> {
        self.counters
            .release_buffer
            .set(self.counters.release_buffer.get() + 1);
        self.open_refs.set(self.open_refs.get() - 1);
        Ok(())
    }
}

/// Frame metadata recorded by [`CollectingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedFrame {
    pub crtc: CrtcId,
    pub width: u32,
    pub height: u32,
    pub plane_count: usize,
    pub exported: usize,
    pub sequence: Option<u64>,
}

/// Sink that records frame metadata for assertions
#[derive(Default, Debug)]
pub struct CollectingSink {
    pub frames: Vec<RecordedFrame>,
    pub started: u64,
    pub stopped: u64,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for CollectingSink {
    fn start(&mut self) -> Result<()> {
        self.started += 1;
        Ok(())
    }

    fn push_frame(&mut self, frame: &SharedFrame<'_>) -> Result<()> {
        self.frames.push(RecordedFrame {
            crtc: frame.crtc,
            width: frame.width,
            height: frame.height,
            plane_count: frame.plane_count,
            exported: frame.fds.iter().filter(|fd| fd.is_some()).count(),
            sequence: frame.tick.map(|t| t.sequence),
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped += 1;
        Ok(())
    }
}
