//! Integration tests for the acquisition pipeline

mod mocks;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use krypton_core::error::KryptonError;
use krypton_core::types::{CrtcId, SequenceEvent};
use krypton_core::{CaptureConfig, CapturePipeline, PlaceholderFilter, Schedule};
use mocks::{surface, CollectingSink, MockDevice};

fn event(crtc: u32, sequence: u64, timestamp_ns: u64) -> SequenceEvent {
    SequenceEvent {
        crtc: CrtcId::new(crtc),
        sequence,
        timestamp_ns,
    }
}

fn config() -> CaptureConfig {
    CaptureConfig {
        device: PathBuf::from("/dev/dri/card0"),
        output: None,
        schedule: Schedule::Event,
        placeholder: PlaceholderFilter::default(),
    }
}

#[test]
fn event_mode_hands_off_one_frame_per_tick() {
    let mock = MockDevice::with_crtcs(&[1]);
    mock.set_sequence(1, 99, 983_334);
    mock.add_plane(10, Some(1), Some(100));
    mock.add_framebuffer(100, surface(1920, 1080, &[5]));
    mock.push_events(vec![event(1, 100, 1_000_000)]);
    mock.push_events(vec![event(1, 101, 1_016_666)]);

    let stop = Arc::new(AtomicBool::new(false));
    mock.stop_when_idle(stop.clone());

    let mut pipeline = CapturePipeline::new(&mock, &config(), CollectingSink::new()).unwrap();
    pipeline.run(&stop).unwrap();

    assert_eq!(pipeline.frames(), 2);
    let sink = pipeline.sink();
    assert_eq!(sink.started, 1);
    assert_eq!(sink.stopped, 1);
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(sink.frames[0].width, 1920);
    assert_eq!(sink.frames[0].plane_count, 1);
    assert_eq!(sink.frames[0].sequence, Some(100));
    assert_eq!(sink.frames[1].sequence, Some(101));

    // No open references survive between frames, let alone the session.
    assert_eq!(mock.open_refs(), 0);
}

#[test]
fn missing_surface_skips_the_cycle() {
    let mock = MockDevice::with_crtcs(&[1]);
    mock.set_sequence(1, 99, 983_334);
    mock.push_events(vec![event(1, 100, 1_000_000)]);

    let stop = Arc::new(AtomicBool::new(false));
    mock.stop_when_idle(stop.clone());

    let mut pipeline = CapturePipeline::new(&mock, &config(), CollectingSink::new()).unwrap();
    pipeline.run(&stop).unwrap();

    assert_eq!(pipeline.frames(), 0);
    assert_eq!(pipeline.skipped(), 1);
}

#[test]
fn pinned_output_bypasses_plane_resolution() {
    let mut mock = MockDevice::with_crtcs(&[1]);
    mock.add_connector(30, "DP", 1, true, Some(11));
    mock.link_encoder(11, 1);
    mock.set_sequence(1, 99, 983_334);
    mock.set_crtc_framebuffer(1, 100);
    mock.add_framebuffer(100, surface(2560, 1440, &[5]));
    mock.push_events(vec![event(1, 100, 1_000_000)]);

    let stop = Arc::new(AtomicBool::new(false));
    mock.stop_when_idle(stop.clone());

    let mut cfg = config();
    cfg.output = Some("DP-1".to_string());
    let mut pipeline = CapturePipeline::new(&mock, &cfg, CollectingSink::new()).unwrap();
    pipeline.run(&stop).unwrap();

    assert_eq!(pipeline.frames(), 1);
    assert_eq!(pipeline.sink().frames[0].width, 2560);
    // The pinned path queries the CRTC directly; no plane traffic at all.
    assert_eq!(mock.counters.plane_states.get(), 0);
    assert_eq!(mock.counters.plane_state.get(), 0);
}

#[test]
fn poll_mode_captures_without_sequence_bookkeeping() {
    let mock = MockDevice::with_crtcs(&[1]);
    mock.add_plane(10, Some(1), Some(100));
    mock.add_framebuffer(100, surface(1920, 1080, &[5]));
    mock.stop_after_exports.set(3);

    let stop = Arc::new(AtomicBool::new(false));
    mock.stop_when_idle(stop.clone());

    let mut cfg = config();
    cfg.schedule = Schedule::Poll { fps: 1000 };
    let mut pipeline = CapturePipeline::new(&mock, &cfg, CollectingSink::new()).unwrap();
    pipeline.run(&stop).unwrap();

    assert_eq!(pipeline.frames(), 3);
    assert_eq!(mock.counters.wait_events.get(), 0);
    assert_eq!(mock.counters.queue_sequence.get(), 0);
    assert_eq!(mock.open_refs(), 0);
}

#[test]
fn denied_export_is_fatal_with_clean_teardown() {
    let mock = MockDevice::with_crtcs(&[1]);
    mock.set_sequence(1, 99, 983_334);
    mock.add_plane(10, Some(1), Some(100));
    mock.add_framebuffer(100, surface(1920, 1080, &[5]));
    mock.push_events(vec![event(1, 100, 1_000_000)]);
    mock.deny_exports.set(true);

    let stop = Arc::new(AtomicBool::new(false));
    mock.stop_when_idle(stop.clone());

    let mut pipeline = CapturePipeline::new(&mock, &config(), CollectingSink::new()).unwrap();
    let err = pipeline.run(&stop).unwrap_err();
    assert!(matches!(err, KryptonError::ExportDenied));
    assert!(err.user_hint().is_some());

    // The sink is still torn down and nothing leaks.
    assert_eq!(pipeline.sink().stopped, 1);
    assert_eq!(mock.open_refs(), 0);
}

#[test]
fn no_crtcs_at_startup_is_fatal() {
    let mock = MockDevice::new();
    let err = CapturePipeline::new(&mock, &config(), CollectingSink::new()).unwrap_err();
    assert!(matches!(err, KryptonError::NoDisplayResources));
}

#[test]
fn multi_crtc_monitoring_keeps_caches_independent() {
    let mock = MockDevice::with_crtcs(&[1, 2]);
    mock.set_sequence(1, 10, 100_000);
    mock.set_sequence(2, 20, 200_000);
    mock.add_plane(10, Some(1), Some(100));
    mock.add_plane(11, Some(2), Some(101));
    mock.add_framebuffer(100, surface(1920, 1080, &[5]));
    mock.add_framebuffer(101, surface(3840, 2160, &[6]));
    mock.push_events(vec![event(1, 11, 116_666), event(2, 21, 216_666)]);

    let stop = Arc::new(AtomicBool::new(false));
    mock.stop_when_idle(stop.clone());

    let mut pipeline = CapturePipeline::new(&mock, &config(), CollectingSink::new()).unwrap();
    pipeline.run(&stop).unwrap();

    let sink = pipeline.sink();
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(sink.frames[0].crtc, CrtcId::new(1));
    assert_eq!(sink.frames[0].width, 1920);
    assert_eq!(sink.frames[1].crtc, CrtcId::new(2));
    assert_eq!(sink.frames[1].width, 3840);
    assert_eq!(mock.open_refs(), 0);
}
