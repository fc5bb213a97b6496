//! Output name to CRTC resolution
//!
//! Maps a user-facing output name like "DP-1" to the CRTC currently driving
//! that connector, by walking connector -> encoder -> CRTC associations.

use tracing::debug;

use crate::device::KmsDevice;
use crate::error::{KryptonError, Result};
use crate::types::CrtcId;

/// Resolve an output name to the CRTC driving it
///
/// Connectors are considered in enumeration order. A connector qualifies if
/// it is connected and, when `requested` is given, its canonical
/// `{interface}-{instance}` name matches. With no requested name the first
/// connected connector with an active CRTC wins, so capture works out of the
/// box on single-display setups.
///
/// A requested connector that is connected but not driven by any CRTC is an
/// error rather than a silent fallback to another output.
pub fn resolve_output<D: KmsDevice>(device: &D, requested: Option<&str>) -> Result<CrtcId> {
    for info in device.connectors()? {
        if !info.connected {
            continue;
        }
        if let Some(name) = requested {
            if info.name() != name {
                continue;
            }
        }

        let crtc = match info.encoder {
            Some(encoder) => device.encoder_crtc(encoder)?,
            None => None,
        };

        match crtc {
            Some(crtc) => {
                debug!("output {} driven by {}", info.name(), crtc);
                return Ok(crtc);
            }
            None if requested.is_some() => {
                return Err(KryptonError::NoMatchingOutput(format!(
                    "output '{}' is connected but not driven by any CRTC",
                    info.name()
                )));
            }
            None => {
                debug!("skipping idle connector {}", info.name());
            }
        }
    }

    Err(KryptonError::NoMatchingOutput(
        requested.unwrap_or("no connected output").to_string(),
    ))
}
