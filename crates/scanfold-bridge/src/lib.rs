// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host capture bridges.
//
// Defines the `CaptureHost` trait and picks the implementation for the
// operating system the binary was built for: Image Capture on macOS, SANE
// everywhere else.

mod process;

pub mod image_capture;
pub mod sane;
pub mod traits;

pub use traits::{AutomationOutcome, CaptureHost, CaptureRequest, HostDevice};

/// The capture host for the target operating system.
pub fn platform_host() -> Box<dyn CaptureHost> {
    #[cfg(target_os = "macos")]
    {
        Box::new(image_capture::ImageCaptureHost::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(sane::SaneHost::new())
    }
}
