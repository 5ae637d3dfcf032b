// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanfold-capture: turning the host's scanning service into tracked pages.
//
// Enumerates acquisition methods, acquires one page at a time through the
// chosen method (native command, automation trigger or manual drop-folder
// handoff), and keeps the ordered pages of a session in its scratch folder.

pub mod acquire;
pub mod diagnostics;
pub mod discovery;
pub mod handoff;
pub mod locate;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use acquire::{AcquireEvent, PageAcquirer};
pub use diagnostics::{CheckResult, CheckStatus, SetupReport, run_setup_check};
pub use discovery::{DeviceEnumerator, DeviceList};
pub use handoff::{ManualHandoff, Sleeper, TokioSleeper};
pub use session::{ClearOutcome, ScanSession};
