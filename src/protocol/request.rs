// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Request-side protocol vocabulary: where a check came from, the liveness
//! ping, and the event reports sent back to the service as an update moves
//! through the install pipeline.

/// The source of an update check: the background scheduler, or a person
/// waiting on the answer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstallSource {
    /// A background check initiated by the update scheduler.
    Scheduler,
    /// A check requested on demand by the user.
    OnDemand,
}

impl InstallSource {
    /// The `installsource` attribute value for this source.
    pub fn as_str(self) -> &'static str {
        match self {
            InstallSource::Scheduler => "scheduler",
            InstallSource::OnDemand => "ondemandupdate",
        }
    }
}

impl Default for InstallSource {
    fn default() -> Self {
        InstallSource::Scheduler
    }
}

/// The liveness beacon carried in every non-event request.
///
/// This protocol version always reports the application as active.  The day
/// counts are derived from persisted day starts when the embedder tracks
/// them; they are serialized only when present.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ping {
    /// Days since the last active ping, if known.
    pub days_since_active: Option<i32>,
    /// Days since the last roll call, if known.
    pub days_since_roll_call: Option<i32>,
}

/// The type of an event report, with its wire value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventType {
    Unknown = 0,
    DownloadComplete = 1,
    InstallComplete = 2,
    UpdateComplete = 3,
    UpdateDownloadStarted = 13,
    UpdateDownloadFinished = 14,
}

/// The result reported with an event, with its wire value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventResult {
    Error = 0,
    Success = 1,
    SuccessReboot = 2,
}

/// Error code reported alongside `EventResult::Error` when nothing more
/// specific is known.
pub const EVENT_ERROR_CODE_GENERIC: i32 = 1;

/// An event report, sent in place of a ping and update check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    pub result: EventResult,
    /// Only reported on the wire when `result` is not a success.
    pub error_code: i32,
}

impl Default for Event {
    fn default() -> Self {
        Event {
            event_type: EventType::Unknown,
            result: EventResult::Error,
            error_code: EVENT_ERROR_CODE_GENERIC,
        }
    }
}

impl Event {
    /// An event reporting success.
    pub fn success(event_type: EventType) -> Self {
        Event { event_type, result: EventResult::Success, error_code: 0 }
    }

    /// An event reporting an error with the given code.
    pub fn error(event_type: EventType, error_code: i32) -> Self {
        Event { event_type, result: EventResult::Error, error_code }
    }
}
