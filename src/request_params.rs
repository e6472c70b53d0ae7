// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The parameters of a single update-check request.
//!
//! A `RequestParams` is assembled by the embedder from its view of the
//! system (release channel, board, hardware class, policy switches) and is
//! immutable for the duration of one request.  The admission fields may
//! change between requests as device policy changes.

use crate::protocol::request::InstallSource;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Everything the composer and the admission policy need to know about the
/// device and this request.
#[derive(Clone, Debug, TypedBuilder)]
pub struct RequestParams {
    /// OS platform tag.
    #[builder(setter(into))]
    pub os_platform: String,

    /// OS version string.
    #[builder(setter(into))]
    pub os_version: String,

    /// OS service-pack tag.
    #[builder(setter(into))]
    pub os_service_pack: String,

    /// Board / hardware identifier.
    #[builder(setter(into))]
    pub board: String,

    /// The application id the service keys updates on.
    #[builder(setter(into))]
    pub app_id: String,

    /// The currently running application version.
    #[builder(setter(into))]
    pub app_version: String,

    /// UI locale.
    #[builder(setter(into))]
    pub app_lang: String,

    /// Release channel.
    #[builder(setter(into))]
    pub track: String,

    /// Hardware class string reported by the device.
    #[builder(setter(into))]
    pub hardware_class: String,

    /// Boot session identifier.
    #[builder(setter(into))]
    pub boot_id: String,

    /// Whether a delta payload is acceptable.
    #[builder(default)]
    pub delta_okay: bool,

    /// Whether a person is waiting on this check.
    #[builder(default)]
    pub interactive: bool,

    /// The update service URL.
    #[builder(setter(into))]
    pub update_url: String,

    /// When set, a valid offer is ignored per device policy.
    #[builder(default)]
    pub update_disabled: bool,

    /// Only offers whose version starts with this prefix are wanted; empty
    /// means any.
    #[builder(default, setter(into))]
    pub target_version_prefix: String,

    /// Enables the wall-clock axis of rollout scattering.
    #[builder(default)]
    pub wall_clock_based_wait_enabled: bool,

    /// Per-device wait before surfacing an offer, for wall-clock scattering.
    #[builder(default)]
    pub waiting_period: Duration,

    /// Enables the update-check-count axis of rollout scattering.
    #[builder(default)]
    pub update_check_count_wait_enabled: bool,

    /// Inclusive lower bound of the check-count draw.  Must not exceed
    /// `max_update_checks_allowed`.
    #[builder(default)]
    pub min_update_checks_needed: i64,

    /// Inclusive upper bound of the check-count draw.
    #[builder(default)]
    pub max_update_checks_allowed: i64,
}

impl RequestParams {
    /// The `installsource` this request reports.
    pub fn install_source(&self) -> InstallSource {
        if self.interactive {
            InstallSource::OnDemand
        } else {
            InstallSource::Scheduler
        }
    }
}
