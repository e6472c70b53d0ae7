// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This crate implements the update-check request engine of an OS
//! auto-update client: it composes the outbound query that describes the
//! device to the update service, parses the service's verdict, and decides
//! whether an offered payload is surfaced to the install pipeline now,
//! deferred for rollout scattering, or dropped per device policy.
//!
//! The engine is transport- and platform-agnostic.  HTTP, durable
//! preferences, wall-clock time, and randomness all enter through the
//! `HttpRequest`, `Storage`, and `TimeSource` traits (plus an injected
//! `rand::Rng`), so a host binary or a test supplies its own collaborators
//! and no global state is involved.

pub mod http_request;
pub mod policy;
pub mod protocol;
pub mod request_action;
pub mod request_builder;
pub mod request_params;
pub mod storage;
pub mod time;
pub mod xml_codec;
