// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Types for the subset of the Omaha 3.0 protocol spoken on the update
//! wire.  The request side is assembled by `request_builder`; the response
//! side is produced by the parser in `response`.

pub mod request;
pub mod response;

/// The protocol version this engine speaks.
pub const PROTOCOL_VERSION: &str = "3.0";
