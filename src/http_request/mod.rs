// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The HTTP contract between the request engine and the embedder's
//! transport.  One POST goes out, one reply comes back; connection
//! management, TLS, and timeouts all belong to the implementation.

use futures::future::BoxFuture;
use hyper::{Body, Request, Response};
use thiserror::Error;

#[cfg(test)]
pub mod mock;

/// Transport-level failure: anything that did not produce an HTTP status.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport failed: {0}")]
    Transport(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Http(#[from] http::Error),
}

pub trait HttpRequest {
    /// Send `req` and resolve to its reply, or to a transport error.
    fn request(&mut self, req: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, Error>>;
}
