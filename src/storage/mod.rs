// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Durable key/value preferences shared across update-check requests.
//!
//! The engine itself holds no state between requests; everything that must
//! survive a process restart (the previously composed application version,
//! the scatter counter, the first-seen timestamp) goes through the `Storage`
//! trait.

use futures::future::BoxFuture;

mod memory;
pub use memory::MemStorage;

/// The application version at the last composed update check, reported to
/// the service on the next request.
pub const PREVIOUS_VERSION_KEY: &str = "previous-version";

/// The randomized number of update checks to sit out before surfacing the
/// current offer.  Decremented by the outer update loop, not by this engine.
pub const UPDATE_CHECK_COUNT_KEY: &str = "update-check-count";

/// Wall-clock time (microseconds since the unix epoch) when this device
/// first saw the currently offered update.  Written once per offer.
pub const UPDATE_FIRST_SEEN_AT_KEY: &str = "update-first-seen-at";

/// The wall-clock waiting period (seconds) in effect for the current offer,
/// recorded for the outer scheduler.  Never read back by this engine.
pub const WALL_CLOCK_WAIT_PERIOD_KEY: &str = "wall-clock-wait-period";

/// The Storage trait is the contract with the platform's durable
/// preferences store.
///
/// Implementations are expected to swallow backend errors on reads (logging
/// them) and report `None`; the engine treats missing data as first-time
/// seen.  Writes report failure so callers can degrade, but a failed write
/// must never corrupt previously stored values.
///
/// Writes do not need to be durable until `commit()` is called.
pub trait Storage {
    type Error: std::error::Error;

    /// Get a string from the backing store.  Returns `None` if there is no
    /// value for the given key, or if the stored value is not a string.
    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>>;

    /// Get an i64 from the backing store.  Returns `None` if there is no
    /// value for the given key, or if the stored value is not an i64.
    fn get_int<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<i64>>;

    /// Set a value of type String in the backing store.
    fn set_string<'a>(
        &'a mut self,
        key: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<(), Self::Error>>;

    /// Set a value of type i64 in the backing store.
    fn set_int<'a>(&'a mut self, key: &'a str, value: i64)
        -> BoxFuture<'a, Result<(), Self::Error>>;

    /// Remove the value for the given key from the backing store.
    fn remove<'a>(&'a mut self, key: &'a str) -> BoxFuture<'a, Result<(), Self::Error>>;

    /// Persist all prior writes durably.
    fn commit(&mut self) -> BoxFuture<'_, Result<(), Self::Error>>;
}
