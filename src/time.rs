// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Wall-clock plumbing for the request engine.
//!
//! The scatter policy anchors its rollout window at the wall-clock time a
//! device first saw an offer, so clock reads go through the `TimeSource`
//! trait and tests drive them deterministically.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

/// A source of wall-clock time.
pub trait TimeSource {
    /// Returns the current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// A `TimeSource` backed by the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardTimeSource;

impl TimeSource for StandardTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A mocked `TimeSource` that allows tests to control the current time.
/// Clones share the same underlying time.
#[derive(Clone, Debug)]
pub struct MockTimeSource {
    time: Rc<RefCell<SystemTime>>,
}

impl MockTimeSource {
    /// Create a new mock whose time starts at the real current time.
    pub fn new_from_now() -> Self {
        MockTimeSource { time: Rc::new(RefCell::new(SystemTime::now())) }
    }

    /// Move the mocked time forward by `duration`.
    pub fn advance(&mut self, duration: Duration) {
        *self.time.borrow_mut() += duration;
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> SystemTime {
        *self.time.borrow()
    }
}
