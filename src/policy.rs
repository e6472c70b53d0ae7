// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Admission and scatter policy for valid update offers.
//!
//! Even a valid offer may be held back so that a fleet of identical devices
//! spreads its adoption of a rollout.  Two axes are used: a wall-clock
//! window anchored at the first time this device saw the offer, and a
//! randomized count of update checks that must elapse.  The counter is
//! decremented by the outer update loop, not here.
//!
//! Both axes persist state across restarts through `Storage`.  Storage
//! misbehavior never stalls a device: a value that cannot be read or written
//! degrades toward surfacing the offer.

use crate::protocol::response::OfferedUpdate;
use crate::request_params::RequestParams;
use crate::storage::{
    Storage, UPDATE_CHECK_COUNT_KEY, UPDATE_FIRST_SEEN_AT_KEY, WALL_CLOCK_WAIT_PERIOD_KEY,
};
use crate::time::TimeSource;
use log::{info, warn};
use rand::Rng;
use std::cmp::min;
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// The rollout anchor is persisted as whole microseconds after the unix
/// epoch.  A clock sitting before the epoch stores zero, and a negative
/// stored value reads back as the epoch itself, so a bad clock can only
/// shorten the wait, never wedge the device.
fn to_stored_micros(time: SystemTime) -> i64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(since_epoch) => since_epoch.as_micros() as i64,
        Err(_) => 0,
    }
}

fn from_stored_micros(micros: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_micros(micros.max(0) as u64)
}

/// The verdict on a valid offer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    /// Hand the offer to the next stage now.
    Surface,
    /// Hold the offer back; the outer loop will check again later.
    Defer,
    /// Device policy forbids updating; drop the offer.
    Ignore,
}

/// Decide whether `offer` is surfaced on this check.
pub async fn check_admission<S, T, R>(
    params: &RequestParams,
    offer: &OfferedUpdate,
    storage: &mut S,
    time_source: &T,
    rng: &mut R,
) -> Admission
where
    S: Storage,
    T: TimeSource,
    R: Rng,
{
    if params.update_disabled {
        return Admission::Ignore;
    }
    if !params.wall_clock_based_wait_enabled {
        return Admission::Surface;
    }
    if !offer.deadline.is_empty() {
        // A deadline marks a mandatory update; those are never scattered.
        info!("not scattering: offer carries deadline {}", offer.deadline);
        return Admission::Surface;
    }
    if offer.max_days_to_scatter <= 0 {
        info!("not scattering: offer sets no scatter window");
        return Admission::Surface;
    }

    match wall_clock_wait(params, offer, storage, time_source).await {
        WallClockWait::NotSatisfied => Admission::Defer,
        WallClockWait::SatisfiedCheckCountPending => check_count_wait(params, storage, rng).await,
        WallClockWait::Satisfied => Admission::Surface,
    }
}

enum WallClockWait {
    NotSatisfied,
    SatisfiedCheckCountPending,
    Satisfied,
}

async fn wall_clock_wait<S, T>(
    params: &RequestParams,
    offer: &OfferedUpdate,
    storage: &mut S,
    time_source: &T,
) -> WallClockWait
where
    S: Storage,
    T: TimeSource,
{
    let now = time_source.now();
    let first_seen = match storage.get_int(UPDATE_FIRST_SEEN_AT_KEY).await {
        Some(micros) => from_stored_micros(micros),
        None => {
            // First sighting of this offer; anchor the rollout clock here.
            if let Err(e) = storage.set_int(UPDATE_FIRST_SEEN_AT_KEY, to_stored_micros(now)).await {
                warn!("unable to persist first-seen timestamp: {}", e);
                return WallClockWait::Satisfied;
            }
            if let Err(e) = storage
                .set_int(WALL_CLOCK_WAIT_PERIOD_KEY, params.waiting_period.as_secs() as i64)
                .await
            {
                warn!("unable to persist waiting period: {}", e);
            }
            now
        }
    };

    let waited = now.duration_since(first_seen).unwrap_or_default();
    let scatter_limit = min(
        params.waiting_period,
        Duration::from_secs(offer.max_days_to_scatter as u64 * SECONDS_PER_DAY),
    );
    info!("waited {:?} of an effective scatter window of {:?}", waited, scatter_limit);
    if waited < scatter_limit {
        return WallClockWait::NotSatisfied;
    }
    if params.update_check_count_wait_enabled {
        WallClockWait::SatisfiedCheckCountPending
    } else {
        WallClockWait::Satisfied
    }
}

async fn check_count_wait<S, R>(params: &RequestParams, storage: &mut S, rng: &mut R) -> Admission
where
    S: Storage,
    R: Rng,
{
    let count = match storage.get_int(UPDATE_CHECK_COUNT_KEY).await {
        Some(count) => count,
        None => {
            let drawn = rng
                .gen_range(params.min_update_checks_needed..=params.max_update_checks_allowed);
            info!("sitting out {} update checks before surfacing", drawn);
            if let Err(e) = storage.set_int(UPDATE_CHECK_COUNT_KEY, drawn).await {
                warn!("unable to persist update check count: {}", e);
                return Admission::Surface;
            }
            drawn
        }
    };

    if count == 0 {
        return Admission::Surface;
    }
    if count < 0 || count > params.max_update_checks_allowed {
        // A corrupt value must not stall the device.
        warn!("persisted update check count {} out of range", count);
        return Admission::Surface;
    }
    // The outer update loop decrements the counter once per check.
    Admission::Defer
}
