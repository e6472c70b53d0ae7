// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The update-check request action: one composed request, one reply, one
//! outcome.
//!
//! The action is a two-state machine.  It is constructed with its
//! collaborators (parameters, transport, clock, randomness), `perform`ed
//! once, and resolves to exactly one outcome: an admitted offer, a
//! no-update result, or a classified error/deferral.  Cross-request state
//! lives only in the injected `Storage`.

use crate::http_request::HttpRequest;
use crate::policy::{check_admission, Admission};
use crate::protocol::request::Event;
use crate::protocol::response::{self, OfferedUpdate, ResponseParseError, UpdateCheck};
use crate::request_builder::RequestBuilder;
use crate::request_params::RequestParams;
use crate::storage::Storage;
use crate::time::{StandardTimeSource, TimeSource};
use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use hyper::{Body, Request};
use log::{error, info, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use thiserror::Error;

/// Numeric base under which transport failures are reported; the clamped
/// HTTP status is added to it.
pub const HTTP_RESPONSE_BASE: i32 = 2000;

/// Terminal classification of a failed or withheld request.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum OmahaRequestError {
    /// The service returned a zero-byte body.
    #[error("service returned an empty response")]
    EmptyResponse,

    /// The reply was not well-formed XML.
    #[error("response is not well-formed XML")]
    XmlParse,

    /// The reply was well-formed but not a valid update response.
    #[error("response is structurally invalid")]
    ResponseInvalid,

    /// The transport reported failure; carries the HTTP status, or 0 when
    /// the transfer produced none.
    #[error("HTTP request failed with status {0}")]
    HttpResponse(u16),

    /// Device policy has updates disabled.
    #[error("update ignored per device policy")]
    UpdateIgnoredPerPolicy,

    /// The scatter policy is holding the offer back; the outer loop will
    /// check again later.
    #[error("update deferred per scatter policy")]
    UpdateDeferredPerPolicy,

    /// The request was terminated from outside.
    #[error("request cancelled")]
    Cancelled,

    /// Reserved.
    #[error("unknown error")]
    Unknown,
}

impl OmahaRequestError {
    /// Stable numeric code for reporting into the wider engine's code
    /// space.  Transport failures encode as `HTTP_RESPONSE_BASE` plus the
    /// status clamped into `[0, 999]`.
    pub fn code(&self) -> i32 {
        match self {
            OmahaRequestError::Unknown => 1,
            OmahaRequestError::Cancelled => 2,
            OmahaRequestError::EmptyResponse => 30,
            OmahaRequestError::XmlParse => 31,
            OmahaRequestError::ResponseInvalid => 34,
            OmahaRequestError::UpdateIgnoredPerPolicy => 35,
            OmahaRequestError::UpdateDeferredPerPolicy => 36,
            OmahaRequestError::HttpResponse(status) => {
                HTTP_RESPONSE_BASE + i32::from(clamp_http_code(*status))
            }
        }
    }
}

impl From<ResponseParseError> for OmahaRequestError {
    fn from(e: ResponseParseError) -> Self {
        match e {
            ResponseParseError::EmptyResponse => OmahaRequestError::EmptyResponse,
            ResponseParseError::XmlParse(_) => OmahaRequestError::XmlParse,
            ResponseParseError::Invalid => OmahaRequestError::ResponseInvalid,
        }
    }
}

/// Clamp a transport status into the reportable range `[0, 999]`.
pub fn clamp_http_code(status: u16) -> u16 {
    if status > 999 {
        999
    } else {
        status
    }
}

/// What the action hands downstream on success.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UpdateCheckOutcome {
    /// True when a new payload is offered and admitted.
    pub update_exists: bool,

    /// The admitted offer; present exactly when `update_exists` is true.
    pub offer: Option<OfferedUpdate>,

    /// Daystart info from the service, for ping bookkeeping by the outer
    /// loop.
    pub elapsed_seconds: Option<i64>,
}

/// A single update-check (or event) request against the update service.
pub struct OmahaRequestAction<H, T, R>
where
    H: HttpRequest,
    T: TimeSource,
    R: Rng,
{
    params: RequestParams,
    event: Option<Event>,
    ping_only: bool,
    http: H,
    time_source: T,
    rng: R,
    abort_handle: AbortHandle,
    abort_registration: AbortRegistration,
}

impl<H: HttpRequest> OmahaRequestAction<H, StandardTimeSource, ThreadRng> {
    /// Create an action with the production clock and RNG.
    pub fn new(params: RequestParams, event: Option<Event>, http: H, ping_only: bool) -> Self {
        Self::new_with(params, event, http, ping_only, StandardTimeSource, rand::thread_rng())
    }
}

impl<H, T, R> OmahaRequestAction<H, T, R>
where
    H: HttpRequest,
    T: TimeSource,
    R: Rng,
{
    /// Create an action with an injected clock and RNG.
    pub fn new_with(
        params: RequestParams,
        event: Option<Event>,
        http: H,
        ping_only: bool,
        time_source: T,
        rng: R,
    ) -> Self {
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        OmahaRequestAction {
            params,
            event,
            ping_only,
            http,
            time_source,
            rng,
            abort_handle,
            abort_registration,
        }
    }

    /// True when this action reports an event instead of checking for an
    /// update.
    pub fn is_event(&self) -> bool {
        self.event.is_some()
    }

    /// A handle that terminates the in-flight request.  Aborting before the
    /// reply arrives resolves `perform` to `Cancelled` without any policy
    /// side effects; afterwards it has no effect.
    pub fn terminator(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Run the request to completion.
    pub async fn perform(
        self,
        storage: &mut impl Storage,
    ) -> Result<UpdateCheckOutcome, OmahaRequestError> {
        let OmahaRequestAction {
            params,
            event,
            ping_only,
            mut http,
            time_source,
            mut rng,
            abort_registration,
            ..
        } = self;

        let mut builder = RequestBuilder::new(&params).ping_only(ping_only);
        if let Some(event) = &event {
            builder = builder.event(event.clone());
        }
        let body = builder.build(storage).await;

        let request = match Request::post(params.update_url.as_str())
            .header("content-type", "text/xml")
            .body(Body::from(body))
        {
            Ok(request) => request,
            Err(e) => {
                error!("unable to assemble HTTP request: {}", e);
                return Err(OmahaRequestError::Unknown);
            }
        };

        let reply = match Abortable::new(http.request(request), abort_registration).await {
            Ok(reply) => reply,
            Err(Aborted) => {
                info!("request terminated before the reply arrived");
                return Err(OmahaRequestError::Cancelled);
            }
        };

        // Event reports are best effort: whatever came back, the event has
        // been handed to the transport and the pipeline moves on.  The reply
        // body is not even parsed.
        if event.is_some() {
            match &reply {
                Ok(response) if response.status().is_success() => info!("event reported"),
                Ok(response) => warn!("event report returned HTTP {}", response.status()),
                Err(e) => warn!("event report transfer failed: {}", e),
            }
            return Ok(UpdateCheckOutcome::default());
        }

        let response = match reply {
            Ok(response) => response,
            Err(e) => {
                error!("update-check transfer failed: {}", e);
                return Err(OmahaRequestError::HttpResponse(0));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(OmahaRequestError::HttpResponse(clamp_http_code(status.as_u16())));
        }

        let bytes = match hyper::body::to_bytes(response.into_body()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("unable to read response body: {}", e);
                return Err(OmahaRequestError::HttpResponse(0));
            }
        };

        let parsed = match response::parse(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("unable to parse response: {}", e);
                return Err(e.into());
            }
        };

        let elapsed_seconds = parsed.day_start.elapsed_seconds;
        let offer = match parsed.update_check {
            UpdateCheck::NoUpdate => {
                info!("no update available");
                return Ok(UpdateCheckOutcome { elapsed_seconds, ..Default::default() });
            }
            UpdateCheck::Offer(offer) => offer,
        };

        if ping_only {
            // A pure telemetry ping deliberately leaves the offer on the
            // table.
            return Ok(UpdateCheckOutcome { elapsed_seconds, ..Default::default() });
        }

        match check_admission(&params, &offer, storage, &time_source, &mut rng).await {
            Admission::Surface => {
                info!("surfacing update {}", offer.display_version);
                Ok(UpdateCheckOutcome { update_exists: true, offer: Some(offer), elapsed_seconds })
            }
            Admission::Defer => Err(OmahaRequestError::UpdateDeferredPerPolicy),
            Admission::Ignore => Err(OmahaRequestError::UpdateIgnoredPerPolicy),
        }
    }
}
