// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Composes the outbound request body.
//!
//! A body carries either a ping plus an update check, or a single event
//! report.  All device-supplied text is escaped through `xml_codec` on its
//! way into the document, and the document layout (attribute order,
//! indentation) is fixed so the service-side logs stay diffable.

use crate::protocol::request::{Event, EventResult, Ping};
use crate::protocol::PROTOCOL_VERSION;
use crate::request_params::RequestParams;
use crate::storage::{Storage, PREVIOUS_VERSION_KEY};
use crate::xml_codec::encode;
use log::error;


/// Builder for one request body.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    params: &'a RequestParams,
    ping: Ping,
    event: Option<Event>,
    ping_only: bool,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(params: &'a RequestParams) -> Self {
        RequestBuilder { params, ping: Ping::default(), event: None, ping_only: false }
    }

    /// Attach an event report; the built body carries it in place of the
    /// ping and update check.
    pub fn event(mut self, event: Event) -> Self {
        self.event = Some(event);
        self
    }

    /// Mark this request as a pure telemetry ping.  The body keeps its ping
    /// but drops the update-check element and the previous-version report.
    pub fn ping_only(mut self, ping_only: bool) -> Self {
        self.ping_only = ping_only;
        self
    }

    /// Assemble the UTF-8 body.
    ///
    /// A non-event, non-ping-only build reads the previously persisted
    /// application version into the `previousversion` attribute and then
    /// records the current version for the next request.  Storage trouble
    /// downgrades to an empty previous version.
    pub async fn build(self, storage: &mut impl Storage) -> String {
        let body = match &self.event {
            Some(event) => Self::event_xml(event),
            None => {
                let mut body = self.ping_xml();
                if !self.ping_only {
                    body.push_str(&self.updatecheck_xml());
                }
                body
            }
        };

        let previous_version = if self.event.is_none() && !self.ping_only {
            let previous = storage.get_string(PREVIOUS_VERSION_KEY).await.unwrap_or_default();
            if let Err(e) =
                storage.set_string(PREVIOUS_VERSION_KEY, &self.params.app_version).await
            {
                error!("unable to persist previous version: {}", e);
            }
            Some(previous)
        } else {
            None
        };

        self.request_xml(&self.app_xml(previous_version.as_deref(), &body))
    }

    fn ping_xml(&self) -> String {
        let mut attributes = String::from("active=\"1\"");
        if let Some(days) = self.ping.days_since_active {
            attributes.push_str(&format!(" a=\"{}\"", days));
        }
        if let Some(days) = self.ping.days_since_roll_call {
            attributes.push_str(&format!(" r=\"{}\"", days));
        }
        format!("        <ping {}></ping>\n", attributes)
    }

    fn updatecheck_xml(&self) -> String {
        format!(
            "        <updatecheck targetversionprefix=\"{}\"></updatecheck>\n",
            encode(&self.params.target_version_prefix),
        )
    }

    fn event_xml(event: &Event) -> String {
        // The error code is optional on the wire; it rides along only when
        // the result is not a success.
        let error_code = match event.result {
            EventResult::Success | EventResult::SuccessReboot => String::new(),
            EventResult::Error => format!(" errorcode=\"{}\"", event.error_code),
        };
        format!(
            "        <event eventtype=\"{}\" eventresult=\"{}\"{}></event>\n",
            event.event_type as i32, event.result as i32, error_code,
        )
    }

    fn app_xml(&self, previous_version: Option<&str>, body: &str) -> String {
        let params = self.params;
        let previous = match previous_version {
            Some(version) => format!("previousversion=\"{}\" ", encode(version)),
            None => String::new(),
        };
        format!(
            "    <app appid=\"{}\" version=\"{}\" track=\"{}\" board=\"{}\" {}lang=\"{}\" delta_okay=\"{}\">\n{}    </app>\n",
            encode(&params.app_id),
            encode(&params.app_version),
            encode(&params.track),
            encode(&params.board),
            previous,
            encode(&params.app_lang),
            if params.delta_okay { "true" } else { "false" },
            body,
        )
    }

    fn request_xml(&self, app: &str) -> String {
        let params = self.params;
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <request protocol=\"{}\" platform=\"{}\" osversion=\"{}\" sp=\"{}\" \
             hardware_class=\"{}\" bootid=\"{}\" installsource=\"{}\">\n\
             {}</request>\n",
            PROTOCOL_VERSION,
            encode(&params.os_platform),
            encode(&params.os_version),
            encode(&params.os_service_pack),
            encode(&params.hardware_class),
            encode(&params.boot_id),
            params.install_source().as_str(),
            app,
        )
    }
}
