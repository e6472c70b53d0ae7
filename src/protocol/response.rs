// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Response parsing: from raw reply bytes to a typed verdict.
//!
//! The reply may be malformed, truncated, partial, or hostile, so parsing is
//! strict about document shape and lenient about optional data.  Only
//! element names and attribute values are consumed; DTDs are ignored and no
//! external entities are ever resolved.

use log::warn;
use std::collections::HashMap;
use thiserror::Error;
use xml::reader::{EventReader, XmlEvent};

/// Daystart info sent by the service, used for client-regulated counting by
/// the outer update loop.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DayStart {
    /// Seconds since the start of the service's day, if provided.
    pub elapsed_seconds: Option<i64>,
}

/// An update offered by the service.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OfferedUpdate {
    /// Version string for display purposes.
    pub display_version: String,
    /// Payload URLs in service preference order; each is a codebase joined
    /// with the package file name.  Non-empty.
    pub payload_urls: Vec<String>,
    /// URL with more information about the update; empty if none was given.
    pub more_info_url: String,
    /// SHA-256 digest of the payload, as reported by the service.
    pub hash: String,
    /// Payload size in bytes.
    pub size: i64,
    /// Whether installing requires administrator rights.
    pub needs_admin: bool,
    /// Whether the user should be prompted before applying the update.
    pub prompt: bool,
    /// Mandatory-update deadline; empty when the update is optional.
    pub deadline: String,
    /// Upper bound, in days, for scattering this rollout.  Zero disables
    /// scattering.
    pub max_days_to_scatter: i32,
}

/// The service's verdict for the app in the request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UpdateCheck {
    /// `<updatecheck status="noupdate"/>`: nothing to do.
    NoUpdate,
    /// `<updatecheck status="ok">` with a well-formed manifest.
    Offer(OfferedUpdate),
}

/// A parsed update-check response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub day_start: DayStart,
    pub update_check: UpdateCheck,
}

/// Classification of an unusable reply.
#[derive(Debug, Error)]
pub enum ResponseParseError {
    /// The reply body had zero bytes.
    #[error("response body is empty")]
    EmptyResponse,
    /// The reply was not well-formed XML.
    #[error("response is not well-formed XML: {0}")]
    XmlParse(#[from] xml::reader::Error),
    /// The reply was well-formed but is not a valid update response.
    #[error("response is well-formed but not a valid update reply")]
    Invalid,
}

/// A minimal element tree; the protocol uses only element names and
/// attribute values, and namespaces are not significant.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: HashMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Build the element tree for `bytes`.  The reader decodes entity and
/// character references into attribute values as it goes, and fails on
/// anything that is not well-formed, including unknown entities.
fn build_tree(bytes: &[u8]) -> Result<Element, ResponseParseError> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    for event in EventReader::new(bytes) {
        match event? {
            XmlEvent::StartElement { name, attributes, .. } => {
                stack.push(Element {
                    name: name.local_name,
                    attributes: attributes
                        .into_iter()
                        .map(|attribute| (attribute.name.local_name, attribute.value))
                        .collect(),
                    children: Vec::new(),
                });
            }
            XmlEvent::EndElement { .. } => match stack.pop() {
                Some(element) => match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                },
                None => return Err(ResponseParseError::Invalid),
            },
            _ => {}
        }
    }
    root.ok_or(ResponseParseError::Invalid)
}

/// Parse raw reply bytes into a [`Response`].
///
/// An empty body, malformed XML, and a structurally wrong document each get
/// their own classification; optional attributes fall back to defaults.
pub fn parse(bytes: &[u8]) -> Result<Response, ResponseParseError> {
    if bytes.is_empty() {
        return Err(ResponseParseError::EmptyResponse);
    }

    let root = build_tree(bytes)?;
    if root.name != "response" {
        warn!("reply root element is '{}', not 'response'", root.name);
        return Err(ResponseParseError::Invalid);
    }

    // Missing daystart, or an elapsed_seconds that isn't numeric, is not an
    // error; the field is advisory.
    let day_start = DayStart {
        elapsed_seconds: root
            .child("daystart")
            .and_then(|daystart| daystart.attr("elapsed_seconds"))
            .and_then(|seconds| seconds.parse::<i64>().ok()),
    };

    let app = root.child("app").ok_or(ResponseParseError::Invalid)?;
    let update_check = app.child("updatecheck").ok_or(ResponseParseError::Invalid)?;

    match update_check.attr("status") {
        Some("noupdate") => Ok(Response { day_start, update_check: UpdateCheck::NoUpdate }),
        Some("ok") => Ok(Response {
            day_start,
            update_check: UpdateCheck::Offer(parse_offer(update_check)?),
        }),
        Some(status) => {
            warn!("unknown updatecheck status: {}", status);
            Err(ResponseParseError::Invalid)
        }
        None => {
            warn!("updatecheck element carries no status");
            Err(ResponseParseError::Invalid)
        }
    }
}

fn parse_offer(update_check: &Element) -> Result<OfferedUpdate, ResponseParseError> {
    let urls = update_check.child("urls").ok_or(ResponseParseError::Invalid)?;
    let codebases: Vec<&str> =
        urls.children_named("url").filter_map(|url| url.attr("codebase")).collect();
    if codebases.is_empty() {
        return Err(ResponseParseError::Invalid);
    }

    let manifest = update_check.child("manifest").ok_or(ResponseParseError::Invalid)?;
    let package = manifest
        .child("packages")
        .and_then(|packages| packages.child("package"))
        .ok_or(ResponseParseError::Invalid)?;
    let name = match package.attr("name") {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ResponseParseError::Invalid),
    };
    // Payload sizes routinely exceed 32 bits; parse straight into i64.
    let size = package
        .attr("size")
        .and_then(|size| size.parse::<i64>().ok())
        .ok_or(ResponseParseError::Invalid)?;

    let action = manifest
        .child("actions")
        .and_then(|actions| {
            actions.children_named("action").find(|action| action.attr("event") == Some("postinstall"))
        })
        .ok_or(ResponseParseError::Invalid)?;

    Ok(OfferedUpdate {
        display_version: action.attr("DisplayVersion").unwrap_or("").to_string(),
        payload_urls: codebases.iter().map(|codebase| format!("{}{}", codebase, name)).collect(),
        more_info_url: action.attr("MoreInfo").unwrap_or("").to_string(),
        hash: action.attr("sha256").unwrap_or("").to_string(),
        size,
        needs_admin: action.attr("needsadmin") == Some("true"),
        prompt: action.attr("Prompt") == Some("true"),
        deadline: action.attr("deadline").unwrap_or("").to_string(),
        max_days_to_scatter: action
            .attr("MaxDaysToScatter")
            .and_then(|days| days.parse::<i32>().ok())
            .unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn offer_from(bytes: &[u8]) -> OfferedUpdate {
        match parse(bytes).unwrap().update_check {
            UpdateCheck::Offer(offer) => offer,
            other => panic!("expected an offer, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_no_update() {
        let reply = br#"<?xml version="1.0" encoding="UTF-8"?><response protocol="3.0">
            <daystart elapsed_seconds="100"/>
            <app appid="some-app" status="ok">
            <ping status="ok"/><updatecheck status="noupdate"/></app></response>"#;
        let response = parse(reply).unwrap();
        assert_eq!(UpdateCheck::NoUpdate, response.update_check);
        assert_eq!(Some(100), response.day_start.elapsed_seconds);
    }

    #[test]
    fn test_parse_offer() {
        let reply = br#"<?xml version="1.0" encoding="UTF-8"?><response protocol="3.0">
            <daystart elapsed_seconds="100"/>
            <app appid="some-app" status="ok">
            <ping status="ok"/><updatecheck status="ok">
            <urls><url codebase="http://code/base/"/></urls>
            <manifest version="1.2.3.4">
            <packages><package hash="not-used" name="file.signed" size="123"/></packages>
            <actions><action event="postinstall"
              DisplayVersion="1.2.3.4" MoreInfo="http://more/info" Prompt="true"
              MaxDaysToScatter="7" sha256="HASH1234=" needsadmin="false"
              deadline="20101020"/></actions>
            </manifest></updatecheck></app></response>"#;
        let offer = offer_from(reply);
        assert_eq!("1.2.3.4", offer.display_version);
        assert_eq!(vec!["http://code/base/file.signed".to_string()], offer.payload_urls);
        assert_eq!("http://more/info", offer.more_info_url);
        assert_eq!("HASH1234=", offer.hash);
        assert_eq!(123, offer.size);
        assert_eq!(false, offer.needs_admin);
        assert!(offer.prompt);
        assert_eq!("20101020", offer.deadline);
        assert_eq!(7, offer.max_days_to_scatter);
    }

    #[test]
    fn test_parse_offer_with_multiple_urls() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <urls><url codebase="http://a/"/><url codebase="http://b/"/></urls>
            <manifest><packages><package name="f" size="1"/></packages>
            <actions><action event="postinstall" sha256="h"/></actions>
            </manifest></updatecheck></app></response>"#;
        let offer = offer_from(reply);
        assert_eq!(
            vec!["http://a/f".to_string(), "http://b/f".to_string()],
            offer.payload_urls
        );
    }

    #[test]
    fn test_parse_offer_missing_optionals_use_defaults() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <urls><url codebase="http://a/"/></urls>
            <manifest><packages><package name="f" size="587"/></packages>
            <actions><action event="postinstall" DisplayVersion="10.2.3.4"
              sha256="lkq34j5345" needsadmin="true"/></actions>
            </manifest></updatecheck></app></response>"#;
        let offer = offer_from(reply);
        assert_eq!("", offer.more_info_url);
        assert_eq!("", offer.deadline);
        assert_eq!(false, offer.prompt);
        assert!(offer.needs_admin);
        assert_eq!(0, offer.max_days_to_scatter);
        assert_eq!(587, offer.size);
    }

    #[test]
    fn test_parse_size_beyond_32_bits() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <urls><url codebase="http://a/"/></urls>
            <manifest><packages><package name="f" size="123123123123123"/></packages>
            <actions><action event="postinstall" sha256="h"/></actions>
            </manifest></updatecheck></app></response>"#;
        assert_eq!(123123123123123, offer_from(reply).size);
    }

    #[test]
    fn test_parse_decodes_attribute_entities() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <urls><url codebase="testthe&amp;codebase/"/></urls>
            <manifest><packages><package name="file.signed" size="123"/></packages>
            <actions><action event="postinstall" MoreInfo="testthe&lt;url"
              sha256="h" deadline="&lt;20110101"/></actions>
            </manifest></updatecheck></app></response>"#;
        let offer = offer_from(reply);
        assert_eq!("testthe<url", offer.more_info_url);
        assert_eq!("testthe&codebase/file.signed", offer.payload_urls[0]);
        assert_eq!("<20110101", offer.deadline);
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(matches!(parse(b""), Err(ResponseParseError::EmptyResponse)));
    }

    #[test]
    fn test_parse_malformed_xml() {
        assert!(matches!(parse(b"invalid xml>"), Err(ResponseParseError::XmlParse(_))));
        assert!(matches!(parse(b"<response>"), Err(ResponseParseError::XmlParse(_))));
    }

    #[test]
    fn test_parse_unknown_entity_is_a_parse_error() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="noupdate" note="&bogus;"/></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::XmlParse(_))));
    }

    #[test]
    fn test_parse_missing_status() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <ping status="ok"/><updatecheck/></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_unknown_status() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <ping status="ok"/><updatecheck status="definitely-not-a-status"/></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_missing_updatecheck() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <ping status="ok"/></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_missing_app() {
        let reply = br#"<response protocol="3.0"><daystart elapsed_seconds="1"/></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_wrong_root() {
        let reply = br#"<request protocol="3.0"></request>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_offer_without_urls_is_invalid() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <manifest><packages><package name="f" size="1"/></packages>
            <actions><action event="postinstall" sha256="h"/></actions>
            </manifest></updatecheck></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_offer_without_postinstall_action_is_invalid() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <urls><url codebase="http://a/"/></urls>
            <manifest><packages><package name="f" size="1"/></packages>
            <actions><action event="preinstall"/></actions>
            </manifest></updatecheck></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_offer_with_unparsable_size_is_invalid() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="ok">
            <urls><url codebase="http://a/"/></urls>
            <manifest><packages><package name="f" size="not-a-number"/></packages>
            <actions><action event="postinstall" sha256="h"/></actions>
            </manifest></updatecheck></app></response>"#;
        assert!(matches!(parse(reply), Err(ResponseParseError::Invalid)));
    }

    #[test]
    fn test_parse_missing_daystart_is_tolerated() {
        let reply = br#"<response protocol="3.0"><app appid="x" status="ok">
            <updatecheck status="noupdate"/></app></response>"#;
        assert_eq!(None, parse(reply).unwrap().day_start.elapsed_seconds);
    }

    #[test]
    fn test_parse_bad_elapsed_seconds_is_tolerated() {
        let reply = br#"<response protocol="3.0"><daystart elapsed_seconds="x"/>
            <app appid="x" status="ok"><updatecheck status="noupdate"/></app></response>"#;
        assert_eq!(None, parse(reply).unwrap().day_start.elapsed_seconds);
    }
}
