// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Text escaping for the conservative XML subset spoken on the update wire.
//!
//! Request parameters come from device-controlled strings (hardware class,
//! track names, version strings) and are inserted into the request document
//! by direct assembly, so every value must be escaped on the way in.  The
//! decoder is the inverse used for attribute text coming back from the
//! service.

use thiserror::Error;

/// Escape `input` for use as XML text or attribute content.
///
/// `<`, `>` and `&` become named entities; any code point outside printable
/// 7-bit ASCII becomes a numeric character reference.  Already-escaped text
/// is escaped again (`&lt;` -> `&amp;lt;`), which is what the protocol
/// wants: the service sees exactly the bytes the device reported.
pub fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            ' '..='~' => out.push(c),
            _ => out.push_str(&format!("&#x{:X};", c as u32)),
        }
    }
    out
}

/// Failure to decode an entity or character reference.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    /// An `&` with no closing `;`.
    #[error("unterminated entity reference")]
    Unterminated,
    /// An entity other than `lt`, `gt`, `amp`, `apos` or `quot`.
    #[error("unknown entity reference: &{0};")]
    UnknownEntity(String),
    /// A numeric reference that is not a valid code point.
    #[error("bad character reference: &#{0};")]
    BadCharRef(String),
}

/// Decode the five standard named entities and numeric character references.
///
/// This is the standalone inverse of [`encode`]; the response parser gets
/// equivalent decoding from the XML reader while it builds the reply tree.
pub fn decode(input: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        let end = rest.find(';').ok_or(DecodeError::Unterminated)?;
        let name = &rest[..end];
        rest = &rest[end + 1..];
        match name {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "apos" => out.push('\''),
            "quot" => out.push('"'),
            _ => {
                let reference = name
                    .strip_prefix('#')
                    .ok_or_else(|| DecodeError::UnknownEntity(name.to_string()))?;
                let value = if let Some(hex) = reference.strip_prefix('x') {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    reference.parse::<u32>().ok()
                };
                match value.and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => return Err(DecodeError::BadCharRef(reference.to_string())),
                }
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}
