// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A minimal transport double.  An action makes exactly one request, so the
//! mock holds one canned reply and parks the posted request in a shared
//! cell for the test to pull back out and inspect.

use crate::http_request::{Error, HttpRequest};
use futures::future::BoxFuture;
use futures::prelude::*;
use hyper::{Body, Request, Response};
use std::{cell::RefCell, rc::Rc};

#[derive(Debug)]
pub struct MockHttpRequest {
    // Where the posted request is parked for later inspection.
    request: Rc<RefCell<Request<Body>>>,
    reply: Option<Result<Response<Body>, Error>>,
}

impl HttpRequest for MockHttpRequest {
    fn request(&mut self, req: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, Error>> {
        self.request.replace(req);

        future::ready(match self.reply.take() {
            Some(reply) => reply,
            // Nothing canned; answer with a bare server error.
            None => Ok(Response::builder().status(500).body(Body::empty()).unwrap()),
        })
        .boxed()
    }
}

impl MockHttpRequest {
    /// A mock that answers its request with `reply`.
    pub fn new(reply: Response<Body>) -> Self {
        MockHttpRequest {
            request: Rc::new(RefCell::new(Request::default())),
            reply: Some(Ok(reply)),
        }
    }

    /// A mock with nothing to say.
    pub fn empty() -> Self {
        MockHttpRequest { request: Rc::new(RefCell::new(Request::default())), reply: None }
    }

    /// A mock whose request fails with `error`.
    pub fn with_error(error: Error) -> Self {
        MockHttpRequest {
            request: Rc::new(RefCell::new(Request::default())),
            reply: Some(Err(error)),
        }
    }

    /// The cell the posted request is parked in.  Clone it before handing
    /// the mock to an action, then take the request out to inspect what was
    /// sent.
    pub fn request_cell(&self) -> Rc<RefCell<Request<Body>>> {
        Rc::clone(&self.request)
    }
}

/// Drain the body of a posted request into a String.
pub async fn request_body_string(request: Request<Body>) -> String {
    let bytes = hyper::body::to_bytes(request.into_body()).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canned_reply_and_request_capture() {
        let mut mock = MockHttpRequest::new(Response::new(Body::from("reply body")));
        let cell = mock.request_cell();
        block_on(async {
            let request =
                Request::post("https://mock.uri/").body(Body::from("request body")).unwrap();
            let response = mock.request(request).await.unwrap();
            let reply = hyper::body::to_bytes(response.into_body()).await.unwrap();
            assert_eq!(&b"reply body"[..], reply);

            let posted = cell.replace(Request::default());
            assert_eq!(&hyper::Method::POST, posted.method());
            assert_eq!("request body", request_body_string(posted).await);
        });
    }

    #[test]
    fn test_empty_mock_answers_with_a_server_error() {
        let mut mock = MockHttpRequest::empty();
        block_on(async {
            let response = mock.request(Request::default()).await.unwrap();
            assert_eq!(hyper::StatusCode::INTERNAL_SERVER_ERROR, response.status());
        });
    }

    #[test]
    fn test_error_mock_fails_the_request() {
        let error =
            Error::Http(http::Request::builder().uri("\\bad\\uri").body(()).unwrap_err());
        let mut mock = MockHttpRequest::with_error(error);
        block_on(async {
            assert!(mock.request(Request::default()).await.is_err());
        });
    }
}
