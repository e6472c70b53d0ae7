// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! An in-memory implementation of the [`Storage`] trait, for hosts without a
//! durable preferences service and as the storage double in tests.

use super::Storage;
use futures::future::BoxFuture;
use futures::prelude::*;
use log::warn;
use std::collections::HashMap;
use thiserror::Error;

/// Error type for [`MemStorage`]; in-memory operations cannot fail.
#[derive(Debug, Error)]
pub enum MemStorageError {}

#[derive(Clone, Debug, PartialEq)]
enum Value {
    String(String),
    Int(i64),
}

/// In-memory key/value storage with commit tracking.
#[derive(Debug)]
pub struct MemStorage {
    data: HashMap<String, Value>,
    committed: bool,
}

impl MemStorage {
    pub fn new() -> Self {
        MemStorage { data: HashMap::new(), committed: true }
    }

    /// True when no write has happened since the last `commit()`.
    pub fn committed(&self) -> bool {
        self.committed
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemStorage {
    type Error = MemStorageError;

    fn get_string<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>> {
        future::ready(match self.data.get(key) {
            Some(Value::String(value)) => Some(value.clone()),
            Some(other) => {
                warn!("found key '{}' but it holds {:?}, not a string", key, other);
                None
            }
            None => None,
        })
        .boxed()
    }

    fn get_int<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<i64>> {
        future::ready(match self.data.get(key) {
            Some(Value::Int(value)) => Some(*value),
            Some(other) => {
                warn!("found key '{}' but it holds {:?}, not an i64", key, other);
                None
            }
            None => None,
        })
        .boxed()
    }

    fn set_string<'a>(
        &'a mut self,
        key: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<(), Self::Error>> {
        self.data.insert(key.to_string(), Value::String(value.to_string()));
        self.committed = false;
        future::ready(Ok(())).boxed()
    }

    fn set_int<'a>(
        &'a mut self,
        key: &'a str,
        value: i64,
    ) -> BoxFuture<'a, Result<(), Self::Error>> {
        self.data.insert(key.to_string(), Value::Int(value));
        self.committed = false;
        future::ready(Ok(())).boxed()
    }

    fn remove<'a>(&'a mut self, key: &'a str) -> BoxFuture<'a, Result<(), Self::Error>> {
        self.data.remove(key);
        self.committed = false;
        future::ready(Ok(())).boxed()
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<(), Self::Error>> {
        self.committed = true;
        future::ready(Ok(())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_get_string() {
        block_on(async {
            let mut storage = MemStorage::new();
            storage.set_string("some key", "some value").await.unwrap();
            assert_eq!(Some("some value".to_string()), storage.get_string("some key").await);
        });
    }

    #[test]
    fn test_set_get_int() {
        block_on(async {
            let mut storage = MemStorage::new();
            storage.set_int("some key", 42).await.unwrap();
            assert_eq!(Some(42), storage.get_int("some key").await);
        });
    }

    #[test]
    fn test_get_missing_key() {
        block_on(async {
            let storage = MemStorage::new();
            assert_eq!(None, storage.get_string("missing").await);
            assert_eq!(None, storage.get_int("missing").await);
        });
    }

    #[test]
    fn test_get_wrong_type() {
        block_on(async {
            let mut storage = MemStorage::new();
            storage.set_int("some key", 42).await.unwrap();
            assert_eq!(None, storage.get_string("some key").await);
        });
    }

    #[test]
    fn test_set_overwrites_across_types() {
        block_on(async {
            let mut storage = MemStorage::new();
            storage.set_string("some key", "some value").await.unwrap();
            storage.set_int("some key", 42).await.unwrap();
            assert_eq!(Some(42), storage.get_int("some key").await);
            assert_eq!(None, storage.get_string("some key").await);
        });
    }

    #[test]
    fn test_remove() {
        block_on(async {
            let mut storage = MemStorage::new();
            storage.set_int("some key", 42).await.unwrap();
            storage.remove("some key").await.unwrap();
            assert_eq!(None, storage.get_int("some key").await);
        });
    }

    #[test]
    fn test_committed() {
        block_on(async {
            let mut storage = MemStorage::new();
            assert!(storage.committed());
            storage.set_int("some key", 42).await.unwrap();
            assert_eq!(false, storage.committed());
            storage.commit().await.unwrap();
            assert!(storage.committed());
        });
    }
}
