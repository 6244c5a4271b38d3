// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session pooling.
//!
//! Sessions are reused across operations to avoid reallocating their
//! tables. The pool guard full-resets unconditionally on return, including
//! after an error escaped from inside the session, so no state leaks
//! between unrelated operations borrowing the same pooled session.

use super::SerializerSession;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

#[derive(Default)]
pub struct SessionPool {
    free: Mutex<Vec<SerializerSession>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> PooledSession<'_> {
        let session = self.free.lock().pop().unwrap_or_else(|| {
            log::trace!("session pool empty, allocating a new session");
            SerializerSession::new()
        });
        PooledSession {
            pool: self,
            session: Some(session),
        }
    }

    /// Number of idle sessions (for tests and introspection).
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// RAII handle to a pooled session.
pub struct PooledSession<'a> {
    pool: &'a SessionPool,
    session: Option<SerializerSession>,
}

impl Deref for PooledSession<'_> {
    type Target = SerializerSession;

    fn deref(&self) -> &SerializerSession {
        self.session
            .as_ref()
            .unwrap_or_else(|| unreachable!("session present until drop"))
    }
}

impl DerefMut for PooledSession<'_> {
    fn deref_mut(&mut self) -> &mut SerializerSession {
        self.session
            .as_mut()
            .unwrap_or_else(|| unreachable!("session present until drop"))
    }
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.full_reset();
            self.pool.free.lock().push(session);
        }
    }
}
