//! Keyboard response gating for the blind spot task.

use std::collections::HashSet;
use std::time::Duration;

/// Key value of the space bar, as hosts report it.
pub const SPACE: &str = " ";

/// An accepted key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResponse {
    pub key: String,
    /// Time since the listener was armed
    pub rt: Duration,
}

/// Waits for one of a set of keys.
#[derive(Debug, Clone)]
pub struct ResponseListener {
    valid_keys: Vec<String>,
    persist: bool,
    allow_held_keys: bool,
    minimum_rt: Duration,
    armed: bool,
}

impl ResponseListener {
    /// Listen once for any of `valid_keys`.
    pub fn new<I, K>(valid_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            valid_keys: valid_keys.into_iter().map(Into::into).collect(),
            persist: false,
            allow_held_keys: false,
            minimum_rt: Duration::ZERO,
            armed: true,
        }
    }

    /// Keep listening after the first accepted press.
    pub fn persistent(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Accept keys that are still held from an earlier press.
    pub fn allowing_held_keys(mut self) -> Self {
        self.allow_held_keys = true;
        self
    }

    /// Ignore presses faster than `minimum_rt`.
    pub fn with_minimum_rt(mut self, minimum_rt: Duration) -> Self {
        self.minimum_rt = minimum_rt;
        self
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Decide whether a key press is a response.
    pub fn check(&mut self, key: &str, rt: Duration, keyboard: &KeyboardState) -> Option<KeyResponse> {
        if !self.armed {
            return None;
        }
        if !self.allow_held_keys && keyboard.is_held(key) {
            return None;
        }
        if !self.valid_keys.iter().any(|k| k == key) {
            return None;
        }
        if rt < self.minimum_rt {
            return None;
        }
        if !self.persist {
            self.armed = false;
        }
        Some(KeyResponse {
            key: key.to_string(),
            rt,
        })
    }
}

/// Keys currently held down.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<String>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a key-down: offer it to the listener, then mark the key held.
    ///
    /// The listener sees the key before it is marked, so only auto-repeat
    /// presses count as held.
    pub fn press(&mut self, key: &str, rt: Duration, listener: &mut ResponseListener) -> Option<KeyResponse> {
        let response = listener.check(key, rt, self);
        self.hold(key);
        response
    }

    /// Mark a key as held without offering it to any listener.
    pub fn hold(&mut self, key: &str) {
        self.held.insert(key.to_string());
    }

    /// Handle a key-up.
    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
