//! Lifecycle hooks
//!
//! Callbacks registered here run at fixed points of the request lifecycle.
//! They carry no arguments; anything they need is captured at registration.

use std::{fmt, sync::Arc};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After a named controller has been constructed, before it is invoked
    PostControllerConstructor,
    /// After the response has been sent
    PostSystem,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::PostControllerConstructor => "post_controller_constructor",
            HookPoint::PostSystem => "post_system",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type HookFn = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    callbacks: DashMap<HookPoint, Vec<HookFn>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, point: HookPoint, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks
            .entry(point)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Run every callback registered for `point`, in registration order.
    /// Returns how many ran.
    pub fn trigger(&self, point: HookPoint) -> usize {
        // Clone out so callbacks may register further hooks without deadlocking
        let callbacks: Vec<HookFn> = match self.callbacks.get(&point) {
            Some(entry) => entry.value().clone(),
            None => return 0,
        };
        log::debug!("Triggering {} hook(s) for {}", callbacks.len(), point);
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    pub fn has(&self, point: HookPoint) -> bool {
        self.callbacks
            .get(&point)
            .is_some_and(|entry| !entry.is_empty())
    }
}
