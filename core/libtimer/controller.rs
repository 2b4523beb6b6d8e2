// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! # Timer controller
//!
//! One controller per mounted instance. It is either Idle (no timer source
//! in the event loop) or Armed (exactly one one-shot source counting down).
//!
//! | operation | Idle | Armed |
//! |---|---|---|
//! | `start` | arm | no-op |
//! | `cancel` | no-op | disarm |
//! | `reset` | arm | disarm, arm |
//! | `finish` | fire | disarm, fire |
//! | expiry | - | disarm, fire |
//!
//! Delay and handler are resolved from override, then instance props, then
//! the static defaults. The handler is resolved again when the timer fires,
//! so an `onTimeout` swapped in by [`TimerController::set_props`] while the
//! timer is armed is the one that runs.
use crate::config::{CallbackKind, StaticConfig, CALLBACK_METHODS};
use crate::error::*;
use crate::props::{Props, TimeoutHandler, Value};
use crate::validate::{check_delay, check_on_timeout, required_delay, required_handler};
use event::{EventState, Events, Source, USEC_PER_MSEC};
use snafu::ResultExt;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

// tokens of timer sources, unique for the whole process
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1 << 48);

fn next_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

fn delay_to_usec(delay: f64) -> u64 {
    // float to int casts saturate, an infinite delay never fires
    (delay * USEC_PER_MSEC as f64).round() as u64
}

/// A controller operation bound to its instance, injected into the wrapped
/// unit's props. Holds the controller weakly: once the instance is gone,
/// invoking the callback does nothing.
#[derive(Clone)]
pub struct TimerCallback {
    kind: CallbackKind,
    controller: Weak<ControllerInner>,
}

impl TimerCallback {
    /// operation this callback performs
    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    /// invoke without a delay override
    pub fn call(&self) -> Result<()> {
        self.call_with_delay(None)
    }

    /// invoke; the override only applies to `start` and `reset`
    pub fn call_with_delay(&self, delay: Option<f64>) -> Result<()> {
        let controller = match self.controller.upgrade() {
            Some(c) => c,
            None => {
                log::debug!("withTimer() {} called on a released instance", self.kind);
                return Ok(());
            }
        };

        match self.kind {
            CallbackKind::Cancel => {
                controller.cancel();
                Ok(())
            }
            CallbackKind::Finish => controller.finish(),
            CallbackKind::Reset => controller.reset(delay),
            CallbackKind::Start => controller.start(delay),
        }
    }

    /// whether both callbacks are bound to the same instance and operation
    pub fn same_as(&self, other: &TimerCallback) -> bool {
        self.kind == other.kind && self.controller.ptr_eq(&other.controller)
    }
}

/// The scheduled expiry of one armed timer
pub(crate) struct TimeoutSource {
    token: u64,
    usec: u64,
    controller: Weak<ControllerInner>,
}

impl Source for TimeoutSource {
    fn time_relative(&self) -> u64 {
        self.usec
    }

    fn priority(&self) -> i8 {
        0i8
    }

    fn dispatch(&self, _: &Events) -> i32 {
        match self.controller.upgrade() {
            Some(controller) => controller.expire(self.token),
            None => 0,
        }
    }

    fn token(&self) -> u64 {
        self.token
    }

    fn description(&self) -> String {
        String::from("withTimer timeout")
    }
}

/// The one outstanding timer of an Armed controller
struct TimerHandle {
    source: Rc<TimeoutSource>,
}

impl TimerHandle {
    fn token(&self) -> u64 {
        self.source.token
    }

    /// remove the source from the loop, it will not be dispatched afterwards
    fn release(self, events: &Events) {
        if let Err(e) = events.del_source(self.source) {
            log::warn!("withTimer() failed to release timer source: {}", e);
        }
    }
}

pub(crate) struct ControllerInner {
    // associated objects
    events: Rc<Events>,
    config: Rc<StaticConfig>,
    me: Weak<ControllerInner>,

    // owned objects
    props: RefCell<Props>,
    handle: RefCell<Option<TimerHandle>>,
    callback_props: Props,
}

impl ControllerInner {
    fn is_armed(&self) -> bool {
        self.handle.borrow().is_some()
    }

    fn resolve_delay(&self, delay_override: Option<f64>) -> Result<f64> {
        let value = match delay_override {
            Some(delay) => Some(Value::Number(delay)),
            None => self
                .props
                .borrow()
                .delay()
                .cloned()
                .or_else(|| self.config.default_delay().map(Value::Number)),
        };
        required_delay(value.as_ref())
    }

    fn resolve_handler(&self) -> Result<TimeoutHandler> {
        let value = self
            .props
            .borrow()
            .on_timeout()
            .cloned()
            .or_else(|| self.config.default_on_timeout().cloned().map(Value::Handler));
        required_handler(value.as_ref())
    }

    /// add a one-shot source firing after `delay` milliseconds
    fn arm(&self, delay: f64) -> Result<()> {
        let source = Rc::new(TimeoutSource {
            token: next_token(),
            usec: delay_to_usec(delay),
            controller: self.me.clone(),
        });

        self.events.add_source(source.clone()).context(EventSnafu)?;
        if let Err(e) = self.events.set_enabled(source.clone(), EventState::OneShot) {
            if let Err(del) = self.events.del_source(source.clone()) {
                log::warn!(
                    "withTimer() failed to drop timer {} after enable error: {}",
                    source.token,
                    del
                );
            }
            return Err(Error::Event { source: e });
        }

        log::debug!("withTimer() armed timer {} for {}ms", source.token, delay);
        *self.handle.borrow_mut() = Some(TimerHandle { source });
        Ok(())
    }

    fn start(&self, delay_override: Option<f64>) -> Result<()> {
        if self.is_armed() {
            return Ok(());
        }

        let delay = self.resolve_delay(delay_override)?;
        self.resolve_handler()?;
        self.arm(delay)
    }

    fn cancel(&self) {
        let handle = self.handle.borrow_mut().take();
        if let Some(handle) = handle {
            log::debug!("withTimer() cancelled timer {}", handle.token());
            handle.release(&self.events);
        }
    }

    fn reset(&self, delay_override: Option<f64>) -> Result<()> {
        // resolve first, a failed reset leaves the running timer alone
        let delay = self.resolve_delay(delay_override)?;
        self.resolve_handler()?;

        self.cancel();
        self.arm(delay)
    }

    fn finish(&self) -> Result<()> {
        let handler = self.resolve_handler()?;
        self.cancel();
        self.fire(handler);
        Ok(())
    }

    fn fire(&self, handler: TimeoutHandler) {
        // no borrow may be held here, the handler can call back into us
        let props = self.props.borrow().clone();
        handler(&props);
    }

    fn expire(&self, token: u64) -> i32 {
        let current = match &*self.handle.borrow() {
            Some(handle) => handle.token() == token,
            None => false,
        };
        if !current {
            log::debug!("withTimer() ignoring stale timer {}", token);
            return 0;
        }

        self.cancel();
        match self.resolve_handler() {
            Ok(handler) => {
                log::debug!("withTimer() timer {} expired", token);
                self.fire(handler);
                0
            }
            Err(e) => {
                log::error!("withTimer() timer {} expired without a handler: {}", token, e);
                -1
            }
        }
    }

    fn set_props(&self, props: Props) -> Result<()> {
        check_delay(props.delay(), false)?;
        check_on_timeout(props.on_timeout(), false)?;
        *self.props.borrow_mut() = props;
        Ok(())
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn build_callback_props(config: &StaticConfig, me: &Weak<ControllerInner>) -> Props {
    let mut props = Props::new();
    let exposed = config.exposed_callbacks();
    for kind in CALLBACK_METHODS {
        if !exposed.contains(kind.flag()) {
            continue;
        }
        let name = config.prop_name(kind);
        if name.is_empty() {
            log::debug!("withTimer() {} has no prop name, not injected", kind);
            continue;
        }
        props.insert(
            name,
            Value::Callback(TimerCallback {
                kind,
                controller: me.clone(),
            }),
        );
    }
    props
}

/// Timer lifecycle of one wrapped-unit instance
pub struct TimerController {
    inner: Rc<ControllerInner>,
}

impl fmt::Debug for TimerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerController")
            .field("timer", &self.timer_token())
            .field("props", &*self.inner.props.borrow())
            .finish()
    }
}

impl TimerController {
    /// controller for an instance with `props`; the `delay` and `onTimeout`
    /// props are checked but need not be present
    pub fn new(events: &Rc<Events>, config: &Rc<StaticConfig>, props: Props) -> Result<Self> {
        check_delay(props.delay(), false)?;
        check_on_timeout(props.on_timeout(), false)?;

        let inner = Rc::new_cyclic(|me: &Weak<ControllerInner>| ControllerInner {
            events: Rc::clone(events),
            config: Rc::clone(config),
            me: me.clone(),
            props: RefCell::new(props),
            handle: RefCell::new(None),
            callback_props: build_callback_props(config, me),
        });
        Ok(TimerController { inner })
    }

    /// arm the timer unless it is already armed
    pub fn start(&self, delay_override: Option<f64>) -> Result<()> {
        self.inner.start(delay_override)
    }

    /// disarm the timer, no-op when idle
    pub fn cancel(&self) {
        self.inner.cancel()
    }

    /// disarm, then arm with a freshly resolved delay
    pub fn reset(&self, delay_override: Option<f64>) -> Result<()> {
        self.inner.reset(delay_override)
    }

    /// disarm and run the handler now
    pub fn finish(&self) -> Result<()> {
        self.inner.finish()
    }

    /// whether a timer is pending
    pub fn is_armed(&self) -> bool {
        self.inner.is_armed()
    }

    /// token of the pending timer source
    pub fn timer_token(&self) -> Option<u64> {
        self.inner.handle.borrow().as_ref().map(TimerHandle::token)
    }

    /// the instance's own props
    pub fn props(&self) -> Props {
        self.inner.props.borrow().clone()
    }

    /// replace the instance's props; an armed timer keeps running and will
    /// fire with the new props and handler
    pub fn set_props(&self, props: Props) -> Result<()> {
        self.inner.set_props(props)
    }

    /// callbacks injected into the wrapped unit, by prop name
    pub fn callback_props(&self) -> &Props {
        &self.inner.callback_props
    }

    /// callback props overlaid by the instance props
    pub fn merged_props(&self) -> Props {
        let props = self.inner.props.borrow();
        for name in self.inner.callback_props.names() {
            if props.contains(name) {
                log::debug!("withTimer() instance prop '{}' shadows the injected callback", name);
            }
        }
        self.inner.callback_props.merged(&props)
    }
}
