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

//! # withTimer: a reusable one-shot timer attached to a unit's lifecycle
//!
//! A static [`TimerConfig`] is validated once by [`with_timer`]. Every unit
//! wrapped with the result gets, per mounted instance, a [`TimerController`]
//! running on an [`event::Events`] loop, and the `start`, `cancel`, `reset`
//! and `finish` operations injected into its props as [`TimerCallback`]s.
//!
//! # Example:
//! ```rust
//! # use std::{cell::Cell, rc::Rc};
//! # use event::Events;
//! # use withtimer::{with_timer, Lifecycle, Props, TimerConfig, Unit, START_ON_MOUNT};
//! #
//! struct Banner;
//!
//! impl Unit for Banner {
//!     fn render(&self, props: &Props) {
//!         assert!(props.callback("cancelTimer").is_some());
//!     }
//! }
//!
//! let fired = Rc::new(Cell::new(false));
//! let f = fired.clone();
//! let banner = with_timer(
//!     TimerConfig::new()
//!         .delay(10.0)
//!         .on_timeout(move |_| f.set(true))
//!         .option(START_ON_MOUNT, true),
//! )
//! .unwrap()
//! .wrap(Banner);
//!
//! let events = Rc::new(Events::new().unwrap());
//! let instance = banner.mount(&events, Props::new()).unwrap();
//! instance.render();
//! instance.on_attach().unwrap();
//! while !fired.get() {
//!     events.run(100).unwrap();
//! }
//! assert!(!instance.controller().is_armed());
//! ```
pub mod config;
pub mod controller;
pub mod error;
pub mod props;
pub mod unit;
pub mod validate;

pub use config::{
    CallbackKind, CallbackSet, StaticConfig, TimerConfig, TimerOptions, CALLBACK_METHODS,
    CANCEL_PROP_NAME, FINISH_PROP_NAME, PASSED_PROPS, RESET_PROP_NAME, START_ON_MOUNT,
    START_PROP_NAME,
};
pub use controller::{TimerCallback, TimerController};
pub use error::{Error, Result};
pub use props::{Props, TimeoutHandler, Value, DELAY_PROP, ON_TIMEOUT_PROP};
pub use unit::{with_timer, Lifecycle, Mounted, TimedUnit, Unit, WithTimer};
