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

//! # A single-threaded one-shot timer loop based on epoll and timerfd
//!
//! Every source is a one-shot timer on the monotonic clock. Enabling a source
//! with [`EventState::OneShot`] schedules it `time_relative()` useconds ahead;
//! once dispatched it falls back to [`EventState::Off`] and stays there until
//! it is enabled again.
//!
//! Sources are dispatched cooperatively from [`Events::run`] on the thread that
//! owns the loop, so a source may add, enable or delete other sources (or itself)
//! from inside its `dispatch`.
//!
//! # Example:
//! ```rust
//! # use std::{cell::Cell, rc::Rc};
//! # use event::{EventState, Events, Source};
//! #
//! struct Tick {
//!     fired: Cell<bool>,
//! }
//!
//! impl Source for Tick {
//!     /// 10ms from the moment the source is enabled
//!     fn time_relative(&self) -> u64 {
//!         10_000
//!     }
//!
//!     fn priority(&self) -> i8 {
//!         0i8
//!     }
//!
//!     fn dispatch(&self, _: &Events) -> i32 {
//!         self.fired.set(true);
//!         0
//!     }
//!
//!     fn token(&self) -> u64 {
//!         1
//!     }
//! }
//!
//! let e = Events::new().unwrap();
//! let s = Rc::new(Tick { fired: Cell::new(false) });
//! e.add_source(s.clone()).unwrap();
//! e.set_enabled(s.clone(), EventState::OneShot).unwrap();
//! while !s.fired.get() {
//!     e.run(-1).unwrap();
//! }
//! e.del_source(s).unwrap();
//! ```
//!
pub mod error;
pub mod events;
pub mod poll;
pub mod source;
mod timer;

pub use crate::events::Events;
pub(crate) use crate::poll::Poll;
pub use crate::source::Source;
pub use error::*;

/// Microseconds per millisecond
pub const USEC_PER_MSEC: u64 = 1000;
/// Microseconds per second
pub const USEC_PER_SEC: u64 = 1_000_000;
/// Larger than any deadline a source can ask for
pub const USEC_INFINITY: u64 = u64::MAX;

/// The dispatch status of a source
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum EventState {
    /// not scheduled
    Off,
    /// scheduled, switched Off again when dispatched
    OneShot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    struct Timer {
        token: u64,
        usec: u64,
        hits: RefCell<u32>,
    }

    impl Timer {
        fn new(token: u64, usec: u64) -> Rc<Timer> {
            Rc::new(Self {
                token,
                usec,
                hits: RefCell::new(0),
            })
        }

        fn hits(&self) -> u32 {
            *self.hits.borrow()
        }
    }

    impl Source for Timer {
        fn priority(&self) -> i8 {
            0i8
        }

        fn time_relative(&self) -> u64 {
            self.usec
        }

        fn dispatch(&self, _: &Events) -> i32 {
            *self.hits.borrow_mut() += 1;
            0
        }

        fn token(&self) -> u64 {
            self.token
        }
    }

    fn run_for(e: &Events, rounds: usize) {
        for _ in 0..rounds {
            e.run(20).unwrap();
        }
    }

    #[test]
    fn test_timer() {
        let e = Events::new().unwrap();
        let s = Timer::new(1, 10 * USEC_PER_MSEC);
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();

        while s.hits() == 0 {
            e.run(-1).unwrap();
        }
        assert_eq!(s.hits(), 1);
        e.del_source(s).unwrap();
    }

    #[test]
    fn test_timer_zero_fires_on_next_run() {
        let e = Events::new().unwrap();
        let s = Timer::new(2, 0);
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();

        e.run(0).unwrap();
        assert_eq!(s.hits(), 1);

        // one shot: nothing left to fire
        e.run(0).unwrap();
        assert_eq!(s.hits(), 1);
        e.del_source(s).unwrap();
    }

    #[test]
    fn test_timer_does_not_repeat() {
        let e = Events::new().unwrap();
        let s = Timer::new(3, USEC_PER_MSEC);
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();

        run_for(&e, 5);
        assert_eq!(s.hits(), 1);

        // enabling again schedules one more firing
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();
        run_for(&e, 5);
        assert_eq!(s.hits(), 2);
        e.del_source(s).unwrap();
    }

    #[test]
    fn test_timer_disabled_never_fires() {
        let e = Events::new().unwrap();
        let s = Timer::new(4, 0);
        e.add_source(s.clone()).unwrap();
        e.set_enabled(s.clone(), EventState::OneShot).unwrap();
        e.set_enabled(s.clone(), EventState::Off).unwrap();

        e.run(10).unwrap();
        assert_eq!(s.hits(), 0);
        e.del_source(s).unwrap();
    }

    #[test]
    fn test_timer_ordering() {
        let e = Events::new().unwrap();
        let late = Timer::new(5, 30 * USEC_PER_MSEC);
        let early = Timer::new(6, 5 * USEC_PER_MSEC);
        e.add_source(late.clone()).unwrap();
        e.add_source(early.clone()).unwrap();
        e.set_enabled(late.clone(), EventState::OneShot).unwrap();
        e.set_enabled(early.clone(), EventState::OneShot).unwrap();

        while early.hits() == 0 {
            e.run(-1).unwrap();
        }
        assert_eq!(late.hits(), 0);
        while late.hits() == 0 {
            e.run(-1).unwrap();
        }

        e.del_source(late).unwrap();
        e.del_source(early).unwrap();
    }
}
