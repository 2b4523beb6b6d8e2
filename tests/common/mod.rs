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

#![allow(dead_code)]

use event::Events;
use libtests::run_until;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::{Duration, Instant},
};
use withtimer::{Props, Unit, Value};

/// Unit recording every props it is rendered with
#[derive(Default)]
pub struct Recorder {
    pub renders: RefCell<Vec<Props>>,
}

impl Unit for Recorder {
    fn render(&self, props: &Props) {
        self.renders.borrow_mut().push(props.clone());
    }
}

impl Recorder {
    pub fn last(&self) -> Props {
        self.renders.borrow().last().cloned().unwrap_or_default()
    }
}

/// A handler recording the time and props of every call
pub struct CallLog {
    pub calls: Rc<RefCell<Vec<(Instant, Props)>>>,
}

impl CallLog {
    pub fn new() -> (CallLog, Value) {
        let log = CallLog {
            calls: Rc::new(RefCell::new(Vec::new())),
        };
        let handler = Value::handler(log.record());
        (log, handler)
    }

    /// a closure appending to this log
    pub fn record(&self) -> impl Fn(&Props) + 'static {
        let calls = self.calls.clone();
        move |props: &Props| {
            calls.borrow_mut().push((Instant::now(), props.clone()));
        }
    }

    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }
}

/// A handler counting its calls
pub fn counter() -> (Rc<Cell<u32>>, Value) {
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    (hits, Value::handler(move |_| h.set(h.get() + 1)))
}

pub fn new_events() -> Rc<Events> {
    Rc::new(Events::new().unwrap())
}

/// run the loop until `done` holds, at most `ms` milliseconds
pub fn pump(events: &Events, ms: u64, done: impl FnMut() -> bool) -> bool {
    run_until(
        Duration::from_millis(ms),
        || {
            events.run(5).unwrap();
        },
        done,
    )
}

/// run the loop for `ms` milliseconds
pub fn idle(events: &Events, ms: u64) {
    let _ = run_until(
        Duration::from_millis(ms),
        || {
            events.run(5).unwrap();
        },
        || false,
    );
}
