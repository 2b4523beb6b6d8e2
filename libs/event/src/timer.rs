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

//! Deadline heap of the scheduled sources, on the monotonic clock
use std::{collections::BinaryHeap, mem, rc::Rc};

use crate::{Source, USEC_INFINITY, USEC_PER_SEC};

const NSEC_PER_USEC: u64 = 1000;

/// current monotonic time in useconds
pub(crate) fn now_usec() -> u64 {
    let mut tp = mem::MaybeUninit::<libc::timespec>::zeroed();
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, tp.as_mut_ptr()) };
    if ret < 0 {
        return USEC_INFINITY;
    }
    load_usec(unsafe { tp.assume_init() })
}

fn load_usec(ts: libc::timespec) -> u64 {
    if ts.tv_sec < 0 || ts.tv_nsec < 0 {
        return USEC_INFINITY;
    }

    (ts.tv_sec as u64)
        .saturating_mul(USEC_PER_SEC)
        .saturating_add((ts.tv_nsec as u64) / NSEC_PER_USEC)
}

/// absolute timerfd setting for the deadline `next`
pub(crate) fn timer_stored(next: u64) -> libc::itimerspec {
    libc::itimerspec {
        it_interval: libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        },
        it_value: libc::timespec {
            tv_sec: (next / USEC_PER_SEC) as libc::time_t,
            tv_nsec: ((next % USEC_PER_SEC) * NSEC_PER_USEC) as libc::c_long,
        },
    }
}

/// Scheduled sources, earliest deadline first
#[derive(Debug, Default)]
pub(crate) struct Timer {
    data: BinaryHeap<ClockData>,
}

impl Timer {
    pub fn new() -> Timer {
        Timer::default()
    }

    /// earliest deadline, if any source is scheduled
    pub fn next(&self) -> Option<u64> {
        self.data.peek().map(ClockData::next)
    }

    /// schedule `source` `time_relative()` useconds from now
    pub fn push(&mut self, source: Rc<dyn Source>) {
        let next = now_usec().saturating_add(source.time_relative());
        self.push_at(source, next);
    }

    fn push_at(&mut self, source: Rc<dyn Source>, next: u64) {
        self.data.push(ClockData { source, next });
    }

    /// pop one source whose deadline is not after `now`
    pub fn pop(&mut self, now: u64) -> Option<Rc<dyn Source>> {
        match self.data.peek() {
            Some(cd) if cd.next <= now => self.data.pop().map(|cd| cd.source),
            _ => None,
        }
    }

    pub fn remove(&mut self, source: &Rc<dyn Source>) {
        let token = source.token();
        self.data.retain(|cd| cd.source.token() != token);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ClockData {
    source: Rc<dyn Source>,
    next: u64,
}

impl ClockData {
    pub fn next(&self) -> u64 {
        self.next
    }
}

// earliest deadline on top of the heap
impl Ord for ClockData {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.next.cmp(&self.next)
    }
}

impl PartialOrd for ClockData {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ClockData {
    fn eq(&self, other: &Self) -> bool {
        self.next == other.next
    }
}

impl Eq for ClockData {}
