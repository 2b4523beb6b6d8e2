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

//! A timer scheduling framework based on epoll
use crate::error::*;
use crate::timer::{self, Timer};
use crate::{EventState, Poll, Source};
use nix::unistd;
use snafu::{ensure, OptionExt, ResultExt};
use std::cell::RefCell;
use std::collections::{BinaryHeap, HashMap};
use std::os::unix::prelude::RawFd;
use std::rc::Rc;

/// token the timerfd is registered with in epoll
const TIMERFD_TOKEN: u64 = u64::MAX;

/// Single-threaded timer loop; sources are dispatched from [`Events::run`]
#[derive(Debug)]
pub struct Events {
    data: RefCell<EventsData>,
}

impl Drop for Events {
    fn drop(&mut self) {
        // clear is idempotent
        self.clear();
    }
}

impl Events {
    /// an empty loop with its own epoll instance
    pub fn new() -> Result<Events> {
        Ok(Events {
            data: RefCell::new(EventsData::new()?),
        })
    }

    /// register `source`, initially Off; its token must not be in use
    pub fn add_source(&self, source: Rc<dyn Source>) -> Result<i32> {
        self.data.borrow_mut().add_source(source)
    }

    /// whether a source with the same token is registered
    pub fn has_source(&self, source: Rc<dyn Source>) -> bool {
        self.data.borrow().has_source(source)
    }

    /// unregister `source`; a pending dispatch of it is dropped
    pub fn del_source(&self, source: Rc<dyn Source>) -> Result<i32> {
        self.data.borrow_mut().del_source(source)
    }

    /// switch `source` Off or OneShot; OneShot schedules it `time_relative()`
    /// useconds from now
    pub fn set_enabled(&self, source: Rc<dyn Source>, state: EventState) -> Result<i32> {
        self.data.borrow_mut().set_enabled(source, state)
    }

    /// wait up to `timeout` ms (-1 blocks) and dispatch at most one ready source
    pub fn run(&self, timeout: i32) -> Result<i32> {
        if !self.data.borrow_mut().prepare()? {
            self.data.borrow_mut().wait(timeout)?;
        }

        self.dispatch()
    }

    // dispatch the highest priority pending source
    fn dispatch(&self) -> Result<i32> {
        let top = match self.data.borrow_mut().pending_pop() {
            None => return Ok(0),
            Some(top) => top,
        };

        match self.data.borrow().source_state(top.token()) {
            Some(EventState::OneShot) => {}
            _ => return Ok(0),
        }

        self.data
            .borrow_mut()
            .set_enabled(top.clone(), EventState::Off)?;

        // the data borrow must be released before dispatching, the source may
        // call back into the loop
        top.dispatch(self);
        Ok(0)
    }

    /// drop every source and close the timerfd; calling it twice is harmless
    pub fn clear(&self) {
        self.data.borrow_mut().clear();
    }
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    state: EventState,
    in_pending: bool,
}

impl Default for State {
    fn default() -> State {
        State {
            state: EventState::Off,
            in_pending: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventsData {
    poller: Poll,
    sources: HashMap<u64, Rc<dyn Source>>,
    pending: BinaryHeap<Rc<dyn Source>>,
    state: HashMap<u64, State>,
    timerfd: Option<RawFd>,
    timer: Timer,
}

impl EventsData {
    fn new() -> Result<EventsData> {
        Ok(Self {
            poller: Poll::new()?,
            sources: HashMap::new(),
            pending: BinaryHeap::new(),
            state: HashMap::new(),
            timerfd: None,
            timer: Timer::new(),
        })
    }

    fn add_source(&mut self, source: Rc<dyn Source>) -> Result<i32> {
        let token = source.token();
        ensure!(!self.sources.contains_key(&token), TokenInUseSnafu { token });

        self.sources.insert(token, source);
        // default state
        self.state.insert(token, State::default());

        Ok(0)
    }

    fn has_source(&self, source: Rc<dyn Source>) -> bool {
        self.sources.contains_key(&source.token())
    }

    fn del_source(&mut self, source: Rc<dyn Source>) -> Result<i32> {
        let token = source.token();
        self.sources
            .remove(&token)
            .context(UnknownSourceSnafu { token })?;

        self.timer.remove(&source);
        self.pending.retain(|s| s.token() != token);
        // remove state
        self.state.remove(&token);

        if self.sources.is_empty() {
            if let Some(fd) = self.timerfd.take() {
                self.poller.unregister(fd)?;
                unistd::close(fd).context(NixSnafu)?;
            }
        }

        Ok(0)
    }

    fn set_enabled(&mut self, source: Rc<dyn Source>, state: EventState) -> Result<i32> {
        let token = source.token();
        match self.state.get(&token) {
            None => return UnknownSourceSnafu { token }.fail(),
            Some(current) if current.state == state => return Ok(0),
            Some(_) => {}
        }

        match state {
            EventState::OneShot => {
                self.timerfd_open()?;
                self.timer.push(source);
            }
            EventState::Off => {
                self.timer.remove(&source);
                self.pending.retain(|s| s.token() != token);
            }
        }

        if let Some(current) = self.state.get_mut(&token) {
            current.state = state;
            if state == EventState::Off {
                current.in_pending = false;
            }
        }

        Ok(0)
    }

    fn timerfd_open(&mut self) -> Result<RawFd> {
        if let Some(fd) = self.timerfd {
            return Ok(fd);
        }

        let fd = crate::syscall!(timerfd_create(
            libc::CLOCK_MONOTONIC,
            libc::TFD_NONBLOCK | libc::TFD_CLOEXEC,
        ))?;
        if let Err(e) = self.poller.register(fd, TIMERFD_TOKEN) {
            let _ = unistd::close(fd);
            return Err(e);
        }
        self.timerfd = Some(fd);
        Ok(fd)
    }

    /// Wait for the timerfd through poller
    /// And add the expired timers to the pending queue
    fn wait(&mut self, timeout: i32) -> Result<bool> {
        let events = self.poller.poll(timeout)?;

        if let Some(next) = self.timer.next() {
            let now = timer::now_usec();
            if now >= next {
                self.flush_timer()?;
                self.pending_expired(now);
            }
        }

        Ok(!self.pending_is_empty() || !events.is_empty())
    }

    /// Queue timers that already expired and arm the timerfd for the rest.
    /// Returns true when something is ready without waiting.
    fn prepare(&mut self) -> Result<bool> {
        if let Some(next) = self.timer.next() {
            let now = timer::now_usec();
            if now >= next {
                self.pending_expired(now);
            } else if let Some(fd) = self.timerfd {
                let new_value = timer::timer_stored(next);
                crate::syscall!(timerfd_settime(
                    fd,
                    libc::TFD_TIMER_ABSTIME,
                    &new_value,
                    std::ptr::null_mut(),
                ))?;
            }
        }

        Ok(!self.pending_is_empty())
    }

    fn pending_expired(&mut self, now: u64) {
        while let Some(source) = self.timer.pop(now) {
            self.pending_push(source);
        }
    }

    fn pending_pop(&mut self) -> Option<Rc<dyn Source>> {
        let top = self.pending.pop()?;
        if let Some(state) = self.state.get_mut(&top.token()) {
            state.in_pending = false;
        }
        Some(top)
    }

    fn pending_push(&mut self, source: Rc<dyn Source>) {
        if let Some(current) = self.state.get_mut(&source.token()) {
            if !current.in_pending {
                self.pending.push(source);
                current.in_pending = true;
            }
        }
    }

    fn source_state(&self, token: u64) -> Option<EventState> {
        self.state.get(&token).map(|s| s.state)
    }

    fn pending_is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn flush_timer(&self) -> Result<()> {
        let timer_fd = match self.timerfd {
            None => return Ok(()),
            Some(fd) => fd,
        };
        match unistd::read(timer_fd, &mut [0u8; 8]) {
            Ok(_) | Err(nix::errno::Errno::EAGAIN) | Err(nix::errno::Errno::EINTR) => Ok(()),
            Err(e) => Err(Error::Nix { source: e }),
        }
    }

    fn clear(&mut self) {
        self.sources.clear();
        self.pending.clear();
        self.state.clear();
        self.timer.clear();
        if let Some(fd) = self.timerfd.take() {
            if let Err(e) = unistd::close(fd) {
                log::warn!("Failed to close timerfd {}: {}", fd, e);
            }
        }
    }
}
