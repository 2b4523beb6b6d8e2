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

//! epoll wrapper used to wait on the per-clock timerfds
use crate::error::*;
use nix::sys::epoll::{
    epoll_create1, epoll_ctl, epoll_wait, EpollCreateFlags, EpollEvent, EpollFlags, EpollOp,
};
use snafu::ResultExt;
use std::cmp::max;
use std::os::unix::io::{AsRawFd, RawFd};

/// Wrap a raw libc call, turning a negative return into [`Error::Syscall`]
#[macro_export]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res < 0 {
            $crate::Result::Err($crate::Error::Syscall {
                syscall: stringify!($fn),
                errno: nix::errno::Errno::last() as i32,
                ret: res as i32,
            })
        } else {
            $crate::Result::Ok(res)
        }
    }};
}

#[derive(Debug)]
pub struct Poll {
    epoll_fd: RawFd,
    n_sources: usize,
}

impl Poll {
    /// create a new poller
    pub fn new() -> Result<Poll> {
        let epoll_fd = epoll_create1(EpollCreateFlags::EPOLL_CLOEXEC).context(NixSnafu)?;
        Ok(Poll {
            epoll_fd,
            n_sources: 0,
        })
    }

    /// wait at most `timeout` milliseconds, -1 blocks until an fd is ready
    pub fn poll(&self, timeout: i32) -> Result<Vec<EpollEvent>> {
        let size = max(self.n_sources, 1);
        let mut events = vec![EpollEvent::empty(); size];

        let n_ready = match epoll_wait(self.epoll_fd, &mut events, timeout as isize) {
            Ok(n) => n,
            // a signal interrupted the wait, report nothing ready
            Err(nix::errno::Errno::EINTR) => 0,
            Err(e) => return Err(Error::Nix { source: e }),
        };
        events.truncate(n_ready);

        Ok(events)
    }

    /// register the fd to the poller, `token` comes back in the ready event
    pub fn register(&mut self, fd: RawFd, token: u64) -> Result<()> {
        let mut event = EpollEvent::new(EpollFlags::EPOLLIN, token);
        epoll_ctl(self.epoll_fd, EpollOp::EpollCtlAdd, fd, &mut event).context(NixSnafu)?;
        self.n_sources += 1;
        Ok(())
    }

    /// unregister the fd from the poller
    pub fn unregister(&mut self, fd: RawFd) -> Result<()> {
        epoll_ctl(
            self.epoll_fd,
            EpollOp::EpollCtlDel,
            fd,
            None::<&mut EpollEvent>,
        )
        .context(NixSnafu)?;
        self.n_sources = self.n_sources.saturating_sub(1);
        Ok(())
    }
}

impl Drop for Poll {
    fn drop(&mut self) {
        let _ = nix::unistd::close(self.epoll_fd);
    }
}

impl AsRawFd for Poll {
    fn as_raw_fd(&self) -> RawFd {
        self.epoll_fd
    }
}

#[cfg(test)]
mod test {
    use super::Poll;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn epoll_new() {
        let poll = Poll::new().unwrap();
        assert!(poll.as_raw_fd() > 0);
    }

    #[test]
    fn epoll_register_timerfd() {
        let mut poll = Poll::new().unwrap();
        let fd = syscall!(timerfd_create(
            libc::CLOCK_MONOTONIC,
            libc::TFD_NONBLOCK | libc::TFD_CLOEXEC
        ))
        .unwrap();

        poll.register(fd, 42).unwrap();
        // nothing armed, nothing ready
        assert!(poll.poll(0).unwrap().is_empty());
        poll.unregister(fd).unwrap();
        nix::unistd::close(fd).unwrap();
    }
}
