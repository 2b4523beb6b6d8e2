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

//! Errors of the timer loop
use snafu::prelude::*;

/// Failures of the event loop
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// an epoll or fd operation failed
    #[snafu(display("Error(event): {}", source))]
    Nix { source: nix::Error },

    /// a raw libc call returned an error
    #[snafu(display("Error(event): {} failed: ret={}, errno={}", syscall, ret, errno))]
    Syscall {
        syscall: &'static str,
        ret: i32,
        errno: i32,
    },

    /// another source is already registered under this token
    #[snafu(display("Error(event): token {} is already in use", token))]
    TokenInUse { token: u64 },

    /// no source is registered under this token
    #[snafu(display("Error(event): no source with token {}", token))]
    UnknownSource { token: u64 },
}

impl Error {
    /// errno behind the failure, if it came from the kernel
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Nix { source } => Some(*source as i32),
            Error::Syscall { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;
