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

//! The [`Source`] trait implemented by everything the loop schedules.
//!
//! Sources are identified by their token: two sources with the same token
//! compare equal and hash alike. In the pending queue a lower priority value
//! is dispatched first.
use crate::Events;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A schedulable event source
pub trait Source {
    /// monotonic delay in useconds, counted from the moment the source is
    /// enabled
    fn time_relative(&self) -> u64;

    /// identity of the source, unique among the sources of one loop
    fn token(&self) -> u64;

    /// dispatch order among ready sources, lower runs first
    fn priority(&self) -> i8;

    /// run the source; the loop is not borrowed, so sources may be added,
    /// enabled or deleted from here
    fn dispatch(&self, event: &Events) -> i32;

    /// shown in debug output
    fn description(&self) -> String {
        String::from("default")
    }
}

impl Hash for dyn Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token().hash(state);
    }
}

impl PartialEq for dyn Source {
    fn eq(&self, other: &dyn Source) -> bool {
        self.token() == other.token()
    }
}

impl Eq for dyn Source {}

// BinaryHeap is a max-heap, invert so the lowest priority value pops first
impl Ord for dyn Source {
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority().cmp(&self.priority())
    }
}

impl PartialOrd for dyn Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for dyn Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("token", &self.token())
            .field("usec", &self.time_relative())
            .field("priority", &self.priority())
            .field("description", &self.description())
            .finish()
    }
}
