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

//! Error define
use snafu::prelude::*;

/// withTimer Error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// A configuration precondition was violated. Raised at wrap time for
    /// static options, or when a timer is armed or fired without a usable
    /// delay or handler.
    #[snafu(display("{}", message))]
    Config { message: String },

    /// The event loop refused to register or enable the timer source.
    #[snafu(display("Error(withtimer): event loop failure: {}", source))]
    Event { source: event::Error },

    /// The options file could not be read or parsed.
    #[snafu(display("Error(withtimer): failed to load options '{}': {}", path, source))]
    Load {
        path: String,
        source: confique::Error,
    },
}

impl Error {
    /// whether this is a configuration precondition failure
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = Error::Config {
            message: "withTimer() delay must be >= 0. Current value: -1".to_string(),
        };
        assert!(error.is_config());
        assert_eq!(
            error.to_string(),
            "withTimer() delay must be >= 0. Current value: -1"
        );
    }

    #[test]
    fn test_event_error() {
        let error = Error::Event {
            source: event::Error::UnknownSource { token: 42 },
        };
        assert!(!error.is_config());
        assert_eq!(
            error.to_string(),
            "Error(withtimer): event loop failure: Error(event): no source with token 42"
        );
    }
}
