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

//! Precondition checks for static options and per-instance overrides.
//!
//! Every check receives the raw value (or `None` when the value is absent)
//! and fails with [`Error::Config`](crate::Error::Config) naming the option
//! and its current value.
use crate::config::{CallbackKind, CallbackSet, CALLBACK_METHODS};
use crate::error::*;
use crate::props::{display_value, TimeoutHandler, Value};

fn config_error<T>(message: String) -> Result<T> {
    ConfigSnafu { message }.fail()
}

/// `delay` must be a number >= 0, or absent when not required
pub fn check_delay(value: Option<&Value>, required: bool) -> Result<()> {
    if !required && value.is_none() {
        return Ok(());
    }
    required_delay(value).map(|_| ())
}

/// `onTimeout` must be a handler, or absent when not required
pub fn check_on_timeout(value: Option<&Value>, required: bool) -> Result<()> {
    if !required && value.is_none() {
        return Ok(());
    }
    required_handler(value).map(|_| ())
}

/// prop name options must be text when present
pub fn check_prop_name(value: Option<&Value>, option: &str) -> Result<()> {
    match value {
        None | Some(Value::Text(_)) => Ok(()),
        Some(_) => config_error(format!(
            "withTimer() {} option must be of type string. Current value: {}",
            option,
            display_value(value)
        )),
    }
}

/// `passedProps` must be a list naming only known callbacks
pub fn check_passed_props(value: Option<&Value>) -> Result<()> {
    parse_passed_props(value).map(|_| ())
}

/// boolean options must be strictly boolean
pub fn check_boolean_option(value: Option<&Value>, option: &str) -> Result<()> {
    match value {
        Some(Value::Bool(_)) => Ok(()),
        _ => config_error(format!(
            "withTimer() {} option is not a boolean. Current value: {}",
            option,
            display_value(value)
        )),
    }
}

/// the delay in milliseconds, failing unless it is a number >= 0
pub(crate) fn required_delay(value: Option<&Value>) -> Result<f64> {
    match value {
        // NaN fails the comparison
        Some(Value::Number(n)) if *n >= 0.0 => Ok(*n),
        _ => config_error(format!(
            "withTimer() delay must be >= 0. Current value: {}",
            display_value(value)
        )),
    }
}

/// the handler, failing unless one is present
pub(crate) fn required_handler(value: Option<&Value>) -> Result<TimeoutHandler> {
    match value {
        Some(Value::Handler(h)) => Ok(h.clone()),
        _ => config_error(format!(
            "withTimer() onTimeout must be a function. Current value: {}",
            display_value(value)
        )),
    }
}

/// the exposed callback set named by a `passedProps` list
pub(crate) fn parse_passed_props(value: Option<&Value>) -> Result<CallbackSet> {
    let invalid = || {
        config_error(format!(
            "withTimer() passedProps option contains an invalid value. Valid values: {}. Current value: {}",
            CALLBACK_METHODS
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(","),
            display_value(value)
        ))
    };

    let items = match value {
        Some(Value::List(items)) => items,
        _ => return invalid(),
    };

    let mut set = CallbackSet::empty();
    for item in items {
        match item.as_text().and_then(|s| s.parse::<CallbackKind>().ok()) {
            Some(kind) => set |= kind.flag(),
            None => return invalid(),
        }
    }
    Ok(set)
}
