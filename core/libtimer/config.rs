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

//! Static configuration of a wrapped unit type: the raw [`TimerConfig`] a
//! caller hands to `with_timer`, the validated [`StaticConfig`] built from it,
//! and [`TimerOptions`] for reading the same options from a TOML file.
#![allow(non_snake_case)]
use crate::error::*;
use crate::props::{TimeoutHandler, Value};
use crate::validate::{
    check_boolean_option, check_delay, check_on_timeout, check_prop_name, parse_passed_props,
};
use bitflags::bitflags;
use confique::Config;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// default location of the options file
pub const TIMER_CONFIG: &str = "/etc/withtimer/timer.toml";

/// option naming the prop `cancel` is injected under
pub const CANCEL_PROP_NAME: &str = "cancelPropName";
/// option naming the prop `finish` is injected under
pub const FINISH_PROP_NAME: &str = "finishPropName";
/// option naming the prop `reset` is injected under
pub const RESET_PROP_NAME: &str = "resetPropName";
/// option naming the prop `start` is injected under
pub const START_PROP_NAME: &str = "startPropName";
/// option listing the callbacks to inject
pub const PASSED_PROPS: &str = "passedProps";
/// option arming the timer when the instance attaches
pub const START_ON_MOUNT: &str = "startOnMount";

/// The timer operations that can be injected into the wrapped unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallbackKind {
    /// cancel the pending timer
    Cancel,
    /// cancel and fire immediately
    Finish,
    /// cancel and arm again
    Reset,
    /// arm the timer
    Start,
}

/// Every callback, in injection order
pub const CALLBACK_METHODS: [CallbackKind; 4] = [
    CallbackKind::Cancel,
    CallbackKind::Finish,
    CallbackKind::Reset,
    CallbackKind::Start,
];

bitflags! {
    /// A set of [`CallbackKind`]
    pub struct CallbackSet: u8 {
        /// cancel
        const CANCEL = 1 << 0;
        /// finish
        const FINISH = 1 << 1;
        /// reset
        const RESET = 1 << 2;
        /// start
        const START = 1 << 3;
    }
}

impl CallbackKind {
    /// name used in `passedProps`
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackKind::Cancel => "cancel",
            CallbackKind::Finish => "finish",
            CallbackKind::Reset => "reset",
            CallbackKind::Start => "start",
        }
    }

    /// option holding the prop name of this callback
    pub fn prop_option(&self) -> &'static str {
        match self {
            CallbackKind::Cancel => CANCEL_PROP_NAME,
            CallbackKind::Finish => FINISH_PROP_NAME,
            CallbackKind::Reset => RESET_PROP_NAME,
            CallbackKind::Start => START_PROP_NAME,
        }
    }

    /// prop name used when the option is not given
    pub fn default_prop_name(&self) -> &'static str {
        match self {
            CallbackKind::Cancel => "cancelTimer",
            CallbackKind::Finish => "finishTimer",
            CallbackKind::Reset => "resetTimer",
            CallbackKind::Start => "startTimer",
        }
    }

    /// flag of this callback in a [`CallbackSet`]
    pub fn flag(&self) -> CallbackSet {
        match self {
            CallbackKind::Cancel => CallbackSet::CANCEL,
            CallbackKind::Finish => CallbackSet::FINISH,
            CallbackKind::Reset => CallbackSet::RESET,
            CallbackKind::Start => CallbackSet::START,
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallbackKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CALLBACK_METHODS
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown callback '{}'", s))
    }
}

/// Defaults applied to every option the caller leaves out
fn default_options() -> BTreeMap<String, Value> {
    let mut options = BTreeMap::new();
    for kind in CALLBACK_METHODS {
        options.insert(
            kind.prop_option().to_string(),
            Value::from(kind.default_prop_name()),
        );
    }
    options.insert(
        PASSED_PROPS.to_string(),
        Value::List(
            CALLBACK_METHODS
                .iter()
                .map(|kind| Value::from(kind.as_str()))
                .collect(),
        ),
    );
    options.insert(START_ON_MOUNT.to_string(), Value::Bool(false));
    options
}

/// Raw wrap-time configuration, validated by `with_timer`
#[derive(Clone, Debug, Default)]
pub struct TimerConfig {
    /// default delay in milliseconds
    pub delay: Option<Value>,
    /// default handler
    pub on_timeout: Option<Value>,
    /// option name to value, see the `*_PROP_NAME`, [`PASSED_PROPS`] and
    /// [`START_ON_MOUNT`] keys
    pub options: BTreeMap<String, Value>,
}

impl TimerConfig {
    /// empty configuration, every option at its default
    pub fn new() -> TimerConfig {
        TimerConfig::default()
    }

    /// set the default delay
    pub fn delay(mut self, delay: impl Into<Value>) -> TimerConfig {
        self.delay = Some(delay.into());
        self
    }

    /// set the default handler
    pub fn on_timeout<F>(mut self, f: F) -> TimerConfig
    where
        F: Fn(&crate::Props) + 'static,
    {
        self.on_timeout = Some(Value::handler(f));
        self
    }

    /// set one option
    pub fn option(mut self, name: &str, value: impl Into<Value>) -> TimerConfig {
        self.options.insert(name.to_string(), value.into());
        self
    }

    /// set `passedProps` from typed kinds
    pub fn passed_props(self, kinds: &[CallbackKind]) -> TimerConfig {
        let names: Vec<Value> = kinds.iter().map(|k| Value::from(k.as_str())).collect();
        self.option(PASSED_PROPS, Value::List(names))
    }

    /// configuration read from an options file
    pub fn from_options(options: &TimerOptions) -> TimerConfig {
        let section = &options.Timer;
        let mut config = TimerConfig {
            delay: section.DefaultDelay.map(Value::Number),
            ..TimerConfig::default()
        }
        .option(CANCEL_PROP_NAME, section.CancelPropName.as_str())
        .option(FINISH_PROP_NAME, section.FinishPropName.as_str())
        .option(RESET_PROP_NAME, section.ResetPropName.as_str())
        .option(START_PROP_NAME, section.StartPropName.as_str())
        .option(START_ON_MOUNT, section.StartOnMount);

        if let Some(passed) = &section.PassedProps {
            config = config.option(PASSED_PROPS, passed.clone());
        }
        config
    }
}

/// Validated, immutable configuration shared by every instance of one
/// wrapped unit type
pub struct StaticConfig {
    default_delay: Option<f64>,
    default_on_timeout: Option<TimeoutHandler>,
    prop_names: [String; 4],
    exposed: CallbackSet,
    start_on_attach: bool,
}

impl StaticConfig {
    /// validate `config`, filling every missing option with its default
    pub fn from_config(config: TimerConfig) -> Result<StaticConfig> {
        let TimerConfig {
            delay,
            on_timeout,
            options: given,
        } = config;

        check_delay(delay.as_ref(), false)?;
        check_on_timeout(on_timeout.as_ref(), false)?;

        let mut options = default_options();
        for (name, value) in given {
            if !options.contains_key(&name) {
                log::warn!("withTimer() ignoring unknown option '{}'", name);
                continue;
            }
            options.insert(name, value);
        }

        let mut prop_names: [String; 4] = Default::default();
        for (i, kind) in CALLBACK_METHODS.iter().enumerate() {
            let value = options.get(kind.prop_option());
            check_prop_name(value, kind.prop_option())?;
            prop_names[i] = value
                .and_then(Value::as_text)
                .unwrap_or_default()
                .to_string();
        }

        let exposed = parse_passed_props(options.get(PASSED_PROPS))?;

        let start_on_mount = options.get(START_ON_MOUNT);
        check_boolean_option(start_on_mount, START_ON_MOUNT)?;

        Ok(StaticConfig {
            default_delay: delay.as_ref().and_then(Value::as_number),
            default_on_timeout: on_timeout.as_ref().and_then(Value::as_handler).cloned(),
            prop_names,
            exposed,
            start_on_attach: start_on_mount.and_then(Value::as_bool).unwrap_or(false),
        })
    }

    /// default delay in milliseconds
    pub fn default_delay(&self) -> Option<f64> {
        self.default_delay
    }

    /// default handler
    pub fn default_on_timeout(&self) -> Option<&TimeoutHandler> {
        self.default_on_timeout.as_ref()
    }

    /// prop name `kind` is injected under, empty when it has none
    pub fn prop_name(&self, kind: CallbackKind) -> &str {
        let index = CALLBACK_METHODS
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        &self.prop_names[index]
    }

    /// callbacks injected into the wrapped unit
    pub fn exposed_callbacks(&self) -> CallbackSet {
        self.exposed
    }

    /// whether attaching an instance arms its timer
    pub fn start_on_attach(&self) -> bool {
        self.start_on_attach
    }
}

impl fmt::Debug for StaticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticConfig")
            .field("default_delay", &self.default_delay)
            .field("default_on_timeout", &self.default_on_timeout.is_some())
            .field("prop_names", &self.prop_names)
            .field("exposed", &self.exposed)
            .field("start_on_attach", &self.start_on_attach)
            .finish()
    }
}

/// Options read from a TOML file, section `[Timer]`
#[derive(Config, Default, Debug)]
pub struct TimerOptions {
    #[config(nested)]
    pub Timer: SectionTimer,
}

#[derive(Config, Debug)]
pub struct SectionTimer {
    #[config(env = "WITHTIMER_DEFAULT_DELAY")]
    pub DefaultDelay: Option<f64>,
    #[config(default = "cancelTimer")]
    pub CancelPropName: String,
    #[config(default = "finishTimer")]
    pub FinishPropName: String,
    #[config(default = "resetTimer")]
    pub ResetPropName: String,
    #[config(default = "startTimer")]
    pub StartPropName: String,
    pub PassedProps: Option<Vec<String>>,
    #[config(default = false, env = "WITHTIMER_START_ON_MOUNT")]
    pub StartOnMount: bool,
}

// same values confique fills in for a missing file
impl Default for SectionTimer {
    fn default() -> Self {
        SectionTimer {
            DefaultDelay: None,
            CancelPropName: CallbackKind::Cancel.default_prop_name().to_string(),
            FinishPropName: CallbackKind::Finish.default_prop_name().to_string(),
            ResetPropName: CallbackKind::Reset.default_prop_name().to_string(),
            StartPropName: CallbackKind::Start.default_prop_name().to_string(),
            PassedProps: None,
            StartOnMount: false,
        }
    }
}

impl TimerOptions {
    /// load the options, `file` defaults to [`TIMER_CONFIG`]; a missing file
    /// leaves every option at its default
    pub fn load(file: Option<&str>) -> Result<TimerOptions> {
        let path = file.unwrap_or(TIMER_CONFIG);
        TimerOptions::builder()
            .env()
            .file(path)
            .load()
            .context(LoadSnafu { path })
    }
}
