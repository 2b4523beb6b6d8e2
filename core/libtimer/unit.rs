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

//! Wrapping a unit with a timer and mounting instances of it.
//!
//! [`with_timer`] validates the static configuration once; the returned
//! [`WithTimer`] wraps any number of [`Unit`] types, and every
//! [`TimedUnit::mount`] yields an independent [`Mounted`] instance with its
//! own [`TimerController`].
use crate::config::{StaticConfig, TimerConfig};
use crate::controller::TimerController;
use crate::error::*;
use crate::props::Props;
use event::Events;
use std::fmt;
use std::rc::Rc;

/// The wrapped consumer of props
pub trait Unit {
    /// consume the merged props: injected callbacks overlaid by the
    /// instance props
    fn render(&self, props: &Props);
}

/// Host lifecycle hooks of a mounted instance
pub trait Lifecycle {
    /// the instance became live
    fn on_attach(&self) -> Result<()>;

    /// the instance is going away
    fn on_detach(&self);
}

/// A validated timer configuration, ready to wrap units
#[derive(Clone, Debug)]
pub struct WithTimer {
    config: Rc<StaticConfig>,
}

/// validate `config` and build a wrapper sharing it
pub fn with_timer(config: TimerConfig) -> Result<WithTimer> {
    let config = StaticConfig::from_config(config)?;
    log::debug!("withTimer() configured: {:?}", config);
    Ok(WithTimer {
        config: Rc::new(config),
    })
}

impl WithTimer {
    /// wrap `unit`, every instance of it will carry a timer
    pub fn wrap<U: Unit>(&self, unit: U) -> TimedUnit<U> {
        TimedUnit {
            config: Rc::clone(&self.config),
            unit: Rc::new(unit),
        }
    }

    /// the validated configuration
    pub fn config(&self) -> &StaticConfig {
        &self.config
    }
}

/// A unit type wrapped with a timer
pub struct TimedUnit<U> {
    config: Rc<StaticConfig>,
    unit: Rc<U>,
}

impl<U> fmt::Debug for TimedUnit<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedUnit")
            .field("config", &self.config)
            .finish()
    }
}

impl<U: Unit> TimedUnit<U> {
    /// create an instance whose timer runs on `events`; invalid `delay` or
    /// `onTimeout` props are rejected
    pub fn mount(&self, events: &Rc<Events>, props: Props) -> Result<Mounted<U>> {
        let controller = TimerController::new(events, &self.config, props)?;
        Ok(Mounted {
            unit: Rc::clone(&self.unit),
            controller,
            start_on_attach: self.config.start_on_attach(),
        })
    }

    /// the validated configuration
    pub fn config(&self) -> &StaticConfig {
        &self.config
    }
}

/// One live instance of a wrapped unit
pub struct Mounted<U> {
    unit: Rc<U>,
    controller: TimerController,
    start_on_attach: bool,
}

impl<U> fmt::Debug for Mounted<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mounted")
            .field("controller", &self.controller)
            .field("start_on_attach", &self.start_on_attach)
            .finish()
    }
}

impl<U: Unit> Mounted<U> {
    /// the instance's timer
    pub fn controller(&self) -> &TimerController {
        &self.controller
    }

    /// the wrapped unit
    pub fn unit(&self) -> &U {
        &self.unit
    }

    /// hand the merged props to the unit
    pub fn render(&self) {
        let props = self.controller.merged_props();
        self.unit.render(&props);
    }

    /// replace the instance props and render again
    pub fn set_props(&self, props: Props) -> Result<()> {
        self.controller.set_props(props)?;
        self.render();
        Ok(())
    }
}

impl<U: Unit> Lifecycle for Mounted<U> {
    fn on_attach(&self) -> Result<()> {
        if self.start_on_attach {
            self.controller.start(None)?;
        }
        Ok(())
    }

    fn on_detach(&self) {
        self.controller.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CallbackKind, START_ON_MOUNT};
    use crate::props::Value;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Recorder {
        renders: RefCell<Vec<Props>>,
    }

    impl Unit for Recorder {
        fn render(&self, props: &Props) {
            self.renders.borrow_mut().push(props.clone());
        }
    }

    #[test]
    fn test_invalid_config_fails_at_wrap() {
        let err = with_timer(TimerConfig::new().delay(-1.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "withTimer() delay must be >= 0. Current value: -1"
        );
    }

    #[test]
    fn test_mount_rejects_bad_props() {
        let events = Rc::new(Events::new().unwrap());
        let timed = with_timer(TimerConfig::new()).unwrap().wrap(Recorder::default());
        assert!(timed
            .mount(&events, Props::new().with("delay", -1.0))
            .unwrap_err()
            .is_config());
        assert!(timed.mount(&events, Props::new()).is_ok());
    }

    #[test]
    fn test_mounted_debug() {
        let events = Rc::new(Events::new().unwrap());
        let timed = with_timer(TimerConfig::new().delay(10.0).on_timeout(|_| {}))
            .unwrap()
            .wrap(Recorder::default());
        assert!(format!("{:?}", timed).starts_with("TimedUnit { config: StaticConfig {"));

        let mounted = timed
            .mount(&events, Props::new().with("title", "hello"))
            .unwrap();
        let idle = format!("{:?}", mounted);
        assert!(idle.starts_with("Mounted { controller: TimerController { timer: None"));
        assert!(idle.contains("title"));
        assert!(idle.ends_with("start_on_attach: false }"));

        mounted.controller().start(None).unwrap();
        assert!(format!("{:?}", mounted).contains("timer: Some("));
    }

    #[test]
    fn test_render_merges_props() {
        let events = Rc::new(Events::new().unwrap());
        let timed = with_timer(TimerConfig::new().passed_props(&[CallbackKind::Reset]))
            .unwrap()
            .wrap(Recorder::default());
        let mounted = timed
            .mount(&events, Props::new().with("title", "hello"))
            .unwrap();

        mounted.render();
        mounted
            .set_props(Props::new().with("title", "again"))
            .unwrap();

        let renders = mounted.unit().renders.borrow();
        assert_eq!(renders.len(), 2);
        assert_eq!(renders[0].names().collect::<Vec<_>>(), ["resetTimer", "title"]);
        assert_eq!(
            renders[1].get("title").and_then(Value::as_text),
            Some("again")
        );
        assert!(renders[1].callback("resetTimer").is_some());
    }

    #[test]
    fn test_attach_without_start_on_mount() {
        let events = Rc::new(Events::new().unwrap());
        let timed = with_timer(TimerConfig::new().delay(10.0).on_timeout(|_| {}))
            .unwrap()
            .wrap(Recorder::default());
        let mounted = timed.mount(&events, Props::new()).unwrap();
        mounted.on_attach().unwrap();
        assert!(!mounted.controller().is_armed());
    }

    #[test]
    fn test_attach_detach() {
        let events = Rc::new(Events::new().unwrap());
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let timed = with_timer(
            TimerConfig::new()
                .delay(0.0)
                .on_timeout(move |_| h.set(h.get() + 1))
                .option(START_ON_MOUNT, true),
        )
        .unwrap()
        .wrap(Recorder::default());

        let mounted = timed.mount(&events, Props::new()).unwrap();
        mounted.on_attach().unwrap();
        assert!(mounted.controller().is_armed());
        mounted.on_detach();
        assert!(!mounted.controller().is_armed());

        events.run(20).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_attach_propagates_errors() {
        let events = Rc::new(Events::new().unwrap());
        let timed = with_timer(TimerConfig::new().option(START_ON_MOUNT, true))
            .unwrap()
            .wrap(Recorder::default());
        let mounted = timed.mount(&events, Props::new()).unwrap();
        assert!(mounted.on_attach().unwrap_err().is_config());
        assert!(!mounted.controller().is_armed());
    }

    #[test]
    fn test_instances_are_independent() {
        let events = Rc::new(Events::new().unwrap());
        let wrapper = with_timer(TimerConfig::new().delay(10_000.0).on_timeout(|_| {})).unwrap();
        let timed = wrapper.wrap(Recorder::default());
        let a = timed.mount(&events, Props::new()).unwrap();
        let b = timed.mount(&events, Props::new()).unwrap();

        a.controller().start(None).unwrap();
        assert!(a.controller().is_armed());
        assert!(!b.controller().is_armed());
        assert_eq!(timed.config().default_delay(), Some(10_000.0));
    }
}
