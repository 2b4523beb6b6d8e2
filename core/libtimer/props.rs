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

//! Dynamic property values handed between the host, the controller and the
//! wrapped unit.
use crate::controller::TimerCallback;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// instance prop overriding the default delay, in milliseconds
pub const DELAY_PROP: &str = "delay";
/// instance prop overriding the default timeout handler
pub const ON_TIMEOUT_PROP: &str = "onTimeout";

/// Called on expiry with the instance's current props
pub type TimeoutHandler = Rc<dyn Fn(&Props)>;

/// One property value
#[derive(Clone)]
pub enum Value {
    /// boolean flag
    Bool(bool),
    /// number, delays are milliseconds
    Number(f64),
    /// text
    Text(String),
    /// sequence of values
    List(Vec<Value>),
    /// a timeout handler
    Handler(TimeoutHandler),
    /// a bound timer operation injected by the controller
    Callback(TimerCallback),
}

impl Value {
    /// wrap a closure as a handler value
    pub fn handler<F>(f: F) -> Value
    where
        F: Fn(&Props) + 'static,
    {
        Value::Handler(Rc::new(f))
    }

    /// the number, if this is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// the text, if this is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// the flag, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// the injected callback, if this is one
    pub fn as_callback(&self) -> Option<&TimerCallback> {
        match self {
            Value::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// the handler, if this is one
    pub fn as_handler(&self) -> Option<&TimeoutHandler> {
        match self {
            Value::Handler(h) => Some(h),
            _ => None,
        }
    }
}

/// Render an optional value for error messages
pub(crate) fn display_value(value: Option<&Value>) -> String {
    match value {
        None => String::from("undefined"),
        Some(v) => v.to_string(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                f.write_str(&items.join(","))
            }
            Value::Handler(_) => f.write_str("[handler]"),
            Value::Callback(cb) => write!(f, "[callback {}]", cb.kind()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Handler(_) => f.write_str("Handler(..)"),
            Value::Callback(cb) => f.debug_tuple("Callback").field(&cb.kind()).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Named properties of one instance, or the props handed to the wrapped unit
#[derive(Clone, Default)]
pub struct Props {
    map: BTreeMap<String, Value>,
}

impl Props {
    /// empty props
    pub fn new() -> Props {
        Props::default()
    }

    /// builder style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Props {
        self.insert(name, value);
        self
    }

    /// builder style `onTimeout` handler
    pub fn with_on_timeout<F>(self, f: F) -> Props
    where
        F: Fn(&Props) + 'static,
    {
        self.with(ON_TIMEOUT_PROP, Value::handler(f))
    }

    /// insert or replace a prop, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.map.insert(name.into(), value.into())
    }

    /// remove a prop
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name)
    }

    /// look a prop up by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    /// whether the prop is present
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// injected callback stored under `name`
    pub fn callback(&self, name: &str) -> Option<&TimerCallback> {
        self.get(name).and_then(Value::as_callback)
    }

    /// the raw `delay` override
    pub fn delay(&self) -> Option<&Value> {
        self.get(DELAY_PROP)
    }

    /// the raw `onTimeout` override
    pub fn on_timeout(&self) -> Option<&Value> {
        self.get(ON_TIMEOUT_PROP)
    }

    /// number of props
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// whether there are no props
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// prop names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// iterate name/value pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `self` overlaid by `overlay`, the overlay wins on name collisions
    pub fn merged(&self, overlay: &Props) -> Props {
        let mut map = self.map.clone();
        for (name, value) in overlay.map.iter() {
            map.insert(name.clone(), value.clone());
        }
        Props { map }
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

impl FromIterator<(String, Value)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Props {
            map: iter.into_iter().collect(),
        }
    }
}
