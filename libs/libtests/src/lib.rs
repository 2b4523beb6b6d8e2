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

//! Helpers shared by the unit and integration tests of the workspace
use log::{LevelFilter, Log, Metadata, Record};
use std::{
    env,
    io::{self, ErrorKind, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

/// Workspace root: the closest ancestor of the working directory holding a
/// `Cargo.lock`
pub fn get_project_root() -> io::Result<PathBuf> {
    let cwd = env::current_dir()?;
    for dir in cwd.ancestors() {
        if dir.join("Cargo.lock").is_file() {
            return Ok(dir.to_path_buf());
        }
    }

    Err(io::Error::new(ErrorKind::NotFound, "Cargo.lock not found"))
}

/// Root directory of this helper crate
pub fn get_crate_root() -> io::Result<PathBuf> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Ok(PathBuf::from(manifest_dir))
}

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let module_path = record.module_path().unwrap_or("unknown");
        let mut stdout = io::stdout();
        let _ = writeln!(
            stdout,
            "{}{} {} {}",
            now_str(),
            record.level(),
            module_path,
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn now_str() -> String {
    let time: libc::time_t = unsafe { libc::time(std::ptr::null_mut()) };
    let mut tm = std::mem::MaybeUninit::<libc::tm>::zeroed();
    if unsafe { libc::localtime_r(&time, tm.as_mut_ptr()) }.is_null() {
        return String::new();
    }
    let now = unsafe { tm.assume_init() };
    format!(
        "{:0>4}-{:0>2}-{:0>2} {:0>2}:{:0>2}:{:0>2} ",
        now.tm_year + 1900, /* tm_year is years since 1900 */
        now.tm_mon + 1,     /* tm_mon is months since Jan: [0, 11] */
        now.tm_mday,
        now.tm_hour,
        now.tm_min,
        now.tm_sec
    )
}

/// Install a console logger at debug level. Safe to call from every test,
/// only the first call installs it.
pub fn init_test_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

/// Call `step` until `done` holds or `timeout` elapses.
/// Returns whether `done` was reached.
pub fn run_until<S, D>(timeout: Duration, mut step: S, mut done: D) -> bool
where
    S: FnMut(),
    D: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        step();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_get_crate_root() {
        let mut file_path = get_crate_root().unwrap();
        file_path.push("Cargo.toml");

        assert!(file_path.is_file());
    }

    #[test]
    fn test_get_project_root() {
        let root = get_project_root().unwrap();
        assert!(root.join("Cargo.lock").is_file());
        assert!(get_crate_root().unwrap().starts_with(&root));
    }

    #[test]
    fn test_init_test_logger_twice() {
        init_test_logger();
        init_test_logger();
        log::debug!("logger installed");
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_run_until_reached() {
        let n = Cell::new(0);
        assert!(run_until(
            Duration::from_secs(1),
            || n.set(n.get() + 1),
            || n.get() == 3
        ));
        assert_eq!(n.get(), 3);
    }

    #[test]
    fn test_run_until_timeout() {
        assert!(!run_until(Duration::from_millis(5), || {}, || false));
    }
}
