//! Demo coroutines
//!
//! Small, self-contained scenarios used by the `cadence demo` and
//! `cadence bench` commands. They double as worked examples of writing
//! coroutines as closure state machines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::coroutine::{from_fn, Factory, Resume, Step};
use crate::operation::{self, AsyncOperation};
use crate::types::{errors, ErrorInfo, Instruction, Task, TaskError, Val};

/* ===================== Fan-out ===================== */

/// Fans out over one sleep per latency plus the given immediate values and
/// returns the joined list.
pub fn fan_out_sleeps(latencies: Vec<u64>, immediate: Vec<Val>) -> Factory {
    Factory::new(move |_| {
        let mut items: Option<Vec<Task>> = Some(
            latencies
                .into_iter()
                .map(|ms| Task::from(operation::sleep(ms)))
                .chain(immediate.into_iter().map(|v| Task::from(operation::from(v))))
                .collect(),
        );
        from_fn(move |input| match items.take() {
            Some(items) => Step::Yield(Instruction::FanOut(items)),
            None => input.into_result().into(),
        })
    })
}

/// Tracks how many nested coroutines are between their first step and their
/// return, and the highest that count reached.
#[derive(Debug, Default, Clone)]
pub struct ActivityGauge {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ActivityGauge {
    pub fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Fans out over one nested coroutine per time; each sleeps `time` ms and
/// returns `time * 3`.
pub fn fan_out_nested(times: Vec<u64>, gauge: ActivityGauge) -> Factory {
    Factory::new(move |_| {
        let mut items: Option<Vec<Task>> = Some(
            times
                .into_iter()
                .map(|time| Task::from(sleep_then_triple(time, gauge.clone())))
                .collect(),
        );
        from_fn(move |input| match items.take() {
            Some(items) => Step::Yield(Instruction::FanOut(items)),
            None => input.into_result().into(),
        })
    })
}

fn sleep_then_triple(time: u64, gauge: ActivityGauge) -> Factory {
    Factory::new(move |_| {
        let mut waiting = false;
        from_fn(move |input| {
            if !waiting {
                waiting = true;
                gauge.enter();
                return Step::Yield(Instruction::single(operation::sleep(time)));
            }
            gauge.leave();
            match input.into_result() {
                Ok(_) => Step::Return(Val::from(time * 3)),
                Err(e) => Step::Throw(e),
            }
        })
    })
}

/* ===================== Key Lookup ===================== */

/// Pretend file read: only `/keys/foo` exists.
///
/// Missing files fail synchronously, before any operation is created.
pub fn read_file(location: &str) -> Result<AsyncOperation, TaskError> {
    if location == "/keys/foo" {
        Ok(operation::from("bar"))
    } else {
        Err(TaskError::operation(format!("could not find {}", location)))
    }
}

fn key_arg(args: &[Val]) -> String {
    args.first()
        .and_then(Val::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Looks a key up, capturing failures as data.
///
/// Returns `Null` when the key is missing.
pub fn lookup_captured() -> Factory {
    Factory::new(|args: Vec<Val>| {
        let mut lookup = Some(fetch_key_captured(key_arg(&args)));
        from_fn(move |input| match lookup.take() {
            Some(lookup) => Step::Yield(Instruction::both(lookup)),
            None => match input.into_result() {
                Ok(Val::List(pair)) if pair.len() == 2 => {
                    if pair[0].is_null() {
                        Step::Return(pair[1].clone())
                    } else {
                        Step::Return(Val::Null)
                    }
                }
                Ok(other) => Step::Throw(TaskError::raised(format!("expected a pair, got {:?}", other))),
                Err(e) => Step::Throw(e),
            },
        })
    })
}

/// Reads `/keys/<key>` after a short pause; a failed read is reported by
/// *returning* a `NotFound` error value.
fn fetch_key_captured(key: String) -> Factory {
    Factory::new(move |_| {
        let mut phase = 0u8;
        from_fn(move |input| {
            phase += 1;
            match phase {
                1 => Step::Yield(Instruction::single(operation::sleep(5))),
                2 => {
                    let read = match read_file(&format!("/keys/{}", key)) {
                        Ok(op) => op,
                        Err(e) => operation::error(e),
                    };
                    Step::Yield(Instruction::both(read))
                }
                _ => match input.into_result() {
                    Ok(Val::List(pair)) if pair.len() == 2 && pair[0].is_null() => {
                        Step::Return(pair[1].clone())
                    }
                    Ok(_) => Step::Return(Val::Error(ErrorInfo::new(errors::NOT_FOUND, "NotFound"))),
                    Err(e) => Step::Throw(e),
                },
            }
        })
    })
}

/// Looks a key up by delegating, catching any failure.
///
/// Returns `Null` when the key is missing.
pub fn lookup_delegated() -> Factory {
    Factory::new(|args: Vec<Val>| {
        let mut lookup = Some(fetch_key_raising(key_arg(&args)));
        from_fn(move |input| match lookup.take() {
            Some(lookup) => Step::Yield(Instruction::delegate(lookup)),
            // Any failure reads as a missing key
            None => Step::Return(input.into_result().unwrap_or(Val::Null)),
        })
    })
}

/// Reads `/keys/<key>` after a short pause; any failure, including the
/// synchronous one from `read_file`, is re-raised as `NotFound`.
fn fetch_key_raising(key: String) -> Factory {
    Factory::new(move |_| {
        let mut phase = 0u8;
        from_fn(move |input: Resume| {
            phase += 1;
            let not_found = || Step::Throw(TaskError::raised_with_code(errors::NOT_FOUND, "NotFound"));
            match phase {
                1 => Step::Yield(Instruction::single(operation::sleep(5))),
                2 => {
                    if input.into_result().is_err() {
                        return not_found();
                    }
                    match read_file(&format!("/keys/{}", key)) {
                        Ok(op) => Step::Yield(Instruction::single(op)),
                        Err(_) => not_found(),
                    }
                }
                _ => match input.into_result() {
                    Ok(v) => Step::Return(v),
                    Err(_) => not_found(),
                },
            }
        })
    })
}
