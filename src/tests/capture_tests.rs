//! Tests for capture-both waits

use super::helpers::{run_and_wait, run_sync};
use crate::coroutine::{from_fn, returning, Factory, Step};
use crate::operation;
use crate::types::{Instruction, Task, TaskError, Val};
use maplit::hashmap;

/// Coroutine that captures `left` then `right` and returns both pairs.
fn capture_pair(left: Task, right: Task) -> Factory {
    Factory::new(move |_| {
        let mut pending = vec![right, left];
        let mut pairs = Vec::new();
        let mut started = false;
        from_fn(move |input| {
            if started {
                match input.into_result() {
                    Ok(pair) => pairs.push(pair),
                    // Capture never throws
                    Err(e) => return Step::Throw(e),
                }
            }
            started = true;
            match pending.pop() {
                Some(task) => Step::Yield(Instruction::CaptureBoth(task)),
                None => {
                    let right = pairs.pop().unwrap_or(Val::Null);
                    let left = pairs.pop().unwrap_or(Val::Null);
                    Step::Return(Val::Obj(hashmap! {
                        "left".to_string() => left,
                        "right".to_string() => right,
                    }))
                }
            }
        })
    })
}

fn field<'a>(val: &'a Val, name: &str) -> &'a [Val] {
    match val {
        Val::Obj(map) => map[name].as_list().expect("Expected a pair"),
        other => panic!("Expected Obj, got {:?}", other),
    }
}

#[test]
fn test_capture_both_over_operations() {
    let factory = capture_pair(
        operation::error(TaskError::operation("oops")).into(),
        operation::from("correct").into(),
    );

    let value = run_sync(factory, vec![]).unwrap();

    let left = field(&value, "left");
    assert_eq!(left.len(), 2);
    assert_eq!(left[0].as_error().unwrap().message, "oops");
    assert_eq!(left[1], Val::Null);

    assert_eq!(field(&value, "right"), &[Val::Null, Val::from("correct")][..]);
}

#[test]
fn test_capture_both_over_async_operations() {
    let factory = capture_pair(
        operation::delayed_error(5, TaskError::operation("late oops")).into(),
        operation::sleep(5).into(),
    );

    let value = run_and_wait(factory, vec![]).unwrap();

    let left = field(&value, "left");
    assert_eq!(left[0].as_error().unwrap().message, "late oops");
    assert_eq!(left[1], Val::Null);
    assert_eq!(field(&value, "right"), &[Val::Null, Val::Num(5.0)][..]);
}

#[test]
fn test_capture_both_over_coroutines() {
    let raising = Factory::new(|_| {
        let mut waiting = false;
        from_fn(move |_| {
            if !waiting {
                waiting = true;
                return Step::Yield(Instruction::single(operation::sleep(5)));
            }
            Step::Throw(TaskError::raised("raised in nested coroutine"))
        })
    });
    let returning_value = Factory::new(|_| returning(42));

    let value = run_and_wait(capture_pair(raising.into(), returning_value.into()), vec![]).unwrap();

    let left = field(&value, "left");
    assert_eq!(left[0].as_error().unwrap().message, "raised in nested coroutine");
    assert_eq!(left[1], Val::Null);
    assert_eq!(field(&value, "right"), &[Val::Null, Val::Num(42.0)][..]);
}

#[test]
fn test_capture_both_over_synchronously_raising_coroutine() {
    // A nested run never escapes through its parent's call frame
    let raising = Factory::new(|_| crate::coroutine::failing(TaskError::raised("sync raise")));

    let value = run_sync(
        capture_pair(raising.into(), operation::from(1).into()),
        vec![],
    )
    .unwrap();

    assert_eq!(
        field(&value, "left")[0].as_error().unwrap().message,
        "sync raise"
    );
}
