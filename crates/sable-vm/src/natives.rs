//! Built-in native functions.
//!
//! Hosts may register more with [`crate::Vm::define_native`] before
//! execution starts; this module only provides the defaults every VM
//! carries.

use std::time::{SystemTime, UNIX_EPOCH};

use sable_core::{NativeFn, Value};

use crate::vm::Vm;

/// The default registry, installed into every new VM in order.
const NATIVES: &[(&str, u8, NativeFn)] = &[("clock", 0, clock)];

pub(crate) fn install(vm: &mut Vm) {
    for &(name, arity, handler) in NATIVES {
        vm.define_native(name, arity, handler);
    }
}

/// `clock()` - wall-clock seconds since the Unix epoch, as a number.
fn clock(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(seconds)
}
