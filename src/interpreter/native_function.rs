use std::rc::Rc;

use crate::interpreter::value::{NativeFunction, Value};

/// Host callables the embedder installs into the top-level environment
/// before evaluation.
pub fn all_native_functions() -> Vec<(&'static str, Value)> {
    vec![("print", native_print())]
}

fn native_print() -> Value {
    Value::NativeFn(Rc::new(NativeFunction {
        name: Rc::from("print"),
        arity: Some(1),
        func: |args| {
            println!("{}", args[0]);
            Ok(args[0].clone())
        },
    }))
}
