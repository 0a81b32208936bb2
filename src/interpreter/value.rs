use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::environment::Environment;
use crate::parser::ast::Stmt;

/// A runtime value. Arrays, functions, classes and instances have reference
/// semantics; integers and strings compare by value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i32),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    NativeFn(Rc<NativeFunction>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

/// A user function: parameter and body nodes shared with the AST, plus the
/// environment captured at the definition site.
pub struct Function {
    pub name: Rc<str>,
    pub params: Rc<[String]>,
    pub body: Rc<Stmt>,
    pub env: Rc<Environment>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body", &"<stmt>")
            .field("env", &"<env>")
            .finish()
    }
}

#[derive(Debug)]
pub struct NativeFunction {
    pub name: Rc<str>,
    pub arity: Option<usize>,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

/// A class definition value. Instantiation runs `body` against a fresh
/// instance frame; `env` is the environment the class was declared in.
pub struct Class {
    pub name: Rc<str>,
    pub superclass: Option<Rc<Class>>,
    pub body: Rc<Stmt>,
    pub env: Rc<Environment>,
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name)
    }
}

/// Instance state is a private frame parented on the class's defining
/// environment; it binds `this` to the instance itself.
pub struct Instance {
    pub env: Rc<Environment>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Instance")
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::NativeFn(_) => "native function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    pub fn as_int(&self) -> Result<i32, String> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(format!("expected an integer, got {}", other.type_name())),
        }
    }

    /// The coercion view used by concatenation and string equality. Unlike
    /// Display, this fails for values that have no string form.
    pub fn as_str(&self) -> Result<String, String> {
        match self {
            Value::Int(value) => Ok(value.to_string()),
            Value::Str(value) => Ok(value.to_string()),
            Value::Array(elements) => {
                let elements = elements.borrow();
                let mut parts = Vec::with_capacity(elements.len());
                for element in elements.iter() {
                    parts.push(element.as_str()?);
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
            Value::Class(class) => Ok(format!("[class {}]", class.name)),
            other => Err(format!("cannot convert {} to a string", other.type_name())),
        }
    }

    pub fn get_index(&self, index: &Value) -> Result<Value, String> {
        match self {
            Value::Array(elements) => {
                let elements = elements.borrow();
                let index = index.as_int()?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| elements.get(i).cloned())
                    .ok_or_else(|| {
                        format!(
                            "index {} out of bounds for array of length {}",
                            index,
                            elements.len()
                        )
                    })
            }
            other => Err(format!("cannot index into {}", other.type_name())),
        }
    }

    pub fn set_index(&self, index: &Value, value: Value) -> Result<(), String> {
        match self {
            Value::Array(elements) => {
                let mut elements = elements.borrow_mut();
                let len = elements.len();
                let index = index.as_int()?;
                let slot = match usize::try_from(index) {
                    Ok(i) => elements.get_mut(i),
                    Err(_) => None,
                };
                match slot {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(format!(
                        "index {} out of bounds for array of length {}",
                        index, len
                    )),
                }
            }
            other => Err(format!("cannot index into {}", other.type_name())),
        }
    }

    pub fn get_member(&self, name: &str) -> Result<Value, String> {
        match self {
            Value::Instance(instance) => instance
                .env
                .get_local(name)
                .ok_or_else(|| format!("undefined member '{}'", name)),
            Value::Class(class) => Err(format!("class '{}' has no member '{}'", class.name, name)),
            other => Err(format!(
                "cannot access member '{}' on {}",
                name,
                other.type_name()
            )),
        }
    }

    pub fn set_member(&self, name: &str, value: Value) -> Result<(), String> {
        match self {
            Value::Instance(instance) => {
                instance.env.put(name, value);
                Ok(())
            }
            other => Err(format!(
                "cannot assign member '{}' on {}",
                name,
                other.type_name()
            )),
        }
    }

    /// Reference identity for the shared variants; everything else is
    /// never "the same object".
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFn(a), Value::NativeFn(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Str(value) => write!(f, "{}", value),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match element {
                        // String elements print quoted so `[1, "2"]` stays
                        // distinguishable from `[1, 2]`.
                        Value::Str(s) => write!(f, "{:?}", s)?,
                        _ => write!(f, "{}", element)?,
                    }
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<fn {}>", function.name),
            Value::NativeFn(native) => write!(f, "<native fn {}>", native.name),
            Value::Class(class) => write!(f, "[class {}]", class.name),
            Value::Instance(_) => write!(f, "<instance>"),
        }
    }
}
