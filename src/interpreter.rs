pub mod environment;
pub mod native_function;
pub mod value;

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;
use thiserror::Error;

use crate::interpreter::environment::Environment;
use crate::interpreter::value::{Class, Function, Instance, Value};
use crate::parser::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};

#[derive(Debug, Clone, Error)]
#[error("evaluate error at line {line}: {message}")]
pub struct EvaluateError {
    pub line: usize,
    pub message: String,
}

fn fault(line: usize, message: impl Into<String>) -> EvaluateError {
    EvaluateError {
        line,
        message: message.into(),
    }
}

type EvalResult = Result<Value, EvaluateError>;

/// Walks the AST against an explicit environment chain. The evaluator
/// itself holds no state between top-level statements.
#[derive(Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Runs the program's statements in order; the result is the value of
    /// the last one (null for an empty program).
    pub fn evaluate(&self, program: &Program, env: &Rc<Environment>) -> EvalResult {
        let mut last = Value::Null;
        for statement in &program.statements {
            last = self.execute(statement, env)?;
        }
        Ok(last)
    }

    fn execute(&self, statement: &Stmt, env: &Rc<Environment>) -> EvalResult {
        match &statement.kind {
            StmtKind::Compound(statements) => {
                let mut last = Value::Null;
                for statement in statements {
                    last = self.execute(statement, env)?;
                }
                Ok(last)
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let chosen = self.eval_condition(condition, env)?;
                if chosen {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(Value::Null)
                }
            }

            StmtKind::While { condition, body } => {
                let mut last = Value::Null;
                while self.eval_condition(condition, env)? {
                    last = self.execute(body, env)?;
                }
                Ok(last)
            }

            StmtKind::Procedure { name, params, body } => {
                let function = Value::Function(Rc::new(Function {
                    name: Rc::from(name.as_str()),
                    params: params.clone(),
                    body: body.clone(),
                    env: env.clone(),
                }));
                env.put(name.clone(), function.clone());
                Ok(function)
            }

            StmtKind::Class {
                name,
                superclass,
                body,
            } => {
                let superclass = match superclass {
                    Some(super_name) => match env.get(super_name) {
                        Some(Value::Class(class)) => Some(class),
                        Some(other) => {
                            return Err(fault(
                                statement.line,
                                format!("'{}' is not a class, it is {}", super_name, other.type_name()),
                            ));
                        }
                        None => {
                            return Err(fault(
                                statement.line,
                                format!("unknown superclass '{}'", super_name),
                            ));
                        }
                    },
                    None => None,
                };
                let class = Value::Class(Rc::new(Class {
                    name: Rc::from(name.as_str()),
                    superclass,
                    body: body.clone(),
                    env: env.clone(),
                }));
                env.put(name.clone(), class.clone());
                Ok(class)
            }

            StmtKind::Expr(expr) => self.eval(expr, env),
        }
    }

    fn eval(&self, expression: &Expr, env: &Rc<Environment>) -> EvalResult {
        let line = expression.line;
        match &expression.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Str(value) => Ok(Value::Str(Rc::from(value.as_str()))),

            // An unbound name reads as null and fails on its first coercion.
            ExprKind::Identifier(name) => Ok(env.get(name).unwrap_or(Value::Null)),

            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, env)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }

            ExprKind::Closure { params, body } => Ok(Value::Function(Rc::new(Function {
                name: Rc::from("fun"),
                params: params.clone(),
                body: body.clone(),
                env: env.clone(),
            }))),

            ExprKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => {
                let value = self.eval(operand, env)?;
                let value = value.as_int().map_err(|message| fault(line, message))?;
                Ok(Value::Int(value.wrapping_neg()))
            }

            ExprKind::Binary {
                op: BinaryOp::Assign,
                left,
                right,
            } => {
                let value = self.eval(right, env)?;
                self.assign(left, value, env)
            }

            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                self.eval_binary(*op, left, right, line)
            }

            ExprKind::Call { callee, arguments } => {
                let callee = self.eval(callee, env)?;
                let mut values: SmallVec<[Value; 4]> = SmallVec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.eval(argument, env)?);
                }
                self.invoke(&callee, &values, line)
            }

            ExprKind::Index { operand, index } => {
                let index = self.eval(index, env)?;
                let operand = self.eval(operand, env)?;
                operand
                    .get_index(&index)
                    .map_err(|message| fault(line, message))
            }

            ExprKind::Member { operand, name } => {
                let operand = self.eval(operand, env)?;
                if let (Value::Class(class), "new") = (&operand, name.as_str()) {
                    return Ok(Value::Instance(self.instantiate(class)?));
                }
                operand
                    .get_member(name)
                    .map_err(|message| fault(line, message))
            }
        }
    }

    fn eval_condition(&self, condition: &Expr, env: &Rc<Environment>) -> Result<bool, EvaluateError> {
        let value = self.eval(condition, env)?;
        let value = value
            .as_int()
            .map_err(|message| fault(condition.line, message))?;
        Ok(value != 0)
    }

    // The legal assignment targets are identifiers, members and indexed
    // elements; the right-hand side has already been evaluated once.
    fn assign(&self, target: &Expr, value: Value, env: &Rc<Environment>) -> EvalResult {
        match &target.kind {
            ExprKind::Identifier(name) => {
                env.set(name, value.clone());
                Ok(value)
            }
            ExprKind::Member { operand, name } => {
                let operand = self.eval(operand, env)?;
                operand
                    .set_member(name, value.clone())
                    .map_err(|message| fault(target.line, message))?;
                Ok(value)
            }
            ExprKind::Index { operand, index } => {
                let index = self.eval(index, env)?;
                let operand = self.eval(operand, env)?;
                operand
                    .set_index(&index, value.clone())
                    .map_err(|message| fault(target.line, message))?;
                Ok(value)
            }
            _ => Err(fault(target.line, "invalid assignment target")),
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: Value, right: Value, line: usize) -> EvalResult {
        match op {
            // Integer addition only when both sides are integers; anything
            // else concatenates the string views.
            BinaryOp::Add => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
                _ => {
                    let mut text = left.as_str().map_err(|message| fault(line, message))?;
                    text.push_str(&right.as_str().map_err(|message| fault(line, message))?);
                    Ok(Value::Str(Rc::from(text)))
                }
            },

            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let a = left.as_int().map_err(|message| fault(line, message))?;
                let b = right.as_int().map_err(|message| fault(line, message))?;
                let result = match op {
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => {
                        if b == 0 {
                            return Err(fault(line, "division by zero"));
                        }
                        a.wrapping_div(b)
                    }
                    BinaryOp::Mod => {
                        if b == 0 {
                            return Err(fault(line, "modulo by zero"));
                        }
                        a.wrapping_rem(b)
                    }
                    _ => unreachable!(),
                };
                Ok(Value::Int(result))
            }

            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let a = left.as_int().map_err(|message| fault(line, message))?;
                let b = right.as_int().map_err(|message| fault(line, message))?;
                let result = match op {
                    BinaryOp::Less => a < b,
                    BinaryOp::LessEqual => a <= b,
                    BinaryOp::Greater => a > b,
                    BinaryOp::GreaterEqual => a >= b,
                    _ => unreachable!(),
                };
                Ok(Value::Int(result as i32))
            }

            BinaryOp::Equal => Ok(Value::Int(self.values_equal(&left, &right, line)? as i32)),
            BinaryOp::NotEqual => Ok(Value::Int(!self.values_equal(&left, &right, line)? as i32)),

            BinaryOp::Assign => unreachable!("assignment is handled before operand evaluation"),
        }
    }

    // Integers compare numerically; if either side is a string, the string
    // views are compared; everything else is reference identity.
    fn values_equal(
        &self,
        left: &Value,
        right: &Value,
        line: usize,
    ) -> Result<bool, EvaluateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            _ if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
                let a = left.as_str().map_err(|message| fault(line, message))?;
                let b = right.as_str().map_err(|message| fault(line, message))?;
                Ok(a == b)
            }
            _ => Ok(left.identity_eq(right)),
        }
    }

    fn invoke(&self, callee: &Value, arguments: &[Value], line: usize) -> EvalResult {
        match callee {
            Value::Function(function) => {
                if arguments.len() != function.params.len() {
                    return Err(fault(
                        line,
                        format!(
                            "function '{}' expects {} arguments, got {}",
                            function.name,
                            function.params.len(),
                            arguments.len()
                        ),
                    ));
                }
                let call_env = Environment::with_parent(function.env.clone());
                for (param, argument) in function.params.iter().zip(arguments) {
                    call_env.put(param.clone(), argument.clone());
                }
                self.execute(&function.body, &call_env)
            }
            Value::NativeFn(native) => {
                if let Some(arity) = native.arity {
                    if arguments.len() != arity {
                        return Err(fault(
                            line,
                            format!(
                                "native function '{}' expects {} arguments, got {}",
                                native.name,
                                arity,
                                arguments.len()
                            ),
                        ));
                    }
                }
                (native.func)(arguments).map_err(|message| fault(line, message))
            }
            other => Err(fault(line, format!("{} is not callable", other.type_name()))),
        }
    }

    // `.new`: a fresh frame parented on the class's defining environment,
    // `this` bound to the instance, then the class body populates it. A
    // subclass reuses the frame its superclass just initialized.
    fn instantiate(&self, class: &Rc<Class>) -> Result<Rc<Instance>, EvaluateError> {
        let instance = match &class.superclass {
            Some(superclass) => self.instantiate(superclass)?,
            None => {
                let env = Environment::with_parent(class.env.clone());
                let instance = Rc::new(Instance { env });
                instance
                    .env
                    .put("this", Value::Instance(instance.clone()));
                instance
            }
        };
        self.run_class_body(&class.body, &instance.env)?;
        Ok(instance)
    }

    // Bindings made by the class body itself belong to the instance frame,
    // never to an enclosing scope that happens to share a name.
    fn run_class_body(&self, body: &Stmt, env: &Rc<Environment>) -> Result<(), EvaluateError> {
        match &body.kind {
            StmtKind::Compound(statements) => {
                for statement in statements {
                    match &statement.kind {
                        StmtKind::Expr(expr) => {
                            self.eval_member_init(expr, env)?;
                        }
                        _ => {
                            self.execute(statement, env)?;
                        }
                    }
                }
                Ok(())
            }
            _ => self.execute(body, env).map(|_| ()),
        }
    }

    // Handles initializer chains like `x = y = 0` by declaring each name
    // in the instance frame.
    fn eval_member_init(&self, expr: &Expr, env: &Rc<Environment>) -> EvalResult {
        if let ExprKind::Binary {
            op: BinaryOp::Assign,
            left,
            right,
        } = &expr.kind
        {
            if let ExprKind::Identifier(name) = &left.kind {
                let value = self.eval_member_init(right, env)?;
                env.put(name.clone(), value.clone());
                return Ok(value);
            }
        }
        self.eval(expr, env)
    }
}
