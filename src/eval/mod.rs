//! An interpreter for the host language subset, used to load compiled programs.
//!
//! Markup literals must be compiled away before a program is evaluated. Stream
//! nodes, sinks, safe strings and builders are native values; structured and raw
//! nodes are plain objects (see [crate::runtime::convert]).

mod scope;
mod value;

use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::runtime;
use crate::syntax::{BinaryOp, Expr, FunctionBody, Item, Literal, Program, Property, Stmt};

pub use scope::Scope;
pub use value::{Closure, Native, NativeFn, Object, Value};

/// Loads programs against a set of importable modules.
pub struct Evaluator {
    modules: HashMap<Rc<str>, Value>,
}

impl Default for Evaluator {
    /// An evaluator where the runtime support module is importable under
    /// [runtime::MODULE_PATH].
    fn default() -> Self {
        let mut evaluator = Evaluator::empty();
        evaluator.register_module(runtime::MODULE_PATH, runtime::module());
        evaluator
    }
}

impl Evaluator {
    pub fn new() -> Evaluator {
        Evaluator::default()
    }

    /// An evaluator with no importable modules.
    pub fn empty() -> Evaluator {
        Evaluator {
            modules: HashMap::new(),
        }
    }

    pub fn register_module(&mut self, path: &str, module: Value) {
        self.modules.insert(Rc::from(path), module);
    }

    /// Runs the top-level statements of `program`, leaving its bindings in `scope`.
    pub fn run(&self, program: &Program, scope: &Rc<Scope>) -> Result<(), RuntimeError> {
        for statement in &program.body {
            if let Stmt::Import { alias, path } = statement {
                let module = self
                    .modules
                    .get(path)
                    .ok_or_else(|| RuntimeError::UnknownModule(Rc::clone(path)))?;
                debug!("importing {} as {}", path, alias);
                scope.define(alias, module.clone());
                continue;
            }
            if let Flow::Return(_) = execute(statement, scope)? {
                break;
            }
        }
        return Ok(());
    }
}

enum Flow {
    Normal,
    Return(Value),
}

fn execute(statement: &Stmt, scope: &Rc<Scope>) -> Result<Flow, RuntimeError> {
    match statement {
        Stmt::Import { path, .. } => Err(RuntimeError::type_error(format!(
            "import of {} is only allowed at the top level",
            path
        ))),
        Stmt::Let { name, init, .. } => {
            let value = evaluate(init, scope)?;
            scope.define(name, value);
            Ok(Flow::Normal)
        }
        Stmt::Expr(expr) => {
            evaluate(expr, scope)?;
            Ok(Flow::Normal)
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, scope)?.is_truthy() {
                execute(consequent, &Scope::child(scope))
            } else if let Some(alternate) = alternate {
                execute(alternate, &Scope::child(scope))
            } else {
                Ok(Flow::Normal)
            }
        }
        Stmt::Block(statements) => execute_all(statements, &Scope::child(scope)),
        Stmt::ForOf {
            binding,
            iterable,
            body,
        } => {
            let items = match evaluate(iterable, scope)? {
                Value::Array(items) => items,
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not iterable",
                        other.type_name()
                    )))
                }
            };
            for item in items.iter() {
                let inner = Scope::child(scope);
                inner.define(binding, item.clone());
                if let Flow::Return(value) = execute(body, &inner)? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::Return(value) => match value {
            Some(value) => Ok(Flow::Return(evaluate(value, scope)?)),
            None => Ok(Flow::Return(Value::Undefined)),
        },
    }
}

fn execute_all(statements: &[Stmt], scope: &Rc<Scope>) -> Result<Flow, RuntimeError> {
    for statement in statements {
        if let Flow::Return(value) = execute(statement, scope)? {
            return Ok(Flow::Return(value));
        }
    }
    Ok(Flow::Normal)
}

/// Evaluates an expression in `scope`.
pub fn evaluate(expr: &Expr, scope: &Rc<Scope>) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Identifier(name) => scope.lookup(name),
        Expr::Literal(literal) => Ok(match literal {
            Literal::String { value, .. } => Value::String(Rc::clone(value)),
            Literal::Number(n) => Value::Number(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
            Literal::Undefined => Value::Undefined,
        }),
        Expr::Array(items) => Ok(Value::array(evaluate_items(items, scope)?)),
        Expr::Object(properties) => {
            let mut object = Object::new();
            for property in properties {
                match property {
                    Property::KeyValue(key, value) => {
                        object.insert(Rc::clone(key), evaluate(value, scope)?);
                    }
                    Property::Spread(source) => spread_into(&mut object, evaluate(source, scope)?),
                }
            }
            Ok(Value::Object(Rc::new(object)))
        }
        Expr::Member(object, name) => get_property(&evaluate(object, scope)?, name),
        Expr::Index(object, index) => {
            let object = evaluate(object, scope)?;
            let index = evaluate(index, scope)?;
            match (&object, &index) {
                (Value::Array(items), Value::Number(n)) => Ok(items
                    .get(*n as usize)
                    .filter(|_| n.fract() == 0.0 && *n >= 0.0)
                    .cloned()
                    .unwrap_or(Value::Undefined)),
                _ => get_property(&object, &index.to_string()),
            }
        }
        Expr::Call(callee, args) => {
            if let Expr::Member(receiver, name) = callee.as_ref() {
                let receiver = evaluate(receiver, scope)?;
                let args = evaluate_items(args, scope)?;
                if let Value::Object(fields) = &receiver {
                    let method = fields.get(name).cloned().unwrap_or(Value::Undefined);
                    return call_function(&method, args);
                }
                return call_method(receiver, name, args);
            }
            let callee = evaluate(callee, scope)?;
            call_function(&callee, evaluate_items(args, scope)?)
        }
        Expr::Not(operand) => Ok(Value::Bool(!evaluate(operand, scope)?.is_truthy())),
        Expr::Binary(op, left, right) => {
            let left = evaluate(left, scope)?;
            match op {
                BinaryOp::And if !left.is_truthy() => Ok(left),
                BinaryOp::Or if left.is_truthy() => Ok(left),
                BinaryOp::And | BinaryOp::Or => evaluate(right, scope),
                BinaryOp::Add => Ok(left.add(&evaluate(right, scope)?)),
                BinaryOp::StrictEq => Ok(Value::Bool(left.strict_equals(&evaluate(right, scope)?))),
                BinaryOp::StrictNe => {
                    Ok(Value::Bool(!left.strict_equals(&evaluate(right, scope)?)))
                }
            }
        }
        Expr::Conditional(test, consequent, alternate) => {
            if evaluate(test, scope)?.is_truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
        Expr::Arrow(function) => Ok(Value::Function(Rc::new(Closure {
            function: Rc::clone(function),
            scope: Rc::clone(scope),
        }))),
        Expr::Markup(_) => Err(RuntimeError::type_error(
            "markup literals must be compiled before evaluation",
        )),
    }
}

fn evaluate_items(items: &[Item], scope: &Rc<Scope>) -> Result<Vec<Value>, RuntimeError> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Expr(expr) => values.push(evaluate(expr, scope)?),
            Item::Spread(expr) => match evaluate(expr, scope)? {
                Value::Array(spread) => values.extend(spread.iter().cloned()),
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "cannot spread {}",
                        other.type_name()
                    )))
                }
            },
        }
    }
    Ok(values)
}

fn spread_into(object: &mut Object, source: Value) {
    match source {
        Value::Object(fields) => {
            for (key, value) in fields.iter() {
                object.insert(Rc::clone(key), value.clone());
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                object.insert(Rc::from(index.to_string()), value.clone());
            }
        }
        _ => {}
    }
}

/// Calls a function value with `args`. Missing arguments are `undefined`.
pub fn call_function(callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match callee {
        Value::Native(native) => (native.func)(args),
        Value::Function(closure) => {
            let scope = Scope::child(&closure.scope);
            let mut args = args.into_iter();
            for param in &closure.function.params {
                scope.define(param, args.next().unwrap_or(Value::Undefined));
            }
            match &closure.function.body {
                FunctionBody::Expr(body) => evaluate(body, &scope),
                FunctionBody::Block(statements) => match execute_all(statements, &scope)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Undefined),
                },
            }
        }
        other => Err(RuntimeError::type_error(format!(
            "{} is not a function",
            other.type_name()
        ))),
    }
}

fn call_method(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match (&receiver, name) {
        (Value::Array(items), "map") => {
            let callback = args.into_iter().next().unwrap_or(Value::Undefined);
            let mapped = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    call_function(&callback, vec![item.clone(), Value::Number(index as f64)])
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array(mapped))
        }
        (Value::Array(items), "join") => {
            let separator = match args.first() {
                None | Some(Value::Undefined) => ",".to_owned(),
                Some(separator) => separator.to_string(),
            };
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(&separator);
            Ok(Value::string(joined))
        }
        (Value::Undefined | Value::Null, _) => Err(RuntimeError::type_error(format!(
            "cannot call {} on {}",
            name,
            receiver.type_name()
        ))),
        _ => runtime::call_method(receiver, name, args),
    }
}

/// Reads `name` from a value. Unknown properties are `undefined`.
pub fn get_property(receiver: &Value, name: &str) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
            "cannot read {} of {}",
            name,
            receiver.type_name()
        ))),
        Value::Object(fields) => Ok(fields.get(name).cloned().unwrap_or(Value::Undefined)),
        Value::Array(items) if name == "length" => Ok(Value::Number(items.len() as f64)),
        Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        _ => Ok(Value::Undefined),
    }
}
