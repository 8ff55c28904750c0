//! Runtime representation of everything that can be called (native functions,
//! user functions, structs) and of struct instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::FunctionDecl;
use crate::environment::{EnvId, Environments};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Name of the method run when a struct is called.
pub const CONSTRUCTOR: &str = "construct";

/// A function implemented in Rust.
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>,
}

/// `clock()` – seconds since the Unix epoch as a float.
pub fn clock<'a>() -> NativeFunction<'a> {
    NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args| {
            let now = Utc::now();
            let seconds: f64 =
                now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9;

            debug!("Native function 'clock' returned: {}", seconds);

            Ok(Value::Number(seconds))
        },
    }
}

/// A user function: its declaration plus the frame active where it was
/// declared.  The closure is fixed at creation.
pub struct Function<'a> {
    declaration: &'a FunctionDecl<'a>,
    closure: EnvId,
}

impl<'a> Function<'a> {
    pub fn new(declaration: &'a FunctionDecl<'a>, closure: EnvId) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn closure(&self) -> EnvId {
        self.closure
    }

    /// A copy of this method whose closure is a fresh frame binding `this`.
    pub fn bind(
        &self,
        instance: &Rc<RefCell<Instance<'a>>>,
        environments: &mut Environments<'a>,
    ) -> Function<'a> {
        let env = environments.push(Some(self.closure));
        environments.define(env, "this", Value::Instance(Rc::clone(instance)));

        Function::new(self.declaration, env)
    }

    /// Run the body in a new frame whose parent is the closure.  A `return`
    /// supplies the result; falling off the end yields `nil`.
    pub fn call(&self, interpreter: &mut Interpreter<'a>, arguments: Vec<Value<'a>>) -> Result<Value<'a>> {
        debug!("Calling function '{}'", self.name());

        let declaration: &'a FunctionDecl<'a> = self.declaration;
        let env = interpreter.environments.push(Some(self.closure));

        for (param, argument) in declaration.params.iter().zip(arguments) {
            interpreter.environments.define(env, param.lexeme, argument);
        }

        match interpreter.execute_block(&declaration.body, env)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }
}

/// A `struct` declaration at runtime.
pub struct Class<'a> {
    name: String,
    methods: HashMap<String, Rc<Function<'a>>>,
}

impl<'a> Class<'a> {
    pub fn new(name: &str, methods: HashMap<String, Rc<Function<'a>>>) -> Self {
        info!("Struct '{}' created with {} method(s)", name, methods.len());

        Self {
            name: name.to_string(),
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<Function<'a>>> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Rc<Function<'a>>> {
        self.methods.values()
    }

    /// Constructor arity, or 0 without a constructor.
    pub fn arity(&self) -> usize {
        self.find_method(CONSTRUCTOR).map_or(0, |ctor| ctor.arity())
    }

    /// Create an instance and run `construct` on it, if present.  Whatever the
    /// constructor returns is discarded.
    pub fn instantiate(
        class: &Rc<Class<'a>>,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

        if let Some(constructor) = class.find_method(CONSTRUCTOR) {
            constructor
                .bind(&instance, &mut interpreter.environments)
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An object created by calling a struct.
pub struct Instance<'a> {
    class: Rc<Class<'a>>,
    fields: HashMap<String, Value<'a>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Rc<Class<'a>>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<Class<'a>> {
        &self.class
    }

    pub fn fields(&self) -> impl Iterator<Item = &Value<'a>> {
        self.fields.values()
    }

    /// Field lookup first, then a method bound to this instance.
    pub fn get(
        instance: &Rc<RefCell<Instance<'a>>>,
        name: &Token<'_>,
        environments: &mut Environments<'a>,
    ) -> Result<Value<'a>> {
        let this = instance.borrow();

        if let Some(value) = this.fields.get(name.lexeme) {
            return Ok(value.clone());
        }

        match this.class.find_method(name.lexeme) {
            Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                method.bind(instance, environments),
            )))),
            None => Err(LoxError::runtime(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Create or overwrite a field.
    pub fn set(&mut self, name: &str, value: Value<'a>) {
        self.fields.insert(name.to_string(), value);
    }
}

/// Everything a call expression can invoke.
#[derive(Clone)]
pub enum Callable<'a> {
    Native(Rc<NativeFunction<'a>>),
    Function(Rc<Function<'a>>),
    Class(Rc<Class<'a>>),
}

impl<'a> Callable<'a> {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
        }
    }

    /// Invoke with already-evaluated arguments.  Arity is checked by the caller.
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
        paren: &Token<'_>,
    ) -> Result<Value<'a>> {
        match self {
            Callable::Native(native) => {
                (native.func)(&arguments).map_err(|msg| LoxError::runtime(paren.line, msg))
            }
            Callable::Function(function) => function.call(interpreter, arguments),
            Callable::Class(class) => Class::instantiate(class, interpreter, arguments),
        }
    }
}

impl<'a> PartialEq for Callable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<'a> fmt::Display for Callable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
            Callable::Class(class) => write!(f, "{}", class.name()),
        }
    }
}
