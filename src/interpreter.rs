use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::callable::{self, Callable, Class, Function, Instance};
use crate::environment::{EnvId, Environments};
use crate::error::{LoxError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.  `Return` unwinds to the nearest call, `Break`
/// to the nearest loop.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
    Break,
}

/// Calls nested deeper than this fail with "Stack overflow.".
pub const MAX_CALL_DEPTH: usize = 10_000;

/// Frames allocated between two collections at an idle point.
const COLLECT_THRESHOLD: usize = 1024;

/// Tree‑walking evaluator.  Owns the frame arena (with the global and the
/// current frame), the resolver's distance table and the sink `println`
/// writes to.
pub struct Interpreter<'a> {
    pub(crate) environments: Environments<'a>,
    globals: EnvId,
    environment: EnvId,
    locals: HashMap<ExprId, usize>,
    call_depth: usize,
    out: Box<dyn Write + 'a>,
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Creates an interpreter printing to `out` and defines native functions
    /// such as `clock`.
    pub fn with_output<W: Write + 'a>(out: W) -> Self {
        info!("Initializing Interpreter");

        let mut environments: Environments<'a> = Environments::new();
        let globals: EnvId = environments.push(None);

        debug!("Defining native function 'clock'");

        environments.define(
            globals,
            "clock",
            Value::Callable(Callable::Native(Rc::new(callable::clock()))),
        );

        Self {
            environments,
            environment: globals,
            globals,
            locals: HashMap::new(),
            call_depth: 0,
            out: Box::new(out),
        }
    }

    /// Number of frames currently allocated, globals included.
    pub fn live_frames(&self) -> usize {
        self.environments.live()
    }

    /// Called by the resolver: `id` binds `depth` frames above its use.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Called by the resolver: `id` is looked up in the globals.
    pub fn note_global(&mut self, id: ExprId) {
        self.locals.remove(&id);
    }

    /// Resolved distance for `id`, if it is a local.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                Ok(Flow::Return(_) | Flow::Break) => {
                    // The resolver rejects these at top level; nothing to unwind to.
                    debug!("Ignoring control-flow signal at top level");
                }
                Err(e) => {
                    self.collect_garbage();
                    self.out.flush()?;
                    return Err(e);
                }
            }

            self.collect_if_idle();
        }

        self.collect_garbage();
        self.out.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Free frames once enough have been allocated, but only outside every
    /// call: there all live values sit in frames on the current chain.
    fn collect_if_idle(&mut self) {
        if self.call_depth == 0
            && self.environments.allocated_since_collect() >= COLLECT_THRESHOLD
        {
            self.collect_garbage();
        }
    }

    fn collect_garbage(&mut self) {
        if self.call_depth == 0 {
            self.environments.collect(&[self.environment, self.globals]);
        }
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Flow<'a>> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(Expr::Break(_)) => Ok(Flow::Break),

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value<'a> = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {:?}", name.lexeme, value);

                self.environments.define(self.environment, name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: EnvId = self.environments.push(Some(self.environment));
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => {
                            debug!("Loop exited by break");
                            break;
                        }
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    self.collect_if_idle();
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = Function::new(declaration, self.environment);
                self.environments.define(
                    self.environment,
                    declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class { name, methods } => {
                self.environments.define(self.environment, name.lexeme, Value::Nil);

                let methods: HashMap<String, Rc<Function<'a>>> = methods
                    .iter()
                    .map(|method| {
                        let function = Function::new(method, self.environment);
                        (method.name.lexeme.to_string(), Rc::new(function))
                    })
                    .collect();

                let class = Class::new(name.lexeme, methods);
                self.environments.assign(
                    self.environment,
                    name.lexeme,
                    Value::Callable(Callable::Class(Rc::new(class))),
                    name.line,
                )?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `env` as the current frame.  The previous frame
    /// is restored whether the block finishes, signals or fails.
    pub(crate) fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        env: EnvId,
    ) -> Result<Flow<'a>> {
        let previous: EnvId = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &'a [Stmt<'a>]) -> Result<Flow<'a>> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value<'a> = self.evaluate(right)?;
                match (&operator.token_type, right) {
                    (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
                    (TokenType::MINUS, _) => Err(LoxError::runtime(
                        operator.line,
                        "Operand must be a number.",
                    )),
                    (TokenType::BANG, value) => Ok(Value::Bool(!value.is_truthy())),
                    _ => Err(invalid_operator(operator)),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;
                let right: Value<'a> = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;
                let short_circuit: bool = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value: Value<'a> = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => self.environments.assign_at(
                        self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self.environments.assign(
                        self.globals,
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee)?;

                let mut values: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let callable: Callable<'a> = match callee {
                    Value::Callable(callable) => callable,
                    other => {
                        debug!("Attempted to call a {}", other.type_name());
                        return Err(LoxError::runtime(
                            paren.line,
                            "Can only call functions and structs.",
                        ));
                    }
                };

                if values.len() != callable.arity() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(LoxError::runtime(paren.line, "Stack overflow."));
                }

                self.call_depth += 1;
                let result = callable.call(self, values, paren);
                self.call_depth -= 1;

                result
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name, &mut self.environments),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };

                let value: Value<'a> = self.evaluate(value)?;
                instance.borrow_mut().set(name.lexeme, value.clone());

                Ok(value)
            }

            Expr::Break(keyword) => Err(LoxError::runtime(
                keyword.line,
                "'break' can only be used as a statement.",
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token<'_>) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => {
                self.environments
                    .get_at(self.environment, distance, name.lexeme, name.line)
            }
            None => self.environments.get(self.globals, name.lexeme, name.line),
        }
    }
}

fn invalid_operator(operator: &Token<'_>) -> LoxError {
    LoxError::runtime(
        operator.line,
        format!("Invalid operator '{}'.", operator.lexeme),
    )
}

fn numbers<'a>(operator: &Token<'_>, left: &Value<'a>, right: &Value<'a>) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
    }
}

fn binary<'a>(operator: &Token<'_>, left: Value<'a>, right: Value<'a>) -> Result<Value<'a>> {
    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(LoxError::runtime(
                operator.line,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        TokenType::MINUS => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a - b)),
        TokenType::STAR => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a * b)),
        TokenType::SLASH => {
            let (a, b) = numbers(operator, &left, &right)?;
            if b == 0.0 {
                return Err(LoxError::runtime(operator.line, "Division by zero."));
            }
            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a > b)),
        TokenType::GREATER_EQUAL => {
            numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a >= b))
        }
        TokenType::LESS => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a < b)),
        TokenType::LESS_EQUAL => {
            numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a <= b))
        }

        _ => Err(invalid_operator(operator)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::scan;

    #[test]
    fn frame_is_restored_when_a_block_fails() {
        let tokens = scan("{ var a = 1; { println a; nope(); } }").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());
        Resolver::new(&mut interpreter).resolve(&statements).unwrap();

        assert!(interpreter.interpret(&statements).is_err());
        assert_eq!(interpreter.environment, interpreter.globals);
    }

    #[test]
    fn call_frames_are_released_after_the_program() {
        let source = "def outer() { def inner() { return 1; } return inner(); }\n\
                      for (var i = 0; i < 1000; i = i + 1) outer();";
        let tokens = scan(source).unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());
        Resolver::new(&mut interpreter).resolve(&statements).unwrap();

        interpreter.interpret(&statements).unwrap();
        assert_eq!(interpreter.live_frames(), 1);
    }

    #[test]
    fn call_frames_are_released_between_loop_iterations() {
        let source = "def outer() { def inner() { return 1; } return inner(); }\n\
                      for (var i = 0; i < 5000; i = i + 1) outer();";
        let tokens = scan(source).unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());
        Resolver::new(&mut interpreter).resolve(&statements).unwrap();

        for stmt in &statements {
            interpreter.execute(stmt).unwrap();
        }
        assert!(interpreter.live_frames() < 4 * COLLECT_THRESHOLD);
    }

    #[test]
    fn loop_absorbs_break() {
        let tokens = scan("while (true) { break; }").unwrap();
        let statements = Parser::new(&tokens).parse().unwrap();
        let mut interpreter = Interpreter::with_output(Vec::new());

        assert!(matches!(interpreter.execute(&statements[0]), Ok(Flow::Normal)));
    }
}
