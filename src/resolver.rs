//! Static resolver pass for the **Ember** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `return`, `break` or `this`).
//! 3. Tell the interpreter, for *each* variable occurrence, whether it’s a local
//!    (and at what depth) or a global, so the interpreter never falls back to
//!    dynamic lookup that would see a later shadowing local.
//!
//! The global scope is never on the stack: names declared at top level are not
//! tracked and every reference that misses all scopes is a global.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::CONSTRUCTOR;
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::mem;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Constructor,
}

/// Are we inside a struct body?  Used to validate `this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Struct,
}

/// How distances are recorded for references that cross function boundaries.
///
/// `Lexical` is the default because it is the only policy under which every
/// closure, and every method reading `this`, finds the binding it captured.
/// `FunctionRelative` makes `this` in a method and a closure over an
/// enclosing block's variable fail with "Undefined variable".  Collapsing only
/// when `function_depth > 1` does not help: `def outer() { var x; { def
/// inner() { return x; } } }` still records 0 for `x`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DepthPolicy {
    /// Record the true number of frames between use and binding.
    #[default]
    Lexical,

    /// Record distance 0 whenever a reference made inside a function is at
    /// least `function_depth` scopes away from its binding.  Closures over
    /// variables of an enclosing block then miss at runtime.
    FunctionRelative,
}

impl DepthPolicy {
    fn apply(self, distance: usize, function_depth: usize) -> usize {
        match self {
            DepthPolicy::FunctionRelative if function_depth > 0 && distance >= function_depth => 0,
            _ => distance,
        }
    }
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter<'a>,
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    function_depth: usize,
    loop_depth: usize,
    policy: DepthPolicy,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter<'a>) -> Self {
        Self::with_policy(interpreter, DepthPolicy::default())
    }

    pub fn with_policy(interpreter: &'interp mut Interpreter<'a>, policy: DepthPolicy) -> Self {
        info!("Resolver instantiated with {:?} depths", policy);

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            function_depth: 0,
            loop_depth: 0,
            policy,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_all(statements)
    }

    fn resolve_all(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) -> Result<()> {
        ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt))
    }

    fn resolve_stmt_inner(&mut self, stmt: &Stmt<'a>) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_all(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // Defined before the body so it can recurse.
                self.declare(declaration.name)?;
                self.define(declaration.name);
                self.resolve_function(declaration, FunctionType::Function)?;
            }

            Stmt::Class { name, methods } => {
                self.declare(name)?;
                self.define(name);

                let enclosing_class = mem::replace(&mut self.current_class, ClassType::Struct);

                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                let mut result = Ok(());
                for method in methods {
                    let kind = if method.name.lexeme == CONSTRUCTOR {
                        FunctionType::Constructor
                    } else {
                        FunctionType::Method
                    };

                    result = self.resolve_function(method, kind);
                    if result.is_err() {
                        break;
                    }
                }

                self.end_scope();
                self.current_class = enclosing_class;
                result?;
            }

            Stmt::Expression(Expr::Break(keyword)) => {
                if self.loop_depth == 0 {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'break' outside of a loop.",
                    ));
                }
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;

                self.loop_depth += 1;
                let result = self.resolve_stmt(body);
                self.loop_depth -= 1;
                result?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't return from top-level code.",
                    ));
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) -> Result<()> {
        ensure_sufficient_stack(|| self.resolve_expr_inner(expr))
    }

    fn resolve_expr_inner(&mut self, expr: &Expr<'a>) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(*id, name.lexeme);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name.lexeme);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't use 'this' outside of a struct.",
                    ));
                }
                self.resolve_local(*id, keyword.lexeme);
            }

            Expr::Break(keyword) => {
                return Err(LoxError::resolve(
                    keyword.line,
                    "'break' can only be used as a statement.",
                ));
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.  Loops do not
    /// extend into nested functions.
    fn resolve_function(&mut self, function: &FunctionDecl<'a>, kind: FunctionType) -> Result<()> {
        debug!(
            "Resolving {:?} '{}' at function depth {}",
            kind,
            function.name.lexeme,
            self.function_depth + 1
        );

        let enclosing_function = mem::replace(&mut self.current_function, kind);
        let enclosing_loops = mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;

        self.begin_scope();
        let result = self.resolve_params_and_body(function);
        self.end_scope();

        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;
        self.current_function = enclosing_function;

        result
    }

    fn resolve_params_and_body(&mut self, function: &FunctionDecl<'a>) -> Result<()> {
        for param in &function.params {
            self.declare(param)?;
            self.define(param);
        }
        self.resolve_all(&function.body)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token<'a>) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    "Already a variable with this name in this scope.",
                ));
            }
            scope.insert(name.lexeme, false);
        }
        Ok(())
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either:
    ///  - a local at depth `d`, or
    ///  - a global if not found in *any* scope.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                let depth = self.policy.apply(distance, self.function_depth);
                debug!("Resolved '{}' at depth {}", name, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);

        self.interpreter.note_global(id);
    }
}
