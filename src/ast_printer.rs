use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::value::Value;

/// Renders syntax trees as text.
///
/// `print` gives the parenthesised prefix form used by the `parse` command
/// (`(+ 1.0 (group 2.0))`); `render` gives fully parenthesised infix source
/// that parses back to an equivalent tree.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::This { .. } => "this".into(),

            Expr::Break(_) => "break".into(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),
        }
    }

    /// Prefix form of a statement, one line per statement.  Nested bodies are
    /// indented by two spaces.
    pub fn print_stmt(stmt: &Stmt<'_>) -> String {
        let mut out = String::new();
        Self::write_stmt(&mut out, stmt, 0);
        out
    }

    fn write_stmt(out: &mut String, stmt: &Stmt<'_>, indent: usize) {
        let pad = "  ".repeat(indent);

        match stmt {
            Stmt::Expression(expr) => {
                out.push_str(&format!("{}(; {})\n", pad, Self::print(expr)));
            }

            Stmt::Print(expr) => {
                out.push_str(&format!("{}(println {})\n", pad, Self::print(expr)));
            }

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => {
                    out.push_str(&format!("{}(var {} {})\n", pad, name.lexeme, Self::print(expr)))
                }
                None => out.push_str(&format!("{}(var {})\n", pad, name.lexeme)),
            },

            Stmt::Block(statements) => {
                out.push_str(&format!("{}(block\n", pad));
                for inner in statements {
                    Self::write_stmt(out, inner, indent + 1);
                }
                out.push_str(&format!("{})\n", pad));
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push_str(&format!("{}(if {}\n", pad, Self::print(condition)));
                Self::write_stmt(out, then_branch, indent + 1);
                if let Some(else_branch) = else_branch {
                    out.push_str(&format!("{}else\n", pad));
                    Self::write_stmt(out, else_branch, indent + 1);
                }
                out.push_str(&format!("{})\n", pad));
            }

            Stmt::While { condition, body } => {
                out.push_str(&format!("{}(while {}\n", pad, Self::print(condition)));
                Self::write_stmt(out, body, indent + 1);
                out.push_str(&format!("{})\n", pad));
            }

            Stmt::Function(function) => Self::write_function(out, "def", function, indent),

            Stmt::Return { value, .. } => match value {
                Some(expr) => out.push_str(&format!("{}(return {})\n", pad, Self::print(expr))),
                None => out.push_str(&format!("{}(return)\n", pad)),
            },

            Stmt::Class { name, methods } => {
                out.push_str(&format!("{}(struct {}\n", pad, name.lexeme));
                for method in methods {
                    Self::write_function(out, "method", method, indent + 1);
                }
                out.push_str(&format!("{})\n", pad));
            }
        }
    }

    fn write_function(out: &mut String, kind: &str, function: &FunctionDecl<'_>, indent: usize) {
        let pad = "  ".repeat(indent);
        let params: Vec<&str> = function.params.iter().map(|p| p.lexeme).collect();

        out.push_str(&format!(
            "{}({} {}({})\n",
            pad,
            kind,
            function.name.lexeme,
            params.join(" ")
        ));
        for stmt in &function.body {
            Self::write_stmt(out, stmt, indent + 1);
        }
        out.push_str(&format!("{})\n", pad));
    }

    /// Infix source for `expr` with every compound sub‑expression wrapped in
    /// parentheses, so precedence never depends on the reader.
    pub fn render(expr: &Expr<'_>) -> String {
        match expr {
            Expr::Literal(lit) => match lit {
                LiteralValue::Str(s) => format!("\"{}\"", s),
                LiteralValue::Number(n) => Value::Number(*n).to_string(),
                LiteralValue::True => "true".into(),
                LiteralValue::False => "false".into(),
                LiteralValue::Nil => "nil".into(),
            },

            Expr::Grouping(inner) => format!("({})", Self::render(inner)),

            Expr::Unary { operator, right } => {
                format!("({}{})", operator.lexeme, Self::render(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                Self::render(left),
                operator.lexeme,
                Self::render(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::This { .. } => "this".into(),

            Expr::Break(_) => "break".into(),

            Expr::Assign { name, value, .. } => {
                format!("({} = {})", name.lexeme, Self::render(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let args: Vec<String> = arguments.iter().map(Self::render).collect();
                format!("{}({})", Self::render(callee), args.join(", "))
            }

            Expr::Get { object, name } => format!("{}.{}", Self::render(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "({}.{} = {})",
                Self::render(object),
                name.lexeme,
                Self::render(value)
            ),
        }
    }
}
