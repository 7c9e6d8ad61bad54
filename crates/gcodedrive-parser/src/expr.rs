//! Expression trees and their evaluation.
//!
//! Expressions are parsed flat (right-leaning, in source order) and then
//! canonicalized by [`adjust_precedence`], which rotates the tree until
//! operator precedence and left-to-right associativity hold. An explicit
//! grouping node (from `[ … ]`) blocks rotation so bracketed subexpressions
//! keep their shape.

use gcodedrive_core::{Number, Value};

use crate::host::ParseHost;

/// Why parsing stopped: the source ran out, or something went wrong.
///
/// End of input is not an error; `Parser::parse` turns `Eof` into a clean
/// `Ok(None)` and `Fault` into a located parse error.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Eof,
    Fault(String),
}

pub(crate) fn fault<T>(message: impl Into<String>) -> Result<T, Interrupt> {
    Err(Interrupt::Fault(message.into()))
}

pub(crate) fn want_number(val: Value) -> Result<Number, Interrupt> {
    match val.as_number() {
        Some(n) => Ok(n),
        None => fault("expected a number"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnOp {
    Negate,
    Not,
    /// Explicit `[ … ]` grouping; evaluates to its operand and terminates
    /// precedence rotation.
    Group,
}

impl UnOp {
    fn precedence(self) -> u8 {
        match self {
            UnOp::Not => 3,
            UnOp::Negate => 9,
            UnOp::Group => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Or,
    And,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Equal | BinOp::NotEqual => 4,
            BinOp::GreaterThan | BinOp::GreaterEqual | BinOp::LessThan | BinOp::LessEqual => 5,
            BinOp::Add | BinOp::Subtract => 7,
            BinOp::Multiply | BinOp::Divide => 8,
        }
    }
}

/// The fixed function table. All functions take one argument; trigonometry
/// works in degrees on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Abs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Cos,
    Floor,
    Round,
    Sin,
    Sqrt,
    Tan,
}

impl Function {
    pub(crate) fn lookup(name: &str) -> Option<Function> {
        Some(match name {
            "ABS" => Function::Abs,
            "ACOS" => Function::Acos,
            "ASIN" => Function::Asin,
            "ATAN" => Function::Atan,
            "CEIL" => Function::Ceil,
            "COS" => Function::Cos,
            "FLOOR" => Function::Floor,
            "ROUND" => Function::Round,
            "SIN" => Function::Sin,
            "SQRT" => Function::Sqrt,
            "TAN" => Function::Tan,
            _ => return None,
        })
    }

    pub(crate) fn arity(self) -> usize {
        1
    }

    fn apply(self, args: &[Value]) -> Result<Value, Interrupt> {
        let n = want_number(args[0].clone())?.0;
        let out = match self {
            Function::Abs => n.abs(),
            Function::Acos => n.acos().to_degrees(),
            Function::Asin => n.asin().to_degrees(),
            Function::Atan => n.atan().to_degrees(),
            Function::Ceil => n.ceil(),
            Function::Cos => n.to_radians().cos(),
            Function::Floor => n.floor(),
            Function::Round => n.round(),
            Function::Sin => n.to_radians().sin(),
            Function::Sqrt => n.sqrt(),
            Function::Tan => n.to_radians().tan(),
        };
        Ok(Value::Number(Number(out)))
    }
}

/// A lazily evaluable expression node.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    /// A literal number, name or string.
    Lit(Value),
    /// A parameter reference with an indirection count: `#x` has one ref,
    /// `##x` two, and so on. The inner expression yields the first index.
    Param { refs: u32, expr: Box<Expr> },
    Unary { op: UnOp, expr: Box<Expr> },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    Call { func: Function, args: Vec<Expr> },
}

fn logic(b: bool) -> Value {
    Value::Number(Number(if b { 1.0 } else { 0.0 }))
}

impl Expr {
    pub(crate) fn eval(&self, host: &mut dyn ParseHost) -> Result<Value, Interrupt> {
        match self {
            Expr::Lit(val) => Ok(val.clone()),

            Expr::Param { refs, expr } => {
                let val = expr.eval(host)?;
                if let Some(mut num) = val.as_number() {
                    for _ in 0..*refs {
                        let idx = match num.as_integer() {
                            Some(idx) if idx >= 1 => idx,
                            _ => {
                                return fault(format!(
                                    "number parameter must be a positive integer: {}",
                                    num
                                ))
                            }
                        };
                        num = match host.num_param(idx) {
                            Some(val) => val,
                            None => {
                                return fault(format!(
                                    "global number parameter {} not found",
                                    idx
                                ))
                            }
                        };
                    }
                    return Ok(Value::Number(num));
                }

                let mut val = val;
                for _ in 0..*refs {
                    let name = match val.as_name() {
                        Some(name) => name.to_owned(),
                        None => return fault("expected a name parameter"),
                    };
                    val = match host.name_param(&name) {
                        Some(val) => val,
                        None => {
                            return fault(format!("global name parameter <{}> not found", name))
                        }
                    };
                }
                Ok(val)
            }

            Expr::Unary { op, expr } => match op {
                UnOp::Negate => Ok(Value::Number(-want_number(expr.eval(host)?)?)),
                UnOp::Not => {
                    let n = want_number(expr.eval(host)?)?;
                    Ok(logic(n.0 == 0.0))
                }
                UnOp::Group => expr.eval(host),
            },

            Expr::Binary { op, left, right } => {
                // Logical operators short-circuit; everything else
                // evaluates both sides.
                match op {
                    BinOp::And => {
                        let l = want_number(left.eval(host)?)?;
                        if l.0 == 0.0 {
                            return Ok(logic(false));
                        }
                        let r = want_number(right.eval(host)?)?;
                        return Ok(logic(r.0 != 0.0));
                    }
                    BinOp::Or => {
                        let l = want_number(left.eval(host)?)?;
                        if l.0 != 0.0 {
                            return Ok(logic(true));
                        }
                        let r = want_number(right.eval(host)?)?;
                        return Ok(logic(r.0 != 0.0));
                    }
                    _ => {}
                }

                let l = want_number(left.eval(host)?)?;
                let r = want_number(right.eval(host)?)?;
                Ok(match op {
                    BinOp::Equal => logic(l.equal(r)),
                    BinOp::NotEqual => logic(!l.equal(r)),
                    BinOp::GreaterThan => logic(l.0 > r.0),
                    BinOp::GreaterEqual => logic(l.0 > r.0 || l.equal(r)),
                    BinOp::LessThan => logic(l.0 < r.0),
                    BinOp::LessEqual => logic(l.0 < r.0 || l.equal(r)),
                    BinOp::Add => Value::Number(l + r),
                    BinOp::Subtract => Value::Number(l - r),
                    BinOp::Multiply => Value::Number(l * r),
                    BinOp::Divide => Value::Number(l / r),
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                })
            }

            Expr::Call { func, args } => {
                let mut vals = Vec::with_capacity(args.len());
                for arg in args {
                    vals.push(arg.eval(host)?);
                }
                func.apply(&vals)
            }
        }
    }
}

/// Canonicalize a flat parse into precedence order.
///
/// For a binary parent with a binary child on the right, rotate left when
/// the child's precedence is not higher; for a child on the left, rotate
/// right when it is strictly lower. The asymmetry gives left-to-right
/// associativity for operators of equal precedence. Unary operators wrap a
/// lower-precedence binary the same way, and a grouping node stops rotation.
pub(crate) fn adjust_precedence(expr: Expr) -> Expr {
    match expr {
        Expr::Unary { op, expr } => {
            let inner = adjust_precedence(*expr);
            if op == UnOp::Group {
                return Expr::Unary {
                    op,
                    expr: Box::new(inner),
                };
            }

            match inner {
                // - [2 * 3]  -->  [- 2] * 3
                Expr::Binary {
                    op: bin,
                    left,
                    right,
                } if bin.precedence() < op.precedence() => {
                    adjust_precedence(Expr::Binary {
                        op: bin,
                        left: Box::new(Expr::Unary { op, expr: left }),
                        right,
                    })
                }
                inner => Expr::Unary {
                    op,
                    expr: Box::new(inner),
                },
            }
        }

        Expr::Binary { op, left, right } => {
            let left = adjust_precedence(*left);
            let right = adjust_precedence(*right);

            match right {
                // 1 * [2 + 3]  -->  [1 * 2] + 3
                Expr::Binary {
                    op: rop,
                    left: rleft,
                    right: rright,
                } if rop.precedence() <= op.precedence() => {
                    adjust_precedence(Expr::Binary {
                        op: rop,
                        left: Box::new(Expr::Binary {
                            op,
                            left: Box::new(left),
                            right: rleft,
                        }),
                        right: rright,
                    })
                }
                right => rotate_left_child(op, left, right),
            }
        }

        Expr::Call { func, args } => Expr::Call {
            func,
            args: args.into_iter().map(adjust_precedence).collect(),
        },

        other => other,
    }
}

// [1 + 2] * 3  -->  1 + [2 * 3]
fn rotate_left_child(op: BinOp, left: Expr, right: Expr) -> Expr {
    match left {
        Expr::Binary {
            op: lop,
            left: lleft,
            right: lright,
        } if lop.precedence() < op.precedence() => adjust_precedence(Expr::Binary {
            op: lop,
            left: lleft,
            right: Box::new(Expr::Binary {
                op,
                left: lright,
                right: Box::new(right),
            }),
        }),
        left => Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}
