//! Executable units produced by the parser.
//!
//! Each parsed construct becomes an [`Action`] whose execution is deferred
//! until the driving loop reaches it. Loop bodies are shared behind `Rc` so
//! a `WHILE` can replay its actions without reparsing.

use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;

use gcodedrive_core::{Number, Value};

use crate::expr::{fault, want_number, Expr, Interrupt};
use crate::host::ParseHost;

/// Assignment operators, including the `++`/`--` sugar which assigns with
/// an implicit operand of 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Increment,
    Decrement,
}

/// The comment commands with side effects (LinuxCNC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommentCmd {
    /// `(msg,…)`: body to OUT, verbatim.
    Msg,
    /// `(debug,…)`: body to OUT with parameters expanded; gated by #5599.
    Debug,
    /// `(print,…)`: body to ERR with parameters expanded.
    Print,
}

#[derive(Debug, Clone)]
pub(crate) struct CommentAction {
    pub(crate) cmd: CommentCmd,
    pub(crate) body: String,
    pub(crate) has_params: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct IfData {
    pub(crate) test: Expr,
    pub(crate) then_assign: Action,
    pub(crate) elseifs: Vec<(Expr, Action)>,
    pub(crate) else_assign: Option<Action>,
}

#[derive(Debug)]
pub(crate) struct WhileData {
    pub(crate) test: Expr,
    pub(crate) body: Vec<Action>,
}

/// A parsed, deferred-executable unit.
#[derive(Debug, Clone)]
pub(crate) enum Action {
    /// Append `{letter, eval(expr)}` to the line's code list.
    Code { letter: char, expr: Expr },
    /// Store into a numeric parameter; timing is dialect-dependent.
    NumAssign {
        num: i64,
        op: AssignOp,
        expr: Expr,
    },
    /// Store into a named parameter; timing is dialect-dependent.
    NameAssign {
        name: String,
        op: AssignOp,
        expr: Expr,
    },
    /// Emit comment-command output.
    Comment(CommentAction),
    /// BeagleG `IF … THEN … [ELSEIF …] [ELSE …]`.
    If(Box<IfData>),
    /// BeagleG `WHILE … DO … END`; the body replays through the parser's
    /// frame stack with the test re-evaluated after each pass.
    While(Rc<WhileData>),
    /// Parse-time sentinel for `END`; evaluating one means there was no
    /// matching `WHILE`.
    End,
    /// End of a logical line: runs deferred assignments and hands the
    /// collected codes to the caller.
    Eol,
}

/// An assignment postponed to end of line (LinuxCNC timing).
#[derive(Debug)]
pub(crate) enum Deferred {
    Num {
        num: i64,
        op: AssignOp,
        expr: Expr,
    },
    Name {
        name: String,
        op: AssignOp,
        expr: Expr,
    },
}

/// Classify a comment body as a comment command, if it is one and the sink
/// it writes to is attached.
pub(crate) fn classify_comment(
    body: &str,
    host: &mut dyn ParseHost,
) -> Option<CommentAction> {
    static COMMENT_COMMAND: OnceLock<Regex> = OnceLock::new();
    let regex = COMMENT_COMMAND
        .get_or_init(|| Regex::new(r"(?i)^(msg|debug|print),(.*)$").expect("invalid regex pattern"));

    let caps = regex.captures(body)?;
    let cmd = match caps[1].to_ascii_lowercase().as_str() {
        "msg" => CommentCmd::Msg,
        "debug" => CommentCmd::Debug,
        "print" => CommentCmd::Print,
        _ => unreachable!("pattern admits three commands"),
    };
    let body = caps[2].to_string();

    let has_params = match cmd {
        CommentCmd::Msg => {
            if !host.has_message_sink() {
                return None;
            }
            false
        }
        CommentCmd::Debug => {
            if !host.has_message_sink() {
                return None;
            }
            body.contains('#')
        }
        CommentCmd::Print => {
            if !host.has_diagnostic_sink() {
                return None;
            }
            body.contains('#')
        }
    };

    Some(CommentAction {
        cmd,
        body,
        has_params,
    })
}

fn get_num(host: &mut dyn ParseHost, num: i64) -> Result<Number, Interrupt> {
    match host.num_param(num) {
        Some(val) => Ok(val),
        None => fault(format!("global number parameter {} not found", num)),
    }
}

fn set_num(host: &mut dyn ParseHost, num: i64, val: Number) -> Result<(), Interrupt> {
    host.set_num_param(num, val)
        .map_err(|err| Interrupt::Fault(err.to_string()))
}

fn get_name(host: &mut dyn ParseHost, name: &str) -> Result<Value, Interrupt> {
    match host.name_param(name) {
        Some(val) => Ok(val),
        None => fault(format!("global name parameter <{}> not found", name)),
    }
}

fn set_name(host: &mut dyn ParseHost, name: &str, val: Value) -> Result<(), Interrupt> {
    host.set_name_param(name, val)
        .map_err(|err| Interrupt::Fault(err.to_string()))
}

pub(crate) fn apply_num_assignment(
    host: &mut dyn ParseHost,
    num: i64,
    op: AssignOp,
    expr: &Expr,
) -> Result<(), Interrupt> {
    let val = want_number(expr.eval(host)?)?;
    let new = match op {
        AssignOp::Assign => val,
        AssignOp::AddAssign | AssignOp::Increment => get_num(host, num)? + val,
        AssignOp::SubAssign | AssignOp::Decrement => get_num(host, num)? - val,
        AssignOp::MulAssign => get_num(host, num)? * val,
        AssignOp::DivAssign => get_num(host, num)? / val,
    };
    set_num(host, num, new)
}

pub(crate) fn apply_name_assignment(
    host: &mut dyn ParseHost,
    name: &str,
    op: AssignOp,
    expr: &Expr,
) -> Result<(), Interrupt> {
    let val = expr.eval(host)?;
    let new = match op {
        AssignOp::Assign => val,
        AssignOp::AddAssign | AssignOp::Increment => {
            Value::Number(want_number(get_name(host, name)?)? + want_number(val)?)
        }
        AssignOp::SubAssign | AssignOp::Decrement => {
            Value::Number(want_number(get_name(host, name)?)? - want_number(val)?)
        }
        AssignOp::MulAssign => {
            Value::Number(want_number(get_name(host, name)?)? * want_number(val)?)
        }
        AssignOp::DivAssign => {
            Value::Number(want_number(get_name(host, name)?)? / want_number(val)?)
        }
    };
    set_name(host, name, new)
}
