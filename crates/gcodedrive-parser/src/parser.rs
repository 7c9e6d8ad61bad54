//! The byte-level G-code lexer and recursive-descent parser.
//!
//! `Parser::parse` reads the source one logical line at a time and returns
//! the fully evaluated codes of the next line that has any; assignments,
//! comments and BeagleG control flow execute as side effects along the way.
//! Parameter storage and message output go through the caller's
//! [`ParseHost`].
//!
//! ```text
//! line    ::= prefix body? suffix? EOL
//! prefix  ::= (WS | '(' comment ')')* ('N' integer)?
//! suffix  ::= ('*' integer WS*)? (';' | '%') anychar*
//! body    ::= (WS | '(' comment ')' | code | assignment | keyword-construct)*
//! code    ::= letter expr
//! assignment ::= '#' parameter WS* (assign-op WS* expr | '++' | '--')
//! reference  ::= '#'+ (parameter | '[' expr ']')
//! assign-op  ::= '=' | '+=' | '-=' | '*=' | '/='
//! ```

use std::rc::Rc;

use gcodedrive_core::{Code, Dialect, Error, Location, Number, Value, MINIMUM_DELTA};

use crate::action::{
    apply_name_assignment, apply_num_assignment, classify_comment, Action, AssignOp,
    CommentAction, CommentCmd, Deferred, IfData, WhileData,
};
use crate::expr::{adjust_precedence, fault, want_number, BinOp, Expr, Function, Interrupt, UnOp};
use crate::host::ParseHost;
use crate::scanner::{ByteScanner, SliceScanner};

/// Where in a line the parser currently is; constrains what may come next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    /// Before `Nnnn`.
    BeforeLineNum,
    /// After `Nnnn`.
    AfterLineNum,
    /// After the first code or assignment.
    InBody,
    /// After `*nnn`; only trivia may follow on this line.
    AfterChecksum,
}

/// A pending pass over a `WHILE` body.
#[derive(Debug)]
struct Frame {
    data: Rc<WhileData>,
    idx: usize,
}

/// A streaming, dialect-aware G-code parser.
pub struct Parser<S> {
    scanner: S,
    dialect: Dialect,
    line_state: LineState,
    physical_line: u32,
    virtual_line: u32,
    stack: Vec<Frame>,
}

impl<S: ByteScanner> Parser<S> {
    /// Create a parser over a byte source.
    pub fn new(scanner: S, dialect: Dialect) -> Self {
        Parser {
            scanner,
            dialect,
            line_state: LineState::BeforeLineNum,
            physical_line: 0,
            virtual_line: 0,
            stack: Vec::new(),
        }
    }

    /// The source coordinates of the line being parsed, 1-based.
    pub fn location(&self) -> Location {
        Location {
            physical_line: self.physical_line + 1,
            virtual_line: self.virtual_line + 1,
        }
    }

    /// Parse and execute until a logical line yields codes.
    ///
    /// Returns `Ok(Some(codes))` for the next non-empty line, `Ok(None)` at
    /// end of input, and an error annotated with source coordinates on any
    /// failure. Lines without codes (blank, comment-only, assignments,
    /// control flow) are consumed along the way.
    pub fn parse(&mut self, host: &mut dyn ParseHost) -> Result<Option<Vec<Code>>, Error> {
        let mut codes = Vec::new();
        let mut deferred = Vec::new();
        loop {
            match self.step(host, &mut codes, &mut deferred) {
                Ok(true) if !codes.is_empty() => {
                    tracing::trace!(line = %self.location(), count = codes.len(), "parsed line");
                    return Ok(Some(codes));
                }
                Ok(_) => {}
                Err(Interrupt::Eof) => return Ok(None),
                Err(Interrupt::Fault(message)) => {
                    return Err(Error::Parse {
                        location: self.location(),
                        message,
                    })
                }
            }
        }
    }

    /// Fetch and run the next action, from a pending loop frame if one is
    /// active, otherwise from the source. Returns true at end of line.
    fn step(
        &mut self,
        host: &mut dyn ParseHost,
        codes: &mut Vec<Code>,
        deferred: &mut Vec<Deferred>,
    ) -> Result<bool, Interrupt> {
        loop {
            let next = match self.stack.last_mut() {
                None => break,
                Some(frame) if frame.idx < frame.data.body.len() => {
                    let data = Rc::clone(&frame.data);
                    let idx = frame.idx;
                    frame.idx += 1;
                    Some((data, idx))
                }
                Some(_) => None,
            };
            match next {
                Some((data, idx)) => return self.run_action(&data.body[idx], host, codes, deferred),
                None => {
                    // Body exhausted: re-evaluate the loop test.
                    let frame = self.stack.pop().expect("frame present");
                    let test = want_number(frame.data.test.eval(host)?)?;
                    if !Number(0.0).equal(test) {
                        self.stack.push(Frame {
                            data: frame.data,
                            idx: 0,
                        });
                    }
                }
            }
        }

        let action = self.parse_action(host)?;
        self.run_action(&action, host, codes, deferred)
    }

    fn run_action(
        &mut self,
        action: &Action,
        host: &mut dyn ParseHost,
        codes: &mut Vec<Code>,
        deferred: &mut Vec<Deferred>,
    ) -> Result<bool, Interrupt> {
        match action {
            Action::Code { letter, expr } => {
                codes.push(Code {
                    letter: *letter,
                    value: expr.eval(host)?,
                });
                Ok(false)
            }

            Action::NumAssign { num, op, expr } => {
                if self.dialect.has_linux_cnc() {
                    deferred.push(Deferred::Num {
                        num: *num,
                        op: *op,
                        expr: expr.clone(),
                    });
                } else {
                    apply_num_assignment(host, *num, *op, expr)?;
                }
                Ok(false)
            }

            Action::NameAssign { name, op, expr } => {
                if self.dialect.has_linux_cnc() {
                    deferred.push(Deferred::Name {
                        name: name.clone(),
                        op: *op,
                        expr: expr.clone(),
                    });
                } else {
                    apply_name_assignment(host, name, *op, expr)?;
                }
                Ok(false)
            }

            Action::Comment(comment) => {
                self.run_comment(comment, host)?;
                Ok(false)
            }

            Action::If(data) => {
                let test = want_number(data.test.eval(host)?)?;
                if !Number(0.0).equal(test) {
                    return self.run_action(&data.then_assign, host, codes, deferred);
                }
                for (test, assign) in &data.elseifs {
                    let test = want_number(test.eval(host)?)?;
                    if test.0.abs() >= MINIMUM_DELTA {
                        return self.run_action(assign, host, codes, deferred);
                    }
                }
                if let Some(assign) = &data.else_assign {
                    return self.run_action(assign, host, codes, deferred);
                }
                Ok(false)
            }

            Action::While(data) => {
                let test = want_number(data.test.eval(host)?)?;
                if !Number(0.0).equal(test) {
                    self.stack.push(Frame {
                        data: Rc::clone(data),
                        idx: 0,
                    });
                }
                Ok(false)
            }

            Action::End => fault("unexpected END, no matching WHILE"),

            Action::Eol => {
                for assign in deferred.drain(..) {
                    match assign {
                        Deferred::Num { num, op, expr } => {
                            apply_num_assignment(host, num, op, &expr)?
                        }
                        Deferred::Name { name, op, expr } => {
                            apply_name_assignment(host, &name, op, &expr)?
                        }
                    }
                }
                Ok(true)
            }
        }
    }

    fn run_comment(
        &mut self,
        comment: &CommentAction,
        host: &mut dyn ParseHost,
    ) -> Result<(), Interrupt> {
        match comment.cmd {
            CommentCmd::Msg => host.message(&comment.body),
            CommentCmd::Debug => {
                // #5599 zero suppresses debug output; unset prints.
                if let Some(gate) = host.num_param(5599) {
                    if gate.equal(Number(0.0)) {
                        return Ok(());
                    }
                }
                let text = if comment.has_params {
                    self.expand_comment(host, &comment.body)?
                } else {
                    comment.body.clone()
                };
                host.message(&text);
            }
            CommentCmd::Print => {
                let text = if comment.has_params {
                    self.expand_comment(host, &comment.body)?
                } else {
                    comment.body.clone()
                };
                host.diagnostic(&text);
            }
        }
        Ok(())
    }

    /// Re-lex a comment body, replacing `#num` and `#<name>` references
    /// with the parameter's stringified value.
    fn expand_comment(
        &self,
        host: &mut dyn ParseHost,
        body: &str,
    ) -> Result<String, Interrupt> {
        let mut scanner = SliceScanner::new(body.as_bytes());
        let mut out: Vec<u8> = Vec::new();
        while let Some(b) = scanner.read_byte() {
            if b != b'#' {
                out.push(b);
                continue;
            }
            match parse_parameter(&mut scanner, self.dialect)? {
                Value::Number(num) => {
                    let idx = match num.as_integer() {
                        Some(idx) if idx >= 1 => idx,
                        _ => {
                            return fault(format!(
                                "number parameter must be a positive integer: {}",
                                num
                            ))
                        }
                    };
                    let val = match host.num_param(idx) {
                        Some(val) => val,
                        None => {
                            return fault(format!("global number parameter {} not found", idx))
                        }
                    };
                    out.extend_from_slice(val.to_string().as_bytes());
                }
                Value::Name(name) => {
                    let val = match host.name_param(&name) {
                        Some(val) => val,
                        None => {
                            return fault(format!("global name parameter <{}> not found", name))
                        }
                    };
                    out.extend_from_slice(val.to_string().as_bytes());
                }
                Value::Str(_) => unreachable!("parameters are numbers or names"),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    // -- lexing helpers --

    fn read_byte(&mut self) -> Result<u8, Interrupt> {
        self.scanner.read_byte().ok_or(Interrupt::Eof)
    }

    fn skip_whitespace(&mut self) -> Result<(), Interrupt> {
        loop {
            let b = self.read_byte()?;
            if b != b' ' && b != b'\t' {
                break;
            }
        }
        self.scanner.unread_byte();
        Ok(())
    }

    /// A newline was consumed: reset per-line state and advance the line
    /// counters.
    fn end_line(&mut self) {
        self.line_state = LineState::BeforeLineNum;
        self.physical_line += 1;
        self.virtual_line += 1;
    }

    fn want_integer(&mut self) -> Result<i64, Interrupt> {
        let mut num: i64 = 0;
        let mut count = 0;
        loop {
            let b = self.read_byte()?;
            if !b.is_ascii_digit() {
                break;
            }
            count += 1;
            num = num * 10 + i64::from(b - b'0');
            if num > i64::from(i32::MAX) {
                return fault("number too big");
            }
        }
        if count == 0 {
            return fault("expected a number");
        }
        self.scanner.unread_byte();
        Ok(num)
    }

    fn want_end_of_line(&mut self) -> Result<(), Interrupt> {
        self.skip_whitespace()?;
        let b = self.read_byte()?;
        if b != b'\n' && b != b'\r' {
            return fault("expected end of line");
        }
        self.end_line();
        Ok(())
    }

    fn parse_number(&mut self) -> Result<Expr, Interrupt> {
        let mut bytes: Vec<u8> = Vec::new();
        let mut negative = false;
        let b = self.read_byte()?;
        if b == b'-' {
            negative = true;
        } else if b != b'+' {
            bytes.push(b);
        }

        loop {
            let b = self.read_byte()?;
            if b.is_ascii_digit() {
                bytes.push(b);
            } else if b == b'.' {
                bytes.push(b);
                loop {
                    let b = self.read_byte()?;
                    if b.is_ascii_digit() {
                        bytes.push(b);
                    } else {
                        break;
                    }
                }
                break;
            } else {
                break;
            }
        }
        self.scanner.unread_byte();

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let Ok(mut n) = text.parse::<f64>() else {
            return fault("not a number");
        };
        // Overflow is only detected for the integer part; a long fractional
        // tail is accepted.
        let int_part = text.split('.').next().unwrap_or("");
        if !int_part.is_empty() && !matches!(int_part.parse::<i64>(), Ok(v) if v <= i64::from(i32::MAX))
        {
            return fault("number too big");
        }

        if negative {
            n = -n;
        }
        Ok(Expr::Lit(Value::Number(Number(n))))
    }

    fn parse_symbol(&mut self, first: u8) -> Result<Option<String>, Interrupt> {
        let second = upcase_byte(self.read_byte()?);
        if !symbol_byte(second) {
            self.scanner.unread_byte();
            return Ok(None);
        }
        let mut symbol = vec![first, second];
        loop {
            let b = upcase_byte(self.read_byte()?);
            if !symbol_byte(b) {
                break;
            }
            symbol.push(b);
        }
        self.scanner.unread_byte();
        Ok(Some(String::from_utf8_lossy(&symbol).into_owned()))
    }

    fn parse_string(&mut self) -> Result<String, Interrupt> {
        let mut s = Vec::new();
        loop {
            let mut b = self.read_byte()?;
            if b == b'\n' || b == b'\r' {
                return fault("strings may not contain newlines");
            }
            if b == b'"' {
                break;
            }
            if b == b'\\' {
                b = self.read_byte()?;
            }
            s.push(b);
        }
        Ok(String::from_utf8_lossy(&s).into_owned())
    }

    /// A `<name>` literal, with the opening `<` already consumed.
    fn parse_name(&mut self) -> Result<String, Interrupt> {
        let mut name = Vec::new();
        loop {
            let b = self.read_byte()?;
            if name_byte(b) {
                name.push(b);
            } else {
                if b != b'>' {
                    return fault("missing > at end of parameter");
                }
                break;
            }
        }
        if name.is_empty() {
            return fault("empty names not allowed");
        }
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    // -- expressions --

    fn parse_expr(&mut self) -> Result<Expr, Interrupt> {
        self.skip_whitespace()?;
        let b = self.read_byte()?;
        match b {
            b'#' => self.parse_reference(),
            b'[' => {
                let e = adjust_precedence(self.parse_sub_expr()?);
                self.skip_whitespace()?;
                let b = self.read_byte()?;
                if b != b']' {
                    return fault(format!("expected closing brace, got {}", b as char));
                }
                Ok(e)
            }
            b'<' => Ok(Expr::Lit(Value::Name(self.parse_name()?))),
            b'"' => Ok(Expr::Lit(Value::Str(self.parse_string()?))),
            _ => {
                self.scanner.unread_byte();
                self.parse_number()
            }
        }
    }

    /// `'#'+ (parameter | '[' expr ']')`, with the first `#` consumed.
    fn parse_reference(&mut self) -> Result<Expr, Interrupt> {
        let mut refs = 1u32;
        let mut b = self.read_byte()?;
        while b == b'#' {
            refs += 1;
            b = self.read_byte()?;
        }
        self.scanner.unread_byte();

        let expr = if b == b'[' {
            self.parse_expr()?
        } else {
            Expr::Lit(parse_parameter(&mut self.scanner, self.dialect)?)
        };
        Ok(Expr::Param {
            refs,
            expr: Box::new(expr),
        })
    }

    fn parse_sub_expr(&mut self) -> Result<Expr, Interrupt> {
        self.skip_whitespace()?;
        let raw = self.read_byte()?;

        let e = match raw {
            b'-' => Expr::Unary {
                op: UnOp::Negate,
                expr: Box::new(self.parse_sub_expr()?),
            },
            b'!' => Expr::Unary {
                op: UnOp::Not,
                expr: Box::new(self.parse_sub_expr()?),
            },
            b'[' => {
                let inner = Expr::Unary {
                    op: UnOp::Group,
                    expr: Box::new(self.parse_sub_expr()?),
                };
                self.skip_whitespace()?;
                let b = self.read_byte()?;
                if b != b']' {
                    return fault(format!("expected closing brace, got {}", b as char));
                }
                inner
            }
            b'#' => self.parse_reference()?,
            b'<' => Expr::Lit(Value::Name(self.parse_name()?)),
            b'"' => Expr::Lit(Value::Str(self.parse_string()?)),
            _ => {
                let b = upcase_byte(raw);
                if b.is_ascii_uppercase() {
                    self.parse_call(b)?
                } else {
                    self.scanner.unread_byte();
                    self.parse_number()?
                }
            }
        };

        self.skip_whitespace()?;
        let b = self.read_byte()?;
        let op = match b {
            b'+' => BinOp::Add,
            b'-' => BinOp::Subtract,
            b'*' => BinOp::Multiply,
            b'/' => BinOp::Divide,
            b'=' => {
                let n = self.read_byte()?;
                if n != b'=' {
                    return fault(format!("expected ==, got ={}", n as char));
                }
                BinOp::Equal
            }
            b'!' => {
                let n = self.read_byte()?;
                if n != b'=' {
                    return fault(format!("expected !=, got !{}", n as char));
                }
                BinOp::NotEqual
            }
            b'<' => {
                let n = self.read_byte()?;
                if n == b'=' {
                    BinOp::LessEqual
                } else {
                    self.scanner.unread_byte();
                    BinOp::LessThan
                }
            }
            b'>' => {
                let n = self.read_byte()?;
                if n == b'=' {
                    BinOp::GreaterEqual
                } else {
                    self.scanner.unread_byte();
                    BinOp::GreaterThan
                }
            }
            b'&' => {
                let n = self.read_byte()?;
                if n != b'&' {
                    return fault(format!("expected &&, got &{}", n as char));
                }
                BinOp::And
            }
            b'|' => {
                let n = self.read_byte()?;
                if n != b'|' {
                    return fault(format!("expected ||, got |{}", n as char));
                }
                BinOp::Or
            }
            _ => {
                self.scanner.unread_byte();
                return Ok(e);
            }
        };

        Ok(Expr::Binary {
            op,
            left: Box::new(e),
            right: Box::new(self.parse_sub_expr()?),
        })
    }

    /// A function call, with the upcased first letter of the name consumed.
    fn parse_call(&mut self, first: u8) -> Result<Expr, Interrupt> {
        let Some(symbol) = self.parse_symbol(first)? else {
            return fault("expected a function name");
        };
        let Some(func) = Function::lookup(&symbol) else {
            return fault(format!("function not found: {}", symbol));
        };

        self.skip_whitespace()?;
        let b = self.read_byte()?;
        if b != b'[' {
            return fault(format!("expected [ following function name; got {}", b as char));
        }

        let mut args = Vec::new();
        self.skip_whitespace()?;
        let b = self.read_byte()?;
        if b != b']' {
            self.scanner.unread_byte();
            loop {
                args.push(self.parse_sub_expr()?);
                self.skip_whitespace()?;
                let b = self.read_byte()?;
                if b == b']' {
                    break;
                } else if b != b',' {
                    return fault("expected a comma (,) between arguments");
                }
            }
        }
        if args.len() != func.arity() {
            return fault(format!(
                "wrong number of arguments to function {}: got {}, want {}",
                symbol,
                args.len(),
                func.arity()
            ));
        }
        Ok(Expr::Call { func, args })
    }

    // -- assignments --

    fn parse_assign_op(&mut self) -> Result<AssignOp, Interrupt> {
        self.skip_whitespace()?;
        let b = self.read_byte()?;
        if b == b'=' {
            return Ok(AssignOp::Assign);
        }

        if matches!(b, b'-' | b'+' | b'*' | b'/') {
            let n = self.read_byte()?;
            match (b, n) {
                (b'-', b'-') => return Ok(AssignOp::Decrement),
                (b'-', b'=') => return Ok(AssignOp::SubAssign),
                (b'+', b'+') => return Ok(AssignOp::Increment),
                (b'+', b'=') => return Ok(AssignOp::AddAssign),
                (b'*', b'=') => return Ok(AssignOp::MulAssign),
                (b'/', b'=') => return Ok(AssignOp::DivAssign),
                _ => {}
            }
        }

        fault("expected an assignment operator (=, +=, -=, *=, /=, ++, --)")
    }

    /// An assignment, with the leading `#` consumed.
    fn parse_assignment(&mut self) -> Result<Action, Interrupt> {
        let param = parse_parameter(&mut self.scanner, self.dialect)?;
        let op = self.parse_assign_op()?;
        let expr = if matches!(op, AssignOp::Increment | AssignOp::Decrement) {
            Expr::Lit(Value::Number(Number(1.0)))
        } else {
            self.parse_expr()?
        };

        match param {
            Value::Number(num) => Ok(Action::NumAssign {
                num: num.0 as i64,
                op,
                expr,
            }),
            Value::Name(name) => Ok(Action::NameAssign { name, op, expr }),
            Value::Str(_) => fault("expected parameter name or number"),
        }
    }

    // -- BeagleG block keywords --

    /// `'WHILE' expr 'DO' <EOL> line* 'END'`.
    fn parse_while(&mut self, host: &mut dyn ParseHost) -> Result<Action, Interrupt> {
        let test = self.parse_expr()?;

        self.skip_whitespace()?;
        let b = upcase_byte(self.read_byte()?);
        if b != b'D' || self.parse_symbol(b)?.as_deref() != Some("DO") {
            return fault("expected keyword DO");
        }
        self.want_end_of_line()?;

        let mut body = Vec::new();
        loop {
            let action = self.parse_action(host)?;
            if matches!(action, Action::End) {
                break;
            }
            body.push(action);
        }

        Ok(Action::While(Rc::new(WhileData { test, body })))
    }

    fn parse_end(&mut self) -> Result<Action, Interrupt> {
        self.want_end_of_line()?;
        Ok(Action::End)
    }

    /// `… expr 'THEN' assignment`, shared by `IF` and `ELSEIF`.
    fn parse_expr_then_assign(&mut self) -> Result<(Expr, Action), Interrupt> {
        let test = self.parse_expr()?;

        self.skip_whitespace()?;
        let b = upcase_byte(self.read_byte()?);
        if b != b'T' || self.parse_symbol(b)?.as_deref() != Some("THEN") {
            return fault("expected keyword THEN");
        }

        self.skip_whitespace()?;
        if self.read_byte()? != b'#' {
            return fault("expected an assignment");
        }
        let assign = self.parse_assignment()?;
        Ok((test, assign))
    }

    /// `'IF' expr 'THEN' assignment ('ELSEIF' expr 'THEN' assignment)*
    /// ('ELSE' assignment)?`, all on one line.
    fn parse_if(&mut self) -> Result<Action, Interrupt> {
        let (test, then_assign) = self.parse_expr_then_assign()?;

        let mut elseifs = Vec::new();
        let mut else_assign = None;
        loop {
            self.skip_whitespace()?;
            let raw = self.read_byte()?;
            if raw == b'\n' || raw == b'\r' {
                self.end_line();
                break;
            }
            let b = upcase_byte(raw);
            if b != b'E' {
                return fault("expected keyword ELSEIF or ELSE");
            }
            match self.parse_symbol(b)?.as_deref() {
                Some("ELSEIF") => {
                    let (test, assign) = self.parse_expr_then_assign()?;
                    elseifs.push((test, assign));
                }
                Some("ELSE") => {
                    self.skip_whitespace()?;
                    if self.read_byte()? != b'#' {
                        return fault("expected an assignment");
                    }
                    else_assign = Some(self.parse_assignment()?);
                    self.want_end_of_line()?;
                    break;
                }
                _ => return fault("expected keyword ELSEIF or ELSE"),
            }
        }

        Ok(Action::If(Box::new(IfData {
            test,
            then_assign,
            elseifs,
            else_assign,
        })))
    }

    // -- the line-oriented driver --

    /// Parse the next action out of the source.
    fn parse_action(&mut self, host: &mut dyn ParseHost) -> Result<Action, Interrupt> {
        loop {
            self.skip_whitespace()?;
            let raw = self.read_byte()?;
            let b = upcase_byte(raw);

            if raw == b'\n' || raw == b'\r' {
                self.end_line();
                return Ok(Action::Eol);
            } else if raw == b';' || raw == b'%' {
                let mut bytes = Vec::new();
                loop {
                    let c = self.read_byte()?;
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    bytes.push(c);
                }
                let body = String::from_utf8_lossy(&bytes).into_owned();

                if self.dialect.has_linux_cnc() {
                    if let Some(action) = classify_comment(&body, host) {
                        // Leave the newline for the next action.
                        self.scanner.unread_byte();
                        return Ok(Action::Comment(action));
                    }
                }
                if self.dialect.has_beagleg() {
                    host.line_comment(&body);
                }
                self.end_line();
                return Ok(Action::Eol);
            } else if raw == b'(' {
                let mut bytes = Vec::new();
                loop {
                    let c = self.read_byte()?;
                    if c == b'\n' || c == b'\r' {
                        return fault("inline comments must be on one line");
                    }
                    if c == b')' {
                        break;
                    }
                    bytes.push(c);
                }

                if self.dialect.has_linux_cnc() {
                    let body = String::from_utf8_lossy(&bytes).into_owned();
                    if let Some(action) = classify_comment(&body, host) {
                        return Ok(Action::Comment(action));
                    }
                }
            } else if raw == b'*' {
                // Parse and discard *nnn; nothing non-trivial may follow.
                if self.line_state == LineState::AfterChecksum {
                    return fault("checksum (*nnn) must be at end of line");
                }
                self.want_integer()?;
                self.line_state = LineState::AfterChecksum;
            } else if raw == b'#' {
                if self.line_state == LineState::AfterChecksum {
                    return fault("checksum (*nnn) must be at end of line");
                }
                self.line_state = LineState::InBody;
                return self.parse_assignment();
            } else if !b.is_ascii_uppercase() {
                return fault(format!("unexpected command: {}", raw));
            } else if let Some(keyword) = self.parse_symbol(b)? {
                if self.line_state == LineState::AfterChecksum {
                    return fault("checksum (*nnn) must be at end of line");
                }
                if self.line_state == LineState::InBody {
                    return fault("keyword must come first on line");
                }
                self.line_state = LineState::InBody;

                if self.dialect.has_beagleg() {
                    match keyword.as_str() {
                        "WHILE" => return self.parse_while(host),
                        "END" => return self.parse_end(),
                        "IF" => return self.parse_if(),
                        _ => {}
                    }
                }
                return fault("unexpected keyword");
            } else if b == b'N' {
                if self.line_state != LineState::BeforeLineNum {
                    return fault("N must be first on line");
                }

                let num = self.want_integer()?;
                if num <= i64::from(self.virtual_line) {
                    return fault(format!("N{} invalid", num));
                }
                self.virtual_line = (num - 1) as u32;
                self.line_state = LineState::AfterLineNum;
            } else {
                if self.line_state == LineState::AfterChecksum {
                    return fault("checksum (*nnn) must be at end of line");
                }
                self.line_state = LineState::InBody;

                // Every letter other than N is a code.
                return Ok(Action::Code {
                    letter: b as char,
                    expr: self.parse_expr()?,
                });
            }
        }
    }
}

/// A parameter index or name, read from `scanner` with the leading `#`
/// already consumed. End of input is a token terminator here, not an
/// interruption, so comment bodies can be re-lexed with the same rules.
pub(crate) fn parse_parameter(
    scanner: &mut dyn ByteScanner,
    dialect: Dialect,
) -> Result<Value, Interrupt> {
    let Some(b) = scanner.read_byte() else {
        return fault("unexpected end of input");
    };

    if b.is_ascii_digit() {
        let mut num = i64::from(b - b'0');
        loop {
            let Some(b) = scanner.read_byte() else {
                return Ok(Value::Number(Number(num as f64)));
            };
            if !b.is_ascii_digit() {
                scanner.unread_byte();
                break;
            }
            num = num * 10 + i64::from(b - b'0');
            if num > i64::from(i16::MAX) {
                return fault(format!("number parameter too big: {}", num));
            }
        }
        return Ok(Value::Number(Number(num as f64)));
    }

    if (dialect.has_beagleg() && name_byte(b)) || b == b'<' {
        let delimited = b == b'<';
        let mut name = Vec::new();
        if delimited {
            let Some(b) = scanner.read_byte() else {
                return fault("missing > at end of parameter");
            };
            name.push(b);
        } else {
            name.push(b);
        }

        loop {
            match scanner.read_byte() {
                None if delimited => return fault("missing > at end of parameter"),
                None => return Ok(Value::Name(String::from_utf8_lossy(&name).into_owned())),
                Some(b) if name_byte(b) => name.push(b),
                Some(b) => {
                    if delimited {
                        if b != b'>' {
                            return fault("missing > at end of parameter");
                        }
                    } else {
                        scanner.unread_byte();
                    }
                    return Ok(Value::Name(String::from_utf8_lossy(&name).into_owned()));
                }
            }
        }
    }

    fault(format!("expected parameter name or number; got {}", b as char))
}

fn upcase_byte(b: u8) -> u8 {
    b.to_ascii_uppercase()
}

fn symbol_byte(b: u8) -> bool {
    b.is_ascii_uppercase()
}

fn name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
