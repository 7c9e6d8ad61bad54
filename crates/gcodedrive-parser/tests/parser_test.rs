use std::collections::HashMap;

use gcodedrive_core::{Code, Dialect, Error, Number, Result, Value};
use gcodedrive_parser::{ParseHost, Parser, SliceScanner};

/// A parse host over plain maps, with optional quirks used by individual
/// tests: an OUT/ERR buffer, a slot that reads as undefined, a slot whose
/// writes fail, and the synthetic `#n == n + 100` scheme the expression
/// tests use.
#[derive(Default)]
struct TestHost {
    num_params: HashMap<i64, Number>,
    name_params: HashMap<String, Value>,
    out: Option<Vec<u8>>,
    err: Option<Vec<u8>>,
    comments: Vec<String>,
    expr_params: bool,
    unreadable: Option<i64>,
    unwritable: Option<i64>,
}

impl ParseHost for TestHost {
    fn num_param(&self, num: i64) -> Option<Number> {
        if self.unreadable == Some(num) {
            return None;
        }
        if self.expr_params && num < 100 {
            return Some(Number(num as f64 + 100.0));
        }
        self.num_params.get(&num).copied()
    }

    fn set_num_param(&mut self, num: i64, val: Number) -> Result<()> {
        if self.unwritable == Some(num) {
            return Err(Error::engine("failed"));
        }
        self.num_params.insert(num, val);
        Ok(())
    }

    fn name_param(&self, name: &str) -> Option<Value> {
        self.name_params.get(name).cloned()
    }

    fn set_name_param(&mut self, name: &str, val: Value) -> Result<()> {
        self.name_params.insert(name.to_owned(), val);
        Ok(())
    }

    fn has_message_sink(&self) -> bool {
        self.out.is_some()
    }

    fn message(&mut self, text: &str) {
        if let Some(out) = &mut self.out {
            out.extend_from_slice(text.as_bytes());
            out.push(b'\n');
        }
    }

    fn has_diagnostic_sink(&self) -> bool {
        self.err.is_some()
    }

    fn diagnostic(&mut self, text: &str) {
        if let Some(err) = &mut self.err {
            err.extend_from_slice(text.as_bytes());
            err.push(b'\n');
        }
    }

    fn line_comment(&mut self, text: &str) {
        self.comments.push(text.to_owned());
    }
}

/// What a test case expects from the first `parse` call.
enum Want {
    Codes(Vec<Code>),
    Fail,
    Eof,
}

fn codes(pairs: &[(char, f64)]) -> Want {
    Want::Codes(pairs.iter().map(|&(l, n)| Code::new(l, n)).collect())
}

fn check_parse(input: &str, dialect: Dialect, host: &mut TestHost, want: &Want) {
    let mut parser = Parser::new(SliceScanner::from(input), dialect);
    let got = parser.parse(host);
    match want {
        Want::Codes(expected) => match got {
            Ok(Some(line)) => assert_eq!(&line, expected, "parse({:?})", input),
            other => panic!("parse({:?}): expected codes, got {:?}", input, other),
        },
        Want::Fail => {
            assert!(matches!(got, Err(_)), "parse({:?}) did not fail: {:?}", input, got);
        }
        Want::Eof => {
            assert!(
                matches!(got, Ok(None)),
                "parse({:?}): expected end of input, got {:?}",
                input,
                got
            );
        }
    }
}

/// Run a whole program, returning every non-empty line's codes.
fn parse_program(
    input: &str,
    dialect: Dialect,
    host: &mut TestHost,
) -> Result<Vec<Vec<Code>>> {
    let mut parser = Parser::new(SliceScanner::from(input), dialect);
    let mut lines = Vec::new();
    while let Some(line) = parser.parse(host)? {
        lines.push(line);
    }
    Ok(lines)
}

#[test]
fn test_parse_codes() {
    let cases: Vec<(&str, Want)> = vec![
        ("G10\n", codes(&[('G', 10.0)])),
        ("g10\n", codes(&[('G', 10.0)])),
        (" G 10\n", codes(&[('G', 10.0)])),
        ("(comment)G10\n", codes(&[('G', 10.0)])),
        ("(comment) G10\n", codes(&[('G', 10.0)])),
        ("(comment\n) G10\n", Want::Fail),
        ("; comment\nG10\n", codes(&[('G', 10.0)])),
        ("% comment\nG10\n", codes(&[('G', 10.0)])),
        ("G;comment\n10\n", Want::Fail),
        ("G%comment\n10\n", Want::Fail),
        ("G(comment)10\n", Want::Fail),
        ("GG\n", Want::Fail),
        ("$$$\n", Want::Fail),
        ("G-10\n", codes(&[('G', -10.0)])),
        ("G+10\n", codes(&[('G', 10.0)])),
        ("G+\n", Want::Fail),
        ("G-\n", Want::Fail),
        ("G+.\n", Want::Fail),
        ("G-.\n", Want::Fail),
        ("G.\n", Want::Fail),
        ("G+0\n", codes(&[('G', 0.0)])),
        ("G-0\n", codes(&[('G', 0.0)])),
        ("G+.0\n", codes(&[('G', 0.0)])),
        ("G-.0\n", codes(&[('G', 0.0)])),
        ("G+0.\n", codes(&[('G', 0.0)])),
        ("G-0.\n", codes(&[('G', 0.0)])),
        ("G0.\n", codes(&[('G', 0.0)])),
        ("G.0\n", codes(&[('G', 0.0)])),
        ("G-10.20\n", codes(&[('G', -10.20)])),
        ("G+10.20\n", codes(&[('G', 10.20)])),
        ("G9999999999\n", Want::Fail),
        // Input running out mid-line is end of input, not an error.
        ("G10", Want::Eof),
        ("G10 *20\n", codes(&[('G', 10.0)])),
        ("G10 G30 *20 ;comment\n", codes(&[('G', 10.0), ('G', 30.0)])),
        ("G10 *20 G30\n", Want::Fail),
        ("G10 *20 *30\n", Want::Fail),
        ("N10 G20\n", codes(&[('G', 20.0)])),
        ("N10 G-\n", Want::Fail),
        ("N9999999999999999 G10\n", Want::Fail),
        ("*123 G10\n", Want::Fail),
        ("*123 WHILE\n", Want::Fail),
        (
            "    G10X1Y 2Z3\n",
            codes(&[('G', 10.0), ('X', 1.0), ('Y', 2.0), ('Z', 3.0)]),
        ),
    ];

    for (input, want) in &cases {
        let mut host = TestHost::default();
        check_parse(input, Dialect::ALL, &mut host, want);
        if let Want::Codes(_) = want {
            let mut parser = Parser::new(SliceScanner::from(*input), Dialect::ALL);
            parser.parse(&mut host).unwrap();
            assert!(
                parser.parse(&mut host).unwrap().is_none(),
                "parse({:?}) not at end of input",
                input
            );
        }
    }
}

#[test]
fn test_parse_lines() {
    let input = "\
G10 X1 Y2
G11 (comment) X1 Y2
G12 X1 (comment) Y2
G13 X1 Y2 (comment)
G14 X1 Y2 ; comment
";
    let mut host = TestHost::default();
    let lines = parse_program(input, Dialect::ALL, &mut host).unwrap();
    let expected: Vec<Vec<Code>> = (10..=14)
        .map(|g| {
            vec![
                Code::new('G', f64::from(g)),
                Code::new('X', 1.0),
                Code::new('Y', 2.0),
            ]
        })
        .collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_parameter_syntax() {
    // (input, dialect, expected named param, expected value)
    let ok: Vec<(&str, Dialect, &str, f64)> = vec![
        ("#abc=11\nG1\n", Dialect::ALL, "abc", 11.0),
        ("#abc_123=5\nG1\n", Dialect::BEAGLEG, "abc_123", 5.0),
        ("#<abc>=7\nG1\n", Dialect::LINUX_CNC, "abc", 7.0),
        ("#<abc123>=8\nG1\n", Dialect::LINUX_CNC, "abc123", 8.0),
        ("#<123>=9\nG1\n", Dialect::ALL, "123", 9.0),
    ];
    for (input, dialect, name, value) in ok {
        let mut host = TestHost::default();
        parse_program(input, dialect, &mut host).unwrap();
        assert_eq!(
            host.name_params.get(name),
            Some(&Value::Number(Number(value))),
            "parse({:?})",
            input
        );
    }

    let fail: Vec<(&str, Dialect)> = vec![
        ("#abc=1\nG1\n", Dialect::LINUX_CNC), // bare names are BeagleG-only
        ("#<abc =1\nG1\n", Dialect::ALL),
        ("#<>=1\nG1\n", Dialect::ALL),
        ("#$$$=1\nG1\n", Dialect::ALL),
        ("#\"abcd\"=123\nG1\n", Dialect::ALL),
        ("#123456789=0\nG1\n", Dialect::ALL),
        ("#abc=10\n*#abc \n", Dialect::ALL),
        ("#abc=10\nN#abc \n", Dialect::ALL),
        ("#abc=10 N123\n", Dialect::ALL),
        ("*123 #abc=10\n", Dialect::ALL),
    ];
    for (input, dialect) in fail {
        let mut host = TestHost::default();
        assert!(
            parse_program(input, dialect, &mut host).is_err(),
            "parse({:?}) did not fail",
            input
        );
    }
}

#[test]
fn test_name_assignments() {
    let cases: Vec<(&str, Option<f64>)> = vec![
        ("#abc=11\nG10\n", Some(11.0)),
        ("#abc =11\nG10\n", Some(11.0)),
        ("#abc= 11\nG10\n", Some(11.0)),
        ("#abc = 11\nG10\n", Some(11.0)),
        ("#abc+=11\nG10\n", None),
        ("#abc=11\n#abc+=11\nG10\n", Some(22.0)),
        ("#abc=11\n#abc++\nG10\n", Some(12.0)),
        ("#abc-=11\nG10\n", None),
        ("#abc=11\n#abc-=22\nG10\n", Some(-11.0)),
        ("#abc=11\n#abc--\nG10\n", Some(10.0)),
        ("#abc*=11\nG10\n", None),
        ("#abc=0\n#abc*=11\nG10\n", Some(0.0)),
        ("#abc=11\n#abc*=8\nG10\n", Some(88.0)),
        ("#abc/=11\nG10\n", None),
        ("#abc=0\n#abc/=2\nG10\n", Some(0.0)),
        ("#abc=22\n#abc/=2\nG10\n", Some(11.0)),
    ];

    for (input, want) in cases {
        let mut host = TestHost::default();
        let got = parse_program(input, Dialect::ALL, &mut host);
        match want {
            Some(value) => {
                got.unwrap_or_else(|err| panic!("parse({:?}) failed: {}", input, err));
                assert_eq!(
                    host.name_params.get("abc"),
                    Some(&Value::Number(Number(value))),
                    "parse({:?})",
                    input
                );
            }
            None => assert!(got.is_err(), "parse({:?}) did not fail", input),
        }
    }
}

#[test]
fn test_num_assignments() {
    // Parameter 999 starts defined as 0; 666 reads as undefined; writes to
    // 777 fail.
    let cases: Vec<(&str, Option<f64>)> = vec![
        ("#999=11\nG10\n", Some(11.0)),
        ("#777=11\nG10\n", None),
        ("#999+=11\nG10\n", Some(11.0)),
        ("#999=11\n#999+=11\nG10\n", Some(22.0)),
        ("#999=11\n#999++\nG10\n", Some(12.0)),
        ("#666+=11\nG10\n", None),
        ("#666++\nG10\n", None),
        ("#777+=11\nG10\n", None),
        ("#777++\nG10\n", None),
        ("#999-=11\nG10\n", Some(-11.0)),
        ("#999=11\n#999-=22\nG10\n", Some(-11.0)),
        ("#999=11\n#999--\nG10\n", Some(10.0)),
        ("#999*=11\nG10\n", Some(0.0)),
        ("#999=11\n#999*=8\nG10\n", Some(88.0)),
        ("#999/=2\nG10\n", Some(0.0)),
        ("#999=22\n#999/=2\nG10\n", Some(11.0)),
    ];

    for (input, want) in cases {
        let mut host = TestHost {
            unreadable: Some(666),
            unwritable: Some(777),
            ..TestHost::default()
        };
        host.num_params.insert(999, Number(0.0));
        let got = parse_program(input, Dialect::ALL, &mut host);
        match want {
            Some(value) => {
                got.unwrap_or_else(|err| panic!("parse({:?}) failed: {}", input, err));
                assert_eq!(
                    host.num_params.get(&999),
                    Some(&Number(value)),
                    "parse({:?})",
                    input
                );
            }
            None => assert!(got.is_err(), "parse({:?}) did not fail", input),
        }
    }
}

#[test]
fn test_if() {
    enum IfWant {
        Param(i64, f64),
        Fail,
        Eof,
    }
    use IfWant::*;

    let cases: Vec<(&str, IfWant)> = vec![
        ("#100=0\nIF 1 THEN #100=1\nG1\n", Param(100, 1.0)),
        ("#100=0\nIF 0 THEN #100=1\nG1\n", Param(100, 0.0)),
        ("#100=1 #200=0\nIF #100 THEN #200=1\nG1\n", Param(200, 1.0)),
        ("#100=0 #200=0\nIF #100 THEN #200=1\nG1\n", Param(200, 0.0)),
        ("#100=1\nIF #100 THEN #200=1 ELSE #200=2\nG1\n", Param(200, 1.0)),
        ("#100=0\nIF #100 THEN #200=1 ELSE #200=2\nG1\n", Param(200, 2.0)),
        ("IF 0\n", Fail),
        ("IF 0 THEN\n", Fail),
        ("IF 0 THEN [1 + 2]\n", Fail),
        ("IF G1\n", Fail),
        ("IF 0 THEN #100=1\n", Eof),
        ("IF 0 THEN #100=1 THEN\n", Fail),
        ("IF 0 THEN #100=1 ELSE 123\n", Fail),
        ("IF 0 THEN #100=1 ELSENOT\n", Fail),
        ("G0 IF 0 THEN #100=1\n", Fail),
        (
            "#100=0\nIF 1 THEN #100=1 ELSEIF 1 THEN #100=2 ELSE #100=3\nG1\n",
            Param(100, 1.0),
        ),
        (
            "#100=0\nIF 0 THEN #100=1 ELSEIF 1 THEN #100=2 ELSE #100=3\nG1\n",
            Param(100, 2.0),
        ),
        (
            "#100=0\nIF 0 THEN #100=1 ELSEIF 0 THEN #100=2 ELSE #100=3\nG1\n",
            Param(100, 3.0),
        ),
        (
            "#100=0\nIF 1 THEN #100=1 ELSEIF 1 THEN #100=2 ELSEIF 1 THEN #100=3 ELSE #100=4\nG1\n",
            Param(100, 1.0),
        ),
        (
            "#100=0\nIF 0 THEN #100=1 ELSEIF 1 THEN #100=2 ELSEIF 1 THEN #100=3 ELSE #100=4\nG1\n",
            Param(100, 2.0),
        ),
        (
            "#100=0\nIF 0 THEN #100=1 ELSEIF 0 THEN #100=2 ELSEIF 1 THEN #100=3 ELSE #100=4\nG1\n",
            Param(100, 3.0),
        ),
        (
            "#100=0\nIF 0 THEN #100=1 ELSEIF 0 THEN #100=2 ELSEIF 0 THEN #100=3 ELSE #100=4\nG1\n",
            Param(100, 4.0),
        ),
    ];

    for (input, want) in cases {
        let mut host = TestHost::default();
        let got = parse_program(input, Dialect::ALL, &mut host);
        match want {
            Param(num, value) => {
                got.unwrap_or_else(|err| panic!("parse({:?}) failed: {}", input, err));
                assert_eq!(
                    host.num_params.get(&num),
                    Some(&Number(value)),
                    "parse({:?})",
                    input
                );
            }
            Fail => assert!(got.is_err(), "parse({:?}) did not fail", input),
            Eof => assert!(got.is_ok(), "parse({:?}) failed: {:?}", input, got.err()),
        }
    }
}

#[test]
fn test_while() {
    enum WhileWant {
        Param(i64, f64),
        Fail,
        Eof,
    }
    use WhileWant::*;

    let cases: Vec<(&str, WhileWant)> = vec![
        ("END\n", Fail),
        ("WHILE 0\n", Fail),
        ("WHILE 0 DO G1\n", Fail),
        ("WHILE 0 DO\n#100=1\n", Eof),
        ("WHILE DO\n", Fail),
        ("WHILE 0 DO\n#100=1\nEND G1\n", Fail),
        (
            "#100=0\nWHILE [#100 < 10] DO\n    #100 += 1\nEND\nG1\n",
            Param(100, 10.0),
        ),
        (
            "#100=0\n#200=1\nWHILE [#100 < 4] DO\n    #100 += 1\n    #200 *= 2\nEND\nG1\n",
            Param(200, 16.0),
        ),
        (
            "#100=0\n#200=0\nWHILE [#200 < 10] DO\n    #300=0\n    WHILE [#300 < 10] DO\n        #100 += 1\n        #300 += 1\n    END\n    #200 += 1\nEND\nG1\n",
            Param(100, 100.0),
        ),
    ];

    for (input, want) in cases {
        let mut host = TestHost::default();
        let got = parse_program(input, Dialect::ALL, &mut host);
        match want {
            Param(num, value) => {
                got.unwrap_or_else(|err| panic!("parse({:?}) failed: {}", input, err));
                assert_eq!(
                    host.num_params.get(&num),
                    Some(&Number(value)),
                    "parse({:?})",
                    input
                );
            }
            Fail => assert!(got.is_err(), "parse({:?}) did not fail", input),
            Eof => assert!(got.is_ok(), "parse({:?}) failed: {:?}", input, got.err()),
        }
    }
}

#[test]
fn test_comments() {
    struct Case {
        input: &'static str,
        out: &'static str,
        err: &'static str,
        fail: bool,
    }
    let cases = vec![
        Case { input: " ;abcd\nG10\n", out: "", err: "", fail: false },
        Case { input: "(abcd) G10\n", out: "", err: "", fail: false },
        Case { input: "(msg,message) G10\n", out: "message\n", err: "", fail: false },
        Case { input: "(debug,debug message) G10\n", out: "debug message\n", err: "", fail: false },
        Case { input: "(print,print message) G10\n", out: "", err: "print message\n", fail: false },
        Case { input: "G10 ;msg,message\nG10\n", out: "message\n", err: "", fail: false },
        Case { input: "G10 ;debug,debug message\nG10\n", out: "debug message\n", err: "", fail: false },
        Case { input: "G10 ;print,print message\nG10\n", out: "", err: "print message\n", fail: false },
        Case {
            input: "\
#123=456
#456=321
#<abc>=789
#<def>=\"a string\"
#<ghi>=<name>
(msg,#123 #<abc>)
(debug,#123 #<abc>)
(print,#123 #<abc>)
(debug,#<def> #<ghi> #456)
G10
",
            out: "#123 #<abc>\n456.0000 789.0000\na string <name> 321.0000\n",
            err: "456.0000 789.0000\n",
            fail: false,
        },
        Case {
            input: "#5599=0\n(debug,no message)\n#5599=1\n(debug,need message)\nG10\n",
            out: "need message\n",
            err: "",
            fail: false,
        },
        Case { input: "(debug,#<abc>) G10\n", out: "", err: "", fail: true },
        Case { input: "(debug,# ) G10\n", out: "", err: "", fail: true },
        Case { input: "(debug, #) G10\n", out: "", err: "", fail: true },
        Case { input: "(debug, #<abc) G10\n", out: "", err: "", fail: true },
        Case { input: "(debug, #1234567890) G10\n", out: "", err: "", fail: true },
    ];

    for case in cases {
        let mut host = TestHost {
            out: Some(Vec::new()),
            err: Some(Vec::new()),
            ..TestHost::default()
        };
        let got = parse_program(case.input, Dialect::ALL, &mut host);
        if case.fail {
            assert!(got.is_err(), "parse({:?}) did not fail", case.input);
            continue;
        }
        got.unwrap_or_else(|err| panic!("parse({:?}) failed: {}", case.input, err));
        assert_eq!(
            String::from_utf8(host.out.unwrap()).unwrap(),
            case.out,
            "parse({:?}) OUT",
            case.input
        );
        assert_eq!(
            String::from_utf8(host.err.unwrap()).unwrap(),
            case.err,
            "parse({:?}) ERR",
            case.input
        );
    }
}

#[test]
fn test_comments_without_sinks_are_inert() {
    let mut host = TestHost::default();
    parse_program("(msg,message)(debug,#1)(print,#1) G10\n", Dialect::ALL, &mut host)
        .unwrap_or_else(|err| panic!("failed: {}", err));
}

#[test]
fn test_line_comment_hook() {
    let mut host = TestHost::default();
    parse_program("G10 ; tail note\nG11 % another\n", Dialect::BEAGLEG, &mut host).unwrap();
    assert_eq!(host.comments, vec![" tail note".to_owned(), " another".to_owned()]);
}

#[test]
fn test_parameters() {
    let cases: Vec<(&str, Option<Dialect>, Want)> = vec![
        ("#abc=11\nG#abc\n", None, codes(&[('G', 11.0)])),
        ("G#abc\n", None, Want::Fail),
        ("#999=22\nG#999\n", None, codes(&[('G', 22.0)])),
        ("G#888\n", None, Want::Fail),
        ("#1=2 #2=3\nG##1\n", None, codes(&[('G', 3.0)])),
        ("#3=4\nG#[1+2]\n", None, codes(&[('G', 4.0)])),
        ("#3=5\n#4=#[1+2]\nG#4\n", None, codes(&[('G', 5.0)])),
        ("#abc=<def> #def=11\nG##abc\n", None, codes(&[('G', 11.0)])),
        ("#abc=123\nG##abc\n", None, Want::Fail),
        // Assignment timing: immediate in BeagleG, end-of-line in LinuxCNC.
        ("#abc=1\n#abc=2 G#abc\n", Some(Dialect::BEAGLEG), codes(&[('G', 2.0)])),
        ("#<abc>=1\n#<abc>=2 G#<abc>\n", Some(Dialect::LINUX_CNC), codes(&[('G', 1.0)])),
        ("#1=1\n#1=2 % comment\nG#1\n", Some(Dialect::BEAGLEG), codes(&[('G', 2.0)])),
        ("#1=1\n#1=2 % comment\nG#1\n", Some(Dialect::LINUX_CNC), codes(&[('G', 2.0)])),
        ("#1=-1 \nG##1\n", None, Want::Fail),
        ("#1=2.1 #2=0\nG##1\n", None, Want::Fail),
    ];

    for (input, dialect, want) in &cases {
        let dialect = dialect.unwrap_or(Dialect::ALL);
        let mut host = TestHost::default();
        // Codeless lines are consumed internally, so one call reaches the
        // line with the reference.
        let mut parser = Parser::new(SliceScanner::from(*input), dialect);
        let got = parser.parse(&mut host);
        match want {
            Want::Codes(expected) => match got {
                Ok(Some(line)) => assert_eq!(&line, expected, "parse({:?})", input),
                other => panic!("parse({:?}): expected codes, got {:?}", input, other),
            },
            Want::Fail => assert!(got.is_err(), "parse({:?}) did not fail", input),
            Want::Eof => unreachable!(),
        }
    }
}

#[test]
fn test_expressions() {
    enum ExprWant {
        Num(f64),
        Fail,
    }
    use ExprWant::*;

    // Parameters 1..99 read back as 100 + n; named parameter "test" is 10.
    let cases: Vec<(&str, ExprWant)> = vec![
        ("123 ", Num(123.0)),
        ("#99 ", Num(199.0)),
        ("#101 ", Fail),
        ("[123] ", Num(123.0)),
        ("[#99] ", Num(199.0)),
        ("[#101] ", Fail),
        ("[123 G", Fail),
        ("[123 + [456 * 789 [ ", Fail),
        ("[-123] ", Num(-123.0)),
        ("[-#1] ", Num(-101.0)),
        ("[12 + 34] ", Num(46.0)),
        ("[12+34] ", Num(46.0)),
        ("[12+ 34] ", Num(46.0)),
        ("[12 +34] ", Num(46.0)),
        ("[12+34+56] ", Num(102.0)),
        ("[1 + 2 * 3] ", Num(7.0)),
        ("[2 * 3 + 4] ", Num(10.0)),
        ("[[1 + 2] * 3] ", Num(9.0)),
        ("[2 * [3 + 4]] ", Num(14.0)),
        ("[- [2 * 3]] ", Num(-6.0)),
        ("[- 2 * 3] ", Num(-6.0)),
        ("[101 == ] ", Fail),
        ("[1 + 100 == #2] ", Num(0.0)),
        ("[! 0] ", Num(1.0)),
        ("[! 1] ", Num(0.0)),
        ("[! 102 == #1] ", Num(1.0)),
        ("[! [102 == #1]] ", Num(1.0)),
        ("[1 || #111] ", Num(1.0)),
        ("[0 || #111] ", Fail),
        ("[0 && #111] ", Num(0.0)),
        ("[1 && #111] ", Fail),
        ("[1 && 2] ", Num(1.0)),
        ("[1 && 0] ", Num(0.0)),
        ("[101 == #1] ", Num(1.0)),
        ("[100 == #1] ", Num(0.0)),
        ("[101 < #1] ", Num(0.0)),
        ("[99 < #1] ", Num(1.0)),
        ("[102 <= #1] ", Num(0.0)),
        ("[101 <= #1] ", Num(1.0)),
        ("[100 != #1] ", Num(1.0)),
        ("[101 != #1] ", Num(0.0)),
        ("[101 > #1] ", Num(0.0)),
        ("[102 > #1] ", Num(1.0)),
        ("[100 >= #1] ", Num(0.0)),
        ("[101 >= #1] ", Num(1.0)),
        ("[10 - 5] ", Num(5.0)),
        ("[5 - 10] ", Num(-5.0)),
        ("[5 * 10] ", Num(50.0)),
        ("[5 * - 10] ", Num(-50.0)),
        ("[50 / 10] ", Num(5.0)),
        ("[-50 / 10] ", Num(-5.0)),
        ("[50 / -10] ", Num(-5.0)),
        ("[-50 / -10] ", Num(5.0)),
        ("[1 =! 2] ", Fail),
        ("[1 !- 2] ", Fail),
        ("[1 &| 2] ", Fail),
        ("[1 |& 2] ", Fail),
        ("[2 + 3 + 4 * 5] ", Num(25.0)),
        ("[2 + 3 * 4 + 5] ", Num(19.0)),
        ("[2 * 3 + 4 + 5] ", Num(15.0)),
        ("[2 * 3 + 4 * 5] ", Num(26.0)),
        ("[#test] ", Num(10.0)),
        ("[a3[123]] ", Fail),
        ("[abc[123]] ", Fail),
        ("[abs +] ", Fail),
        ("[abs 123] ", Fail),
        ("[abs[]] ", Fail),
        ("[abs[123,456]] ", Fail),
        ("[abs[123 456]] ", Fail),
        ("[abs[123,456,]] ", Fail),
        ("[abs[123]] ", Num(123.0)),
        ("[abs[-123]] ", Num(123.0)),
        ("[abs[123.456]] ", Num(123.456)),
        ("[abs[-123.456]] ", Num(123.456)),
        ("[sin[0]] ", Num(0.0)),
        ("[asin[0]] ", Num(0.0)),
        ("[sin[30]] ", Num(0.5)),
        ("[asin[0.5]] ", Num(30.0)),
        ("[sin[45]] ", Num(1.0 / std::f64::consts::SQRT_2)),
        ("[asin[1 / sqrt[2]]] ", Num(45.0)),
        ("[sin[60]] ", Num(3.0f64.sqrt() / 2.0)),
        ("[asin[sqrt[3] / 2]] ", Num(60.0)),
        ("[sin[90]] ", Num(1.0)),
        ("[asin[1]] ", Num(90.0)),
        ("[cos[0]] ", Num(1.0)),
        ("[acos[1]] ", Num(0.0)),
        ("[cos[30]] ", Num(3.0f64.sqrt() / 2.0)),
        ("[acos[sqrt[3] / 2]] ", Num(30.0)),
        ("[cos[45]] ", Num(1.0 / std::f64::consts::SQRT_2)),
        ("[acos[1 / sqrt[2]]] ", Num(45.0)),
        ("[cos[60]] ", Num(0.5)),
        ("[acos[0.5]] ", Num(60.0)),
        ("[cos[90]] ", Num(0.0)),
        ("[acos[0]] ", Num(90.0)),
        ("[tan[0]] ", Num(0.0)),
        ("[atan[0]] ", Num(0.0)),
        ("[tan[30]] ", Num(1.0 / 3.0f64.sqrt())),
        ("[atan[1 / sqrt[3]]] ", Num(30.0)),
        ("[tan[45]] ", Num(1.0)),
        ("[atan[1]] ", Num(45.0)),
        ("[tan[60]] ", Num(3.0f64.sqrt())),
        ("[atan[sqrt[3]]] ", Num(60.0)),
        ("[ceil[12.34]] ", Num(13.0)),
        ("[ceil[-12.34]] ", Num(-12.0)),
        ("[floor[12.34]] ", Num(12.0)),
        ("[floor[-12.34]] ", Num(-13.0)),
        ("[round[12.34]] ", Num(12.0)),
        ("[round[-12.34]] ", Num(-12.0)),
        ("[round[34.56]] ", Num(35.0)),
        ("[round[-34.56]] ", Num(-35.0)),
        ("[123+\"abc\"] ", Fail),
        ("[<abc>+123] ", Fail),
    ];

    for (expr, want) in &cases {
        let input = format!("G{}\n", expr);
        let mut host = TestHost {
            expr_params: true,
            ..TestHost::default()
        };
        host.name_params
            .insert("test".to_owned(), Value::Number(Number(10.0)));

        let mut parser = Parser::new(SliceScanner::new(input.as_bytes()), Dialect::ALL);
        let got = parser.parse(&mut host);
        match want {
            Num(value) => match got {
                Ok(Some(line)) => {
                    assert_eq!(line.len(), 1, "parse(G{:?})", expr);
                    let num = line[0].value.as_number().unwrap_or_else(|| {
                        panic!("parse(G{:?}): not a number: {:?}", expr, line[0])
                    });
                    assert!(
                        (num.0 - value).abs() <= 1e-6,
                        "parse(G{:?}): got {}, want {}",
                        expr,
                        num.0,
                        value
                    );
                }
                other => panic!("parse(G{:?}): expected a code, got {:?}", expr, other),
            },
            Fail => assert!(got.is_err(), "parse(G{:?}) did not fail: {:?}", expr, got),
        }
    }
}

#[test]
fn test_values() {
    enum ValueWant {
        Val(Value),
        Fail,
        Eof,
    }
    use ValueWant::*;

    let cases: Vec<(&str, ValueWant)> = vec![
        ("G123 \n", Val(Value::Number(Number(123.0)))),
        ("G\"abc\"\n", Val(Value::Str("abc".into()))),
        ("G\"abc", Eof),
        ("G\"abc\\\"def\"\n", Val(Value::Str("abc\"def".into()))),
        ("G\"abc\ndef\"\n", Fail),
        ("G<abc>\n", Val(Value::Name("abc".into()))),
        ("G<123>\n", Val(Value::Name("123".into()))),
        ("G<>\n", Fail),
        ("G<abc\"\n", Fail),
        ("G<abc\ndef>\n", Fail),
    ];

    for (input, want) in &cases {
        let mut host = TestHost::default();
        let mut parser = Parser::new(SliceScanner::from(*input), Dialect::ALL);
        let got = parser.parse(&mut host);
        match want {
            Val(value) => match got {
                Ok(Some(line)) => {
                    assert_eq!(line, vec![Code { letter: 'G', value: value.clone() }], "parse({:?})", input)
                }
                other => panic!("parse({:?}): expected a code, got {:?}", input, other),
            },
            Fail => assert!(got.is_err(), "parse({:?}) did not fail: {:?}", input, got),
            Eof => assert!(matches!(got, Ok(None)), "parse({:?}): expected end of input", input),
        }
    }
}

#[test]
fn test_error_locations() {
    let mut host = TestHost::default();
    let mut parser = Parser::new(SliceScanner::from("$\n"), Dialect::ALL);
    let err = parser.parse(&mut host).unwrap_err();
    assert_eq!(err.to_string(), "1: unexpected command: 36");

    // Nnnn renumbers the virtual line; errors then show both coordinates.
    let mut parser = Parser::new(SliceScanner::from("N10 G-\n"), Dialect::ALL);
    let err = parser.parse(&mut host).unwrap_err();
    assert!(
        err.to_string().starts_with("1(10): "),
        "unexpected location: {}",
        err
    );

    let mut parser = Parser::new(SliceScanner::from("G1\nG$\n"), Dialect::ALL);
    parser.parse(&mut host).unwrap();
    let err = parser.parse(&mut host).unwrap_err();
    assert!(err.to_string().starts_with("2: "), "unexpected location: {}", err);
}

#[test]
fn test_empty_input_is_end_of_input() {
    for input in ["", "\n", "\n\n", "(comment only)\n", "; only a comment\n", "   \t  \n"] {
        let mut host = TestHost::default();
        let mut parser = Parser::new(SliceScanner::from(input), Dialect::ALL);
        assert!(
            parser.parse(&mut host).unwrap().is_none(),
            "parse({:?}) produced codes",
            input
        );
    }
}

#[test]
fn test_virtual_lines_strictly_increase() {
    let mut host = TestHost::default();
    // The natural line count passes N10, so N10 a second time is invalid.
    let input = "N10 G1\nN10 G1\n";
    let mut parser = Parser::new(SliceScanner::from(input), Dialect::ALL);
    parser.parse(&mut host).unwrap();
    assert!(parser.parse(&mut host).is_err());

    let input = "N10 G1\nN20 G1\nN30 G1\n";
    let mut parser = Parser::new(SliceScanner::from(input), Dialect::ALL);
    for _ in 0..3 {
        parser.parse(&mut host).unwrap().expect("a line of codes");
    }
}
