use pydis_core::code::*;

fn repr(c: Constant) -> String {
    c.to_string()
}

#[test]
fn scalar_reprs() {
    assert_eq!(repr(Constant::None), "None");
    assert_eq!(repr(Constant::Bool(true)), "True");
    assert_eq!(repr(Constant::Bool(false)), "False");
    assert_eq!(repr(Constant::Int(-5)), "-5");
    assert_eq!(repr(Constant::Float(2.0)), "2.0");
    assert_eq!(repr(Constant::Float(0.5)), "0.5");
    assert_eq!(repr(Constant::Float(f64::INFINITY)), "inf");
    assert_eq!(repr(Constant::Float(f64::NAN)), "nan");
}

#[test]
fn float_exponent_reprs() {
    assert_eq!(repr(Constant::Float(1e16)), "1e+16");
    assert_eq!(repr(Constant::Float(1.5e300)), "1.5e+300");
    assert_eq!(repr(Constant::Float(-2.5e20)), "-2.5e+20");
    assert_eq!(repr(Constant::Float(1e-5)), "1e-05");
    assert_eq!(repr(Constant::Float(1.25e-100)), "1.25e-100");
    // Below the exponent thresholds the positional form is kept.
    assert_eq!(repr(Constant::Float(1e15)), "1000000000000000.0");
    assert_eq!(repr(Constant::Float(0.0001)), "0.0001");
}

#[test]
fn wide_integers_keep_their_digits() {
    let c: Constant = serde_json::from_str("18446744073709551615").unwrap();
    assert_eq!(c, Constant::UInt(u64::MAX));
    assert_eq!(repr(c), "18446744073709551615");

    let c: Constant = serde_json::from_str("-9223372036854775808").unwrap();
    assert_eq!(c, Constant::Int(i64::MIN));

    let c: Constant =
        serde_json::from_str(r#"{"int": "-123456789012345678901234567890"}"#).unwrap();
    assert_eq!(repr(c), "-123456789012345678901234567890");

    assert!(serde_json::from_str::<Constant>(r#"{"int": "12x"}"#).is_err());
    assert!(serde_json::from_str::<Constant>(r#"{"int": "-"}"#).is_err());
}

#[test]
fn string_reprs() {
    assert_eq!(repr("abc".into()), "'abc'");
    assert_eq!(repr("it's".into()), "\"it's\"");
    assert_eq!(repr("a\nb\\".into()), "'a\\nb\\\\'");
    assert_eq!(repr("both ' and \"".into()), "'both \\' and \"'");
}

#[test]
fn bytes_repr() {
    let c = Constant::Bytes {
        bytes: vec![0x00, b'A', b'\'', 0xff],
    };
    assert_eq!(repr(c), "b\"\\x00A'\\xff\"");
    let c = Constant::Bytes {
        bytes: b"ok".to_vec(),
    };
    assert_eq!(repr(c), "b'ok'");
}

#[test]
fn tuple_reprs() {
    assert_eq!(repr(Constant::Tuple(vec![])), "()");
    assert_eq!(repr(Constant::Tuple(vec![Constant::Int(1)])), "(1,)");
    assert_eq!(
        repr(Constant::Tuple(vec![
            Constant::Int(1),
            "a".into(),
            Constant::None,
            Constant::Tuple(vec![Constant::Bool(true)]),
        ])),
        "(1, 'a', None, (True,))"
    );
}

#[test]
fn code_repr() {
    let mut inner = CodeObject::new(vec![83]);
    inner.name = "f".into();
    assert_eq!(
        repr(inner.into()),
        "<code object f, file \"<string>\", line 0>"
    );
}

#[test]
fn bundle_from_json() {
    let code: CodeObject = serde_json::from_str(
        r#"{
            "name": "foo",
            "raw_code": "0x6401005300",
            "constants": [null, 1, 2.5, "s", true, [1, 2], {"bytes": "00ff"},
                          {"code": {"name": "inner", "raw_code": "53"}}],
            "varnames": ["a"],
            "names": ["math"],
            "line_table": "0601",
            "first_line": 7
        }"#,
    )
    .unwrap();
    assert_eq!(code.name, "foo");
    assert_eq!(code.filename, "<string>");
    assert_eq!(code.raw_code, vec![0x64, 0x01, 0x00, 0x53, 0x00]);
    assert_eq!(code.line_table, vec![6, 1]);
    assert_eq!(code.first_line, 7);
    assert!(code.freevars.is_empty());

    let c = &code.constants;
    assert_eq!(c[0], Constant::None);
    assert_eq!(c[1], Constant::Int(1));
    assert_eq!(c[2], Constant::Float(2.5));
    assert_eq!(c[3], Constant::Str("s".into()));
    assert_eq!(c[4], Constant::Bool(true));
    assert_eq!(c[5], Constant::Tuple(vec![Constant::Int(1), Constant::Int(2)]));
    assert_eq!(c[6], Constant::Bytes { bytes: vec![0, 0xff] });
    match &c[7] {
        Constant::Code { code } => {
            assert_eq!(code.name, "inner");
            assert_eq!(code.raw_code, vec![0x53]);
        }
        other => panic!("expected code constant, got {other:?}"),
    }
}

#[test]
fn bundle_rejects_bad_hex() {
    let err = serde_json::from_str::<CodeObject>(r#"{"raw_code": "6g"}"#);
    assert!(err.is_err());
}

#[test]
fn bundle_roundtrips_through_json() {
    let mut code = CodeObject::new(vec![100, 0, 0, 83]);
    code.constants = vec![Constant::Int(1), Constant::Bytes { bytes: vec![1] }];
    code.line_table = vec![4, 1];
    let json = serde_json::to_string(&code).unwrap();
    assert!(json.contains("\"raw_code\":\"64000053\""));
    let back: CodeObject = serde_json::from_str(&json).unwrap();
    assert_eq!(back, code);
}

#[test]
fn cell_names() {
    let mut code = CodeObject::new(vec![]);
    code.varnames = vec!["a".into(), "b".into()];
    code.freevars = vec!["x".into()];
    assert_eq!(code.cell_count(), 3);
    assert_eq!(code.cell_name(0), Some("a"));
    assert_eq!(code.cell_name(2), Some("x"));
    assert_eq!(code.cell_name(3), None);
}
