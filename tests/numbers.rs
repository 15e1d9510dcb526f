mod support;

use support::run;

#[test]
fn integer_arithmetic_stays_integer() {
    assert_eq!(run("print 7 % 2;").unwrap(), "1\n");
    assert_eq!(run("print 3 * 4;").unwrap(), "12\n");
}

#[test]
fn division_always_produces_a_float() {
    assert_eq!(run("print 4 / 2;").unwrap(), "2\n");
    assert_eq!(run("print 7 / 2;").unwrap(), "3.5\n");
}

#[test]
fn mixed_int_and_float_promotes_to_float() {
    assert_eq!(run("print 1 + 2.5;").unwrap(), "3.5\n");
}

#[test]
fn ordering_coerces_both_sides_to_float() {
    assert_eq!(run("print 1 < 2.5;").unwrap(), "true\n");
}

#[test]
fn unary_minus_negates_and_bang_negates_truthiness() {
    assert_eq!(run("print -5;").unwrap(), "-5\n");
    assert_eq!(run("print !false;").unwrap(), "true\n");
    assert_eq!(run("print !0;").unwrap(), "false\n");
}
