mod support;

use support::run;

#[test]
fn function_call_binds_parameters_and_prints() {
    let source = r#"
        function greet(name) { print "hi " + name; }
        greet("sludge");
    "#;
    assert_eq!(run(source).unwrap(), "hi sludge\n");
}

#[test]
fn functions_always_evaluate_to_null_since_return_is_unsupported() {
    let source = r#"
        function addAndPrint(a, b) { print a + b; }
        print addAndPrint(1, 2);
    "#;
    assert_eq!(run(source).unwrap(), "3\nnull\n");
}

#[test]
fn wrong_argument_count_is_a_runtime_error() {
    assert!(run("function one(a) { print a; } one(1, 2);").is_err());
    assert!(run("function one(a) { print a; } one();").is_err());
}

#[test]
fn clock_is_callable_with_no_arguments() {
    let source = r#"
        var started = clock();
        print started >= 0.0;
    "#;
    assert_eq!(run(source).unwrap(), "true\n");
}

#[test]
fn function_body_cannot_see_the_caller_s_lexical_locals() {
    // Known limitation: calls build their activation environment from
    // globals, not the call site's lexical scope.
    let source = r#"
        function readOuter() { print outer; }
        {
            var outer = "shadowed";
            readOuter();
        }
    "#;
    assert!(run(source).is_err());
}
