mod support;

use support::run;

#[test]
fn while_loop_counts_up() {
    let source = "var i = 0; while (i < 3) { print i; i = i + 1; }";
    assert_eq!(run(source).unwrap(), "0\n1\n2\n");
}

#[test]
fn for_loop_desugars_to_an_equivalent_while() {
    let source = "for (var b = 1; b <= 3; b = b + 1) print b;";
    assert_eq!(run(source).unwrap(), "1\n2\n3\n");
}

#[test]
fn for_loop_with_omitted_init_and_increment() {
    let source = r#"
        var i = 0;
        for (; i < 3;) {
            print i;
            i = i + 1;
        }
    "#;
    assert_eq!(run(source).unwrap(), "0\n1\n2\n");
}

#[test]
fn for_loop_runs_body_zero_times_when_condition_starts_false() {
    let source = "for (var i = 10; i < 3; i = i + 1) print i;";
    assert_eq!(run(source).unwrap(), "");
}

#[test]
fn nested_loops_accumulate_independently() {
    let source = r#"
        for (var i = 0; i < 2; i = i + 1) {
            for (var j = 0; j < 2; j = j + 1) {
                print i + j;
            }
        }
    "#;
    assert_eq!(run(source).unwrap(), "0\n1\n1\n2\n");
}
