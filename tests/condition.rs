//! Tests for loop guard inversion and iteration bounds.
use tenkan::transformer::{extract_loop_threshold, invert_condition};

#[test]
fn test_inverts_relational_atoms() {
    assert_eq!(invert_condition("x < 5"), "x >= 5");
    assert_eq!(invert_condition("x >= 5"), "x < 5");
    assert_eq!(invert_condition("x > 5"), "x <= 5");
    assert_eq!(invert_condition("x <= 5"), "x > 5");
    assert_eq!(invert_condition("a == b"), "a != b");
    assert_eq!(invert_condition("a != b"), "a == b");
}

#[test]
fn test_applies_de_morgan() {
    assert_eq!(invert_condition("a == 1 && b != 2"), "a != 1 || b == 2");
    assert_eq!(
        invert_condition("(x < 5 && y > 3) || z == 1"),
        "(x >= 5 || y <= 3) && z != 1"
    );
}

#[test]
fn test_double_inversion_restores_guard() {
    for guard in [
        "x < 5",
        "a == 1 && b != 2",
        "(x < 5 && y > 3) || z == 1",
        "i <= limit || done == true",
    ] {
        assert_eq!(invert_condition(&invert_condition(guard)), guard);
    }
}

#[test]
fn test_negates_non_relational_atoms() {
    assert_eq!(invert_condition("isDone"), "!isDone");
    assert_eq!(invert_condition("!isDone"), "isDone");
    assert_eq!(invert_condition("queue.HasItems()"), "!queue.HasItems()");
    assert_eq!(invert_condition("Check(a, b)"), "!(Check(a, b))");
    assert_eq!(invert_condition("((x < 5))"), "x >= 5");
}

#[test]
fn test_relational_inside_quotes_is_ignored() {
    assert_eq!(invert_condition("status == \"a<b\""), "status != \"a<b\"");
}

#[test]
fn test_extracts_loop_threshold() {
    assert_eq!(extract_loop_threshold("i < 10"), Some(10));
    assert_eq!(extract_loop_threshold("(count <= 4)"), Some(5));
    assert_eq!(extract_loop_threshold("100 > attempts"), Some(100));
    assert_eq!(extract_loop_threshold("retry < 3 && !done"), Some(3));
    assert_eq!(extract_loop_threshold("i < limit"), None);
    assert_eq!(extract_loop_threshold("a < 3 || b < 4"), None);
}
