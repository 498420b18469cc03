use super::*;

#[test]
fn test_bare_numeric_id_matches() {
    assert!(BARE_NUMERIC_ID_REGEX.is_match("1234"));
    assert!(!BARE_NUMERIC_ID_REGEX.is_match("TEST-1234"));
}

#[test]
fn test_project_prefixed_id_captures_project_and_id() {
    let captures = PROJECT_PREFIXED_ID_REGEX.captures("TEST-42: something").unwrap();
    assert_eq!(&captures[1], "TEST");
    assert_eq!(&captures[2], "42");
}

#[test]
fn test_title_separator_collapses_variants() {
    for title in ["42: fix thing", "42 - fix thing", "42  fix thing"] {
        let captures = TITLE_SEPARATOR_REGEX.captures(title).unwrap();
        assert_eq!(&captures[1], "42");
        assert_eq!(&captures[2], "fix thing");
    }
}

#[test]
fn test_merge_title_regex() {
    let captures = MERGE_TITLE_REGEX.captures("Merge upstream:release/21").unwrap();
    assert_eq!(&captures[1], "upstream");
    assert_eq!(&captures[2], "release/21");
}

#[test]
fn test_backport_title_regex_matches_hash() {
    assert!(BACKPORT_TITLE_REGEX.is_match("Backport deadbeefcafebabe"));
}

#[test]
fn test_command_line_regex_captures_verb_and_args() {
    let text = "Some prose\n/reviewers 2 reviewer\nmore prose";
    let captures = COMMAND_LINE_REGEX.captures(text).unwrap();
    assert_eq!(&captures[1], "reviewers");
    assert_eq!(&captures[2], "2 reviewer");
}
