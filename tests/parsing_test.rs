use taskforge::parsing::code::extract_code;
use taskforge::parsing::imports::parse_libraries;
use taskforge::parsing::subtasks::{classify, split_lines, split_tasks, Classification};

#[test]
fn test_extract_single_block_verbatim() {
    let text = "Here you go:\n```python\nimport os\n\nprint(os.getcwd())\n```\nDone.";
    assert_eq!(extract_code(text), "import os\n\nprint(os.getcwd())");
}

#[test]
fn test_extract_without_fence_is_empty() {
    assert_eq!(extract_code("SIMPLE: print('hi')"), "");
    assert_eq!(extract_code(""), "");
}

#[test]
fn test_extract_takes_first_of_two_blocks() {
    let text = "```python\nfirst()\n```\ntext\n```python\nsecond()\n```";
    assert_eq!(extract_code(text), "first()");
}

#[test]
fn test_extract_accepts_short_tags() {
    assert_eq!(extract_code("```py\nx = 1\n```"), "x = 1");
    assert_eq!(extract_code("```python3\nx = 2\n```"), "x = 2");
    assert_eq!(extract_code("```rust\nfn main() {}\n```"), "");
}

#[test]
fn test_split_three_items() {
    let tasks = split_tasks("1. Do A\n2. Do B\n3. Do C");
    assert_eq!(tasks, vec!["1. Do A", "2. Do B", "3. Do C"]);
}

#[test]
fn test_split_continuation_lines_join_without_separator() {
    let tasks = split_tasks("1. Do A\nstill A\n2. Do B");
    assert_eq!(tasks, vec!["1. Do Astill A", "2. Do B"]);
}

#[test]
fn test_split_empty_input() {
    assert!(split_tasks("").is_empty());
    assert!(split_tasks("\n  \n").is_empty());
}

#[test]
fn test_split_trims_indented_items() {
    let tasks = split_tasks("  1. Load data\n    2. Plot it\n");
    assert_eq!(tasks, vec!["1. Load data", "2. Plot it"]);
}

#[test]
fn test_classify_simple() {
    let response = "SIMPLE:\n```python\nprint('hello world')\n```";
    assert_eq!(
        classify(response),
        Classification::Simple { code: "print('hello world')".to_string() }
    );
}

#[test]
fn test_classify_simple_without_code() {
    assert_eq!(classify("SIMPLE: nothing here"), Classification::Simple { code: String::new() });
}

#[test]
fn test_classify_subtasks_skips_preamble() {
    let response = "SUBTASKS:\nHere is the plan.\n1. Fetch the page\n2. Parse the links\n3. Print them";
    match classify(response) {
        Classification::Subtasks { listing, items } => {
            assert!(listing.starts_with("1. Fetch the page"));
            assert_eq!(items.len(), 3);
            assert_eq!(items[2], "3. Print them");
        }
        other => panic!("expected subtasks, got {:?}", other),
    }
}

#[test]
fn test_classify_subtasks_without_list() {
    match classify("SUBTASKS: none listed") {
        Classification::Subtasks { listing, items } => {
            assert!(listing.is_empty());
            assert!(items.is_empty());
        }
        other => panic!("expected subtasks, got {:?}", other),
    }
}

#[test]
fn test_split_lines_drops_blanks() {
    assert_eq!(split_lines("\nfirst\n\n  second  \n"), vec!["first", "second"]);
}

#[test]
fn test_parse_libraries_basic() {
    let code = "import os\nfrom collections import OrderedDict\nprint('x')";
    assert_eq!(parse_libraries(code), vec!["os", "collections"]);
}

#[test]
fn test_parse_libraries_submodules_and_aliases() {
    let code = "import numpy as np, pandas\nfrom matplotlib.pyplot import plot\nfrom . import sibling\nimport os.path";
    assert_eq!(parse_libraries(code), vec!["numpy", "pandas", "matplotlib", "os"]);
}

#[test]
fn test_parse_libraries_keeps_duplicates() {
    let code = "import requests\nimport requests";
    assert_eq!(parse_libraries(code), vec!["requests", "requests"]);
}
