/// Top-level package names referenced by import statements in `code`.
///
/// Only lines that start with `import` or `from` are considered. Order is
/// preserved and duplicates are kept; installers dedupe on their own.
pub fn parse_libraries(code: &str) -> Vec<String> {
    let mut libraries = Vec::new();

    for line in code.lines() {
        if let Some(rest) = line.strip_prefix("from ") {
            if let Some(module) = rest.split_whitespace().next() {
                push_top_level(&mut libraries, module);
            }
        } else if let Some(rest) = line.strip_prefix("import ") {
            for clause in rest.split(',') {
                if let Some(module) = clause.split_whitespace().next() {
                    push_top_level(&mut libraries, module);
                }
            }
        }
    }
    libraries
}

fn push_top_level(libraries: &mut Vec<String>, module: &str) {
    let top = module.split('.').next().unwrap_or_default();
    // relative imports ("from . import x") have an empty top level
    if !top.is_empty() && top.chars().all(|c| c.is_alphanumeric() || c == '_') {
        libraries.push(top.to_string());
    }
}
