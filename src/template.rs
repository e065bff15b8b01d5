//! Literal placeholder substitution for subject and body templates.
//!
//! Template authors write `{Name}`-shaped tokens; each token is replaced
//! with the matching per-recipient value. There is no control flow — no
//! conditionals, no loops — and no escaping syntax.

use std::collections::HashMap;

/// Replace every `{key}` token whose key exists in `vars`.
///
/// Keys are matched exactly as provided (case-sensitive); tokens with no
/// matching variable are left untouched rather than failing, so a template
/// typo degrades to visible literal text instead of a lost email. One
/// replacement pass per key.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        let token = format!("{{{key}}}");
        if out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}
