//! Named-placeholder template rendering.
//!
//! Placeholders use `{name}` syntax. A placeholder present in the template
//! but absent from the supplied context is an error — the renderer never
//! silently drops or blanks a slot.

use lumen_domain::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap())
}

/// A loaded template, cached by the session for the lifetime of an
/// evaluation and re-parsed only on an explicit template change.
#[derive(Debug, Clone)]
pub struct Template {
    raw: String,
}

impl Template {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Substitute every `{name}` placeholder with its value from `context`.
    /// Deterministic: the same (template, context) pair always renders to
    /// the same string.
    pub fn render(&self, context: &HashMap<String, String>) -> Result<String> {
        let mut missing = Vec::new();
        let rendered = placeholder_re().replace_all(&self.raw, |caps: &regex::Captures| {
            let name = &caps[1];
            match context.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        });

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(Error::Template(format!(
                "missing placeholder(s) in context: {}",
                missing.join(", ")
            )));
        }

        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_all_placeholders() {
        let template = Template::new("Hello {name}, you work at {company}.");
        let rendered = template
            .render(&ctx(&[("name", "Ada"), ("company", "Acme")]))
            .unwrap();
        assert_eq!(rendered, "Hello Ada, you work at Acme.");
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let template = Template::new("Hello {name}.");
        let err = template.render(&ctx(&[])).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = Template::new("{a}-{b}-{a}");
        let context = ctx(&[("a", "x"), ("b", "y")]);
        let r1 = template.render(&context).unwrap();
        let r2 = template.render(&context).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1, "x-y-x");
    }

    #[test]
    fn no_placeholders_passes_through() {
        let template = Template::new("static text, no slots");
        assert_eq!(template.render(&ctx(&[])).unwrap(), "static text, no slots");
    }
}
