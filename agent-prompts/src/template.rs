//! Minimal `{{variable}}` substitution used by the instruction builders.

use std::collections::BTreeMap;

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while rendering a template.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder had no value.
    #[error("missing template variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A placeholder was opened and never closed.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening braces.
        offset: usize,
    },
}

/// A prompt template with `{{name}}` placeholders.
///
/// Every placeholder is required: rendering fails rather than leaving a gap in
/// the instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    text: &'static str,
}

impl PromptTemplate {
    /// Wraps static template text.
    #[must_use]
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    /// Returns the raw template text.
    #[must_use]
    pub const fn text(&self) -> &'static str {
        self.text
    }

    /// Substitutes every placeholder from `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] for a placeholder without a
    /// value, and [`TemplateError::Unterminated`] for a dangling `{{`.
    pub fn render(&self, vars: &BTreeMap<&str, String>) -> TemplateResult<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text;
        let mut consumed = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or(TemplateError::Unterminated {
                offset: consumed + start,
            })?;
            let name = after[..end].trim();
            let value = vars.get(name).ok_or_else(|| TemplateError::MissingVariable {
                name: name.to_owned(),
            })?;
            out.push_str(value);

            let advance = start + 2 + end + 2;
            consumed += advance;
            rest = &rest[advance..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, (*v).to_owned())).collect()
    }

    #[test]
    fn renders_placeholders() {
        let template = PromptTemplate::new("Hello {{ name }}, you are {{role}}.");
        let rendered = template
            .render(&vars(&[("name", "Ada"), ("role", "a Monitor")]))
            .unwrap();
        assert_eq!(rendered, "Hello Ada, you are a Monitor.");
    }

    #[test]
    fn missing_variable_fails() {
        let err = PromptTemplate::new("{{a}} {{b}}").render(&vars(&[("a", "x")])).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable { name: "b".into() });
    }

    #[test]
    fn dangling_braces_fail() {
        let err = PromptTemplate::new("ok {{open").render(&BTreeMap::new()).unwrap_err();
        assert_eq!(err, TemplateError::Unterminated { offset: 3 });
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let rendered = PromptTemplate::new("{{x}}").render(&vars(&[("x", "{{y}}")])).unwrap();
        assert_eq!(rendered, "{{y}}");
    }
}
