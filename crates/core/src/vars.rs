//! `{env.NAME}` placeholder handling for backend hosts and paths.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ValidationError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{env\.([a-zA-Z][a-zA-Z0-9_]{0,49})\}").expect("placeholder regex is valid")
});

/// Names of every stage variable referenced by `template`, in order of
/// first appearance.
pub fn referenced_vars(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for m in PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
    {
        if !names.contains(&m.as_str()) {
            names.push(m.as_str());
        }
    }
    names
}

/// Substitute every `{env.NAME}` in `template` with the stage variable.
///
/// `context` names the field being rendered and ends up in the error.
pub fn render(
    template: &str,
    vars: &BTreeMap<String, String>,
    context: &str,
) -> Result<String, ValidationError> {
    if let Some(missing) = referenced_vars(template)
        .into_iter()
        .find(|name| !vars.contains_key(*name))
    {
        return Err(ValidationError::UnresolvedVariable {
            name: missing.to_owned(),
            context: context.to_owned(),
        });
    }
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("domain".to_owned(), "svc.internal".to_owned()),
            ("prefix".to_owned(), "/v2".to_owned()),
        ])
    }

    #[test]
    fn renders_placeholders() {
        let out = render("{env.domain}:8080", &vars(), "host").unwrap();
        assert_eq!(out, "svc.internal:8080");
        let out = render("{env.prefix}/users/{env.prefix}", &vars(), "path").unwrap();
        assert_eq!(out, "/v2/users//v2");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("/users", &vars(), "path").unwrap(), "/users");
    }

    #[test]
    fn unresolved_placeholder_is_a_validation_error() {
        let err = render("{env.missing}", &vars(), "backend users host").unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnresolvedVariable {
                name: "missing".into(),
                context: "backend users host".into(),
            }
        );
    }

    #[test]
    fn lists_each_reference_once() {
        assert_eq!(
            referenced_vars("{env.a}/{env.b}/{env.a}"),
            vec!["a", "b"]
        );
    }
}
