//! Address templates and resolved resource addresses.
//!
//! An [`AddressTemplate`] is parsed once and resolved many times against a
//! [`StatementContext`]; resolution never mutates the template. A resolved
//! [`ResourceAddress`] is an ordered list of `type=name` segments with two
//! wire forms: the path form (`/subsystem=logging/file-handler=audit`) and
//! the JSON list form used by the management protocol.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::result::{VerificarError, VerificarResult};

/// A fully resolved management address
///
/// Invariant: contains no placeholders and no wildcards. The empty address
/// is the management root and renders as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    segments: Vec<(String, String)>,
}

impl ResourceAddress {
    /// The management root address
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a concrete path such as `/subsystem=logging/file-handler=audit`
    ///
    /// # Errors
    ///
    /// Returns `TemplateParse` if a segment is not a `type=name` pair or
    /// contains a wildcard or placeholder.
    pub fn of(path: &str) -> VerificarResult<Self> {
        let mut segments = Vec::new();
        for token in path.split('/').filter(|t| !t.is_empty()) {
            let (key, value) = parse_pair(path, token)?;
            if value == "*" || key.starts_with('{') {
                return Err(VerificarError::TemplateParse {
                    template: path.to_string(),
                    message: format!("segment '{token}' is not concrete"),
                });
            }
            segments.push((key, value));
        }
        Ok(Self { segments })
    }

    /// Extend the address with one more `type=name` segment
    #[must_use]
    pub fn child(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.segments.push((key.into(), value.into()));
        self
    }

    /// The address one level up, or `None` at the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The ordered `(type, name)` segments
    #[must_use]
    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    /// The final `(type, name)` segment, if any
    #[must_use]
    pub fn last(&self) -> Option<(&str, &str)> {
        self.segments
            .last()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether this is the management root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The JSON list form: an array of single-entry objects
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.segments
                .iter()
                .map(|(key, value)| {
                    let mut entry = Map::new();
                    entry.insert(key.clone(), Value::String(value.clone()));
                    Value::Object(entry)
                })
                .collect(),
        )
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for (key, value) in &self.segments {
            write!(f, "/{key}={value}")?;
        }
        Ok(())
    }
}

/// Named substitution values for template resolution
///
/// A placeholder resolves to zero or more concrete segments. Resolving
/// `default.profile` on a standalone server yields no segments at all, so
/// the same template works against both standalone and domain layouts.
pub trait StatementContext {
    /// Resolve a placeholder to its concrete segments, or `None` if the
    /// placeholder is unknown to this context.
    fn resolve(&self, placeholder: &str) -> Option<Vec<(String, String)>>;
}

/// Statement context for a standalone server
///
/// Binds `default.profile` to the empty segment list. Additional bindings
/// can be chained on for domain-style layouts.
#[derive(Debug, Clone)]
pub struct DefaultContext {
    bindings: BTreeMap<String, Vec<(String, String)>>,
}

impl DefaultContext {
    /// Well-known placeholder for the active profile
    pub const DEFAULT_PROFILE: &'static str = "default.profile";

    /// Create a standalone-server context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder to a list of concrete segments
    #[must_use]
    pub fn bind(
        mut self,
        placeholder: impl Into<String>,
        segments: Vec<(String, String)>,
    ) -> Self {
        self.bindings.insert(placeholder.into(), segments);
        self
    }

    /// Bind a placeholder to a single `type=name` segment
    #[must_use]
    pub fn bind_pair(
        self,
        placeholder: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.bind(placeholder, vec![(key.into(), value.into())])
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert(Self::DEFAULT_PROFILE.to_string(), Vec::new());
        Self { bindings }
    }
}

impl StatementContext for DefaultContext {
    fn resolve(&self, placeholder: &str) -> Option<Vec<(String, String)>> {
        self.bindings.get(placeholder).cloned()
    }
}

/// One parsed template token
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateToken {
    /// `{name}` segment, expanded through the statement context
    Placeholder(String),
    /// Literal `type=name` segment
    Fixed { key: String, value: String },
    /// `type=*` segment, filled positionally at resolve time
    Wildcard { key: String },
}

/// A reusable address pattern
///
/// Token grammar, `/`-separated: `{placeholder}`, `type=name`, or `type=*`.
/// Parse once with [`AddressTemplate::of`], then resolve as often as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTemplate {
    raw: String,
    tokens: Vec<TemplateToken>,
}

impl AddressTemplate {
    /// Parse a template pattern
    ///
    /// # Errors
    ///
    /// Returns `TemplateParse` for unclosed or empty placeholders, segments
    /// without `=`, and empty segment keys.
    pub fn of(pattern: &str) -> VerificarResult<Self> {
        let mut tokens = Vec::new();
        for token in pattern.split('/').filter(|t| !t.is_empty()) {
            if let Some(rest) = token.strip_prefix('{') {
                let Some(name) = rest.strip_suffix('}') else {
                    return Err(parse_error(pattern, format!("unclosed placeholder '{token}'")));
                };
                if !placeholder_name_pattern().is_match(name) {
                    return Err(parse_error(
                        pattern,
                        format!("invalid placeholder name '{name}'"),
                    ));
                }
                tokens.push(TemplateToken::Placeholder(name.to_string()));
                continue;
            }
            let (key, value) = parse_pair(pattern, token)?;
            if value == "*" {
                tokens.push(TemplateToken::Wildcard { key });
            } else {
                tokens.push(TemplateToken::Fixed { key, value });
            }
        }
        Ok(Self {
            raw: pattern.to_string(),
            tokens,
        })
    }

    /// The original pattern text
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    /// Number of wildcard segments that need positional values
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, TemplateToken::Wildcard { .. }))
            .count()
    }

    /// Resolve into a concrete address
    ///
    /// Placeholders are expanded through `context`; wildcards consume
    /// `values` positionally. Resolution is pure: the same inputs always
    /// produce the same address.
    ///
    /// # Errors
    ///
    /// Returns `Resolution` when a placeholder has no binding, a wildcard
    /// has no value, or surplus values remain.
    pub fn resolve(
        &self,
        context: &dyn StatementContext,
        values: &[&str],
    ) -> VerificarResult<ResourceAddress> {
        let mut segments = Vec::new();
        let mut remaining = values.iter();
        for token in &self.tokens {
            match token {
                TemplateToken::Placeholder(name) => {
                    let Some(bound) = context.resolve(name) else {
                        return Err(self.resolution_error(format!(
                            "no binding for placeholder '{name}'"
                        )));
                    };
                    segments.extend(bound);
                }
                TemplateToken::Fixed { key, value } => {
                    segments.push((key.clone(), value.clone()));
                }
                TemplateToken::Wildcard { key } => {
                    let Some(value) = remaining.next() else {
                        return Err(self.resolution_error(format!(
                            "missing value for wildcard '{key}=*'"
                        )));
                    };
                    segments.push((key.clone(), (*value).to_string()));
                }
            }
        }
        let surplus = remaining.count();
        if surplus > 0 {
            return Err(self.resolution_error(format!("{surplus} surplus value(s)")));
        }
        Ok(ResourceAddress { segments })
    }

    fn resolution_error(&self, message: String) -> VerificarError {
        VerificarError::Resolution {
            template: self.raw.clone(),
            message,
        }
    }
}

impl fmt::Display for AddressTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn parse_pair(pattern: &str, token: &str) -> VerificarResult<(String, String)> {
    let Some((key, value)) = token.split_once('=') else {
        return Err(parse_error(
            pattern,
            format!("segment '{token}' must be 'type=name' or '{{placeholder}}'"),
        ));
    };
    if key.is_empty() {
        return Err(parse_error(pattern, format!("segment '{token}' has an empty type")));
    }
    if value.is_empty() {
        return Err(parse_error(pattern, format!("segment '{token}' has an empty name")));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_error(pattern: &str, message: String) -> VerificarError {
    VerificarError::TemplateParse {
        template: pattern.to_string(),
        message,
    }
}

fn placeholder_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9._-]*$").expect("literal pattern is valid")
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod template_parsing {
        use super::*;

        #[test]
        fn test_fixed_and_wildcard_segments() {
            let template = AddressTemplate::of("/subsystem=logging/file-handler=*").unwrap();
            assert_eq!(template.wildcard_count(), 1);
            assert_eq!(template.pattern(), "/subsystem=logging/file-handler=*");
        }

        #[test]
        fn test_placeholder_segment() {
            let template =
                AddressTemplate::of("{default.profile}/subsystem=datasources/data-source=*")
                    .unwrap();
            assert_eq!(template.wildcard_count(), 1);
        }

        #[test]
        fn test_leading_slash_is_optional() {
            let a = AddressTemplate::of("/subsystem=logging").unwrap();
            let b = AddressTemplate::of("subsystem=logging").unwrap();
            let context = DefaultContext::new();
            assert_eq!(
                a.resolve(&context, &[]).unwrap(),
                b.resolve(&context, &[]).unwrap()
            );
        }

        #[test]
        fn test_unclosed_placeholder_rejected() {
            let err = AddressTemplate::of("{default.profile/subsystem=logging").unwrap_err();
            assert!(matches!(err, VerificarError::TemplateParse { .. }));
            assert!(err.to_string().contains("unclosed"));
        }

        #[test]
        fn test_empty_placeholder_rejected() {
            let err = AddressTemplate::of("{}/subsystem=logging").unwrap_err();
            assert!(matches!(err, VerificarError::TemplateParse { .. }));
        }

        #[test]
        fn test_segment_without_separator_rejected() {
            let err = AddressTemplate::of("/subsystem=logging/handler").unwrap_err();
            assert!(err.to_string().contains("handler"));
        }

        #[test]
        fn test_empty_key_rejected() {
            let err = AddressTemplate::of("/=logging").unwrap_err();
            assert!(matches!(err, VerificarError::TemplateParse { .. }));
        }

        #[test]
        fn test_empty_value_rejected() {
            let err = AddressTemplate::of("/subsystem=").unwrap_err();
            assert!(matches!(err, VerificarError::TemplateParse { .. }));
        }
    }

    mod resolution {
        use super::*;

        fn file_handler_template() -> AddressTemplate {
            AddressTemplate::of("{default.profile}/subsystem=logging/file-handler=*").unwrap()
        }

        #[test]
        fn test_default_profile_vanishes_on_standalone() {
            let address = file_handler_template()
                .resolve(&DefaultContext::new(), &["audit"])
                .unwrap();
            assert_eq!(
                address.to_string(),
                "/subsystem=logging/file-handler=audit"
            );
        }

        #[test]
        fn test_bound_profile_expands() {
            let context =
                DefaultContext::new().bind_pair(DefaultContext::DEFAULT_PROFILE, "profile", "full");
            let address = file_handler_template().resolve(&context, &["audit"]).unwrap();
            assert_eq!(
                address.to_string(),
                "/profile=full/subsystem=logging/file-handler=audit"
            );
        }

        #[test]
        fn test_wildcards_fill_positionally() {
            let template =
                AddressTemplate::of("/subsystem=*/file-handler=*").unwrap();
            let address = template
                .resolve(&DefaultContext::new(), &["logging", "audit"])
                .unwrap();
            assert_eq!(
                address.to_string(),
                "/subsystem=logging/file-handler=audit"
            );
        }

        #[test]
        fn test_missing_wildcard_value_rejected() {
            let err = file_handler_template()
                .resolve(&DefaultContext::new(), &[])
                .unwrap_err();
            assert!(matches!(err, VerificarError::Resolution { .. }));
            assert!(err.to_string().contains("file-handler"));
        }

        #[test]
        fn test_surplus_values_rejected() {
            let err = file_handler_template()
                .resolve(&DefaultContext::new(), &["audit", "extra"])
                .unwrap_err();
            assert!(matches!(err, VerificarError::Resolution { .. }));
            assert!(err.to_string().contains("surplus"));
        }

        #[test]
        fn test_unknown_placeholder_rejected() {
            let template = AddressTemplate::of("{mystery}/subsystem=logging").unwrap();
            let err = template.resolve(&DefaultContext::new(), &[]).unwrap_err();
            assert!(err.to_string().contains("mystery"));
        }

        #[test]
        fn test_resolution_does_not_mutate_template() {
            let template = file_handler_template();
            let first = template.resolve(&DefaultContext::new(), &["one"]).unwrap();
            let second = template.resolve(&DefaultContext::new(), &["two"]).unwrap();
            assert_eq!(first.to_string(), "/subsystem=logging/file-handler=one");
            assert_eq!(second.to_string(), "/subsystem=logging/file-handler=two");
        }
    }

    mod addresses {
        use super::*;
        use serde_json::json;

        #[test]
        fn test_root_renders_as_slash() {
            assert_eq!(ResourceAddress::root().to_string(), "/");
            assert!(ResourceAddress::root().is_root());
        }

        #[test]
        fn test_parse_concrete_path() {
            let address = ResourceAddress::of("/subsystem=logging/file-handler=audit").unwrap();
            assert_eq!(address.segments().len(), 2);
            assert_eq!(address.last(), Some(("file-handler", "audit")));
        }

        #[test]
        fn test_wildcard_rejected_in_concrete_path() {
            let err = ResourceAddress::of("/subsystem=logging/file-handler=*").unwrap_err();
            assert!(matches!(err, VerificarError::TemplateParse { .. }));
        }

        #[test]
        fn test_child_and_parent() {
            let base = ResourceAddress::of("/subsystem=logging").unwrap();
            let child = base.clone().child("file-handler", "audit");
            assert_eq!(child.to_string(), "/subsystem=logging/file-handler=audit");
            assert_eq!(child.parent().unwrap(), base);
            assert!(ResourceAddress::root().parent().is_none());
        }

        #[test]
        fn test_json_list_form_preserves_order() {
            let address = ResourceAddress::of("/subsystem=logging/file-handler=audit").unwrap();
            assert_eq!(
                address.to_json(),
                json!([{"subsystem": "logging"}, {"file-handler": "audit"}])
            );
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_is_deterministic(name in "[a-z][a-z0-9-]{0,11}") {
                let template =
                    AddressTemplate::of("{default.profile}/subsystem=logging/file-handler=*")
                        .unwrap();
                let context = DefaultContext::new();
                let first = template.resolve(&context, &[&name]).unwrap();
                let second = template.resolve(&context, &[&name]).unwrap();
                prop_assert_eq!(first.to_string(), second.to_string());
                prop_assert_eq!(first.to_json(), second.to_json());
            }

            #[test]
            fn path_form_round_trips(
                key in "[a-z][a-z-]{0,7}",
                value in "[a-z0-9][a-z0-9-]{0,11}",
            ) {
                let address = ResourceAddress::root().child(key, value);
                let reparsed = ResourceAddress::of(&address.to_string()).unwrap();
                prop_assert_eq!(address, reparsed);
            }
        }
    }
}
