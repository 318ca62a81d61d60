//! Compiles route templates into anchored, case-insensitive regular expressions.
//!
//! | template token     | expression        | binds                          |
//! |--------------------|-------------------|--------------------------------|
//! | `:name`            | `(?P<name>[^/]*)` | one segment, possibly empty    |
//! | `*name` (last)     | `(?P<name>.*)`    | the rest of the path, `/` too  |
//! | `(?<name>.*)` (last) | `(?P<name>.*)`  | same as `*name`                |
//! | anything else      | escaped literal   |                                |

use std::borrow::Cow;
use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use switchyard_http::protocol::PathParams;

use crate::router::RouteError;

/// Characters left encoded by [`decode_segments`]: `/` keeps segment boundaries and `%`
/// keeps the value decodable exactly once more.
const SEGMENT_RESERVED: &AsciiSet = &CONTROLS.add(b'/').add(b'%');

const CATCH_ALL_OPEN: &str = "(?<";
const CATCH_ALL_CLOSE: &str = ">.*)";

#[derive(Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        if !template.starts_with('/') {
            return Err(RouteError::invalid_template(template, "must start with '/'"));
        }

        let mut expression = String::with_capacity(template.len() * 2 + 8);
        expression.push_str("(?i)^");
        let mut params: Vec<String> = Vec::new();
        let mut literal_start = 0;
        let mut rest = template;

        while let Some(position) = rest.find([':', '*', '(']) {
            let offset = template.len() - rest.len();
            expression.push_str(&regex::escape(&template[literal_start..offset + position]));
            let token = &rest[position..];

            let (name, is_catch_all, consumed) = if let Some(after) = token.strip_prefix(':') {
                let name = after.split('/').next().unwrap_or_default();
                if name.is_empty() {
                    return Err(RouteError::invalid_template(template, "':' without a parameter name"));
                }
                (name, false, 1 + name.len())
            } else if let Some(after) = token.strip_prefix('*') {
                if after.contains('/') {
                    return Err(RouteError::misplaced_catch_all(template));
                }
                if after.is_empty() {
                    return Err(RouteError::invalid_template(template, "'*' without a parameter name"));
                }
                (after, true, token.len())
            } else if let Some(after) = token.strip_prefix(CATCH_ALL_OPEN) {
                let Some(end) = after.find(CATCH_ALL_CLOSE) else {
                    return Err(RouteError::invalid_template(template, format!("unterminated catch-all, expected {CATCH_ALL_CLOSE:?}")));
                };
                if end + CATCH_ALL_CLOSE.len() != after.len() {
                    return Err(RouteError::misplaced_catch_all(template));
                }
                (&after[..end], true, token.len())
            } else {
                // a plain '(' is a literal
                expression.push_str(&regex::escape("("));
                rest = &token[1..];
                literal_start = template.len() - rest.len();
                continue;
            };

            if !is_identifier(name) {
                return Err(RouteError::invalid_parameter(template, name));
            }
            if params.iter().any(|param| param == name) {
                return Err(RouteError::duplicate_parameter(template, name));
            }

            let class = if is_catch_all { ".*" } else { "[^/]*" };
            expression.push_str(&format!("(?P<{name}>{class})"));
            params.push(name.to_string());

            rest = &token[consumed..];
            literal_start = template.len() - rest.len();
        }

        expression.push_str(&regex::escape(&template[literal_start..]));
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|source| RouteError::Regex { template: template.to_string(), source })?;
        Ok(Self { template: template.to_string(), regex, params })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in the order they appear in the template.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches a path prepared by [`decode_segments`]. Every parameter of the template is
    /// bound, an empty segment binds the empty string, and values are fully percent-decoded.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let params = self
            .params
            .iter()
            .map(|name| {
                let raw = captures.name(name).map_or("", |m| m.as_str());
                (name.clone(), percent_decode_str(raw).decode_utf8_lossy().into_owned())
            })
            .collect();
        Some(params)
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern").field("template", &self.template).field("params", &self.params).finish()
    }
}

/// Percent-decodes every segment of a raw request path, re-encoding only `/` and `%` so
/// that `%2F` inside a segment can't pose as a separator.
pub(crate) fn decode_segments(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }

    let decoded = path
        .split('/')
        .map(|segment| {
            let segment = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&segment, SEGMENT_RESERVED).to_string()
        })
        .collect::<Vec<_>>()
        .join("/");
    Cow::Owned(decoded)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pattern: &RoutePattern, path: &str) -> Vec<(String, String)> {
        pattern.matches(path).unwrap().iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_literal_template() {
        let pattern = RoutePattern::compile("/hello.json").unwrap();
        assert!(pattern.is_match("/hello.json"));
        assert!(pattern.is_match("/HELLO.JSON"));
        assert!(!pattern.is_match("/helloxjson"));
        assert!(!pattern.is_match("/hello.json/"));
        assert!(pattern.params().is_empty());
    }

    #[test]
    fn test_named_params() {
        let pattern = RoutePattern::compile("/users/:id/posts/:post_id").unwrap();
        assert_eq!(pattern.params(), ["id", "post_id"]);
        assert_eq!(
            params(&pattern, "/users/42/posts/7"),
            vec![("id".to_string(), "42".to_string()), ("post_id".to_string(), "7".to_string())]
        );
        assert!(!pattern.is_match("/users/42/posts/7/comments"));
        assert!(!pattern.is_match("/users/42"));
    }

    #[test]
    fn test_empty_segment_binds_empty_string() {
        let pattern = RoutePattern::compile("/a/:x/b").unwrap();
        assert_eq!(params(&pattern, "/a//b"), vec![("x".to_string(), String::new())]);
    }

    #[test]
    fn test_params_are_percent_decoded_and_keep_case() {
        let pattern = RoutePattern::compile("/hello/:name").unwrap();
        assert_eq!(params(&pattern, &decode_segments("/HELLO/John%20Doe")), vec![("name".to_string(), "John Doe".to_string())]);
        assert_eq!(params(&pattern, &decode_segments("/hello/a%2Fb")), vec![("name".to_string(), "a/b".to_string())]);
        assert_eq!(params(&pattern, &decode_segments("/hello/100%25")), vec![("name".to_string(), "100%".to_string())]);
    }

    #[test]
    fn test_decode_segments() {
        assert_eq!(decode_segments("/plain/path"), "/plain/path");
        assert_eq!(decode_segments("/users/%7Eann"), "/users/~ann");
        assert_eq!(decode_segments("/h%65llo"), "/hello");
        assert_eq!(decode_segments("/a%2fb/c"), "/a%2Fb/c");
        assert_eq!(decode_segments("/100%25/x%20y"), "/100%25/x y");
    }

    #[test]
    fn test_catch_all() {
        let pattern = RoutePattern::compile("/static/*path").unwrap();
        assert_eq!(params(&pattern, "/static/css/site.css"), vec![("path".to_string(), "css/site.css".to_string())]);
        assert_eq!(params(&pattern, "/static/"), vec![("path".to_string(), String::new())]);
        assert!(!pattern.is_match("/static"));

        let pattern = RoutePattern::compile("/files/(?<rest>.*)").unwrap();
        assert_eq!(params(&pattern, "/files/a/b/c.txt"), vec![("rest".to_string(), "a/b/c.txt".to_string())]);
    }

    #[test]
    fn test_literal_regex_characters_are_escaped() {
        let pattern = RoutePattern::compile("/v1.0/(beta)/:id").unwrap();
        assert!(pattern.is_match("/v1.0/(beta)/9"));
        assert!(!pattern.is_match("/v1x0/(beta)/9"));
        assert_eq!(pattern.params(), ["id"]);
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(RoutePattern::compile("hello"), Err(RouteError::InvalidTemplate { .. })));
        assert!(matches!(RoutePattern::compile("/a/:"), Err(RouteError::InvalidTemplate { .. })));
        assert!(matches!(RoutePattern::compile("/a/:/b"), Err(RouteError::InvalidTemplate { .. })));
        assert!(matches!(RoutePattern::compile("/a/*"), Err(RouteError::InvalidTemplate { .. })));
        assert!(matches!(RoutePattern::compile("/a/(?<rest>.*"), Err(RouteError::InvalidTemplate { .. })));
        assert!(matches!(RoutePattern::compile("/a/:1st"), Err(RouteError::InvalidParameter { .. })));
        assert!(matches!(RoutePattern::compile("/a/:x-y"), Err(RouteError::InvalidParameter { .. })));
        assert!(matches!(RoutePattern::compile("/a/:x/:x"), Err(RouteError::DuplicateParameter { .. })));
        assert!(matches!(RoutePattern::compile("/a/*rest/b"), Err(RouteError::MisplacedCatchAll { .. })));
        assert!(matches!(RoutePattern::compile("/a/(?<rest>.*)/b"), Err(RouteError::MisplacedCatchAll { .. })));
    }
}
