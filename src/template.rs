//! Templating for stub urls and bodies.
//!
//! The default syntax is the `$name` / `${name}` placeholder form, with
//! `$$` as an escaped dollar. Substitution is safe: placeholders with no
//! value are left in place. A Handlebars processor is available for
//! bodies that want `{{name}}` syntax instead.

use crate::error::{MockError, Result};
use bytes::Bytes;
use handlebars::Handlebars;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Values substituted into stub urls and bodies.
pub type TemplateArgs = HashMap<String, String>;

/// Transforms a stub body at registration time.
pub type BodyProcessor = Arc<dyn Fn(Bytes, &TemplateArgs) -> Result<Bytes> + Send + Sync>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\$(?:(\$)|([_a-z][_a-z0-9]*)|\{([_a-z][_a-z0-9]*)\})")
            .expect("placeholder pattern is valid")
    })
}

/// Substitute `$name` and `${name}` placeholders from `args`.
///
/// Unknown placeholders and lone `$` characters are kept verbatim.
pub fn safe_template(template: &str, args: &TemplateArgs) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            match args.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// The default body processor: [`safe_template`] over UTF-8 bodies.
///
/// Bodies that are not valid UTF-8 pass through unchanged.
pub fn safe_template_processor() -> BodyProcessor {
    Arc::new(|body: Bytes, args: &TemplateArgs| {
        Ok(match std::str::from_utf8(&body) {
            Ok(text) => Bytes::from(safe_template(text, args)),
            Err(_) => body,
        })
    })
}

/// Body processor rendering Handlebars templates with the template args.
///
/// Output is not HTML-escaped. Missing values render as empty strings.
pub fn handlebars_processor() -> BodyProcessor {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    Arc::new(move |body: Bytes, args: &TemplateArgs| {
        let Ok(text) = std::str::from_utf8(&body) else {
            return Ok(body);
        };
        handlebars
            .render_template(text, args)
            .map(Bytes::from)
            .map_err(|e| MockError::Template(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> TemplateArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_substitution() {
        let result = safe_template("/simple_fetch?arg1=$val_tpl", &args(&[("val_tpl", "val1")]));
        assert_eq!(result, "/simple_fetch?arg1=val1");
    }

    #[test]
    fn test_braced_substitution() {
        let result = safe_template("${name}_suffix", &args(&[("name", "user")]));
        assert_eq!(result, "user_suffix");
    }

    #[test]
    fn test_unresolved_placeholder_is_kept() {
        let result = safe_template("<response>$data_tpl ${other}</response>", &TemplateArgs::new());
        assert_eq!(result, "<response>$data_tpl ${other}</response>");
    }

    #[test]
    fn test_escaped_and_lone_dollars() {
        let result = safe_template("cost: $$5 and $ alone and $1", &args(&[("x", "y")]));
        assert_eq!(result, "cost: $5 and $ alone and $1");
    }

    #[test]
    fn test_safe_template_processor() {
        let processor = safe_template_processor();
        let body = processor(
            Bytes::from_static(b"<response>$data_tpl</response>"),
            &args(&[("data_tpl", "MOCK DATA")]),
        )
        .unwrap();
        assert_eq!(body, Bytes::from_static(b"<response>MOCK DATA</response>"));
    }

    #[test]
    fn test_binary_body_passes_through() {
        let processor = safe_template_processor();
        let raw = Bytes::from_static(&[0xff, 0xfe, b'$', b'x']);
        let body = processor(raw.clone(), &args(&[("x", "y")])).unwrap();
        assert_eq!(body, raw);
    }

    #[test]
    fn test_handlebars_processor() {
        let processor = handlebars_processor();
        let body = processor(
            Bytes::from_static(br#"{"name": "{{name}}", "raw": "$name"}"#),
            &args(&[("name", "<John>")]),
        )
        .unwrap();
        assert_eq!(body, Bytes::from_static(br#"{"name": "<John>", "raw": "$name"}"#));
    }

    #[test]
    fn test_handlebars_processor_reports_bad_template() {
        let processor = handlebars_processor();
        let result = processor(Bytes::from_static(b"{{#if}}"), &TemplateArgs::new());
        assert!(matches!(result, Err(MockError::Template(_))));
    }
}
