use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("static placeholder regex"))
}

/// Replaces `{{name}}` placeholders. Unknown names are left as written.
pub fn render_template(text: &str, variables: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// URL slug: lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_known_and_unknown() {
        let v = vars(&[("first_name", "Jane"), ("event_name", "Spring Retreat")]);
        assert_eq!(
            render_template("Hi {{first_name}}, see you at {{ event_name }}!", &v),
            "Hi Jane, see you at Spring Retreat!"
        );
        assert_eq!(render_template("Code: {{unknown}}", &v), "Code: {{unknown}}");
        assert_eq!(render_template("no placeholders", &v), "no placeholders");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Emerging from Winter Retreat"), "emerging-from-winter-retreat");
        assert_eq!(slugify("  Cacao & Sound -- 2026! "), "cacao-sound-2026");
        assert_eq!(slugify("***"), "");
    }
}
