use crate::error::AppError;
use regex::{Captures, Regex};
use serde_json::Value;

const PLACEHOLDER: &str = r"\{\{\s*([A-Za-z0-9_$.-]+)\s*\}\}";

fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(ctx, |cur, part| match cur {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Replaces `{{ path.to.value }}` with the value at that path in `ctx`. Unknown paths render empty.
pub fn compile_template(template: &str, ctx: &Value) -> Result<String, AppError> {
    let re = Regex::new(PLACEHOLDER).map_err(|e| AppError::Internal(format!("template pattern: {}", e)))?;
    Ok(re
        .replace_all(template, |caps: &Captures| match lookup(ctx, &caps[1]) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_nested_paths() {
        let ctx = json!({
            "data": { "name": "Ada", "tags": ["x", "y"], "age": 36 },
            "CONSTANTS": { "SITE": "panel.dev" },
        });
        assert_eq!(
            compile_template("Hi {{ data.name }} ({{data.age}}) from {{ CONSTANTS.SITE }}", &ctx).unwrap(),
            "Hi Ada (36) from panel.dev"
        );
        assert_eq!(compile_template("{{ data.tags.1 }}", &ctx).unwrap(), "y");
    }

    #[test]
    fn unknown_paths_render_empty() {
        assert_eq!(compile_template("[{{ nope.at.all }}]", &json!({})).unwrap(), "[]");
        assert_eq!(compile_template("no placeholders", &json!({})).unwrap(), "no placeholders");
    }
}
