//! Turning CLI edit flags into an edited entity.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use hookedit_core::{CoreError, Entity, FieldSelector, WebhookField};
use serde_json::Value as Json;

/// `FIELD=VALUE`; VALUE is parsed as JSON and falls back to a plain string.
pub fn parse_set(arg: &str) -> Result<(WebhookField, Json)> {
    let (name, raw) = arg.split_once('=').ok_or_else(|| anyhow!("expected FIELD=VALUE, got {:?}", arg))?;
    let field = name.trim().parse::<WebhookField>()?;
    let value = serde_json::from_str::<Json>(raw).unwrap_or_else(|_| Json::String(raw.to_string()));
    Ok((field, value))
}

/// Field map from a YAML or JSON document.
pub fn read_overlay(path: &Path) -> Result<Entity> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str::<Entity>(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Layer file contents, `--set` and `--clear` (in that order) over `base`.
pub fn build_edited(
    base: &Entity,
    overlay: Option<&Entity>,
    sets: &[String],
    clears: &[String],
    selector: FieldSelector,
) -> Result<Entity> {
    let mut edited = base.clone();
    let mut touched = Vec::new();
    if let Some(o) = overlay {
        for (field, value) in o.iter() {
            edited.set_value(field, value.clone());
            touched.push(field);
        }
    }
    for s in sets {
        let (field, value) = parse_set(s)?;
        edited.set_value(field, value);
        touched.push(field);
    }
    for c in clears {
        let field = c.trim().parse::<WebhookField>()?;
        edited.clear(field);
        touched.push(field);
    }
    if let Some(f) = touched.into_iter().find(|f| !selector.contains(*f)) {
        return Err(CoreError::UntrackedField(f).into());
    }
    Ok(edited)
}
