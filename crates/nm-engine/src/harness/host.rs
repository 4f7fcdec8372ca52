//! Host templates for rendering a class directly.

use std::fmt::Write as _;

use nm_core::Binding;

use crate::oracle::ClassShape;

/// Builds the template that renders a component or directive with `params`.
///
/// Every declared input and output whose public name (or, failing that,
/// property name) is a key of `params` is bound to the parameter of the
/// same name. Without a selector the template is empty.
///
/// # Examples
///
/// ```
/// use nm_core::DirectiveMeta;
/// use nm_engine::{MetadataOracle, StaticOracle, host_template};
/// use serde_json::json;
///
/// let mut oracle = StaticOracle::new();
/// let item = oracle.component(
///     "ItemComponent",
///     DirectiveMeta::new("app-item")
///         .with_inputs(["value", "label: caption"])
///         .with_outputs(["selected"]),
/// );
/// let params = json!({ "caption": "Hi", "selected": null });
///
/// assert_eq!(
///     host_template(&oracle.shape_of(&item), params.as_object()),
///     r#"<app-item [caption]="caption" (selected)="selected($event)"></app-item>"#,
/// );
/// ```
#[must_use]
pub fn host_template(
    shape: &ClassShape,
    params: Option<&serde_json::Map<String, serde_json::Value>>,
) -> String {
    let Some(selector) = shape.selector.as_deref() else {
        return String::new();
    };
    let mut template = format!("<{selector}");
    if let Some(params) = params {
        for input in &shape.inputs {
            if let Some(name) = bound_name(input, params) {
                let _ = write!(template, r#" [{name}]="{name}""#);
            }
        }
        for output in &shape.outputs {
            if let Some(name) = bound_name(output, params) {
                let _ = write!(template, r#" ({name})="{name}($event)""#);
            }
        }
    }
    let _ = write!(template, "></{selector}>");
    template
}

fn bound_name<'b>(
    binding: &'b Binding,
    params: &serde_json::Map<String, serde_json::Value>,
) -> Option<&'b str> {
    match &binding.alias {
        Some(alias) if params.contains_key(alias) => Some(alias.as_str()),
        _ if params.contains_key(&binding.property) => Some(binding.property.as_str()),
        _ => None,
    }
}
