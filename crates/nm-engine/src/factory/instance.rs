//! Instantiation of declared and synthesized classes.

use std::sync::Arc;

use nm_core::{Annotation, ClassRef, Instance, Kind, MockMethod};

use crate::oracle::MetadataOracle;

/// Creates an instance of `class`.
///
/// Mocks get recording stand-ins for every declared method, emitters for
/// every output, and (directives) a manual render hook; mock pipes get a
/// `transform` stand-in backed by their custom transform, if any. Originals
/// only carry their declared properties and output emitters.
pub fn instantiate(oracle: &dyn MetadataOracle, class: &ClassRef) -> Arc<Instance> {
    let annotation = oracle.resolve(class);
    let mut instance = Instance::new(class.clone());

    if let Some(members) = annotation.as_ref().and_then(Annotation::members) {
        for (name, value) in &members.properties {
            instance = instance.with_property(name.as_str(), value.clone());
        }
        if class.is_mock() {
            for method in &members.methods {
                instance = instance.with_method(method.as_str());
            }
        }
    }

    match &annotation {
        Some(Annotation::Component(meta) | Annotation::Directive(meta)) => {
            for output in &meta.outputs {
                instance = instance.with_output(output.property.as_str());
            }
        }
        Some(Annotation::Pipe(_)) => {
            if let Some(tag) = class.mock_tag() {
                let transform = match &tag.transform {
                    Some(transform) => {
                        MockMethod::with_implementation("transform", Arc::clone(transform))
                    }
                    None => MockMethod::new("transform"),
                };
                instance = instance.with_mock_method(transform);
            }
        }
        _ => {}
    }

    if class.mock_tag().is_some_and(|tag| tag.kind == Kind::Directive) {
        instance = instance.with_render_hook();
    }

    Arc::new(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResolutionContext;
    use crate::factory::{mock_component, mock_directive, mock_pipe};
    use crate::oracle::StaticOracle;
    use nm_core::{ClassMembers, DirectiveMeta, PipeMeta, Value};
    use serde_json::json;

    #[test]
    fn test_mock_component_instance() {
        let mut oracle = StaticOracle::new();
        let button = oracle.component(
            "ButtonComponent",
            DirectiveMeta::new("app-button")
                .with_outputs(["clicked: press"])
                .with_members(ClassMembers::with_methods(["focus"])),
        );
        let mut ctx = ResolutionContext::new();
        let mock = mock_component(&mut ctx, &oracle, &button).unwrap();

        let instance = instantiate(&oracle, &mock);
        assert!(instance.is_mock_of(&button, Some(Kind::Component)));
        assert!(instance.output("clicked").is_some());
        assert!(instance.method("focus").is_some());
        assert!(instance.render_hook().is_none());

        let original = instantiate(&oracle, &button);
        assert!(original.method("focus").is_none());
        assert!(original.output("clicked").is_some());
    }

    #[test]
    fn test_mock_directive_has_render_hook() {
        let mut oracle = StaticOracle::new();
        let structural = oracle.directive(
            "ExampleStructuralDirective",
            DirectiveMeta::new("[exampleStructuralDirective]")
                .with_inputs(["exampleStructuralDirective"]),
        );
        let mut ctx = ResolutionContext::new();
        let mock = mock_directive(&mut ctx, &oracle, &structural).unwrap();
        let instance = instantiate(&oracle, &mock);
        assert!(instance.render_hook().is_some_and(|hook| !hook.is_rendered()));
    }

    #[test]
    fn test_pipe_transform_stand_in() {
        let mut oracle = StaticOracle::new();
        let upper = oracle.pipe("UpperPipe", PipeMeta::new("upper"));
        let mut ctx = ResolutionContext::new();
        let mock = mock_pipe(
            &mut ctx,
            &oracle,
            &upper,
            Some(Arc::new(|_: &[Value]| Value::from(json!("MOCKED")))),
        )
        .unwrap();

        let instance = instantiate(&oracle, &mock);
        assert_eq!(
            instance.call("transform", &[Value::from(json!("x"))]),
            Some(Value::from(json!("MOCKED")))
        );
        assert_eq!(instance.method("transform").unwrap().call_count(), 1);
    }
}
