//! Rendering rewritten modules through the in-memory harness.

use nm_core::{ClassRef, DefEntry, DirectiveMeta, Kind, NgModuleDef, PipeMeta, Value};
use nm_engine::{
    Host, MetadataOracle, ResolutionContext, StaticOracle, TestBed, TestHarness, mock_module,
    resolve_mock,
};
use serde_json::json;

/// `TargetModule` declares two children that both use `MyComponent` from
/// `SharedModule`.
struct SharedScenario {
    oracle: StaticOracle,
    target: ClassRef,
    target_module: ClassRef,
    shared_module: ClassRef,
    my: ClassRef,
}

fn shared_scenario() -> SharedScenario {
    let mut oracle = StaticOracle::new();
    let my = oracle.component(
        "MyComponent",
        DirectiveMeta::new("my-component").with_template("real content"),
    );
    let shared_module = oracle.module(
        "SharedModule",
        NgModuleDef::default()
            .with_declarations([&my])
            .with_exports([&my]),
    );
    let child_1 = oracle.component(
        "Child1Component",
        DirectiveMeta::new("child-1-component")
            .with_template("child:1 <my-component></my-component>"),
    );
    let child_2 = oracle.component(
        "Child2Component",
        DirectiveMeta::new("child-2-component")
            .with_template("child:2 <my-component></my-component>"),
    );
    let target = oracle.component(
        "TargetComponent",
        DirectiveMeta::new("target").with_template(concat!(
            "<child-1-component></child-1-component>",
            "<child-2-component></child-2-component>",
        )),
    );
    let target_module = oracle.module(
        "TargetModule",
        NgModuleDef::default()
            .with_imports([&shared_module])
            .with_declarations([&target, &child_1, &child_2])
            .with_exports([&target]),
    );
    SharedScenario {
        oracle,
        target,
        target_module,
        shared_module,
        my,
    }
}

#[test]
fn test_real_render_of_shared_module() {
    let scenario = shared_scenario();
    let mut bed = TestBed::new();
    bed.configure(NgModuleDef::default().with_imports([&scenario.target_module]));

    let fixture = bed
        .render_component(&scenario.oracle, &scenario.target, &json!({}))
        .unwrap();
    insta::assert_snapshot!(
        fixture.html(),
        @"<target><child-1-component>child:1 <my-component>real content</my-component></child-1-component><child-2-component>child:2 <my-component>real content</my-component></child-2-component></target>"
    );
}

#[test]
fn test_kept_module_with_mocked_shared_component() {
    let scenario = shared_scenario();
    let mut ctx = ResolutionContext::new();
    ctx.keep(&scenario.target);
    ctx.keep(&scenario.target_module);
    ctx.mock(&scenario.my);

    let mut bed = TestBed::new();
    bed.configure_mocked(
        &mut ctx,
        &scenario.oracle,
        &NgModuleDef::default()
            .with_declarations([&scenario.target])
            .with_imports([&scenario.target_module]),
    )
    .unwrap();

    let fixture = bed
        .render_component(&scenario.oracle, &scenario.target, &json!({}))
        .unwrap();
    insta::assert_snapshot!(
        fixture.html(),
        @"<target><child-1-component>child:1 <my-component></my-component></child-1-component><child-2-component>child:2 <my-component></my-component></child-2-component></target>"
    );

    let point = fixture.point().unwrap();
    assert_eq!(point.class(), &scenario.target);

    let rendered = fixture.find_all(&scenario.my);
    assert_eq!(rendered.len(), 2);
    let host = Host::new(&scenario.oracle, &bed);
    let mock = resolve_mock(&ctx, host, &scenario.my, Some(Kind::Component)).unwrap();
    assert!(rendered.iter().all(|instance| instance.class() == &mock));
    assert!(fixture.instances_of(&scenario.my).is_empty());
}

#[test]
fn test_instantiated_harness_reuses_registered_mocks() {
    let scenario = shared_scenario();
    let mut ctx = ResolutionContext::new();

    let mut bed = TestBed::new();
    bed.configure_mocked(
        &mut ctx,
        &scenario.oracle,
        &NgModuleDef::default().with_imports([&scenario.target_module]),
    )
    .unwrap();
    let _fixture = bed.render(&scenario.oracle, "", &json!({})).unwrap();
    assert!(bed.is_instantiated());

    let registered = bed
        .active_mocks()
        .and_then(|registry| registry.get(&scenario.shared_module))
        .cloned()
        .unwrap();

    // A new epoch would synthesize a fresh mock; the harness wins.
    ctx.reset();
    let host = Host::new(&scenario.oracle, &bed);
    let resolved = mock_module(&mut ctx, host, &DefEntry::from(&scenario.shared_module)).unwrap();
    assert_eq!(resolved, DefEntry::Class(registered));
}

#[test]
fn test_mock_structural_directive_renders_on_demand() {
    let mut oracle = StaticOracle::new();
    let when = oracle.directive(
        "WhenDirective",
        DirectiveMeta::new("[appWhen]").with_inputs(["appWhen"]),
    );
    let mut ctx = ResolutionContext::new();
    let mut bed = TestBed::new();
    bed.configure_mocked(&mut ctx, &oracle, &NgModuleDef::default().with_declarations([&when]))
        .unwrap();

    let mut fixture = bed
        .render(
            &oracle,
            r#"<section><p *appWhen="flag">{{ label }}</p></section>"#,
            &json!({ "flag": true, "label": "shown" }),
        )
        .unwrap();
    assert_eq!(fixture.html(), "<section><!----></section>");

    let directive = fixture.find(&when).unwrap();
    assert_eq!(directive.property("appWhen"), Value::from(json!(true)));
    directive.render_hook().unwrap().render();

    fixture.detect_changes().unwrap();
    assert_eq!(fixture.html(), "<section><p>shown</p></section>");
}

#[test]
fn test_mock_component_projects_content_and_records_inputs() {
    let mut oracle = StaticOracle::new();
    let panel = oracle.component(
        "PanelComponent",
        DirectiveMeta::new("app-panel")
            .with_inputs(["heading: title"])
            .with_outputs(["closed"])
            .with_template("<h2>{{ heading }}</h2>"),
    );
    let mut ctx = ResolutionContext::new();
    let mut bed = TestBed::new();
    bed.configure_mocked(&mut ctx, &oracle, &NgModuleDef::default().with_declarations([&panel]))
        .unwrap();

    let fixture = bed
        .render(
            &oracle,
            r#"<app-panel [title]="caption"><em>projected</em></app-panel>"#,
            &json!({ "caption": "Settings" }),
        )
        .unwrap();
    assert_eq!(fixture.html(), "<app-panel><em>projected</em></app-panel>");

    let instance = fixture.find(&panel).unwrap();
    assert!(instance.is_mock_of(&panel, Some(Kind::Component)));
    assert_eq!(instance.property("heading"), Value::from(json!("Settings")));

    let closed = instance.output("closed").unwrap();
    closed.emit(Value::from(json!(1)));
    assert_eq!(closed.emitted(), vec![Value::from(json!(1))]);
}

#[test]
fn test_mock_pipe_transform_in_template() {
    let mut oracle = StaticOracle::new();
    let currency = oracle.pipe("CurrencyPipe", PipeMeta::new("currency"));
    let mut ctx = ResolutionContext::new();
    let mut bed = TestBed::new();
    bed.configure_mocked(&mut ctx, &oracle, &NgModuleDef::default().with_declarations([&currency]))
        .unwrap();

    let fixture = bed
        .render(&oracle, "<b>{{ price | currency }}</b>", &json!({ "price": 12 }))
        .unwrap();
    // The default transform stand-in returns undefined.
    assert_eq!(fixture.html(), "<b></b>");

    let pipe = fixture.find(&currency).unwrap();
    let transform = pipe.method("transform").unwrap();
    assert_eq!(transform.calls(), vec![vec![Value::from(json!(12))]]);
    assert!(oracle.is_kind(pipe.class(), Kind::Pipe));
}

#[test]
fn test_parent_renders_mock_of_shared_child() {
    let mut oracle = StaticOracle::new();
    let child = oracle.component(
        "ChildComponent",
        DirectiveMeta::new("app-child").with_template("real child"),
    );
    let shared = oracle.module(
        "SharedModule",
        NgModuleDef::default()
            .with_declarations([&child])
            .with_exports([&child]),
    );
    let parent = oracle.component(
        "ParentComponent",
        DirectiveMeta::new("app-parent").with_template("<app-child></app-child>"),
    );
    let app = oracle.module(
        "AppModule",
        NgModuleDef::default()
            .with_declarations([&parent])
            .with_imports([&shared]),
    );

    let mut ctx = ResolutionContext::new();
    ctx.keep(&parent);
    let mut bed = TestBed::new();
    bed.configure_mocked(&mut ctx, &oracle, &NgModuleDef::default().with_imports([&app]))
        .unwrap();

    let fixture = bed.render_component(&oracle, &parent, &json!({})).unwrap();
    insta::assert_snapshot!(fixture.html(), @"<app-parent><app-child></app-child></app-parent>");

    let rendered = fixture.find(&child).unwrap();
    let mock = resolve_mock(&ctx, Host::new(&oracle, &bed), &child, None).unwrap();
    assert_eq!(rendered.class(), &mock);
    assert!(mock.is_mocked_def_of(&child, Some(Kind::Component)));
}
