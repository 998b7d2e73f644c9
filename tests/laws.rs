use std::rc::Rc;

use marklit::compiler::{compile_program, Config, EmitMode};
use marklit::dom::{rebuild, AnyNode, AttributeValue, Attributes, Builder, RawBuilder, Representation, StreamBuilder, StructuredBuilder};
use marklit::eval::{call_function, Evaluator, Scope, Value};
use marklit::runtime::{module, render_value};
use marklit::semantics::parse_program;
use marklit::translation::Translator;
use marklit::translators::JavaScript;
use marklit::{CompileError, RuntimeError};
use strum::IntoEnumIterator;

const PAGE: &str = r#"
const attrs = { "data-x": "1", hidden: false };
const title = "T&C";
const tag = "em";
const items = ["a<b", "c"];

const Card = (props, body) => <article class={props.kind}><h2>{props.title}</h2>{body}</article>;

const page = () => <main {...attrs} id="m">
  <Card kind="note" title={title}>
    <p>{items.map((item) => <li>{item}</li>)}</p>
  </Card>
  <$tag>x</$tag>
  <>{1}{null}<br/></>
  <input disabled value={"q\"uote"} />
</main>;
"#;

const PAGE_HTML: &str = "<main data-x=\"1\" id=\"m\"><article class=\"note\"><h2>T&amp;C</h2><p><li>a&lt;b</li><li>c</li></p></article><em>x</em>1<br><input disabled value=\"q&quot;uote\"></main>";

fn configs() -> Vec<Config> {
    let mut configs = vec![];
    for target in Representation::iter() {
        for mode in EmitMode::iter() {
            configs.push(Config {
                target,
                mode,
                ..Config::default()
            });
        }
    }
    configs
}

/// Compiles and runs `source`, returning the scope holding its bindings.
fn load(source: &str, config: &Config) -> Result<Rc<Scope>, RuntimeError> {
    let program = parse_program(source).unwrap();
    let compiled = compile_program(&program, config).unwrap();
    let scope = Scope::global();
    scope.define(&config.prefix, module());
    Evaluator::new().run(&compiled, &scope)?;
    Ok(scope)
}

fn render_binding(scope: &Rc<Scope>, name: &str) -> Result<String, RuntimeError> {
    let value = match scope.lookup(name)? {
        function @ Value::Function(_) => call_function(&function, vec![])?,
        value => value,
    };
    render_value(&value)
}

macro_rules! assert_renders_everywhere {
    ($source:expr, $name:expr, $expected:expr) => {
        for config in configs() {
            let scope = load($source, &config);
            assert!(matches!(scope, Ok(_)), "{:?}: {:?}", config, scope.as_ref().err());
            let html = render_binding(&scope.unwrap(), $name);
            assert_eq!(html, Ok($expected.to_owned()), "{:?}", config);
        }
    };
}

#[test]
fn test_every_target_and_mode_renders_the_same() {
    assert_renders_everywhere!(PAGE, "page", PAGE_HTML);
}

#[test]
fn test_printed_program_runs_the_same() {
    for config in configs() {
        let program = parse_program(PAGE).unwrap();
        let printed = JavaScript::translate(&compile_program(&program, &config).unwrap());
        let reparsed = parse_program(&printed);
        assert!(matches!(reparsed, Ok(_)), "{:?}\n{}", config, printed);

        let scope = Scope::global();
        scope.define("_h", module());
        Evaluator::new().run(&reparsed.unwrap(), &scope).unwrap();
        assert_eq!(render_binding(&scope, "page"), Ok(PAGE_HTML.to_owned()), "{:?}", config);
    }
}

#[test]
fn test_import_of_the_runtime() {
    let config = Config {
        import: Some(Rc::from(marklit::runtime::MODULE_PATH)),
        prefix: Rc::from("rt"),
        ..Config::default()
    };
    let program = parse_program("const a = <p class={'x'}>{'y'}</p>;").unwrap();
    let compiled = compile_program(&program, &config).unwrap();
    assert!(JavaScript::translate(&compiled).starts_with("import * as rt from \"marklit/runtime\";"));

    let scope = Scope::global();
    Evaluator::new().run(&compiled, &scope).unwrap();
    assert_eq!(render_binding(&scope, "a"), Ok("<p class=\"x\">y</p>".to_owned()));
}

#[test]
fn test_run_time_errors() {
    for config in configs() {
        let scope = load(
            "const tag = 'br'; const bad = () => <$tag>x</$tag>; const child = () => <p>{true}</p>;",
            &config,
        )
        .unwrap();
        assert_eq!(
            render_binding(&scope, "bad"),
            Err(RuntimeError::VoidElement(Rc::from("br"))),
            "{:?}",
            config
        );
        assert_eq!(
            render_binding(&scope, "child"),
            Err(RuntimeError::InvalidChild("boolean")),
            "{:?}",
            config
        );
    }
}

#[test]
fn test_compile_errors() {
    let program = parse_program("const a = () => <div><img>alt</img></div>;").unwrap();
    for config in configs() {
        assert_eq!(
            compile_program(&program, &config),
            Err(CompileError::VoidElementChildren(Rc::from("img")))
        );
    }
}

const EXTENSIBLE: &str = r#"
const name = "n";
const base = () => <div class="a" title={name}>x</div>;
const same = () => _h.addItems(base());
const empty = () => _h.addItems(base(), {});
const twice = () => _h.addItems(_h.addItems(base(), { id: "1", class: "b" }, "y"), { title: false }, [<b>z</b>]);
const once = () => _h.addItems(base(), { id: "1", class: "b", title: false }, "y", <b>z</b>);
"#;

#[test]
fn test_add_items_laws() {
    for target in [Representation::Structured, Representation::Stream] {
        for mode in EmitMode::iter() {
            let config = Config {
                target,
                mode,
                ..Config::default()
            };
            let scope = load(EXTENSIBLE, &config).unwrap();
            let base = render_binding(&scope, "base").unwrap();
            assert_eq!(base, "<div class=\"a\" title=\"n\">x</div>");
            assert_eq!(render_binding(&scope, "same"), Ok(base.clone()), "{:?}", config);
            assert_eq!(render_binding(&scope, "empty"), Ok(base.clone()), "{:?}", config);

            let composed = "<div class=\"b\" id=\"1\">xy<b>z</b></div>".to_owned();
            assert_eq!(render_binding(&scope, "twice"), Ok(composed.clone()), "{:?}", config);
            assert_eq!(render_binding(&scope, "once"), Ok(composed), "{:?}", config);
        }
    }
}

#[test]
fn test_add_items_on_raw_output() {
    let scope = load(EXTENSIBLE, &Config::default()).unwrap();
    assert_eq!(
        render_binding(&scope, "same"),
        Err(RuntimeError::Unsupported(Representation::Raw))
    );
}

#[test]
fn test_stream_leaf_of_void_tag_rejects_children() {
    let config = Config {
        target: Representation::Stream,
        ..Config::default()
    };
    let scope = load("const a = () => _h.addItems(<hr/>, {}, 'x');", &config).unwrap();
    assert_eq!(
        render_binding(&scope, "a"),
        Err(RuntimeError::VoidElement(Rc::from("hr")))
    );
}

#[test]
fn test_builders_agree_on_rebuilt_trees() {
    let b = StructuredBuilder;
    let mut attributes = Attributes::new();
    attributes.insert(Rc::from("disabled"), AttributeValue::Bool(true));
    attributes.insert(Rc::from("class"), AttributeValue::Null);
    attributes.insert(Rc::from("data-bar"), AttributeValue::from("<>\""));
    let tree = b
        .element(
            "div",
            &Attributes::new(),
            vec![
                b.text("1"),
                b.element("button", &attributes, vec![]).unwrap(),
                b.element("br", &Attributes::new(), vec![]).unwrap(),
                b.prerendered(Rc::from("<i>p</i>")),
                b.text("2"),
            ],
        )
        .unwrap();
    let expected = "<div>1<button disabled data-bar=\"&lt;&gt;&quot;\"></button><br><i>p</i>2</div>";

    let raw = AnyNode::Raw(rebuild(&tree, &RawBuilder).unwrap());
    let stream = AnyNode::Stream(rebuild(&tree, &StreamBuilder::default()).unwrap());
    assert_eq!(raw.to_html().unwrap(), expected);
    assert_eq!(stream.to_html().unwrap(), expected);
    assert_eq!(AnyNode::Structured(tree).to_html().unwrap(), expected);
}
