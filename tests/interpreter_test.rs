use pretty_assertions::assert_eq;
use recon_core::api::parse;
use recon_core::{
    Interpreter, InterpreterConfig, InterpreterError, Item, Num, Record, Selector, Value,
};

fn record(items: impl IntoIterator<Item = Item>) -> Value {
    Value::Record(Record::of(items))
}

fn evaluate(source: &str) -> Value {
    Interpreter::new().evaluate(&parse(source).unwrap()).unwrap()
}

fn double(interp: &mut Interpreter) -> Result<Item, InterpreterError> {
    Ok(match interp.peek_scope()?.to_value() {
        Value::Num(n) => Item::Value(Value::Num(n.times(Num::I32(2)))),
        other => Item::Value(other),
    })
}

#[test]
fn test_map_selected_rewrites_nested_field() {
    let scope = parse("{x:{a:0,y:2}}").unwrap();
    let mut interp = Interpreter::with_scope(scope.clone()).unwrap();
    let Value::Selector(selector) = parse("$.get(\"x\").get(\"y\")").unwrap() else {
        panic!("expected a selector");
    };
    assert_eq!(selector, Selector::identity().get("x").get("y"));
    let mapped = selector.map_selected(&mut interp, &mut double).unwrap();
    assert_eq!(mapped, Item::Value(parse("{x:{a:0,y:4}}").unwrap()));
    // the scope itself is untouched
    assert_eq!(interp.peek_scope().unwrap(), &Item::Value(scope));
    assert_eq!(interp.scope_depth(), 1);
}

#[test]
fn test_map_selected_over_children() {
    let scope = parse("{1, a: 2, b}").unwrap();
    let mut interp = Interpreter::with_scope(scope).unwrap();
    // children are whole items, so fields keep their keys
    let mut double_item = |interp: &mut Interpreter| -> Result<Item, InterpreterError> {
        let item = interp.peek_scope()?.clone();
        let Value::Num(n) = item.as_value() else {
            return Ok(item);
        };
        let doubled = Value::Num(n.times(Num::I32(2)));
        Ok(match item {
            Item::Field(field) => Item::Field(field.with_value(doubled)),
            Item::Value(_) => Item::Value(doubled),
        })
    };
    let mapped = Selector::identity()
        .children()
        .map_selected(&mut interp, &mut double_item)
        .unwrap();
    assert_eq!(mapped, Item::Value(parse("{2, a: 4, b}").unwrap()));
}

#[test]
fn test_slot_refers_to_sibling() {
    assert_eq!(
        evaluate("{a: 1, b: $a + 1}"),
        record([Item::slot("a", 1), Item::slot("b", 2)])
    );
}

#[test]
fn test_lambda_invocation() {
    let value = evaluate("{n: 5, f: x => $x * 2, r: $f(3)}");
    let Value::Record(result) = value else {
        panic!("expected a record");
    };
    assert_eq!(result.get(&Value::from("r")), Some(&Value::from(6)));
    assert_eq!(result.get(&Value::from("n")), Some(&Value::from(5)));
}

#[test]
fn test_conditional_and_logic() {
    assert_eq!(
        evaluate("{a: 3, big: $a > 2 ? yes : no, both: $a && $missing, either: $missing || $a}"),
        record([
            Item::slot("a", 3),
            Item::slot("big", "yes"),
            Item::slot("either", 3),
        ])
    );
}

#[test]
fn test_builtins() {
    assert_eq!(evaluate("abs(-3)"), Value::from(3));
    assert_eq!(evaluate("max(1, 7, 4)"), Value::from(7));
    assert_eq!(evaluate("min({4, 2, 9})"), Value::from(2));
    assert_eq!(evaluate("len(\"héllo\")"), Value::from(5));
    assert_eq!(evaluate("floor(2.7)"), Value::from(2.0));
}

#[test]
fn test_unknown_function() {
    let mut interp = Interpreter::new();
    let result = interp.evaluate(&parse("nope(1)").unwrap());
    assert_eq!(
        result,
        Err(InterpreterError::UnknownFunction {
            name: "nope".to_string()
        })
    );
    assert_eq!(interp.scope_depth(), 0);
}

#[test]
fn test_selector_queries() {
    let scope = parse("@kind(user){name: ada, tags: {x, y, z}, nested: {deep: {k: 1}}}").unwrap();
    let mut interp = Interpreter::with_scope(scope).unwrap();
    let query = |interp: &mut Interpreter, source: &str| {
        interp.evaluate(&parse(source).unwrap()).unwrap()
    };
    assert_eq!(query(&mut interp, "$name"), Value::from("ada"));
    assert_eq!(query(&mut interp, "$@kind"), Value::from("user"));
    assert_eq!(query(&mut interp, "$tags#1"), Value::from("y"));
    assert_eq!(query(&mut interp, "$nested.deep.k"), Value::from(1));
    assert_eq!(query(&mut interp, "$tags.*").to_recon(), "{x,y,z}");
    assert_eq!(interp.scope_depth(), 1);
}

#[test]
fn test_scope_depth_limit_from_config() {
    let config = InterpreterConfig::from_json_str(r#"{"max_scope_depth": 2}"#).unwrap();
    let mut interp = Interpreter::with_config(config);
    let deep = parse("{{{1}}}").unwrap();
    assert!(matches!(
        interp.evaluate(&deep),
        Err(InterpreterError::ScopeOverflow { max: 2, .. })
    ));
    assert_eq!(interp.scope_depth(), 0);
}
