// ABOUTME: String literals, escapes, triple-quoted dedent, raw strings, templates

use duso::interpreter::Interpreter;

fn run(source: &str) -> String {
    let mut interp = Interpreter::new(false);
    let (output, err) = interp.execute(source);
    if let Some(err) = err {
        panic!("script failed: {}", err);
    }
    output
}

#[test]
fn test_escape_sequences() {
    assert_eq!(run(r#"print("a\tb")"#), "a\tb\n");
    assert_eq!(run(r#"print("line1\nline2")"#), "line1\nline2\n");
    assert_eq!(run(r#"print("back\\slash")"#), "back\\slash\n");
    assert_eq!(run(r#"print("say \"hi\"")"#), "say \"hi\"\n");
}

#[test]
fn test_hex_and_octal_escapes() {
    assert_eq!(run(r#"print("\x41\x42")"#), "AB\n");
    assert_eq!(run(r#"print("\101\102")"#), "AB\n");
}

#[test]
fn test_single_and_double_quotes_are_interchangeable() {
    assert_eq!(run("print('hello')"), "hello\n");
    assert_eq!(run(r#"print('double " inside')"#), "double \" inside\n");
    assert_eq!(run(r#"print("single ' inside")"#), "single ' inside\n");
}

#[test]
fn test_triple_quoted_string_is_dedented() {
    let source = r#"
text = """
    SELECT *
      FROM users
    WHERE id = 1
    """
print(text)
"#;
    assert_eq!(run(source), "SELECT *\n  FROM users\nWHERE id = 1\n");
}

#[test]
fn test_triple_quoted_single_quotes() {
    let source = "
text = '''
    alpha
    beta
    '''
print(text)
";
    assert_eq!(run(source), "alpha\nbeta\n");
}

#[test]
fn test_raw_string_has_no_escapes_or_templates() {
    assert_eq!(run(r"print(~a\nb~)"), "a\\nb\n");
    assert_eq!(run("print(~{{name}}~)"), "{{name}}\n");
}

#[test]
fn test_raw_string_escaped_delimiter() {
    assert_eq!(run(r"print(~one \~ two~)"), "one ~ two\n");
}

#[test]
fn test_template_interpolates_values() {
    let source = r#"
name = "World"
print("Hello, {{name}}!")
"#;
    assert_eq!(run(source), "Hello, World!\n");
}

#[test]
fn test_template_evaluates_expressions() {
    assert_eq!(run(r#"x = 3 print("{{x * x + 1}}")"#), "10\n");
    assert_eq!(run(r#"print("{{ len('abc') }}")"#), "3\n");
}

#[test]
fn test_template_with_conditional_expression() {
    let source = r#"
n = 5
print("{{ n > 3 ? 'big' : 'small' }}")
"#;
    assert_eq!(run(source), "big\n");
}

#[test]
fn test_template_renders_compound_values() {
    assert_eq!(
        run(r#"items = [1, "a"] print("got {{items}}")"#),
        "got [1, \"a\"]\n"
    );
}

#[test]
fn test_template_inside_triple_quoted_string() {
    let source = r#"
who = "ops"
msg = """
    to: {{who}}
    body: ready
    """
print(msg)
"#;
    assert_eq!(run(source), "to: ops\nbody: ready\n");
}

#[test]
fn test_escaped_braces_are_literal() {
    assert_eq!(run(r#"print("\{\{not a template\}\}")"#), "{{not a template}}\n");
}

#[test]
fn test_template_expression_with_object_literal() {
    assert_eq!(run(r#"print("{{ {n = 4}.n }}")"#), "4\n");
}

#[test]
fn test_template_expression_with_braces_in_string() {
    // A quoted string inside the marker may contain closing braces
    assert_eq!(run(r#"print("{{ 'a}b' }}")"#), "a}b\n");
}

#[test]
fn test_multiple_templates_in_one_string() {
    assert_eq!(
        run(r#"a = 1 b = 2 print("{{a}} + {{b}} = {{a + b}}")"#),
        "1 + 2 = 3\n"
    );
}

#[test]
fn test_concatenation_uses_display_forms() {
    let source = r#"
print("n=" + 42)
print("arr=" + [1, 2])
print("obj=" + {k = "v"})
print("flag=" + true + " none=" + nil)
"#;
    assert_eq!(
        run(source),
        "n=42\narr=[1, 2]\nobj={k: \"v\"}\nflag=true none=nil\n"
    );
}

#[test]
fn test_len_counts_characters() {
    assert_eq!(run(r#"print(len("héllo"))"#), "5\n");
}

#[test]
fn test_str_and_num_round_trip() {
    assert_eq!(run(r#"print(str(2.5) + "!")"#), "2.5!\n");
    assert_eq!(run(r#"print(num("17") + 1)"#), "18\n");
}
