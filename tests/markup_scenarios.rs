//! Integration tests for the markup grammar: the concrete end-to-end
//! scenarios covering emphasis, headings, lists, tables, attributes,
//! links, configuration toggles and the failure-fallback behaviour.

use pretty_assertions::assert_eq;

use wikimark::{
    parse_document, AttrValue, AutoLinkMode, CancelToken, MarkupParser, ParseError, ParseOptions,
    SyntaxNode,
};

fn parse(input: &str) -> SyntaxNode {
    parse_document(input, &ParseOptions::default()).expect("document grammar is total")
}

fn children(doc: &SyntaxNode) -> &[SyntaxNode] {
    doc.as_non_terminal().expect("document root").children()
}

fn names(doc: &SyntaxNode) -> Vec<String> {
    children(doc)
        .iter()
        .map(|c| c.name().unwrap_or("").to_string())
        .collect()
}

fn find_deep<'a>(doc: &'a SyntaxNode, name: &str) -> Vec<&'a SyntaxNode> {
    let mut out = Vec::new();
    doc.as_non_terminal().unwrap().deep_by_name(name, &mut out);
    out
}

fn plain_text_of(node: &SyntaxNode, name: &str) -> String {
    node.as_non_terminal()
        .unwrap()
        .find_flat_by_name(name)
        .map(|n| n.reconstruct())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------
// Emphasis
// ---------------------------------------------------------------------

#[test]
fn bold_and_italics_line() {
    let input = "*bold* and _italic_\n";
    let doc = parse(input);

    assert_eq!(doc.reconstruct(), input);
    assert_eq!(names(&doc), vec!["bold", "plainText", "italics", "lineBreak"]);

    let bold = &children(&doc)[0];
    assert_eq!(plain_text_of(bold, "plainText"), "bold");
    assert_eq!(children(&doc)[1].reconstruct(), " and ");

    let italics = &children(&doc)[2];
    assert_eq!(plain_text_of(italics, "plainText"), "italic");
}

#[test]
fn bold_rejects_nested_bold() {
    // The inner `*` pair terminates the outer bold; a bold inside bold is
    // forbidden through the name stack.
    let doc = parse("*a *b* c*\n");
    let bolds = find_deep(&doc, "bold");
    for b in &bolds {
        assert!(find_deep(b, "bold").is_empty(), "no bold nested in bold");
    }
    assert_eq!(doc.reconstruct(), "*a *b* c*\n");
}

#[test]
fn bold_needs_following_content() {
    // `* ` is a bullet marker, not bold; at line start with content it
    // parses as a list instead.
    let doc = parse("a * b\n");
    assert!(find_deep(&doc, "bold").is_empty());
    assert_eq!(doc.reconstruct(), "a * b\n");
}

// ---------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------

#[test]
fn heading_with_level_and_content() {
    let input = "+ Heading\ncontent\n";
    let doc = parse(input);
    assert_eq!(doc.reconstruct(), input);

    let heading = &children(&doc)[0];
    assert_eq!(heading.name(), Some("heading"));
    assert_eq!(
        heading.attrs().get("level").and_then(AttrValue::as_int),
        Some(1)
    );
    assert_eq!(plain_text_of(heading, "headingContent"), "Heading");

    // The rest of the document is plain text plus the line break.
    assert_eq!(children(&doc)[1].reconstruct(), "content");
    assert_eq!(children(&doc)[1].name(), Some("plainText"));
    assert_eq!(children(&doc)[2].reconstruct(), "\n");
}

#[test]
fn heading_level_counts_markers() {
    let doc = parse("+++ Deep\n");
    let heading = &children(&doc)[0];
    assert_eq!(
        heading.attrs().get("level").and_then(AttrValue::as_int),
        Some(3)
    );
}

#[test]
fn sixteen_plus_signs_are_not_a_heading() {
    let doc = parse("++++++++++++++++ x\n");
    assert!(find_deep(&doc, "heading").is_empty());
    assert_eq!(doc.reconstruct(), "++++++++++++++++ x\n");
}

// ---------------------------------------------------------------------
// Lists and indentation
// ---------------------------------------------------------------------

#[test]
fn unordered_list_with_two_entries() {
    let input = "* item one\n* item two\n";
    let doc = parse(input);
    assert_eq!(doc.reconstruct(), input);

    let lists = find_deep(&doc, "unorderedList");
    assert_eq!(lists.len(), 1);

    let entries: Vec<_> = lists[0]
        .as_non_terminal()
        .unwrap()
        .iter_flat_by_name("bulletEntry")
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(plain_text_of(entries[0], "plainText"), "item one");
    assert_eq!(plain_text_of(entries[1], "plainText"), "item two");
}

#[test]
fn more_indented_bullet_nests() {
    let doc = parse("* a\n  * b\n");
    let outer = find_deep(&doc, "unorderedList");
    assert_eq!(outer.len(), 2, "outer list plus nested list");

    let outer_entries: Vec<_> = outer[0]
        .as_non_terminal()
        .unwrap()
        .iter_flat_by_name("bulletEntry")
        .collect();
    assert_eq!(outer_entries.len(), 1, "nested entry lives inside entry one");
    assert_eq!(find_deep(outer_entries[0], "unorderedList").len(), 1);
}

#[test]
fn less_indent_terminates_indented_block() {
    let doc = parse("  in\nout\n");
    assert_eq!(names(&doc), vec!["indentedText", "plainText", "lineBreak"]);
    assert_eq!(children(&doc)[0].reconstruct(), "  in\n");
    assert_eq!(children(&doc)[1].reconstruct(), "out");
}

#[test]
fn equal_indent_continues_indented_block() {
    let doc = parse("  alpha\n  beta\n");
    assert_eq!(names(&doc), vec!["indentedText"]);
    assert_eq!(children(&doc)[0].reconstruct(), "  alpha\n  beta\n");
}

#[test]
fn ordered_list_with_hash_markers() {
    let input = "# one\n# two\n";
    let doc = parse(input);
    let lists = find_deep(&doc, "orderedList");
    assert_eq!(lists.len(), 1);
    let entries: Vec<_> = lists[0]
        .as_non_terminal()
        .unwrap()
        .iter_flat_by_name("numberEntry")
        .collect();
    assert_eq!(entries.len(), 2);
}

// ---------------------------------------------------------------------
// Attributes and insertions
// ---------------------------------------------------------------------

#[test]
fn attribute_with_key_and_value() {
    let input = "[key: value]\n";
    let doc = parse(input);
    assert_eq!(doc.reconstruct(), input);

    let attr = &children(&doc)[0];
    assert_eq!(attr.name(), Some("attribute"));
    assert_eq!(
        attr.attrs().get("key").and_then(AttrValue::as_str),
        Some("key")
    );

    let pairs = attr.attrs().get("attrs").and_then(AttrValue::as_list).unwrap();
    assert_eq!(pairs.len(), 1);
    let pair = pairs[0].as_list().unwrap();
    assert_eq!(pair[0].as_str(), Some("key"));
    assert_eq!(pair[1].as_str(), Some("value"));
}

#[test]
fn quoted_attribute_value() {
    let doc = parse("[k=\"v\"]\n");
    let attr = &children(&doc)[0];
    assert_eq!(attr.name(), Some("attribute"));
    let pairs = attr.attrs().get("attrs").and_then(AttrValue::as_list).unwrap();
    assert_eq!(pairs[0].as_list().unwrap()[1].as_str(), Some("v"));
}

#[test]
fn unterminated_quoted_value_falls_back_to_plain_text() {
    let input = "[k=\"unterminated]\n";
    let doc = parse(input);
    // No attribute node; the bracketed text is plain text, no top-level
    // parse failure.
    assert!(find_deep(&doc, "attribute").is_empty());
    assert_eq!(names(&doc), vec!["plainText", "lineBreak"]);
    assert_eq!(children(&doc)[0].reconstruct(), "[k=\"unterminated]");
}

#[test]
fn mismatched_quotes_fall_back_to_plain_text() {
    // The end-quote validator rejects the quoted alternative fatally; the
    // attribute as a whole is dropped and the content falls back.
    let input = "[k=\"a']\n";
    let doc = parse(input);
    assert!(find_deep(&doc, "attribute").is_empty());
    assert_eq!(doc.reconstruct(), input);
}

#[test]
fn insertion_with_value_and_appendix() {
    let doc = parse("[:page: Foo; extra]\n");
    let ins = &children(&doc)[0];
    assert_eq!(ins.name(), Some("insertion"));
    assert_eq!(
        ins.attrs().get("key").and_then(AttrValue::as_str),
        Some("page")
    );
    assert_eq!(
        ins.attrs().get("value").and_then(AttrValue::as_str),
        Some("Foo")
    );
    let appendices = ins
        .attrs()
        .get("appendices")
        .and_then(AttrValue::as_list)
        .unwrap();
    assert_eq!(appendices.len(), 1);
    assert_eq!(appendices[0].as_str(), Some("extra"));
}

// ---------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------

fn options_with_base(base: &str) -> ParseOptions {
    ParseOptions {
        base_document_path: base.to_string(),
        ..ParseOptions::default()
    }
}

#[test]
fn bracketed_link_resolves_relative_to_base() {
    let doc = parse_document("see [Other]\n", &options_with_base("Main/Page")).unwrap();
    let links = find_deep(&doc, "wikiWord");
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].attrs().get("target_path").and_then(AttrValue::as_str),
        Some("Main/Other")
    );
    assert_eq!(
        links[0].attrs().get("link_core").and_then(AttrValue::as_str),
        Some("Other")
    );
}

#[test]
fn bracketed_link_with_title_fragment_and_anchor() {
    let doc = parse("[Page#frag]\n");
    let link = find_deep(&doc, "wikiWord")[0];
    assert_eq!(
        link.attrs()
            .get("search_fragment")
            .and_then(AttrValue::as_str),
        Some("frag")
    );

    let doc = parse("[Page!anchor1]\n");
    let link = find_deep(&doc, "wikiWord")[0];
    assert_eq!(
        link.attrs().get("anchor").and_then(AttrValue::as_str),
        Some("anchor1")
    );

    let doc = parse("[Page|The Title]\n");
    let link = find_deep(&doc, "wikiWord")[0];
    assert_eq!(
        link.attrs()
            .get("display_title")
            .and_then(AttrValue::as_str),
        Some("The Title")
    );
}

#[test]
fn camel_case_toggle_changes_only_the_word() {
    let input = "look at CamelCase now\n";

    let with_links = parse(input);
    assert_eq!(
        names(&with_links),
        vec!["plainText", "wikiWord", "plainText", "lineBreak"]
    );
    let link = &children(&with_links)[1];
    assert_eq!(link.reconstruct(), "CamelCase");
    assert_eq!(
        link.attrs().get("target_path").and_then(AttrValue::as_str),
        Some("CamelCase")
    );

    let options = ParseOptions {
        camel_case_links: false,
        ..ParseOptions::default()
    };
    let without = parse_document(input, &options).unwrap();
    assert!(find_deep(&without, "wikiWord").is_empty());
    // Surrounding node boundaries unchanged: one plain-text run plus the
    // line break.
    assert_eq!(names(&without), vec!["plainText", "lineBreak"]);
    assert_eq!(without.reconstruct(), input);
}

#[test]
fn tilde_escapes_camel_case() {
    let doc = parse("~CamelCase\n");
    assert!(find_deep(&doc, "wikiWord").is_empty());
}

#[test]
fn unresolvable_link_falls_back_to_plain_text() {
    // Climbing above the root cannot resolve, so the bracketed text stays
    // plain.
    let doc = parse_document("[../../Nope]\n", &options_with_base("Page")).unwrap();
    assert!(find_deep(&doc, "wikiWord").is_empty());
    assert_eq!(doc.reconstruct(), "[../../Nope]\n");
}

#[test]
fn bare_url_link() {
    let doc = parse("see https://example.com/a now\n");
    let links = find_deep(&doc, "urlLink");
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].attrs().get("url").and_then(AttrValue::as_str),
        Some("https://example.com/a")
    );
    assert_eq!(
        links[0].attrs().get("bracketed").and_then(AttrValue::as_bool),
        Some(false)
    );
}

#[test]
fn bracketed_url_with_title() {
    let doc = parse("[https://example.com/a|Example]\n");
    let links = find_deep(&doc, "urlLink");
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].attrs().get("bracketed").and_then(AttrValue::as_bool),
        Some(true)
    );
    assert_eq!(
        links[0]
            .attrs()
            .get("display_title")
            .and_then(AttrValue::as_str),
        Some("Example")
    );
}

#[test]
fn footnote_link_toggle() {
    let plain = parse("[42]\n");
    let footnote = find_deep(&plain, "footnote")[0];
    assert_eq!(
        footnote
            .attrs()
            .get("footnote_id")
            .and_then(AttrValue::as_str),
        Some("42")
    );
    assert!(footnote.attrs().get("target_path").is_none());

    let options = ParseOptions {
        footnotes_as_links: true,
        ..ParseOptions::default()
    };
    let linked = parse_document("[42]\n", &options).unwrap();
    let footnote = find_deep(&linked, "footnote")[0];
    assert_eq!(
        footnote
            .attrs()
            .get("target_path")
            .and_then(AttrValue::as_str),
        Some("42")
    );
}

// ---------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------

#[test]
fn table_rows_and_cells() {
    let input = "<<|\na|b\nc|d\n>>\n";
    let doc = parse(input);
    assert_eq!(doc.reconstruct(), input);

    let tables = find_deep(&doc, "table");
    assert_eq!(tables.len(), 1);
    let rows: Vec<_> = tables[0]
        .as_non_terminal()
        .unwrap()
        .iter_flat_by_name("tableRow")
        .collect();
    assert_eq!(rows.len(), 2);
    for row in rows {
        let cells: Vec<_> = row
            .as_non_terminal()
            .unwrap()
            .iter_flat_by_name("tableCell")
            .collect();
        assert_eq!(cells.len(), 2);
    }
}

#[test]
fn table_requires_blank_line_start() {
    let doc = parse("x <<|\na\n>>\n");
    assert!(find_deep(&doc, "table").is_empty());
}

// ---------------------------------------------------------------------
// Other blocks
// ---------------------------------------------------------------------

#[test]
fn todo_entry_with_dotted_key() {
    let doc = parse("todo.home: fix the door\nrest\n");
    let todos = find_deep(&doc, "todoEntry");
    assert_eq!(todos.len(), 1);
    assert_eq!(
        todos[0].attrs().get("key").and_then(AttrValue::as_str),
        Some("todo.home")
    );
    let components = todos[0]
        .attrs()
        .get("key_components")
        .and_then(AttrValue::as_list)
        .unwrap();
    assert_eq!(components.len(), 2);
    assert_eq!(plain_text_of(todos[0], "value"), " fix the door");
}

#[test]
fn anchor_definition() {
    let doc = parse("anchor: top\n");
    let anchors = find_deep(&doc, "anchorDef");
    assert_eq!(anchors.len(), 1);
    assert_eq!(
        anchors[0].attrs().get("anchor").and_then(AttrValue::as_str),
        Some("top")
    );
}

#[test]
fn horizontal_line_block() {
    let doc = parse("----\n");
    assert_eq!(names(&doc), vec!["horizontalLine", "lineBreak"]);
}

#[test]
fn script_block_keeps_code_raw() {
    let doc = parse("<% a *b* c %>\n");
    let scripts = find_deep(&doc, "script");
    assert_eq!(scripts.len(), 1);
    assert_eq!(plain_text_of(scripts[0], "code"), " a *b* c ");
    assert!(find_deep(scripts[0], "bold").is_empty());
}

#[test]
fn pre_block_keeps_text_raw() {
    let input = "<<pre\nraw *text*\n>>\n";
    let doc = parse(input);
    assert_eq!(doc.reconstruct(), input);
    let pre = find_deep(&doc, "preBlock")[0];
    assert_eq!(plain_text_of(pre, "preText"), "raw *text*\n");
    assert!(find_deep(pre, "bold").is_empty());
}

#[test]
fn escaped_character_stays_plain() {
    let doc = parse("\\*not bold\n");
    assert!(find_deep(&doc, "bold").is_empty());
    assert_eq!(doc.reconstruct(), "\\*not bold\n");
}

// ---------------------------------------------------------------------
// Paragraph mode
// ---------------------------------------------------------------------

#[test]
fn paragraph_mode_newline_nodes() {
    let input = "a\n\nb\n";

    let break_mode = parse(input);
    assert_eq!(
        names(&break_mode),
        vec!["plainText", "lineBreak", "lineBreak", "plainText", "lineBreak"]
    );

    let options = ParseOptions {
        paragraph_mode: true,
        ..ParseOptions::default()
    };
    let para_mode = parse_document(input, &options).unwrap();
    assert_eq!(
        names(&para_mode),
        vec!["plainText", "newParagraph", "plainText", "whitespace"]
    );
    assert_eq!(para_mode.reconstruct(), input);
}

// ---------------------------------------------------------------------
// Auto-link pass
// ---------------------------------------------------------------------

#[test]
fn auto_link_rewrites_plain_text() {
    let options = ParseOptions {
        auto_link: AutoLinkMode::Relax {
            words: vec!["known word".to_string()],
        },
        ..ParseOptions::default()
    };
    let doc = parse_document("a Known Word here\n", &options).unwrap();
    let links = find_deep(&doc, "wikiWord");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].reconstruct(), "Known Word");
    assert_eq!(
        links[0].attrs().get("auto").and_then(AttrValue::as_bool),
        Some(true)
    );
    // The rewrite keeps the tree lossless.
    assert_eq!(doc.reconstruct(), "a Known Word here\n");
}

// ---------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------

#[test]
fn cancellation_never_yields_a_partial_tree() {
    let parser = MarkupParser::new().unwrap();
    let token = CancelToken::new();
    token.cancel();
    let result = parser.parse(
        "a long *document* with [links]\n",
        &ParseOptions::default(),
        token,
    );
    assert!(matches!(result, Err(ParseError::Cancelled)));
}
