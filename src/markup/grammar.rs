//! The wiki-markup grammar.
//!
//! A context-sensitive, whitespace-significant grammar expressed entirely
//! through the engine's combinators: headings, bullet and numbered lists,
//! indented blocks, tables, inline emphasis, links, attributes, insertions,
//! footnotes, anchors, pre blocks and inline script. Ambient whitespace
//! skipping is disabled throughout so indentation stays meaningful.
//!
//! Inline content rules are scans over a fixed alternative set terminated
//! by whatever end token is contextually active: the end token is selected
//! dynamically by walking the active-rule name stack top-down through the
//! rule-name → end-combinator table. This makes the scan the highest-traffic
//! combinator and the primary regex-fusion target.
//!
//! The `regex` crate has no look-around, so every look-around of the
//! classic formulation is expressed as a validator instead: bold requires a
//! following non-space, a heading marker must not continue with `+`, the
//! indentation rules must not sit directly before a newline, a CamelCase
//! word must not follow `~`, and block markup checks that the line is blank
//! to its left.

use crate::engine::context::IndentKind;
use crate::engine::error::GrammarError;
use crate::engine::fusion::RegexFlags;
use crate::engine::grammar::{ExprId, Grammar, GrammarBuilder};
use crate::markup::actions;

/// Flags every grammar pattern is compiled with: `^`/`$` match at line
/// boundaries and `.` matches newline.
pub fn markup_flags() -> RegexFlags {
    RegexFlags::MULTI_LINE | RegexFlags::DOT_MATCHES_NEWLINE
}

fn rx(g: &mut GrammarBuilder, pattern: &str) -> Result<ExprId, GrammarError> {
    g.pattern(pattern, markup_flags())
}

fn rxn(g: &mut GrammarBuilder, pattern: &str, name: &str) -> Result<ExprId, GrammarError> {
    let id = g.pattern(pattern, markup_flags())?;
    g.name(id, name);
    Ok(id)
}

/// A fresh equal-indentation matcher (several rules need their own copy
/// with extra preconditions).
fn equal_indent(g: &mut GrammarBuilder) -> Result<ExprId, GrammarError> {
    let p = rx(g, r"^[ \t]*")?;
    g.validate(p, actions::not_before_newline());
    g.validate(p, actions::validate_equal_indent());
    g.post(p, actions::record_indent());
    Ok(p)
}

/// Appendix entry list: `key=data;key2:data2`.
fn mode_appendix(g: &mut GrammarBuilder) -> Result<ExprId, GrammarError> {
    let key = rxn(g, r"[^\s;|\]=:]+[=:]|[^\s;|\]=:]", "key")?;
    let data = rxn(g, r"[^\s;|\]]*", "data")?;
    let entry = g.seq(vec![key, data]);
    g.name(entry, "entry");
    let semi = rx(g, r";")?;
    let more = {
        let s = g.seq(vec![semi, entry]);
        g.many0(s)
    };
    Ok(g.seq(vec![entry, more]))
}

/// Root rules of the markup grammar.
pub struct MarkupRules {
    /// Whole document: content to end of input.
    pub text: ExprId,
    /// A single attribute, in isolation (autocompletion helper).
    pub attribute_fragment: ExprId,
    /// A single todo entry, in isolation (todo extractor helper).
    pub todo_fragment: ExprId,
}

/// A built markup grammar plus its entry rules.
pub struct MarkupGrammar {
    /// The finalized grammar.
    pub grammar: Grammar,
    /// Entry rule ids.
    pub rules: MarkupRules,
}

impl MarkupGrammar {
    /// Assemble the grammar; `optimize` runs the regex-fusion pass.
    pub fn build(optimize: bool) -> Result<Self, GrammarError> {
        let mut g = GrammarBuilder::new();

        // Forward cells for the mutually recursive content rules.
        let (content, content_slot) = g.forward();
        let (char_attr_content, cac_slot) = g.forward();
        let (table_cell_content, tcc_slot) = g.forward();
        let (heading_content, hc_slot) = g.forward();
        g.name(heading_content, "headingContent");
        let (todo_content, tc_slot) = g.forward();
        g.name(todo_content, "value");
        let (title_content, ttc_slot) = g.forward();
        g.name(title_content, "title");

        let string_end = g.end_of_input();
        let whitespace = rx(&mut g, r"[ \t]*")?;
        g.post(whitespace, actions::hide_on_empty());

        // -------------------- Escapes --------------------

        let escaped_char = {
            let bs = rx(&mut g, r"\\")?;
            let any = rxn(&mut g, r".", "plainText")?;
            g.seq(vec![bs, any])
        };
        let escaped_newline = rxn(&mut g, r"\\\n", "lineBreak")?;

        // -------------------- Character attribution --------------------

        let italics_start = rx(&mut g, r"\b_")?;
        g.pre(italics_start, actions::check_not_nested("italics"));
        let italics_end = rx(&mut g, r"_\b")?;
        let italics = {
            let s = g.seq(vec![italics_start, char_attr_content, italics_end]);
            g.name(s, "italics")
        };

        let bold_start = rx(&mut g, r"\*")?;
        g.pre(bold_start, actions::check_not_nested("bold"));
        g.validate(bold_start, actions::next_char_not_space());
        let bold_end = rx(&mut g, r"\*")?;
        let bold = {
            let s = g.seq(vec![bold_start, char_attr_content, bold_end]);
            g.name(s, "bold")
        };

        // -------------------- Script, rule, HTML --------------------

        let script = {
            let open = rx(&mut g, r"<%")?;
            let close = rx(&mut g, r"%>")?;
            let code = g.scan_until(Vec::new(), close);
            g.pseudo(code, actions::pseudo_named("code"));
            let s = g.seq(vec![open, code, close]);
            g.name(s, "script")
        };

        let horizontal_line = rxn(&mut g, r"----+[ \t]*$", "horizontalLine")?;
        g.pre(horizontal_line, actions::nothing_left());

        let html_tag = rxn(&mut g, r"</?[A-Za-z][A-Za-z0-9:]*(?:/| [^\n>]*)?>", "htmlTag")?;
        let html_entity = rxn(
            &mut g,
            r"&(?:[A-Za-z0-9]{1,10}|#[0-9]{1,6}|#x[0-9a-fA-F]{1,6});",
            "htmlEntity",
        )?;

        // -------------------- Heading --------------------

        let heading_end = rx(&mut g, r"\n")?;
        let heading = {
            let start = rx(&mut g, r"^\+{1,15}")?;
            g.validate(start, actions::not_followed_by('+'));
            let space = rx(&mut g, r" ")?;
            let opt_space = g.opt(space);
            let s = g.seq(vec![start, opt_space, heading_content, heading_end]);
            g.name(s, "heading");
            g.post(s, actions::heading());
            s
        };

        // -------------------- Todo entry --------------------

        let todo_key = rxn(
            &mut g,
            r"\b(?:todo|done|wait|action|track|issue|question|project)(?:\.[^:\s]+)?",
            "key",
        )?;
        let todo_delim = rxn(&mut g, r":", "todoDelimiter")?;
        let todo_end = rx(&mut g, r"\n|\||\z")?;
        let todo_entry = {
            let s = g.seq(vec![todo_key, todo_delim, todo_content]);
            g.name(s, "todoEntry");
            g.post(s, actions::todo_entry());
            s
        };
        let todo_entry_terminated = {
            let bar = rx(&mut g, r"\|")?;
            let opt_bar = g.opt(bar);
            g.seq(vec![todo_entry, opt_bar])
        };

        // -------------------- Newlines and paragraphs --------------------

        // A line holding only whitespace.
        let fake_indentation = rx(&mut g, r"^[ \t]+$")?;
        let new_line = {
            let nl = rx(&mut g, r"\n")?;
            let opt_fake = g.opt(fake_indentation);
            g.seq(vec![nl, opt_fake])
        };
        let new_lines_paragraph = {
            let more = g.many1(new_line);
            let s = g.seq(vec![new_line, more]);
            g.name(s, "newParagraph");
            g.pre(s, actions::require_paragraph_mode(true));
            g.post(s, actions::reset_indent());
            s
        };
        let new_line_break = {
            let s = g.seq(vec![new_line]);
            g.name(s, "lineBreak");
            g.pre(s, actions::require_paragraph_mode(false));
            g.post(s, actions::reset_indent());
            s
        };
        let new_line_whitespace = {
            let s = g.seq(vec![new_line]);
            g.name(s, "whitespace");
            g.pre(s, actions::require_paragraph_mode(true));
            s
        };

        // -------------------- Indentation --------------------

        let more_indentation = {
            let p = rx(&mut g, r"^[ \t]*")?;
            g.pre(p, actions::require_inmost_normal());
            g.validate(p, actions::not_before_newline());
            g.validate(p, actions::validate_more_indent());
            g.post(p, actions::more_indent());
            p
        };
        let less_indentation = {
            let p = rx(&mut g, r"^[ \t]*")?;
            g.validate(p, actions::not_before_newline());
            g.validate(p, actions::validate_less_indent());
            g.post(p, actions::record_indent());
            p
        };
        let less_indent_or_end = g.choice(vec![string_end, less_indentation]);
        let equival_indentation = {
            let p = rx(&mut g, r"^[ \t]+")?;
            g.validate(p, actions::not_before_newline());
            g.validate(p, actions::validate_equival_indent());
            g.post(p, actions::record_indent());
            p
        };
        let indented_text = {
            let fb = g.ahead(less_indent_or_end);
            let s = g.seq(vec![more_indentation, content, fb]);
            g.name(s, "indentedText")
        };

        // -------------------- Lists --------------------

        let list_start_indentation = {
            let p = rx(&mut g, r"^[ \t]*")?;
            g.post(p, actions::list_start_indent());
            p
        };

        let bullet_first = rxn(&mut g, r"\*[ \t]", "bullet")?;
        let bullet_entry_first = {
            let s = g.seq(vec![bullet_first, content]);
            g.name(s, "bulletEntry")
        };
        let bullet = {
            let eq = equal_indent(&mut g)?;
            g.pre(eq, actions::require_inmost_kind(IndentKind::UnorderedList));
            let marker = rxn(&mut g, r"\*[ \t]", "bullet")?;
            g.seq(vec![eq, marker])
        };
        let bullet_entry = {
            let s = g.seq(vec![bullet, content]);
            g.name(s, "bulletEntry")
        };
        let unordered_list = {
            let more = g.many0(bullet_entry);
            let fb = g.ahead(less_indent_or_end);
            let group = g.seq(vec![bullet_entry_first, more, fb]);
            g.pre(group, actions::prepare_list(IndentKind::UnorderedList));
            let s = g.seq(vec![list_start_indentation, group]);
            g.name(s, "unorderedList")
        };

        let number_first = rxn(&mut g, r"(?:\d+\.)*(\d+)\.[ \t]|#[ \t]", "number")?;
        let number_entry_first = {
            let s = g.seq(vec![number_first, content]);
            g.name(s, "numberEntry")
        };
        let number = {
            let eq = equal_indent(&mut g)?;
            g.pre(eq, actions::require_inmost_kind(IndentKind::OrderedList));
            let marker = rxn(&mut g, r"(?:\d+\.)*(\d+)\.[ \t]|#[ \t]", "number")?;
            g.seq(vec![eq, marker])
        };
        let number_entry = {
            let s = g.seq(vec![number, content]);
            g.name(s, "numberEntry")
        };
        let ordered_list = {
            let more = g.many0(number_entry);
            let fb = g.ahead(less_indent_or_end);
            let group = g.seq(vec![number_entry_first, more, fb]);
            g.pre(group, actions::prepare_list(IndentKind::OrderedList));
            let s = g.seq(vec![list_start_indentation, group]);
            g.name(s, "orderedList")
        };

        // -------------------- Table --------------------

        let table_end = rx(&mut g, r"^[ \t]*>>[ \t]*(?:\n|$)")?;
        let new_row = rx(&mut g, r"\n")?;
        let new_cell = rx(&mut g, r"\|")?;
        let useless_spaces = rx(&mut g, r" *")?;
        g.post(useless_spaces, actions::hide_on_empty());

        let cell_boundary = {
            let bar = rx(&mut g, r"\|")?;
            let nl = rx(&mut g, r"\n")?;
            let te = rx(&mut g, r"^[ \t]*>>[ \t]*(?:\n|$)")?;
            g.choice(vec![bar, nl, te])
        };
        let cont_up = {
            let caret = rx(&mut g, r"\^")?;
            let fb = g.ahead(cell_boundary);
            let s = g.seq(vec![caret, useless_spaces, fb]);
            g.name(s, "tableCellContinuationUp")
        };
        let cont_left = {
            let lt = rx(&mut g, r"<")?;
            let fb = g.ahead(cell_boundary);
            let s = g.seq(vec![lt, useless_spaces, fb]);
            g.name(s, "tableCellContinuationLeft")
        };
        let table_cell = {
            let body = g.choice(vec![cont_up, cont_left, table_cell_content]);
            let s = g.seq(vec![useless_spaces, body]);
            g.name(s, "tableCell")
        };
        let table_row = {
            let tail_cell = g.seq(vec![new_cell, useless_spaces, table_cell]);
            let tail = g.many0(tail_cell);
            let s = g.seq(vec![useless_spaces, table_cell, tail]);
            g.name(s, "tableRow");
            g.post(s, actions::hide_on_empty());
            s
        };
        let table = {
            let open = rx(&mut g, r"<<\|")?;
            g.pre(open, actions::nothing_left());
            let open_nl = rx(&mut g, r"[ \t]*\n")?;
            let not_end = g.not_ahead(table_end);
            let more_row = g.seq(vec![not_end, table_row, new_row]);
            let rows = g.many0(more_row);
            let s = g.seq(vec![open, open_nl, table_row, new_row, rows, table_end]);
            g.name(s, "table")
        };

        // -------------------- Pre block --------------------

        let pre_block_end = rx(&mut g, r"^[ \t]*>>[ \t]*(?:\n|$)")?;
        let pre_block = {
            let open = rx(&mut g, r"<<pre[ \t]*\n")?;
            g.pre(open, actions::nothing_left());
            let text_scan = g.scan_until(Vec::new(), pre_block_end);
            g.pseudo(text_scan, actions::pseudo_named("preText"));
            let s = g.seq(vec![open, text_scan, pre_block_end]);
            g.name(s, "preBlock")
        };

        // -------------------- Wiki words and URLs --------------------

        let bracket_start = rx(&mut g, r"\[")?;
        let bracket_end = rx(&mut g, r"\]")?;

        let ww_word = rxn(&mut g, r"[^\\\[\]\|\x00-\x1f=:;#!\n]+", "word")?;
        g.post(ww_word, actions::cut_right_whitespace());

        let search_fragment = {
            let hash = rx(&mut g, r"#")?;
            let frag = rxn(&mut g, r"(?:\\.|[^|\]\\])+", "searchFragment")?;
            g.post(frag, actions::unescape_fragment());
            g.seq(vec![hash, frag])
        };
        let anchor_link = {
            let bang = rx(&mut g, r"!")?;
            let a = rxn(&mut g, r"[A-Za-z0-9_]+", "anchorLink")?;
            g.seq(vec![bang, a])
        };
        let title = {
            let ts = rx(&mut g, r"\|[ \t]*")?;
            g.seq(vec![ts, title_content])
        };

        let wiki_word_ncc = {
            let frag_or_anchor = g.choice(vec![search_fragment, anchor_link]);
            let opt_fa = g.opt(frag_or_anchor);
            let opt_title = g.opt(title);
            let s = g.seq(vec![
                bracket_start,
                ww_word,
                opt_fa,
                whitespace,
                opt_title,
                bracket_end,
            ]);
            g.name(s, "wikiWord");
            g.post(s, actions::wiki_word_ncc());
            s
        };

        let cc_word = rxn(&mut g, r"\b(?:[A-Z][a-z0-9]+){2,}\b", "word")?;
        g.pre(cc_word, actions::camel_case_allowed());
        g.pre(cc_word, actions::no_tilde_before());
        let wiki_word_cc = {
            let opt_anchor = g.opt(anchor_link);
            let s = g.seq(vec![cc_word, opt_anchor]);
            g.name(s, "wikiWord");
            g.post(s, actions::wiki_word_cc());
            s
        };
        let wiki_word = g.choice(vec![wiki_word_ncc, wiki_word_cc]);

        let url_appendix = {
            let ma = mode_appendix(&mut g)?;
            let s = g.seq(vec![ma]);
            g.name(s, "urlModeAppendix");
            g.post(s, actions::mode_appendix());
            s
        };
        let gt = rx(&mut g, r">")?;
        let url_core = rxn(
            &mut g,
            r#"(?:(?:https?|ftp|file)://|mailto:)[^ \t\n<>\[\]|"]*[^ \t\n<>\[\]|".,;:!?)]"#,
            "url",
        )?;
        let url_bare = {
            let app = g.seq(vec![gt, url_appendix]);
            let opt_app = g.opt(app);
            let s = g.seq(vec![url_core, opt_app]);
            let named = g.seq(vec![s]);
            g.name(named, "urlLinkBare");
            g.post(named, actions::url_link(false));
            named
        };
        let url_core_bracketed = rxn(
            &mut g,
            r#"(?:(?:https?|ftp|file)://|mailto:)[^ \t\n>|\]"]+"#,
            "url",
        )?;
        let url_titled = {
            let app = g.seq(vec![gt, url_appendix]);
            let opt_app = g.opt(app);
            let core = g.seq(vec![url_core_bracketed, opt_app]);
            let opt_title = g.opt(title);
            let s = g.seq(vec![bracket_start, core, whitespace, opt_title, bracket_end]);
            g.name(s, "urlLinkBracketed");
            g.post(s, actions::url_link(true));
            s
        };
        let url_ref = g.choice(vec![url_titled, url_bare]);

        // -------------------- Footnote --------------------

        let footnote = {
            let id = rxn(&mut g, r"[0-9]+", "footnoteId")?;
            let s = g.seq(vec![bracket_start, id, bracket_end]);
            g.name(s, "footnote");
            g.post(s, actions::footnote());
            s
        };

        // -------------------- Attributes and insertions --------------------

        let attr_quote_start = rx(&mut g, r#""+|'+|/+|\\+"#)?;
        g.post(attr_quote_start, actions::quote_start());
        let attr_quote_end = rx(&mut g, r#""+|'+|/+|\\+"#)?;
        g.validate(attr_quote_end, actions::quote_end_matches());
        let quoted_value = g.scan_until(Vec::new(), attr_quote_end);
        g.pseudo(quoted_value, actions::pseudo_named("value"));
        let nonquoted_value = rxn(&mut g, r"(?:[ \t]*[\w\-=:,.!?#%|/]+)*", "value")?;
        let attr_value = {
            let quoted = g.seq(vec![attr_quote_start, quoted_value, attr_quote_end]);
            let body = g.choice(vec![quoted, nonquoted_value]);
            g.seq(vec![whitespace, body])
        };
        let kv_delim = rx(&mut g, r"[ \t]*[=:]")?;
        let attr_key = rxn(&mut g, r"[\w\-.]+", "key")?;
        let semi = rx(&mut g, r";")?;
        let more_values = {
            let s = g.seq(vec![semi, attr_value]);
            g.many0(s)
        };
        let attribute = {
            let s = g.seq(vec![
                bracket_start,
                whitespace,
                attr_key,
                kv_delim,
                attr_value,
                more_values,
                whitespace,
                bracket_end,
            ]);
            g.name(s, "attribute");
            g.post(s, actions::attribute());
            s
        };
        let insertion = {
            let colon = rx(&mut g, r":")?;
            let s = g.seq(vec![
                bracket_start,
                colon,
                whitespace,
                attr_key,
                kv_delim,
                attr_value,
                more_values,
                whitespace,
                bracket_end,
            ]);
            g.name(s, "insertion");
            g.post(s, actions::insertion());
            s
        };

        // -------------------- Anchor definition --------------------

        let anchor_def = {
            let p = rx(&mut g, r"^[ \t]*anchor:[ \t]*")?;
            let a = rxn(&mut g, r"[A-Za-z0-9_]+", "anchor")?;
            let s = g.seq(vec![p, a]);
            g.name(s, "anchorDef");
            g.post(s, actions::anchor_def());
            s
        };

        // -------------------- End tokens --------------------

        let bullet_or_less = g.choice(vec![bullet, less_indent_or_end]);
        let number_or_less = g.choice(vec![number, less_indent_or_end]);
        let end_token = {
            let options = vec![
                string_end,
                bold_end,
                italics_end,
                less_indent_or_end,
                bullet_or_less,
                number_or_less,
                bracket_end,
                table_end,
                heading_end,
                todo_end,
                pre_block_end,
            ];
            let table = vec![
                ("bold", bold_end),
                ("italics", italics_end),
                ("unorderedList", less_indent_or_end),
                ("bulletEntry", bullet_or_less),
                ("orderedList", less_indent_or_end),
                ("numberEntry", number_or_less),
                ("indentedText", less_indent_or_end),
                ("wikiWord", bracket_end),
                ("urlLinkBracketed", bracket_end),
                ("table", table_end),
                ("heading", heading_end),
                ("todoEntry", todo_end),
                ("preBlock", pre_block_end),
            ];
            g.select(options, actions::end_token_picker(table, string_end))
        };
        let end_in_table = g.choice(vec![end_token, new_cell, new_row]);
        let plain_newline = rx(&mut g, r"\n")?;
        let end_in_title = g.choice(vec![end_token, plain_newline]);
        let end_in_char_attr = g.choice(vec![end_token, heading]);

        // -------------------- Content definitions --------------------

        let find_markup_in_cell = {
            let s = g.scan_until(
                vec![
                    bold,
                    italics,
                    url_ref,
                    insertion,
                    escaped_newline,
                    escaped_char,
                    footnote,
                    wiki_word,
                    html_tag,
                    html_entity,
                ],
                end_in_table,
            );
            g.pseudo(s, actions::pseudo_plain_text());
            s
        };
        let cell_loop = {
            let na = g.not_ahead(end_in_table);
            let item = g.seq(vec![na, find_markup_in_cell]);
            g.many0(item)
        };
        g.bind(tcc_slot, cell_loop)?;

        let find_markup_in_title = {
            let s = g.scan_until(
                vec![
                    bold,
                    italics,
                    url_ref,
                    insertion,
                    escaped_char,
                    footnote,
                    html_tag,
                    html_entity,
                ],
                end_in_title,
            );
            g.pseudo(s, actions::pseudo_plain_text());
            s
        };
        let title_loop = {
            let na = g.not_ahead(end_in_title);
            let item = g.seq(vec![na, find_markup_in_title]);
            g.many0(item)
        };
        g.bind(ttc_slot, title_loop)?;

        let find_markup_in_heading = {
            let s = g.scan_until(
                vec![
                    bold,
                    italics,
                    url_ref,
                    insertion,
                    escaped_char,
                    footnote,
                    wiki_word,
                    html_tag,
                    html_entity,
                ],
                end_token,
            );
            g.pseudo(s, actions::pseudo_plain_text());
            s
        };
        let heading_loop = {
            let na = g.not_ahead(end_token);
            let item = g.seq(vec![na, find_markup_in_heading]);
            g.many0(item)
        };
        g.bind(hc_slot, heading_loop)?;

        let find_markup_in_todo = {
            let s = g.scan_until(
                vec![
                    bold,
                    italics,
                    url_ref,
                    attribute,
                    insertion,
                    escaped_char,
                    footnote,
                    wiki_word,
                    html_tag,
                    html_entity,
                ],
                end_token,
            );
            g.pseudo(s, actions::pseudo_plain_text());
            s
        };
        let todo_loop = {
            let na = g.not_ahead(end_token);
            let item = g.seq(vec![na, find_markup_in_todo]);
            g.many1(item)
        };
        g.bind(tc_slot, todo_loop)?;

        let find_markup_in_char_attr = {
            let s = g.scan_until(
                vec![
                    bold,
                    italics,
                    url_ref,
                    attribute,
                    insertion,
                    footnote,
                    wiki_word,
                    new_lines_paragraph,
                    new_line_break,
                    new_line_whitespace,
                    escaped_newline,
                    escaped_char,
                    todo_entry_terminated,
                    anchor_def,
                    html_tag,
                    html_entity,
                    unordered_list,
                    ordered_list,
                    indented_text,
                    table,
                    pre_block,
                    equival_indentation,
                ],
                end_in_char_attr,
            );
            g.pseudo(s, actions::pseudo_plain_text());
            s
        };
        let cac_loop = {
            let na = g.not_ahead(end_in_char_attr);
            let item = g.seq(vec![na, find_markup_in_char_attr]);
            g.many0(item)
        };
        g.bind(cac_slot, cac_loop)?;

        let find_markup = {
            let s = g.scan_until(
                vec![
                    bold,
                    italics,
                    url_ref,
                    attribute,
                    insertion,
                    footnote,
                    wiki_word,
                    new_lines_paragraph,
                    new_line_break,
                    new_line_whitespace,
                    escaped_newline,
                    escaped_char,
                    heading,
                    todo_entry_terminated,
                    anchor_def,
                    html_tag,
                    html_entity,
                    unordered_list,
                    ordered_list,
                    indented_text,
                    table,
                    pre_block,
                    script,
                    horizontal_line,
                    equival_indentation,
                ],
                end_token,
            );
            g.pseudo(s, actions::pseudo_plain_text());
            s
        };
        let content_loop = {
            let na = g.not_ahead(end_token);
            let item = g.seq(vec![na, find_markup]);
            let l = g.many0(item);
            g.validate(l, actions::validate_non_empty());
            l
        };
        g.bind(content_slot, content_loop)?;

        // -------------------- Entry rules --------------------

        let text = g.seq(vec![content, string_end]);
        let attribute_fragment = g.seq(vec![attribute, string_end]);
        let todo_fragment = g.seq(vec![todo_entry, string_end]);

        let mut grammar = g.build(text)?;
        if optimize {
            grammar.optimize();
        }

        Ok(MarkupGrammar {
            grammar,
            rules: MarkupRules {
                text,
                attribute_fragment,
                todo_fragment,
            },
        })
    }
}
