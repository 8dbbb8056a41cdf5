//! Individual rewrite passes.
//!
//! Each pass inspects the current text and either returns `None` or the
//! rewritten text plus one [`AdaptationChange`] describing what it did.
//! A pass must leave its own output alone when run again.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{AdaptationChange, ChangeKind, ShellDialect};

pub(super) type Pass = fn(&str) -> Option<(String, AdaptationChange)>;

/// bash → zsh
const TO_ZSH: &[Pass] = &[
    backticks_to_parens,
    array_join,
    echo_escape,
    read_prompt,
    pcre_match,
];

/// zsh → bash
const TO_BASH: &[Pass] = &[case_transform];

const TO_POSIX: &[Pass] = &[backticks_to_parens];

pub(super) fn for_dialect(target: ShellDialect) -> &'static [Pass] {
    match target {
        ShellDialect::Zsh => TO_ZSH,
        ShellDialect::Bash => TO_BASH,
        ShellDialect::Posix => TO_POSIX,
    }
}

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in rewrite pattern must compile")
}

const PCRE_DIRECTIVE: &str = "setopt RE_MATCH_PCRE 2>/dev/null; ";

static ARRAY_JOIN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\[\*\]\}"));
static ECHO_E: LazyLock<Regex> = LazyLock::new(|| compile(r"\becho(?:\s+-e)+\s+"));
static READ_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"\bread\s+(-r\s+)?-p\s+(?:"([^"]*)"|'([^']*)')\s+([A-Za-z_][A-Za-z0-9_]*)"#)
});
static REGEX_OPERAND: LazyLock<Regex> = LazyLock::new(|| compile(r"=~\s*(.*?)\s*(?:\]\]|$)"));
static PCRE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\\[dDwWsSbB]|\(\?(?:[=!]|<[=!])"));
static CASE_FLAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\$\{\(([UuLl])\)([A-Za-z_][A-Za-z0-9_]*)\}"));

/// Where single-quoted literals and substitution backticks sit in a command.
#[derive(Debug, Default)]
struct QuoteScan {
    /// Byte ranges of single-quoted spans, quotes included. An unterminated
    /// quote runs to the end of the text.
    single_quoted: Vec<Range<usize>>,
    /// Unescaped backticks outside single quotes.
    backticks: Vec<usize>,
    balanced: bool,
}

impl QuoteScan {
    fn new(text: &str) -> Self {
        let mut scan = QuoteScan::default();
        let mut single_start = None;
        let mut in_double = false;
        let mut chars = text.char_indices();

        while let Some((idx, ch)) = chars.next() {
            match ch {
                '\\' if single_start.is_none() => {
                    chars.next();
                }
                '\'' if !in_double => match single_start.take() {
                    Some(start) => scan.single_quoted.push(start..idx + 1),
                    None => single_start = Some(idx),
                },
                '"' if single_start.is_none() => in_double = !in_double,
                '`' if single_start.is_none() => scan.backticks.push(idx),
                _ => {}
            }
        }

        if let Some(start) = single_start {
            scan.single_quoted.push(start..text.len());
        }
        scan.balanced = single_start.is_none() && !in_double;
        scan
    }

    fn is_literal(&self, idx: usize) -> bool {
        self.single_quoted.iter().any(|span| span.contains(&idx))
    }
}

/// Replace every match of `re` that does not start inside a single-quoted
/// literal. Returns the new text with the first replaced match and its
/// replacement, or `None` when nothing outside quotes matched.
fn replace_unquoted(
    re: &Regex,
    text: &str,
    replace: impl Fn(&Captures) -> String,
) -> Option<(String, String, String)> {
    let scan = QuoteScan::new(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut first = None;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if scan.is_literal(whole.start()) {
            continue;
        }
        let replacement = replace(&caps);
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement);
        last = whole.end();
        first.get_or_insert_with(|| (whole.as_str().to_string(), replacement));
    }

    let (original, replacement) = first?;
    out.push_str(&text[last..]);
    Some((out, original, replacement))
}

/// `` `cmd` `` → `$(cmd)`.
///
/// Backticks pair by occurrence. Backticks inside single quotes are literal
/// text and are skipped, as are escaped ones. An odd number of eligible
/// backticks or an unterminated quote leaves the text unchanged.
fn backticks_to_parens(text: &str) -> Option<(String, AdaptationChange)> {
    let scan = QuoteScan::new(text);
    let ticks = scan.backticks;
    if ticks.is_empty() || ticks.len() % 2 != 0 || !scan.balanced {
        return None;
    }

    let mut out = String::with_capacity(text.len() + ticks.len());
    let mut last = 0;
    for (n, &idx) in ticks.iter().enumerate() {
        out.push_str(&text[last..idx]);
        out.push_str(if n % 2 == 0 { "$(" } else { ")" });
        last = idx + 1;
    }
    out.push_str(&text[last..]);

    let original = &text[ticks[0]..=ticks[1]];
    let replacement = format!("$({})", &text[ticks[0] + 1..ticks[1]]);
    let description = if ticks.len() > 2 {
        format!("Converted {} backtick substitutions to $(...)", ticks.len() / 2)
    } else {
        "Converted backtick substitution to $(...)".to_string()
    };

    Some((
        out,
        AdaptationChange::new(ChangeKind::CommandSubstitution, description, original, replacement),
    ))
}

/// `${arr[*]}` → `${(j: :)arr}`.
fn array_join(text: &str) -> Option<(String, AdaptationChange)> {
    let (out, original, replacement) =
        replace_unquoted(&ARRAY_JOIN, text, |c| format!("${{(j: :){}}}", &c[1]))?;

    Some((
        out,
        AdaptationChange::new(
            ChangeKind::ArrayExpansion,
            "Joined array elements with an explicit (j: :) flag",
            original,
            replacement,
        ),
    ))
}

/// `echo -e ...` → `echo ...`; zsh's echo interprets escapes by default.
fn echo_escape(text: &str) -> Option<(String, AdaptationChange)> {
    let (out, _, _) = replace_unquoted(&ECHO_E, text, |_| "echo ".to_string())?;

    Some((
        out,
        AdaptationChange::new(
            ChangeKind::EchoEscape,
            "Removed -e flag; zsh echo interprets escape sequences by default",
            "echo -e",
            "echo",
        ),
    ))
}

fn escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn read_replacement(caps: &Captures) -> String {
    let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    // A double-quoted prompt keeps its expansions; a single-quoted one is
    // literal and has to be escaped to stay literal inside double quotes.
    let prompt = match (caps.get(2), caps.get(3)) {
        (Some(double), _) => double.as_str().to_string(),
        (None, Some(single)) => escape_double_quoted(single.as_str()),
        (None, None) => String::new(),
    };
    format!("read {}\"{}?{}\"", raw, &caps[4], prompt)
}

/// `read -p "prompt" var` → `read "var?prompt"`.
fn read_prompt(text: &str) -> Option<(String, AdaptationChange)> {
    let (out, original, replacement) = replace_unquoted(&READ_PROMPT, text, read_replacement)?;

    Some((
        out,
        AdaptationChange::new(
            ChangeKind::ReadSyntax,
            "Converted read -p prompt to zsh's var?prompt form",
            original,
            replacement,
        ),
    ))
}

/// Enable PCRE matching when a `=~` pattern relies on PCRE-only syntax.
///
/// The directive's own failure is discarded so shells built without PCRE
/// still run the rest of the command.
fn pcre_match(text: &str) -> Option<(String, AdaptationChange)> {
    if text.to_lowercase().contains("re_match_pcre") {
        return None;
    }

    let operand = REGEX_OPERAND
        .captures_iter(text)
        .filter_map(|caps| caps.get(0).zip(caps.get(1)))
        .find(|(_, pattern)| PCRE_ONLY.is_match(pattern.as_str()))
        .map(|(whole, _)| whole.as_str().trim_end().to_string())?;

    Some((
        format!("{}{}", PCRE_DIRECTIVE, text),
        AdaptationChange::new(
            ChangeKind::RegexMatching,
            "Enabled PCRE matching for a pattern using PCRE-only escapes",
            operand.clone(),
            format!("{}... {}", PCRE_DIRECTIVE, operand),
        ),
    ))
}

fn case_replacement(caps: &Captures) -> String {
    let op = match &caps[1] {
        "U" => "^^",
        "u" => "^",
        "L" => ",,",
        _ => ",",
    };
    format!("${{{}{}}}", &caps[2], op)
}

/// `${(U)var}` → `${var^^}` and friends.
fn case_transform(text: &str) -> Option<(String, AdaptationChange)> {
    let caps = CASE_FLAG.captures(text)?;
    let original = caps[0].to_string();
    let replacement = case_replacement(&caps);

    let out = CASE_FLAG.replace_all(text, case_replacement);

    Some((
        out.into_owned(),
        AdaptationChange::new(
            ChangeKind::ParameterExpansion,
            "Converted zsh case-modification flag to a bash parameter operator",
            original,
            replacement,
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewritten(pass: Pass, text: &str) -> Option<String> {
        pass(text).map(|(out, _)| out)
    }

    #[test]
    fn test_backticks_pairs_sequentially() {
        let (out, change) = backticks_to_parens("echo `date` and `whoami`").unwrap();
        assert_eq!(out, "echo $(date) and $(whoami)");
        assert_eq!(change.original, "`date`");
        assert_eq!(change.replacement, "$(date)");
        assert!(change.description.contains("2 backtick"));
    }

    #[test]
    fn test_backticks_inside_double_quotes_converted() {
        assert_eq!(
            rewritten(backticks_to_parens, "echo \"today is `date`\""),
            Some("echo \"today is $(date)\"".to_string())
        );
    }

    #[test]
    fn test_backticks_inside_single_quotes_left_alone() {
        assert_eq!(rewritten(backticks_to_parens, "echo '`literal`'"), None);
        assert_eq!(
            rewritten(backticks_to_parens, "echo '`x`' `pwd`"),
            Some("echo '`x`' $(pwd)".to_string())
        );
    }

    #[test]
    fn test_backticks_malformed_input_unchanged() {
        assert_eq!(rewritten(backticks_to_parens, "echo `date"), None);
        assert_eq!(rewritten(backticks_to_parens, "echo 'unterminated `date`"), None);
        assert_eq!(rewritten(backticks_to_parens, "echo \\`date\\`"), None);
    }

    #[test]
    fn test_array_join() {
        assert_eq!(
            rewritten(array_join, "echo ${files[*]} ${dirs[*]}"),
            Some("echo ${(j: :)files} ${(j: :)dirs}".to_string())
        );
        assert_eq!(rewritten(array_join, "echo ${files[@]}"), None);
    }

    #[test]
    fn test_echo_escape_only_exact_flag() {
        assert_eq!(rewritten(echo_escape, "echo -en \"x\""), None);
        assert_eq!(rewritten(echo_escape, "echo hello"), None);
        assert_eq!(
            rewritten(echo_escape, "echo -e a; echo -e b"),
            Some("echo a; echo b".to_string())
        );
    }

    #[test]
    fn test_echo_escape_repeated_flags_in_one_pass() {
        assert_eq!(rewritten(echo_escape, "echo -e -e x"), Some("echo x".to_string()));
        assert_eq!(rewritten(echo_escape, "echo x"), None);
    }

    #[test]
    fn test_single_quoted_literals_untouched() {
        assert_eq!(rewritten(echo_escape, "grep 'echo -e foo' script.sh"), None);
        assert_eq!(
            rewritten(echo_escape, "grep 'echo -e foo' a; echo -e bar"),
            Some("grep 'echo -e foo' a; echo bar".to_string())
        );
        assert_eq!(rewritten(array_join, "printf '%s' '${a[*]}'"), None);
        assert_eq!(rewritten(read_prompt, "echo 'read -p \"x\" y'"), None);
        assert_eq!(
            rewritten(array_join, "echo \"${a[*]}\" '${b[*]}'"),
            Some("echo \"${(j: :)a}\" '${b[*]}'".to_string())
        );
    }

    #[test]
    fn test_quote_scan_spans() {
        let scan = QuoteScan::new("a 'b c' \"it's\" 'd");
        assert_eq!(scan.single_quoted, vec![2..7, 15..17]);
        assert!(!scan.balanced);
        assert!(scan.is_literal(4));
        assert!(!scan.is_literal(10));
    }

    #[test]
    fn test_read_prompt_keeps_double_quoted_expansions() {
        assert_eq!(
            rewritten(read_prompt, "read -p \"Hi $USER: \" name"),
            Some("read \"name?Hi $USER: \"".to_string())
        );
        assert_eq!(
            rewritten(read_prompt, "read -p 'Cost $5: ' price"),
            Some("read \"price?Cost \\$5: \"".to_string())
        );
    }

    #[test]
    fn test_read_prompt_variants() {
        assert_eq!(
            rewritten(read_prompt, "read -p 'Continue? ' answer"),
            Some("read \"answer?Continue? \"".to_string())
        );
        assert_eq!(
            rewritten(read_prompt, "read -r -p \"Path: \" target"),
            Some("read -r \"target?Path: \"".to_string())
        );
        assert_eq!(
            rewritten(read_prompt, "read -p 'Say \"hi\": ' reply"),
            Some("read \"reply?Say \\\"hi\\\": \"".to_string())
        );
        assert_eq!(rewritten(read_prompt, "read -p \"unterminated name"), None);
    }

    #[test]
    fn test_pcre_directive_prefixed() {
        let (out, change) = pcre_match("[[ $x =~ ^\\d{3}$ ]] && echo ok").unwrap();
        assert_eq!(out, "setopt RE_MATCH_PCRE 2>/dev/null; [[ $x =~ ^\\d{3}$ ]] && echo ok");
        assert_eq!(change.kind, ChangeKind::RegexMatching);
        assert_eq!(change.original, "=~ ^\\d{3}$ ]]");
    }

    #[test]
    fn test_pcre_not_needed_for_posix_classes() {
        assert_eq!(rewritten(pcre_match, "[[ $x =~ ^[0-9]+$ ]]"), None);
        assert!(rewritten(pcre_match, "[[ $x =~ (?=foo) ]]").is_some());
    }

    #[test]
    fn test_case_transform() {
        assert_eq!(
            rewritten(case_transform, "echo ${(U)a} ${(u)b} ${(L)c} ${(l)d}"),
            Some("echo ${a^^} ${b^} ${c,,} ${d,}".to_string())
        );
        assert_eq!(rewritten(case_transform, "echo ${a^^}"), None);
    }
}
