//! Usage-fact extraction — a best-effort heuristic pass over statement text.
//!
//! This is deliberately not an expression parser. Statement text is split by
//! a fixed delimiter set, language keywords are filtered, and the remaining
//! identifier-like atoms are classified positionally: a dotted chain followed
//! by `(` is a method candidate, a chain after `new` is a constructor
//! candidate, a dotted chain without a call is a field/property candidate,
//! and a bare identifier is a same-type field/property candidate. Candidates
//! are raw strings; resolution happens later and is allowed to miss.

/// Raw usage candidates extracted from one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageFacts {
    pub fields_and_properties: Vec<String>,
    pub constructors: Vec<String>,
    pub methods: Vec<String>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Dot,
    OpenParen,
    Other,
}

/// C# keywords and contextual keywords that never become usage candidates.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "base", "break", "case", "catch",
    "checked", "class", "const", "continue", "default", "delegate", "do",
    "else", "enum", "event", "explicit", "extern", "false", "finally",
    "fixed", "for", "foreach", "get", "goto", "if", "implicit", "in",
    "interface", "internal", "is", "lock", "nameof", "namespace", "new",
    "null", "operator", "out", "override", "params", "private", "protected",
    "public", "readonly", "ref", "return", "sealed", "set", "sizeof",
    "stackalloc", "static", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "unchecked", "unsafe", "using", "value", "virtual",
    "volatile", "when", "where", "while", "yield",
];

/// Built-in type names; they head declarations but are never link targets.
const PRIMITIVES: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "dynamic", "float", "int",
    "long", "object", "sbyte", "short", "string", "uint", "ulong", "ushort",
    "var", "void",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_primitive(word: &str) -> bool {
    PRIMITIVES.contains(&word)
}

/// Extract usage candidates from one statement's literal text.
pub fn extract(text: &str) -> UsageFacts {
    let tokens = tokenize(text);
    let mut facts = classify(&tokens);
    dedup_preserving_order(&mut facts.fields_and_properties);
    dedup_preserving_order(&mut facts.constructors);
    dedup_preserving_order(&mut facts.methods);
    dedup_preserving_order(&mut facts.types);
    facts
}

fn dedup_preserving_order(list: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    list.retain(|item| seen.insert(item.clone()));
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '"' {
            // String literal: skip to the closing quote, honoring escapes.
            i += 1;
            while i < bytes.len() {
                if bytes[i] == '\\' {
                    i += 2;
                } else if bytes[i] == '"' {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
        } else if c == '\'' {
            i += 1;
            while i < bytes.len() {
                if bytes[i] == '\\' {
                    i += 2;
                } else if bytes[i] == '\'' {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
        } else if c.is_ascii_digit() {
            // Numeric literal, including a fractional part. Consuming the
            // dot here keeps `1.5` from reading as member access.
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == '_') {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == '.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                    i += 1;
                }
            }
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_alphanumeric() || bytes[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(bytes[start..i].iter().collect()));
        } else {
            tokens.push(match c {
                '.' => Token::Dot,
                '(' => Token::OpenParen,
                _ => Token::Other,
            });
            i += 1;
        }
    }
    tokens
}

fn classify(tokens: &[Token]) -> UsageFacts {
    let mut facts = UsageFacts::default();
    let mut i = 0;
    let mut pending_new = false;
    let mut pending_decl_head = false;

    while i < tokens.len() {
        let Token::Ident(first) = &tokens[i] else {
            if !matches!(tokens[i], Token::Dot) {
                pending_new = false;
            }
            i += 1;
            continue;
        };

        // A chain only starts on an identifier not preceded by a dot;
        // `foo().Bar` leaves `.Bar` unclassifiable and it is skipped.
        if i > 0 && tokens[i - 1] == Token::Dot {
            i += 1;
            continue;
        }

        let (mut segments, end) = collect_chain(tokens, i, first);
        i = end;

        // `this.` and `base.` prefixes reduce to same-type access.
        while segments
            .first()
            .is_some_and(|s| s == "this" || s == "base")
        {
            segments.remove(0);
        }

        if segments.is_empty() {
            continue;
        }

        if segments.len() == 1 && is_keyword(&segments[0]) {
            pending_new = segments[0] == "new";
            pending_decl_head = is_primitive(&segments[0]);
            continue;
        }
        if segments.len() == 1 && is_primitive(&segments[0]) {
            pending_decl_head = true;
            pending_new = false;
            continue;
        }
        if segments.iter().any(|s| is_keyword(s) || is_primitive(s)) {
            pending_new = false;
            pending_decl_head = false;
            continue;
        }

        let called = matches!(tokens.get(i), Some(Token::OpenParen));
        let decl_name_follows = matches!(tokens.get(i), Some(Token::Ident(_)));

        if pending_new {
            facts.types.push(segments.join("."));
            if called {
                facts.constructors.push(segments.join("."));
            }
            pending_new = false;
        } else if pending_decl_head {
            // The identifier after a primitive head is the declared name.
            pending_decl_head = false;
        } else if called {
            facts.methods.push(candidate(&segments));
        } else if decl_name_follows {
            // `Foo bar` — a declaration: the head is a type reference and
            // the following identifier is a binding, not a usage.
            facts.types.push(segments.join("."));
            let Token::Ident(next) = &tokens[i] else {
                unreachable!()
            };
            let (_, end) = collect_chain(tokens, i, next);
            i = end;
        } else {
            facts.fields_and_properties.push(candidate(&segments));
        }
    }

    facts
}

/// Collect a dot-joined identifier chain starting at `start`. Returns the
/// segments and the index just past the chain.
fn collect_chain(tokens: &[Token], start: usize, first: &str) -> (Vec<String>, usize) {
    let mut segments = vec![first.to_string()];
    let mut i = start + 1;
    while i + 1 < tokens.len() {
        let (Token::Dot, Token::Ident(next)) = (&tokens[i], &tokens[i + 1]) else {
            break;
        };
        segments.push(next.clone());
        i += 2;
    }
    (segments, i)
}

/// Reduce a chain to the two-atom candidate form `receiver.member`, or the
/// bare atom for one-segment chains.
fn candidate(segments: &[String]) -> String {
    match segments {
        [single] => single.clone(),
        [first, second, ..] => format!("{first}.{second}"),
        [] => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifiers_become_field_candidates() {
        let facts = extract("return x + y;");
        assert_eq!(facts.fields_and_properties, vec!["x", "y"]);
        assert!(facts.methods.is_empty());
        assert!(facts.types.is_empty());
    }

    #[test]
    fn dotted_call_becomes_method_candidate() {
        let facts = extract("logger.Write(message);");
        assert_eq!(facts.methods, vec!["logger.Write"]);
        assert_eq!(facts.fields_and_properties, vec!["message"]);
    }

    #[test]
    fn new_expression_yields_constructor_and_type() {
        let facts = extract("var user = new User(name);");
        assert_eq!(facts.constructors, vec!["User"]);
        assert_eq!(facts.types, vec!["User"]);
        assert_eq!(facts.fields_and_properties, vec!["name"]);
    }

    #[test]
    fn this_prefix_reduces_to_same_type_access() {
        let facts = extract("this.count = limit;");
        assert_eq!(facts.fields_and_properties, vec!["count", "limit"]);
    }

    #[test]
    fn declaration_head_is_a_type_reference_not_a_usage() {
        let facts = extract("Order order = repository.Find(id);");
        assert_eq!(facts.types, vec!["Order"]);
        assert_eq!(facts.methods, vec!["repository.Find"]);
        assert_eq!(facts.fields_and_properties, vec!["id"]);
    }

    #[test]
    fn primitive_declarations_produce_no_type_candidates() {
        let facts = extract("int sum = x + y;");
        assert!(facts.types.is_empty());
        assert_eq!(facts.fields_and_properties, vec!["x", "y"]);
    }

    #[test]
    fn string_literal_content_is_ignored() {
        let facts = extract("Log(\"new User(fake)\");");
        assert!(facts.constructors.is_empty());
        assert_eq!(facts.methods, vec!["Log"]);
    }

    #[test]
    fn dotted_access_without_call_is_a_field_candidate() {
        let facts = extract("return order.Total;");
        assert_eq!(facts.fields_and_properties, vec!["order.Total"]);
    }

    #[test]
    fn long_chains_reduce_to_two_atoms() {
        let facts = extract("a.b.c = d;");
        assert_eq!(facts.fields_and_properties, vec!["a.b", "d"]);
    }

    #[test]
    fn keywords_never_become_candidates() {
        let facts = extract("if (ready) { return; }");
        assert_eq!(facts.fields_and_properties, vec!["ready"]);
        assert!(facts.methods.is_empty());
    }
}
