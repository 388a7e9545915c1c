//! Expression parsing implementation
//!
//! Expressions are parsed from a bounded token window in two passes:
//!
//! 1. [`to_postfix`]: shunting-yard conversion of the infix window into
//!    postfix (RPN) order. Function calls are bracketed by synthetic
//!    [`PostfixItem::CallStart`] / [`PostfixItem::CallEnd`] markers and each
//!    argument is converted recursively and spliced in place.
//! 2. [`build_tree`]: evaluation of the postfix sequence that builds nodes
//!    instead of values.
//!
//! # Precedence
//!
//! | rank | operators                    | associativity |
//! |------|------------------------------|---------------|
//! | 2    | unary `-` `!` `&` `deref`    | right         |
//! | 3    | `*` `/` `%`                  | left          |
//! | 4    | `+` `-`                      | left          |
//! | 6    | `<` `<=` `>` `>=`            | left          |
//! | 7    | `==` `!=`                    | left          |
//! | 11   | `&&`                         | left          |
//! | 12   | `\|\|`                       | left          |
//! | 14   | `=` `+=` `-=` `*=` `/=` `%=` | right         |
//!
//! A lower rank binds tighter. No constant folding happens here.

use crate::parser::ast::*;
use crate::parser::lexer::{self, Token, TokenKind};
use crate::parser::parse::{ParseError, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub rank: u8,
    pub associativity: Associativity,
}

const UNARY: OperatorSpec = OperatorSpec {
    rank: 2,
    associativity: Associativity::Right,
};

/// Spec of a binary operator lexeme.
pub fn binary_spec(op: &str) -> Option<OperatorSpec> {
    let (rank, associativity) = match op {
        "*" | "/" | "%" => (3, Associativity::Left),
        "+" | "-" => (4, Associativity::Left),
        "<" | "<=" | ">" | ">=" => (6, Associativity::Left),
        "==" | "!=" => (7, Associativity::Left),
        "&&" => (11, Associativity::Left),
        "||" => (12, Associativity::Left),
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" => (14, Associativity::Right),
        _ => return None,
    };
    Some(OperatorSpec {
        rank,
        associativity,
    })
}

/// One element of the postfix sequence produced by pass 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostfixItem {
    Operand(Token),
    Unary(Token),
    Binary(Token),
    CallStart(Token),
    /// Closes one argument of the innermost call; carries the `,` or `)`
    ArgEnd(Token),
    CallEnd,
}

impl PostfixItem {
    fn label(&self) -> &str {
        match self {
            PostfixItem::Operand(t) | PostfixItem::Unary(t) | PostfixItem::Binary(t) => &t.lexeme,
            PostfixItem::CallStart(_) => "start_call",
            PostfixItem::ArgEnd(_) => "end_arg",
            PostfixItem::CallEnd => "end_call",
        }
    }
}

/// Space separated rendering of a postfix sequence, e.g. `a b c * +`.
pub fn postfix_string(items: &[PostfixItem]) -> String {
    items
        .iter()
        .map(PostfixItem::label)
        .collect::<Vec<_>>()
        .join(" ")
}

enum StackEntry {
    Operator(Token, OperatorSpec, bool),
    Paren,
}

fn is_operand(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Literal(_) | TokenKind::Identifier)
        || token.is_keyword("true")
        || token.is_keyword("false")
}

/// Prefix operators, given whether the previous token closed an operand.
fn is_prefix_operator(token: &Token, after_operand: bool) -> bool {
    if token.is_keyword("deref") {
        return true;
    }
    if token.kind != TokenKind::Operator {
        return false;
    }
    match token.lexeme.as_str() {
        "!" | "&" => true,
        "-" => !after_operand,
        _ => false,
    }
}

fn pop_operator(entry: StackEntry, output: &mut Vec<PostfixItem>) {
    if let StackEntry::Operator(token, _, unary) = entry {
        output.push(if unary {
            PostfixItem::Unary(token)
        } else {
            PostfixItem::Binary(token)
        });
    }
}

/// Pass 1: infix → postfix, bounded by the first `;` or the window end.
pub fn to_postfix(window: &[Token]) -> Result<Vec<PostfixItem>, ParseError> {
    let end = window
        .iter()
        .position(|t| t.is_delimiter(";") || t.is_eof())
        .unwrap_or(window.len());
    let window = &window[..end];

    let mut output = Vec::new();
    let mut stack: Vec<StackEntry> = Vec::new();
    let mut after_operand = false;
    let mut i = 0;

    while i < window.len() {
        let token = &window[i];

        if token.is_identifier() && window.get(i + 1).is_some_and(|t| t.is_delimiter("(")) {
            if after_operand {
                return Err(ParseError::at(
                    token,
                    format!("Expected operator between operands, found {}", token),
                ));
            }
            i = call_to_postfix(window, i, &mut output)?;
            after_operand = true;
            continue;
        }

        if is_operand(token) {
            if after_operand {
                return Err(ParseError::at(
                    token,
                    format!("Expected operator between operands, found {}", token),
                ));
            }
            output.push(PostfixItem::Operand(token.clone()));
            after_operand = true;
        } else if is_prefix_operator(token, after_operand) {
            if after_operand {
                return Err(ParseError::at(
                    token,
                    format!("Expected operator between operands, found {}", token),
                ));
            }
            stack.push(StackEntry::Operator(token.clone(), UNARY, true));
        } else if let Some(spec) = binary_spec(&token.lexeme).filter(|_| token.kind == TokenKind::Operator) {
            if !after_operand {
                return Err(ParseError::at(
                    token,
                    format!("Expected operand before {}", token),
                ));
            }
            while let Some(StackEntry::Operator(_, top, _)) = stack.last() {
                let pops = match spec.associativity {
                    Associativity::Left => top.rank <= spec.rank,
                    Associativity::Right => top.rank < spec.rank,
                };
                if !pops {
                    break;
                }
                if let Some(entry) = stack.pop() {
                    pop_operator(entry, &mut output);
                }
            }
            stack.push(StackEntry::Operator(token.clone(), spec, false));
            after_operand = false;
        } else if token.is_delimiter("(") {
            if after_operand {
                return Err(ParseError::at(
                    token,
                    format!("Expected operator before {}", token),
                ));
            }
            stack.push(StackEntry::Paren);
            after_operand = false;
        } else if token.is_delimiter(")") {
            if !after_operand {
                return Err(ParseError::at(
                    token,
                    format!("Expected operand before {}", token),
                ));
            }
            loop {
                match stack.pop() {
                    Some(StackEntry::Paren) => break,
                    Some(entry) => pop_operator(entry, &mut output),
                    None => return Err(ParseError::at(token, "Unmatched ')' in expression")),
                }
            }
            after_operand = true;
        } else {
            return Err(ParseError::at(
                token,
                format!("Unexpected {} in expression", token),
            ));
        }

        i += 1;
    }

    if let Some(last) = window.last().filter(|_| !after_operand) {
        return Err(ParseError::at(
            last,
            format!("Expected operand after {}", last),
        ));
    }

    // Leftover '(' entries are implicitly closed.
    while let Some(entry) = stack.pop() {
        pop_operator(entry, &mut output);
    }

    Ok(output)
}

/// Emit the call frame starting at the callee `window[start]`; returns the
/// index after the closing `)`.
fn call_to_postfix(
    window: &[Token],
    start: usize,
    output: &mut Vec<PostfixItem>,
) -> Result<usize, ParseError> {
    let callee = &window[start];
    output.push(PostfixItem::CallStart(callee.clone()));
    output.push(PostfixItem::Operand(callee.clone()));

    let mut depth = 1usize;
    let mut arg_start = start + 2;
    let mut i = arg_start;
    let mut close = None;

    while i < window.len() {
        let token = &window[i];
        if token.is_delimiter("(") {
            depth += 1;
        } else if token.is_delimiter(")") {
            depth -= 1;
            if depth == 0 {
                close = Some(i);
                break;
            }
        } else if token.is_delimiter(",") && depth == 1 {
            let arg = &window[arg_start..i];
            if arg.is_empty() {
                return Err(ParseError::at(token, "Expected argument before ','"));
            }
            output.extend(to_postfix(arg)?);
            output.push(PostfixItem::ArgEnd(token.clone()));
            arg_start = i + 1;
        }
        i += 1;
    }

    let Some(close) = close else {
        return Err(ParseError::at(
            callee,
            format!("Expected ')' to close call to '{}'", callee.lexeme),
        ));
    };

    // trailing argument (no comma after it)
    let last = &window[arg_start..close];
    if !last.is_empty() {
        output.extend(to_postfix(last)?);
        output.push(PostfixItem::ArgEnd(window[close].clone()));
    } else if arg_start > start + 2 {
        return Err(ParseError::at(&window[close], "Expected argument before ')'"));
    }

    output.push(PostfixItem::CallEnd);
    Ok(close + 1)
}

/// Leaf node kind for an operand token.
fn leaf_kind(token: &Token) -> Option<NodeKind> {
    match token.kind {
        TokenKind::Literal(lexer::LiteralKind::Number) => Some(NodeKind::Literal(LiteralKind::Number)),
        TokenKind::Literal(lexer::LiteralKind::String) => Some(NodeKind::Literal(LiteralKind::String)),
        TokenKind::Literal(lexer::LiteralKind::Char) => Some(NodeKind::Literal(LiteralKind::Char)),
        TokenKind::Keyword if token.lexeme == "true" || token.lexeme == "false" => {
            Some(NodeKind::Literal(LiteralKind::Boolean))
        }
        TokenKind::Identifier => Some(NodeKind::Identifier),
        _ => None,
    }
}

/// Open call while building: where the callee sits on the stack and where
/// the argument being built starts.
struct CallFrame {
    base: usize,
    arg_floor: usize,
}

/// Pass 2: postfix → detached expression trees, in output order.
///
/// Operators only take operands from the argument they belong to; every
/// argument must reduce to exactly one node.
pub fn build_tree(ast: &mut Ast, items: &[PostfixItem]) -> Result<Vec<NodeId>, ParseError> {
    let mut stack: Vec<NodeId> = Vec::new();
    let mut frames: Vec<CallFrame> = Vec::new();

    for item in items {
        match item {
            PostfixItem::Operand(token) => {
                let kind = leaf_kind(token).ok_or_else(|| {
                    ParseError::at(token, format!("Unexpected {} in expression", token))
                })?;
                stack.push(ast.add_node(kind, token.lexeme.clone(), token.location));
            }
            PostfixItem::Unary(token) => {
                let floor = frames.last().map_or(0, |f| f.arg_floor);
                if stack.len() <= floor {
                    return Err(ParseError::at(
                        token,
                        format!("Missing operand for {}", token),
                    ));
                }
                let operand = stack.pop().unwrap_or_default();
                let node = ast.add_node(NodeKind::Operator, token.lexeme.clone(), token.location);
                ast.reparent(operand, node);
                stack.push(node);
            }
            PostfixItem::Binary(token) => {
                let floor = frames.last().map_or(0, |f| f.arg_floor);
                if stack.len() < floor + 2 {
                    return Err(ParseError::at(
                        token,
                        format!("Missing operand for {}", token),
                    ));
                }
                let rhs = stack.pop().unwrap_or_default();
                let lhs = stack.pop().unwrap_or_default();
                let node = ast.add_node(NodeKind::Operator, token.lexeme.clone(), token.location);
                ast.reparent(lhs, node);
                ast.reparent(rhs, node);
                stack.push(node);
            }
            PostfixItem::CallStart(_) => frames.push(CallFrame {
                base: stack.len(),
                arg_floor: stack.len() + 1,
            }),
            PostfixItem::ArgEnd(token) => {
                let Some(frame) = frames.last_mut() else {
                    return Err(ParseError::at(token, format!("Unexpected {} in expression", token)));
                };
                if stack.len() != frame.arg_floor + 1 {
                    return Err(ParseError::at(
                        token,
                        format!("Expected one expression per argument before {}", token),
                    ));
                }
                frame.arg_floor += 1;
            }
            PostfixItem::CallEnd => {
                let Some(frame) = frames.pop() else {
                    continue;
                };
                if stack.len() != frame.arg_floor {
                    let callee = stack.get(frame.base).copied().unwrap_or_default();
                    return Err(ParseError {
                        message: "Unterminated argument in call".to_string(),
                        lexeme: ast.content(callee).to_string(),
                        location: ast.location(callee),
                        kind: TokenKind::Identifier,
                    });
                }
                let mut frame = stack.split_off(frame.base).into_iter();
                let Some(callee) = frame.next() else {
                    continue;
                };
                ast.node_mut(callee).kind = NodeKind::FunctionCall;
                for arg in frame {
                    ast.reparent(arg, callee);
                }
                stack.push(callee);
            }
        }
    }

    Ok(stack)
}

impl Parser {
    /// Parse `tokens[start..end]` as one expression and reparent its root
    /// onto `owner`.
    pub(crate) fn parse_expression_into(
        &mut self,
        start: usize,
        end: usize,
        owner: NodeId,
    ) -> Result<NodeId, ParseError> {
        let window = &self.tokens[start..end];
        let anchor = self.tokens[end.min(self.tokens.len() - 1)].clone();
        if window.is_empty() {
            return Err(ParseError::at(
                &anchor,
                format!("Expected expression, found {}", anchor),
            ));
        }

        let postfix = to_postfix(window)?;
        let roots = build_tree(&mut self.ast, &postfix)?;

        match roots.as_slice() {
            [root] => {
                self.ast.reparent(*root, owner);
                Ok(*root)
            }
            [] => Err(ParseError::at(
                &window[0],
                format!("Expected expression, found {}", window[0]),
            )),
            [_, extra, ..] => {
                let location = self.ast.location(*extra);
                let token = window
                    .iter()
                    .find(|t| t.location == location)
                    .unwrap_or(&window[0]);
                Err(ParseError::at(
                    token,
                    format!("Expected operator between operands, found {}", token),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::analyze;

    fn postfix(source: &str) -> String {
        postfix_string(&to_postfix(&analyze(source)).unwrap())
    }

    fn tree(source: &str) -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let items = to_postfix(&analyze(source)).unwrap();
        let roots = build_tree(&mut ast, &items).unwrap();
        assert_eq!(roots.len(), 1);
        (ast, roots[0])
    }

    /// Fully parenthesized rendering of a tree
    fn render(ast: &Ast, id: NodeId) -> String {
        let children = ast.children(id);
        match (ast.kind(id), children.len()) {
            (NodeKind::FunctionCall, _) => {
                let args: Vec<String> = children.iter().map(|&c| render(ast, c)).collect();
                format!("{}({})", ast.content(id), args.join(", "))
            }
            (NodeKind::Operator, 1) => format!("({}{})", ast.content(id), render(ast, children[0])),
            (NodeKind::Operator, 2) => format!(
                "({} {} {})",
                render(ast, children[0]),
                ast.content(id),
                render(ast, children[1])
            ),
            _ => ast.content(id).to_string(),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(postfix("a+b*c"), "a b c * +");
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        assert_eq!(postfix("(a+b)*c"), "a b + c *");
        assert_ne!(postfix("(a+b)*c"), postfix("a+b*c"));
    }

    #[test]
    fn test_left_associative_subtraction() {
        let (ast, root) = tree("a - b - c");
        assert_eq!(render(&ast, root), "((a - b) - c)");
    }

    #[test]
    fn test_right_associative_assignment() {
        assert_eq!(postfix("a = b = c"), "a b c = =");
        let (ast, root) = tree("a = b = 1 + 2");
        assert_eq!(render(&ast, root), "(a = (b = (1 + 2)))");
    }

    #[test]
    fn test_unary_operators() {
        let (ast, root) = tree("-a * !b");
        assert_eq!(render(&ast, root), "((-a) * (!b))");

        let (ast, root) = tree("deref p + 1");
        assert_eq!(render(&ast, root), "((derefp) + 1)");

        let (ast, root) = tree("a - -b");
        assert_eq!(render(&ast, root), "(a - (-b))");
    }

    #[test]
    fn test_call_with_three_arguments() {
        let (ast, root) = tree("f(1,2,3)");

        assert_eq!(ast.kind(root), NodeKind::FunctionCall);
        assert_eq!(ast.content(root), "f");
        let args: Vec<&str> = ast.children(root).iter().map(|&c| ast.content(c)).collect();
        assert_eq!(args, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_call_markers_in_postfix() {
        assert_eq!(
            postfix("f(a, b+c)"),
            "start_call f a end_arg b c + end_arg end_call"
        );
        assert_eq!(postfix("g()"), "start_call g end_call");
    }

    #[test]
    fn test_nested_calls_split_only_top_level_commas() {
        let (ast, root) = tree("f(g(1, 2), (3 + 4) * h(), 5) + 1");
        assert_eq!(render(&ast, root), "(f(g(1, 2), ((3 + 4) * h()), 5) + 1)");
    }

    #[test]
    fn test_unmatched_open_paren_is_implicitly_closed() {
        let (ast, root) = tree("(a + b * (c");
        assert_eq!(render(&ast, root), "(a + (b * c))");
    }

    #[test]
    fn test_unmatched_close_paren_is_error() {
        let err = to_postfix(&analyze("a + b)")).unwrap_err();
        assert_eq!(err.lexeme, ")");
    }

    #[test]
    fn test_window_stops_at_semicolon() {
        assert_eq!(postfix("a + 1; b * 2"), "a 1 +");
    }

    #[test]
    fn test_no_constant_folding() {
        let (ast, root) = tree("x / 0");
        assert_eq!(render(&ast, root), "(x / 0)");
        assert_eq!(ast.kind(ast.children(root)[1]), NodeKind::Literal(LiteralKind::Number));
    }

    #[test]
    fn test_literal_leaf_kinds() {
        let (ast, root) = tree("f(\"s\", 'c', true, 7, x)");
        let kinds: Vec<NodeKind> = ast.children(root).iter().map(|&c| ast.kind(c)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Literal(LiteralKind::String),
                NodeKind::Literal(LiteralKind::Char),
                NodeKind::Literal(LiteralKind::Boolean),
                NodeKind::Literal(LiteralKind::Number),
                NodeKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(to_postfix(&analyze("a b")).is_err());
        assert!(to_postfix(&analyze("* a")).is_err());
        assert!(to_postfix(&analyze("f(1,,2)")).is_err());
        assert!(to_postfix(&analyze("f(1,)")).is_err());
        assert!(to_postfix(&analyze("f(1")).is_err());

        assert!(to_postfix(&analyze("a +")).is_err());
        assert!(to_postfix(&analyze("(-)")).is_err());
        assert!(to_postfix(&analyze("1 (2)")).is_err());
        assert!(to_postfix(&analyze("1 f(2)")).is_err());
    }

    #[test]
    fn test_dangling_operator_inside_call_is_error() {
        let err = to_postfix(&analyze("print(1, 2 +)")).unwrap_err();
        assert_eq!(err.lexeme, "+");
        assert!(err.message.starts_with("Expected operand"), "{}", err.message);

        let err = to_postfix(&analyze("f(1, -)")).unwrap_err();
        assert_eq!(err.lexeme, "-");

        let err = to_postfix(&analyze("a (b -)")).unwrap_err();
        assert_eq!(err.lexeme, "-");
    }

    #[test]
    fn test_operators_stay_inside_their_argument() {
        let tokens = analyze("f 1 2 +");
        let mut ast = Ast::new();

        // `+` closes the second argument but only has one operand there
        let items = vec![
            PostfixItem::CallStart(tokens[0].clone()),
            PostfixItem::Operand(tokens[0].clone()),
            PostfixItem::Operand(tokens[1].clone()),
            PostfixItem::ArgEnd(tokens[1].clone()),
            PostfixItem::Operand(tokens[2].clone()),
            PostfixItem::Binary(tokens[3].clone()),
            PostfixItem::ArgEnd(tokens[3].clone()),
            PostfixItem::CallEnd,
        ];
        let err = build_tree(&mut ast, &items).unwrap_err();
        assert_eq!(err.lexeme, "+");

        // a unary operator cannot swallow the callee
        let items = vec![
            PostfixItem::CallStart(tokens[0].clone()),
            PostfixItem::Operand(tokens[0].clone()),
            PostfixItem::Unary(tokens[3].clone()),
            PostfixItem::CallEnd,
        ];
        assert!(build_tree(&mut ast, &items).is_err());

        let items = vec![
            PostfixItem::Operand(tokens[1].clone()),
            PostfixItem::Binary(tokens[3].clone()),
        ];
        assert!(build_tree(&mut ast, &items).is_err());
    }
}
