//! Optimizer phase (§4.4): AST-to-AST constant folding and dead-branch
//! elimination. Runs after parsing, before compilation; the Compiler never
//! needs to know whether it's looking at optimized or raw AST, since the
//! shapes are identical (just flatter).

use gos_ast::ops::{apply_binop, apply_unary};
use gos_ast::Node;
use gos_lex::{PrimValue, TokenKind};

/// Folds constant subexpressions and prunes statically-resolved branches in
/// `node`, returning the optimized tree.
pub fn optimize(node: Node) -> Node {
    fold(node)
}

fn fold(node: Node) -> Node {
    match node {
        Node::Program { body } => Node::Program { body: fold_seq(body) },
        Node::Stmt { body } => Node::Stmt { body: fold_seq(body) },

        Node::Val { .. } | Node::Var { .. } | Node::In { .. } | Node::Label { .. } | Node::Goto { .. } | Node::Del { .. } => node,

        Node::VarDecl { name, value } => Node::VarDecl { name, value: Box::new(fold(*value)) },
        Node::VarMod { name, value } => Node::VarMod { name, value: Box::new(fold(*value)) },
        Node::Out { value } => Node::Out { value: Box::new(fold(*value)) },
        Node::Return { value } => Node::Return { value: Box::new(fold(*value)) },
        Node::Exit { status } => Node::Exit { status: Box::new(fold(*status)) },
        Node::Eval { code } => Node::Eval { code: Box::new(fold(*code)) },

        Node::FuncDecl { name, params, body } => Node::FuncDecl { name, params, body: Box::new(fold(*body)) },
        Node::FuncCall { name, args } => Node::FuncCall { name, args: fold_seq(args) },

        Node::UnaryOp { op, argument } => fold_unary(op, fold(*argument)),
        Node::BinOp { op, left, right } => fold_binop(op, fold(*left), fold(*right)),

        Node::If { cond, body, else_branch } => fold_if(fold(*cond), *body, else_branch),
        Node::While { cond, body } => fold_while(fold(*cond), *body),
    }
}

fn fold_seq(nodes: Vec<Node>) -> Vec<Node> {
    nodes.into_iter().map(fold).collect()
}

/// Folds `op argument` when the operand resolved to a constant and `op` is
/// one of the two operators the Optimizer is allowed to fold through
/// (`apply_unary` only implements `Neg`/`Not`) — `Pos`, `Inc`, `Dec` are
/// left unfolded even over a literal operand.
fn fold_unary(op: TokenKind, argument: Node) -> Node {
    if matches!(op, TokenKind::Neg | TokenKind::Not) {
        if let Node::Val { value } = &argument {
            if let Ok(folded) = apply_unary(op, value) {
                return Node::Val { value: folded };
            }
        }
    }
    Node::UnaryOp { op, argument: Box::new(argument) }
}

/// Folds `left op right` when both sides resolved to constants. A type
/// mismatch or division by zero at fold time is left unfolded rather than
/// raised here — the Optimizer never aborts compilation, it just leaves the
/// node for the Compiler/VM to evaluate (and fail) at its normal time.
fn fold_binop(op: TokenKind, left: Node, right: Node) -> Node {
    if let (Node::Val { value: l }, Node::Val { value: r }) = (&left, &right) {
        if let Ok(folded) = apply_binop(op, l, r) {
            return Node::Val { value: folded };
        }
    }
    Node::BinOp { op, left: Box::new(left), right: Box::new(right) }
}

fn empty_block() -> Node {
    Node::Stmt { body: Vec::new() }
}

fn fold_if(cond: Node, body: Node, else_branch: Option<Box<Node>>) -> Node {
    if let Node::Val { value } = &cond {
        return if value.is_truthy() {
            fold(body)
        } else {
            match else_branch {
                Some(else_body) => fold(*else_body),
                None => empty_block(),
            }
        };
    }
    Node::If {
        cond: Box::new(cond),
        body: Box::new(fold(body)),
        else_branch: else_branch.map(|b| Box::new(fold(*b))),
    }
}

fn fold_while(cond: Node, body: Node) -> Node {
    if let Node::Val { value } = &cond {
        if !value.is_truthy() {
            return empty_block();
        }
    }
    Node::While { cond: Box::new(cond), body: Box::new(fold(body)) }
}
