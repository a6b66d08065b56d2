use ahash::AHashMap;
use gos_ast::ops::{apply_binop, apply_pos, apply_step, apply_unary};
use gos_ast::Node;
use gos_lex::{PrimValue, TokenKind};

use crate::error::{TwiError, TwiResult};
use crate::io::{parse_input_line, Io};

/// Outcome of interpreting a whole program. Unlike `gos_vm::VmOutcome`,
/// `Completed` carries the value of the program's last top-level
/// expression — the VM discards that value (scripts communicate through
/// `out`, not a return value), but `eval` needs it: an evaluated string is
/// itself a nested program, and `eval`'s result is always produced by
/// running it through this interpreter rather than the VM (§6: eval has no
/// sandboxing or special-cased fast path, so there's no reason for it to
/// special-case which executor runs it either).
#[derive(Debug, Clone, PartialEq)]
pub enum TwiOutcome {
    Completed(PrimValue),
    Exited(PrimValue),
}

/// What a node's evaluation produced: either a plain value, or one of the
/// three ways control can leave the statement sequence that's executing it.
/// Every `eval_node` call returns this; only call sites that need a plain
/// operand (an operator's operand, a condition, a call argument) unwrap it
/// with `eval_value`, which is also where a stray `return`/`exit`/`goto`
/// surfacing inside an expression position turns into an error.
enum Flow {
    Value(PrimValue),
    Return(PrimValue),
    Exit(PrimValue),
    Goto(String),
}

type Scope = AHashMap<String, PrimValue>;

struct FunctionEntry<'ast> {
    params: &'ast [String],
    body: &'ast Node,
}

/// Tree-walking reference interpreter (§1, §8). Runs directly over the AST
/// and shares `gos_ast::ops` with the Optimizer and the Compiler/VM, which
/// is what makes "folds to the same value the VM computes at runtime" a
/// structural property rather than a convention kept in sync by hand.
pub struct Interpreter<'ast, IO: Io> {
    functions: AHashMap<String, FunctionEntry<'ast>>,
    io: IO,
    eval_hook: Option<Box<dyn FnMut(&str) -> TwiResult<PrimValue> + 'ast>>,
}

impl<'ast, IO: Io> Interpreter<'ast, IO> {
    pub fn new(program: &'ast Node, io: IO) -> TwiResult<Self> {
        let mut functions = AHashMap::default();
        hoist(program, &mut functions)?;
        Ok(Interpreter { functions, io, eval_hook: None })
    }

    pub fn with_eval_hook(mut self, hook: impl FnMut(&str) -> TwiResult<PrimValue> + 'ast) -> Self {
        self.eval_hook = Some(Box::new(hook));
        self
    }

    pub fn into_io(self) -> IO {
        self.io
    }

    pub fn run(&mut self, program: &'ast Node) -> TwiResult<TwiOutcome> {
        let mut scopes = vec![Scope::default()];
        match self.eval_node(program, &mut scopes)? {
            Flow::Exit(v) => Ok(TwiOutcome::Exited(v)),
            Flow::Value(v) | Flow::Return(v) => Ok(TwiOutcome::Completed(v)),
            Flow::Goto(label) => Err(TwiError::UndefinedLabel(label)),
        }
    }

    fn eval_value(&mut self, node: &'ast Node, scopes: &mut Vec<Scope>) -> TwiResult<PrimValue> {
        match self.eval_node(node, scopes)? {
            Flow::Value(v) => Ok(v),
            _ => Err(TwiError::UnexpectedControlFlow),
        }
    }

    fn eval_seq(&mut self, body: &'ast [Node], scopes: &mut Vec<Scope>) -> TwiResult<Flow> {
        let mut i = 0;
        let mut last = Flow::Value(PrimValue::Unit);
        while i < body.len() {
            match self.eval_node(&body[i], scopes)? {
                Flow::Goto(label) => match body.iter().position(|n| matches!(n, Node::Label { name } if *name == label)) {
                    Some(pos) => {
                        i = pos + 1;
                        last = Flow::Value(PrimValue::Unit);
                    }
                    None => return Ok(Flow::Goto(label)),
                },
                other @ (Flow::Return(_) | Flow::Exit(_)) => return Ok(other),
                Flow::Value(v) => {
                    last = Flow::Value(v);
                    i += 1;
                }
            }
        }
        Ok(last)
    }

    fn eval_node(&mut self, node: &'ast Node, scopes: &mut Vec<Scope>) -> TwiResult<Flow> {
        match node {
            Node::Program { body } => {
                scopes.push(Scope::default());
                let result = self.eval_seq(body, scopes);
                scopes.pop();
                result
            }
            Node::Stmt { body } => {
                scopes.push(Scope::default());
                let result = self.eval_seq(body, scopes);
                scopes.pop();
                result
            }

            Node::Val { value } => Ok(Flow::Value(value.clone())),
            Node::Var { name } => lookup(scopes, name).map(Flow::Value),

            Node::VarDecl { name, value } => {
                let v = self.eval_value(value, scopes)?;
                scopes.last_mut().expect("at least one scope").insert(name.clone(), v);
                Ok(Flow::Value(PrimValue::Unit))
            }
            Node::VarMod { name, value } => {
                let v = self.eval_value(value, scopes)?;
                assign(scopes, name, v.clone())?;
                Ok(Flow::Value(v))
            }

            Node::BinOp { op, left, right } => {
                let l = self.eval_value(left, scopes)?;
                let r = self.eval_value(right, scopes)?;
                Ok(Flow::Value(apply_binop(*op, &l, &r)?))
            }
            Node::UnaryOp { op, argument } => self.eval_unary(*op, argument, scopes),

            Node::Out { value } => {
                let v = self.eval_value(value, scopes)?;
                self.io.write_out(&v);
                Ok(Flow::Value(PrimValue::Unit))
            }
            Node::In { name } => {
                let v = self.io.read_in().map(|line| parse_input_line(&line)).unwrap_or(PrimValue::Unit);
                assign(scopes, name, v.clone())?;
                Ok(Flow::Value(v))
            }

            Node::If { cond, body, else_branch } => {
                let c = self.eval_value(cond, scopes)?;
                if c.is_truthy() {
                    self.eval_node(body, scopes)
                } else {
                    match else_branch {
                        Some(e) => self.eval_node(e, scopes),
                        None => Ok(Flow::Value(PrimValue::Unit)),
                    }
                }
            }
            Node::While { cond, body } => loop {
                let c = self.eval_value(cond, scopes)?;
                if !c.is_truthy() {
                    return Ok(Flow::Value(PrimValue::Unit));
                }
                match self.eval_node(body, scopes)? {
                    Flow::Value(_) => {}
                    other => return Ok(other),
                }
            },

            Node::FuncDecl { .. } => Ok(Flow::Value(PrimValue::Unit)),
            Node::FuncCall { name, args } => self.eval_call(name, args, scopes),

            Node::Return { value } => Ok(Flow::Return(self.eval_value(value, scopes)?)),
            Node::Exit { status } => Ok(Flow::Exit(self.eval_value(status, scopes)?)),
            Node::Eval { code } => {
                let v = self.eval_value(code, scopes)?;
                let PrimValue::Str(src) = v else {
                    return Err(TwiError::EvalRequiresString);
                };
                let hook = self.eval_hook.as_mut().ok_or(TwiError::EvalUnsupported)?;
                Ok(Flow::Value(hook(&src)?))
            }

            Node::Label { .. } => Ok(Flow::Value(PrimValue::Unit)),
            Node::Goto { name } => Ok(Flow::Goto(name.clone())),
            Node::Del { name } => {
                for scope in scopes.iter_mut().rev() {
                    if scope.remove(name).is_some() {
                        break;
                    }
                }
                Ok(Flow::Value(PrimValue::Unit))
            }
        }
    }

    fn eval_unary(&mut self, op: TokenKind, argument: &'ast Node, scopes: &mut Vec<Scope>) -> TwiResult<Flow> {
        match op {
            TokenKind::Neg | TokenKind::Not => {
                let v = self.eval_value(argument, scopes)?;
                Ok(Flow::Value(apply_unary(op, &v)?))
            }
            TokenKind::Pos => {
                let v = self.eval_value(argument, scopes)?;
                Ok(Flow::Value(apply_pos(&v)))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let Node::Var { name } = argument else {
                    return Err(TwiError::InvalidIncDecOperand);
                };
                let cur = lookup(scopes, name)?;
                let delta = if op == TokenKind::Inc { 1.0 } else { -1.0 };
                let updated = apply_step(op, &cur, delta)?;
                assign(scopes, name, updated.clone())?;
                Ok(Flow::Value(updated))
            }
            _ => Err(TwiError::UnexpectedControlFlow),
        }
    }

    fn eval_call(&mut self, name: &str, args: &'ast [Node], scopes: &mut Vec<Scope>) -> TwiResult<Flow> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_value(arg, scopes)?);
        }
        let entry = self.functions.get(name).ok_or_else(|| TwiError::UndefinedFunction(name.to_owned()))?;
        if entry.params.len() != values.len() {
            return Err(TwiError::ArityMismatch { name: name.to_owned(), expected: entry.params.len(), found: values.len() });
        }
        let mut call_scope = Scope::default();
        for (param, value) in entry.params.iter().zip(values) {
            call_scope.insert(param.clone(), value);
        }
        // A call starts a fresh scope stack: no access to the caller's
        // locals (§9: no closures).
        let mut call_scopes = vec![call_scope];
        let body = entry.body;
        match self.eval_node(body, &mut call_scopes)? {
            Flow::Return(v) | Flow::Value(v) => Ok(Flow::Value(v)),
            Flow::Exit(v) => Ok(Flow::Exit(v)),
            Flow::Goto(label) => Err(TwiError::UndefinedLabel(label)),
        }
    }
}

fn lookup(scopes: &[Scope], name: &str) -> TwiResult<PrimValue> {
    scopes.iter().rev().find_map(|s| s.get(name).cloned()).ok_or_else(|| TwiError::UndefinedVariable(name.to_owned()))
}

fn assign(scopes: &mut [Scope], name: &str, value: PrimValue) -> TwiResult<()> {
    for scope in scopes.iter_mut().rev() {
        if let Some(slot) = scope.get_mut(name) {
            *slot = value;
            return Ok(());
        }
    }
    Err(TwiError::UndefinedVariable(name.to_owned()))
}

fn hoist<'ast>(node: &'ast Node, out: &mut AHashMap<String, FunctionEntry<'ast>>) -> TwiResult<()> {
    match node {
        Node::FuncDecl { name, params, body } => {
            if out.contains_key(name) {
                return Err(TwiError::DuplicateFunction(name.clone()));
            }
            out.insert(name.clone(), FunctionEntry { params: params.as_slice(), body });
            hoist(body, out)
        }
        Node::Program { body } | Node::Stmt { body } => body.iter().try_for_each(|n| hoist(n, out)),
        Node::If { cond, body, else_branch } => {
            hoist(cond, out)?;
            hoist(body, out)?;
            if let Some(e) = else_branch {
                hoist(e, out)?;
            }
            Ok(())
        }
        Node::While { cond, body } => {
            hoist(cond, out)?;
            hoist(body, out)
        }
        Node::VarDecl { value, .. } | Node::VarMod { value, .. } => hoist(value, out),
        Node::BinOp { left, right, .. } => {
            hoist(left, out)?;
            hoist(right, out)
        }
        Node::UnaryOp { argument, .. } => hoist(argument, out),
        Node::Out { value } | Node::Return { value } => hoist(value, out),
        Node::Exit { status } => hoist(status, out),
        Node::Eval { code } => hoist(code, out),
        Node::FuncCall { args, .. } => args.iter().try_for_each(|n| hoist(n, out)),
        Node::Val { .. } | Node::Var { .. } | Node::In { .. } | Node::Label { .. } | Node::Goto { .. } | Node::Del { .. } => Ok(()),
    }
}
