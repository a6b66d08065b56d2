use ahash::AHashMap;
use gos_ast::Node;
use gos_bc::{Chunk, Opcode};
use gos_lex::{PrimValue, TokenKind};

use crate::error::{CompileError, CompileResult};

/// Lowers an optimized AST into a `Chunk` (§4.5).
///
/// Every node compiles to bytecode that leaves exactly one value on the
/// operand stack — this is what lets `compile_seq` treat a block's
/// statements uniformly, popping every value but the last. Nodes with no
/// natural result (`let`, `out`, a bare label, `del`) push `Unit` to keep
/// the invariant instead of being special-cased by their callers.
pub fn compile(program: &Node) -> CompileResult<Chunk> {
    let mut c = Compiler::new();
    c.hoist(program)?;
    c.compile_node(program)?;
    c.emit(Opcode::Halt);
    c.compile_hoisted_functions()?;
    if let Some(goto) = c.pending_gotos.first() {
        return Err(CompileError::UndefinedLabel(goto.0.clone()));
    }
    c.chunk.max_slot = c.funcs[0].slot_count as u16;
    Ok(c.chunk)
}

/// Converts a code-array position into the `u16` address §3 caps chunk size
/// at (65,536 bytes): every jump/call target and every local-variable slot
/// is addressed with a single byte or two, never a wider index.
fn addr(pos: usize) -> CompileResult<u16> {
    u16::try_from(pos).map_err(|_| CompileError::CodeTooLarge)
}

struct FunctionCtx {
    scopes: Vec<AHashMap<String, u8>>,
    slot_count: u8,
}

impl FunctionCtx {
    fn new() -> Self {
        FunctionCtx { scopes: vec![AHashMap::default()], slot_count: 0 }
    }

    fn push_scope(&mut self) {
        self.scopes.push(AHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) -> CompileResult<u8> {
        if self.slot_count == u8::MAX {
            return Err(CompileError::TooManyLocals);
        }
        let slot = self.slot_count;
        self.slot_count += 1;
        self.scopes.last_mut().expect("at least one scope").insert(name.to_owned(), slot);
        Ok(slot)
    }

    fn lookup(&self, name: &str) -> Option<u8> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn undeclare(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.remove(name).is_some() {
                return;
            }
        }
    }
}

struct PendingFunction {
    id: u16,
    params: Vec<String>,
    body: Node,
}

/// `(label name, byte offset of the jump's operand to patch)`.
struct PendingGoto(String, usize);

struct Compiler {
    chunk: Chunk,
    funcs: Vec<FunctionCtx>,
    function_ids: AHashMap<String, u16>,
    function_arity: AHashMap<u16, u8>,
    /// Filled in as each hoisted function is compiled (§4.5: "record
    /// function address ... in the current scope's function table"). Lives
    /// only on the Compiler, never on the serializable `Chunk`.
    function_entries: AHashMap<u16, u16>,
    pending_functions: Vec<PendingFunction>,
    /// Call sites emitted before their callee's address was known yet;
    /// patched once every hoisted function has been compiled.
    pending_calls: Vec<(u16, usize)>,
    labels: AHashMap<String, u16>,
    pending_gotos: Vec<PendingGoto>,
}

impl Compiler {
    fn new() -> Self {
        Compiler {
            chunk: Chunk::new(),
            funcs: vec![FunctionCtx::new()],
            function_ids: AHashMap::default(),
            function_arity: AHashMap::default(),
            function_entries: AHashMap::default(),
            pending_functions: Vec::new(),
            pending_calls: Vec::new(),
            labels: AHashMap::default(),
            pending_gotos: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut FunctionCtx {
        self.funcs.last_mut().expect("at least one function context")
    }

    // --- hoisting: every `fun` anywhere in the program becomes a global,
    // callable regardless of textual position (§9: functions are hoisted,
    // not closures, so there is no ordering requirement between decl and
    // call).
    fn hoist(&mut self, node: &Node) -> CompileResult<()> {
        match node {
            Node::FuncDecl { name, params, body } => {
                if self.function_ids.contains_key(name) {
                    return Err(CompileError::DuplicateFunction(name.clone()));
                }
                if params.len() > u8::MAX as usize {
                    return Err(CompileError::TooManyArgs);
                }
                let id = self.function_ids.len() as u16;
                self.function_ids.insert(name.clone(), id);
                self.function_arity.insert(id, params.len() as u8);
                self.pending_functions.push(PendingFunction { id, params: params.clone(), body: (**body).clone() });
                self.hoist(body)
            }
            Node::Program { body } | Node::Stmt { body } => body.iter().try_for_each(|n| self.hoist(n)),
            Node::If { cond, body, else_branch } => {
                self.hoist(cond)?;
                self.hoist(body)?;
                if let Some(e) = else_branch {
                    self.hoist(e)?;
                }
                Ok(())
            }
            Node::While { cond, body } => {
                self.hoist(cond)?;
                self.hoist(body)
            }
            Node::VarDecl { value, .. } | Node::VarMod { value, .. } => self.hoist(value),
            Node::BinOp { left, right, .. } => {
                self.hoist(left)?;
                self.hoist(right)
            }
            Node::UnaryOp { argument, .. } => self.hoist(argument),
            Node::Out { value } | Node::Return { value } => self.hoist(value),
            Node::Exit { status } => self.hoist(status),
            Node::Eval { code } => self.hoist(code),
            Node::FuncCall { args, .. } => args.iter().try_for_each(|n| self.hoist(n)),
            Node::Val { .. } | Node::Var { .. } | Node::In { .. } | Node::Label { .. } | Node::Goto { .. } | Node::Del { .. } => Ok(()),
        }
    }

    fn compile_hoisted_functions(&mut self) -> CompileResult<()> {
        let pending = std::mem::take(&mut self.pending_functions);
        for pf in pending {
            let entry = addr(self.chunk.len())?;
            self.function_entries.insert(pf.id, entry);
            self.funcs.push(FunctionCtx::new());
            for param in &pf.params {
                self.current().declare(param)?;
            }
            self.compile_node(&pf.body)?;
            self.emit(Opcode::Return);
            self.funcs.pop().expect("pushed above");
        }
        for (id, patch_at) in std::mem::take(&mut self.pending_calls) {
            let entry = *self.function_entries.get(&id).expect("every hoisted function gets an entry");
            self.chunk.patch_u16(patch_at, entry);
        }
        Ok(())
    }

    fn compile_node(&mut self, node: &Node) -> CompileResult<()> {
        match node {
            Node::Program { body } | Node::Stmt { body } => {
                self.current().push_scope();
                self.compile_seq(body)?;
                self.current().pop_scope();
                Ok(())
            }
            Node::Val { value } => self.push_const(value.clone()),
            Node::Var { name } => {
                let slot = self.current().lookup(name).ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.emit(Opcode::LoadVar);
                self.chunk.push_u8(slot);
                Ok(())
            }
            Node::VarDecl { name, value } => {
                self.compile_node(value)?;
                let slot = self.current().declare(name)?;
                self.emit(Opcode::StoreVar);
                self.chunk.push_u8(slot);
                self.emit(Opcode::Pop);
                self.push_const(PrimValue::Unit)
            }
            Node::VarMod { name, value } => {
                self.compile_node(value)?;
                let slot = self.current().lookup(name).ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.emit(Opcode::StoreVar);
                self.chunk.push_u8(slot);
                Ok(())
            }
            Node::BinOp { op, left, right } => {
                self.compile_node(left)?;
                self.compile_node(right)?;
                self.emit(binop_opcode(*op)?);
                Ok(())
            }
            Node::UnaryOp { op, argument } => self.compile_unary(*op, argument),
            Node::Out { value } => {
                self.compile_node(value)?;
                self.emit(Opcode::Out);
                self.push_const(PrimValue::Unit)
            }
            Node::In { name } => {
                let slot = self.current().lookup(name).ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.emit(Opcode::In);
                self.chunk.push_u8(slot);
                Ok(())
            }
            Node::If { cond, body, else_branch } => self.compile_if(cond, body, else_branch.as_deref()),
            Node::While { cond, body } => self.compile_while(cond, body),
            Node::FuncDecl { .. } => self.push_const(PrimValue::Unit),
            Node::FuncCall { name, args } => self.compile_call(name, args),
            Node::Return { value } => {
                self.compile_node(value)?;
                self.emit(Opcode::Return);
                Ok(())
            }
            Node::Exit { status } => {
                self.compile_node(status)?;
                self.emit(Opcode::Exit);
                Ok(())
            }
            Node::Eval { code } => {
                self.compile_node(code)?;
                self.emit(Opcode::Eval);
                Ok(())
            }
            Node::Label { name } => {
                let pos = addr(self.chunk.len())?;
                self.labels.insert(name.clone(), pos);
                let (resolved, unresolved): (Vec<_>, Vec<_>) = self.pending_gotos.drain(..).partition(|g| &g.0 == name);
                self.pending_gotos = unresolved;
                for g in resolved {
                    self.chunk.patch_u16(g.1, pos);
                }
                self.push_const(PrimValue::Unit)
            }
            Node::Goto { name } => {
                self.emit(Opcode::Jump);
                let patch_at = self.chunk.len();
                self.chunk.push_u16(0);
                match self.labels.get(name) {
                    Some(&target) => self.chunk.patch_u16(patch_at, target),
                    None => self.pending_gotos.push(PendingGoto(name.clone(), patch_at)),
                }
                self.push_const(PrimValue::Unit)
            }
            Node::Del { name } => {
                self.current().undeclare(name);
                self.push_const(PrimValue::Unit)
            }
        }
    }

    fn compile_seq(&mut self, body: &[Node]) -> CompileResult<()> {
        if body.is_empty() {
            return self.push_const(PrimValue::Unit);
        }
        for (i, node) in body.iter().enumerate() {
            self.compile_node(node)?;
            if i + 1 != body.len() {
                self.emit(Opcode::Pop);
            }
        }
        Ok(())
    }

    fn compile_unary(&mut self, op: TokenKind, argument: &Node) -> CompileResult<()> {
        match op {
            TokenKind::Neg => {
                self.compile_node(argument)?;
                self.emit(Opcode::Neg);
                Ok(())
            }
            TokenKind::Not => {
                self.compile_node(argument)?;
                self.emit(Opcode::Not);
                Ok(())
            }
            TokenKind::Pos => {
                self.compile_node(argument)?;
                self.emit(Opcode::Pos);
                Ok(())
            }
            TokenKind::Inc | TokenKind::Dec => {
                let Node::Var { name } = argument else {
                    return Err(CompileError::InvalidIncDecOperand);
                };
                let slot = self.current().lookup(name).ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.emit(Opcode::LoadVar);
                self.chunk.push_u8(slot);
                self.emit(if op == TokenKind::Inc { Opcode::Inc } else { Opcode::Dec });
                self.emit(Opcode::StoreVar);
                self.chunk.push_u8(slot);
                Ok(())
            }
            other => Err(CompileError::UnsupportedOperator(other)),
        }
    }

    fn compile_if(&mut self, cond: &Node, body: &Node, else_branch: Option<&Node>) -> CompileResult<()> {
        self.compile_node(cond)?;
        self.emit(Opcode::JumpIfFalse);
        let else_patch = self.chunk.len();
        self.chunk.push_u16(0);

        self.compile_node(body)?;
        self.emit(Opcode::Jump);
        let end_patch = self.chunk.len();
        self.chunk.push_u16(0);

        let else_pos = addr(self.chunk.len())?;
        self.chunk.patch_u16(else_patch, else_pos);
        match else_branch {
            Some(e) => self.compile_node(e)?,
            None => self.push_const(PrimValue::Unit)?,
        }

        let end_pos = addr(self.chunk.len())?;
        self.chunk.patch_u16(end_patch, end_pos);
        Ok(())
    }

    fn compile_while(&mut self, cond: &Node, body: &Node) -> CompileResult<()> {
        let start = addr(self.chunk.len())?;
        self.compile_node(cond)?;
        self.emit(Opcode::JumpIfFalse);
        let end_patch = self.chunk.len();
        self.chunk.push_u16(0);

        self.compile_node(body)?;
        self.emit(Opcode::Pop);
        self.emit(Opcode::Jump);
        self.chunk.push_u16(start);

        let end_pos = addr(self.chunk.len())?;
        self.chunk.patch_u16(end_patch, end_pos);
        self.push_const(PrimValue::Unit)
    }

    fn compile_call(&mut self, name: &str, args: &[Node]) -> CompileResult<()> {
        let id = *self.function_ids.get(name).ok_or_else(|| CompileError::UndefinedFunction(name.to_owned()))?;
        let expected = *self.function_arity.get(&id).expect("hoisted functions have a recorded arity");
        if args.len() != expected as usize {
            return Err(CompileError::ArityMismatch { name: name.to_owned(), expected, found: args.len() });
        }
        if args.len() > u8::MAX as usize {
            return Err(CompileError::TooManyArgs);
        }
        for arg in args {
            self.compile_node(arg)?;
        }
        self.emit(Opcode::Call);
        let patch_at = self.chunk.len();
        self.chunk.push_u16(0);
        match self.function_entries.get(&id) {
            Some(&entry) => self.chunk.patch_u16(patch_at, entry),
            None => self.pending_calls.push((id, patch_at)),
        }
        self.chunk.push_u8(args.len() as u8);
        Ok(())
    }

    fn emit(&mut self, op: Opcode) {
        self.chunk.push_u8(op as u8);
    }

    fn push_const(&mut self, value: PrimValue) -> CompileResult<()> {
        let idx = self.chunk.add_constant(value);
        if idx > u8::MAX as u16 {
            return Err(CompileError::TooManyConstants);
        }
        self.emit(Opcode::PushConst);
        self.chunk.push_u8(idx as u8);
        Ok(())
    }
}

fn binop_opcode(op: TokenKind) -> CompileResult<Opcode> {
    use TokenKind as T;
    Ok(match op {
        T::Add => Opcode::Add,
        T::Sub => Opcode::Sub,
        T::Mul => Opcode::Mul,
        T::Div => Opcode::Div,
        T::Eq => Opcode::Eq,
        T::Ne => Opcode::Ne,
        T::Gt => Opcode::Gt,
        T::Ge => Opcode::Ge,
        T::Lt => Opcode::Lt,
        T::Le => Opcode::Le,
        T::And | T::BitAnd => Opcode::LogAnd,
        T::Or | T::BitOr => Opcode::LogOr,
        T::Xor => Opcode::LogXor,
        other => return Err(CompileError::UnsupportedOperator(other)),
    })
}
