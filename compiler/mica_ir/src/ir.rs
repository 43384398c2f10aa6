//! IR data model and SSA builder
//!
//! Entities live in per-function `Vec` stores addressed by typed ids;
//! cross-references are ids, never ownership. Use lists record every
//! operand slot that mentions a register or block, which is what drives
//! trivial-φ replacement and block cleanup.

use hashbrown::HashMap;
use mica_parser::SymbolId;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhiId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VregId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopId(pub u32);

/// The type of an IR value. Pointers are a depth annotation on the pointee
/// type rather than a separate constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct IrType {
    pub pointer_depth: u32,
    pub kind: IrTypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrTypeKind {
    None,
    Integer(u32),
    Function { ret: Box<IrType>, params: Vec<IrType> },
}

impl IrType {
    pub fn none() -> Self {
        Self { pointer_depth: 0, kind: IrTypeKind::None }
    }

    pub fn integer(bits: u32) -> Self {
        Self { pointer_depth: 0, kind: IrTypeKind::Integer(bits) }
    }

    pub fn function(ret: IrType, params: Vec<IrType>) -> Self {
        Self {
            pointer_depth: 0,
            kind: IrTypeKind::Function { ret: Box::new(ret), params },
        }
    }

    pub fn pointer_to(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn pointee(mut self) -> Self {
        self.pointer_depth = self.pointer_depth.saturating_sub(1);
        self
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.kind, IrTypeKind::None)
    }
}

/// An integer constant operand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrConstant {
    pub value: i32,
    pub bits: u32,
    pub undefined: bool,
}

impl IrConstant {
    pub fn new(value: i32, bits: u32) -> Self {
        Self { value, bits, undefined: false }
    }

    pub fn undefined() -> Self {
        Self { value: 0, bits: 0, undefined: true }
    }
}

/// An operand of an instruction or φ
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Type(IrType),
    Vreg(VregId),
    Block(BlockId),
    Constant(IrConstant),
    /// a global or function; the type rides along so use sites never need
    /// to consult the module
    TopLevel { id: TopId, ty: IrType },
}

impl Operand {
    pub fn undefined() -> Self {
        Operand::Constant(IrConstant::undefined())
    }

    pub fn int(value: i32) -> Self {
        Operand::Constant(IrConstant::new(value, 32))
    }
}

/// Comparison condition, encoded as a 3-bit mask:
/// bit 0 = greater, bit 1 = equal, bit 2 = less
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Comparison {
    Greater = 0b001,
    Equal = 0b010,
    GreaterEqual = 0b011,
    Less = 0b100,
    NotEqual = 0b101,
    LessEqual = 0b110,
}

impl Comparison {
    pub fn invert(self) -> Self {
        match self {
            Comparison::Less => Comparison::GreaterEqual,
            Comparison::Equal => Comparison::NotEqual,
            Comparison::Greater => Comparison::LessEqual,
            Comparison::GreaterEqual => Comparison::Less,
            Comparison::LessEqual => Comparison::Greater,
            Comparison::NotEqual => Comparison::Equal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Comparison::Greater => "greater",
            Comparison::Equal => "equal",
            Comparison::GreaterEqual => "greater equal",
            Comparison::Less => "less",
            Comparison::NotEqual => "not equal",
            Comparison::LessEqual => "less equal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Parameter,
    Add,
    Compare,
    JumpIf,
    Return,
    /// two's complement
    Negate,
    /// one's complement
    Not,
    Sub,
    Smul,
    Sdiv,
    Srem,
    Or,
    And,
    Xor,
    Shl,
    Asr,
    Jump,
    Alloca,
    Load,
    Store,
    GetElementPointer,
    Cast,
    Call,
    Sizeof,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Parameter => "parameter",
            Opcode::Add => "add",
            Opcode::Compare => "compare",
            Opcode::JumpIf => "jump if",
            Opcode::Return => "return",
            Opcode::Negate => "negate",
            Opcode::Not => "not",
            Opcode::Sub => "sub",
            Opcode::Smul => "mul signed",
            Opcode::Sdiv => "div signed",
            Opcode::Srem => "rem signed",
            Opcode::Or => "or",
            Opcode::And => "and",
            Opcode::Xor => "xor",
            Opcode::Shl => "shift left",
            Opcode::Asr => "shift right signed",
            Opcode::Jump => "jump",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::GetElementPointer => "get element pointer",
            Opcode::Cast => "cast",
            Opcode::Call => "call",
            Opcode::Sizeof => "sizeof",
        }
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIf | Opcode::Return)
    }
}

#[derive(Debug)]
pub struct Instruction {
    pub block: BlockId,
    pub opcode: Opcode,
    pub dest: Option<VregId>,
    pub params: Vec<Operand>,
    pub condition: Option<Comparison>,
    pub return_type_set: bool,
}

/// One φ input: the value flowing in over one predecessor edge
#[derive(Debug, Clone)]
pub struct PhiOperand {
    pub block: BlockId,
    pub value: Operand,
    /// set when the predecessor block was removed; the operand no longer
    /// takes part in triviality checks or printing
    pub ignore: bool,
}

#[derive(Debug)]
pub struct Phi {
    pub result: VregId,
    pub operands: SmallVec<[PhiOperand; 2]>,
    /// the source variable this φ resolves; expression-level merges have none
    pub var: Option<SymbolId>,
    pub block: BlockId,
    pub incomplete: bool,
    pub used: bool,
    pub return_type_set: bool,
    pub try_remove_processing: bool,
}

/// Where a virtual register's value is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VregDef {
    Instruction(InstId),
    Phi(PhiId),
    /// freshly created, definition not yet attached
    Pending,
}

/// One recorded use of a virtual register: the operand slot that holds it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VregUse {
    InstParam(InstId, usize),
    PhiOperand(PhiId, usize),
}

#[derive(Debug)]
pub struct VirtualRegister {
    pub def: VregDef,
    pub block: BlockId,
    pub ty: Option<IrType>,
    pub users: Vec<VregUse>,
}

/// One recorded use of a basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockUse {
    InstParam(InstId, usize),
    PhiOperand(PhiId, usize),
    /// this block is a predecessor of the named block
    Predecessor(BlockId),
}

#[derive(Debug)]
pub struct BasicBlock {
    pub instructions: Vec<InstId>,
    pub phis: Vec<PhiId>,
    pub predecessors: Vec<BlockId>,
    pub users: Vec<BlockUse>,
    /// all predecessors known; incomplete φs may be completed
    pub sealed: bool,
}

impl BasicBlock {
    fn new() -> Self {
        Self {
            instructions: Vec::new(),
            phis: Vec::new(),
            predecessors: Vec::new(),
            users: Vec::new(),
            sealed: false,
        }
    }
}

/// A function under construction, with its SSA builder state
#[derive(Debug)]
pub struct IrFunction {
    pub name: String,
    pub id: TopId,
    pub return_type: IrType,
    pub param_types: Vec<IrType>,

    pub blocks: Vec<BasicBlock>,
    /// block ids in layout order; removal only touches this list
    pub block_order: Vec<BlockId>,
    pub instructions: Vec<Instruction>,
    pub phis: Vec<Phi>,
    pub vregs: Vec<VirtualRegister>,

    /// the current SSA value of each source variable per block
    variable_table: HashMap<(SymbolId, BlockId), Operand>,
}

/// A top-level entity of the translation unit
#[derive(Debug)]
pub enum IrTopLevel {
    /// a global object; `ty` is the type of its address
    Global { name: String, id: TopId, ty: IrType, value: Option<i32> },
    Function(IrFunction),
}

impl IrTopLevel {
    pub fn name(&self) -> &str {
        match self {
            IrTopLevel::Global { name, .. } => name,
            IrTopLevel::Function(function) => &function.name,
        }
    }
}

/// All top-level entities of one translation unit
#[derive(Debug, Default)]
pub struct IrModule {
    pub top_levels: Vec<IrTopLevel>,
}

impl IrModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, id: TopId) -> Option<&IrFunction> {
        match &self.top_levels[id.0 as usize] {
            IrTopLevel::Function(function) => Some(function),
            IrTopLevel::Global { .. } => None,
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &IrFunction> {
        self.top_levels.iter().filter_map(|top| match top {
            IrTopLevel::Function(function) => Some(function),
            IrTopLevel::Global { .. } => None,
        })
    }
}

impl IrFunction {
    pub fn new(name: String, id: TopId, return_type: IrType, param_types: Vec<IrType>) -> Self {
        Self {
            name,
            id,
            return_type,
            param_types,
            blocks: Vec::new(),
            block_order: Vec::new(),
            instructions: Vec::new(),
            phis: Vec::new(),
            vregs: Vec::new(),
            variable_table: HashMap::new(),
        }
    }

    /// The type of this function, as used at call sites
    pub fn fn_type(&self) -> IrType {
        IrType::function(self.return_type.clone(), self.param_types.clone())
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.instructions[id.0 as usize]
    }

    pub fn phi(&self, id: PhiId) -> &Phi {
        &self.phis[id.0 as usize]
    }

    pub fn vreg(&self, id: VregId) -> &VirtualRegister {
        &self.vregs[id.0 as usize]
    }

    // ---- construction ----

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new());
        self.block_order.push(id);
        id
    }

    fn new_vreg(&mut self, block: BlockId) -> VregId {
        let id = VregId(self.vregs.len() as u32);
        self.vregs.push(VirtualRegister {
            def: VregDef::Pending,
            block,
            ty: None,
            users: Vec::new(),
        });
        id
    }

    fn last_inst_is_terminator(&self, block: BlockId) -> bool {
        self.block(block)
            .instructions
            .last()
            .map_or(false, |&id| self.inst(id).opcode.is_terminator())
    }

    fn record_operand_uses(&mut self, inst: InstId) {
        let params = self.inst(inst).params.clone();
        for (index, param) in params.iter().enumerate() {
            match param {
                Operand::Vreg(vreg) => {
                    self.vregs[vreg.0 as usize].users.push(VregUse::InstParam(inst, index));
                }
                Operand::Block(block) => {
                    self.block_mut(*block).users.push(BlockUse::InstParam(inst, index));
                }
                _ => {}
            }
        }
    }

    fn add_predecessor(&mut self, target: BlockId, pred: BlockId) {
        self.block_mut(target).predecessors.push(pred);
        self.block_mut(pred).users.push(BlockUse::Predecessor(target));
    }

    /// Append a value-producing instruction; instructions after an
    /// unconditional terminator are suppressed and yield `undefined`
    pub fn add_inst(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        params: Vec<Operand>,
        condition: Option<Comparison>,
    ) -> Operand {
        if self.last_inst_is_terminator(block) {
            return Operand::undefined();
        }

        let dest = self.new_vreg(block);
        let inst = InstId(self.instructions.len() as u32);
        self.instructions.push(Instruction {
            block,
            opcode,
            dest: Some(dest),
            params,
            condition,
            return_type_set: false,
        });
        self.vregs[dest.0 as usize].def = VregDef::Instruction(inst);
        self.block_mut(block).instructions.push(inst);

        self.set_inst_return_type(inst);
        self.record_operand_uses(inst);

        Operand::Vreg(dest)
    }

    /// Append a void instruction; jumps also wire predecessor edges
    pub fn add_void_inst(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        params: Vec<Operand>,
        condition: Option<Comparison>,
    ) {
        if self.last_inst_is_terminator(block) {
            return;
        }

        let inst = InstId(self.instructions.len() as u32);
        self.instructions.push(Instruction {
            block,
            opcode,
            dest: None,
            params,
            condition,
            return_type_set: false,
        });
        self.block_mut(block).instructions.push(inst);
        self.record_operand_uses(inst);

        match opcode {
            Opcode::Jump => {
                if let Operand::Block(target) = self.inst(inst).params[0].clone() {
                    self.add_predecessor(target, block);
                }
            }
            Opcode::JumpIf => {
                let params = self.inst(inst).params.clone();
                for param in &params[1..3] {
                    if let Operand::Block(target) = param {
                        self.add_predecessor(*target, block);
                    }
                }
            }
            _ => {}
        }
    }

    // ---- type propagation ----

    /// The type of an operand, if it is known yet
    pub fn operand_type(&self, operand: &Operand) -> Option<IrType> {
        match operand {
            Operand::Type(ty) => Some(ty.clone()),
            Operand::Vreg(vreg) => self.vreg(*vreg).ty.clone(),
            Operand::Constant(constant) => Some(IrType::integer(constant.bits)),
            Operand::TopLevel { ty, .. } => Some(ty.clone()),
            Operand::Block(_) => None,
        }
    }

    // push a newly known type through every user of the register
    fn propagate_type(&mut self, vreg: VregId) {
        let users = self.vreg(vreg).users.clone();
        for user in users {
            match user {
                VregUse::InstParam(inst, _) => self.set_inst_return_type(inst),
                VregUse::PhiOperand(phi, _) => self.set_phi_return_type(phi),
            }
        }
    }

    fn set_phi_return_type(&mut self, phi: PhiId) {
        if self.phi(phi).return_type_set || self.phi(phi).operands.is_empty() {
            return;
        }

        let first = self.phi(phi).operands[0].value.clone();
        let Some(ty) = self.operand_type(&first) else { return };

        let result = self.phi(phi).result;
        self.vregs[result.0 as usize].ty = Some(ty);
        self.phis[phi.0 as usize].return_type_set = true;
        self.propagate_type(result);
    }

    fn set_inst_return_type(&mut self, inst: InstId) {
        let Some(dest) = self.inst(inst).dest else { return };
        if self.inst(inst).return_type_set {
            return;
        }

        // every operand must be typed before the result type is derivable
        for param in &self.inst(inst).params {
            if let Operand::Vreg(vreg) = param {
                if self.vreg(*vreg).ty.is_none() {
                    return;
                }
            }
        }

        let params = self.inst(inst).params.clone();
        let ty = match self.inst(inst).opcode {
            Opcode::Parameter => {
                let Operand::Constant(index) = &params[0] else { return };
                self.param_types[index.value as usize].clone()
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::Smul
            | Opcode::Sdiv
            | Opcode::Srem
            | Opcode::Shl
            | Opcode::Asr
            | Opcode::Or
            | Opcode::And
            | Opcode::Xor
            | Opcode::Negate => match self.operand_type(&params[0]) {
                Some(ty) => ty,
                None => return,
            },
            Opcode::Compare | Opcode::Not => IrType::integer(8),
            Opcode::Alloca => match &params[0] {
                Operand::Type(ty) => ty.clone().pointer_to(),
                _ => return,
            },
            Opcode::Load => match self.operand_type(&params[0]) {
                Some(ty) => ty.pointee(),
                None => return,
            },
            // note: this only works as gep is only used for pointer
            // arithmetic: &a + 1, etc
            Opcode::GetElementPointer => match self.operand_type(&params[0]) {
                Some(ty) => ty,
                None => return,
            },
            Opcode::Cast => match &params[0] {
                Operand::Type(ty) => ty.clone(),
                _ => return,
            },
            Opcode::Call => match self.operand_type(&params[0]).map(|t| t.kind) {
                Some(IrTypeKind::Function { ret, .. }) => *ret,
                _ => return,
            },
            Opcode::Sizeof => IrType::integer(32),
            Opcode::Return | Opcode::Store | Opcode::Jump | Opcode::JumpIf => return,
        };

        self.vregs[dest.0 as usize].ty = Some(ty);
        self.instructions[inst.0 as usize].return_type_set = true;
        self.propagate_type(dest);
    }

    // ---- φ nodes ----

    pub fn phi_create(&mut self, block: BlockId, var: Option<SymbolId>) -> PhiId {
        let result = self.new_vreg(block);
        let phi = PhiId(self.phis.len() as u32);
        self.phis.push(Phi {
            result,
            operands: SmallVec::new(),
            var,
            block,
            incomplete: false,
            used: true,
            return_type_set: false,
            try_remove_processing: false,
        });
        self.vregs[result.0 as usize].def = VregDef::Phi(phi);
        self.block_mut(block).phis.push(phi);
        phi
    }

    pub fn phi_add_operand(&mut self, phi: PhiId, pred: BlockId, value: Operand) {
        let index = self.phi(phi).operands.len();
        self.phis[phi.0 as usize].operands.push(PhiOperand {
            block: pred,
            value: value.clone(),
            ignore: false,
        });

        if index == 0 {
            self.set_phi_return_type(phi);
        }

        if let Operand::Vreg(vreg) = value {
            self.vregs[vreg.0 as usize].users.push(VregUse::PhiOperand(phi, index));
        }
        self.block_mut(pred).users.push(BlockUse::PhiOperand(phi, index));
    }

    // ---- variable lookup (Braun et al.) ----

    pub fn write_variable(&mut self, var: SymbolId, block: BlockId, value: Operand) {
        self.variable_table.insert((var, block), value);
    }

    pub fn read_variable(&mut self, var: SymbolId, block: BlockId) -> Operand {
        // local value numbering
        if let Some(value) = self.variable_table.get(&(var, block)) {
            return value.clone();
        }
        // global value numbering
        self.read_variable_recursive(var, block)
    }

    fn read_variable_recursive(&mut self, var: SymbolId, block: BlockId) -> Operand {
        let value = if !self.block(block).sealed {
            // incomplete CFG: complete the φ when the block is sealed
            let phi = self.phi_create(block, Some(var));
            self.phis[phi.0 as usize].incomplete = true;
            Operand::Vreg(self.phi(phi).result)
        } else if self.block(block).predecessors.len() == 1 {
            // the common case of one predecessor: no φ needed
            let pred = self.block(block).predecessors[0];
            self.read_variable(var, pred)
        } else {
            // break potential cycles with an operandless φ
            let phi = self.phi_create(block, Some(var));
            let result = Operand::Vreg(self.phi(phi).result);
            self.write_variable(var, block, result);
            self.add_phi_operands(var, phi)
        };

        self.write_variable(var, block, value.clone());
        value
    }

    fn add_phi_operands(&mut self, var: SymbolId, phi: PhiId) -> Operand {
        let block = self.phi(phi).block;
        let preds = self.block(block).predecessors.clone();
        for pred in preds {
            let value = self.read_variable(var, pred);
            self.phi_add_operand(phi, pred, value);
        }
        self.try_remove_trivial_phi(phi)
    }

    /// A φ merging only itself and at most one distinct value is trivial:
    /// every use is rewritten to that value, and φs that used this one are
    /// re-examined, cascading removals
    pub fn try_remove_trivial_phi(&mut self, phi: PhiId) -> Operand {
        let result = self.phi(phi).result;
        if !self.phi(phi).used || self.phi(phi).try_remove_processing {
            return Operand::Vreg(result);
        }
        self.phis[phi.0 as usize].try_remove_processing = true;

        let mut same: Option<Operand> = None;
        for operand in self.phi(phi).operands.clone() {
            if operand.ignore {
                continue;
            }
            if Some(&operand.value) == same.as_ref() {
                continue;
            }
            if operand.value == Operand::Vreg(result) {
                // self-reference
                continue;
            }
            if same.is_some() {
                // the φ merges at least two values: not trivial
                self.phis[phi.0 as usize].try_remove_processing = false;
                return Operand::Vreg(result);
            }
            same = Some(operand.value.clone());
        }

        self.replace_vreg_uses(result, same.clone());
        self.phis[phi.0 as usize].used = false;

        same.unwrap_or_else(Operand::undefined)
    }

    // reroute every use of `old` to `new` (undefined when `new` is absent)
    fn replace_vreg_uses(&mut self, old: VregId, new: Option<Operand>) {
        let replacement = new.unwrap_or_else(Operand::undefined);

        // the variable table holds values by operand too
        for value in self.variable_table.values_mut() {
            if *value == Operand::Vreg(old) {
                *value = replacement.clone();
            }
        }

        let users = std::mem::take(&mut self.vregs[old.0 as usize].users);
        let own_phi = match self.vreg(old).def {
            VregDef::Phi(phi) => Some(phi),
            _ => None,
        };

        for user in &users {
            match *user {
                VregUse::InstParam(inst, index) => {
                    self.instructions[inst.0 as usize].params[index] = replacement.clone();
                }
                VregUse::PhiOperand(phi, index) => {
                    self.phis[phi.0 as usize].operands[index].value = replacement.clone();
                }
            }
            if let Operand::Vreg(new_vreg) = &replacement {
                self.vregs[new_vreg.0 as usize].users.push(*user);
            }
        }

        // cascade: φs that referenced the removed register may have
        // become trivial themselves
        for user in users {
            if let VregUse::PhiOperand(phi, _) = user {
                if self.phi(phi).used && Some(phi) != own_phi {
                    self.try_remove_trivial_phi(phi);
                }
            }
        }
    }

    /// Declare that no further predecessors will be added, completing any
    /// incomplete φs
    pub fn seal_block(&mut self, block: BlockId) {
        if self.block(block).sealed || self.block(block).predecessors.is_empty() {
            return;
        }
        log::trace!("{}: sealing @{}", self.name, block.0);
        for phi in self.block(block).phis.clone() {
            if self.phi(phi).incomplete && self.phi(phi).used {
                let var = self.phi(phi).var.expect("incomplete phis track a variable");
                self.add_phi_operands(var, phi);
            }
        }
        self.block_mut(block).sealed = true;
    }

    /// Mark the entry block, which never has predecessors, as sealed
    pub fn seal_entry(&mut self, block: BlockId) {
        self.block_mut(block).sealed = true;
    }

    // ---- cleanup ----

    /// Remove non-entry blocks whose only remaining users are φ operands or
    /// predecessor edges: nothing jumps to them, so they are unreachable
    pub fn remove_unused_blocks(&mut self) {
        let order = self.block_order.clone();
        for &block in &order {
            if block.0 == 0 {
                // never the entry block
                continue;
            }
            let removable = self
                .block(block)
                .users
                .iter()
                .all(|user| !matches!(user, BlockUse::InstParam(..)));
            if !removable {
                continue;
            }

            log::trace!("{}: removing unused block @{}", self.name, block.0);
            self.block_order.retain(|&b| b != block);

            let users = self.block(block).users.clone();
            for user in users {
                match user {
                    BlockUse::PhiOperand(phi, index) => {
                        self.phis[phi.0 as usize].operands[index].ignore = true;
                        self.try_remove_trivial_phi(phi);
                    }
                    BlockUse::Predecessor(target) => {
                        let preds = &mut self.block_mut(target).predecessors;
                        if let Some(position) = preds.iter().position(|&p| p == block) {
                            preds.remove(position);
                        }
                    }
                    BlockUse::InstParam(..) => unreachable!("checked above"),
                }
            }
        }
    }

    // ---- inspection helpers (used by the printer and tests) ----

    /// Opcodes of a block's instructions, in order
    pub fn block_opcodes(&self, block: BlockId) -> Vec<Opcode> {
        self.block(block)
            .instructions
            .iter()
            .map(|&id| self.inst(id).opcode)
            .collect()
    }

    /// φs still live in a block
    pub fn live_phis(&self, block: BlockId) -> Vec<PhiId> {
        self.block(block)
            .phis
            .iter()
            .copied()
            .filter(|&phi| self.phi(phi).used)
            .collect()
    }

    /// Number of φs surviving across the whole function
    pub fn live_phi_count(&self) -> usize {
        self.phis.iter().filter(|phi| phi.used).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_function() -> IrFunction {
        IrFunction::new(
            "test".into(),
            TopId(0),
            IrType::integer(32),
            vec![IrType::integer(32)],
        )
    }

    fn var(id: u32) -> SymbolId {
        SymbolId(id)
    }

    #[test]
    fn test_straight_line_read_returns_written_value() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);

        f.write_variable(var(0), entry, Operand::int(5));
        assert_eq!(f.read_variable(var(0), entry), Operand::int(5));
        assert_eq!(f.live_phi_count(), 0);
    }

    #[test]
    fn test_single_predecessor_chains_without_phi() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);
        f.write_variable(var(0), entry, Operand::int(7));

        let next = f.new_block();
        f.add_void_inst(entry, Opcode::Jump, vec![Operand::Block(next)], None);
        f.seal_block(next);

        assert_eq!(f.read_variable(var(0), next), Operand::int(7));
        assert_eq!(f.live_phi_count(), 0);
    }

    #[test]
    fn test_diamond_merge_creates_phi() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);

        let then_block = f.new_block();
        let else_block = f.new_block();
        let join = f.new_block();

        f.add_void_inst(
            entry,
            Opcode::JumpIf,
            vec![Operand::int(1), Operand::Block(then_block), Operand::Block(else_block)],
            None,
        );
        f.seal_block(then_block);
        f.seal_block(else_block);

        f.write_variable(var(0), then_block, Operand::int(1));
        f.write_variable(var(0), else_block, Operand::int(2));
        f.add_void_inst(then_block, Opcode::Jump, vec![Operand::Block(join)], None);
        f.add_void_inst(else_block, Opcode::Jump, vec![Operand::Block(join)], None);
        f.seal_block(join);

        let merged = f.read_variable(var(0), join);
        let Operand::Vreg(vreg) = merged else {
            panic!("expected a phi result, got {merged:?}");
        };
        assert!(matches!(f.vreg(vreg).def, VregDef::Phi(_)));
        assert_eq!(f.live_phi_count(), 1);
    }

    #[test]
    fn test_identical_arms_make_phi_trivial() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);

        let then_block = f.new_block();
        let else_block = f.new_block();
        let join = f.new_block();

        f.add_void_inst(
            entry,
            Opcode::JumpIf,
            vec![Operand::int(1), Operand::Block(then_block), Operand::Block(else_block)],
            None,
        );
        f.seal_block(then_block);
        f.seal_block(else_block);

        f.write_variable(var(0), then_block, Operand::int(1));
        f.write_variable(var(0), else_block, Operand::int(1));
        f.add_void_inst(then_block, Opcode::Jump, vec![Operand::Block(join)], None);
        f.add_void_inst(else_block, Opcode::Jump, vec![Operand::Block(join)], None);
        f.seal_block(join);

        assert_eq!(f.read_variable(var(0), join), Operand::int(1));
        assert_eq!(f.live_phi_count(), 0);
    }

    #[test]
    fn test_loop_header_phi_with_back_edge() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);
        f.write_variable(var(0), entry, Operand::int(0));

        let header = f.new_block();
        let body = f.new_block();
        let after = f.new_block();

        f.add_void_inst(entry, Opcode::Jump, vec![Operand::Block(header)], None);
        // header is not sealed yet: the back edge is still unknown

        let x = f.read_variable(var(0), header);
        let Operand::Vreg(header_phi_vreg) = x.clone() else {
            panic!("expected an incomplete phi, got {x:?}");
        };

        f.add_void_inst(
            header,
            Opcode::JumpIf,
            vec![x.clone(), Operand::Block(body), Operand::Block(after)],
            None,
        );
        f.seal_block(body);

        let inc = f.add_inst(body, Opcode::Add, vec![x, Operand::int(1)], None);
        f.write_variable(var(0), body, inc.clone());
        f.add_void_inst(body, Opcode::Jump, vec![Operand::Block(header)], None);

        f.seal_block(header);
        f.seal_block(after);

        let VregDef::Phi(phi) = f.vreg(header_phi_vreg).def else {
            panic!("header value must be a phi");
        };
        assert!(f.phi(phi).used);
        let operands: Vec<_> =
            f.phi(phi).operands.iter().map(|op| op.value.clone()).collect();
        assert!(operands.contains(&Operand::int(0)));
        assert!(operands.contains(&inc));
    }

    #[test]
    fn test_instructions_after_terminator_are_suppressed() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);

        f.add_void_inst(entry, Opcode::Return, vec![Operand::int(0)], None);
        f.add_void_inst(entry, Opcode::Return, vec![Operand::int(1)], None);
        let dead = f.add_inst(entry, Opcode::Add, vec![Operand::int(1), Operand::int(2)], None);

        assert_eq!(f.block(entry).instructions.len(), 1);
        assert_eq!(dead, Operand::undefined());
    }

    #[test]
    fn test_type_propagates_from_parameter() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);

        let param = f.add_inst(entry, Opcode::Parameter, vec![Operand::int(0)], None);
        let sum = f.add_inst(entry, Opcode::Add, vec![param, Operand::int(1)], None);

        let Operand::Vreg(sum_vreg) = sum else { panic!() };
        assert_eq!(f.vreg(sum_vreg).ty, Some(IrType::integer(32)));
    }

    #[test]
    fn test_compare_yields_i8() {
        let mut f = test_function();
        let entry = f.new_block();
        f.seal_entry(entry);

        let flag = f.add_inst(
            entry,
            Opcode::Compare,
            vec![Operand::int(1), Operand::int(2)],
            Some(Comparison::Less),
        );
        let Operand::Vreg(vreg) = flag else { panic!() };
        assert_eq!(f.vreg(vreg).ty, Some(IrType::integer(8)));
    }

    #[test]
    fn test_comparison_inversion_round_trips() {
        for cmp in [
            Comparison::Greater,
            Comparison::Equal,
            Comparison::GreaterEqual,
            Comparison::Less,
            Comparison::NotEqual,
            Comparison::LessEqual,
        ] {
            assert_eq!(cmp.invert().invert(), cmp);
        }
    }
}
