//! Human-readable IR dump
//!
//! One entry per top level: globals on a single line, functions as a block
//! list. Each block prints its predecessors, then its live φs, then its
//! instructions behind a line-number gutter. Virtual registers print as
//! `%n`, blocks as `@n`, top levels as `$n`.

use crate::ir::*;
use std::fmt::Write;

fn write_type(out: &mut String, ty: &IrType) {
    match &ty.kind {
        IrTypeKind::None => out.push_str("none"),
        IrTypeKind::Integer(bits) => {
            let _ = write!(out, "i{bits}");
        }
        IrTypeKind::Function { ret, params } => {
            out.push('(');
            for (index, param) in params.iter().enumerate() {
                if index != 0 {
                    out.push_str(", ");
                }
                write_type(out, param);
            }
            if !params.is_empty() {
                out.push(' ');
            }
            out.push_str("-> ");
            write_type(out, ret);
            out.push(')');
        }
    }
    for _ in 0..ty.pointer_depth {
        out.push('*');
    }
}

fn write_constant(out: &mut String, constant: &IrConstant) {
    if constant.undefined {
        out.push_str("undefined");
    } else {
        let _ = write!(out, "{}", constant.value);
    }
}

fn write_operand(out: &mut String, f: &IrFunction, operand: &Operand, with_type: bool) {
    match operand {
        Operand::Type(ty) => {
            write_type(out, ty);
            return;
        }
        Operand::Vreg(vreg) => {
            let _ = write!(out, "%{}", vreg.0);
        }
        Operand::Constant(constant) => write_constant(out, constant),
        Operand::Block(block) => {
            let _ = write!(out, "@{}", block.0);
        }
        Operand::TopLevel { id, .. } => {
            let _ = write!(out, "${}", id.0);
        }
    }

    if !with_type {
        return;
    }
    out.push_str(" : ");
    match operand {
        Operand::Vreg(vreg) => match &f.vreg(*vreg).ty {
            Some(ty) => write_type(out, ty),
            None => out.push_str("none"),
        },
        Operand::Constant(constant) => write_type(out, &IrType::integer(constant.bits)),
        Operand::Block(_) => out.push_str("block"),
        Operand::TopLevel { ty, .. } => write_type(out, ty),
        Operand::Type(_) => unreachable!("returned above"),
    }
}

fn write_instruction(
    out: &mut String,
    f: &IrFunction,
    index: usize,
    inst: &Instruction,
    gutter: usize,
) {
    let _ = write!(out, "{index:>gutter$} |   ");
    if let Some(dest) = inst.dest {
        write_operand(out, f, &Operand::Vreg(dest), true);
        out.push_str(" = ");
    }
    out.push_str(inst.opcode.name());

    if let Some(condition) = inst.condition {
        out.push(' ');
        out.push_str(condition.name());
    }

    for param in &inst.params {
        out.push(' ');
        write_operand(out, f, param, false);
    }
    out.push('\n');
}

fn write_block(out: &mut String, f: &IrFunction, block: BlockId, gutter: usize) {
    let data = f.block(block);

    let _ = write!(out, "{:>gutter$} | @{}", "", block.0);
    if data.predecessors.is_empty() {
        out.push_str(":\n");
    } else {
        out.push('(');
        for (index, pred) in data.predecessors.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "@{}", pred.0);
        }
        out.push_str("):\n");
    }

    for &phi_id in &data.phis {
        let phi = f.phi(phi_id);
        if !phi.used {
            continue;
        }
        let _ = write!(out, "{:>gutter$} |   ", "");
        write_operand(out, f, &Operand::Vreg(phi.result), true);
        out.push_str(" = phi");
        for operand in &phi.operands {
            if operand.ignore {
                continue;
            }
            let _ = write!(out, " [@{} ", operand.block.0);
            write_operand(out, f, &operand.value, false);
            out.push(']');
        }
        out.push('\n');
    }

    for (index, &inst) in data.instructions.iter().enumerate() {
        write_instruction(out, f, index, f.inst(inst), gutter);
    }
}

fn digits(mut value: usize) -> usize {
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}

pub fn write_function(out: &mut String, f: &IrFunction) {
    let _ = write!(out, "function {} ${}", f.name, f.id.0);
    write_type(out, &f.fn_type());

    if f.block_order.is_empty() {
        out.push_str("\n\n");
        return;
    }

    out.push_str(" {\n");

    let max_instructions = f
        .block_order
        .iter()
        .map(|&block| f.block(block).instructions.len())
        .max()
        .unwrap_or(0);
    let gutter = digits(max_instructions.saturating_sub(1));

    for &block in &f.block_order {
        write_block(out, f, block, gutter);
    }

    out.push_str("}\n\n");
}

fn write_global(out: &mut String, name: &str, id: TopId, ty: &IrType, value: Option<i32>) {
    let _ = write!(out, "global {name} : ");
    write_type(out, &ty.clone().pointee());
    let _ = write!(out, " -> ${} : ", id.0);
    write_type(out, ty);
    match value {
        Some(value) => {
            let _ = writeln!(out, " = {value}\n");
        }
        None => out.push_str("\n\n"),
    }
}

/// Render a whole module as text
pub fn print_module(module: &IrModule) -> String {
    let mut out = String::new();
    for top in &module.top_levels {
        match top {
            IrTopLevel::Global { name, id, ty, value } => {
                write_global(&mut out, name, *id, ty, *value);
            }
            IrTopLevel::Function(function) => write_function(&mut out, function),
        }
    }
    out
}
