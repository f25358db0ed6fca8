//! Dense dispatch table, one entry per opcode byte.
use super::encoding::Opcode;
use super::encoding::Operand;
use super::Cpu;
use super::MainBus;

/// An entry in the opcode table
pub struct InstructionDef<BusT: MainBus> {
    /// Execute the instruction on the provided CPU.
    pub execute: fn(&mut Cpu<BusT>, Operand, Operand),
}

pub fn build_opcode_table<BusT: MainBus>() -> [InstructionDef<BusT>; 256] {
    macro_rules! instruction {
        ($method: ident) => {
            InstructionDef::<BusT> {
                execute: |cpu, op1, op2| cpu.$method(op1, op2),
            }
        };
    }

    // unassigned opcode bytes are illegal instructions and fault
    let mut opcodes = [(); 256].map(|_| instruction!(illegal));

    opcodes[Opcode::Hlt as usize] = instruction!(hlt);
    opcodes[Opcode::Wait as usize] = instruction!(wait);
    opcodes[Opcode::Jmp as usize] = instruction!(jmp);
    opcodes[Opcode::Call as usize] = instruction!(call);
    opcodes[Opcode::Ret as usize] = instruction!(ret);
    opcodes[Opcode::Je as usize] = instruction!(je);
    opcodes[Opcode::Jne as usize] = instruction!(jne);
    opcodes[Opcode::Jg as usize] = instruction!(jg);
    opcodes[Opcode::Jge as usize] = instruction!(jge);
    opcodes[Opcode::Jl as usize] = instruction!(jl);
    opcodes[Opcode::Jle as usize] = instruction!(jle);
    opcodes[Opcode::Mov as usize] = instruction!(mov);
    opcodes[Opcode::Push as usize] = instruction!(push_op);
    opcodes[Opcode::Pop as usize] = instruction!(pop_op);
    opcodes[Opcode::In as usize] = instruction!(port_in);
    opcodes[Opcode::Out as usize] = instruction!(port_out);
    opcodes[Opcode::Add as usize] = instruction!(add);
    opcodes[Opcode::Sub as usize] = instruction!(sub);
    opcodes[Opcode::Mul as usize] = instruction!(mul);
    opcodes[Opcode::Div as usize] = instruction!(div);
    opcodes[Opcode::Mod as usize] = instruction!(modulo);
    opcodes[Opcode::Cmp as usize] = instruction!(cmp);
    opcodes[Opcode::And as usize] = instruction!(and);
    opcodes[Opcode::Or as usize] = instruction!(or);
    opcodes[Opcode::Xor as usize] = instruction!(xor);
    opcodes[Opcode::Not as usize] = instruction!(not);
    opcodes[Opcode::Shl as usize] = instruction!(shl);
    opcodes[Opcode::Shr as usize] = instruction!(shr);
    opcodes[Opcode::Fadd as usize] = instruction!(fadd);
    opcodes[Opcode::Fsub as usize] = instruction!(fsub);
    opcodes[Opcode::Fmul as usize] = instruction!(fmul);
    opcodes[Opcode::Fdiv as usize] = instruction!(fdiv);
    opcodes[Opcode::Fsqrt as usize] = instruction!(fsqrt);
    opcodes[Opcode::Fsin as usize] = instruction!(fsin);
    opcodes[Opcode::Fcos as usize] = instruction!(fcos);
    opcodes[Opcode::Fpow as usize] = instruction!(fpow);
    opcodes[Opcode::Fabs as usize] = instruction!(fabs);
    opcodes[Opcode::I2f as usize] = instruction!(i2f);
    opcodes[Opcode::F2i as usize] = instruction!(f2i);
    opcodes[Opcode::Nop as usize] = instruction!(nop);

    opcodes
}
