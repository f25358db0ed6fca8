use pretty_assertions::assert_eq;

use super::encoding::encode;
use super::encoding::Arg;
use super::encoding::Opcode;
use super::Cpu;
use super::MainBus;
use super::SP;
use crate::common::constants::BIOS_BASE;
use crate::common::constants::HARDWARE_FAULT_VECTOR;
use crate::common::word::Word;

const RAM_WORDS: usize = 4096;
const STACK_TOP: i32 = RAM_WORDS as i32;

/// Word-addressable test fixture: a small RAM at address 0 and the test
/// program as rom at the BIOS base. Port traffic is recorded.
struct TestBus {
    ram: Vec<Word>,
    rom: Vec<Word>,
    port_values: std::collections::HashMap<i32, Word>,
    port_writes: Vec<(i32, Word)>,
}

impl TestBus {
    fn new(rom: Vec<Word>) -> Self {
        Self {
            ram: vec![Word::ZERO; RAM_WORDS],
            rom,
            port_values: Default::default(),
            port_writes: Vec::new(),
        }
    }
}

impl MainBus for TestBus {
    fn read(&mut self, address: i32) -> Option<Word> {
        if address >= BIOS_BASE {
            self.rom.get((address - BIOS_BASE) as usize).copied()
        } else {
            self.ram.get(address as usize).copied()
        }
    }

    fn write(&mut self, address: i32, value: Word) -> bool {
        match self.ram.get_mut(address as usize) {
            Some(slot) if address < BIOS_BASE => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    fn read_port(&mut self, port: i32) -> Word {
        self.port_values.get(&port).copied().unwrap_or_default()
    }

    fn write_port(&mut self, port: i32, value: Word) {
        self.port_writes.push((port, value));
    }
}

/// Builds a rom image with the required prelude: a jump over the fault
/// vector slot, and a HLT as the fault handler at the vector itself.
fn rom_with_program(program: &[Vec<Word>]) -> Vec<Word> {
    let mut rom = encode(Opcode::Jmp, Arg::Imm(Word::from(BIOS_BASE + 3)), Arg::None);
    assert_eq!(rom.len(), 2);
    rom.extend(encode(Opcode::Hlt, Arg::None, Arg::None));
    for instruction in program {
        rom.extend(instruction.iter().copied());
    }
    rom
}

fn run_to_halt(program: &[Vec<Word>]) -> Cpu<TestBus> {
    let mut cpu = Cpu::new(TestBus::new(rom_with_program(program)));
    cpu.r[SP] = Word::from(STACK_TOP);
    for _ in 0..10_000 {
        if cpu.halt {
            return cpu;
        }
        cpu.run_cycle();
    }
    panic!("program did not halt");
}

fn halted_at_fault_vector(cpu: &Cpu<TestBus>) -> bool {
    // the fault handler is a HLT at the vector, so a delivered fault
    // leaves the machine halted with pc right past it
    cpu.halt && cpu.pc == HARDWARE_FAULT_VECTOR + 1
}

#[test]
fn mov_between_register_immediate_and_memory() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(42))),
        encode(Opcode::Mov, Arg::Reg(1), Arg::Imm(Word::from(10))),
        encode(Opcode::Mov, Arg::Ind(1, 5), Arg::Reg(0)),
        encode(Opcode::Mov, Arg::Reg(2), Arg::Ind(1, 5)),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[2].as_i32(), 42);
    assert_eq!(cpu.bus.ram[15].as_i32(), 42);
}

#[test]
fn arithmetic_is_signed_and_wrapping() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(i32::MAX))),
        encode(Opcode::Add, Arg::Reg(0), Arg::Imm(Word::from(1))),
        encode(Opcode::Mov, Arg::Reg(1), Arg::Imm(Word::from(-7))),
        encode(Opcode::Mod, Arg::Reg(1), Arg::Imm(Word::from(3))),
        encode(Opcode::Mov, Arg::Reg(2), Arg::Imm(Word::from(-8))),
        encode(Opcode::Div, Arg::Reg(2), Arg::Imm(Word::from(2))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[0].as_i32(), i32::MIN);
    assert_eq!(cpu.r[1].as_i32(), -1);
    assert_eq!(cpu.r[2].as_i32(), -4);
}

#[test]
fn shifts_mask_the_count_and_shr_keeps_the_sign() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(1))),
        encode(Opcode::Shl, Arg::Reg(0), Arg::Imm(Word::from(33))),
        encode(Opcode::Mov, Arg::Reg(1), Arg::Imm(Word::from(-16))),
        encode(Opcode::Shr, Arg::Reg(1), Arg::Imm(Word::from(2))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[0].as_i32(), 2);
    assert_eq!(cpu.r[1].as_i32(), -4);
}

#[test]
fn compare_drives_conditional_jumps() {
    // prelude (3 words) + MOV + CMP + JL + MOV, two words each
    let end = BIOS_BASE + 11;
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(5))),
        encode(Opcode::Cmp, Arg::Reg(0), Arg::Imm(Word::from(9))),
        encode(Opcode::Jl, Arg::Imm(Word::from(end)), Arg::None),
        // skipped when the jump is taken
        encode(Opcode::Mov, Arg::Reg(1), Arg::Imm(Word::from(1))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[1].as_i32(), 0);
    assert_eq!(cpu.compare, -1);
}

#[test]
fn call_and_ret_use_the_stack() {
    // main: CALL sub; HLT       sub: MOV R0, 7; RET
    let sub = BIOS_BASE + 3 + 2 + 1;
    let cpu = run_to_halt(&[
        encode(Opcode::Call, Arg::Imm(Word::from(sub)), Arg::None),
        encode(Opcode::Hlt, Arg::None, Arg::None),
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(7))),
        encode(Opcode::Ret, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[0].as_i32(), 7);
    assert_eq!(cpu.r[SP].as_i32(), STACK_TOP);
}

#[test]
fn push_and_pop_round_trip() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(11))),
        encode(Opcode::Push, Arg::Reg(0), Arg::None),
        encode(Opcode::Push, Arg::Imm(Word::from(22)), Arg::None),
        encode(Opcode::Pop, Arg::Reg(1), Arg::None),
        encode(Opcode::Pop, Arg::Reg(2), Arg::None),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[1].as_i32(), 22);
    assert_eq!(cpu.r[2].as_i32(), 11);
    assert_eq!(cpu.r[SP].as_i32(), STACK_TOP);
}

#[test]
fn division_by_zero_stores_sentinel_and_faults() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(5))),
        encode(Opcode::Mov, Arg::Reg(1), Arg::Imm(Word::from(0))),
        encode(Opcode::Div, Arg::Reg(0), Arg::Reg(1)),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[0].as_i32(), 0);
    assert!(halted_at_fault_vector(&cpu));
}

#[test]
fn unmapped_read_faults() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(0x0FFF_0000))),
        encode(Opcode::Mov, Arg::Reg(1), Arg::Ind(0, 0)),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert!(halted_at_fault_vector(&cpu));
}

#[test]
fn illegal_opcode_faults() {
    let cpu = run_to_halt(&[vec![Word::from_bits(0xFF)]]);
    assert!(halted_at_fault_vector(&cpu));
}

#[test]
fn float_pipeline_and_conversions() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(2.0_f32))),
        encode(Opcode::Fmul, Arg::Reg(0), Arg::Imm(Word::from(3.5_f32))),
        encode(Opcode::F2i, Arg::Reg(0), Arg::None),
        encode(Opcode::Mov, Arg::Reg(1), Arg::Imm(Word::from(9))),
        encode(Opcode::I2f, Arg::Reg(1), Arg::None),
        encode(Opcode::Fsqrt, Arg::Reg(1), Arg::None),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[0].as_i32(), 7);
    assert_eq!(cpu.r[1].as_f32(), 3.0);
}

#[test]
fn non_finite_float_operand_faults_without_store() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(1.0_f32))),
        encode(Opcode::Fadd, Arg::Reg(0), Arg::Imm(Word::from(f32::NAN))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.r[0].as_f32(), 1.0);
    assert!(halted_at_fault_vector(&cpu));
}

#[test]
fn fault_pushes_the_interrupted_pc() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(1))),
        encode(Opcode::Div, Arg::Reg(0), Arg::Imm(Word::from(0))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert!(halted_at_fault_vector(&cpu));
    // the pushed return address points at the instruction after DIV
    let pushed = cpu.bus.ram[(STACK_TOP - 1) as usize].as_i32();
    assert_eq!(pushed, BIOS_BASE + 7);
    assert_eq!(cpu.r[SP].as_i32(), STACK_TOP - 1);
}

#[test]
fn out_reaches_the_port_bus() {
    let cpu = run_to_halt(&[
        encode(
            Opcode::Out,
            Arg::Imm(Word::from(0x102)),
            Arg::Imm(Word::from(0x55)),
        ),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    assert_eq!(cpu.bus.port_writes, vec![(0x102, Word::from(0x55))]);
}

#[test]
fn in_reads_the_port_bus() {
    let mut cpu = Cpu::new(TestBus::new(rom_with_program(&[
        encode(Opcode::In, Arg::Reg(3), Arg::Imm(Word::from(0x200))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ])));
    cpu.r[SP] = Word::from(STACK_TOP);
    cpu.bus.port_values.insert(0x200, Word::from(1234));
    while !cpu.halt {
        cpu.run_cycle();
    }
    assert_eq!(cpu.r[3].as_i32(), 1234);
}

#[test]
fn wait_burns_cycles_until_the_next_frame() {
    let mut cpu = Cpu::new(TestBus::new(rom_with_program(&[
        encode(Opcode::Wait, Arg::None, Arg::None),
        encode(Opcode::Mov, Arg::Reg(0), Arg::Imm(Word::from(1))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ])));
    cpu.r[SP] = Word::from(STACK_TOP);
    for _ in 0..100 {
        cpu.run_cycle();
    }
    assert!(cpu.wait);
    assert_eq!(cpu.r[0].as_i32(), 0);
    assert_eq!(cpu.cycle, 100);

    cpu.begin_frame();
    for _ in 0..10 {
        cpu.run_cycle();
    }
    assert!(cpu.halt);
    assert_eq!(cpu.r[0].as_i32(), 1);
}

#[test]
fn halt_stops_the_cycle_counter() {
    let mut cpu = Cpu::new(TestBus::new(rom_with_program(&[encode(
        Opcode::Hlt,
        Arg::None,
        Arg::None,
    )])));
    cpu.r[SP] = Word::from(STACK_TOP);
    for _ in 0..10 {
        cpu.run_cycle();
    }
    // jump prelude + the HLT itself
    assert_eq!(cpu.cycle, 2);
}

#[test]
fn registers_not_named_by_an_instruction_are_untouched() {
    let cpu = run_to_halt(&[
        encode(Opcode::Mov, Arg::Reg(5), Arg::Imm(Word::from(1))),
        encode(Opcode::Add, Arg::Reg(5), Arg::Imm(Word::from(2))),
        encode(Opcode::Hlt, Arg::None, Arg::None),
    ]);
    for index in 0..16 {
        if index != 5 && index != SP {
            assert_eq!(cpu.r[index].as_i32(), 0, "r{} changed", index);
        }
    }
}
