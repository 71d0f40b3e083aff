use std::io::{self, Read, Write};

use thiserror::Error;

use crate::jumps::JumpMap;
use crate::program::{self, Program};

/// Number of cells on the tape.
pub const TAPE_LEN: usize = 1 << 24;

/// Canonical newline value stored by the read instruction.
const NEWLINE: i16 = 10;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("could not allocate a {cells}-cell tape")]
    Allocation {
        cells: usize,
        #[source]
        source: std::collections::TryReserveError,
    },
}

/// What one run did, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Instructions executed, comments included.
    pub steps: u64,
    /// True when the optional step limit stopped the run before the cursor
    /// reached the end of the buffer.
    pub hit_step_limit: bool,
    /// Pointer position when the run ended.
    pub pointer: usize,
    /// Furthest-right cell ever visited.
    pub high_water: usize,
}

/// The runtime state of one interpreter: tape, pointer, debug counters.
///
/// Cells are `i16` with a defined range of 0–32767: decrement saturates at
/// zero while increment wraps at the cell width (so a cell can go negative
/// only by wrapping past 32767, and stays frozen there until incremented
/// again — the saturating decrement skips negative values). The pointer is
/// clamped to the tape: a move that would leave `[0, capacity)` is ignored.
///
/// One machine lives across interactive batches; [`Machine::reset`] restores
/// the fresh state between runs.
pub struct Machine {
    tape: Vec<i16>,
    pointer: usize,
    high_water: usize,
    cell_dumps: u32,
    tape_dumps: u32,
    step_limit: Option<u64>,
}

impl Machine {
    /// A machine with the full [`TAPE_LEN`]-cell tape.
    pub fn new() -> Result<Self, MachineError> {
        Self::with_capacity(TAPE_LEN)
    }

    /// A machine with a smaller tape, mainly for tests.
    ///
    /// Allocation goes through `try_reserve` so an out-of-memory condition
    /// surfaces as [`MachineError::Allocation`] instead of aborting.
    pub fn with_capacity(cells: usize) -> Result<Self, MachineError> {
        let mut tape = Vec::new();
        tape.try_reserve_exact(cells)
            .map_err(|source| MachineError::Allocation { cells, source })?;
        tape.resize(cells, 0);
        Ok(Self {
            tape,
            pointer: 0,
            high_water: 0,
            cell_dumps: 1,
            tape_dumps: 1,
            step_limit: None,
        })
    }

    /// Cap the number of instructions one run may execute. `None` (the
    /// default) runs to completion.
    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    /// Zero the tape and restore pointer, high-water mark, and both debug
    /// counters for the next batch.
    pub fn reset(&mut self) {
        self.tape.fill(0);
        self.pointer = 0;
        self.high_water = 0;
        self.cell_dumps = 1;
        self.tape_dumps = 1;
    }

    /// Value of the cell under the pointer.
    pub fn current_cell(&self) -> i16 {
        self.tape[self.pointer]
    }

    pub fn tape(&self) -> &[i16] {
        &self.tape
    }

    /// Execute `program` from the first byte until the cursor passes the end
    /// of the buffer (or the step limit trips).
    ///
    /// Brackets redirect the cursor through `jumps`; the partner instruction
    /// is evaluated on the next step and falls through, so each loop edge
    /// costs one extra step. A bracket with no partner (unbalanced source)
    /// is executed as a no-op. A single trailing newline is written at end
    /// of run as a framing convention.
    pub fn run<R: Read, W: Write>(
        &mut self,
        program: &Program,
        jumps: &JumpMap,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<RunReport> {
        let source = program.bytes();
        let mut cursor = 0usize;
        let mut steps = 0u64;
        let mut hit_step_limit = false;

        while cursor < source.len() {
            if let Some(limit) = self.step_limit
                && steps >= limit
            {
                hit_step_limit = true;
                break;
            }
            steps += 1;

            match source[cursor] {
                program::INC => {
                    self.tape[self.pointer] = self.tape[self.pointer].wrapping_add(1);
                }
                program::DEC => {
                    if self.tape[self.pointer] > 0 {
                        self.tape[self.pointer] -= 1;
                    }
                }
                program::LEFT => {
                    self.pointer = self.pointer.saturating_sub(1);
                }
                program::RIGHT => {
                    if self.pointer + 1 < self.tape.len() {
                        self.pointer += 1;
                        if self.pointer > self.high_water {
                            self.high_water = self.pointer;
                        }
                    }
                }
                program::READ => {
                    let mut byte = [0u8; 1];
                    // End of input leaves the cell untouched.
                    if input.read(&mut byte)? == 1 {
                        self.tape[self.pointer] = if byte[0] == b'\n' {
                            NEWLINE
                        } else {
                            i16::from(byte[0])
                        };
                    }
                }
                program::WRITE => {
                    output.write_all(&[self.tape[self.pointer] as u8])?;
                }
                program::OPEN => {
                    if self.tape[self.pointer] == 0
                        && let Some(target) = jumps.partner(cursor)
                    {
                        cursor = target;
                        continue;
                    }
                }
                program::CLOSE => {
                    if self.tape[self.pointer] != 0
                        && let Some(target) = jumps.partner(cursor)
                    {
                        cursor = target;
                        continue;
                    }
                }
                program::DUMP_CELL => self.dump_cell(output)?,
                program::DUMP_TAPE => self.dump_tape(output)?,
                _ => {} // comment
            }
            cursor += 1;
        }

        output.write_all(b"\n")?;
        output.flush()?;

        Ok(RunReport {
            steps,
            hit_step_limit,
            pointer: self.pointer,
            high_water: self.high_water,
        })
    }

    fn dump_cell<W: Write>(&mut self, output: &mut W) -> io::Result<()> {
        writeln!(output, "\n\n# DEBUG INFO ({}):", self.cell_dumps)?;
        self.cell_dumps += 1;
        writeln!(output, "cell #{}: {}", self.pointer, self.tape[self.pointer])
    }

    fn dump_tape<W: Write>(&mut self, output: &mut W) -> io::Result<()> {
        writeln!(output, "\n\n@ DEBUG INFO ({}):", self.tape_dumps)?;
        self.tape_dumps += 1;
        for index in 0..=self.high_water {
            write!(output, "#{}: {}  ", index, self.tape[index])?;
            if index % 5 == 4 {
                writeln!(output)?;
            }
        }
        writeln!(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_program(source: &[u8], input: &[u8]) -> (Machine, Vec<u8>, RunReport) {
        let program = Program::from_bytes(source.to_vec());
        let (jumps, _) = JumpMap::resolve(program.bytes());
        let mut machine = Machine::with_capacity(64).unwrap();
        let mut reader = input;
        let mut output = Vec::new();
        let report = machine
            .run(&program, &jumps, &mut reader, &mut output)
            .unwrap();
        (machine, output, report)
    }

    #[test]
    fn test_increment_and_write() {
        let (_, output, report) = run_program(b"+++.", b"");
        assert_eq!(output, [3, b'\n']);
        assert_eq!(report.steps, 4);
    }

    #[test]
    fn test_loop_drains_cell_to_zero() {
        let (machine, _, report) = run_program(b"+[-]", b"");
        assert_eq!(machine.current_cell(), 0);
        assert!(!report.hit_step_limit);
    }

    #[test]
    fn test_decrement_saturates_at_zero() {
        let (machine, _, _) = run_program(b"---", b"");
        assert_eq!(machine.current_cell(), 0);
    }

    #[test]
    fn test_decrement_never_undoes_saturation() {
        let (machine, _, _) = run_program(b"+--+", b"");
        assert_eq!(machine.current_cell(), 1);
    }

    #[test]
    fn test_read_then_write_echoes_input() {
        let (_, output, _) = run_program(b",.", b"A");
        assert_eq!(output, [65, b'\n']);
    }

    #[test]
    fn test_read_at_end_of_input_is_a_noop() {
        let (machine, output, _) = run_program(b"+,.", b"");
        // Cell keeps its prior value when input is exhausted.
        assert_eq!(machine.current_cell(), 1);
        assert_eq!(output, [1, b'\n']);
    }

    #[test]
    fn test_read_normalizes_newline() {
        let (machine, _, _) = run_program(b",", b"\n");
        assert_eq!(machine.current_cell(), 10);
    }

    #[test]
    fn test_comments_are_skipped() {
        let (_, output, report) = run_program(b"say + three +  times +.", b"");
        assert_eq!(output, [3, b'\n']);
        assert_eq!(report.steps, 23);
    }

    #[test]
    fn test_pointer_clamps_at_left_edge() {
        let (machine, _, report) = run_program(b"<<<+", b"");
        assert_eq!(report.pointer, 0);
        assert_eq!(machine.current_cell(), 1);
    }

    #[test]
    fn test_pointer_clamps_at_right_edge() {
        let program = Program::from_bytes(vec![b'>'; 16]);
        let (jumps, _) = JumpMap::resolve(program.bytes());
        let mut machine = Machine::with_capacity(4).unwrap();
        let mut sink: Vec<u8> = Vec::new();
        let report = machine
            .run(&program, &jumps, &mut &b""[..], &mut sink)
            .unwrap();
        assert_eq!(report.pointer, 3);
        assert_eq!(report.high_water, 3);
    }

    #[test]
    fn test_high_water_tracks_furthest_right() {
        let (_, _, report) = run_program(b">>><<", b"");
        assert_eq!(report.high_water, 3);
        assert_eq!(report.pointer, 1);
    }

    #[test]
    fn test_unmatched_bracket_is_a_noop() {
        // "[" with cell 0 and no partner falls through to the "+".
        let (machine, _, _) = run_program(b"[+", b"");
        assert_eq!(machine.current_cell(), 1);
    }

    #[test]
    fn test_cell_dump_format_and_counter() {
        let (_, output, _) = run_program(b"+#+#", b"");
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\n\n# DEBUG INFO (1):\ncell #0: 1\n"));
        assert!(text.contains("\n\n# DEBUG INFO (2):\ncell #0: 2\n"));
    }

    #[test]
    fn test_tape_dump_covers_high_water() {
        let (_, output, _) = run_program(b"+>++>+++<<@", b"");
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\n\n@ DEBUG INFO (1):\n"));
        assert!(text.contains("#0: 1  #1: 2  #2: 3  "));
    }

    #[test]
    fn test_tape_dump_wraps_every_five_cells() {
        let (_, output, _) = run_program(b">>>>>@", b"");
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("#0: 0  #1: 0  #2: 0  #3: 0  #4: 0  \n#5: 0  "));
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let (mut machine, _, _) = run_program(b"+>+#@", b"");
        machine.reset();
        assert_eq!(machine.current_cell(), 0);
        assert!(machine.tape().iter().all(|&cell| cell == 0));

        // Counters start over at 1 after a reset.
        let program = Program::from_bytes(b"#".to_vec());
        let (jumps, _) = JumpMap::resolve(program.bytes());
        let mut output = Vec::new();
        machine
            .run(&program, &jumps, &mut &b""[..], &mut output)
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("# DEBUG INFO (1):"));
    }

    #[test]
    fn test_step_limit_stops_infinite_loop() {
        let program = Program::from_bytes(b"+[]".to_vec());
        let (jumps, _) = JumpMap::resolve(program.bytes());
        let mut machine = Machine::with_capacity(8).unwrap();
        machine.set_step_limit(Some(100));
        let mut sink: Vec<u8> = Vec::new();
        let report = machine
            .run(&program, &jumps, &mut &b""[..], &mut sink)
            .unwrap();
        assert!(report.hit_step_limit);
        assert_eq!(report.steps, 100);
    }

    #[test]
    fn test_empty_program_emits_only_the_separator() {
        let (_, output, report) = run_program(b"", b"");
        assert_eq!(output, b"\n");
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn test_branch_partner_is_reevaluated() {
        // "[" on a zero cell jumps onto "]", which is its own step.
        let (_, _, report) = run_program(b"[]", b"");
        assert_eq!(report.steps, 2);
    }

    #[test]
    fn test_hello_world() {
        let source = b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
        let (_, output, _) = run_program(source, b"");
        assert_eq!(output, b"Hello World!\n\n");
    }
}
