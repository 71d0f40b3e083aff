use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use minibf::emitter;
use minibf::jumps::{self, JumpMap, UnbalancedBracket};
use minibf::machine::{Machine, TAPE_LEN};
use minibf::program::Program;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_RED: &str = "\x1b[31m";

#[derive(Parser)]
#[command(name = "bf", version, about = "A simple Brainfuck interpreter / compiler")]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Execute a program from a file.
    Run {
        /// Source file to execute.
        file: PathBuf,
    },
    /// Translate a program to C source.
    Translate {
        /// Source file to translate.
        file: PathBuf,

        /// Destination for the generated C.
        #[arg(short, long, default_value = "output.c")]
        output: PathBuf,
    },
    /// Translate a program and compile it to a native executable with gcc.
    Build {
        /// Source file to compile.
        file: PathBuf,

        /// Path of the executable to produce.
        executable: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(CliCommand::Run { file }) => run_file(&file),
        Some(CliCommand::Translate { file, output }) => translate(&file, &output),
        Some(CliCommand::Build { file, executable }) => build(&file, &executable),
        None => interactive(),
    }
}

/// Print every bracket imbalance with positional context. Execution still
/// proceeds afterwards, treating unmatched brackets as no-ops.
fn report_bracket_errors(source: &[u8], errors: &[UnbalancedBracket]) {
    for error in errors {
        eprintln!("\n\n{COLOR_RED}Error: {error}{COLOR_RESET}");
        eprintln!("{}", jumps::render_diagnostic(source, error));
    }
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let program = Program::from_file(path)
        .with_context(|| format!("could not open file {}", path.display()))?;
    let (jump_map, errors) = JumpMap::resolve(program.bytes());
    report_bracket_errors(program.bytes(), &errors);

    let mut machine = Machine::new()?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    machine
        .run(&program, &jump_map, &mut stdin.lock(), &mut stdout.lock())
        .context("execution failed")?;
    Ok(())
}

fn translate(input: &Path, output: &Path) -> anyhow::Result<()> {
    let program = Program::from_file(input)
        .with_context(|| format!("could not open file {}", input.display()))?;
    let generated = emitter::emit(program.bytes());
    std::fs::write(output, generated)
        .with_context(|| format!("could not write output file {}", output.display()))?;
    println!("Brainfuck code converted to C code in {}", output.display());
    Ok(())
}

fn build(input: &Path, executable: &Path) -> anyhow::Result<()> {
    let c_file = Path::new("temp_output.c");
    translate(input, c_file)?;

    let status = Command::new("gcc")
        .arg(c_file)
        .arg("-o")
        .arg(executable)
        .status()
        .context("could not invoke gcc")?;
    std::fs::remove_file(c_file).ok();

    if !status.success() {
        bail!("compilation failed with {status}");
    }
    println!("Executable created: {}", executable.display());
    Ok(())
}

/// Batch mode: read stdin until end-of-input, execute, reset, repeat.
/// An empty batch ends the session.
fn interactive() -> anyhow::Result<()> {
    println!("\n    MiniBf {}\n", env!("CARGO_PKG_VERSION"));
    println!("    TAPE SIZE: {TAPE_LEN}");
    println!("    CELL SIZE: 0-32767\n");
    println!("    Input 'bf --help' for help\n");

    let mut machine = Machine::new()?;
    loop {
        let mut batch = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut batch)
            .context("could not read program")?;
        if batch.is_empty() {
            break;
        }

        let program = Program::from_bytes(batch);
        let (jump_map, errors) = JumpMap::resolve(program.bytes());
        report_bracket_errors(program.bytes(), &errors);

        let stdin = io::stdin();
        let stdout = io::stdout();
        machine
            .run(&program, &jump_map, &mut stdin.lock(), &mut stdout.lock())
            .context("execution failed")?;
        io::stdout().flush().ok();
        machine.reset();
    }
    Ok(())
}
