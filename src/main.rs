use std::io::IsTerminal;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use dvdcmd::ast::Program;
use dvdcmd::compiler::{self, CompilerOptions};
use dvdcmd::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, plain, registry};
use dvdcmd::instruction::{self, Instruction, MAX_BLOCK_INSTRUCTIONS};
use dvdcmd::pgc::CommandTable;
use dvdcmd::vm::Machine;
use dvdcmd::workset::{Domain, Location, Workset};

/// Compile DVD-Video navigation scripts to VM commands
#[derive(Parser, Debug)]
#[command(name = "dvdcmd", version)]
#[command(about = "Compile DVD-Video navigation scripts", long_about = None)]
struct Args {
    /// Script source, or @FILE to read it from a file
    #[arg(required_unless_present_any = ["explain", "list_codes"])]
    script: Option<String>,

    /// Domain the commands run in
    #[arg(long, value_enum, default_value_t = DomainArg::Vmgm)]
    domain: DomainArg,

    /// Titleset of a vtsm or vts block
    #[arg(long, default_value_t = 1)]
    titleset: u8,

    /// Title (within the titleset) of a vts block
    #[arg(long, default_value_t = 1)]
    title: u8,

    /// Programs in the PGC, enables program number checks
    #[arg(long, requires = "cells")]
    programs: Option<u16>,

    /// Cells in the PGC, enables cell number checks
    #[arg(long, requires = "programs")]
    cells: Option<u16>,

    /// Disc layout as JSON
    #[arg(long, value_name = "FILE")]
    workset: Option<String>,

    /// Route transfers the player cannot express through VMGM menu PGC 1
    #[arg(long)]
    jumppad: bool,

    /// Let temporaries use any register above the assignment target
    #[arg(long)]
    allow_all_registers: bool,

    #[arg(long)]
    no_optimize: bool,

    /// Compile a cell command (exactly one instruction)
    #[arg(long)]
    cell: bool,

    #[arg(long, value_enum, default_value_t = Emit::Hex)]
    emit: Emit,

    #[arg(long, value_enum, default_value_t = Format::Plain)]
    diagnostics: Format,

    /// Execute the compiled block on zeroed registers and print the result
    #[arg(long)]
    run: bool,

    /// Explain a diagnostic code, e.g. NAV-C004
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,

    #[arg(long)]
    list_codes: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DomainArg {
    Vmgm,
    Vtsm,
    Vts,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Emit {
    Hex,
    Disasm,
    Json,
    Ast,
    /// PGC command table with header
    Table,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Plain,
    Ansi,
    Json,
}

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level().as_str().to_lowercase(), record.args())
        }
    }

    fn flush(&self) {}
}

fn report(format: Format, d: &Diagnostic) {
    let text = match format {
        Format::Plain => plain::render(d),
        Format::Ansi => AnsiRenderer { use_color: std::io::stderr().is_terminal() }.render(d),
        Format::Json => json::render(d),
    };
    eprint!("{}", text.trim_end_matches('\n'));
    eprintln!();
}

fn hex(ins: &Instruction) -> String {
    ins.bytes().iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

fn location(args: &Args) -> Location {
    let domain = match args.domain {
        DomainArg::Vmgm => Domain::Vmgm,
        DomainArg::Vtsm => Domain::Vtsm(args.titleset),
        DomainArg::Vts => Domain::Vts { titleset: args.titleset, title: args.title },
    };
    let location = Location::new(domain);
    match (args.programs, args.cells) {
        (Some(programs), Some(cells)) => location.with_pgc(programs, cells),
        _ => location,
    }
}

fn read_source(script: &str) -> Result<String, Diagnostic> {
    match script.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| Diagnostic::error(format!("cannot read {path}: {e}"))),
        None => Ok(script.to_string()),
    }
}

fn load_workset(path: Option<&str>) -> Result<Workset, Diagnostic> {
    let Some(path) = path else {
        return Ok(Workset::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| Diagnostic::error(format!("cannot read {path}: {e}")))?;
    Workset::from_json(&text).map_err(|e| Diagnostic::error(format!("invalid workset {path}: {e}")))
}

fn emit(args: &Args, program: &Program, code: &[Instruction]) -> Result<String, Diagnostic> {
    Ok(match args.emit {
        Emit::Hex => code.iter().map(|ins| hex(ins) + "\n").collect(),
        Emit::Disasm => instruction::disassemble(code),
        Emit::Json => {
            let list: Vec<_> = code
                .iter()
                .map(|ins| serde_json::json!({ "bytes": hex(ins), "text": ins.to_string() }))
                .collect();
            serde_json::to_string_pretty(&serde_json::json!({ "instructions": list }))
                .map_err(|e| Diagnostic::error(e.to_string()))?
                + "\n"
        }
        Emit::Table => {
            let table = if args.cell {
                CommandTable::new(Vec::new(), Vec::new(), code.to_vec())
            } else {
                CommandTable::new(code.to_vec(), Vec::new(), Vec::new())
            };
            let bytes = table.and_then(|t| t.to_bytes()).map_err(|e| Diagnostic::from(&e))?;
            bytes.chunks(8).map(|c| c.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ") + "\n").collect()
        }
        Emit::Ast => serde_json::to_string_pretty(program).map_err(|e| Diagnostic::error(e.to_string()))? + "\n",
    })
}

fn run(args: &Args) -> Result<(), Diagnostic> {
    let script = args.script.as_deref().unwrap_or_default();
    let source = read_source(script)?;
    let program = dvdcmd::parse(&source)?;
    let workset = load_workset(args.workset.as_deref())?;
    let location = location(args);
    let options = CompilerOptions {
        jumppad: args.jumppad,
        allow_all_registers: args.allow_all_registers,
        optimize: !args.no_optimize,
    };
    let with_source = |e: compiler::CompileError| Diagnostic::from(&e).with_source(source.as_str());
    let (code, warnings) = if args.cell {
        let (ins, warnings) = compiler::compile_cell_command(&program, &location, &workset, &options).map_err(with_source)?;
        (vec![ins], warnings)
    } else {
        let block = compiler::compile_block(&program, &location, &workset, &options).map_err(with_source)?;
        (block.instructions, block.warnings)
    };
    for w in &warnings {
        report(args.diagnostics, &w.clone().with_source(source.as_str()));
    }
    log::info!("{} instructions", code.len());
    if args.verbose > 0 {
        report(args.diagnostics, &Diagnostic::stat(format!("{} of {} instructions used", code.len(), MAX_BLOCK_INSTRUCTIONS)));
    }

    print!("{}", emit(args, &program, &code)?);

    if args.run {
        let mut machine = Machine::new();
        let outcome = machine.run(&code).map_err(|e| Diagnostic::from(&e))?;
        println!("outcome: {outcome:?}");
        for (i, v) in machine.gprm.iter().enumerate().filter(|(_, v)| **v != 0) {
            println!("g{i} = {v}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if log::set_logger(&Logger).is_ok() {
        log::set_max_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        });
    }

    if args.list_codes {
        for entry in registry::REGISTRY {
            println!("{}  {}", entry.code, entry.short);
        }
        return ExitCode::SUCCESS;
    }
    if let Some(code) = &args.explain {
        return match registry::lookup(code) {
            Some(entry) => {
                print!("{}", entry.long);
                ExitCode::SUCCESS
            }
            None => {
                report(args.diagnostics, &Diagnostic::error(format!("unknown diagnostic code '{code}'")));
                ExitCode::FAILURE
            }
        };
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(d) => {
            report(args.diagnostics, &d);
            ExitCode::FAILURE
        }
    }
}
