#[macro_use]
extern crate clap;

use clap::Arg;
use mos6502::disasm::{disassemble, DisasmOptions};
use std::fs::File;
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum IOErrorContext {
    WriteProgram,
    WriteDebugInfo,
    WriteListing,
}

#[derive(Debug)]
enum Error {
    Io(std::io::Error, IOErrorContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::WriteProgram => "Writing program",
                    IOErrorContext::WriteDebugInfo => "Writing debug info",
                    IOErrorContext::WriteListing => "Writing listing",
                },
                path.display(),
                err
            ),
        }
    }
}

fn main() {
    env_logger::init();

    // Parse command line arguments
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to"),
        )
        .arg(
            Arg::with_name("debug_info")
                .short("g")
                .long("debug-info")
                .takes_value(true)
                .value_name("DEBUG_INFO")
                .help("Sets the file to write debug info to"),
        )
        .arg(
            Arg::with_name("disasm")
                .short("d")
                .long("disasm")
                .takes_value(true)
                .value_name("LISTING")
                .help("Sets the file to write a disassembly listing to"),
        )
        .arg(
            Arg::with_name("cycles")
                .short("c")
                .long("cycles")
                .help("Annotates the disassembly listing with cycle counts"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output");
    let debug_info = matches.value_of("debug_info");
    let disasm = matches.value_of("disasm");
    let cycles = matches.is_present("cycles");

    let result = c64asm::assemble_file(input);
    for line in result.formatted_diagnostics() {
        eprintln!("{}", line);
    }
    if result.has_errors() {
        std::process::exit(1);
    }

    if let Err(err) = write_outputs(&result, input, output, debug_info, disasm, cycles) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn write_outputs(
    result: &c64asm::AssembleResult,
    input: &str,
    output: Option<&str>,
    debug_info: Option<&str>,
    disasm: Option<&str>,
    cycles: bool,
) -> Result<(), Error> {
    let program = result.program.as_ref().unwrap();
    let info = result.debug_info.as_ref().unwrap();

    let output_path: PathBuf = output
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(input).with_extension("prg"));

    prgfile::write_file(&output_path, program)
        .map_err(|err| Error::Io(err, IOErrorContext::WriteProgram, output_path.clone()))?;

    if let Some(path_str) = debug_info {
        let path = PathBuf::from(path_str);
        write_debug_info(info, &path)
            .map_err(|err| Error::Io(err, IOErrorContext::WriteDebugInfo, path))?;
    }

    if let Some(path_str) = disasm {
        let path = PathBuf::from(path_str);
        write_listing(program, info, cycles, &path)
            .map_err(|err| Error::Io(err, IOErrorContext::WriteListing, path))?;
    }

    Ok(())
}

fn write_debug_info(info: &c64asm::DebugInfo, path: &PathBuf) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    info.write(&mut writer)
}

fn write_listing(
    program: &prgfile::Program,
    info: &c64asm::DebugInfo,
    cycles: bool,
    path: &PathBuf,
) -> std::io::Result<()> {
    let options = DisasmOptions {
        show_cycles: cycles,
        show_labels: true,
        labels: info.label_addresses(),
    };
    let predicate = |offset: usize| info.is_instruction(offset);
    let lines = disassemble(
        program.bytes(),
        program.load_address(),
        Some(&predicate),
        &options,
    );

    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    Ok(())
}
