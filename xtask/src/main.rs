// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use std::env;
use std::path::PathBuf;
use std::process::Command;

const FIRMWARE_PACKAGE: &str = "smartcrib-fw";
const LOADCELL_PACKAGE: &str = "smartcrib-loadcell";
const FIRMWARE_TARGET: &str = "thumbv6m-none-eabi";
const CHIP: &str = "RP2040";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Board {
    CribRev1,
    CribFlat,
}

impl Board {
    fn feature(&self) -> &'static str {
        match self {
            Board::CribRev1 => "crib_rev1",
            Board::CribFlat => "crib_flat",
        }
    }
}

#[derive(Debug)]
enum Command_ {
    Build(Board),
    Flash(Board),
    Run(Board),
    Attach,
    Test,
    Help,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = match parse_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error parsing command: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = execute_command(command) {
        eprintln!("Error executing command: {}", e);
        std::process::exit(1);
    }
}

fn parse_command(args: &[String]) -> Result<Command_, String> {
    if args.is_empty() {
        return Err("No command provided".to_string());
    }

    let board = || -> Result<Board, String> {
        match args.get(1) {
            Some(board) => parse_board(board),
            None => Ok(Board::CribRev1),
        }
    };

    match args[0].as_str() {
        "build" => Ok(Command_::Build(board()?)),
        "flash" => Ok(Command_::Flash(board()?)),
        "run" => Ok(Command_::Run(board()?)),
        "attach" => Ok(Command_::Attach),
        "test" => Ok(Command_::Test),
        "help" | "--help" | "-h" => Ok(Command_::Help),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_board(board: &str) -> Result<Board, String> {
    match board {
        "rev1" => Ok(Board::CribRev1),
        "flat" => Ok(Board::CribFlat),
        _ => Err(format!("Unknown board: {}", board)),
    }
}

fn execute_command(cmd: Command_) -> Result<(), String> {
    match cmd {
        Command_::Build(board) => {
            println!("Building firmware for {:?}...", board);
            run_cargo_firmware("build", board)?;
            generate_bin()?;
            println!("✓ Firmware built successfully");
        }
        Command_::Flash(board) => {
            println!("Building and flashing firmware for {:?}...", board);
            run_cargo_flash(board)?;
            println!("✓ Firmware flashed successfully");
        }
        Command_::Run(board) => {
            println!("Building and running firmware for {:?}...", board);
            run_cargo_firmware("run", board)?;
        }
        Command_::Attach => {
            run_probe_rs_attach()?;
        }
        Command_::Test => {
            println!("Running load cell driver tests on the host...");
            run_host_tests()?;
            println!("✓ Tests passed");
        }
        Command_::Help => print_usage(),
    }
    Ok(())
}

fn firmware_args(board: Board) -> Vec<&'static str> {
    vec![
        "--release",
        "--package",
        FIRMWARE_PACKAGE,
        "--target",
        FIRMWARE_TARGET,
        "--no-default-features",
        "--features",
        board.feature(),
    ]
}

fn run_cargo_firmware(subcommand: &str, board: Board) -> Result<(), String> {
    let status = Command::new("cargo")
        .arg(subcommand)
        .args(firmware_args(board))
        .status()
        .map_err(|e| format!("Failed to run cargo {}: {}", subcommand, e))?;

    if !status.success() {
        return Err(format!("cargo {} failed for {}", subcommand, FIRMWARE_PACKAGE));
    }
    Ok(())
}

fn run_cargo_flash(board: Board) -> Result<(), String> {
    let status = Command::new("cargo")
        .arg("flash")
        .args(firmware_args(board))
        .args(["--chip", CHIP])
        .status()
        .map_err(|e| format!("Failed to run cargo flash: {}", e))?;

    if !status.success() {
        return Err(format!("Flash failed for {}", FIRMWARE_PACKAGE));
    }
    Ok(())
}

fn run_host_tests() -> Result<(), String> {
    let status = Command::new("cargo")
        .args(["test", "--package", LOADCELL_PACKAGE])
        .status()
        .map_err(|e| format!("Failed to run cargo test: {}", e))?;

    if !status.success() {
        return Err(format!("Tests failed for {}", LOADCELL_PACKAGE));
    }
    Ok(())
}

fn elf_path() -> PathBuf {
    PathBuf::from(format!(
        "target/{}/release/{}",
        FIRMWARE_TARGET, FIRMWARE_PACKAGE
    ))
}

fn generate_bin() -> Result<(), String> {
    let elf_path = elf_path();
    let bin_path = elf_path.with_extension("bin");

    if !elf_path.exists() {
        return Err(format!("ELF binary not found at {}", elf_path.display()));
    }

    let output = Command::new("arm-none-eabi-objcopy")
        .arg("-O")
        .arg("binary")
        .arg(&elf_path)
        .arg(&bin_path)
        .output()
        .map_err(|e| {
            format!(
                "Failed to run arm-none-eabi-objcopy: {}. Make sure arm-none-eabi-objcopy is installed.",
                e
            )
        })?;

    if !output.status.success() {
        return Err(format!(
            "Failed to generate .bin file:\n{}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    println!("✓ Generated {}", bin_path.display());
    Ok(())
}

fn run_probe_rs_attach() -> Result<(), String> {
    let elf_path = elf_path();

    if !elf_path.exists() {
        return Err(format!(
            "ELF binary not found at {}. Build the project first using 'cargo xtask build'.",
            elf_path.display()
        ));
    }

    let status = Command::new("probe-rs")
        .args(["attach", "--chip", CHIP])
        .arg(&elf_path)
        .status()
        .map_err(|e| format!("Failed to run probe-rs attach: {}", e))?;

    if !status.success() {
        return Err("probe-rs attach failed".to_string());
    }
    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage: cargo xtask <COMMAND> [BOARD]\n\
         \n\
         Commands:\n\
         \tbuild       Build the firmware and generate a .bin file\n\
         \tflash       Build and flash the firmware\n\
         \trun         Build, flash and stream defmt logs with probe-rs\n\
         \tattach      Attach probe-rs to a running firmware\n\
         \ttest        Run the load cell driver tests on the host\n\
         \thelp        Show this help message\n\
         \n\
         Boards:\n\
         \trev1        Four corner crib board, rev 1 pinout (default)\n\
         \tflat        Flat bed board pinout\n\
         \n\
         Examples:\n\
         \tcargo xtask build\n\
         \tcargo xtask flash flat\n\
         \tcargo xtask run rev1\n\
         \tcargo xtask test"
    );
}
