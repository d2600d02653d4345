use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use braid::{assemble, Halt, MemImage, Register, RunState, StaticSource};

/// Braid is an assembler and virtual machine toolchain for a toy 16-bit assembly language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a source file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file, run it, and print the final registers
    Run {
        /// Source file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a source file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Place a watch on a source file to receive constant assembler updates
    Watch {
        /// Source file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    braid::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(braid::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    if let Some(command) = args.command {
        match command {
            Command::Run { name, minimal } => {
                run(&name, minimal)?;
                Ok(())
            }
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                let contents = StaticSource::new(fs::read_to_string(&name).into_diagnostic()?);
                let image = assemble(contents.src())?;
                message(Green, "Success", &format!("emitted {} words", image.len()));
                Ok(())
            }
            Command::Watch { name } => {
                if !name.exists() {
                    bail!("File does not exist. Exiting...")
                }
                // Vim breaks if watching a single file
                let folder_path = match name.parent() {
                    Some(pth) if pth.is_dir() => pth.to_path_buf(),
                    _ => Path::new(".").to_path_buf(),
                };

                // Clear screen and move cursor to top left
                print!("\x1B[2J\x1B[2;1H");
                file_message(Green, "Watching", &name);
                message(Cyan, "Help", "press CTRL+C to exit");

                let mut watcher = Hotwatch::new_with_custom_delay(Duration::from_millis(500))
                    .into_diagnostic()?;

                watcher
                    .watch(folder_path, move |event: Event| match event.kind {
                        // Watch remove for vim changes
                        EventKind::Modify(_) | EventKind::Remove(_) => {
                            // Clear screen
                            print!("\x1B[2J\x1B[2;1H");
                            file_message(Green, "Watching", &name);
                            message(Green, "Re-checking", "file change detected");
                            message(Cyan, "Help", "press CTRL+C to exit");

                            // Makes reruns more obvious
                            sleep(Duration::from_millis(50));

                            let contents = StaticSource::new(match fs::read_to_string(&name) {
                                Ok(cts) => cts,
                                Err(e) => {
                                    eprintln!("{e}. Exiting...");
                                    std::process::exit(1)
                                }
                            });
                            match assemble(contents.src()) {
                                Ok(_) => {
                                    message(Green, "Success", "no errors found!");
                                }
                                Err(e) => {
                                    println!("\n{:?}", e);
                                }
                            };

                            // To avoid leaking memory
                            contents.reclaim();
                            Flow::Continue
                        }
                        _ => Flow::Continue,
                    })
                    .into_diagnostic()?;
                watcher.run();
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(&path, false)?;
        Ok(())
    } else {
        println!("\n~ braid v{VERSION} ~");
        println!("{}", LOGO.truecolor(183, 201, 255).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    }
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &PathBuf) {
    let right = format!("target {}", right.to_str().unwrap());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &PathBuf, minimal: bool) -> Result<()> {
    use MsgColor::*;
    if !minimal {
        file_message(Green, "Assembling", name);
    }
    let contents = StaticSource::new(fs::read_to_string(name).into_diagnostic()?);
    let image: MemImage = assemble(contents.src())?;

    let mut state = RunState::from_image(image);
    state.set_trace(braid::env::is_trace_enabled());

    if !minimal {
        message(Green, "Running", "assembled program");
    }
    let halt = state.run();

    if !minimal {
        match halt {
            Halt::Normal => message(Cyan, "Halted", "program finished"),
            Halt::UnknownOpcode { addr, word } => message(
                Red,
                "Faulted",
                &format!("unknown opcode {word} at address {addr}"),
            ),
            Halt::BadRegister { addr, word } => message(
                Red,
                "Faulted",
                &format!("invalid register id {word} at address {addr}"),
            ),
        }
    }
    print_registers(&state, minimal);
    if !minimal {
        file_message(Green, "Completed", name);
    }
    Ok(())
}

fn print_registers(state: &RunState, minimal: bool) {
    if minimal {
        for reg in [Register::Ax, Register::Bx, Register::Cx, Register::Flags] {
            println!("{reg}: {}", state.reg(reg));
        }
        return;
    }
    println!("\n------ Registers ------");
    for reg in Register::ALL {
        println!("{reg:>6}: {:.>15}", state.reg(reg));
    }
    println!("-----------------------");
}

const LOGO: &str = r#"
 |       |       |
  \     /|\     /
   |   / | \   |
    \ /  |  \ /
     X   |   X
    / \  |  / \
   |   \ | /   |
  /     \|/     \
 |       |       |"#;

const SHORT_INFO: &str = r"
Welcome to braid, a tiny assembler and 16-bit virtual machine toolchain.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
