#![deny(unsafe_code)]

//! `--generate-keys=<role>`: chooses a safe prime `N`, a random private
//! key `K`, computes `X = G^K mod N`, and prints the three as base-64
//! alongside the role's fixed `G`, ready to paste into `[crypt]`.

use std::io::Write;
use std::{env, io, process::ExitCode};

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};

use crypt::{KeySet, Role};

const OK: i32 = 0;
const USAGE: i32 = 1;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Auth,
    Db,
    Game,
    Gate,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Auth => Role::Auth,
            RoleArg::Db => Role::Db,
            RoleArg::Game => Role::Game,
            RoleArg::Gate => Role::Gate,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "shard-keygen", version, about = "Generates DH key material for one daemon role")]
struct Args {
    /// The daemon role this key material is for.
    #[arg(long = "generate-keys", value_enum)]
    role: RoleArg,

    /// Bit width of the generated safe prime `N`.
    #[arg(long, default_value_t = 512)]
    bits: u64,
}

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let status = run(env::args_os(), &mut stdout, &mut stderr);
    ExitCode::from(status.clamp(0, i32::from(u8::MAX)) as u8)
}

fn run<I, S, Out, ErrW>(arguments: I, stdout: &mut Out, stderr: &mut ErrW) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString>,
    Out: Write,
    ErrW: Write,
{
    let args: Vec<std::ffi::OsString> = arguments.into_iter().map(Into::into).collect();
    let parsed = match Args::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(error) => {
            return match error.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                | ErrorKind::DisplayVersion => {
                    let _ = write!(stdout, "{error}");
                    OK
                }
                _ => {
                    let _ = write!(stderr, "{error}");
                    USAGE
                }
            };
        }
    };

    let role: Role = parsed.role.into();
    let keys = KeySet::generate(role, parsed.bits);
    let (k, n, x) = keys.to_base64();
    let _ = writeln!(stdout, "k = {k}");
    let _ = writeln!(stdout, "n = {n}");
    let _ = writeln!(stdout, "x = {x}");
    let _ = writeln!(stdout, "g = {}", role.generator());
    OK
}
