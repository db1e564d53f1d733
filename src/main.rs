mod builtin;
mod config;
mod error;
mod eval;
mod global;
mod interrupt;
mod job;
mod parser;
mod types;

use std::io;
use std::process::ExitCode;
use io::Write;
use io::BufRead;

use nix::sys::signal::{self, SigHandler, Signal};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use builtin::Flow;
use config::{Config, Mode};

fn ignore_interrupts() {
	// Children restore the defaults before exec.
	for &sig in &[Signal::SIGINT, Signal::SIGQUIT] {
		if let Err(e) = unsafe { signal::signal(sig, SigHandler::SigIgn) } {
			warn!(signal = ?sig, error = %e, "could not ignore signal");
		}
	}
}

fn run_loop(config: &Config, state: &mut global::State) -> anyhow::Result<()> {
	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		state.notify_done_jobs();
		let prompt = config.render_prompt();
		interrupt::set_prompt(Some(&prompt));
		let _ = stdout.write_all(prompt.as_bytes());
		let _ = stdout.flush();
		let mut line: Vec<u8> = vec![];
		let read = stdin_locked.read_until(b'\n', &mut line);
		interrupt::set_prompt(None);
		if read? == 0 {
			return Ok(());
		}
		let tokens = parser::tokenize(&String::from_utf8_lossy(&line));
		if eval::eval(state, tokens) == Flow::Exit {
			return Ok(());
		}
	}
}

fn main() -> ExitCode {
	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(io::stderr))
		.with(EnvFilter::from_default_env())
		.init();

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			eprintln!("zosh: {}\n{}", e, config::USAGE);
			return ExitCode::from(2);
		},
	};

	let mut state = global::State::new();
	match config.mode {
		Mode::Help => println!("{}", config::USAGE),
		Mode::Version => println!("zosh {}", env!("CARGO_PKG_VERSION")),
		Mode::Command(ref line) => {
			ignore_interrupts();
			eval::eval(&mut state, parser::tokenize(line));
		},
		Mode::Interactive => {
			ignore_interrupts();
			if let Err(e) = interrupt::install() {
				warn!(error = %e, "could not install SIGINT handler");
			}
			if let Err(e) = run_loop(&config, &mut state) {
				eprintln!("zosh: {:?}", e);
				return ExitCode::FAILURE;
			}
		},
	}
	ExitCode::SUCCESS
}
