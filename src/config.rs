use std::env;

use thiserror::Error;

pub const USAGE: &str = "usage: zosh [-c LINE] [-h|--help] [-V|--version]";

const PROMPT_KEY: &str = "ZOSH_PROMPT";
const DEFAULT_PROMPT: &str = "zosh";

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Mode {
	Interactive,
	Command(String),
	Help,
	Version,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Config {
	pub mode: Mode,
	pub prompt: String,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum UsageError {
	#[error("-c requires a command argument")]
	MissingCommand,
	#[error("unknown option: {0}")]
	UnknownOption(String),
}

impl Config {
	pub fn from_env() -> Result<Config, UsageError> {
		let prompt = env::var(PROMPT_KEY).ok();
		Config::from_args(env::args().skip(1), prompt)
	}

	pub fn from_args<I>(args: I, prompt: Option<String>) -> Result<Config, UsageError>
		where I: IntoIterator<Item = String> {
		let mut args = args.into_iter();
		let mode = match args.next() {
			None => Mode::Interactive,
			Some(arg) => match arg.as_str() {
				"-c" => Mode::Command(args.next().ok_or(UsageError::MissingCommand)?),
				"-h" | "--help" => Mode::Help,
				"-V" | "--version" => Mode::Version,
				_ => { return Err(UsageError::UnknownOption(arg)); },
			},
		};
		let prompt = prompt.filter(|p| !p.is_empty()).unwrap_or_else(|| DEFAULT_PROMPT.to_string());
		Ok(Config { mode: mode, prompt: prompt })
	}

	pub fn render_prompt(&self) -> String {
		match env::current_dir() {
			Ok(cwd) => format!("{}:{}> ", self.prompt, cwd.display()),
			Err(_) => format!("{}> ", self.prompt),
		}
	}
}
