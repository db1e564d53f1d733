use std::ffi;

use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum SyntaxError {
	#[error("syntax error: missing filename after '{0}'")]
	MissingTarget(&'static str),
	#[error("syntax error: more than one {0} redirection")]
	DuplicateRedirect(&'static str),
	#[error("syntax error near unexpected token '{0}'")]
	UnexpectedToken(&'static str),
	#[error("syntax error: empty command")]
	EmptyCommand,
}

#[derive(Debug, Error)]
pub enum ExecError {
	#[error("{0}")]
	Nix(#[from] nix::Error),
	#[error("argument contains a nul byte: {0}")]
	Nul(#[from] ffi::NulError),
}

// Failures inside a forked child, reported by the child itself before it exits.
#[derive(Debug, Error)]
pub enum ChildError {
	#[error("{path}: {}", .errno.desc())]
	Open { path: String, errno: nix::Error },
	#[error("dup2: {}", .errno.desc())]
	Dup { errno: nix::Error },
	#[error("{name}: command not found")]
	NotFound { name: String },
	#[error("{name}: {}", .errno.desc())]
	Exec { name: String, errno: nix::Error },
}

impl ChildError {
	pub fn status(&self) -> i32 {
		match *self {
			ChildError::NotFound { .. } => 127,
			ChildError::Exec { .. } => 126,
			ChildError::Open { .. } | ChildError::Dup { .. } => 1,
		}
	}
}
