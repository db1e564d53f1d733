use std::convert::Infallible;
use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use tracing::debug;

use crate::builtin::{self, Flow};
use crate::error::{ChildError, ExecError};
use crate::global;
use crate::job;
use crate::parser;
use crate::types::*;

// N-1 pipes for an N-stage pipeline. Dropping the set closes every end.
pub struct PipeSet {
	pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
	pub fn new(count: usize) -> nix::Result<PipeSet> {
		let mut pipes = Vec::with_capacity(count);
		for _ in 0 .. count {
			pipes.push(unistd::pipe()?);
		}
		Ok(PipeSet { pipes: pipes })
	}

	fn read_end(&self, i: usize) -> RawFd {
		self.pipes[i].0.as_raw_fd()
	}

	fn write_end(&self, i: usize) -> RawFd {
		self.pipes[i].1.as_raw_fd()
	}

	// Child side only: the child execs or exits right after, so the owned
	// handles are never dropped there.
	fn close_raw(&self) {
		for &(ref r, ref w) in &self.pipes {
			let _ = unistd::close(r.as_raw_fd());
			let _ = unistd::close(w.as_raw_fd());
		}
	}
}

enum Source<'a> { Inherit, Pipe(RawFd), File(&'a str) }

enum Sink<'a> { Inherit, Pipe(RawFd), File(&'a str, OutputMode) }

fn to_argv(command: &Command) -> Result<Vec<CString>, ExecError> {
	let argv: Result<Vec<CString>, _> = command.argv.iter().map(|s| CString::new(s.as_bytes())).collect();
	Ok(argv?)
}

fn redirect_file(path: &str, flags: OFlag, target: RawFd) -> Result<(), ChildError> {
	let fd = fcntl::open(Path::new(path), flags, Mode::from_bits_truncate(0o644))
		.map_err(|errno| ChildError::Open { path: path.to_string(), errno: errno })?;
	unistd::dup2(fd, target).map_err(|errno| ChildError::Dup { errno: errno })?;
	let _ = unistd::close(fd);
	Ok(())
}

fn do_exec_stage(argv: &[CString], name: &str, source: Source, sink: Sink, pipes: &PipeSet) -> Result<Infallible, ChildError> {
	match source {
		Source::Inherit => {},
		Source::Pipe(fd) => { unistd::dup2(fd, libc::STDIN_FILENO).map_err(|errno| ChildError::Dup { errno: errno })?; },
		Source::File(path) => redirect_file(path, OFlag::O_RDONLY, libc::STDIN_FILENO)?,
	}
	match sink {
		Sink::Inherit => {},
		Sink::Pipe(fd) => { unistd::dup2(fd, libc::STDOUT_FILENO).map_err(|errno| ChildError::Dup { errno: errno })?; },
		Sink::File(path, OutputMode::Truncate) =>
			redirect_file(path, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, libc::STDOUT_FILENO)?,
		Sink::File(path, OutputMode::Append) =>
			redirect_file(path, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, libc::STDOUT_FILENO)?,
	}
	pipes.close_raw();
	match unistd::execvp(&argv[0], argv) {
		Err(Errno::ENOENT) => Err(ChildError::NotFound { name: name.to_string() }),
		Err(errno) => Err(ChildError::Exec { name: name.to_string(), errno: errno }),
		Ok(never) => match never {},
	}
}

fn exec_stage(argv: &[CString], name: &str, source: Source, sink: Sink, pipes: &PipeSet) -> ! {
	unsafe {
		let _ = signal::signal(Signal::SIGINT, SigHandler::SigDfl);
		let _ = signal::signal(Signal::SIGQUIT, SigHandler::SigDfl);
	}
	let status = match do_exec_stage(argv, name, source, sink, pipes) {
		Ok(never) => match never {},
		Err(e) => {
			eprintln!("zosh: {}", e);
			e.status()
		},
	};
	unsafe { libc::_exit(status) }
}

// Background stages all join the process group of the first stage. Both
// sides call setpgid so neither exec nor the next fork can race it.
fn join_group(pid: Pid, job_builder: &job::JobBuilder) -> nix::Result<()> {
	let pgid = job_builder.pgid().unwrap_or(pid);
	unistd::setpgid(pid, pgid)
}

fn spawn_stage(argv: &[CString], name: &str, source: Source, sink: Sink, pipes: &PipeSet,
               is_background: bool, job_builder: &mut job::JobBuilder) -> nix::Result<Pid> {
	match unsafe { unistd::fork() }? {
		ForkResult::Parent { child } => {
			if is_background {
				// EACCES: the child has already exec'ed and joined on its own.
				match join_group(child, job_builder) {
					Ok(()) | Err(Errno::EACCES) => {},
					Err(e) => debug!(pid = child.as_raw(), error = %e, "setpgid failed"),
				}
				if job_builder.pgid().is_none() {
					job_builder.set_pgid(child);
				}
			}
			job_builder.push(child);
			debug!(pid = child.as_raw(), command = name, background = is_background, "spawned");
			Ok(child)
		},
		ForkResult::Child => {
			if is_background {
				let _ = join_group(unistd::getpid(), job_builder);
			}
			exec_stage(argv, name, source, sink, pipes)
		},
	}
}

fn launch_single(state: &mut global::State, pipeline: &Pipeline) -> Result<(), ExecError> {
	let command = &pipeline.commands[0];
	let argv = to_argv(command)?;
	let source = match pipeline.redirect.input {
		Some(ref path) => Source::File(path),
		None => Source::Inherit,
	};
	let sink = match pipeline.redirect.output {
		Some((ref path, mode)) => Sink::File(path, mode),
		None => Sink::Inherit,
	};
	let no_pipes = PipeSet::new(0)?;
	let mut job_builder = job::JobBuilder::new(1, pipeline.describe());
	spawn_stage(&argv, command.name(), source, sink, &no_pipes, pipeline.is_background, &mut job_builder)?;
	finish_job(state, job_builder, pipeline.is_background);
	Ok(())
}

fn spawn_pipeline(argvs: &[Vec<CString>], pipeline: &Pipeline, pipes: &PipeSet,
                  job_builder: &mut job::JobBuilder) -> nix::Result<()> {
	let last = argvs.len() - 1;
	for (i, argv) in argvs.iter().enumerate() {
		let source = if i > 0 {
			Source::Pipe(pipes.read_end(i - 1))
		} else {
			match pipeline.redirect.input {
				Some(ref path) => Source::File(path),
				None => Source::Inherit,
			}
		};
		let sink = if i < last {
			Sink::Pipe(pipes.write_end(i))
		} else {
			match pipeline.redirect.output {
				Some((ref path, mode)) => Sink::File(path, mode),
				None => Sink::Inherit,
			}
		};
		spawn_stage(argv, pipeline.commands[i].name(), source, sink, pipes, pipeline.is_background, job_builder)?;
	}
	Ok(())
}

fn launch_pipeline(state: &mut global::State, pipeline: &Pipeline) -> Result<(), ExecError> {
	let argvs: Result<Vec<Vec<CString>>, ExecError> = pipeline.commands.iter().map(to_argv).collect();
	let argvs = argvs?;
	let pipes = PipeSet::new(argvs.len() - 1)?;
	let mut job_builder = job::JobBuilder::new(argvs.len(), pipeline.describe());
	let spawned = spawn_pipeline(&argvs, pipeline, &pipes, &mut job_builder);
	drop(pipes);
	// Stages forked before a failure are still tracked and waited for.
	finish_job(state, job_builder, pipeline.is_background);
	spawned.map_err(ExecError::from)
}

fn finish_job(state: &mut global::State, job_builder: job::JobBuilder, is_background: bool) {
	if job_builder.is_empty() {
		return;
	}
	let job = state.job_set.push(job_builder.build());
	let id = job.id;
	if is_background {
		if let Some(pid) = job.last_pid() {
			println!("[{}] {}", id, pid);
		}
		return;
	}
	if let Some(job) = state.job_set.get_mut(id) {
		job.wait();
	}
	state.job_set.remove(id);
}

pub fn launch(state: &mut global::State, pipeline: &Pipeline) -> Result<(), ExecError> {
	debug!(stages = pipeline.commands.len(), background = pipeline.is_background,
	       redirect = ?pipeline.redirect, "launching");
	if pipeline.commands.len() > 1 {
		launch_pipeline(state, pipeline)
	} else {
		launch_single(state, pipeline)
	}
}

pub fn eval(state: &mut global::State, tokens: Vec<String>) -> Flow {
	let name = match tokens.first() {
		Some(name) => name,
		None => { return Flow::Continue; },
	};
	if let Some(func) = builtin::lookup(name) {
		return func(state, &tokens);
	}
	let pipeline = match parser::parse(tokens) {
		Ok(pipeline) => pipeline,
		Err(e) => {
			eprintln!("zosh: {}", e);
			return Flow::Continue;
		},
	};
	if let Err(e) = launch(state, &pipeline) {
		eprintln!("zosh: {}", e);
	}
	Flow::Continue
}
