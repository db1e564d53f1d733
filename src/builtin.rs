use std::path::Path;

use nix::unistd;

use crate::global;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow { Continue, Exit }

pub type Builtin = fn(&mut global::State, &[String]) -> Flow;

pub fn builtin_cd(_: &mut global::State, args: &[String]) -> Flow {
	match args.get(1) {
		None => eprintln!("zosh: expected argument to \"cd\""),
		Some(path) => {
			if let Err(e) = unistd::chdir(Path::new(path)) {
				eprintln!("zosh: cd: {}: {}", path, e.desc());
			}
		},
	}
	Flow::Continue
}

pub fn builtin_exit(_: &mut global::State, _: &[String]) -> Flow {
	Flow::Exit
}

pub fn builtin_jobs(state: &mut global::State, _: &[String]) -> Flow {
	state.notify_done_jobs();
	for job in state.job_set.iter() {
		println!("[{}]  Running    {}", job.id, job.command);
	}
	Flow::Continue
}

pub fn lookup(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"exit" => Some(builtin_exit),
		"jobs" => Some(builtin_jobs),
		_ => None,
	}
}
