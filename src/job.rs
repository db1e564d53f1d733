use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Running, Done }

trait WaitStatusExt {
	fn state(self) -> State;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => State::Done,
			_ => State::Running,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub state: State,
}

#[derive(Debug)]
pub struct Job {
	pub id: usize,
	pub pgid: Option<Pid>,
	pub processes: Vec<Process>,
	pub command: String,
}

impl Job {
	pub fn state(&self) -> State {
		self.processes.iter().map(|pr| pr.state).min().unwrap_or(State::Done)
	}

	pub fn last_pid(&self) -> Option<Pid> {
		self.processes.last().map(|pr| pr.pid)
	}

	fn mark(&mut self, pid: Pid, state: State) {
		if let Some(pr) = self.processes.iter_mut().find(|pr| pr.pid == pid) {
			pr.state = state;
		}
	}

	// Blocks on each of this job's own pids in turn; other children of the
	// shell, such as background jobs, are never reaped here.
	pub fn wait(&mut self) {
		let pids: Vec<Pid> = self.processes.iter()
			.filter(|pr| pr.state == State::Running)
			.map(|pr| pr.pid)
			.collect();
		for pid in pids {
			let state = loop {
				match wait::waitpid(pid, None) {
					Ok(status) => {
						debug!(pid = pid.as_raw(), ?status, "reaped");
						if status.state() == State::Done {
							break State::Done;
						}
					},
					Err(Errno::EINTR) => continue,
					Err(Errno::ECHILD) => break State::Done,
					Err(e) => {
						warn!(pid = pid.as_raw(), error = %e, "waitpid failed");
						break State::Done;
					},
				}
			};
			self.mark(pid, state);
		}
	}

	fn poll(&mut self) {
		let pids: Vec<Pid> = self.processes.iter()
			.filter(|pr| pr.state == State::Running)
			.map(|pr| pr.pid)
			.collect();
		for pid in pids {
			match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) => {},
				Ok(status) => {
					debug!(pid = pid.as_raw(), ?status, "reaped background process");
					self.mark(pid, status.state());
				},
				Err(Errno::ECHILD) => self.mark(pid, State::Done),
				Err(e) => warn!(pid = pid.as_raw(), error = %e, "waitpid failed"),
			}
		}
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(size_hint: usize, command: String) -> JobBuilder {
		JobBuilder {
			imp: Job { id: 0, pgid: None, processes: Vec::with_capacity(size_hint), command: command }
		}
	}

	pub fn pgid(&self) -> Option<Pid> {
		self.imp.pgid
	}

	pub fn set_pgid(&mut self, pgid: Pid) {
		self.imp.pgid = Some(pgid);
	}

	pub fn push(&mut self, pid: Pid) {
		self.imp.processes.push(Process { pid: pid, state: State::Running });
	}

	pub fn is_empty(&self) -> bool {
		self.imp.processes.is_empty()
	}

	pub fn build(self) -> Job {
		self.imp
	}
}

#[derive(Debug, Default)]
pub struct JobSet {
	jobs: Vec<Option<Job>>,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet { jobs: Vec::new() }
	}

	// Takes the lowest free slot; the job id is the slot index plus one.
	pub fn push(&mut self, mut job: Job) -> &Job {
		let idx = match self.jobs.iter().position(Option::is_none) {
			Some(i) => i,
			None => {
				self.jobs.push(None);
				self.jobs.len() - 1
			},
		};
		job.id = idx + 1;
		debug!(id = job.id, pgid = ?job.pgid, command = %job.command, live = self.len() + 1, "job added");
		self.jobs[idx].get_or_insert(job)
	}

	pub fn remove(&mut self, id: usize) -> Option<Job> {
		let job = self.jobs.get_mut(id.wrapping_sub(1)).and_then(Option::take);
		let len = self.jobs.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
		self.jobs.truncate(len);
		if let Some(ref job) = job {
			debug!(id = job.id, "job removed");
		}
		job
	}

	pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
		self.jobs.get_mut(id.wrapping_sub(1)).and_then(Option::as_mut)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Job> {
		self.jobs.iter().flatten()
	}

	pub fn len(&self) -> usize {
		self.iter().count()
	}

	// Polls every tracked process without blocking and hands back the jobs
	// that have finished, removed from the table.
	pub fn reap(&mut self) -> Vec<Job> {
		for job in self.jobs.iter_mut().flatten() {
			job.poll();
		}
		let done: Vec<usize> = self.iter()
			.filter(|job| job.state() == State::Done)
			.map(|job| job.id)
			.collect();
		done.into_iter().filter_map(|id| self.remove(id)).collect()
	}
}
