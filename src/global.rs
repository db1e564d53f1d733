use crate::job;

pub struct State {
	pub job_set: job::JobSet,
}

impl State {
	pub fn new() -> State {
		let job_set = job::JobSet::new();
		State { job_set: job_set }
	}

	// Announces and forgets background jobs that finished since the last prompt.
	pub fn notify_done_jobs(&mut self) {
		for job in self.job_set.reap() {
			println!("[{}]+  Done    {}", job.id, job.command);
		}
	}
}
