use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

// Prompt redrawn on ^C; null while a command line is executing.
static PROMPT: AtomicPtr<Vec<u8>> = AtomicPtr::new(ptr::null_mut());

extern "C" fn handle_sigint(_: libc::c_int) {
	let newline = b"\n";
	unsafe {
		libc::write(libc::STDOUT_FILENO, newline.as_ptr().cast(), newline.len());
		let prompt = PROMPT.load(Ordering::SeqCst);
		if !prompt.is_null() {
			let bytes = &*prompt;
			libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len());
		}
	}
}

pub fn install() -> nix::Result<()> {
	let action = SigAction::new(SigHandler::Handler(handle_sigint), SaFlags::SA_RESTART, SigSet::empty());
	unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
	Ok(())
}

// The handler runs on the same thread, so it has either finished with the
// old prompt or will only ever see the new one by the time it is freed.
pub fn set_prompt(prompt: Option<&str>) {
	let new = match prompt {
		Some(p) => Box::into_raw(Box::new(p.as_bytes().to_vec())),
		None => ptr::null_mut(),
	};
	let old = PROMPT.swap(new, Ordering::SeqCst);
	if !old.is_null() {
		drop(unsafe { Box::from_raw(old) });
	}
}
