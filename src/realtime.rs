//! Keep the bit-banged timing from being preempted or paged out

use std::io;

use libc::{
	MCL_CURRENT,
	MCL_FUTURE,
	SCHED_FIFO,
	mlockall,
	munlockall,
	sched_get_priority_max,
	sched_getparam,
	sched_getscheduler,
	sched_param,
	sched_setscheduler,
};

use crate::AResult;

/// SCHED_FIFO with all memory locked while alive; the previous policy is
/// restored on drop.
pub struct Realtime {
	policy: libc::c_int,
	param: sched_param,
}

impl Realtime {
	pub fn enter() -> AResult<Self> {
		let policy = unsafe { sched_getscheduler(0) };
		if policy < 0 {
			bail!("sched_getscheduler failed: {}", io::Error::last_os_error());
		}
		let mut param = sched_param { sched_priority: 0 };
		if 0 != unsafe { sched_getparam(0, &mut param) } {
			bail!("sched_getparam failed: {}", io::Error::last_os_error());
		}

		let priority = unsafe { sched_get_priority_max(SCHED_FIFO) };
		if priority < 0 {
			bail!("sched_get_priority_max failed: {}", io::Error::last_os_error());
		}
		let fifo = sched_param { sched_priority: priority };
		if 0 != unsafe { sched_setscheduler(0, SCHED_FIFO, &fifo) } {
			bail!("Couldn't switch to SCHED_FIFO (missing CAP_SYS_NICE?): {}", io::Error::last_os_error());
		}

		let guard = Realtime { policy, param };
		if 0 != unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) } {
			// guard restores the scheduler
			bail!("mlockall failed: {}", io::Error::last_os_error());
		}
		debug!("running with SCHED_FIFO priority {}", priority);
		Ok(guard)
	}
}

impl Drop for Realtime {
	fn drop(&mut self) {
		unsafe {
			munlockall();
			if 0 != sched_setscheduler(0, self.policy, &self.param) {
				warn!("Couldn't restore scheduling policy: {}", io::Error::last_os_error());
			}
		}
	}
}
