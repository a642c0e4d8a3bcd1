//! Stopping the other CPUs after a crash.
//!
//! The CPU that hit the fatal error asks every other online CPU to park
//! itself, then waits a bounded time for their acknowledgements:
//!
//! ```text
//!  crashing CPU                          every other online CPU
//!  ────────────                          ──────────────────────
//!  irq + fiq off
//!  latch set? ── yes ──> return
//!  pending = online - 1
//!  cross-call ─────────────────────────> fiq off
//!  poll pending (1 ms steps, ≤ 1 s)      save registers to crash notes
//!                                        flush data caches
//!                                        mark offline
//!          <──────────────────────────── pending -= 1 (release)
//!  warn if pending > 0                   park forever (wfe)
//!  set latch
//!  save own registers, mask all irqs
//! ```
//!
//! Only the counter and the latch are shared, both plain atomics: with
//! interrupts off on a dying system there is no lock owner to rely on.

use crate::config::KexecConfig;
use crate::platform::{KexecPlatform, RemoteCall};
use core::hint::spin_loop;
use kernel_sync::{Countdown, OneShot};
use log::{debug, info, warn};

/// Result of one stop request round.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StopOutcome {
    /// Every other CPU acknowledged within the timeout.
    AllStopped,
    /// The timeout elapsed with `remaining` CPUs still unaccounted for.
    TimedOut { remaining: usize },
    /// A previous crash already ran the protocol; nothing was done.
    AlreadyStopped,
}

/// Crash-time stop protocol state.
///
/// One instance lives for the whole boot, typically in a `static`, and is
/// only ever mutated on the crash path.
pub struct CrashCoordinator<P: 'static> {
    platform: &'static P,
    poll_interval_ms: u32,
    poll_budget: u32,
    waiting_for_stop: Countdown,
    cpus_stopped: OneShot,
}

impl<P: KexecPlatform + 'static> CrashCoordinator<P> {
    #[must_use]
    pub const fn new(platform: &'static P, config: &KexecConfig) -> Self {
        Self {
            platform,
            poll_interval_ms: config.poll_interval_ms(),
            poll_budget: config.stop_poll_budget(),
            waiting_for_stop: Countdown::new(),
            cpus_stopped: OneShot::new(),
        }
    }

    /// CPUs that were asked to stop and have not acknowledged yet.
    #[must_use]
    pub fn pending_acks(&self) -> usize {
        self.waiting_for_stop.remaining()
    }

    /// Whether the stop protocol has already run on this boot.
    #[must_use]
    pub fn cpus_stopped(&self) -> bool {
        self.cpus_stopped.is_set()
    }

    /// Crash entry on the CPU that detected the failure.
    ///
    /// `regs` is the register state at the point of the crash. Once this
    /// returns, at most this CPU is still executing kernel code (unless some
    /// CPU ignored the request) and all interrupts are masked.
    pub fn crash_shutdown(&'static self, regs: &P::Registers) {
        self.platform.local_fiq_disable();
        self.platform.local_irq_disable();

        self.stop_other_cpus();

        let cpu = self.platform.current_cpu();
        let snapshot = self.platform.capture_registers(Some(regs));
        self.platform.commit_snapshot(cpu, &snapshot);
        self.platform.mask_all_interrupts();

        info!("Loading crashdump kernel...");
    }

    /// Asks every other online CPU to park and waits a bounded time.
    ///
    /// Runs at most once per boot. The wait is a busy poll; it never blocks
    /// and never takes longer than the configured timeout. CPUs that do not
    /// answer in time are reported and otherwise ignored.
    pub fn stop_other_cpus(&'static self) -> StopOutcome {
        if self.cpus_stopped.is_set() {
            return StopOutcome::AlreadyStopped;
        }

        let this_cpu = self.platform.current_cpu();
        let targets = self.platform.online_cpus().without(this_cpu);

        self.waiting_for_stop.arm(targets.count());
        for cpu in targets.iter() {
            self.platform.call_single_async(cpu, self);
        }

        let mut polls_left = self.poll_budget;
        while self.waiting_for_stop.remaining() > 0 && polls_left > 0 {
            self.platform.mdelay(self.poll_interval_ms);
            polls_left -= 1;
        }

        let remaining = self.waiting_for_stop.remaining();
        if remaining > 0 {
            warn!(
                "Non-crashing CPUs did not react to IPI ({remaining} of {} still running)",
                targets.count()
            );
        }

        self.cpus_stopped.set();

        if remaining == 0 {
            StopOutcome::AllStopped
        } else {
            StopOutcome::TimedOut { remaining }
        }
    }

    /// Stop request handler, running on each CPU other than the crashing one.
    fn stop_this_cpu(&self) -> ! {
        self.platform.local_fiq_disable();

        let cpu = self.platform.current_cpu();
        let snapshot = self.platform.capture_registers(None);
        debug!("CPU {cpu} will stop doing anything useful since another CPU has crashed");
        self.platform.commit_snapshot(cpu, &snapshot);
        self.platform.flush_cache_all();

        self.platform.set_cpu_offline(cpu);
        self.waiting_for_stop.arrive();

        self.park()
    }

    /// Terminal state of a stopped CPU.
    fn park(&self) -> ! {
        loop {
            spin_loop();
            self.platform.wait_for_event();
        }
    }
}

impl<P: KexecPlatform + 'static> RemoteCall for CrashCoordinator<P> {
    fn run(&self) -> ! {
        self.stop_this_cpu()
    }
}
