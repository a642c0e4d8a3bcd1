//! A simulated board: CPUs are threads, terminal states unwind.
#![allow(dead_code)]

use kernel_kexec::platform::{
    CacheOps, Cpu, CrashDump, CrossCall, Interrupts, PhysMemory, Relocation, RemoteCall, Topology,
    UserMemory,
};
use kernel_kexec::{CONTROL_PAGE_SIZE, CpuId, CpuMask, RelocationStub, UserFault};
use kernel_memory_addresses::{PhysicalAddress, PhysicalRange, VirtualAddress};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

pub const MACHINE_TYPE: u32 = 3138;
pub const RAM_START: u64 = 0x8000_0000;
pub const RAM_SIZE: u64 = 0x2000_0000;

/// `mov r0, r0` padding followed by a branch, as opaque stub bytes.
pub static STUB_CODE: [u8; 24] = [
    0x00, 0x00, 0xA0, 0xE1, 0x00, 0x00, 0xA0, 0xE1, 0x00, 0x00, 0xA0, 0xE1, 0x00, 0x00, 0xA0,
    0xE1, 0x00, 0x00, 0xA0, 0xE1, 0xFE, 0xFF, 0xFF, 0xEA,
];
pub const STUB_ENTRY_OFFSET: usize = 8;

/// Heap stand-in for a control page, aligned like a real one.
#[repr(C, align(4096))]
pub struct PageFrame([u8; CONTROL_PAGE_SIZE]);

impl Deref for PageFrame {
    type Target = [u8; CONTROL_PAGE_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PageFrame {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

pub fn control_page() -> Box<PageFrame> {
    Box::new(PageFrame([0; CONTROL_PAGE_SIZE]))
}

thread_local! {
    static CURRENT_CPU: Cell<u32> = const { Cell::new(0) };
}

/// Payload of a CPU that reached its parked state.
#[derive(Debug)]
pub struct Parked(pub CpuId);

/// Payload of a soft restart.
#[derive(Debug)]
pub struct Restarted(pub PhysicalAddress);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Regs {
    pub pc: u64,
    pub sp: u64,
}

impl Regs {
    pub fn live(cpu: CpuId) -> Self {
        Self {
            pc: 0xC000_0000 + u64::from(cpu.as_u32()),
            sp: 0xC100_0000 + u64::from(cpu.as_u32()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    IrqDisable(CpuId),
    FiqDisable(CpuId),
    MaskAll(CpuId),
    Snapshot(CpuId, Regs),
    FlushAll(CpuId),
    Offline(CpuId),
    FlushIcache(VirtualAddress, usize),
}

pub struct SimPlatform {
    possible: usize,
    secondary_boot: bool,
    hotplug: bool,
    online: AtomicU64,
    ram: Vec<PhysicalRange>,
    user: HashMap<u64, Vec<u8>>,
    idmap_offset: u64,
    unresponsive: CpuMask,
    stub: RelocationStub,
    pub calls: Mutex<Vec<CpuId>>,
    pub events: Arc<Mutex<Vec<Event>>>,
    pub parked: Arc<Mutex<Vec<CpuId>>>,
    pub delayed_ms: AtomicU32,
    pub delay_calls: AtomicU32,
}

impl SimPlatform {
    /// `cpus` CPUs, all online, SMP with hotplug, RAM at [`RAM_START`].
    pub fn new(cpus: u32) -> Self {
        Self {
            possible: cpus as usize,
            secondary_boot: cpus > 1,
            hotplug: true,
            online: AtomicU64::new(CpuMask::first(cpus).bits()),
            ram: vec![PhysicalRange::new(PhysicalAddress::new(RAM_START), RAM_SIZE)],
            user: HashMap::new(),
            idmap_offset: 0,
            unresponsive: CpuMask::empty(),
            stub: RelocationStub::new(&STUB_CODE, STUB_ENTRY_OFFSET),
            calls: Mutex::new(Vec::new()),
            events: Arc::new(Mutex::new(Vec::new())),
            parked: Arc::new(Mutex::new(Vec::new())),
            delayed_ms: AtomicU32::new(0),
            delay_calls: AtomicU32::new(0),
        }
    }

    pub fn with_hotplug(mut self, hotplug: bool) -> Self {
        self.hotplug = hotplug;
        self
    }

    pub fn with_secondary_boot(mut self, secondary_boot: bool) -> Self {
        self.secondary_boot = secondary_boot;
        self
    }

    pub fn with_online(self, online: CpuMask) -> Self {
        self.online.store(online.bits(), Ordering::SeqCst);
        self
    }

    pub fn with_unresponsive(mut self, cpu: CpuId) -> Self {
        self.unresponsive = self.unresponsive.with(cpu);
        self
    }

    pub fn with_user_buffer(mut self, addr: u64, bytes: &[u8]) -> Self {
        self.user.insert(addr, bytes.to_vec());
        self
    }

    pub fn with_idmap_offset(mut self, offset: u64) -> Self {
        self.idmap_offset = offset;
        self
    }

    pub fn with_stub(mut self, stub: RelocationStub) -> Self {
        self.stub = stub;
        self
    }

    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<CpuId> {
        self.calls.lock().unwrap().clone()
    }

    /// Waits until `n` CPUs reached their parked state.
    pub fn wait_parked(&self, n: usize) -> Vec<CpuId> {
        for _ in 0..5000 {
            let parked = self.parked.lock().unwrap().clone();
            if parked.len() >= n {
                return parked;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("CPUs did not park in time");
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Topology for SimPlatform {
    fn possible_cpu_count(&self) -> usize {
        self.possible
    }

    fn online_cpus(&self) -> CpuMask {
        CpuMask::from_bits(self.online.load(Ordering::SeqCst))
    }

    fn can_secondary_boot(&self) -> bool {
        self.secondary_boot
    }

    fn can_cpu_hotplug(&self) -> bool {
        self.hotplug
    }

    fn set_cpu_offline(&self, cpu: CpuId) {
        self.record(Event::Offline(cpu));
        self.online
            .fetch_and(!(1u64 << cpu.as_u32()), Ordering::SeqCst);
    }
}

impl Cpu for SimPlatform {
    fn current_cpu(&self) -> CpuId {
        CpuId::new(CURRENT_CPU.with(Cell::get))
    }

    fn mdelay(&self, ms: u32) {
        self.delay_calls.fetch_add(1, Ordering::SeqCst);
        self.delayed_ms.fetch_add(ms, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn wait_for_event(&self) {
        panic::panic_any(Parked(self.current_cpu()));
    }
}

impl PhysMemory for SimPlatform {
    fn is_region_memory(&self, range: PhysicalRange) -> bool {
        self.ram.iter().any(|ram| ram.contains_range(&range))
    }

    fn virt_to_idmap(&self, va: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new(va.as_u64().wrapping_sub(self.idmap_offset))
    }
}

impl UserMemory for SimPlatform {
    fn read_user(&self, src: VirtualAddress, dst: &mut [u8]) -> Result<(), UserFault> {
        match self.user.get(&src.as_u64()) {
            Some(bytes) if bytes.len() >= dst.len() => {
                dst.copy_from_slice(&bytes[..dst.len()]);
                Ok(())
            }
            _ => Err(UserFault(src)),
        }
    }
}

impl CacheOps for SimPlatform {
    fn flush_cache_all(&self) {
        self.record(Event::FlushAll(self.current_cpu()));
    }

    fn flush_icache_range(&self, start: VirtualAddress, len: usize) {
        self.record(Event::FlushIcache(start, len));
    }
}

impl Interrupts for SimPlatform {
    fn local_irq_disable(&self) {
        self.record(Event::IrqDisable(self.current_cpu()));
    }

    fn local_fiq_disable(&self) {
        self.record(Event::FiqDisable(self.current_cpu()));
    }

    fn mask_all_interrupts(&self) {
        self.record(Event::MaskAll(self.current_cpu()));
    }
}

impl CrossCall for SimPlatform {
    fn call_single_async(&self, cpu: CpuId, call: &'static dyn RemoteCall) {
        self.calls.lock().unwrap().push(cpu);
        if self.unresponsive.contains(cpu) {
            return;
        }

        let parked = Arc::clone(&self.parked);
        thread::spawn(move || {
            CURRENT_CPU.with(|c| c.set(cpu.as_u32()));
            let payload = panic::catch_unwind(AssertUnwindSafe(|| {
                call.run();
            }))
            .expect_err("a stopped CPU must never return");
            if let Some(Parked(cpu)) = payload.downcast_ref::<Parked>() {
                parked.lock().unwrap().push(*cpu);
            }
        });
    }
}

impl CrashDump for SimPlatform {
    type Registers = Regs;

    fn capture_registers(&self, saved: Option<&Regs>) -> Regs {
        saved.copied().unwrap_or_else(|| Regs::live(self.current_cpu()))
    }

    fn commit_snapshot(&self, cpu: CpuId, regs: &Regs) {
        self.record(Event::Snapshot(cpu, *regs));
    }
}

impl Relocation for SimPlatform {
    fn relocation_stub(&self) -> RelocationStub {
        self.stub
    }

    fn machine_type(&self) -> u32 {
        MACHINE_TYPE
    }

    unsafe fn soft_restart(&self, entry: PhysicalAddress) -> ! {
        self.flush_cache_all();
        panic::panic_any(Restarted(entry));
    }
}

/// Runs `f` until it unwinds with a `T` payload.
pub fn expect_terminal<T: Any>(f: impl FnOnce()) -> T {
    let payload = panic::catch_unwind(AssertUnwindSafe(f))
        .expect_err("terminal state returned");
    match payload.downcast::<T>() {
        Ok(terminal) => *terminal,
        Err(other) => panic::resume_unwind(other),
    }
}

/// Runs `f` and returns the message it panicked with.
pub fn expect_panic_message(f: impl FnOnce()) -> String {
    let payload = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("expected a panic");
    if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else {
        panic::resume_unwind(payload)
    }
}

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Collects records per thread so parallel tests do not see each other.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|r| {
            r.borrow_mut()
                .push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Starts capturing log output of the calling thread.
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("logger installed twice");
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|r| r.borrow_mut().clear());
}

/// Messages logged at `level` on the calling thread since [`capture_logs`].
pub fn logged(level: Level) -> Vec<String> {
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    })
}
