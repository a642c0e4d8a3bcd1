use crate::config::KexecConfig;
use crate::crash::CrashCoordinator;
use crate::error::KexecError;
use crate::image::KernelImage;
use crate::platform::{CrashDump, KexecPlatform};
use crate::prepare::machine_kexec_prepare;
use crate::relocate::machine_kexec;

/// Architecture hooks called by the generic kexec core.
pub trait MachineKexec {
    /// Register snapshot handed to [`crash_shutdown`](Self::crash_shutdown).
    type Registers;

    /// Validates a freshly loaded image.
    ///
    /// # Errors
    /// See [`KexecError`].
    fn prepare(&self, image: &mut KernelImage<'_>) -> Result<(), KexecError>;

    /// Releases architecture state of an image that will not be executed.
    fn cleanup(&self, image: &mut KernelImage<'_>);

    /// Brings the machine into a state fit for the crash kernel.
    fn crash_shutdown(&'static self, regs: &Self::Registers);

    /// Jumps into the image.
    fn execute(&self, image: KernelImage<'_>) -> !;
}

/// The kexec machine of one platform.
///
/// ```no_run
/// # use kernel_kexec::{KexecConfig, KexecPlatform, Machine};
/// # fn board<B: KexecPlatform + 'static>(board: &'static B) {
/// let machine: &'static Machine<B> =
///     Box::leak(Box::new(Machine::new(board, KexecConfig::new())));
/// # }
/// ```
pub struct Machine<P: 'static> {
    platform: &'static P,
    config: KexecConfig,
    crash: CrashCoordinator<P>,
}

impl<P: KexecPlatform + 'static> Machine<P> {
    #[must_use]
    pub const fn new(platform: &'static P, config: KexecConfig) -> Self {
        Self {
            platform,
            crash: CrashCoordinator::new(platform, &config),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &KexecConfig {
        &self.config
    }

    #[must_use]
    pub const fn crash_coordinator(&self) -> &CrashCoordinator<P> {
        &self.crash
    }
}

impl<P: KexecPlatform + 'static> MachineKexec for Machine<P> {
    type Registers = <P as CrashDump>::Registers;

    fn prepare(&self, image: &mut KernelImage<'_>) -> Result<(), KexecError> {
        machine_kexec_prepare(self.platform, &self.config, image)
    }

    fn cleanup(&self, _image: &mut KernelImage<'_>) {}

    fn crash_shutdown(&'static self, regs: &Self::Registers) {
        self.crash.crash_shutdown(regs);
    }

    fn execute(&self, image: KernelImage<'_>) -> ! {
        machine_kexec(self.platform, image)
    }
}
