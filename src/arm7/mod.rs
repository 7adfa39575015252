/// ARM7TDMI processor.

mod signals;

use crate::core::{
    constants::*,
    Mode,
    CPSR,
    ARMCore,
    ARMv4,
    ArmTable,
    RegisterFile,
    Thumbv4,
    ThumbTable
};
use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::memory::Mem32;
use crate::trace::{NoTrace, Tracer, TraceEvent};
use crate::{Debugger, CPUState};

pub use signals::Signals;

/// Externally visible state of the run loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Halted,
}

/// Called while halted. Returns true when the halt is over.
pub type HaltTask = Box<dyn FnMut() -> bool + Send>;

/// Two instruction slots ahead of R15.
#[derive(Clone, Copy, Debug, Default)]
struct Pipeline {
    /// Fetched from R15 - 1 instruction.
    prefetched: Option<u32>,
    /// Fetched from R15 - 2 instructions, executes next.
    decoded: Option<u32>,
}

pub struct ARM7TDMI<M: Mem32, T: Tracer = NoTrace> {
    regs: RegisterFile,
    mem: M,

    arm_table: ArmTable,
    thumb_table: ThumbTable,
    pipeline: Pipeline,

    config: CoreConfig,
    signals: Signals,
    halt_task: Option<HaltTask>,
    tracer: T,
}

impl<M: Mem32> ARM7TDMI<M, NoTrace> {
    pub fn new(mem: M) -> CoreResult<Self> {
        Self::with_config(mem, CoreConfig::default())
    }

    pub fn with_config(mem: M, config: CoreConfig) -> CoreResult<Self> {
        Self::with_tracer(mem, config, NoTrace)
    }
}

impl<M: Mem32, T: Tracer> ARM7TDMI<M, T> {
    pub fn with_tracer(mem: M, config: CoreConfig, tracer: T) -> CoreResult<Self> {
        Ok(Self {
            regs: RegisterFile::new(),
            mem,

            arm_table: ArmTable::new()?,
            thumb_table: ThumbTable::new(),
            pipeline: Pipeline::default(),

            config,
            signals: Signals::new(),
            halt_task: None,
            tracer,
        })
    }

    /// Put the core into its start-up state and fill the pipeline at the entry point.
    ///
    /// System mode, ARM state, banked stacks from the config.
    pub fn reset(&mut self) -> CoreResult {
        self.regs = RegisterFile::new();
        self.regs.set(Mode::SYS, SP_REG, self.config.user_stack);
        self.regs.set(Mode::IRQ, SP_REG, self.config.irq_stack);
        self.regs.set(Mode::SVC, SP_REG, self.config.supervisor_stack);
        self.signals.halt(false);
        self.signals.set_in_irq(false);
        self.fill_pipeline(self.config.entry)
    }

    /// Reset, then run until stopped.
    ///
    /// An unsupported instruction or a memory failure stops the core
    /// and is returned.
    pub fn start(&mut self) -> CoreResult {
        self.reset()?;
        self.signals.set_running(true);
        log::info!("core started at {:08X}", self.config.entry);
        while self.signals.is_running() {
            if let Err(e) = self.step() {
                log::error!("core stopped: {}", e);
                self.signals.set_running(false);
                return Err(e);
            }
        }
        log::info!("core stopped at {:08X}", self.program_counter());
        Ok(())
    }

    /// Run a single tick.
    ///
    /// Either takes a pending interrupt or executes the decoded instruction,
    /// then moves the pipeline on.
    pub fn step(&mut self) -> CoreResult {
        if self.pipeline.decoded.is_none() {
            let pc = self.regs.read(PC_REG);
            self.fill_pipeline(pc)?;
        }

        if self.signals.irq_raised() && !self.regs.cpsr().contains(CPSR::I) {
            self.enter_irq()?;
        } else {
            self.execute_decoded()?;
            self.wait_while_halted();
            self.advance()?;
        }
        self.signals.set_in_irq(self.regs.mode() == Mode::IRQ);
        Ok(())
    }

    pub fn stop(&self) {
        self.signals.stop();
    }

    pub fn is_running(&self) -> bool {
        self.signals.is_running()
    }

    pub fn halt(&self, halted: bool) {
        self.signals.halt(halted);
    }

    pub fn is_halted(&self) -> bool {
        self.signals.is_halted()
    }

    pub fn irq(&self, raised: bool) {
        self.signals.irq(raised);
    }

    pub fn in_irq(&self) -> bool {
        self.signals.in_irq()
    }

    /// A handle for other threads.
    pub fn signals(&self) -> Signals {
        self.signals.clone()
    }

    pub fn state(&self) -> RunState {
        if !self.signals.is_running() {
            RunState::Stopped
        } else if self.signals.is_halted() {
            RunState::Halted
        } else {
            RunState::Running
        }
    }

    /// Polled while the core is halted.
    /// Without one, the core waits for another thread to release it.
    pub fn set_halt_task<F>(&mut self, task: F)
        where F: FnMut() -> bool + Send + 'static
    {
        self.halt_task = Some(Box::new(task));
    }

    /// Address of the next instruction to execute.
    pub fn program_counter(&self) -> u32 {
        let pc = self.regs.read(PC_REG);
        if self.pipeline.decoded.is_some() {
            pc.wrapping_sub(2 * self.regs.cpsr().instr_size())
        } else {
            pc
        }
    }

    /// Branch to `addr` and refill the pipeline.
    pub fn set_program_counter(&mut self, addr: u32) -> CoreResult {
        self.fill_pipeline(addr)
    }

    /// The instruction after the next one.
    pub fn prefetch(&self) -> Option<u32> {
        self.pipeline.prefetched
    }

    /// The instruction that executes on the next tick.
    pub fn next_instruction(&self) -> Option<u32> {
        self.pipeline.decoded
    }

    pub fn mem(&self) -> &M {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut T {
        &mut self.tracer
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

// Internal
impl<M: Mem32, T: Tracer> ARM7TDMI<M, T> {
    fn fetch(&mut self, addr: u32, thumb: bool) -> CoreResult<u32> {
        if thumb {
            Ok(self.mem.load_halfword(addr)? as u32)
        } else {
            Ok(self.mem.load_word(addr)?)
        }
    }

    /// Discard the pipeline and refill it from `target`,
    /// in the state given by the CPSR.
    fn fill_pipeline(&mut self, target: u32) -> CoreResult {
        let cpsr = self.regs.cpsr();
        let thumb = cpsr.is_thumb();
        let size = cpsr.instr_size();
        let addr = target & !(size - 1);
        self.pipeline.decoded = Some(self.fetch(addr, thumb)?);
        self.pipeline.prefetched = Some(self.fetch(addr.wrapping_add(size), thumb)?);
        self.regs.set_pc_silent(addr.wrapping_add(2 * size));
        self.regs.take_branch();
        Ok(())
    }

    /// Shift the pipeline along by one instruction, or refill it after a branch.
    fn advance(&mut self) -> CoreResult {
        if self.regs.take_branch() {
            let target = self.regs.read(PC_REG);
            return self.fill_pipeline(target);
        }
        let cpsr = self.regs.cpsr();
        let fetch_addr = self.regs.read(PC_REG);
        let fetched = self.fetch(fetch_addr, cpsr.is_thumb())?;
        self.pipeline.decoded = self.pipeline.prefetched;
        self.pipeline.prefetched = Some(fetched);
        self.regs.set_pc_silent(fetch_addr.wrapping_add(cpsr.instr_size()));
        Ok(())
    }

    fn execute_decoded(&mut self) -> CoreResult {
        let i = match self.pipeline.decoded {
            Some(i) => i,
            None => return Ok(()),
        };
        let thumb = self.regs.cpsr().is_thumb();
        if self.tracer.enabled() {
            let event = TraceEvent {
                address: self.program_counter(),
                instruction: i,
                thumb,
                mnemonic: if thumb {
                    self.thumb_table.mnemonic(i as u16)
                } else {
                    self.arm_table.mnemonic(i)
                },
            };
            self.tracer.trace(&event);
        }
        if thumb {
            let table = self.thumb_table;
            self.execute_thumb(&table, i as u16)
        } else {
            let instr = self.arm_table.decode(i);
            instr.execute(self)
        }
    }

    /// Take the IRQ exception. The handler returns with SUBS PC, LR, #4
    /// to the instruction that was about to execute.
    fn enter_irq(&mut self) -> CoreResult {
        let cpsr = self.regs.cpsr();
        let return_addr = self.regs.read(PC_REG)
            .wrapping_sub(2 * cpsr.instr_size())
            .wrapping_add(4);
        log::debug!("irq: vector {:08X}, return to {:08X}", IRQ_VECTOR, return_addr);
        self.enter_exception(Mode::IRQ, IRQ_VECTOR, return_addr);
        self.fill_pipeline(IRQ_VECTOR)
    }

    fn wait_while_halted(&mut self) {
        while self.signals.is_halted() {
            let resolved = match self.halt_task.as_mut() {
                Some(task) => task(),
                None => false,
            };
            if resolved {
                self.signals.halt(false);
            } else {
                std::thread::yield_now();
            }
        }
    }
}

impl<M: Mem32, T: Tracer> ARMCore<M> for ARM7TDMI<M, T> {
    fn regs(&self) -> &RegisterFile {
        &self.regs
    }
    fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }
    fn ref_mem(&mut self) -> &mut M {
        &mut self.mem
    }
}

impl<M: Mem32, T: Tracer> ARMv4<M> for ARM7TDMI<M, T> {}
impl<M: Mem32, T: Tracer> Thumbv4<M> for ARM7TDMI<M, T> {}

impl<M: Mem32, T: Tracer> Debugger for ARM7TDMI<M, T> {
    fn inspect_state(&mut self) -> CPUState {
        let mut regs = [0; 16];
        for (n, reg) in regs.iter_mut().enumerate() {
            *reg = self.regs.read(n);
        }
        let cpsr = self.regs.cpsr();
        CPUState {
            regs,
            cpsr: cpsr.bits(),
            spsr: self.regs.spsr().bits(),
            mode: cpsr.mode(),
            thumb_mode: cpsr.is_thumb(),

            pipeline: [
                self.pipeline.decoded,
                self.pipeline.prefetched,
            ],
        }
    }
}
