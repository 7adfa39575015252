/// Start-up configuration of a core.

/// Values applied on every reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    /// Address of the first instruction.
    pub entry: u32,
    /// R13 for User and System mode.
    pub user_stack: u32,
    /// R13 for IRQ mode.
    pub irq_stack: u32,
    /// R13 for Supervisor mode.
    pub supervisor_stack: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            entry: 0x0000_0000,
            user_stack: 0x0300_7F00,
            irq_stack: 0x0300_7FA0,
            supervisor_stack: 0x0300_7FE0,
        }
    }
}

impl CoreConfig {
    pub fn with_entry(mut self, entry: u32) -> Self {
        self.entry = entry;
        self
    }

    pub fn with_stacks(mut self, user: u32, irq: u32, supervisor: u32) -> Self {
        self.user_stack = user;
        self.irq_stack = irq;
        self.supervisor_stack = supervisor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder() {
        let config = CoreConfig::default()
            .with_entry(0x0800_0000)
            .with_stacks(0x100, 0x200, 0x300);
        assert_eq!(config, CoreConfig {
            entry: 0x0800_0000,
            user_stack: 0x100,
            irq_stack: 0x200,
            supervisor_stack: 0x300,
        });
    }
}
