/// Errors surfaced by the processor.

use thiserror::Error;

use crate::core::TableError;
use crate::memory::MemoryError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// An encoding with no defined behaviour on this core.
    /// The run loop stops when it sees one of these.
    #[error("unsupported {} instruction 0x{instruction:08X} at 0x{address:08X}", set_name(.thumb))]
    Unsupported {
        address: u32,
        instruction: u32,
        thumb: bool,
    },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("dispatch table construction failed")]
    Table(#[from] TableError),
}

fn set_name(thumb: &bool) -> &'static str {
    if *thumb {"thumb"} else {"arm"}
}

pub type CoreResult<T = ()> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unsupported_message() {
        let err = CoreError::Unsupported {
            address: 0x0800_0124,
            instruction: 0xE040_0091,
            thumb: false,
        };
        assert_eq!(err.to_string(), "unsupported arm instruction 0xE0400091 at 0x08000124");
    }
}
